//! Test fixtures for monorepo integration tests
//!
//! Builds throwaway monorepos inside a `TempDir`: the canonical fixture
//! (projects test/a, test/b, test/c with one undeclared cross-project
//! import) and a "replace-only" fixture where every package requires the
//! monorepo root itself.

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use pmu::config::ProjectConfig;
use pmu::manifest::Manifest;

/// A monorepo rooted in a temporary directory
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    /// The canonical monorepo: test/a depends on test/b, test/c depends on
    /// test/b, and `MonoRepo\C\C` imports `MonoRepo\A\A` without declaring
    /// test/a as a dependency.
    pub fn canonical() -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };

        fixture.write_json(
            "composer.json",
            json!({
                "name": "test/monorepo",
                "require": {
                    "test/a": "^1.0",
                    "soyuka/contexts": "^3.0.0"
                },
                "require-dev": {
                    "symfony/contracts": "^2.0.0"
                },
                "extra": {
                    "pmu": { "projects": ["packages/*/composer.json"] },
                    "branch-alias": {
                        "dev-main": "3.3.x-dev",
                        "dev-3.4": "3.4.x-dev"
                    }
                }
            }),
        );

        fixture.write_json(
            "packages/A/composer.json",
            json!({
                "name": "test/a",
                "require": {
                    "test/b": "^1.0",
                    "soyuka/contexts": "^2.0.0"
                },
                "require-dev": {
                    "symfony/contracts": "^1.0.0"
                },
                "autoload": { "psr-4": { "MonoRepo\\A\\": "./" } }
            }),
        );
        fixture.write(
            "packages/A/A.php",
            "<?php\n\nnamespace MonoRepo\\A;\n\nclass A {\n}\n",
        );
        fixture.write(
            "packages/A/S/AA.php",
            "<?php\n\nnamespace MonoRepo\\A\\S;\n\nuse MonoRepo\\A\\A;\n\nclass AA {\n}\n",
        );

        fixture.write_json(
            "packages/B/composer.json",
            json!({
                "name": "test/b",
                "autoload": { "psr-4": { "MonoRepo\\B\\": "./" } }
            }),
        );
        fixture.write(
            "packages/B/B.php",
            "<?php\n\nnamespace MonoRepo\\B;\n\nclass B {\n}\n",
        );

        fixture.write_json(
            "packages/C/composer.json",
            json!({
                "name": "test/c",
                "require": { "test/b": "^1.0" },
                "autoload": { "psr-4": { "MonoRepo\\C\\": "./" } }
            }),
        );
        fixture.write(
            "packages/C/C.php",
            "<?php\n\nnamespace MonoRepo\\C;\n\nuse MonoRepo\\A\\A;\n\nclass C {\n}\n",
        );

        fixture
    }

    /// A monorepo where every package requires the root package itself and
    /// the root `replace`s them
    pub fn replace_only() -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };

        fixture.write_json(
            "composer.json",
            json!({
                "name": "test/monorepo",
                "require": { "test/b": "^2.0.0" },
                "replace": {
                    "test/a": "self.version",
                    "test/b": "self.version",
                    "test/c": "self.version"
                },
                "extra": {
                    "pmu": { "projects": ["packages/*/composer.json"] }
                }
            }),
        );

        fixture.write_json(
            "packages/A/composer.json",
            json!({
                "name": "test/a",
                "require": {
                    "test/monorepo": "@dev",
                    "test/b": "^1.0.0"
                },
                "require-dev": { "test/c": "^1.0.0" }
            }),
        );
        fixture.write_json(
            "packages/B/composer.json",
            json!({
                "name": "test/b",
                "require": { "test/monorepo": "@dev" }
            }),
        );
        fixture.write_json(
            "packages/C/composer.json",
            json!({
                "name": "test/c",
                "require": { "test/monorepo": "@dev" }
            }),
        );

        fixture
    }

    /// Add project test/d, whose class imports `MonoRepo\A\A` without
    /// declaring test/a (covered by the baseline in some tests)
    pub fn with_package_d(self) -> Self {
        self.write_json(
            "packages/D/composer.json",
            json!({
                "name": "test/d",
                "require-dev": { "test/b": "^1.0.0" },
                "autoload": { "psr-4": { "MonoRepo\\D\\": "./" } }
            }),
        );
        self.write(
            "packages/D/D.php",
            "<?php\n\nnamespace MonoRepo\\D;\n\nuse MonoRepo\\A\\A;\n\nclass D {\n}\n",
        );
        self
    }

    /// Write a `pmu.baseline` file with the given messages
    pub fn with_baseline(self, lines: &[&str]) -> Self {
        self.write("pmu.baseline", &format!("{}\n", lines.join("\n")));
        self
    }

    pub fn base_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Read a manifest file back as raw bytes
    pub fn raw(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    /// Read a manifest file back as a JSON document
    pub fn json(&self, relative: &str) -> Value {
        serde_json::from_str(&self.raw(relative)).unwrap()
    }

    /// Load the root manifest
    pub fn root_manifest(&self) -> Manifest {
        Manifest::read(&self.path("composer.json")).unwrap()
    }

    /// Load the project config from the root manifest
    pub fn config(&self) -> ProjectConfig {
        ProjectConfig::load(&self.root_manifest(), self.base_dir()).unwrap()
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn write_json(&self, relative: &str, doc: Value) {
        self.write(relative, &Manifest::new(doc).to_pretty());
    }
}
