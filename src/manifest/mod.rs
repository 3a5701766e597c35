//! Composer manifest documents
//!
//! Reads and writes `composer.json` files as owned JSON documents. Every
//! operation re-reads the full document, mutates it in memory and writes it
//! back in one pass; no component holds a manifest across command boundaries.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors for manifest reading and writing
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest \"{path}\": {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed JSON at path \"{path}\": {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Could not write JSON at path \"{path}\": {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Section of a manifest that holds dependency constraints.
///
/// Threaded explicitly through blend and link instead of selecting an
/// accessor at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySection {
    Require,
    RequireDev,
}

impl DependencySection {
    /// The JSON key for this section
    pub fn key(self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::RequireDev => "require-dev",
        }
    }

    /// Both sections, in manifest order
    pub fn both() -> [DependencySection; 2] {
        [Self::Require, Self::RequireDev]
    }
}

/// A parsed `composer.json` document
#[derive(Debug, Clone)]
pub struct Manifest {
    doc: Value,
}

impl Manifest {
    /// Wrap an already-parsed document
    pub fn new(doc: Value) -> Self {
        Self { doc }
    }

    /// Read and parse a manifest file.
    ///
    /// The top-level value must be a JSON object.
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let doc: Value = serde_json::from_str(&contents).map_err(|e| ManifestError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !doc.is_object() {
            return Err(ManifestError::Malformed {
                path: path.to_path_buf(),
                reason: "top-level value is not an object".to_string(),
            });
        }

        Ok(Self { doc })
    }

    /// Write the document as 2-space pretty JSON with a trailing newline.
    ///
    /// `serde_json` leaves forward slashes and non-ASCII characters
    /// unescaped, matching the upstream composer.json conventions.
    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        fs::write(path, self.to_pretty()).map_err(|source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render the document as pretty JSON with a trailing newline
    pub fn to_pretty(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.doc).unwrap_or_else(|_| "{}".to_string());
        out.push('\n');
        out
    }

    /// The underlying JSON document
    pub fn doc(&self) -> &Value {
        &self.doc
    }

    /// Mutable access to the underlying JSON document
    pub fn doc_mut(&mut self) -> &mut Value {
        &mut self.doc
    }

    /// The `name` field, if present and a string
    pub fn name(&self) -> Option<&str> {
        self.doc.get("name").and_then(Value::as_str)
    }

    /// A dependency section as a map, if present
    pub fn section(&self, section: DependencySection) -> Option<&Map<String, Value>> {
        self.doc.get(section.key()).and_then(Value::as_object)
    }

    /// Package names declared in a dependency section, in manifest order
    pub fn dependency_names(&self, section: DependencySection) -> Vec<String> {
        self.section(section)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a dependency is declared in the given section
    pub fn has_dependency(&self, section: DependencySection, name: &str) -> bool {
        self.section(section).is_some_and(|m| m.contains_key(name))
    }

    /// The constraint string for a dependency, if declared
    pub fn constraint(&self, section: DependencySection, name: &str) -> Option<&str> {
        self.section(section)
            .and_then(|m| m.get(name))
            .and_then(Value::as_str)
    }

    /// Set a dependency constraint, creating the section when missing
    pub fn set_dependency(&mut self, section: DependencySection, name: &str, constraint: &str) {
        let root = match self.doc.as_object_mut() {
            Some(root) => root,
            None => return,
        };

        let entry = root
            .entry(section.key().to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if let Some(map) = entry.as_object_mut() {
            map.insert(name.to_string(), Value::String(constraint.to_string()));
        }
    }

    /// Whether the `replace` map contains the given package name
    pub fn replaces(&self, name: &str) -> bool {
        self.doc
            .get("replace")
            .and_then(Value::as_object)
            .is_some_and(|m| m.contains_key(name))
    }

    /// Namespace prefixes from `autoload.psr-4` and `autoload.psr-0`,
    /// in declaration order (psr-4 first)
    pub fn autoload_prefixes(&self) -> Vec<String> {
        let mut prefixes = Vec::new();
        let autoload = self.doc.get("autoload").and_then(Value::as_object);

        if let Some(autoload) = autoload {
            for scheme in ["psr-4", "psr-0"] {
                if let Some(map) = autoload.get(scheme).and_then(Value::as_object) {
                    prefixes.extend(map.keys().cloned());
                }
            }
        }

        prefixes
    }

    /// The `extra.pmu` configuration node, if present
    pub fn pmu_extra(&self) -> Option<&Value> {
        self.doc.get("extra").and_then(|e| e.get("pmu"))
    }

    /// Append entries to the `repositories` list, creating it when missing
    pub fn append_repositories(&mut self, repositories: Vec<Value>) {
        let root = match self.doc.as_object_mut() {
            Some(root) => root,
            None => return,
        };

        let entry = root
            .entry("repositories".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        if let Some(list) = entry.as_array_mut() {
            list.extend(repositories);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_keys() {
        assert_eq!(DependencySection::Require.key(), "require");
        assert_eq!(DependencySection::RequireDev.key(), "require-dev");
    }

    #[test]
    fn test_read_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "[1, 2]").unwrap();

        let err = Manifest::read(file.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { .. }));
    }

    #[test]
    fn test_dependency_accessors() {
        let manifest = Manifest::new(json!({
            "name": "test/a",
            "require": { "test/b": "^1.0", "php": ">=8.1" }
        }));

        assert_eq!(manifest.name(), Some("test/a"));
        assert!(manifest.has_dependency(DependencySection::Require, "test/b"));
        assert!(!manifest.has_dependency(DependencySection::RequireDev, "test/b"));
        assert_eq!(
            manifest.constraint(DependencySection::Require, "test/b"),
            Some("^1.0")
        );
        assert_eq!(
            manifest.dependency_names(DependencySection::Require),
            vec!["test/b", "php"]
        );
    }

    #[test]
    fn test_set_dependency_creates_section() {
        let mut manifest = Manifest::new(json!({ "name": "test/a" }));
        manifest.set_dependency(DependencySection::RequireDev, "test/b", "@dev");

        assert_eq!(
            manifest.constraint(DependencySection::RequireDev, "test/b"),
            Some("@dev")
        );
    }

    #[test]
    fn test_autoload_prefixes_psr4_then_psr0() {
        let manifest = Manifest::new(json!({
            "autoload": {
                "psr-0": { "Legacy_": "lib/" },
                "psr-4": { "MonoRepo\\A\\": "src/" }
            }
        }));

        assert_eq!(manifest.autoload_prefixes(), vec!["MonoRepo\\A\\", "Legacy_"]);
    }

    #[test]
    fn test_pretty_output_has_trailing_newline_and_plain_slashes() {
        let manifest = Manifest::new(json!({ "homepage": "https://example.com/a" }));
        let out = manifest.to_pretty();

        assert!(out.ends_with('\n'));
        assert!(out.contains("https://example.com/a"));
        assert!(!out.contains("\\/"));
    }

    #[test]
    fn test_append_repositories() {
        let mut manifest = Manifest::new(json!({
            "repositories": [{ "type": "vcs", "url": "https://example.com/r" }]
        }));
        manifest.append_repositories(vec![json!({ "type": "path", "url": "packages/A" })]);

        let repos = manifest.doc().get("repositories").unwrap().as_array().unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[1]["type"], "path");
    }
}
