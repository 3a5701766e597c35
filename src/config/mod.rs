//! Monorepo project discovery
//!
//! Builds the per-invocation [`ProjectConfig`] from the root manifest's
//! `extra.pmu` node: expands project glob patterns, maps project names to
//! manifest paths and loads the optional `pmu.baseline` suppression file.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::manifest::{DependencySection, Manifest, ManifestError};

/// Name of the violation suppression file, looked up in the base directory
pub const BASELINE_FILE: &str = "pmu.baseline";

/// Errors for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Invalid glob pattern \"{pattern}\": {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("Failed to read baseline file \"{path}\": {source}")]
    Baseline {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved monorepo configuration, built once per command invocation
#[derive(Debug)]
pub struct ProjectConfig {
    /// Project names in discovery order (pattern order, then path order),
    /// deduplicated
    pub projects: Vec<String>,

    /// Exclusion glob patterns from `extra.pmu.exclude`
    pub exclude: Vec<String>,

    /// Project name to manifest file path; duplicate names are
    /// last-write-wins
    pub manifest_files: BTreeMap<String, PathBuf>,

    /// Exact violation messages to suppress during audits
    pub baseline: HashSet<String>,

    /// Directory the project globs were expanded against
    pub base_dir: PathBuf,

    exclude_set: GlobSet,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            exclude: Vec::new(),
            manifest_files: BTreeMap::new(),
            baseline: HashSet::new(),
            base_dir: PathBuf::new(),
            exclude_set: GlobSet::empty(),
        }
    }
}

impl ProjectConfig {
    /// Load the config from the monorepo root manifest.
    ///
    /// Returns the empty config when `extra.pmu` is absent (the manifest is
    /// not a monorepo root) or when any project pattern matches no files.
    pub fn load(root: &Manifest, base_dir: &Path) -> Result<Self, ConfigError> {
        Self::load_for(root, base_dir, None)
    }

    /// Load the config with an explicit invoking manifest.
    ///
    /// When the invoking manifest requires the monorepo package itself (the
    /// `replace` convention), the root manifest is registered as a
    /// pseudo-project and discovered projects named in the root's `replace`
    /// map are skipped.
    pub fn load_for(
        root: &Manifest,
        base_dir: &Path,
        invoking: Option<&Manifest>,
    ) -> Result<Self, ConfigError> {
        let Some(pmu) = root.pmu_extra() else {
            return Ok(Self::default());
        };

        let patterns = string_list(pmu.get("projects"));
        let exclude = string_list(pmu.get("exclude"));
        let baseline = load_baseline(&base_dir.join(BASELINE_FILE))?;

        let mut projects = Vec::new();
        let mut manifest_files = BTreeMap::new();

        let context = invoking.unwrap_or(root);
        let mut has_self_dependency = false;
        if let Some(root_name) = root.name() {
            let referenced = DependencySection::both()
                .iter()
                .any(|s| context.has_dependency(*s, root_name));
            if referenced {
                has_self_dependency = true;
                manifest_files.insert(root_name.to_string(), base_dir.join("composer.json"));
            }
        }

        for pattern in &patterns {
            let matches = expand_glob(base_dir, pattern)?;
            if matches.is_empty() {
                // A pattern that matches nothing disables the whole config.
                return Ok(Self::default());
            }

            for path in matches {
                let manifest = Manifest::read(&path)?;
                let Some(name) = manifest.name() else {
                    return Err(ConfigError::Manifest(ManifestError::Malformed {
                        path,
                        reason: "missing string \"name\" field".to_string(),
                    }));
                };

                if has_self_dependency && root.replaces(name) {
                    continue;
                }

                if !projects.iter().any(|p| p == name) {
                    projects.push(name.to_string());
                }
                manifest_files.insert(name.to_string(), path);
            }
        }

        let exclude_set = build_glob_set(&exclude)?;

        Ok(Self {
            projects,
            exclude,
            manifest_files,
            baseline,
            base_dir: base_dir.to_path_buf(),
            exclude_set,
        })
    }

    /// Whether a source file path is excluded by `extra.pmu.exclude`.
    ///
    /// A path is excluded when it matches an exclusion glob or sits under an
    /// exclusion entry treated as a base path. Paths are compared relative to
    /// the base directory when possible.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.base_dir).unwrap_or(path);

        if self.exclude_set.is_match(relative) {
            return true;
        }

        self.exclude.iter().any(|g| relative.starts_with(g))
    }
}

/// Coerce an optional JSON array into a list of strings
fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(serde_json::Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Read the baseline file as one suppressed message per non-empty line
fn load_baseline(path: &Path) -> Result<HashSet<String>, ConfigError> {
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Baseline {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(contents
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::Pattern {
        pattern: patterns.join(","),
        source,
    })
}

/// Expand a glob pattern relative to the base directory.
///
/// `*` does not cross path separators. Matches are sorted for deterministic
/// discovery order within one pattern.
fn expand_glob(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
    let matcher = glob.compile_matcher();

    let depth = pattern.split('/').count();
    let mut matches: Vec<PathBuf> = WalkDir::new(base_dir)
        .max_depth(depth)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(base_dir).ok()?;
            matcher.is_match(relative).then(|| e.path().to_path_buf())
        })
        .collect();

    matches.sort();
    Ok(matches)
}
