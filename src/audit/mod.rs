//! Cross-project dependency audit
//!
//! Scans each tracked class's source file for `use` statements and flags
//! imported namespaces that are neither owned by the class's project nor
//! covered by a declared dependency. Violations already present in the
//! baseline are suppressed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::graph::ProjectData;

/// Errors for dependency auditing
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to read source file \"{path}\": {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An undeclared cross-project usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Fully qualified name of the class doing the import
    pub class: String,

    /// The imported namespace that is not declared as a dependency
    pub used_namespace: String,
}

impl Violation {
    /// The message used for reporting and for baseline matching
    pub fn message(&self) -> String {
        format!(
            "Class \"{}\" uses \"{}\" but it is not declared as dependency.",
            self.class, self.used_namespace
        )
    }
}

/// Audit every class in the class map against the declared dependency edges.
///
/// Returns the unsuppressed violations in class-name order.
pub fn audit(config: &ProjectConfig, data: &ProjectData) -> Result<Vec<Violation>, AuditError> {
    let namespace_dependencies = namespace_dependencies(data);
    let mut violations = Vec::new();

    for (class, file) in &data.class_map {
        // Ownership lookup: bare namespace first, then with a trailing
        // separator. Classes owned by no tracked namespace are skipped.
        let bare = class.rsplit_once('\\').map(|(ns, _)| ns).unwrap_or("");
        let owner = if namespace_dependencies.contains_key(bare) {
            bare.to_string()
        } else {
            let with_separator = format!("{bare}\\");
            if !namespace_dependencies.contains_key(with_separator.as_str()) {
                continue;
            }
            with_separator
        };

        let allowed = &namespace_dependencies[owner.as_str()];

        for used in imported_namespaces(file, &data.namespaces)? {
            // A class may always use its own project's namespaces.
            let ok = used.starts_with(&owner) || allowed.iter().any(|dep| used.starts_with(dep));
            if ok {
                continue;
            }

            let violation = Violation {
                class: class.clone(),
                used_namespace: used,
            };

            if config.baseline.contains(&violation.message()) {
                continue;
            }

            violations.push(violation);
        }
    }

    Ok(violations)
}

/// Build the namespace to allowed-target-prefixes map from the graph data
fn namespace_dependencies(data: &ProjectData) -> HashMap<&str, Vec<&str>> {
    let mut map: HashMap<&str, Vec<&str>> = HashMap::new();

    for project in &data.projects {
        let Some(own) = data.autoload_by_project.get(project) else {
            continue;
        };
        let dependencies = data
            .dependencies_by_project
            .get(project)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for namespace in own {
            let allowed = map.entry(namespace.as_str()).or_default();
            for dependency in dependencies {
                if let Some(prefixes) = data.autoload_by_project.get(dependency) {
                    allowed.extend(prefixes.iter().map(String::as_str));
                }
            }
        }
    }

    map
}

/// Extract imported namespaces from a source file.
///
/// Line-oriented heuristic: capture lines starting with `use `, stop at the
/// first blank line once at least one import was seen. Each captured
/// statement is matched against the known namespace prefixes and truncated
/// at the first space (drops `as` aliases). Not a parser; imports appearing
/// after the first blank line are missed by design.
fn imported_namespaces(path: &Path, namespaces: &[String]) -> Result<Vec<String>, AuditError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut capturing = false;
    let mut used = Vec::new();

    for line in contents.lines() {
        if capturing && line.is_empty() {
            break;
        }

        let Some(rest) = line.strip_prefix("use ") else {
            continue;
        };
        capturing = true;

        let statement = rest.trim_end().trim_end_matches(';');
        for namespace in namespaces {
            if statement.starts_with(namespace.as_str()) {
                let leading = statement.split(' ').next().unwrap_or(statement);
                used.push(leading.to_string());
            }
        }
    }

    Ok(used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_imported_namespaces_basic() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "C.php",
            "<?php\nnamespace MonoRepo\\C;\nuse MonoRepo\\A\\A;\nuse MonoRepo\\B\\B as Alias;\n\nclass C {}\n",
        );

        let namespaces = vec!["MonoRepo\\A\\".to_string(), "MonoRepo\\B\\".to_string()];
        let used = imported_namespaces(&path, &namespaces).unwrap();

        assert_eq!(used, vec!["MonoRepo\\A\\A", "MonoRepo\\B\\B"]);
    }

    #[test]
    fn test_imports_after_blank_line_are_missed() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "C.php",
            "<?php\nuse MonoRepo\\A\\A;\n\nuse MonoRepo\\B\\B;\nclass C {}\n",
        );

        let namespaces = vec!["MonoRepo\\A\\".to_string(), "MonoRepo\\B\\".to_string()];
        let used = imported_namespaces(&path, &namespaces).unwrap();

        // The scan stops at the first blank line after imports begin.
        assert_eq!(used, vec!["MonoRepo\\A\\A"]);
    }

    #[test]
    fn test_unknown_prefixes_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "C.php",
            "<?php\nuse Psr\\Log\\LoggerInterface;\nuse MonoRepo\\A\\A;\n",
        );

        let namespaces = vec!["MonoRepo\\A\\".to_string()];
        let used = imported_namespaces(&path, &namespaces).unwrap();

        assert_eq!(used, vec!["MonoRepo\\A\\A"]);
    }

    #[test]
    fn test_violation_message_format() {
        let violation = Violation {
            class: "MonoRepo\\C\\C".to_string(),
            used_namespace: "MonoRepo\\A\\A".to_string(),
        };

        assert_eq!(
            violation.message(),
            "Class \"MonoRepo\\C\\C\" uses \"MonoRepo\\A\\A\" but it is not declared as dependency."
        );
    }
}
