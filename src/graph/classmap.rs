//! Static class-declaration scanner
//!
//! Walks a project directory and extracts fully qualified class names from
//! PHP sources with a line-oriented scan. This is not a parser: it only
//! recognizes `namespace X;` and `class|interface|trait|enum Name`
//! declarations at the start of a line.

use regex_lite::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Errors for class scanning
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to read source file \"{path}\": {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid scanner pattern: {0}")]
    Pattern(#[from] regex_lite::Error),
}

/// Extracts class declarations from a directory tree
#[derive(Debug)]
pub struct ClassScanner {
    namespace_re: Regex,
    class_re: Regex,
}

impl ClassScanner {
    pub fn new() -> Result<Self, ScanError> {
        Ok(Self {
            namespace_re: Regex::new(r"^namespace\s+([A-Za-z_][A-Za-z0-9_\\]*)\s*;")?,
            class_re: Regex::new(
                r"^\s*(?:(?:final|abstract|readonly)\s+)*(?:class|interface|trait|enum)\s+([A-Za-z_][A-Za-z0-9_]*)",
            )?,
        })
    }

    /// Scan a directory for class declarations, returning
    /// (fully-qualified-class-name, file) pairs in path order.
    pub fn scan_dir(&self, dir: &Path) -> Result<Vec<(String, PathBuf)>, ScanError> {
        let mut classes = Vec::new();

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "php"));

        for entry in walker {
            for class in self.scan_file(entry.path())? {
                classes.push((class, entry.path().to_path_buf()));
            }
        }

        Ok(classes)
    }

    /// Scan a single file for class declarations
    pub fn scan_file(&self, path: &Path) -> Result<Vec<String>, ScanError> {
        let bytes = std::fs::read(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let contents = String::from_utf8_lossy(&bytes);

        let mut namespace: Option<String> = None;
        let mut classes = Vec::new();

        for line in contents.lines() {
            if let Some(captures) = self.namespace_re.captures(line) {
                namespace = Some(captures[1].to_string());
                continue;
            }

            if let Some(captures) = self.class_re.captures(line) {
                let name = &captures[1];
                let fqcn = match &namespace {
                    Some(ns) => format!("{ns}\\{name}"),
                    None => name.to_string(),
                };
                classes.push(fqcn);
            }
        }

        Ok(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scanner() -> ClassScanner {
        ClassScanner::new().unwrap()
    }

    #[test]
    fn test_scan_file_with_namespace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.php");
        fs::write(
            &path,
            "<?php\n\nnamespace MonoRepo\\A;\n\nclass A {\n}\n",
        )
        .unwrap();

        assert_eq!(scanner().scan_file(&path).unwrap(), vec!["MonoRepo\\A\\A"]);
    }

    #[test]
    fn test_scan_file_modifiers_and_kinds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Kinds.php");
        fs::write(
            &path,
            concat!(
                "<?php\n",
                "namespace MonoRepo\\K;\n",
                "final class Final1 {}\n",
                "abstract class Abstract1 {}\n",
                "interface Iface {}\n",
                "trait Mixin {}\n",
                "enum Kind {}\n",
            ),
        )
        .unwrap();

        let classes = scanner().scan_file(&path).unwrap();
        assert_eq!(
            classes,
            vec![
                "MonoRepo\\K\\Final1",
                "MonoRepo\\K\\Abstract1",
                "MonoRepo\\K\\Iface",
                "MonoRepo\\K\\Mixin",
                "MonoRepo\\K\\Kind"
            ]
        );
    }

    #[test]
    fn test_scan_file_without_namespace_uses_bare_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Plain.php");
        fs::write(&path, "<?php\nclass Plain {}\n").unwrap();

        assert_eq!(scanner().scan_file(&path).unwrap(), vec!["Plain"]);
    }

    #[test]
    fn test_scan_dir_ignores_non_php_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.php"), "<?php\nnamespace N;\nclass A {}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "class NotAClass {}\n").unwrap();

        let classes = scanner().scan_dir(dir.path()).unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].0, "N\\A");
    }
}
