//! Project dependency graph collection
//!
//! Single-pass collector over the monorepo projects: autoload namespace
//! ownership, intra-repo dependency edges and (optionally) the class map.
//! Each project directory is visited exactly once per invocation regardless
//! of how many consumers need the data.

mod classmap;

pub use classmap::{ClassScanner, ScanError};

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::ProjectConfig;
use crate::manifest::{DependencySection, Manifest, ManifestError};

/// Errors for graph collection
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Options for [`collect`]
#[derive(Debug, Default)]
pub struct CollectOptions {
    /// Scan project directories for class declarations
    pub compute_class_map: bool,

    /// Include `require-dev` when building dependency edges
    pub include_dev: bool,

    /// Restrict collection to these projects (default: all configured)
    pub projects: Option<Vec<String>>,
}

/// Data collected over the monorepo projects
#[derive(Debug, Default)]
pub struct ProjectData {
    /// Projects in collection order
    pub projects: Vec<String>,

    /// Project name to its autoload namespace prefixes
    pub autoload_by_project: BTreeMap<String, Vec<String>>,

    /// Project name to the intra-repo projects it requires
    pub dependencies_by_project: BTreeMap<String, Vec<String>>,

    /// All namespace prefixes in collection order; duplicates are allowed
    pub namespaces: Vec<String>,

    /// Fully qualified class name to the file declaring it
    pub class_map: BTreeMap<String, PathBuf>,
}

impl ProjectData {
    /// Render the dependency edges in DOT format:
    /// `digraph D { "source" -> "target" ... }`
    pub fn to_dot(&self) -> String {
        let mut edges = String::new();
        for project in &self.projects {
            if let Some(dependencies) = self.dependencies_by_project.get(project) {
                for dependency in dependencies {
                    edges.push_str(&format!("\n    \"{project}\" -> \"{dependency}\""));
                }
            }
        }

        format!("digraph D {{{edges}\n}}")
    }
}

/// Collect autoload, dependency and class-map data over the projects.
///
/// Projects without a known manifest path are skipped silently. Class-map
/// entries are kept when the class name is prefixed by a namespace collected
/// so far and the file is not excluded by the config.
pub fn collect(config: &ProjectConfig, options: &CollectOptions) -> Result<ProjectData, GraphError> {
    let mut data = ProjectData::default();

    let scanner = if options.compute_class_map {
        Some(ClassScanner::new()?)
    } else {
        None
    };

    let projects = options
        .projects
        .clone()
        .unwrap_or_else(|| config.projects.clone());

    for project in &projects {
        let Some(path) = config.manifest_files.get(project) else {
            continue;
        };

        let manifest = Manifest::read(path)?;

        let prefixes = manifest.autoload_prefixes();
        data.namespaces.extend(prefixes.iter().cloned());
        data.autoload_by_project.insert(project.clone(), prefixes);

        let mut dependencies = Vec::new();
        let sections: &[DependencySection] = if options.include_dev {
            &[DependencySection::Require, DependencySection::RequireDev]
        } else {
            &[DependencySection::Require]
        };
        for section in sections {
            for name in manifest.dependency_names(*section) {
                // Self-references are kept as-is; the graph does not
                // special-case a project requiring itself.
                if config.projects.contains(&name) && !dependencies.contains(&name) {
                    dependencies.push(name);
                }
            }
        }
        data.dependencies_by_project
            .insert(project.clone(), dependencies);

        if let Some(scanner) = &scanner {
            let Some(project_dir) = path.parent() else {
                continue;
            };

            for (class, file) in scanner.scan_dir(project_dir)? {
                if !data.namespaces.iter().any(|ns| class.starts_with(ns)) {
                    continue;
                }
                if config.is_excluded(&file) {
                    continue;
                }
                data.class_map.insert(class, file);
            }
        }

        data.projects.push(project.clone());
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_rendering() {
        let mut data = ProjectData::default();
        data.projects = vec!["test/a".to_string(), "test/c".to_string()];
        data.dependencies_by_project
            .insert("test/a".to_string(), vec!["test/b".to_string()]);
        data.dependencies_by_project
            .insert("test/c".to_string(), vec!["test/b".to_string()]);

        let dot = data.to_dot();
        let flat: String = dot.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(
            flat,
            "digraph D { \"test/a\" -> \"test/b\" \"test/c\" -> \"test/b\" }"
        );
    }

    #[test]
    fn test_dot_rendering_empty() {
        let data = ProjectData::default();
        assert_eq!(data.to_dot(), "digraph D {\n}");
    }
}
