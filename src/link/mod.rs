//! Local-path linking of monorepo projects
//!
//! Computes the transitive closure of intra-repo dependencies starting from
//! the invoking project, marks every reachable dependency as `@dev`, appends
//! path repositories for all known projects and runs the package manager's
//! `update` inside the invoking directory. All modified manifests are backed
//! up first and restored afterwards, whether the update succeeds or not.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::composer::PackageManager;
use crate::config::ProjectConfig;
use crate::manifest::{DependencySection, Manifest, ManifestError};

/// Errors for link runs
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Failed to back up \"{path}\": {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to run the package manager: {0}")]
    PackageManager(#[from] std::io::Error),
}

/// Result of a link run
#[derive(Debug)]
pub struct LinkReport {
    /// Manifest files that were temporarily rewritten
    pub written_files: Vec<PathBuf>,

    /// Exit code of the package manager's `update`
    pub update_exit: i32,
}

/// Manifests read during closure computation, scoped to one invocation
type ManifestCache = BTreeMap<PathBuf, Manifest>;

fn read_cached<'a>(
    cache: &'a mut ManifestCache,
    path: &Path,
) -> Result<&'a Manifest, ManifestError> {
    match cache.entry(path.to_path_buf()) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => Ok(entry.insert(Manifest::read(path)?)),
    }
}

/// Restores backups when dropped, so the revert runs on success, failure and
/// panic alike.
struct RestoreGuard {
    pairs: Vec<(PathBuf, PathBuf)>,
}

impl RestoreGuard {
    fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    fn backup(&mut self, file: &Path) -> Result<(), LinkError> {
        let backup = file.with_file_name("composer.bak.json");
        fs::copy(file, &backup).map_err(|source| LinkError::Backup {
            path: file.to_path_buf(),
            source,
        })?;
        self.pairs.push((file.to_path_buf(), backup));
        Ok(())
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        for (file, backup) in self.pairs.drain(..) {
            let _ = fs::rename(&backup, &file);
        }
    }
}

/// Link the invoking project against the monorepo and run `update`.
pub fn link(
    config: &ProjectConfig,
    invoking_manifest_path: &Path,
    package_manager: &dyn PackageManager,
) -> Result<LinkReport, LinkError> {
    let mut cache = ManifestCache::new();
    read_cached(&mut cache, invoking_manifest_path)?;

    let mut require = Vec::new();
    let mut require_dev = Vec::new();
    map_dependencies(
        &mut cache,
        invoking_manifest_path,
        config,
        DependencySection::Require,
        &mut require,
    )?;
    map_dependencies(
        &mut cache,
        invoking_manifest_path,
        config,
        DependencySection::RequireDev,
        &mut require_dev,
    )?;

    let mut files_to_write: Vec<PathBuf> = Vec::new();

    if let Some(invoking) = cache.get_mut(invoking_manifest_path) {
        for dependency in &require {
            invoking.set_dependency(DependencySection::Require, dependency, "@dev");
        }
        for dependency in &require_dev {
            invoking.set_dependency(DependencySection::RequireDev, dependency, "@dev");
        }
    }

    for dependency in require.iter().chain(require_dev.iter()) {
        for path in config.manifest_files.values() {
            // Only manifests already read during closure computation are
            // candidates; anything else never mentions this dependency.
            let Some(manifest) = cache.get_mut(path.as_path()) else {
                continue;
            };

            let mut touched = false;
            for section in DependencySection::both() {
                if manifest.has_dependency(section, dependency) {
                    manifest.set_dependency(section, dependency, "@dev");
                    touched = true;
                }
            }

            if touched && !files_to_write.contains(path) {
                files_to_write.push(path.clone());
            }
        }
    }

    let repositories: Vec<serde_json::Value> = config
        .manifest_files
        .values()
        .filter_map(|path| path.parent())
        .map(|dir| json!({ "type": "path", "url": dir.to_string_lossy() }))
        .collect();

    if let Some(invoking) = cache.get_mut(invoking_manifest_path) {
        invoking.append_repositories(repositories);
    }

    if !files_to_write.contains(&invoking_manifest_path.to_path_buf()) {
        files_to_write.push(invoking_manifest_path.to_path_buf());
    }

    let mut guard = RestoreGuard::new();
    for file in &files_to_write {
        guard.backup(file)?;
        if let Some(manifest) = cache.get(file) {
            manifest.write(file)?;
        }
    }

    let invoking_dir = invoking_manifest_path
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let update_exit = package_manager.run(&invoking_dir, &["update".to_string()])?;

    // Guard drops here, restoring every backup.
    drop(guard);

    Ok(LinkReport {
        written_files: files_to_write,
        update_exit,
    })
}

/// Walk a dependency section transitively through the monorepo projects,
/// collecting reachable project names. `seen` doubles as the visited set, so
/// cycles terminate.
fn map_dependencies(
    cache: &mut ManifestCache,
    manifest_path: &Path,
    config: &ProjectConfig,
    section: DependencySection,
    seen: &mut Vec<String>,
) -> Result<(), ManifestError> {
    let names = read_cached(cache, manifest_path)?.dependency_names(section);

    for name in names {
        let Some(next_path) = config.manifest_files.get(&name) else {
            continue;
        };

        if seen.contains(&name) {
            continue;
        }
        seen.push(name);

        let next_path = next_path.clone();
        map_dependencies(cache, &next_path, config, section, seen)?;
    }

    Ok(())
}
