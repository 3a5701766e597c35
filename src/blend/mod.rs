//! Constraint and pointer propagation into project manifests
//!
//! Two mutually exclusive modes, selected by the presence of a JSON pointer:
//! constraint propagation copies the root manifest's dependency constraints
//! into each project, pointer mode writes one value at an arbitrary address
//! in every project manifest. Both rewrite each manifest file fully before
//! the next one is touched.

mod pointer;

pub use pointer::split as split_pointer;

use serde_json::Value;
use std::path::Path;

use crate::config::ProjectConfig;
use crate::manifest::{DependencySection, Manifest, ManifestError};

/// Errors that abort the whole blend command
#[derive(Debug, thiserror::Error)]
pub enum BlendError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Node \"{pointer}\" not found.")]
    PointerNotFound { pointer: String },
}

/// Options for [`blend`]
#[derive(Debug, Default)]
pub struct BlendOptions {
    /// Blend `require-dev` instead of `require`
    pub dev: bool,

    /// Blend both `require` and `require-dev`
    pub all: bool,

    /// Restrict targets to projects that require the monorepo package
    /// itself; with `value`, overwrite their intra-repo constraints
    pub self_only: bool,

    /// Dot-delimited pointer selecting pointer mode
    pub json_path: Option<String>,

    /// Literal value to write instead of resolving from the root manifest
    pub value: Option<String>,

    /// Write dependencies the target does not declare, and create missing
    /// pointer segments
    pub force: bool,

    /// Explicit target subset (empty: all configured projects)
    pub projects: Vec<String>,
}

/// Per-project notices and the overall status of a blend run
#[derive(Debug, Default)]
pub struct BlendReport {
    /// Human-readable skip/failure notices, in occurrence order
    pub messages: Vec<String>,

    /// Whether any per-project failure occurred
    pub failed: bool,
}

impl BlendReport {
    fn notice(&mut self, message: String) {
        self.messages.push(message);
    }

    fn failure(&mut self, message: String) {
        self.messages.push(message);
        self.failed = true;
    }
}

/// Blend the root manifest into the configured projects.
///
/// Per-project failures are reported in the returned [`BlendReport`] and do
/// not stop the remaining projects.
pub fn blend(
    config: &ProjectConfig,
    root: &Manifest,
    options: &BlendOptions,
) -> Result<BlendReport, BlendError> {
    if let Some(json_path) = &options.json_path {
        blend_pointer(config, root, options, json_path)
    } else {
        blend_constraints(config, root, options)
    }
}

/// The dependency sections selected by the `dev`/`all` flags
fn sections(options: &BlendOptions) -> Vec<DependencySection> {
    if options.all {
        DependencySection::both().to_vec()
    } else if options.dev {
        vec![DependencySection::RequireDev]
    } else {
        vec![DependencySection::Require]
    }
}

fn blend_constraints(
    config: &ProjectConfig,
    root: &Manifest,
    options: &BlendOptions,
) -> Result<BlendReport, BlendError> {
    let mut report = BlendReport::default();
    report_unknown_targets(config, options, &mut report);

    let sections = sections(options);

    for project in &config.projects {
        if !options.projects.is_empty() && !options.projects.contains(project) {
            continue;
        }

        let Some(path) = config.manifest_files.get(project) else {
            report.failure(format!("Package \"{project}\" could not be found."));
            continue;
        };

        if !project_dir_exists(path) {
            report.notice(format!(
                "Package \"{project}\" could not be found at path \"{}\".",
                path.parent().unwrap_or(Path::new("")).display()
            ));
            continue;
        }

        let mut target = Manifest::read(path)?;

        if options.self_only && !references_root(&target, root) {
            continue;
        }

        let changed = if options.self_only && options.value.is_some() {
            let value = options.value.as_deref().unwrap_or_default();
            override_intra_repo(config, &mut target, &sections, value)
        } else {
            propagate_constraints(root, &mut target, &sections, options.force)
        };

        if !changed {
            continue;
        }

        if let Err(e) = target.write(path) {
            report.failure(e.to_string());
        }
    }

    Ok(report)
}

fn blend_pointer(
    config: &ProjectConfig,
    root: &Manifest,
    options: &BlendOptions,
    json_path: &str,
) -> Result<BlendReport, BlendError> {
    let mut report = BlendReport::default();
    report_unknown_targets(config, options, &mut report);

    let segments = pointer::split(json_path);

    let value = match &options.value {
        Some(literal) => Value::String(literal.clone()),
        None => pointer::resolve(root.doc(), &segments)
            .cloned()
            .ok_or_else(|| BlendError::PointerNotFound {
                pointer: json_path.to_string(),
            })?,
    };

    for project in &config.projects {
        if !options.projects.is_empty() && !options.projects.contains(project) {
            continue;
        }

        let Some(path) = config.manifest_files.get(project) else {
            report.failure(format!("Package \"{project}\" could not be found."));
            continue;
        };

        if !project_dir_exists(path) {
            report.notice(format!(
                "Package \"{project}\" could not be found at path \"{}\".",
                path.parent().unwrap_or(Path::new("")).display()
            ));
            continue;
        }

        let mut target = Manifest::read(path)?;

        if let Err(segment) = pointer::assign(target.doc_mut(), &segments, &value, options.force) {
            // The target is discarded; only this project's update is lost.
            report.failure(format!(
                "Package \"{project}\" has no pointer \"{segment}\"."
            ));
            continue;
        }

        if let Err(e) = target.write(path) {
            report.failure(e.to_string());
        }
    }

    Ok(report)
}

/// Report explicitly requested projects that are not part of the monorepo
fn report_unknown_targets(
    config: &ProjectConfig,
    options: &BlendOptions,
    report: &mut BlendReport,
) {
    for requested in &options.projects {
        if !config.projects.contains(requested) {
            report.failure(format!("Package \"{requested}\" could not be found."));
        }
    }
}

fn project_dir_exists(manifest_path: &Path) -> bool {
    manifest_path.parent().is_some_and(Path::is_dir)
}

/// Whether a project manifest requires the monorepo package itself
fn references_root(target: &Manifest, root: &Manifest) -> bool {
    let Some(root_name) = root.name() else {
        return false;
    };

    DependencySection::both()
        .iter()
        .any(|s| target.has_dependency(*s, root_name))
}

/// Copy root constraints into the target; only already-declared dependencies
/// are updated unless `force` is set. Returns whether anything changed.
fn propagate_constraints(
    root: &Manifest,
    target: &mut Manifest,
    sections: &[DependencySection],
    force: bool,
) -> bool {
    let mut changed = false;

    for section in sections {
        let Some(source) = root.section(*section) else {
            continue;
        };

        for (name, constraint) in source {
            let Some(constraint) = constraint.as_str() else {
                continue;
            };

            if !force && !target.has_dependency(*section, name) {
                continue;
            }

            if target.constraint(*section, name) != Some(constraint) {
                target.set_dependency(*section, name, constraint);
                changed = true;
            }
        }
    }

    changed
}

/// Overwrite the target's intra-repo dependency entries with a literal value
fn override_intra_repo(
    config: &ProjectConfig,
    target: &mut Manifest,
    sections: &[DependencySection],
    value: &str,
) -> bool {
    let mut changed = false;

    for section in sections {
        for name in target.dependency_names(*section) {
            if !config.manifest_files.contains_key(&name) {
                continue;
            }

            if target.constraint(*section, &name) != Some(value) {
                target.set_dependency(*section, &name, value);
                changed = true;
            }
        }
    }

    changed
}
