//! PMU - Mono-repository package management utility
//!
//! This crate manages a monorepository of interdependent Composer packages:
//! it discovers project manifests, builds the cross-project dependency
//! graph, propagates version constraints ("blend"), audits undeclared
//! imports and links projects as local path repositories.

pub mod audit;
pub mod blend;
pub mod composer;
pub mod config;
pub mod graph;
pub mod link;
pub mod manifest;

pub use audit::{audit, Violation};
pub use blend::{blend, BlendOptions, BlendReport};
pub use composer::{PackageManager, SystemComposer};
pub use config::{ConfigError, ProjectConfig};
pub use graph::{collect, CollectOptions, ProjectData};
pub use manifest::{DependencySection, Manifest, ManifestError};
