//! External package-manager boundary
//!
//! Everything that actually installs or resolves packages lives behind the
//! [`PackageManager`] trait: the real implementation shells out to the
//! `composer` binary, tests substitute a recording stub.

use std::io;
use std::path::Path;
use std::process::Command;

/// Runs package-manager commands inside a project directory
pub trait PackageManager {
    /// Run a command with the given arguments, returning its exit code
    fn run(&self, dir: &Path, args: &[String]) -> io::Result<i32>;
}

/// Shells out to the `composer` binary
#[derive(Debug, Clone)]
pub struct SystemComposer {
    binary: String,
}

impl SystemComposer {
    pub fn new() -> Self {
        Self {
            binary: "composer".to_string(),
        }
    }

    /// Use a different binary name or path
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for SystemComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageManager for SystemComposer {
    fn run(&self, dir: &Path, args: &[String]) -> io::Result<i32> {
        let status = Command::new(&self.binary)
            .args(args)
            .current_dir(dir)
            .status()?;

        // Terminated by signal: report as a generic failure code.
        Ok(status.code().unwrap_or(1))
    }
}
