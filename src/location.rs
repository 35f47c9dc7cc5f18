//! Install location resolution
//!
//! The install location is either the working directory or a per-user
//! local data directory keyed by application name. Repeated runs with the
//! same configuration resolve to the same directory.

use crate::{PackError, PackResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory where the runtime, payload and auxiliary files are materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLocation {
    root: PathBuf,
}

impl InstallLocation {
    /// Use an explicit directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the install location for this run
    pub fn resolve(use_user_profile: bool, app_name: &str) -> PackResult<Self> {
        if !use_user_profile {
            let cwd = std::env::current_dir().map_err(|e| {
                PackError::LocationUnavailable(format!("Cannot read working directory: {}", e))
            })?;
            return Ok(Self::new(cwd));
        }

        Self::resolve_in(dirs::data_local_dir(), app_name)
    }

    /// Resolve below a user-local data directory, creating `<base>/<app_name>`
    pub fn resolve_in(base: Option<PathBuf>, app_name: &str) -> PackResult<Self> {
        let base = base.ok_or_else(|| {
            PackError::LocationUnavailable(
                "Platform does not report a user-local data directory".to_string(),
            )
        })?;

        if app_name.contains(['/', '\\']) || Path::new(app_name).file_name().is_none() {
            return Err(PackError::LocationUnavailable(format!(
                "Invalid application name: '{}'",
                app_name
            )));
        }

        let root = base.join(app_name);
        fs::create_dir_all(&root).map_err(|e| {
            PackError::LocationUnavailable(format!("Cannot create {}: {}", root.display(), e))
        })?;

        tracing::debug!("Using per-user install location: {}", root.display());
        Ok(Self::new(root))
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory receiving the extracted runtime
    pub fn runtime_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Destination of a payload or auxiliary file
    pub fn file_path(&self, name: &str) -> PathBuf {
        name.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}
