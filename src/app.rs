//! Packed application runtime
//!
//! Drives a packed executable from start to exit:
//! resolve location → discover executable → extract (if needed) → launch.

use crate::config::LauncherConfig;
use crate::discovery::{self, ExecutableLocation};
use crate::extract::{ExtractionReport, Extractor};
use crate::launcher::{self, LaunchSpec};
use crate::location::InstallLocation;
use crate::metrics::LaunchMetrics;
use crate::overlay::{OverlayData, OverlayReader};
use crate::{PackResult, ResourceBundle};
use std::ffi::OsString;
use std::path::Path;
use std::process::ExitStatus;

/// A launcher configuration together with its embedded resources
#[derive(Debug, Clone)]
pub struct PackedApp {
    config: LauncherConfig,
    bundle: ResourceBundle,
}

impl PackedApp {
    /// Create from configuration and bundle
    pub fn new(config: LauncherConfig, bundle: ResourceBundle) -> Self {
        Self { config, bundle }
    }

    /// Load from an executable's overlay; `None` if it carries none
    pub fn from_executable(path: &Path) -> PackResult<Option<Self>> {
        Ok(OverlayReader::read(path)?.map(Self::from))
    }

    /// Load from the running executable's overlay
    pub fn from_current_exe() -> PackResult<Option<Self>> {
        let exe_path = std::env::current_exe()?;
        Self::from_executable(&exe_path)
    }

    /// Launcher configuration
    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Embedded resources
    pub fn bundle(&self) -> &ResourceBundle {
        &self.bundle
    }

    /// Find the runtime executable inside the embedded archive
    pub fn discover(&self) -> PackResult<ExecutableLocation> {
        discovery::locate_in_archive(
            &self.bundle.runtime_archive().content,
            self.config.executable,
        )
    }

    /// Discover and extract into `location`, returning the launch spec
    pub fn prepare(
        &self,
        location: &InstallLocation,
        args: Vec<OsString>,
    ) -> PackResult<(LaunchSpec, ExtractionReport)> {
        let executable = self.discover()?;
        let report =
            Extractor::new(location, &self.config).ensure_extracted(&self.bundle, &executable)?;
        let spec = LaunchSpec::new(location, &self.config, &executable, args);
        Ok((spec, report))
    }

    /// Run in a given install location
    pub fn run_in(
        &self,
        location: &InstallLocation,
        args: Vec<OsString>,
    ) -> PackResult<ExitStatus> {
        let mut metrics = LaunchMetrics::new();

        let executable = metrics.time_phase("discover", || self.discover())?;
        let extractor = Extractor::new(location, &self.config);
        let report = metrics.time_phase("extract", || {
            extractor.ensure_extracted(&self.bundle, &executable)
        })?;
        if report.wrote_anything() {
            tracing::info!(
                "Install location ready: {} ({} runtime entries, {} files written, {} kept)",
                location.root().display(),
                report.entries_written,
                report.files_written,
                report.files_skipped
            );
        }

        let spec = LaunchSpec::new(location, &self.config, &executable, args);
        metrics.log();

        launcher::run(&spec)
    }

    /// Resolve the install location from the configuration and run
    pub fn run(&self, args: Vec<OsString>) -> PackResult<ExitStatus> {
        let location =
            InstallLocation::resolve(self.config.use_user_profile, &self.config.app_name)?;
        tracing::debug!("Install location: {}", location.root().display());
        self.run_in(&location, args)
    }
}

impl From<OverlayData> for PackedApp {
    fn from(data: OverlayData) -> Self {
        Self::new(data.config, data.bundle)
    }
}
