//! Main packer implementation

use crate::bundle::BundleBuilder;
use crate::discovery::{self, ExecutableLocation};
use crate::overlay::{OverlayData, OverlayReader, OverlayWriter};
use crate::progress::{self, ProgressExt};
use crate::{PackConfig, PackError, PackResult};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Result of a pack operation
#[derive(Debug)]
pub struct PackOutput {
    /// Path to the generated executable
    pub executable: PathBuf,
    /// Size of the executable in bytes
    pub size: u64,
    /// Number of embedded resources
    pub resource_count: usize,
    /// Content hash recorded in the overlay
    pub content_hash: String,
    /// Runtime executable found in the archive at pack time
    pub runtime_executable: ExecutableLocation,
}

/// Main packer for creating self-extracting launchers
pub struct Packer {
    config: PackConfig,
}

impl Packer {
    /// Create a new packer with configuration
    pub fn new(config: PackConfig) -> Self {
        Self { config }
    }

    /// Pack the runtime, payload and files into a standalone executable
    ///
    /// This copies the launcher executable (without any overlay it already
    /// carries) and appends the launcher configuration and resources.
    pub fn pack(&self) -> PackResult<PackOutput> {
        self.validate()?;
        fs::create_dir_all(&self.config.output_dir)?;

        let visible = self.config.launcher.show_progress && progress::stderr_is_terminal();
        let pb = progress::spinner("Collecting resources", visible);

        let bundle = match BundleBuilder::new(&self.config.runtime_archive, &self.config.payload)
            .payload_name(self.config.launcher.payload_name.clone())
            .files(&self.config.files)
            .build()
        {
            Ok(bundle) => bundle,
            Err(e) => {
                pb.finish_error("Failed to collect resources");
                return Err(e);
            }
        };

        // Fail at pack time rather than on the user's machine
        let runtime_executable = match discovery::locate_in_archive(
            &bundle.runtime_archive().content,
            self.config.launcher.executable,
        ) {
            Ok(location) => location,
            Err(e) => {
                pb.finish_error("No runtime executable in archive");
                return Err(e);
            }
        };
        tracing::info!(
            "Runtime executable: {} (root prefix: {})",
            runtime_executable.relative_path,
            runtime_executable.root_prefix.as_deref().unwrap_or("<none>")
        );

        let output_path = self.config.output_dir.join(self.get_exe_name());
        let base = match self.config.base_executable {
            Some(ref path) => path.clone(),
            None => std::env::current_exe()?,
        };
        tracing::info!("Packing to: {}", output_path.display());
        copy_launcher(&base, &output_path)?;

        let resource_count = bundle.len();
        let overlay = OverlayData::new(self.config.launcher.clone(), bundle);
        OverlayWriter::write(&output_path, &overlay)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&output_path, fs::Permissions::from_mode(0o755))?;
        }

        let size = fs::metadata(&output_path)?.len();
        pb.finish_success(&format!("Packed {}", output_path.display()));

        tracing::info!(
            "Pack complete: {} ({:.2} MB, {} resources)",
            output_path.display(),
            size as f64 / (1024.0 * 1024.0),
            resource_count
        );

        Ok(PackOutput {
            executable: output_path,
            size,
            resource_count,
            content_hash: overlay.content_hash,
            runtime_executable,
        })
    }

    fn validate(&self) -> PackResult<()> {
        let launcher = &self.config.launcher;

        if self.config.output_name.trim().is_empty() {
            return Err(PackError::Config("Output name must not be empty".to_string()));
        }
        if launcher.app_name.trim().is_empty() {
            return Err(PackError::Config("Application name must not be empty".to_string()));
        }
        if !launcher.has_valid_runtime_dir() {
            return Err(PackError::Config(format!(
                "Invalid runtime directory name: '{}'",
                launcher.runtime_dir
            )));
        }
        if launcher.payload_name.trim().is_empty() {
            return Err(PackError::Config("Payload name must not be empty".to_string()));
        }
        if !self.config.runtime_archive.is_file() {
            return Err(PackError::Config(format!(
                "Runtime archive not found: {}",
                self.config.runtime_archive.display()
            )));
        }
        if !self.config.payload.is_file() {
            return Err(PackError::Config(format!(
                "Payload not found: {}",
                self.config.payload.display()
            )));
        }

        Ok(())
    }

    /// Get the output executable name with platform extension
    fn get_exe_name(&self) -> String {
        #[cfg(target_os = "windows")]
        {
            format!("{}.exe", self.config.output_name)
        }
        #[cfg(not(target_os = "windows"))]
        {
            self.config.output_name.clone()
        }
    }
}

/// Copy the launcher's own bytes, leaving behind any overlay it carries
fn copy_launcher(base: &Path, output: &Path) -> PackResult<()> {
    if let (Ok(a), Ok(b)) = (base.canonicalize(), output.canonicalize()) {
        if a == b {
            return Err(PackError::Config(format!(
                "Output would overwrite the launcher itself: {}",
                output.display()
            )));
        }
    }

    let original_size = OverlayReader::original_size(base)?;
    let mut src = File::open(base)?;
    let mut dst = File::create(output)?;

    match original_size {
        Some(len) => {
            tracing::debug!("Dropping existing overlay from {}", base.display());
            io::copy(&mut (&mut src).take(len), &mut dst)?;
        }
        None => {
            io::copy(&mut src, &mut dst)?;
        }
    }

    dst.sync_all()?;
    Ok(())
}
