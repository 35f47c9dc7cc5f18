//! jarpack - Self-Extracting Launchers for Java Applications
//!
//! This crate turns a runtime archive (a zipped JRE or JDK), an application
//! payload (`app.jar`) and optional extra files into **one executable**.
//!
//! # Design
//!
//! Instead of generating and compiling launcher source code, jarpack uses a
//! **self-replicating approach**:
//!
//! 1. The `jarpack` binary is itself a complete launcher
//! 2. During `pack`, it copies itself and appends configuration + resources as overlay data
//! 3. On startup, a packed copy detects the overlay and behaves as the application
//!
//! # Launch Sequence
//!
//! ```text
//! resolve install location    working directory, or <local data dir>/<app name>
//!   -> discover executable    find bin/java inside the runtime archive
//!   -> extract (first run)    <install>/jre/..., <install>/app.jar, extra files
//!   -> launch                 jre/bin/java -jar app.jar <forwarded args...>
//! ```
//!
//! The packed executable exits with the runtime's exit status.
//!
//! # Quick Start
//!
//! ```bash
//! jarpack pack --name my-app --jar app.jar --jre jdk-21.zip -f config.json -o dist
//! ./dist/my-app --config x.properties
//! ```
//!
//! # Overlay Format
//!
//! ```text
//! [jarpack executable]
//! [Overlay Data]
//!   - Magic: "JPAK" (4 bytes)
//!   - Version: u32 (4 bytes)
//!   - Config Length: u64 (8 bytes)
//!   - Resources Length: u64 (8 bytes)
//!   - Config JSON (compressed)
//!   - Resources Archive (tar.zstd)
//! [Footer]
//!   - Overlay Offset: u64 (8 bytes)
//!   - Magic: "JPAK" (4 bytes)
//! ```

mod app;
mod bundle;
mod config;
pub mod discovery;
mod error;
mod extract;
pub mod launcher;
mod location;
mod manifest;
mod metrics;
mod overlay;
mod packer;
pub mod progress;

// Re-export public API
pub use app::PackedApp;
pub use bundle::{BundleBuilder, Resource, ResourceBundle, ResourceKind};
pub use config::{ExtractionCheck, LauncherConfig, PackConfig, RuntimeExecutable};
pub use discovery::{locate, locate_in_archive, ExecutableLocation};
pub use error::{PackError, PackResult};
pub use extract::{ExtractionReport, Extractor, EXTRACTION_MARKER};
pub use launcher::LaunchSpec;
pub use location::InstallLocation;
pub use manifest::{
    BuildSection, FilesSection, InstallSection, Manifest, PackageSection, PayloadSection,
    RuntimeSection,
};
pub use metrics::LaunchMetrics;
pub use overlay::{OverlayData, OverlayReader, OverlayWriter, OVERLAY_MAGIC, OVERLAY_VERSION};
pub use packer::{PackOutput, Packer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if the current executable has overlay data (is a packed launcher)
pub fn is_packed() -> bool {
    let exe_path = match std::env::current_exe() {
        Ok(p) => p,
        Err(_) => return false,
    };
    OverlayReader::has_overlay(&exe_path).unwrap_or(false)
}
