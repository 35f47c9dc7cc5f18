//! Launcher and pack configuration types
//!
//! [`LauncherConfig`] travels inside the overlay and drives the packed
//! executable at run time. [`PackConfig`] collects the pack-time inputs.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

// ============================================================================
// Default Value Functions
// ============================================================================

fn default_runtime_dir() -> String {
    "jre".to_string()
}

fn default_payload_name() -> String {
    "app.jar".to_string()
}

fn default_app_name() -> String {
    "jarpack-app".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Runtime Executable
// ============================================================================

/// Which runtime entry point to launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeExecutable {
    /// Console launcher (`java`)
    #[default]
    Java,
    /// Windowed launcher without a console (`javaw`)
    Javaw,
}

impl RuntimeExecutable {
    /// File name without extension
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Javaw => "javaw",
        }
    }

    /// Variant to fall back to when this one is missing from the archive
    pub fn fallback(&self) -> Option<Self> {
        match self {
            Self::Java => None,
            Self::Javaw => Some(Self::Java),
        }
    }

    /// Flag that makes the runtime execute the payload
    pub fn invocation_flag(&self) -> &'static str {
        "-jar"
    }
}

impl std::fmt::Display for RuntimeExecutable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base_name())
    }
}

// ============================================================================
// Extraction Check
// ============================================================================

/// How the launcher decides that the runtime is already extracted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionCheck {
    /// A marker file holding the runtime digest, written after full success
    #[default]
    Marker,
    /// The runtime directory merely exists
    Existence,
}

// ============================================================================
// Launcher Configuration
// ============================================================================

/// Configuration embedded in the packed executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Application name, used for the per-user install directory
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Preferred runtime executable
    #[serde(default)]
    pub executable: RuntimeExecutable,

    /// Install into the per-user local data directory instead of the working directory
    #[serde(default)]
    pub use_user_profile: bool,

    /// Directory below the install location that receives the runtime
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: String,

    /// File name of the payload inside the install location
    #[serde(default = "default_payload_name")]
    pub payload_name: String,

    /// Arguments passed to the runtime before the invocation flag
    #[serde(default)]
    pub runtime_args: Vec<String>,

    /// Idempotence signal for runtime extraction
    #[serde(default)]
    pub extraction_check: ExtractionCheck,

    /// Show a progress bar while extracting
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            executable: RuntimeExecutable::default(),
            use_user_profile: false,
            runtime_dir: default_runtime_dir(),
            payload_name: default_payload_name(),
            runtime_args: Vec::new(),
            extraction_check: ExtractionCheck::default(),
            show_progress: true,
        }
    }
}

impl LauncherConfig {
    /// Create a config for the given application name
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Set the preferred runtime executable
    pub fn with_executable(mut self, executable: RuntimeExecutable) -> Self {
        self.executable = executable;
        self
    }

    /// Toggle the per-user install location
    pub fn with_user_profile(mut self, enabled: bool) -> Self {
        self.use_user_profile = enabled;
        self
    }

    /// Set the runtime directory name
    pub fn with_runtime_dir(mut self, dir: impl Into<String>) -> Self {
        self.runtime_dir = dir.into();
        self
    }

    /// Set the payload file name
    pub fn with_payload_name(mut self, name: impl Into<String>) -> Self {
        self.payload_name = name.into();
        self
    }

    /// Set runtime arguments placed before the invocation flag
    pub fn with_runtime_args(mut self, args: Vec<String>) -> Self {
        self.runtime_args = args;
        self
    }

    /// Set the extraction idempotence check
    pub fn with_extraction_check(mut self, check: ExtractionCheck) -> Self {
        self.extraction_check = check;
        self
    }

    /// Toggle the extraction progress bar
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Whether `runtime_dir` names exactly one plain directory below the install location
    pub fn has_valid_runtime_dir(&self) -> bool {
        if self.runtime_dir.contains(['/', '\\']) {
            return false;
        }
        let mut components = Path::new(&self.runtime_dir).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }
}

// ============================================================================
// Pack Configuration
// ============================================================================

/// Inputs for building a packed executable
#[derive(Debug, Clone)]
pub struct PackConfig {
    /// Runtime configuration to embed
    pub launcher: LauncherConfig,
    /// Runtime zip archive
    pub runtime_archive: PathBuf,
    /// Payload file
    pub payload: PathBuf,
    /// Auxiliary files, directories or glob patterns
    pub files: Vec<PathBuf>,
    /// Output executable name (without extension)
    pub output_name: String,
    /// Output directory
    pub output_dir: PathBuf,
    /// Launcher binary to copy; defaults to the running executable
    pub base_executable: Option<PathBuf>,
}

impl PackConfig {
    /// Create a pack config; the payload name defaults to the payload's file name
    pub fn new(
        name: impl Into<String>,
        runtime_archive: impl AsRef<Path>,
        payload: impl AsRef<Path>,
    ) -> Self {
        let name = name.into();
        let payload = payload.as_ref().to_path_buf();
        let mut launcher = LauncherConfig::new(name.clone());
        if let Some(file_name) = payload.file_name() {
            launcher.payload_name = file_name.to_string_lossy().into_owned();
        }

        Self {
            launcher,
            runtime_archive: runtime_archive.as_ref().to_path_buf(),
            payload,
            files: Vec::new(),
            output_name: name,
            output_dir: PathBuf::from("."),
            base_executable: None,
        }
    }

    /// Replace the payload file
    ///
    /// A payload name derived from the previous payload's file name follows
    /// the new file; an explicitly chosen name is kept.
    pub fn with_payload(mut self, payload: impl Into<PathBuf>) -> Self {
        let payload = payload.into();
        let derived = self
            .payload
            .file_name()
            .is_some_and(|name| name.to_string_lossy() == self.launcher.payload_name);
        if derived {
            if let Some(file_name) = payload.file_name() {
                self.launcher.payload_name = file_name.to_string_lossy().into_owned();
            }
        }
        self.payload = payload;
        self
    }

    /// Add auxiliary files
    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files.extend(files);
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Copy this launcher binary instead of the running executable
    pub fn with_base_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_executable = Some(path.into());
        self
    }

    /// Replace the embedded launcher configuration
    pub fn with_launcher(mut self, launcher: LauncherConfig) -> Self {
        self.launcher = launcher;
        self
    }
}
