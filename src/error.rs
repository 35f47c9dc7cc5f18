//! Error types for jarpack

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type for pack and launch operations
pub type PackResult<T> = Result<T, PackError>;

/// Errors that can occur while packing or launching
#[derive(Error, Debug)]
pub enum PackError {
    /// The runtime archive has no recognizable entry point
    #[error("Runtime executable '{executable}' not found in runtime archive")]
    ExecutableNotFound {
        /// Executable variant that was searched for
        executable: String,
    },

    /// The install location could not be determined
    #[error("Install location unavailable: {0}")]
    LocationUnavailable(String),

    /// Writing the runtime, payload or auxiliary files failed
    #[error("Extraction failed at {}: {source}", path.display())]
    ExtractionFailed {
        /// Path being created or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The runtime executable could not be started
    #[error("Failed to launch {}: {source}", executable.display())]
    LaunchFailed {
        /// Executable that was spawned
        executable: PathBuf,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The runtime ran but exited unsuccessfully
    #[error("Runtime exited with {status}")]
    ChildProcessFailed {
        /// Exit status of the runtime process
        status: ExitStatus,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Overlay format error
    #[error("Invalid overlay format: {0}")]
    InvalidOverlay(String),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// Bundle error
    #[error("Bundle error: {0}")]
    Bundle(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PackError {
    /// Wrap an I/O error raised while materializing `path`
    pub fn extraction(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ExtractionFailed {
            path: path.into(),
            source,
        }
    }

    /// Name of the stage that failed, for user-facing messages
    pub fn stage(&self) -> &'static str {
        match self {
            Self::ExecutableNotFound { .. } => "discovery",
            Self::LocationUnavailable(_) => "install location",
            Self::ExtractionFailed { .. } => "extraction",
            Self::LaunchFailed { .. } => "launch",
            Self::ChildProcessFailed { .. } => "runtime",
            Self::InvalidOverlay(_) | Self::Compression(_) => "overlay",
            Self::Bundle(_) | Self::Zip(_) => "bundle",
            Self::Config(_) | Self::TomlParse(_) | Self::Json(_) => "configuration",
            Self::Io(_) => "io",
        }
    }
}
