//! Manifest file parser for jarpack
//!
//! A `jarpack.toml` manifest describes a pack declaratively:
//!
//! ```toml
//! [package]
//! name = "my-app"
//!
//! [runtime]
//! archive = "./jdk-21.zip"
//! executable = "javaw"          # "java" | "javaw"
//! args = ["-Xmx512m"]
//!
//! [payload]
//! path = "./target/app.jar"
//! # name = "app.jar"           # name inside the install location
//!
//! [files]
//! include = ["config.json", "assets/", "conf/*.properties"]
//!
//! [install]
//! user_profile = true           # install into the per-user data directory
//! runtime_dir = "jre"
//! check = "marker"              # "marker" | "existence"
//! progress = true
//!
//! [build]
//! out_dir = "./dist"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use crate::config::{ExtractionCheck, PackConfig, RuntimeExecutable};
use crate::{PackError, PackResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Candidate manifest file names, in lookup order
const MANIFEST_NAMES: &[&str] = &["jarpack.toml", ".jarpack/pack.toml"];

/// Top-level manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Package identity
    pub package: PackageSection,
    /// Runtime archive settings
    pub runtime: RuntimeSection,
    /// Payload settings
    pub payload: PayloadSection,
    /// Auxiliary files
    #[serde(default)]
    pub files: FilesSection,
    /// Install behavior
    #[serde(default)]
    pub install: InstallSection,
    /// Build output
    #[serde(default)]
    pub build: BuildSection,
}

/// `[package]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Application and output name
    pub name: String,
}

/// `[runtime]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSection {
    /// Runtime zip archive
    pub archive: PathBuf,
    /// Preferred runtime executable
    #[serde(default)]
    pub executable: RuntimeExecutable,
    /// Arguments placed before `-jar`
    #[serde(default)]
    pub args: Vec<String>,
}

/// `[payload]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadSection {
    /// Payload file
    pub path: PathBuf,
    /// File name inside the install location
    #[serde(default)]
    pub name: Option<String>,
}

/// `[files]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesSection {
    /// Files, directories or glob patterns
    #[serde(default)]
    pub include: Vec<PathBuf>,
}

/// `[install]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallSection {
    /// Install below the per-user local data directory
    #[serde(default)]
    pub user_profile: bool,
    /// Runtime directory name
    #[serde(default)]
    pub runtime_dir: Option<String>,
    /// Extraction idempotence check
    #[serde(default)]
    pub check: ExtractionCheck,
    /// Show extraction progress
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            user_profile: false,
            runtime_dir: None,
            check: ExtractionCheck::default(),
            progress: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[build]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    /// Output directory
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

impl Manifest {
    /// Load manifest from a file
    pub fn from_file(path: impl AsRef<Path>) -> PackResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PackError::Config(format!(
                "Failed to read manifest file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse manifest from TOML string
    pub fn parse(content: &str) -> PackResult<Self> {
        let manifest: Self = toml::from_str(content)?;
        if manifest.package.name.trim().is_empty() {
            return Err(PackError::Config("package.name must not be empty".to_string()));
        }
        Ok(manifest)
    }

    /// Find a manifest file in a directory
    pub fn find_in_dir(dir: impl AsRef<Path>) -> Option<PathBuf> {
        let dir = dir.as_ref();
        MANIFEST_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

impl PackConfig {
    /// Create a pack config from a manifest, resolving paths against `base_dir`
    pub fn from_manifest(manifest: &Manifest, base_dir: &Path) -> Self {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };

        let mut config = PackConfig::new(
            manifest.package.name.clone(),
            resolve(&manifest.runtime.archive),
            resolve(&manifest.payload.path),
        );

        let mut launcher = config
            .launcher
            .clone()
            .with_executable(manifest.runtime.executable)
            .with_runtime_args(manifest.runtime.args.clone())
            .with_user_profile(manifest.install.user_profile)
            .with_extraction_check(manifest.install.check)
            .with_progress(manifest.install.progress);
        if let Some(ref dir) = manifest.install.runtime_dir {
            launcher = launcher.with_runtime_dir(dir.clone());
        }
        if let Some(ref name) = manifest.payload.name {
            launcher = launcher.with_payload_name(name.clone());
        }
        config.launcher = launcher;

        config.files = manifest.files.include.iter().map(|p| resolve(p)).collect();
        config.output_dir = manifest
            .build
            .out_dir
            .as_deref()
            .map(&resolve)
            .unwrap_or_else(|| base_dir.to_path_buf());

        config
    }
}
