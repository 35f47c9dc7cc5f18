//! Extraction engine
//!
//! Materializes the bundle below an [`InstallLocation`]:
//!
//! ```text
//! <install>/<runtime_dir>/...        runtime archive, root prefix stripped
//! <install>/<payload_name>           payload
//! <install>/<aux name>               auxiliary files
//! ```
//!
//! The runtime is extracted as a whole or not at all; payload and auxiliary
//! files are checked one by one and never overwritten.
//!
//! With the marker check the runtime is unpacked into a staging sibling and
//! renamed into place once the marker is written, so an interrupted run never
//! leaves a half-filled runtime directory behind. A runtime directory without
//! a marker is never deleted. Nothing is rolled back on failure.

use crate::bundle::{Resource, ResourceBundle, ResourceKind};
use crate::config::{ExtractionCheck, LauncherConfig};
use crate::discovery::ExecutableLocation;
use crate::location::InstallLocation;
use crate::progress::{self, ProgressExt};
use crate::{PackError, PackResult};
use std::fs::{self, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Component, Path, PathBuf};

/// Marker written into the runtime directory after a complete extraction
pub const EXTRACTION_MARKER: &str = ".jarpack-extracted";

/// What an [`Extractor::ensure_extracted`] call actually did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    /// The runtime archive was unpacked during this call
    pub runtime_extracted: bool,
    /// Runtime archive entries written
    pub entries_written: usize,
    /// Payload and auxiliary files written
    pub files_written: usize,
    /// Payload and auxiliary files left untouched because they already existed
    pub files_skipped: usize,
}

impl ExtractionReport {
    /// Whether this call touched the filesystem
    pub fn wrote_anything(&self) -> bool {
        self.runtime_extracted || self.files_written > 0
    }
}

/// Writes a bundle into an install location
pub struct Extractor<'a> {
    location: &'a InstallLocation,
    config: &'a LauncherConfig,
}

impl<'a> Extractor<'a> {
    /// Create an extractor for a location and launcher configuration
    pub fn new(location: &'a InstallLocation, config: &'a LauncherConfig) -> Self {
        Self { location, config }
    }

    /// Extract whatever is missing
    pub fn ensure_extracted(
        &self,
        bundle: &ResourceBundle,
        executable: &ExecutableLocation,
    ) -> PackResult<ExtractionReport> {
        if !self.config.has_valid_runtime_dir() {
            return Err(PackError::Config(format!(
                "Invalid runtime directory name: '{}'",
                self.config.runtime_dir
            )));
        }

        let mut report = ExtractionReport::default();
        let runtime_dir = self.location.runtime_dir(&self.config.runtime_dir);
        let archive = &bundle.runtime_archive().content;

        match self.config.extraction_check {
            ExtractionCheck::Existence => {
                if runtime_dir.exists() {
                    tracing::debug!("Runtime directory exists: {}", runtime_dir.display());
                } else {
                    report.entries_written =
                        self.extract_runtime(archive, executable, &runtime_dir)?;
                    report.runtime_extracted = true;
                }
            }
            ExtractionCheck::Marker => {
                let digest = bundle.runtime_digest();
                if self.runtime_is_current(&runtime_dir, Some(&digest)) {
                    tracing::debug!("Runtime already extracted: {}", runtime_dir.display());
                } else {
                    report.entries_written =
                        self.replace_runtime(archive, executable, &runtime_dir, &digest)?;
                    report.runtime_extracted = true;
                }
            }
        }

        for resource in std::iter::once(bundle.payload()).chain(bundle.auxiliary()) {
            if self.write_resource(resource)? {
                report.files_written += 1;
            } else {
                report.files_skipped += 1;
            }
        }

        Ok(report)
    }

    /// Whether the runtime directory counts as already extracted
    pub fn runtime_is_current(&self, runtime_dir: &Path, digest: Option<&str>) -> bool {
        match (self.config.extraction_check, digest) {
            (ExtractionCheck::Marker, Some(digest)) => {
                read_marker(runtime_dir).is_some_and(|stored| stored == digest)
            }
            _ => runtime_dir.exists(),
        }
    }

    /// Sibling directory a marker-mode extraction is staged in before it is moved into place
    pub fn staging_dir(&self) -> PathBuf {
        self.location
            .root()
            .join(format!(".{}.jarpack-partial", self.config.runtime_dir))
    }

    /// Extract into the staging directory, then swap it in for `runtime_dir`.
    ///
    /// An existing runtime directory is only removed when it carries a marker,
    /// i.e. when an earlier run of this launcher created it.
    fn replace_runtime(
        &self,
        archive: &[u8],
        executable: &ExecutableLocation,
        runtime_dir: &Path,
        digest: &str,
    ) -> PackResult<usize> {
        if runtime_dir.exists() && read_marker(runtime_dir).is_none() {
            return Err(PackError::extraction(
                runtime_dir,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "directory was not created by jarpack; \
                     remove it or use the existence check",
                ),
            ));
        }

        let staging = self.staging_dir();
        if staging.exists() {
            tracing::debug!("Discarding interrupted extraction: {}", staging.display());
            fs::remove_dir_all(&staging).map_err(|e| PackError::extraction(&staging, e))?;
        }

        let written = self.extract_runtime(archive, executable, &staging)?;
        let marker = staging.join(EXTRACTION_MARKER);
        fs::write(&marker, digest).map_err(|e| PackError::extraction(&marker, e))?;

        if runtime_dir.exists() {
            tracing::info!("Removing stale runtime: {}", runtime_dir.display());
            fs::remove_dir_all(runtime_dir).map_err(|e| PackError::extraction(runtime_dir, e))?;
        }
        fs::rename(&staging, runtime_dir).map_err(|e| PackError::extraction(runtime_dir, e))?;

        Ok(written)
    }

    /// Unpack the runtime archive into `dest`, returning the number of entries written
    fn extract_runtime(
        &self,
        archive: &[u8],
        executable: &ExecutableLocation,
        dest: &Path,
    ) -> PackResult<usize> {
        tracing::info!("Extracting runtime to: {}", dest.display());
        fs::create_dir_all(dest).map_err(|e| PackError::extraction(dest, e))?;

        let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
        let visible = self.config.show_progress && progress::stderr_is_terminal();
        let pb = progress::progress_bar(zip.len() as u64, "Extracting runtime", visible);

        let mut written = 0;
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let name = entry.name().replace('\\', "/");
            pb.inc(1);

            let Some(stripped) = executable.strip(&name) else {
                continue;
            };
            let relative = safe_relative(stripped).ok_or_else(|| {
                PackError::Bundle(format!("Unsafe path in runtime archive: {}", name))
            })?;
            if relative.as_os_str().is_empty() {
                continue;
            }

            let out_path = dest.join(&relative);
            if name.ends_with('/') {
                fs::create_dir_all(&out_path).map_err(|e| PackError::extraction(&out_path, e))?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(|e| PackError::extraction(parent, e))?;
            }
            let mut out_file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&out_path)
                .map_err(|e| PackError::extraction(&out_path, e))?;
            if let Err(e) = io::copy(&mut entry, &mut out_file) {
                pb.finish_error("Runtime extraction failed");
                return Err(PackError::extraction(&out_path, e));
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;

                let mode = if executable.is_runtime_executable(stripped) {
                    Some(0o755)
                } else {
                    entry
                        .unix_mode()
                        .filter(|mode| mode & 0o111 != 0)
                        .map(|mode| mode & 0o7777)
                };
                if let Some(mode) = mode {
                    fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                        .map_err(|e| PackError::extraction(&out_path, e))?;
                }
            }

            written += 1;
        }

        pb.finish_success(&format!("Extracted {} runtime files", written));
        tracing::info!("Runtime extracted: {} files", written);
        Ok(written)
    }

    /// Write a payload or auxiliary file unless one already exists; returns whether it wrote
    fn write_resource(&self, resource: &Resource) -> PackResult<bool> {
        let name = match resource.kind {
            ResourceKind::Payload => self.config.payload_name.as_str(),
            _ => resource.name.as_str(),
        };
        match safe_relative(name) {
            Some(relative) if !relative.as_os_str().is_empty() => {}
            _ => {
                return Err(PackError::Bundle(format!(
                    "Unsafe resource name: {}",
                    name
                )))
            }
        }

        let dest = self.location.file_path(name);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| PackError::extraction(parent, e))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&dest) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!("Keeping existing file: {}", dest.display());
                return Ok(false);
            }
            Err(e) => return Err(PackError::extraction(&dest, e)),
        };
        file.write_all(&resource.content)
            .map_err(|e| PackError::extraction(&dest, e))?;

        tracing::debug!("Wrote {} ({} bytes)", dest.display(), resource.content.len());
        Ok(true)
    }
}

/// Digest stored in a runtime directory's marker, if there is one
fn read_marker(runtime_dir: &Path) -> Option<String> {
    fs::read_to_string(runtime_dir.join(EXTRACTION_MARKER))
        .ok()
        .map(|stored| stored.trim().to_string())
}

/// Turn an archive or resource name into a relative path that stays below its root
fn safe_relative(name: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_relative() {
        assert_eq!(safe_relative("bin/java"), Some(PathBuf::from("bin").join("java")));
        assert_eq!(safe_relative("./lib/modules"), Some(PathBuf::from("lib").join("modules")));
        assert_eq!(safe_relative("../escape"), None);
        assert_eq!(safe_relative("lib/../../escape"), None);
        #[cfg(unix)]
        assert_eq!(safe_relative("/etc/passwd"), None);
    }

    #[test]
    fn test_report_wrote_anything() {
        assert!(!ExtractionReport::default().wrote_anything());
        let report = ExtractionReport {
            files_written: 1,
            ..Default::default()
        };
        assert!(report.wrote_anything());
    }
}
