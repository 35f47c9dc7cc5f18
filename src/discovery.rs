//! Runtime executable discovery
//!
//! Runtime archives come in different shapes: a single wrapping directory
//! (`jdk-21/bin/java`), a flattened tree (`bin/java`) or a bare executable at
//! the root (`java.exe`). Discovery works on entry names only and reports
//! where the executable sits and which prefix to strip during extraction.
//!
//! Candidates are ranked by pattern, then by archive order:
//!
//! 1. `.../bin/<name>`
//! 2. `.../bin/<name>.exe`
//! 3. `<name>.exe` at the root
//! 4. `<name>` at the root

use crate::config::RuntimeExecutable;
use crate::{PackError, PackResult};
use std::io::Cursor;

/// Where the runtime executable lives inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableLocation {
    /// Leading directory shared by the runtime tree, stripped on extraction
    pub root_prefix: Option<String>,
    /// Path of the executable once the prefix is stripped
    pub relative_path: String,
    /// Variant that was actually found
    pub executable: RuntimeExecutable,
}

impl ExecutableLocation {
    /// Map an archive entry name to its path below the runtime directory.
    ///
    /// Returns `None` for the prefix directory entry itself.
    pub fn strip<'a>(&self, entry_name: &'a str) -> Option<&'a str> {
        let Some(ref prefix) = self.root_prefix else {
            return Some(entry_name);
        };

        let rest = entry_name
            .strip_prefix(prefix.as_str())
            .and_then(|r| r.strip_prefix('/'));
        match rest {
            Some("") => None,
            Some(rest) => Some(rest),
            None => Some(entry_name),
        }
    }

    /// Whether a stripped entry path is one of the runtime launchers next to the executable
    pub fn is_runtime_executable(&self, stripped: &str) -> bool {
        let (dir, file) = split_last(stripped);
        let (exe_dir, _) = split_last(&self.relative_path);
        if !dir.eq_ignore_ascii_case(exe_dir) {
            return false;
        }

        let file = file.to_ascii_lowercase();
        let file = file.strip_suffix(".exe").unwrap_or(&file);
        [RuntimeExecutable::Java, RuntimeExecutable::Javaw]
            .iter()
            .any(|e| e.base_name() == file)
    }
}

fn split_last(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Locate the runtime executable among archive entry names
pub fn locate<S: AsRef<str>>(
    names: &[S],
    executable: RuntimeExecutable,
) -> PackResult<ExecutableLocation> {
    if let Some(location) = find(names, executable) {
        return Ok(location);
    }

    if let Some(fallback) = executable.fallback() {
        if let Some(location) = find(names, fallback) {
            tracing::warn!(
                "'{}' not found in runtime archive, falling back to '{}'",
                executable,
                fallback
            );
            return Ok(location);
        }
    }

    Err(PackError::ExecutableNotFound {
        executable: executable.to_string(),
    })
}

/// Locate the runtime executable inside zip archive bytes (central directory only)
pub fn locate_in_archive(
    archive: &[u8],
    executable: RuntimeExecutable,
) -> PackResult<ExecutableLocation> {
    locate(&archive_names(archive)?, executable)
}

/// Entry names of a zip archive in archive order
pub fn archive_names(archive: &[u8]) -> PackResult<Vec<String>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        names.push(zip.by_index_raw(i)?.name().to_string());
    }
    Ok(names)
}

fn find<S: AsRef<str>>(names: &[S], executable: RuntimeExecutable) -> Option<ExecutableLocation> {
    let base = executable.base_name();
    let patterns = [
        format!("/bin/{}", base),
        format!("/bin/{}.exe", base),
        format!("{}.exe", base),
        base.to_string(),
    ];

    for (rank, pattern) in patterns.iter().enumerate() {
        for name in names {
            let normalized = name.as_ref().replace('\\', "/");
            let lower = normalized.to_ascii_lowercase();

            let hit = if rank < 2 {
                format!("/{}", lower).ends_with(pattern.as_str())
            } else {
                lower == *pattern
            };
            if hit {
                return Some(split_location(&normalized, executable));
            }
        }
    }

    None
}

fn split_location(normalized: &str, executable: RuntimeExecutable) -> ExecutableLocation {
    let segments: Vec<&str> = normalized.split('/').collect();
    let bin_idx = segments
        .iter()
        .rposition(|s| s.eq_ignore_ascii_case("bin"));

    let (root_prefix, relative_path) = match bin_idx {
        Some(0) | None => (None, normalized.to_string()),
        Some(idx) => (
            Some(segments[..idx].join("/")),
            segments[idx..].join("/"),
        ),
    };

    tracing::debug!(
        "Runtime executable: prefix={:?}, path={}",
        root_prefix,
        relative_path
    );

    ExecutableLocation {
        root_prefix,
        relative_path,
        executable,
    }
}
