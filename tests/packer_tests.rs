//! Tests for jarpack packer module

use jarpack::{
    OverlayReader, PackConfig, PackError, PackedApp, Packer, RuntimeExecutable,
};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const FAKE_LAUNCHER: &[u8] = b"\x7fELF fake launcher bytes";

fn write_zip(path: &Path, entries: &[&str]) {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for name in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(b"bytes").unwrap();
    }
    fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
}

fn setup(temp: &TempDir, archive_entries: &[&str]) -> PackConfig {
    let launcher = temp.path().join("jarpack-base");
    fs::write(&launcher, FAKE_LAUNCHER).unwrap();
    write_zip(&temp.path().join("jdk-21.zip"), archive_entries);
    fs::write(temp.path().join("app.jar"), b"jar").unwrap();
    fs::write(temp.path().join("config.json"), b"{}").unwrap();

    PackConfig::new(
        "my-app",
        temp.path().join("jdk-21.zip"),
        temp.path().join("app.jar"),
    )
    .with_files(vec![temp.path().join("config.json")])
    .with_output_dir(temp.path().join("dist"))
    .with_base_executable(launcher)
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

#[test]
fn test_pack_appends_overlay() {
    let temp = TempDir::new().unwrap();
    let config = setup(&temp, &["jdk-21/bin/java", "jdk-21/lib/modules"]);

    let output = Packer::new(config).pack().unwrap();

    assert_eq!(output.executable, temp.path().join("dist").join(exe_name("my-app")));
    assert_eq!(output.resource_count, 3);
    assert_eq!(output.runtime_executable.root_prefix.as_deref(), Some("jdk-21"));
    assert_eq!(output.size, fs::metadata(&output.executable).unwrap().len());

    let bytes = fs::read(&output.executable).unwrap();
    assert!(bytes.starts_with(FAKE_LAUNCHER));
    assert_eq!(
        OverlayReader::original_size(&output.executable).unwrap(),
        Some(FAKE_LAUNCHER.len() as u64)
    );

    let app = PackedApp::from_executable(&output.executable).unwrap().unwrap();
    assert_eq!(app.config().app_name, "my-app");
    assert_eq!(app.bundle().payload().content, b"jar");
    assert_eq!(app.bundle().get("config.json").unwrap().content, b"{}");
    assert_eq!(app.discover().unwrap().relative_path, "bin/java");
}

#[test]
fn test_repack_drops_previous_overlay() {
    let temp = TempDir::new().unwrap();
    let config = setup(&temp, &["jdk-21/bin/java"]);
    let first = Packer::new(config.clone()).pack().unwrap();

    let mut second_config = config.with_base_executable(&first.executable);
    second_config.output_dir = temp.path().join("dist2");
    let second = Packer::new(second_config).pack().unwrap();

    assert_eq!(
        OverlayReader::original_size(&second.executable).unwrap(),
        Some(FAKE_LAUNCHER.len() as u64)
    );
    assert_eq!(first.size, second.size);
}

#[test]
fn test_pack_fails_without_runtime_executable() {
    let temp = TempDir::new().unwrap();
    let config = setup(&temp, &["docs/readme.txt"]);

    let err = Packer::new(config).pack().unwrap_err();
    assert!(matches!(err, PackError::ExecutableNotFound { .. }));
}

#[test]
fn test_pack_windowed_falls_back() {
    let temp = TempDir::new().unwrap();
    let mut config = setup(&temp, &["jdk-21/bin/java"]);
    config.launcher.executable = RuntimeExecutable::Javaw;

    let output = Packer::new(config).pack().unwrap();
    assert_eq!(output.runtime_executable.executable, RuntimeExecutable::Java);
}

#[test]
fn test_pack_validates_inputs() {
    let temp = TempDir::new().unwrap();
    let config = setup(&temp, &["jdk-21/bin/java"]);

    let mut missing_payload = config.clone();
    missing_payload.payload = temp.path().join("missing.jar");
    let err = Packer::new(missing_payload).pack().unwrap_err();
    assert!(matches!(err, PackError::Config(_)));

    for dir in ["../jre", ".", "..", "", "jre/"] {
        let mut bad_runtime_dir = config.clone();
        bad_runtime_dir.launcher.runtime_dir = dir.to_string();
        let err = Packer::new(bad_runtime_dir).pack().unwrap_err();
        assert!(matches!(err, PackError::Config(_)), "runtime dir: {:?}", dir);
    }

    let mut empty_name = config;
    empty_name.output_name = String::new();
    let err = Packer::new(empty_name).pack().unwrap_err();
    assert!(matches!(err, PackError::Config(_)));
}

#[cfg(unix)]
#[test]
fn test_output_is_executable() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let config = setup(&temp, &["jdk-21/bin/java"]);
    let output = Packer::new(config).pack().unwrap();

    let mode = fs::metadata(&output.executable).unwrap().permissions().mode();
    assert_eq!(mode & 0o755, 0o755);
}
