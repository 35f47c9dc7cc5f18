//! Tests for jarpack extraction engine

use jarpack::{
    locate_in_archive, ExtractionCheck, Extractor, InstallLocation, LauncherConfig, PackError,
    Resource, ResourceBundle, ResourceKind, RuntimeExecutable, EXTRACTION_MARKER,
};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn jdk_archive() -> Vec<u8> {
    build_zip(&[
        ("jdk-21/", b""),
        ("jdk-21/bin/", b""),
        ("jdk-21/bin/java", b"#!/bin/sh\n"),
        ("jdk-21/lib/", b""),
        ("jdk-21/lib/modules", b"modules"),
        ("jdk-21/release", b"JAVA_VERSION=\"21\""),
    ])
}

fn bundle(archive: Vec<u8>, aux: &[(&str, &[u8])]) -> ResourceBundle {
    let mut resources = vec![
        Resource {
            kind: ResourceKind::RuntimeArchive,
            name: "jdk-21.zip".to_string(),
            content: archive,
        },
        Resource {
            kind: ResourceKind::Payload,
            name: "app.jar".to_string(),
            content: b"PK-jar".to_vec(),
        },
    ];
    for (name, content) in aux {
        resources.push(Resource {
            kind: ResourceKind::Auxiliary,
            name: name.to_string(),
            content: content.to_vec(),
        });
    }
    ResourceBundle::new(resources).unwrap()
}

fn config() -> LauncherConfig {
    LauncherConfig::new("test-app").with_progress(false)
}

/// Snapshot of every file below `root` with its content
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let content = if e.file_type().is_file() {
                fs::read(e.path()).unwrap()
            } else {
                Vec::new()
            };
            (e.path().strip_prefix(root).unwrap().to_path_buf(), content)
        })
        .collect()
}

#[test]
fn test_extract_wrapped_archive() {
    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path());
    let config = config();
    let bundle = bundle(jdk_archive(), &[("config.json", b"{}")]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    let report = Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap();

    assert!(report.runtime_extracted);
    assert_eq!(report.entries_written, 3);
    assert_eq!(report.files_written, 2);
    assert_eq!(report.files_skipped, 0);

    let jre = temp.path().join("jre");
    assert!(jre.join("bin/java").is_file());
    assert_eq!(fs::read(jre.join("lib/modules")).unwrap(), b"modules");
    assert!(jre.join("release").is_file());
    assert!(!jre.join("jdk-21").exists());
    assert!(jre.join(EXTRACTION_MARKER).is_file());
    assert_eq!(fs::read(temp.path().join("app.jar")).unwrap(), b"PK-jar");
    assert_eq!(fs::read(temp.path().join("config.json")).unwrap(), b"{}");
}

#[test]
fn test_extract_flattened_archive() {
    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path());
    let config = config();
    let archive = build_zip(&[("bin/", b""), ("bin/java", b"#!/bin/sh\n"), ("lib/modules", b"m")]);
    let bundle = bundle(archive, &[]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();
    assert_eq!(exe.root_prefix, None);

    Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap();

    assert!(temp.path().join("jre/bin/java").is_file());
    assert!(temp.path().join("jre/lib/modules").is_file());
}

#[test]
fn test_second_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path());
    let config = config();
    let bundle = bundle(jdk_archive(), &[("config.json", b"{}")]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();
    let extractor = Extractor::new(&location, &config);

    extractor.ensure_extracted(&bundle, &exe).unwrap();
    let after_first = snapshot(temp.path());

    let report = extractor.ensure_extracted(&bundle, &exe).unwrap();
    assert!(!report.wrote_anything());
    assert_eq!(report.files_skipped, 2);
    assert_eq!(snapshot(temp.path()), after_first);
}

#[test]
fn test_existing_auxiliary_files_are_kept() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("config.json"), b"user edited").unwrap();
    fs::write(temp.path().join("app.jar"), b"old jar").unwrap();

    let location = InstallLocation::new(temp.path());
    let config = config();
    let bundle = bundle(jdk_archive(), &[("config.json", b"{}")]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    let report = Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap();

    assert_eq!(report.files_written, 0);
    assert_eq!(report.files_skipped, 2);
    assert_eq!(fs::read(temp.path().join("config.json")).unwrap(), b"user edited");
    assert_eq!(fs::read(temp.path().join("app.jar")).unwrap(), b"old jar");
}

#[test]
fn test_nested_auxiliary_files() {
    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path());
    let config = config();
    let bundle = bundle(jdk_archive(), &[("assets/img/logo.png", b"png")]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap();

    assert_eq!(fs::read(temp.path().join("assets/img/logo.png")).unwrap(), b"png");
}

#[test]
fn test_existence_check_skips_existing_runtime_dir() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("jre")).unwrap();

    let location = InstallLocation::new(temp.path());
    let config = config().with_extraction_check(ExtractionCheck::Existence);
    let bundle = bundle(jdk_archive(), &[]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    let report = Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap();

    assert!(!report.runtime_extracted);
    assert!(!temp.path().join("jre/bin/java").exists());
    assert!(!temp.path().join("jre").join(EXTRACTION_MARKER).exists());
    // The payload check is independent of the runtime check
    assert!(temp.path().join("app.jar").is_file());
}

#[test]
fn test_marker_check_redoes_interrupted_extraction() {
    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path());
    let config = config();
    let extractor = Extractor::new(&location, &config);
    let staging = extractor.staging_dir();
    fs::create_dir_all(staging.join("bin")).unwrap();
    fs::write(staging.join("half-written.tmp"), b"partial").unwrap();

    let bundle = bundle(jdk_archive(), &[]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    let report = extractor.ensure_extracted(&bundle, &exe).unwrap();

    let jre = temp.path().join("jre");
    assert!(report.runtime_extracted);
    assert!(jre.join("bin/java").is_file());
    assert!(!jre.join("half-written.tmp").exists());
    assert!(!staging.exists());
    assert_eq!(
        fs::read_to_string(jre.join(EXTRACTION_MARKER)).unwrap(),
        bundle.runtime_digest()
    );
}

#[test]
fn test_marker_check_keeps_unmarked_runtime_dir() {
    let temp = TempDir::new().unwrap();
    let jre = temp.path().join("jre");
    fs::create_dir_all(&jre).unwrap();
    fs::write(jre.join("users-own-file"), b"keep me").unwrap();

    let location = InstallLocation::new(temp.path());
    let config = config();
    let bundle = bundle(jdk_archive(), &[]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    let err = Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap_err();

    assert!(matches!(err, PackError::ExtractionFailed { .. }));
    assert_eq!(fs::read(jre.join("users-own-file")).unwrap(), b"keep me");
    assert!(!jre.join("bin/java").exists());
}

#[test]
fn test_invalid_runtime_dir_touches_nothing() {
    let temp = TempDir::new().unwrap();
    let install = temp.path().join("install");
    fs::create_dir_all(&install).unwrap();
    fs::write(install.join("user-document.txt"), b"notes").unwrap();
    fs::write(temp.path().join("sibling.txt"), b"notes").unwrap();

    let location = InstallLocation::new(&install);
    let bundle = bundle(jdk_archive(), &[]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    for dir in [".", "..", "", "a/b"] {
        let config = config().with_runtime_dir(dir);
        let err = Extractor::new(&location, &config)
            .ensure_extracted(&bundle, &exe)
            .unwrap_err();
        assert!(matches!(err, PackError::Config(_)), "runtime dir: {:?}", dir);
    }

    assert!(install.join("user-document.txt").is_file());
    assert!(temp.path().join("sibling.txt").is_file());
    assert!(!install.join("app.jar").exists());
}

#[test]
fn test_marker_check_reextracts_changed_runtime() {
    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path());
    let config = config();

    let old = bundle(jdk_archive(), &[]);
    let exe = locate_in_archive(&old.runtime_archive().content, RuntimeExecutable::Java).unwrap();
    Extractor::new(&location, &config)
        .ensure_extracted(&old, &exe)
        .unwrap();

    let new = bundle(
        build_zip(&[("jdk-22/bin/java", b"#!/bin/sh\n"), ("jdk-22/release", b"22")]),
        &[],
    );
    let exe = locate_in_archive(&new.runtime_archive().content, RuntimeExecutable::Java).unwrap();
    let report = Extractor::new(&location, &config)
        .ensure_extracted(&new, &exe)
        .unwrap();

    assert!(report.runtime_extracted);
    assert_eq!(fs::read(temp.path().join("jre/release")).unwrap(), b"22");
    assert!(!temp.path().join("jre/lib/modules").exists());
}

#[test]
fn test_unsafe_entry_is_rejected() {
    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path().join("install"));
    let config = config();
    let bundle = bundle(
        build_zip(&[("bin/java", b"x"), ("../escaped.txt", b"x")]),
        &[],
    );
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    let err = Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap_err();

    assert!(matches!(err, PackError::Bundle(_)));
    assert!(!temp.path().join("escaped.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_runtime_executable_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path());
    let config = config();
    let bundle = bundle(jdk_archive(), &[]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap();

    let mode = fs::metadata(temp.path().join("jre/bin/java"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o111, 0o111);

    let mode = fs::metadata(temp.path().join("jre/lib/modules"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o111, 0);
}

#[cfg(unix)]
#[test]
fn test_archived_execute_bits_are_kept() {
    use std::os::unix::fs::PermissionsExt;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let plain = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file("jdk/bin/java", plain.unix_permissions(0o755)).unwrap();
    writer.write_all(b"#!/bin/sh\n").unwrap();
    writer
        .start_file("jdk/lib/jspawnhelper", plain.unix_permissions(0o750))
        .unwrap();
    writer.write_all(b"helper").unwrap();
    let archive = writer.finish().unwrap().into_inner();

    let temp = TempDir::new().unwrap();
    let location = InstallLocation::new(temp.path());
    let config = config();
    let bundle = bundle(archive, &[]);
    let exe = locate_in_archive(&bundle.runtime_archive().content, RuntimeExecutable::Java).unwrap();

    Extractor::new(&location, &config)
        .ensure_extracted(&bundle, &exe)
        .unwrap();

    let mode = fs::metadata(temp.path().join("jre/lib/jspawnhelper"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o750);
}
