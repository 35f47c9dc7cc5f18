//! Tests for jarpack lib module

use jarpack::{OVERLAY_MAGIC, VERSION};

#[test]
fn test_version() {
    assert!(VERSION.contains('.'), "VERSION should contain a dot");
}

#[test]
fn test_is_packed() {
    // The test harness binary carries no overlay
    assert!(!jarpack::is_packed());
}

#[test]
fn test_overlay_magic() {
    assert_eq!(OVERLAY_MAGIC, b"JPAK");
}
