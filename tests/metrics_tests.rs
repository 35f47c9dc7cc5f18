//! Tests for jarpack metrics module

use jarpack::LaunchMetrics;
use std::thread;
use std::time::Duration;

#[test]
fn test_time_phase() {
    let mut metrics = LaunchMetrics::new();

    let result = metrics.time_phase("extract", || {
        thread::sleep(Duration::from_millis(5));
        42
    });

    assert_eq!(result, 42);
    assert_eq!(metrics.phases().len(), 1);
    assert_eq!(metrics.phases()[0].0, "extract");
    assert!(metrics.phases()[0].1 >= Duration::from_millis(5));
    assert!(metrics.elapsed() >= Duration::from_millis(5));
}

#[test]
fn test_phases_keep_order() {
    let mut metrics = LaunchMetrics::new();
    metrics.add_phase("discover", Duration::from_millis(1));
    metrics.add_phase("extract", Duration::from_millis(2));

    let names: Vec<_> = metrics.phases().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["discover", "extract"]);
}

#[test]
fn test_report_format() {
    let mut metrics = LaunchMetrics::new();
    metrics.add_phase("discover", Duration::from_millis(3));

    let report = metrics.report();
    assert!(report.starts_with("Launcher startup timings:"));
    assert!(report.contains("discover"));
    assert!(report.contains("total"));
}
