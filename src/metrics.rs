//! Startup timing for packed launchers
//!
//! Records how long each stage took so slow first runs can be diagnosed
//! with `JARPACK_LOG=debug`.

use std::time::{Duration, Instant};

/// Phase timings of a single launcher run
#[derive(Debug)]
pub struct LaunchMetrics {
    start: Instant,
    phases: Vec<(String, Duration)>,
}

impl Default for LaunchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchMetrics {
    /// Start measuring
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            phases: Vec::new(),
        }
    }

    /// Record a phase duration
    pub fn add_phase(&mut self, name: impl Into<String>, duration: Duration) {
        self.phases.push((name.into(), duration));
    }

    /// Run `f` and record how long it took
    pub fn time_phase<T, F: FnOnce() -> T>(&mut self, name: &str, f: F) -> T {
        let start = Instant::now();
        let result = f();
        self.add_phase(name, start.elapsed());
        result
    }

    /// Recorded phases in order
    pub fn phases(&self) -> &[(String, Duration)] {
        &self.phases
    }

    /// Time since measurement started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Human-readable summary
    pub fn report(&self) -> String {
        let mut lines = vec!["Launcher startup timings:".to_string()];
        for (name, duration) in &self.phases {
            lines.push(format!(
                "  {:<12} {:>8.2}ms",
                name,
                duration.as_secs_f64() * 1000.0
            ));
        }
        lines.push(format!(
            "  {:<12} {:>8.2}ms",
            "total",
            self.elapsed().as_secs_f64() * 1000.0
        ));
        lines.join("\n")
    }

    /// Emit the summary at debug level
    pub fn log(&self) {
        tracing::debug!("{}", self.report());
    }
}
