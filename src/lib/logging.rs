//! Logging utilities for formatted output.
//!
//! Formatting helpers for durations, rates and percentages, a run summary for the
//! consensus command and a timer that logs the duration of an operation.

use std::time::{Duration, Instant};

use mapcons_metrics::{CoverageMetric, FragmentMetric, format_count};

/// Formats a fraction as a percentage with `decimals` decimal places.
///
/// # Examples
///
/// ```
/// use mapcons_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration in human-readable form (e.g. "45s", "2m 15s", "1h 30m").
///
/// # Examples
///
/// ```
/// use mapcons_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let (mins, rest) = (secs / 60, secs % 60);
        if rest == 0 { format!("{mins}m") } else { format!("{mins}m {rest}s") }
    } else {
        let (hours, mins) = (secs / 3600, (secs % 3600) / 60);
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a processing rate, switching to items per minute below one per second.
///
/// # Examples
///
/// ```
/// use mapcons_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 items/s");
/// ```
#[must_use]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} items/s", format_count(count));
    }
    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} items/s", format_count(rate as u64))
    } else {
        format!("{:.1} items/min", count as f64 / (secs / 60.0))
    }
}

/// Logs one line per consensus sequence plus totals.
pub fn log_run_summary(fragments: &[FragmentMetric], coverage: &[CoverageMetric]) {
    log::info!("Consensus Summary:");
    for (fragment, cov) in fragments.iter().zip(coverage) {
        log::info!(
            "  {}: {} bp, coverage {} (min {}, max {}), low coverage: {}, problematic: {}",
            fragment.consensus,
            format_count(fragment.final_length as u64),
            cov.mean_summary(),
            cov.min_coverage,
            cov.max_coverage,
            cov.low_coverage_regions,
            fragment.problematic_regions
        );
    }
    let total: usize = fragments.iter().map(|f| f.final_length).sum();
    let ambiguous: usize = fragments.iter().map(|f| f.ambiguous_positions).sum();
    log::info!("  Sequences: {}", format_count(fragments.len() as u64));
    log::info!("  Total length: {} bp", format_count(total as u64));
    if total > 0 {
        log::info!(
            "  Ambiguous positions: {} ({})",
            format_count(ambiguous as u64),
            format_percent(ambiguous as f64 / total as f64, 2)
        );
    }
}

/// Logs the start of an operation and, on request, its completion with a rate.
///
/// # Example
///
/// ```
/// use mapcons_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Calling consensus");
/// timer.log_completion(3);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}
