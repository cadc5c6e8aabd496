use crate::conversion::ConversionResult;
use anyhow::Result;
use std::time::Duration;

fn log_failure(level: log::Level, result: &ConversionResult) {
    log::log!(level, "Conversion failed");
    log::log!(level, "File: {}", result.rel_path());
    if let Some(error_msg) = result.error_message() {
        for line in error_msg.lines() {
            log::log!(level, "  {}", line);
        }
    }
}

/// Logs every failed conversion.
///
/// # Errors
///
/// Always returns an error after logging, to stop the run.
pub fn report_conversion_errors(failed_results: &[&ConversionResult]) -> Result<()> {
    for result in failed_results {
        log_failure(log::Level::Error, result);
    }

    log::error!("Failed to convert the following files:");
    for result in failed_results {
        log::error!("  {}", result.rel_path());
    }

    anyhow::bail!(
        "Notebook conversion failed for {} file(s)",
        failed_results.len()
    );
}

/// Logs failed conversions as warnings, for runs that keep going.
pub fn warn_conversion_errors(failed_results: &[&ConversionResult]) {
    for result in failed_results {
        log_failure(log::Level::Warn, result);
    }
    log::warn!(
        "Skipped {} file(s) that could not be converted",
        failed_results.len()
    );
}

/// Logs conversion statistics.
///
/// Shows:
/// - notebooks written and their total cell count
/// - wall-clock time and average time per file
/// - individual file timings (RUST_LOG=debug)
pub fn print_conversion_statistics(results: &[ConversionResult], parallel_duration: Duration) {
    let successful: Vec<_> = results.iter().filter(|r| r.success()).collect();
    let total_cells: usize = successful.iter().map(|r| r.cells()).sum();

    let sum_duration: Duration = results.iter().map(|r| r.duration()).sum();
    let avg_ms = if results.is_empty() {
        0
    } else {
        sum_duration.as_millis() / results.len() as u128
    };

    if successful.is_empty() {
        log::info!("No notebooks written");
    } else {
        log::info!(
            "Wrote {} notebook(s) ({} cell(s))",
            successful.len(),
            total_cells
        );
    }
    log::info!(
        "Conversion finished in {}ms (avg {}ms per file)",
        parallel_duration.as_millis(),
        avg_ms
    );

    log::debug!("Individual conversion timings:");
    for result in results {
        log::debug!(
            "[NOTEBOOK_CONVERT_TIME] {} -> {}: {}ms",
            result.rel_path(),
            result.output_path().display(),
            result.duration().as_millis()
        );
    }
}
