//! Result data structures for speed test output.
//!
//! [`SpeedTestResults`] is the serialisable form of one run against one
//! address family, used for `--json`. [`text_report`] renders the same
//! data as the line-oriented report printed by default.

use crate::cloudflare::requests::meta::MeasurementMetadata;
use crate::cloudflare::tests::engine::{
    DirectionOutcome, RttStats, SpeedTestOutput,
};
use crate::errors::SpeedTestError;
use crate::measurements::Direction;
use crate::stats::Stats;
use crate::throughput::SpeedMeasurementStats;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Outcome of one measurement phase.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseResult<T> {
    Completed(T),
    Failed { error: String },
}

impl<T: Clone> PhaseResult<T> {
    fn from_result(result: &Result<T, SpeedTestError>) -> Self {
        match result {
            Ok(value) => PhaseResult::Completed(value.clone()),
            Err(error) => PhaseResult::Failed {
                error: format!(
                    "{}: {}",
                    error.kind.description(),
                    error.message
                ),
            },
        }
    }
}

/// Throughput and loaded latency of one direction.
#[derive(Debug, Clone, Serialize)]
pub struct DirectionResults {
    pub direction: Direction,
    pub throughput: PhaseResult<SpeedMeasurementStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_rtt: Option<PhaseResult<RttStats>>,
}

impl DirectionResults {
    fn from_outcome(outcome: &DirectionOutcome) -> Self {
        Self {
            direction: outcome.direction,
            throughput: PhaseResult::from_result(&outcome.result),
            loaded_rtt: outcome
                .loaded_rtt
                .as_ref()
                .map(PhaseResult::from_result),
        }
    }
}

/// Complete results from a speed test run against one address family.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedTestResults {
    pub timestamp: DateTime<Utc>,
    pub address_family: String,
    pub metadata: MeasurementMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unloaded_rtt: Option<PhaseResult<RttStats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<DirectionResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<DirectionResults>,
}

impl SpeedTestResults {
    /// Snapshot an engine run, stamped with the current time.
    pub fn from_engine_output(output: &SpeedTestOutput) -> Self {
        let measurements = &output.measurements;

        Self {
            timestamp: Utc::now(),
            address_family: output.family.to_string(),
            metadata: output.metadata.clone(),
            unloaded_rtt: measurements
                .unloaded_rtt
                .as_ref()
                .map(PhaseResult::from_result),
            download: measurements
                .download
                .as_ref()
                .map(DirectionResults::from_outcome),
            upload: measurements
                .upload
                .as_ref()
                .map(DirectionResults::from_outcome),
        }
    }
}

fn format_deciles(deciles: &[f64]) -> String {
    let cuts: Vec<String> =
        deciles.iter().map(|d| format!("{:.3}", d)).collect();

    format!("[{}]", cuts.join(" "))
}

fn write_rtt(out: &mut String, label: &str, stats: &Stats) -> std::fmt::Result {
    let key = |name: &str| format!("{}-{}:", label, name).bold();

    writeln!(out, "{} {:.3} ms", key("mean"), stats.mean)?;
    writeln!(out, "{} {:.3} ms", key("stderr"), stats.stderr)?;
    writeln!(out, "{} {:.3} ms", key("min"), stats.min)?;
    writeln!(out, "{} {:.3} ms", key("max"), stats.max)?;
    writeln!(out, "{} {} ms", key("deciles"), format_deciles(&stats.deciles))?;
    writeln!(out, "{} {}", key("n"), stats.count)
}

fn write_speed(
    out: &mut String,
    label: &str,
    speed: &SpeedMeasurementStats,
) -> std::fmt::Result {
    let key = |name: &str| format!("{}-{}:", label, name).bold();
    let stats = &speed.stats;

    writeln!(out, "{} {:.3} Mbps", key("mean"), stats.mean)?;
    writeln!(out, "{} {:.3} Mbps", key("stderr"), stats.stderr)?;
    writeln!(out, "{} {:.3} Mbps", key("min"), stats.min)?;
    writeln!(out, "{} {:.3} Mbps", key("max"), stats.max)?;
    writeln!(
        out,
        "{} {} Mbps",
        key("deciles"),
        format_deciles(&stats.deciles)
    )?;
    writeln!(
        out,
        "{} {}",
        key("cat"),
        format!("{:.3} Mbps", speed.aggregate_mbps).bright_cyan()
    )?;
    writeln!(
        out,
        "{} {:.3} MiB",
        key("tx"),
        speed.total_bytes as f64 / BYTES_PER_MIB
    )?;
    writeln!(out, "{} {}", key("mx"), speed.multiplicity)?;
    writeln!(out, "{} {}", key("ntx"), speed.measurement_count)?;
    writeln!(out, "{} {}", key("n"), stats.count)?;

    if let Some(reason) = &speed.interrupted {
        writeln!(out, "{} {}", key("interrupted"), reason.yellow())?;
    }

    Ok(())
}

fn write_failure(
    out: &mut String,
    label: &str,
    error: &str,
) -> std::fmt::Result {
    writeln!(out, "{} {}", format!("{}-error:", label).bold(), error.red())
}

fn write_direction(
    out: &mut String,
    results: &DirectionResults,
) -> std::fmt::Result {
    let label = results.direction.label();

    writeln!(out)?;
    match &results.throughput {
        PhaseResult::Completed(speed) => write_speed(out, label, speed)?,
        PhaseResult::Failed { error } => write_failure(out, label, error)?,
    }

    let loaded_label = format!("RTT-{}Loaded", label);
    match &results.loaded_rtt {
        Some(PhaseResult::Completed(rtt)) => {
            writeln!(out)?;
            write_rtt(out, &loaded_label, &rtt.rtt)?;
        }
        Some(PhaseResult::Failed { error }) => {
            writeln!(out)?;
            write_failure(out, &loaded_label, error)?;
        }
        None => {}
    }

    Ok(())
}

/// Render results as the default text report.
pub fn text_report(results: &SpeedTestResults) -> String {
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = write_report(&mut out, results);

    out
}

fn write_report(
    out: &mut String,
    results: &SpeedTestResults,
) -> std::fmt::Result {
    let metadata = &results.metadata;

    writeln!(out, "{} {}", "At:".bold(), results.timestamp.to_rfc2822())?;
    writeln!(out, "{} {}", "AddressFamily:".bold(), results.address_family)?;
    writeln!(
        out,
        "{} {} (AS{})",
        "SrcIP:".bold(),
        metadata.src_ip.bright_blue(),
        metadata.src_asn
    )?;
    writeln!(
        out,
        "{} {}, {}",
        "SrcLocation:".bold(),
        metadata.src_city,
        metadata.src_country
    )?;
    writeln!(
        out,
        "{} {}",
        "DstColocation:".bold(),
        metadata.dst_colo.bright_blue()
    )?;

    match &results.unloaded_rtt {
        Some(PhaseResult::Completed(rtt)) => {
            writeln!(out)?;
            write_rtt(out, "RTT-Unloaded", &rtt.rtt)?;
        }
        Some(PhaseResult::Failed { error }) => {
            writeln!(out)?;
            write_failure(out, "RTT-Unloaded", error)?;
        }
        None => {}
    }

    let directions = [&results.download, &results.upload];
    for direction in directions.into_iter().flatten() {
        write_direction(out, direction)?;
    }

    Ok(())
}
