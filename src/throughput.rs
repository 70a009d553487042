//! Throughput reconstruction.
//!
//! Transport events arrive in bursts: the OS and TLS buffers hand over
//! several chunks back to back, then the stream stalls until the network
//! delivers more. Each measurement is cut into windows at the stalls that
//! stand out from the usual inter-event gap (more than mean + 2σ, and only
//! once the window is at least [`WINDOW_WIDTH_MIN`] wide). Each window
//! becomes one throughput sample in Mbit/s.
//!
//! Downloads are windowed back to front. A sink only sees bytes after the
//! server has spent its processing time, so the tail of a download is the
//! trustworthy edge; walking from the end and anchoring the start at
//! `start + server_time` keeps the samples on the network's schedule.

use crate::measurements::{sample_values, Direction, Sample, SpeedMeasurement};
use crate::sampler::{IoEvent, IoMode};
use crate::stats::Stats;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Windows narrower than this are never closed early.
pub const WINDOW_WIDTH_MIN: Duration = Duration::from_millis(100);

/// Samples reconstructed from one or more measurements, with the totals
/// needed for the aggregate rate.
#[derive(Debug, Clone, Default)]
pub struct SeriesAnalysis {
    pub samples: Vec<Sample<f64>>,
    pub total_bytes: u64,
    /// Sum of measurement durations, or the overall span for concurrent
    /// groups.
    pub duration: Duration,
}

fn abs_diff(a: Instant, b: Instant) -> Duration {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

fn signed_millis(later: Instant, earlier: Instant) -> f64 {
    if later >= earlier {
        (later - earlier).as_secs_f64() * 1000.0
    } else {
        -(earlier - later).as_secs_f64() * 1000.0
    }
}

/// Statistics of consecutive event gaps, in milliseconds.
fn gap_stats(events: &[IoEvent]) -> Stats {
    let gaps: Vec<f64> = events
        .windows(2)
        .map(|pair| signed_millis(pair[1].timestamp, pair[0].timestamp))
        .collect();

    Stats::from_series(&gaps)
}

/// Cut `events` into windows and turn each into a Mbit/s sample.
///
/// Every byte lands in exactly one window, so a series conserves bytes
/// unless a window is narrower than a microsecond and dropped.
///
/// `events` may run forwards or backwards in time. Samples are stamped at
/// the closing event, or at the window start when `stamp_at_window_start`
/// is set (the chronologically later edge of a backwards pass).
fn window_samples(
    events: &[IoEvent],
    stamp_at_window_start: bool,
) -> Vec<Sample<f64>> {
    if events.len() < 2 {
        return Vec::new();
    }

    let gaps = gap_stats(events);
    let threshold = gaps.mean.abs() + 2.0 * gaps.stddev;
    let last = events.len() - 2;

    let mut samples = Vec::new();
    let mut window_start = events[0].timestamp;
    let mut window_bytes: u64 = 0;

    for (index, pair) in events.windows(2).enumerate() {
        let (previous, event) = (&pair[0], &pair[1]);

        window_bytes += previous.size as u64;

        let gap = abs_diff(event.timestamp, previous.timestamp);
        let width = abs_diff(event.timestamp, window_start);
        let stalled =
            gap.as_millis() as f64 > threshold && width > WINDOW_WIDTH_MIN;

        if !stalled && index != last {
            continue;
        }

        // nothing follows the final event, so its bytes close this window
        if index == last {
            window_bytes += event.size as u64;
        }

        let micros = width.as_micros();
        if micros > 0 {
            let timestamp = if stamp_at_window_start {
                window_start
            } else {
                event.timestamp
            };

            samples.push(Sample::new(
                8.0 * window_bytes as f64 / micros as f64,
                timestamp,
            ));
        }

        window_start = event.timestamp;
        window_bytes = 0;
    }

    samples
}

/// Samples for an upload, whose events come from body reads.
///
/// When the response arrived later than the final read (less the server's
/// own processing time), a zero-size event is appended there so the last
/// window reaches the moment the server had everything.
pub fn upload_samples(
    end: Instant,
    server_time: Duration,
    events: &[IoEvent],
) -> Vec<Sample<f64>> {
    let Some(last_timestamp) = events.last().map(|e| e.timestamp) else {
        return Vec::new();
    };

    let mut events = events.to_vec();
    let adjusted_end = end.checked_sub(server_time).unwrap_or(end);

    if adjusted_end > last_timestamp {
        events.push(IoEvent::new(adjusted_end, IoMode::Read, 0));
    }

    window_samples(&events, false)
}

/// Samples for a download, whose events come from sink writes.
pub fn download_samples(
    start: Instant,
    server_time: Duration,
    events: &[IoEvent],
) -> Vec<Sample<f64>> {
    let Some(first_timestamp) = events.first().map(|e| e.timestamp) else {
        return Vec::new();
    };

    let mut reversed: Vec<IoEvent> = events.iter().rev().copied().collect();
    let anchor = start + server_time;

    if first_timestamp > anchor {
        reversed.push(IoEvent::new(anchor, IoMode::Write, 0));
    }

    let mut samples = window_samples(&reversed, true);
    samples.reverse();

    samples
}

/// Samples for one measurement, in chronological order.
pub fn measurement_samples(measurement: &SpeedMeasurement) -> Vec<Sample<f64>> {
    match measurement.direction {
        Direction::Download => download_samples(
            measurement.start,
            measurement.server_time,
            measurement.events(),
        ),
        Direction::Upload => upload_samples(
            measurement.end,
            measurement.server_time,
            measurement.events(),
        ),
    }
}

/// Where a measurement's zero-rate anchor sits.
fn zero_point(measurement: &SpeedMeasurement) -> Instant {
    match measurement.direction {
        Direction::Download => measurement.start + measurement.server_time,
        Direction::Upload => measurement.start,
    }
}

/// Concatenate the samples of back-to-back measurements.
///
/// With `inject_zero_point`, each measurement is preceded by a zero sample
/// at its start so consecutive measurements read as one continuous series.
pub fn analyse_measurements(
    measurements: &[SpeedMeasurement],
    inject_zero_point: bool,
) -> SeriesAnalysis {
    let mut analysis = SeriesAnalysis::default();

    for measurement in measurements {
        if inject_zero_point {
            analysis.samples.push(Sample::new(0.0, zero_point(measurement)));
        }

        analysis.samples.extend(measurement_samples(measurement));
        analysis.total_bytes += measurement.size;
        analysis.duration += measurement.duration;
    }

    analysis
}

fn youngest_head(
    groups: &[Vec<Sample<f64>>],
    heads: &[Option<usize>],
) -> Option<(usize, Sample<f64>)> {
    let mut youngest: Option<(usize, Sample<f64>)> = None;

    for (group, head) in heads.iter().enumerate() {
        let Some(index) = *head else { continue };
        let sample = groups[group][index];

        if youngest.map_or(true, |(_, y)| sample.timestamp > y.timestamp) {
            youngest = Some((group, sample));
        }
    }

    youngest
}

/// Merge per-stream sample series into one aggregate series.
///
/// Walks all streams from their newest sample backwards, always taking the
/// latest remaining timestamp. Each stream contributes its most recently
/// seen rate; every distinct timestamp yields the sum across streams,
/// except where that sum is zero.
pub fn consolidate_grouped_samples(
    groups: &[Vec<Sample<f64>>],
) -> Vec<Sample<f64>> {
    let mut heads: Vec<Option<usize>> =
        groups.iter().map(|group| group.len().checked_sub(1)).collect();
    let mut rates = vec![0.0; groups.len()];
    let mut merged = Vec::new();

    while let Some((group, sample)) = youngest_head(groups, &heads) {
        rates[group] = sample.value;
        heads[group] = heads[group].and_then(|index| index.checked_sub(1));

        // streams sharing this timestamp are folded in before emitting
        if let Some((_, next)) = youngest_head(groups, &heads) {
            if next.timestamp == sample.timestamp {
                continue;
            }
        }

        let total: f64 = rates.iter().sum();
        if total != 0.0 {
            merged.push(Sample::new(total, sample.timestamp));
        }
    }

    merged.reverse();

    merged
}

/// Analyse concurrent streams, each a sequence of back-to-back
/// measurements.
///
/// The resulting duration is the span from the earliest start to the
/// latest end across all streams.
pub fn analyse_measurement_groups(
    groups: &[Vec<SpeedMeasurement>],
) -> SeriesAnalysis {
    let mut grouped_samples = Vec::with_capacity(groups.len());
    let mut total_bytes = 0;
    let mut first_start: Option<Instant> = None;
    let mut last_end: Option<Instant> = None;

    for measurements in groups {
        let analysis = analyse_measurements(measurements, true);
        total_bytes += analysis.total_bytes;
        grouped_samples.push(analysis.samples);

        if let Some(first) = measurements.first() {
            first_start =
                Some(first_start.map_or(first.start, |s| s.min(first.start)));
        }
        if let Some(last) = measurements.last() {
            last_end = Some(last_end.map_or(last.end, |e| e.max(last.end)));
        }
    }

    let duration = match (first_start, last_end) {
        (Some(start), Some(end)) => end.saturating_duration_since(start),
        _ => Duration::ZERO,
    };

    SeriesAnalysis {
        samples: consolidate_grouped_samples(&grouped_samples),
        total_bytes,
        duration,
    }
}

/// `8 × bytes / µs`, or zero for an empty duration.
pub fn calculate_mbps(bytes: u64, duration: Duration) -> f64 {
    let micros = duration.as_micros();

    if micros == 0 {
        return 0.0;
    }

    8.0 * bytes as f64 / micros as f64
}

/// Throughput statistics for one direction.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedMeasurementStats {
    /// Distribution of the windowed samples, in Mbit/s.
    #[serde(flatten)]
    pub stats: Stats,
    pub total_bytes: u64,
    /// Number of transfers the samples were taken from.
    pub measurement_count: usize,
    pub multiplicity: usize,
    /// Total bits over total (or spanned) time, in Mbit/s.
    pub aggregate_mbps: f64,
    /// Set when the run stopped early on an error but kept its partial
    /// results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<String>,
}

impl SpeedMeasurementStats {
    fn from_analysis(
        analysis: SeriesAnalysis,
        measurement_count: usize,
        multiplicity: usize,
    ) -> Self {
        Self {
            stats: Stats::from_series(&sample_values(&analysis.samples)),
            total_bytes: analysis.total_bytes,
            measurement_count,
            multiplicity,
            aggregate_mbps: calculate_mbps(
                analysis.total_bytes,
                analysis.duration,
            ),
            interrupted: None,
        }
    }

    /// Statistics for measurements taken one after another on one stream.
    pub fn single(measurements: &[SpeedMeasurement]) -> Self {
        Self::from_analysis(
            analyse_measurements(measurements, false),
            measurements.len(),
            1,
        )
    }

    /// Statistics for concurrent streams, one group per stream.
    pub fn multiplexed(groups: &[Vec<SpeedMeasurement>]) -> Self {
        Self::from_analysis(
            analyse_measurement_groups(groups),
            groups.iter().map(Vec::len).sum(),
            groups.len(),
        )
    }

    pub fn with_interruption(mut self, reason: impl Into<String>) -> Self {
        self.interrupted = Some(reason.into());
        self
    }
}
