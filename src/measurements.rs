use crate::sampler::{IoEvent, IoSampler};
use http::header::HeaderMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Name of the response header carrying the server-side processing time.
pub const SERVER_TIMING: &str = "server-timing";

const REQUEST_DURATION_METRIC: &str = "cfRequestDuration;dur=";

/// Which way the bytes of a measurement travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    /// Label used in the text report.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Download => "Downlink",
            Direction::Upload => "Uplink",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Download => write!(f, "download"),
            Direction::Upload => write!(f, "upload"),
        }
    }
}

/// A timestamped value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    pub value: T,
    pub timestamp: Instant,
}

impl<T> Sample<T> {
    pub const fn new(value: T, timestamp: Instant) -> Self {
        Self { value, timestamp }
    }
}

/// Values of `samples`, in order.
pub fn sample_values<T: Copy>(samples: &[Sample<T>]) -> Vec<T> {
    samples.iter().map(|sample| sample.value).collect()
}

/// One completed transfer.
#[derive(Debug, Clone)]
pub struct SpeedMeasurement {
    pub direction: Direction,
    /// Bytes actually moved, which may be below the requested size when the
    /// deadline cut the transfer short.
    pub size: u64,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
    pub sampler: IoSampler,
    /// Server processing time taken from the `server-timing` header.
    pub server_time: Duration,
    pub headers: HeaderMap,
}

impl SpeedMeasurement {
    pub fn new(
        direction: Direction,
        size: u64,
        start: Instant,
        end: Instant,
        sampler: IoSampler,
        server_time: Duration,
        headers: HeaderMap,
    ) -> Self {
        Self {
            direction,
            size,
            start,
            end,
            duration: end.saturating_duration_since(start),
            sampler,
            server_time,
            headers,
        }
    }

    pub fn events(&self) -> &[IoEvent] {
        self.sampler.events()
    }

    /// Wall-clock duration minus server processing time, floored at zero.
    pub fn network_duration(&self) -> Duration {
        self.duration.saturating_sub(self.server_time)
    }
}

/// Parse the `cfRequestDuration;dur=<ms>` metric of a `server-timing` value.
///
/// # Examples
/// ```
/// use cfspeed::measurements::parse_server_timing;
/// use std::time::Duration;
///
/// assert_eq!(
///     parse_server_timing("cfRequestDuration;dur=12.5"),
///     Some(Duration::from_micros(12_500))
/// );
/// assert_eq!(parse_server_timing("cfL4;desc=x"), None);
/// ```
pub fn parse_server_timing(value: &str) -> Option<Duration> {
    let (_, rest) = value.split_once(REQUEST_DURATION_METRIC)?;
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());

    let millis: f64 = rest[..end].parse().ok()?;

    if !millis.is_finite() {
        return None;
    }

    Some(Duration::from_nanos((millis * 1_000_000.0).round() as u64))
}

/// Server processing time from response headers, zero when absent or
/// malformed.
pub fn server_processing_time(headers: &HeaderMap) -> Duration {
    headers
        .get_all(SERVER_TIMING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_server_timing)
        .unwrap_or(Duration::ZERO)
}
