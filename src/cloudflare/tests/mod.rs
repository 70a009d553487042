//! Measurement runs against the speed test endpoint.
//!
//! [`download`] and [`upload`] time single transfers; [`engine`] repeats
//! them within a time budget, optionally over several concurrent streams,
//! and reduces the results.

use crate::errors::SpeedTestError;
use crate::measurements::SpeedMeasurement;
use std::future::Future;
use tokio::time::Instant;



/// Something that performs one transfer of at most `max_size` bytes,
/// stopping at `deadline`.
///
/// Implemented for any cloneable closure returning a future, which is how
/// both the HTTP client and synthetic test transfers are plugged into the
/// engine.
pub trait Measure: Clone + Send + Sync + 'static {
    type Future: Future<Output = Result<SpeedMeasurement, SpeedTestError>>
        + Send
        + 'static;

    fn measure(&self, max_size: u64, deadline: Instant) -> Self::Future;
}

impl<F, Fut> Measure for F
where
    F: Fn(u64, Instant) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<SpeedMeasurement, SpeedTestError>>
        + Send
        + 'static,
{
    type Future = Fut;

    fn measure(&self, max_size: u64, deadline: Instant) -> Self::Future {
        self(max_size, deadline)
    }
}
