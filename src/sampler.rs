//! Byte-stream instrumentation.
//!
//! An [`InstrumentedTransport`] sits between an HTTP body and whatever is
//! producing or consuming it. Every call is timestamped into an
//! [`IoSampler`], and the transport stops granting bytes once its quota is
//! spent or its deadline has passed. Uploads pull their body through
//! [`InstrumentedTransport::read`]; downloads push received chunks through
//! [`InstrumentedTransport::write`].

use tokio::time::Instant;

/// Which side of the transport an event was recorded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    Read,
    Write,
}

/// One transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoEvent {
    pub timestamp: Instant,
    pub mode: IoMode,
    pub size: usize,
}

impl IoEvent {
    pub const fn new(timestamp: Instant, mode: IoMode, size: usize) -> Self {
        Self { timestamp, mode, size }
    }
}

/// Ordered record of transport calls plus running byte totals.
#[derive(Debug, Clone, Default)]
pub struct IoSampler {
    events: Vec<IoEvent>,
    bytes_read: u64,
    bytes_written: u64,
}

impl IoSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sampler from already-recorded events.
    pub fn from_events(events: Vec<IoEvent>) -> Self {
        let mut sampler = Self::new();

        for event in events {
            sampler.record(event);
        }

        sampler
    }

    pub fn record(&mut self, event: IoEvent) {
        match event.mode {
            IoMode::Read => self.bytes_read += event.size as u64,
            IoMode::Write => self.bytes_written += event.size as u64,
        }

        self.events.push(event);
    }

    pub fn events(&self) -> &[IoEvent] {
        &self.events
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// Outcome of one transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Bytes granted (read) or accepted (write).
    pub size: usize,
    /// The caller should stop moving bytes through this transport.
    pub end_of_stream: bool,
}

/// A quota- and deadline-bounded byte adapter that records every call.
///
/// The deadline is only consulted when a call is made; nothing in flight is
/// interrupted.
#[derive(Debug)]
pub struct InstrumentedTransport {
    sampler: IoSampler,
    quota: u64,
    deadline: Instant,
    granted: u64,
}

impl InstrumentedTransport {
    pub fn new(quota: u64, deadline: Instant) -> Self {
        Self { sampler: IoSampler::new(), quota, deadline, granted: 0 }
    }

    /// Grant up to `buf.len()` bytes of the remaining quota.
    ///
    /// The buffer is left as-is; callers supply the payload. Once the
    /// deadline has passed nothing is granted, whatever quota remains.
    pub fn read(&mut self, buf: &mut [u8]) -> Transfer {
        let now = Instant::now();
        let requested = buf.len();

        let transfer = if now >= self.deadline {
            Transfer { size: 0, end_of_stream: true }
        } else {
            let remaining = self.quota.saturating_sub(self.granted);
            let size = remaining.min(requested as u64) as usize;

            self.granted += size as u64;

            Transfer { size, end_of_stream: size < requested }
        };

        self.sampler.record(IoEvent::new(now, IoMode::Read, transfer.size));

        transfer
    }

    /// Accept all of `buf`.
    ///
    /// `end_of_stream` is set once the cumulative total exceeds the quota or
    /// the deadline has passed.
    pub fn write(&mut self, buf: &[u8]) -> Transfer {
        let now = Instant::now();
        let size = buf.len();

        self.granted += size as u64;
        self.sampler.record(IoEvent::new(now, IoMode::Write, size));

        Transfer {
            size,
            end_of_stream: self.granted > self.quota || now >= self.deadline,
        }
    }

    pub fn sampler(&self) -> &IoSampler {
        &self.sampler
    }

    /// Take the recorded events, leaving an empty sampler behind.
    pub fn take_sampler(&mut self) -> IoSampler {
        std::mem::take(&mut self.sampler)
    }

    pub fn into_sampler(self) -> IoSampler {
        self.sampler
    }
}
