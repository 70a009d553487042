//! Link speed measurement against Cloudflare's speed test endpoint.
//!
//! Transfers are timed at the byte-stream level by an instrumented
//! transport; [`throughput`] turns those timings into bitrate samples and
//! [`stats`] summarises them.

pub mod cloudflare;
pub mod errors;
pub mod measurements;
pub mod results;
pub mod sampler;
pub mod stats;
pub mod throughput;
