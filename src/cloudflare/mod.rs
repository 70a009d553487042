//! Cloudflare speed test endpoint: HTTP client, request shapes and the
//! measurement runs built on top of them.

pub mod client;
pub mod requests;
pub mod tests;
