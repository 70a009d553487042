pub mod download;
pub mod meta;
pub mod upload;

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::Method;
use std::borrow::Cow;

/// Shape of a request against the speed test endpoint.
pub trait Request {
    const METHOD: Method = Method::GET;

    /// Path relative to the endpoint's base URL.
    fn endpoint(&self) -> Cow<'_, str>;

    fn query(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        headers
    }
}
