use crate::cloudflare::requests::Request;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use std::borrow::Cow;

/// `POST /__up?bytes=N` with an octet-stream body of up to `N` bytes.
///
/// The body is attached separately since it is streamed.
#[derive(Debug, Copy, Clone)]
pub struct Upload {
    pub bytes: u64,
}

impl Request for Upload {
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "__up".into()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("bytes", self.bytes.to_string())]
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );

        headers
    }
}
