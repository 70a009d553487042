use crate::cloudflare::requests::Request;
use std::borrow::Cow;

/// `GET /__down?bytes=N`: the server streams back `N` bytes.
#[derive(Debug, Copy, Clone)]
pub struct Download {
    pub bytes: u64,
}

impl Request for Download {
    fn endpoint(&self) -> Cow<'_, str> {
        "__down".into()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("bytes", self.bytes.to_string())]
    }
}
