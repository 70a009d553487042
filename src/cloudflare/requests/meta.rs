use crate::cloudflare::requests::Request;
use http::header::HeaderMap;
use serde::Serialize;
use std::borrow::Cow;

const NOT_AVAILABLE: &str = "N/A";

/// A zero-byte download, made only for the `cf-meta-*` response headers.
#[derive(Debug, Copy, Clone, Default)]
pub struct MetadataRequest;

impl Request for MetadataRequest {
    fn endpoint(&self) -> Cow<'_, str> {
        "__down".into()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("bytes", "0".to_string())]
    }
}

/// Who the endpoint thinks we are and which colo answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasurementMetadata {
    pub src_ip: String,
    pub src_asn: String,
    pub src_city: String,
    pub src_country: String,
    pub dst_colo: String,
}

impl MeasurementMetadata {
    /// Read the `cf-meta-*` headers. Missing or non-UTF-8 values read as
    /// `N/A`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let meta = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(NOT_AVAILABLE)
                .to_string()
        };

        Self {
            src_ip: meta("cf-meta-ip"),
            src_asn: meta("cf-meta-asn"),
            src_city: meta("cf-meta-city"),
            src_country: meta("cf-meta-country"),
            dst_colo: meta("cf-meta-colo"),
        }
    }
}
