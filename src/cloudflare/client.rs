use crate::cloudflare::requests::meta::{MeasurementMetadata, MetadataRequest};
use crate::cloudflare::requests::Request;
use crate::errors::SpeedTestError;
use log::debug;
use reqwest::{Client as ReqwestClient, RequestBuilder};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use url::Url;

pub static BASE_URL: &str = "https://speed.cloudflare.com";

const USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// IP version used to reach the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFamily {
    /// Let the resolver and the OS decide.
    #[default]
    Auto,
    V4,
    V6,
}

impl AddressFamily {
    /// Local address to bind, which pins the family of outgoing
    /// connections.
    fn local_address(&self) -> Option<IpAddr> {
        match self {
            AddressFamily::Auto => None,
            AddressFamily::V4 => Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            AddressFamily::V6 => Some(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Auto => write!(f, "auto"),
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Transport settings for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub family: AddressFamily,
    pub connect_timeout: Duration,
    pub tcp_keepalive: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            family: AddressFamily::Auto,
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 100,
        }
    }
}

/// HTTP client bound to one address family and one endpoint.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    client: ReqwestClient,
    base_url: Url,
    family: AddressFamily,
}

impl Client {
    pub fn new(family: AddressFamily) -> Result<Self, SpeedTestError> {
        Self::with_config(ClientConfig { family, ..ClientConfig::default() })
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, SpeedTestError> {
        // HTTP/1.1 keeps every concurrent transfer on its own connection
        let client = ReqwestClient::builder()
            .user_agent(USER_AGENT)
            .http1_only()
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(config.tcp_keepalive)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .local_address(config.family.local_address())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url(&config.base_url)?,
            family: config.family,
        })
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Absolute URL for `request`, query included.
    pub fn url<R: Request>(&self, request: &R) -> Result<Url, SpeedTestError> {
        let endpoint = request.endpoint();
        let mut url = self.base_url.join(endpoint.trim_start_matches('/'))?;

        let query = request.query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// A request builder with the request's method, URL and headers set.
    pub(crate) fn request<R: Request>(
        &self,
        request: &R,
    ) -> Result<RequestBuilder, SpeedTestError> {
        let url = self.url(request)?;

        Ok(self.client.request(R::METHOD, url).headers(request.headers()))
    }

    /// Fetch who and where the endpoint sees us as.
    pub async fn metadata(
        &self,
    ) -> Result<MeasurementMetadata, SpeedTestError> {
        debug!("Fetching measurement metadata over {}", self.family);

        let response =
            self.request(&MetadataRequest)?.send().await?.error_for_status()?;
        let headers = response.headers().clone();

        response.bytes().await?;

        Ok(MeasurementMetadata::from_headers(&headers))
    }
}

/// Parse the base URL, making sure joins land below its path.
fn base_url(raw: &str) -> Result<Url, SpeedTestError> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{}/", raw))?)
    }
}
