//! Error types for link measurements.
//!
//! Every failure is reduced to a [`SpeedTestError`] carrying a category, a
//! message and, where one helps, a hint for the user. The category decides
//! the process exit code.

use std::error::Error;
use std::fmt;

/// Exit codes for the application.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// Connection failed, timed out, or could not be resolved.
    pub const NETWORK_ERROR: i32 = 1;
    /// The endpoint answered with an error status.
    pub const API_ERROR: i32 = 2;
    /// Invalid arguments.
    pub const CONFIG_ERROR: i32 = 3;
    /// At least one direction or latency run failed while others completed.
    pub const PARTIAL_FAILURE: i32 = 4;
    pub const UNKNOWN_ERROR: i32 = 99;
}

/// Categories of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Dns,
    Timeout,
    Tls,
    /// Non-success HTTP status or an unusable response.
    Api,
    Config,
    /// The transfers ran but produced nothing to report.
    Measurement,
    Unknown,
}

impl ErrorKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Network
            | ErrorKind::Dns
            | ErrorKind::Timeout
            | ErrorKind::Tls => exit_codes::NETWORK_ERROR,
            ErrorKind::Api => exit_codes::API_ERROR,
            ErrorKind::Config => exit_codes::CONFIG_ERROR,
            ErrorKind::Measurement => exit_codes::PARTIAL_FAILURE,
            ErrorKind::Unknown => exit_codes::UNKNOWN_ERROR,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Network error",
            ErrorKind::Dns => "DNS resolution error",
            ErrorKind::Timeout => "Connection timeout",
            ErrorKind::Tls => "TLS/SSL error",
            ErrorKind::Api => "API error",
            ErrorKind::Config => "Configuration error",
            ErrorKind::Measurement => "Measurement error",
            ErrorKind::Unknown => "Unknown error",
        }
    }

    /// Default hint shown alongside errors of this kind.
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            ErrorKind::Network => {
                Some("Check your internet connection and try again.")
            }
            ErrorKind::Dns => Some(
                "Check your DNS settings, or force an address family \
                 with -4 or -6.",
            ),
            ErrorKind::Timeout => Some(
                "The speed test endpoint may be slow or unreachable. \
                 Try again later.",
            ),
            ErrorKind::Tls => Some(
                "There may be a certificate issue. Check your system time.",
            ),
            ErrorKind::Api => Some(
                "The Cloudflare speed test endpoint may be experiencing \
                 issues. Try again later.",
            ),
            ErrorKind::Config | ErrorKind::Measurement | ErrorKind::Unknown => {
                None
            }
        }
    }
}

/// A categorised error with an optional hint and underlying cause.
#[derive(Debug)]
pub struct SpeedTestError {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl SpeedTestError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None, source: None }
    }

    /// Like [`SpeedTestError::new`], with the kind's default hint attached.
    pub fn with_default_suggestion(
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        let error = Self::new(kind, message);

        match kind.suggestion() {
            Some(suggestion) => error.with_suggestion(suggestion),
            None => error,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(
        mut self,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::with_default_suggestion(ErrorKind::Network, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn measurement(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Measurement, message)
    }
}

impl fmt::Display for SpeedTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }

        Ok(())
    }
}

impl Error for SpeedTestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<reqwest::Error> for SpeedTestError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            ErrorKind::Timeout
        } else if error.is_status() {
            ErrorKind::Api
        } else {
            // reqwest reports DNS and TLS failures as connect errors
            match classify_error(&error) {
                ErrorKind::Unknown if error.is_connect() => ErrorKind::Network,
                kind => kind,
            }
        };

        Self::with_default_suggestion(kind, error.to_string())
            .with_source(error)
    }
}

impl From<url::ParseError> for SpeedTestError {
    fn from(error: url::ParseError) -> Self {
        Self::config(format!("invalid endpoint URL: {}", error))
            .with_source(error)
    }
}

/// Classify an error by walking its message and its chain of sources.
pub fn classify_error(error: &(dyn Error + 'static)) -> ErrorKind {
    let mut text = error.to_string().to_lowercase();
    let mut source = error.source();

    while let Some(cause) = source {
        text.push(' ');
        text.push_str(&cause.to_string().to_lowercase());
        source = cause.source();
    }

    if text.contains("dns")
        || text.contains("resolve")
        || text.contains("no such host")
    {
        return ErrorKind::Dns;
    }

    if text.contains("timeout")
        || text.contains("timed out")
        || text.contains("deadline")
    {
        return ErrorKind::Timeout;
    }

    if text.contains("tls")
        || text.contains("ssl")
        || text.contains("certificate")
        || text.contains("handshake")
    {
        return ErrorKind::Tls;
    }

    if text.contains("connection refused")
        || text.contains("connection reset")
        || text.contains("network unreachable")
        || text.contains("host unreachable")
        || text.contains("no route")
        || text.contains("broken pipe")
    {
        return ErrorKind::Network;
    }

    if text.contains("status: 4")
        || text.contains("status: 5")
        || text.contains("server error")
    {
        return ErrorKind::Api;
    }

    ErrorKind::Unknown
}

/// Render an error for the terminal.
pub fn format_error_for_display(error: &SpeedTestError) -> String {
    let mut output = format!("Error: {}", error.message);

    if let Some(ref suggestion) = error.suggestion {
        output.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    output
}
