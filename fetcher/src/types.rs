//! Configuration, outcome, and error types for the population fetcher.

use census_types::{Country, MissingDataPolicy, PopulationResult, PopulationValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fetcher configuration.
///
/// Maps to the `[fetch]` table in the census config file. Every field is optional;
/// unset values resolve to the associated `DEFAULT_*` constants.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FetchConfig {
    /// Population endpoint URL.
    pub endpoint: Option<String>,

    /// Whole-request timeout in seconds. Default: 20.
    pub timeout_seconds: Option<u32>,

    /// Connect timeout in seconds. Unset means only the request timeout applies.
    pub connect_timeout_seconds: Option<u32>,

    /// User-Agent string for HTTP requests.
    pub user_agent: Option<String>,

    /// Behavior when the API answers without population records.
    #[serde(default)]
    pub missing_data: MissingDataPolicy,
}

impl FetchConfig {
    /// Default population endpoint.
    pub const DEFAULT_ENDPOINT: &'static str =
        "https://countriesnow.space/api/v0.1/countries/population";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECONDS: u32 = 20;

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(Self::DEFAULT_ENDPOINT)
    }

    #[must_use]
    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds.unwrap_or(Self::DEFAULT_TIMEOUT_SECONDS)
    }
}

/// The settled outcome of one country's fetch inside a batch.
///
/// `result` keeps the two failure classes apart: `Ok` with
/// [`PopulationValue::Unavailable`] means the API had no data, `Err` means the
/// request itself failed.
#[derive(Debug, Clone)]
pub struct CountryOutcome {
    pub country: Country,
    pub result: Result<PopulationResult, FetchError>,
}

impl CountryOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Population if the fetch succeeded, `None` on failure.
    #[must_use]
    pub fn population(&self) -> Option<PopulationValue> {
        self.result.as_ref().ok().map(|r| r.population)
    }

    /// Collapse a failure into the unavailable sentinel.
    #[must_use]
    pub fn into_result_or_unavailable(self) -> PopulationResult {
        match self.result {
            Ok(result) => result,
            Err(_) => PopulationResult::unavailable(self.country),
        }
    }
}

/// Fetch error with a stable code and structured details.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    /// Stable error code.
    pub code: ErrorCode,

    /// Human-readable description.
    pub message: String,

    /// Whether retry may succeed.
    pub retryable: bool,

    /// Error-specific context.
    pub details: ErrorDetails,
}

impl FetchError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.default_retryable(),
            details: ErrorDetails::default(),
        }
    }

    /// Add a detail field.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.0.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to JSON for machine-readable logs.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "error": true,
            "code": self.code,
            "message": self.message,
            "retryable": self.retryable,
        });

        if !self.details.0.is_empty() {
            let details: serde_json::Map<String, serde_json::Value> = self
                .details
                .0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            obj["details"] = serde_json::Value::Object(details);
        }

        obj
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error, country: &Country) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::Timeout
        } else if err.is_decode() {
            ErrorCode::Decode
        } else {
            ErrorCode::Network
        };
        Self::new(code, format!("request for {country} failed: {err}"))
            .with_detail("country", country.as_str())
    }
}

/// Error code registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Configured endpoint is not a valid http(s) URL.
    InvalidEndpoint,
    /// Request timeout.
    Timeout,
    /// Network/connection error.
    Network,
    /// HTTP 5xx server error.
    #[serde(rename = "http_5xx")]
    Http5xx,
    /// Response body is not the expected JSON.
    Decode,
    /// API answered without population records and the policy is `error`.
    NoData,
    /// Unexpected internal error (e.g. HTTP client could not be built).
    Internal,
}

impl ErrorCode {
    /// Check if this error code is retryable by default.
    #[must_use]
    pub fn default_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::Timeout | ErrorCode::Network | ErrorCode::Http5xx
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidEndpoint => "invalid_endpoint",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Network => "network",
            ErrorCode::Http5xx => "http_5xx",
            ErrorCode::Decode => "decode",
            ErrorCode::NoData => "no_data",
            ErrorCode::Internal => "internal",
        }
    }
}

/// Error details as key-value pairs.
#[derive(Debug, Clone, Default)]
pub struct ErrorDetails(pub Vec<(String, String)>);
