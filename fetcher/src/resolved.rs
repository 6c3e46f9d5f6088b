//! Resolved configuration.
//!
//! Converts the optional, file-level [`FetchConfig`] into concrete values the
//! HTTP layer can use without further `Option` handling.
use std::time::Duration;

use census_types::MissingDataPolicy;
use url::Url;

use crate::types::{ErrorCode, FetchConfig, FetchError};

pub(crate) const DEFAULT_USER_AGENT: &str = concat!("census/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub endpoint: Url,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Option<Duration>,
    pub missing_data: MissingDataPolicy,
}

impl ResolvedConfig {
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let raw_endpoint = config.endpoint();
        let endpoint = Url::parse(raw_endpoint).map_err(|e| {
            FetchError::new(
                ErrorCode::InvalidEndpoint,
                format!("failed to parse endpoint URL: {e}"),
            )
            .with_detail("endpoint", raw_endpoint)
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(FetchError::new(
                ErrorCode::InvalidEndpoint,
                format!("unsupported endpoint scheme: {}", endpoint.scheme()),
            )
            .with_detail("endpoint", raw_endpoint));
        }

        let user_agent = config
            .user_agent
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let timeout = Duration::from_secs(u64::from(config.timeout_seconds().max(1)));
        let connect_timeout = config
            .connect_timeout_seconds
            .filter(|s| *s > 0)
            .map(|s| Duration::from_secs(u64::from(s)));

        Ok(Self {
            endpoint,
            user_agent,
            timeout,
            connect_timeout,
            missing_data: config.missing_data,
        })
    }
}
