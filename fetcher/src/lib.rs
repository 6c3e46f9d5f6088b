//! Country population fetching with concurrent and sequential orchestration.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Configuration, batch outcomes, structured errors |
//! | [`strategy`] | Manual, fan-out, sequential, and ordered-stream orchestration |
//! | `http` | Client construction, request encoding, response decoding |
//! | `resolved` | Config resolution eliminating `Option` handling |
//!
//! # Usage
//!
//! ```ignore
//! use census_fetcher::{FetchConfig, PopulationFetcher, strategy};
//!
//! let fetcher = PopulationFetcher::new(&FetchConfig::default())?;
//! let outcomes = strategy::fan_out(&fetcher, &countries).await;
//! ```
//!
//! # Error Handling
//!
//! "No data for this country" is not an error: it comes back as
//! [`PopulationValue::Unavailable`] unless the config asks for
//! [`MissingDataPolicy::Error`]. Transport failures are [`FetchError`] with a
//! stable [`ErrorCode`].

mod http;
mod resolved;
pub mod strategy;
mod types;

use std::future::Future;

use resolved::ResolvedConfig;

pub use census_types::{
    Country, MissingDataPolicy, PopulationRecord, PopulationResult, PopulationValue,
};
pub use types::{CountryOutcome, ErrorCode, ErrorDetails, FetchConfig, FetchError};

/// Something that can look up one country's population.
///
/// The orchestrators in [`strategy`] are written against this trait so they
/// can be driven by the HTTP fetcher or by an in-memory source.
pub trait PopulationSource {
    fn fetch_population(
        &self,
        country: &Country,
    ) -> impl Future<Output = Result<PopulationResult, FetchError>> + Send;
}

/// HTTP-backed population source.
///
/// Holds one pooled `reqwest::Client`; cloning is cheap and clones share the pool.
#[derive(Debug, Clone)]
pub struct PopulationFetcher {
    client: reqwest::Client,
    config: ResolvedConfig,
}

impl PopulationFetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` with [`ErrorCode::InvalidEndpoint`] if the endpoint
    /// is not an http(s) URL, or [`ErrorCode::Internal`] if the HTTP client
    /// cannot be constructed.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let config = ResolvedConfig::from_config(config)?;
        let client = http::build_client(&config)?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.config.endpoint.as_str()
    }

    #[must_use]
    pub fn missing_data(&self) -> MissingDataPolicy {
        self.config.missing_data
    }
}

impl PopulationSource for PopulationFetcher {
    /// Issue a single request for `country` and return its latest population.
    ///
    /// The last entry of the API's population history is taken as current.
    async fn fetch_population(&self, country: &Country) -> Result<PopulationResult, FetchError> {
        http::fetch(&self.client, &self.config, country).await
    }
}
