//! HTTP layer: client construction, the population request, and response decoding.

use census_types::{
    Country, MissingDataPolicy, PopulationRecord, PopulationResult, PopulationValue,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolved::ResolvedConfig;
use crate::types::{ErrorCode, FetchError};

/// JSON pointer to the record list in a population response.
const POPULATION_COUNTS_POINTER: &str = "/data/populationCounts";

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Serialize)]
struct PopulationRequest<'a> {
    country: &'a str,
}

pub(crate) fn build_client(config: &ResolvedConfig) -> Result<reqwest::Client, FetchError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout);
    if let Some(connect_timeout) = config.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }
    builder.build().map_err(|e| {
        FetchError::new(
            ErrorCode::Internal,
            format!("failed to build HTTP client: {e}"),
        )
    })
}

/// Send one population request and interpret the answer.
pub(crate) async fn fetch(
    client: &reqwest::Client,
    config: &ResolvedConfig,
    country: &Country,
) -> Result<PopulationResult, FetchError> {
    tracing::debug!(country = %country, endpoint = %config.endpoint, "requesting population");

    let response = client
        .post(config.endpoint.clone())
        .json(&PopulationRequest {
            country: country.as_str(),
        })
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(&e, country))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(&e, country))?;

    if status.is_server_error() {
        return Err(server_error(status, &body, country));
    }

    let population = decode_latest(&body, country)
        .map_err(|e| e.with_detail("status", status.as_u16().to_string()))?;

    if !population.is_available() {
        tracing::debug!(country = %country, status = status.as_u16(), "no population records");
        if config.missing_data == MissingDataPolicy::Error {
            return Err(FetchError::new(
                ErrorCode::NoData,
                format!("no population data for {country}"),
            )
            .with_detail("country", country.as_str()));
        }
    }

    Ok(PopulationResult::new(country.clone(), population))
}

fn server_error(status: StatusCode, body: &[u8], country: &Country) -> FetchError {
    let snippet: String = String::from_utf8_lossy(body)
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    FetchError::new(
        ErrorCode::Http5xx,
        format!("server returned {status} for {country}"),
    )
    .with_detail("status", status.as_u16().to_string())
    .with_detail("country", country.as_str())
    .with_detail("body", snippet)
}

/// Extract the current population from a response body.
///
/// A body that is not JSON is a decode error. A JSON body without a
/// `data.populationCounts` list (or with `null` or `[]` there) carries no
/// population. Only the last entry of the list is read, and its `value` must be
/// a non-negative whole number; older entries are ignored.
pub(crate) fn decode_latest(
    body: &[u8],
    country: &Country,
) -> Result<PopulationValue, FetchError> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        FetchError::new(
            ErrorCode::Decode,
            format!("invalid JSON in response for {country}: {e}"),
        )
        .with_detail("country", country.as_str())
    })?;

    let latest = match payload.pointer(POPULATION_COUNTS_POINTER) {
        None | Some(Value::Null) => None,
        Some(Value::Array(counts)) => counts.last(),
        Some(_) => {
            return Err(FetchError::new(
                ErrorCode::Decode,
                format!("population counts for {country} are not a list"),
            )
            .with_detail("country", country.as_str()));
        }
    };

    let record = latest
        .map(PopulationRecord::deserialize)
        .transpose()
        .map_err(|e| {
            FetchError::new(
                ErrorCode::Decode,
                format!("malformed population record for {country}: {e}"),
            )
            .with_detail("country", country.as_str())
        })?;
    Ok(PopulationValue::latest(record.as_ref()))
}
