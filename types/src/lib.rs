//! Core domain types for census.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Both the fetcher and the CLI speak in these types.

#![allow(clippy::missing_errors_doc)]

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Country
// ============================================================================

/// A country name guaranteed to be non-empty (after trimming).
///
/// No other validation is applied: the name is forwarded to the remote API as given,
/// and whether it is recognized is the remote API's decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Country(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("country name must not be empty")]
pub struct EmptyCountryError;

impl Country {
    pub fn new(name: impl Into<String>) -> Result<Self, EmptyCountryError> {
        let name = name.into();
        if name.trim().is_empty() {
            Err(EmptyCountryError)
        } else {
            Ok(Self(name))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Country {
    type Error = EmptyCountryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a list of names, rejecting the whole list if any entry is empty.
pub fn parse_countries<I, S>(names: I) -> Result<Vec<Country>, EmptyCountryError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Country::new).collect()
}

// ============================================================================
// Population
// ============================================================================

/// One dated population measurement as reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PopulationRecord {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(deserialize_with = "deserialize_count")]
    pub value: u64,
}

/// Accepts any non-negative whole JSON number, including integral floats
/// such as `66987244.0`.
fn deserialize_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    struct CountVisitor;

    impl Visitor<'_> for CountVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative whole number")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value).map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<u64, E> {
            let whole = value.is_finite() && value.fract() == 0.0;
            if whole && value >= 0.0 && value < u64::MAX as f64 {
                Ok(value as u64)
            } else {
                Err(E::invalid_value(Unexpected::Float(value), &self))
            }
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

/// Text printed in place of a population count when none is known.
pub const NOT_AVAILABLE: &str = "Not Available";

/// A population count, or the explicit marker that the remote API had no usable data.
///
/// `Unavailable` is a soft outcome: it is distinct from a transport failure, which
/// never produces a `PopulationValue` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PopulationValue {
    Count(u64),
    #[default]
    Unavailable,
}

impl PopulationValue {
    /// Value of the most recent record, if any. The remote API orders records
    /// oldest first.
    #[must_use]
    pub fn latest(latest_record: Option<&PopulationRecord>) -> Self {
        latest_record.map_or(Self::Unavailable, |record| Self::Count(record.value))
    }

    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Count(_))
    }
}

impl fmt::Display for PopulationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(value) => write!(f, "{value}"),
            Self::Unavailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// A country paired with its population. Created per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationResult {
    pub country: Country,
    pub population: PopulationValue,
}

impl PopulationResult {
    #[must_use]
    pub fn new(country: Country, population: PopulationValue) -> Self {
        Self {
            country,
            population,
        }
    }

    #[must_use]
    pub fn unavailable(country: Country) -> Self {
        Self::new(country, PopulationValue::Unavailable)
    }
}

impl fmt::Display for PopulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.country, self.population)
    }
}

// ============================================================================
// Missing data policy
// ============================================================================

/// What to do when the remote API answers but carries no population records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDataPolicy {
    /// Return [`PopulationValue::Unavailable`].
    #[default]
    Sentinel,
    /// Fail the fetch with a no-data error.
    Error,
}

impl MissingDataPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sentinel => "sentinel",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sentinel" => Some(Self::Sentinel),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}
