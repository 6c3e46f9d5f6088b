//! Orchestration strategies over a [`PopulationSource`].
//!
//! | Strategy | Concurrency | On a failed item |
//! |----------|-------------|------------------|
//! | [`manual`] | one at a time | abort, return the error |
//! | [`fan_out`] | all at once, wait for all | record it, keep the rest |
//! | [`sequential`] | one at a time | substitute `Not Available`, continue |
//! | [`ordered`] | all at once, yield in input order | yield it; caller decides |
//!
//! None of these spawn tasks. Concurrent strategies multiplex futures on the
//! calling task, so they behave the same on a current-thread runtime.

use futures_util::future::join_all;
use futures_util::stream::{FuturesOrdered, Stream};
use thiserror::Error;

use crate::{Country, CountryOutcome, FetchError, PopulationResult, PopulationSource};

/// A manual run that stopped early. Keeps whatever completed before the failure.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct ManualAbort {
    pub completed: Vec<PopulationResult>,
    pub failed: Country,
    #[source]
    pub error: FetchError,
}

/// Fetch each country in turn and stop at the first failure.
///
/// Countries after the failing one are never requested.
pub async fn manual<S: PopulationSource>(
    source: &S,
    countries: &[Country],
) -> Result<Vec<PopulationResult>, ManualAbort> {
    let mut completed = Vec::with_capacity(countries.len());
    for country in countries {
        match source.fetch_population(country).await {
            Ok(result) => completed.push(result),
            Err(error) => {
                return Err(ManualAbort {
                    completed,
                    failed: country.clone(),
                    error,
                });
            }
        }
    }
    Ok(completed)
}

/// Fetch every country concurrently and return once all have settled.
///
/// The output has one entry per input, in input order, regardless of which
/// request finished first. A failure is recorded in its slot and does not
/// cancel or delay the others.
pub async fn fan_out<S: PopulationSource>(
    source: &S,
    countries: &[Country],
) -> Vec<CountryOutcome> {
    let pending = countries.iter().map(|country| settle(source, country));
    let outcomes = join_all(pending).await;

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    tracing::debug!(total = outcomes.len(), failed, "fan-out settled");
    outcomes
}

/// Fetch countries one at a time, substituting the unavailable sentinel on failure.
///
/// Each request starts only after the previous one has completed. The loop never
/// aborts early: the output always has one entry per input, in input order.
pub async fn sequential<S: PopulationSource>(
    source: &S,
    countries: &[Country],
) -> Vec<PopulationResult> {
    let mut results = Vec::with_capacity(countries.len());
    for country in countries {
        let outcome = settle(source, country).await;
        if let Err(err) = &outcome.result {
            tracing::warn!(
                country = %country,
                code = err.code.as_str(),
                "fetch failed, using sentinel: {err}"
            );
        }
        results.push(outcome.into_result_or_unavailable());
    }
    results
}

/// Start every fetch at once and yield outcomes in input order.
///
/// Requests begin when the stream is first polled. An outcome is yielded as soon
/// as it and all outcomes before it have settled, so a slow early country holds
/// back faster later ones.
pub fn ordered<'a, S: PopulationSource>(
    source: &'a S,
    countries: &'a [Country],
) -> impl Stream<Item = CountryOutcome> + 'a {
    countries
        .iter()
        .map(|country| settle(source, country))
        .collect::<FuturesOrdered<_>>()
}

async fn settle<S: PopulationSource>(source: &S, country: &Country) -> CountryOutcome {
    CountryOutcome {
        country: country.clone(),
        result: source.fetch_population(country).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorCode, PopulationValue};
    use futures_util::StreamExt;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Copy)]
    enum Reply {
        Count(u64),
        Missing,
        Fail,
    }

    /// In-memory source that records call order and peak concurrency.
    struct FakeSource {
        replies: HashMap<String, (Reply, u64)>,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn new(replies: &[(&str, Reply, u64)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(name, reply, delay_ms)| ((*name).to_string(), (*reply, *delay_ms)))
                    .collect(),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn peak(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    impl PopulationSource for FakeSource {
        async fn fetch_population(
            &self,
            country: &Country,
        ) -> Result<PopulationResult, FetchError> {
            self.calls.lock().unwrap().push(country.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            let (reply, delay_ms) = self
                .replies
                .get(country.as_str())
                .copied()
                .unwrap_or((Reply::Missing, 0));
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match reply {
                Reply::Count(n) => Ok(PopulationResult::new(
                    country.clone(),
                    PopulationValue::Count(n),
                )),
                Reply::Missing => Ok(PopulationResult::unavailable(country.clone())),
                Reply::Fail => Err(FetchError::new(ErrorCode::Network, "connection refused")),
            }
        }
    }

    fn countries(names: &[&str]) -> Vec<Country> {
        census_types::parse_countries(names.iter().copied()).unwrap()
    }

    #[tokio::test]
    async fn fan_out_preserves_order_and_marks_failures() {
        let source = FakeSource::new(&[
            ("France", Reply::Count(68_000_000), 40),
            ("Germany", Reply::Fail, 0),
            ("Atlantis", Reply::Missing, 10),
            ("Spain", Reply::Count(47_000_000), 0),
        ]);
        let input = countries(&["France", "Germany", "Atlantis", "Spain"]);

        let outcomes = fan_out(&source, &input).await;

        assert_eq!(outcomes.len(), 4);
        let names: Vec<&str> = outcomes.iter().map(|o| o.country.as_str()).collect();
        assert_eq!(names, ["France", "Germany", "Atlantis", "Spain"]);
        assert_eq!(outcomes.iter().filter(|o| !o.is_success()).count(), 1);
        assert_eq!(
            outcomes[0].population(),
            Some(PopulationValue::Count(68_000_000))
        );
        assert!(!outcomes[1].is_success());
        assert_eq!(outcomes[2].population(), Some(PopulationValue::Unavailable));
        assert_eq!(source.peak(), 4);
    }

    #[tokio::test]
    async fn fan_out_of_empty_input_is_empty() {
        let source = FakeSource::new(&[]);
        assert!(fan_out(&source, &[]).await.is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn sequential_runs_one_at_a_time_and_substitutes_sentinel() {
        let source = FakeSource::new(&[
            ("France", Reply::Count(68_000_000), 5),
            ("Germany", Reply::Fail, 5),
            ("Spain", Reply::Count(47_000_000), 5),
        ]);
        let input = countries(&["France", "Germany", "Spain"]);

        let results = sequential(&source, &input).await;

        assert_eq!(source.peak(), 1);
        assert_eq!(source.calls(), ["France", "Germany", "Spain"]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].population, PopulationValue::Count(68_000_000));
        assert_eq!(results[1].country.as_str(), "Germany");
        assert_eq!(results[1].population, PopulationValue::Unavailable);
        assert_eq!(results[2].population, PopulationValue::Count(47_000_000));
    }

    #[tokio::test]
    async fn manual_stops_at_first_failure() {
        let source = FakeSource::new(&[
            ("France", Reply::Fail, 0),
            ("Germany", Reply::Count(83_000_000), 0),
        ]);
        let input = countries(&["France", "Germany"]);

        let abort = manual(&source, &input).await.unwrap_err();

        assert_eq!(abort.error.code, ErrorCode::Network);
        assert_eq!(abort.failed.as_str(), "France");
        assert!(abort.completed.is_empty());
        assert_eq!(source.calls(), ["France"]);
    }

    #[tokio::test]
    async fn manual_keeps_results_before_failure() {
        let source = FakeSource::new(&[
            ("France", Reply::Count(68_000_000), 0),
            ("Germany", Reply::Fail, 0),
            ("Spain", Reply::Count(47_000_000), 0),
        ]);
        let input = countries(&["France", "Germany", "Spain"]);

        let abort = manual(&source, &input).await.unwrap_err();

        assert_eq!(abort.completed.len(), 1);
        assert_eq!(abort.completed[0].country.as_str(), "France");
        assert_eq!(abort.failed.as_str(), "Germany");
        assert_eq!(abort.to_string(), "connection refused");
        assert_eq!(source.calls(), ["France", "Germany"]);
    }

    #[tokio::test]
    async fn manual_returns_all_results_in_order() {
        let source = FakeSource::new(&[
            ("France", Reply::Count(68_000_000), 0),
            ("Germany", Reply::Count(83_000_000), 0),
        ]);
        let input = countries(&["France", "Germany"]);

        let results = manual(&source, &input).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].population, PopulationValue::Count(83_000_000));
        assert_eq!(source.peak(), 1);
    }

    #[tokio::test]
    async fn ordered_yields_in_input_order_with_all_started() {
        let source = FakeSource::new(&[
            ("France", Reply::Count(68_000_000), 30),
            ("Russia", Reply::Count(144_000_000), 0),
            ("Atlantis", Reply::Missing, 0),
        ]);
        let input = countries(&["France", "Russia", "Atlantis"]);

        let outcomes: Vec<CountryOutcome> = ordered(&source, &input).collect().await;

        let names: Vec<&str> = outcomes.iter().map(|o| o.country.as_str()).collect();
        assert_eq!(names, ["France", "Russia", "Atlantis"]);
        assert_eq!(source.peak(), 3);
        assert_eq!(outcomes[2].population(), Some(PopulationValue::Unavailable));
    }

    #[tokio::test]
    async fn ordered_yields_failures_in_place() {
        let source = FakeSource::new(&[
            ("France", Reply::Count(1), 0),
            ("Germany", Reply::Fail, 0),
            ("Spain", Reply::Count(2), 0),
        ]);
        let input = countries(&["France", "Germany", "Spain"]);

        let mut stream = Box::pin(ordered(&source, &input));
        assert!(stream.next().await.unwrap().is_success());
        assert!(!stream.next().await.unwrap().is_success());
        assert!(stream.next().await.unwrap().is_success());
        assert!(stream.next().await.is_none());
    }
}
