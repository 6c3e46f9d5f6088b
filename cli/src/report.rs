//! Runs one strategy and writes its line-oriented report.
//!
//! Each runner writes to any [`Write`] so the output can be checked without a
//! terminal. Per-country failures are reported in the output, never returned;
//! the only error a runner returns is a failed write.

use std::io::{self, Write};

use census_fetcher::{Country, PopulationResult, PopulationSource, strategy};
use futures_util::StreamExt;

pub const FAN_OUT_HEADER: &str = "Got populations for ALL countries!";
pub const BATCH_TRAILER: &str = "Got population for ALL countries!";

pub async fn manual<S, W>(source: &S, countries: &[Country], out: &mut W) -> io::Result<()>
where
    S: PopulationSource,
    W: Write,
{
    match strategy::manual(source, countries).await {
        Ok(results) => write_results(out, &results),
        Err(abort) => {
            write_results(out, &abort.completed)?;
            tracing::debug!(
                country = %abort.failed,
                code = abort.error.code.as_str(),
                "manual run aborted"
            );
            writeln!(out, "Error in manual: {}", abort.error)
        }
    }
}

pub async fn parallel<S, W>(source: &S, countries: &[Country], out: &mut W) -> io::Result<()>
where
    S: PopulationSource,
    W: Write,
{
    let outcomes = strategy::fan_out(source, countries).await;

    writeln!(out, "{FAN_OUT_HEADER}")?;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(result) => write_result(out, result)?,
            Err(err) => {
                tracing::warn!(country = %outcome.country, error = %err.to_json(), "fetch failed");
                writeln!(out, "{} has no population", outcome.country)?;
            }
        }
    }
    Ok(())
}

pub async fn sequential<S, W>(source: &S, countries: &[Country], out: &mut W) -> io::Result<()>
where
    S: PopulationSource,
    W: Write,
{
    let results = strategy::sequential(source, countries).await;

    write_results(out, &results)?;
    write_trailer(out, countries)
}

/// Prints outcomes as they arrive in input order. Stops at the first failure
/// without printing the trailer.
pub async fn stream<S, W>(source: &S, countries: &[Country], out: &mut W) -> io::Result<()>
where
    S: PopulationSource,
    W: Write,
{
    let mut outcomes = Box::pin(strategy::ordered(source, countries));

    while let Some(outcome) = outcomes.next().await {
        match outcome.result {
            Ok(result) => {
                writeln!(out, "{result}")?;
                out.flush()?;
            }
            Err(err) => {
                tracing::warn!(
                    country = %outcome.country,
                    error = %err.to_json(),
                    "stream stopped"
                );
                writeln!(out, "Error in stream: {err}")?;
                return Ok(());
            }
        }
    }

    write_trailer(out, countries)
}

fn write_result<W: Write>(out: &mut W, result: &PopulationResult) -> io::Result<()> {
    writeln!(out, "Population of {}: {}", result.country, result.population)
}

fn write_results<W: Write>(out: &mut W, results: &[PopulationResult]) -> io::Result<()> {
    for result in results {
        write_result(out, result)?;
    }
    Ok(())
}

fn write_trailer<W: Write>(out: &mut W, countries: &[Country]) -> io::Result<()> {
    writeln!(out, "{BATCH_TRAILER}")?;
    writeln!(out, "Countries: {}", join_countries(countries))
}

fn join_countries(countries: &[Country]) -> String {
    countries
        .iter()
        .map(Country::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
