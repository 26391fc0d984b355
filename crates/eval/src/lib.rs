//! bqspec evaluator -- builds an executable spec from a validated raw spec,
//! runs its query through a [`QueryClient`] and checks every result row.
//!
//! The evaluator consumes a [`bqspec_core::RawSpec`] that passed both
//! validators, resolves it with [`build`], and produces a [`Verification`]
//! listing invariant and per-case failures.

pub mod adapter;
pub mod numeric;
pub mod predicate;
pub mod spec;
pub mod types;
pub mod verify;

use std::path::Path;

pub use adapter::fixture::FixtureClient;
pub use adapter::{QueryClient, QueryError, RowStream};
pub use spec::{build, Case, Condition, ParamValue, QueryParam, Spec};
pub use types::{format_row, row_to_json, EvalError, Row, Value};
pub use verify::{verify, RowFailure, UnknownColumns, Verification, VerifyError};

#[cfg(feature = "bigquery")]
pub use adapter::bigquery::{BigQueryClient, BigQueryConfig};

/// Errors that terminate a run for one spec.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("cannot read query file {path}: {source}")]
    ReadQuery {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Read the spec's query file, run it and verify the rows.
///
/// The query path is resolved relative to the working directory.
pub fn run_spec(spec: &Spec, client: &dyn QueryClient) -> Result<Verification, RunError> {
    let query = std::fs::read_to_string(Path::new(&spec.query_path)).map_err(|source| {
        RunError::ReadQuery {
            path: spec.query_path.clone(),
            source,
        }
    })?;

    tracing::debug!(
        query_path = %spec.query_path,
        client = client.client_id(),
        "running query"
    );
    let rows = client.query(&query, &spec.params)?;
    Ok(verify(spec, rows)?)
}
