//! Query client abstraction: run a query text with typed parameters and
//! get back a lazy stream of result rows.
//!
//! - [`bigquery::BigQueryClient`] -- the BigQuery REST `jobs.query` endpoint
//! - [`fixture::FixtureClient`] -- rows from a JSON file or memory, for
//!   offline runs and tests

#[cfg(feature = "bigquery")]
pub mod bigquery;
pub mod fixture;

use crate::spec::QueryParam;
use crate::types::Row;

// ──────────────────────────────────────────────
// QueryError
// ──────────────────────────────────────────────

/// Errors raised while running a query or decoding its rows.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Missing project, credentials or similar.
    #[error("query client config error: {message}")]
    Config { message: String },

    /// Transport failure or non-success HTTP status.
    #[error("request failed: {message}")]
    Request { message: String },

    /// The job did not finish within the request timeout.
    #[error("query job {job_id} did not complete in time")]
    Incomplete { job_id: String },

    /// The response or a row could not be decoded.
    #[error("malformed response: {message}")]
    Decode { message: String },

    #[error("cannot read rows from {path}: {message}")]
    Fixture { path: String, message: String },
}

// ──────────────────────────────────────────────
// QueryClient trait
// ──────────────────────────────────────────────

/// Lazy, finite sequence of rows. Dropping it stops row production.
pub type RowStream = Box<dyn Iterator<Item = Result<Row, QueryError>>>;

/// Executes one query with its parameters.
///
/// Failures are fatal to the run; implementations do not retry.
pub trait QueryClient {
    fn query(&self, query: &str, params: &[QueryParam]) -> Result<RowStream, QueryError>;

    /// Identifier for logs (e.g. "bigquery", "fixture").
    fn client_id(&self) -> &str;
}
