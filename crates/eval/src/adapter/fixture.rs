//! Fixture query client: serves rows from a JSON file or from memory.
//!
//! The query text and parameters are ignored. A fixture file holds a JSON
//! array of objects, one per row.

use std::path::{Path, PathBuf};

use super::{QueryClient, QueryError, RowStream};
use crate::spec::QueryParam;
use crate::types::{Row, Value};

pub struct FixtureClient {
    source: Source,
}

enum Source {
    File(PathBuf),
    Rows(Vec<Row>),
}

impl FixtureClient {
    /// Rows are read from `path` on each query.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        FixtureClient {
            source: Source::File(path.into()),
        }
    }

    /// Serve the given rows.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        FixtureClient {
            source: Source::Rows(rows),
        }
    }

    /// Parse a JSON array of row objects.
    pub fn parse_rows(text: &str) -> Result<Vec<Row>, String> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let items = value
            .as_array()
            .ok_or_else(|| "expected a JSON array of row objects".to_string())?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| -> Result<Row, String> {
                let obj = item
                    .as_object()
                    .ok_or_else(|| format!("row {} is not an object", i))?;
                Ok(obj
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect())
            })
            .collect()
    }

    fn load(path: &Path) -> Result<Vec<Row>, QueryError> {
        let fixture_error = |message: String| QueryError::Fixture {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        Self::parse_rows(&text).map_err(fixture_error)
    }
}

impl QueryClient for FixtureClient {
    fn query(&self, _query: &str, _params: &[QueryParam]) -> Result<RowStream, QueryError> {
        let rows = match &self.source {
            Source::File(path) => Self::load(path)?,
            Source::Rows(rows) => rows.clone(),
        };
        tracing::debug!(rows = rows.len(), "serving fixture rows");
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn client_id(&self) -> &str {
        "fixture"
    }
}
