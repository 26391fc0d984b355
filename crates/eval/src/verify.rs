//! Evaluation engine: streams result rows through invariants and cases.

use serde::Serialize;

use crate::adapter::QueryError;
use crate::spec::{Condition, Spec};
use crate::types::{row_to_json, EvalError, Row};

/// Errors that stop a verification run.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The row source failed while producing row `row_index`.
    #[error("fetching row {row_index}: {source}")]
    Rows {
        row_index: usize,
        #[source]
        source: QueryError,
    },

    #[error("row {row_index}: condition '{condition}': {source}")]
    Eval {
        row_index: usize,
        condition: String,
        #[source]
        source: EvalError,
    },
}

/// One row that violated at least one condition.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row_index: usize,
    pub row: Row,
    /// Source text of every condition that evaluated false, in order.
    pub failed: Vec<String>,
}

/// Row keys of the first row that are not declared in `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownColumns {
    pub row: Row,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Verification {
    pub unknown_columns: Option<UnknownColumns>,
    pub invariant_failures: Vec<RowFailure>,
    /// One list per case, in declaration order.
    pub case_failures: Vec<Vec<RowFailure>>,
    pub rows_checked: usize,
}

impl Verification {
    /// No invariant or case failures. Unknown columns are informational.
    pub fn is_success(&self) -> bool {
        self.invariant_failures.is_empty() && self.case_failures.iter().all(Vec::is_empty)
    }

    pub fn failure_count(&self) -> usize {
        self.invariant_failures.len() + self.case_failures.iter().map(Vec::len).sum::<usize>()
    }
}

impl RowFailure {
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(RowFailureJson {
            row_index: self.row_index,
            row: row_to_json(&self.row),
            failed: &self.failed,
        })
        .unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Serialize)]
struct RowFailureJson<'a> {
    row_index: usize,
    row: serde_json::Value,
    failed: &'a [String],
}

/// Run `spec` over `rows`, consuming the iterator exactly once.
///
/// The first row source error or condition evaluation error stops the run.
pub fn verify<I>(spec: &Spec, rows: I) -> Result<Verification, VerifyError>
where
    I: IntoIterator<Item = Result<Row, QueryError>>,
{
    let mut result = Verification {
        case_failures: vec![Vec::new(); spec.cases.len()],
        ..Verification::default()
    };

    for (row_index, row) in rows.into_iter().enumerate() {
        let row = row.map_err(|source| VerifyError::Rows { row_index, source })?;

        if row_index == 0 {
            result.unknown_columns = unknown_columns(&spec.columns, &row);
        }

        let failed = failed_conditions(&spec.invariants, &row, row_index)?;
        if !failed.is_empty() {
            result.invariant_failures.push(RowFailure {
                row_index,
                row: row.clone(),
                failed,
            });
        }

        for (case, failures) in spec.cases.iter().zip(result.case_failures.iter_mut()) {
            if !all_hold(&case.where_, &row, row_index)? {
                continue;
            }
            let failed = failed_conditions(&case.expected, &row, row_index)?;
            if !failed.is_empty() {
                failures.push(RowFailure {
                    row_index,
                    row: row.clone(),
                    failed,
                });
            }
        }

        result.rows_checked += 1;
    }

    tracing::debug!(
        rows = result.rows_checked,
        invariant_failures = result.invariant_failures.len(),
        case_failures = result.failure_count() - result.invariant_failures.len(),
        "verification finished"
    );

    Ok(result)
}

fn unknown_columns(columns: &[String], row: &Row) -> Option<UnknownColumns> {
    let messages: Vec<String> = row
        .keys()
        .filter(|key| !columns.contains(*key))
        .map(|key| format!("unknown column: {}", key))
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(UnknownColumns {
            row: row.clone(),
            messages,
        })
    }
}

fn check(condition: &Condition, row: &Row, row_index: usize) -> Result<bool, VerifyError> {
    condition.eval(row).map_err(|source| VerifyError::Eval {
        row_index,
        condition: condition.source.clone(),
        source,
    })
}

fn failed_conditions(
    conditions: &[Condition],
    row: &Row,
    row_index: usize,
) -> Result<Vec<String>, VerifyError> {
    let mut failed = Vec::new();
    for condition in conditions {
        if !check(condition, row, row_index)? {
            failed.push(condition.source.clone());
        }
    }
    Ok(failed)
}

fn all_hold(conditions: &[Condition], row: &Row, row_index: usize) -> Result<bool, VerifyError> {
    for condition in conditions {
        if !check(condition, row, row_index)? {
            return Ok(false);
        }
    }
    Ok(true)
}
