//! Text and JSON rendering of per-file results.

use std::io::{self, Write};

use bqspec_eval::{format_row, row_to_json, Row, RowFailure};
use serde_json::{json, Value};

use crate::runner::{FileReport, Outcome, Status};

const SEPARATOR: &str = "===========================";

// ──────────────────────────────────────────────
// Text
// ──────────────────────────────────────────────

/// Write the human-readable report for one file.
///
/// With `quiet`, files that passed or only validated print nothing.
pub fn write_text(out: &mut dyn Write, report: &FileReport, quiet: bool) -> io::Result<()> {
    if quiet && !report.status.is_failure() {
        return Ok(());
    }

    let path = report.path.display();
    match report.status {
        Status::Valid => writeln!(out, "{}: valid", path),
        Status::Invalid => {
            writeln!(out, "{}:", path)?;
            for error in &report.errors {
                writeln!(out, "    {}", error)?;
            }
            Ok(())
        }
        Status::Error => {
            writeln!(out, "{}:", path)?;
            writeln!(
                out,
                "    error: {}",
                report.message.as_deref().unwrap_or("unknown error")
            )
        }
        Status::Passed | Status::Failed => {
            writeln!(out, "{}:", path)?;
            match &report.outcome {
                Some(outcome) => write_outcome(out, outcome),
                None => Ok(()),
            }
        }
    }
}

fn write_outcome(out: &mut dyn Write, outcome: &Outcome) -> io::Result<()> {
    let v = &outcome.verification;

    if let Some(unknown) = &v.unknown_columns {
        writeln!(out, "Unknown Columns::")?;
        write_block(out, &unknown.row, "[unknown]", &unknown.messages)?;
        writeln!(out)?;
    }

    writeln!(out, "Invariants Failed Cases::")?;
    for failure in &v.invariant_failures {
        write_failure(out, failure)?;
    }
    writeln!(out)?;

    writeln!(out, "Failed Cases::")?;
    for (i, failures) in v.case_failures.iter().enumerate() {
        if failures.is_empty() {
            continue;
        }
        writeln!(out, "Case: {}", i)?;
        for guard in outcome.case_guards.get(i).into_iter().flatten() {
            writeln!(out, "- {}", guard)?;
        }
        for failure in failures {
            write_failure(out, failure)?;
        }
    }

    writeln!(
        out,
        "{} rows checked, {} failures",
        v.rows_checked,
        v.failure_count()
    )
}

fn write_failure(out: &mut dyn Write, failure: &RowFailure) -> io::Result<()> {
    let lines: Vec<String> = failure
        .failed
        .iter()
        .map(|c| format!("{} #==> False", c))
        .collect();
    write_block(out, &failure.row, "[failed]", &lines)
}

fn write_block(out: &mut dyn Write, row: &Row, label: &str, lines: &[String]) -> io::Result<()> {
    writeln!(out, "{}", SEPARATOR)?;
    writeln!(out, "{}", format_row(row))?;
    writeln!(out, "{}", label)?;
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    writeln!(out)
}

// ──────────────────────────────────────────────
// JSON
// ──────────────────────────────────────────────

/// JSON array of per-file reports, as described by `docs/report-schema.json`.
pub fn to_json(reports: &[FileReport]) -> Value {
    Value::Array(reports.iter().map(file_json).collect())
}

fn file_json(report: &FileReport) -> Value {
    let outcome = report.outcome.as_ref();
    let verification = outcome.map(|o| &o.verification);

    let unknown_columns = verification
        .and_then(|v| v.unknown_columns.as_ref())
        .map(|u| json!({ "row": row_to_json(&u.row), "messages": u.messages }))
        .unwrap_or(Value::Null);

    let invariants: Vec<Value> = verification
        .map(|v| v.invariant_failures.iter().map(RowFailure::to_json_value).collect())
        .unwrap_or_default();

    let cases: Vec<Value> = outcome
        .map(|o| {
            o.verification
                .case_failures
                .iter()
                .enumerate()
                .map(|(i, failures)| {
                    json!({
                        "index": i,
                        "where": o.case_guards.get(i).cloned().unwrap_or_default(),
                        "failures": failures.iter().map(RowFailure::to_json_value).collect::<Vec<_>>(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "path": report.path.display().to_string(),
        "status": report.status.as_str(),
        "errors": report.errors.iter().map(|e| e.to_json_value()).collect::<Vec<_>>(),
        "unknown_columns": unknown_columns,
        "invariants": invariants,
        "cases": cases,
        "rows_checked": verification.map(|v| v.rows_checked),
        "message": report.message,
    })
}
