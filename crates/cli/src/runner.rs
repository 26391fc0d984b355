//! Per-file pipeline: load, validate, build, query, verify.
//!
//! Every outcome is captured in a [`FileReport`]; nothing here prints or
//! exits, so one bad file never stops the others.

use std::path::{Path, PathBuf};

use bqspec_core::{load_document, validate_schema, validate_values, RawSpec, ResourcePath, SpecError};
use bqspec_eval::{build, run_spec, QueryClient, Spec, Verification};

/// How a single spec file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Query ran and every invariant and case held.
    Passed,
    /// Query ran and at least one condition evaluated false.
    Failed,
    /// Schema or value validation rejected the file.
    Invalid,
    /// Validation passed and no query was run (`--validate-only`).
    Valid,
    /// The file could not be read, or the query or evaluation failed.
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Invalid => "invalid",
            Status::Valid => "valid",
            Status::Error => "error",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed | Status::Invalid | Status::Error)
    }
}

/// Verification result plus the case guards needed to render it.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// `where` condition sources per case, in declaration order.
    pub case_guards: Vec<Vec<String>>,
    pub verification: Verification,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: Status,
    pub errors: Vec<SpecError>,
    pub outcome: Option<Outcome>,
    pub message: Option<String>,
}

impl FileReport {
    fn new(path: &Path, status: Status) -> Self {
        FileReport {
            path: path.to_path_buf(),
            status,
            errors: Vec::new(),
            outcome: None,
            message: None,
        }
    }

    fn invalid(path: &Path, errors: Vec<SpecError>) -> Self {
        tracing::debug!(path = %path.display(), errors = errors.len(), "spec is invalid");
        FileReport {
            errors,
            ..FileReport::new(path, Status::Invalid)
        }
    }

    fn error(path: &Path, message: String) -> Self {
        tracing::debug!(path = %path.display(), %message, "spec run errored");
        FileReport {
            message: Some(message),
            ..FileReport::new(path, Status::Error)
        }
    }
}

/// The query client, or the reason none could be configured.
///
/// A missing client only matters once a file reaches the query step.
pub type ClientSlot<'a> = Result<&'a dyn QueryClient, &'a str>;

/// Run one spec file through the whole pipeline.
pub fn run_file(path: &Path, client: ClientSlot<'_>, validate_only: bool) -> FileReport {
    let spec = match load_and_build(path) {
        Ok(spec) => spec,
        Err(report) => return *report,
    };

    if validate_only {
        return FileReport::new(path, Status::Valid);
    }

    let client = match client {
        Ok(client) => client,
        Err(message) => return FileReport::error(path, message.to_string()),
    };

    match run_spec(&spec, client) {
        Ok(verification) => {
            let status = if verification.is_success() {
                Status::Passed
            } else {
                Status::Failed
            };
            tracing::debug!(
                path = %path.display(),
                rows = verification.rows_checked,
                failures = verification.failure_count(),
                "spec verified"
            );
            FileReport {
                outcome: Some(Outcome {
                    case_guards: case_guards(&spec),
                    verification,
                }),
                ..FileReport::new(path, status)
            }
        }
        Err(e) => FileReport::error(path, e.to_string()),
    }
}

/// Validation stages; any failure comes back as a finished report.
fn load_and_build(path: &Path) -> Result<Spec, Box<FileReport>> {
    let doc = load_document(path).map_err(|e| Box::new(FileReport::error(path, e.to_string())))?;

    let errors = validate_schema(&doc);
    if !errors.is_empty() {
        return Err(Box::new(FileReport::invalid(path, errors)));
    }

    let raw = RawSpec::from_document(&doc)
        .map_err(|e| Box::new(FileReport::invalid(path, vec![e])))?;

    let errors = validate_values(&raw, &ResourcePath::root());
    if !errors.is_empty() {
        return Err(Box::new(FileReport::invalid(path, errors)));
    }

    build(&raw).map_err(|e| Box::new(FileReport::invalid(path, vec![e])))
}

fn case_guards(spec: &Spec) -> Vec<Vec<String>> {
    spec.cases
        .iter()
        .map(|case| case.where_.iter().map(|c| c.source.clone()).collect())
        .collect()
}
