use std::path::Path;

use crate::bqtype::ScalarType;
use crate::error::SpecError;
use crate::parser;
use crate::raw::{RawParam, RawSpec};
use crate::rcpath::{ResourcePath, VAL};

/// Semantically validate a schema-valid raw specification.
///
/// The query-file check, parameter checks and condition checks are
/// independent; all of them run and all errors are returned in that order.
pub fn validate_values(raw: &RawSpec, base: &ResourcePath) -> Vec<SpecError> {
    let mut errors = validate_file_path(&raw.query_path, &base.value_of("query_path"));

    for (i, param) in raw.params.iter().enumerate() {
        errors.extend(validate_param_values(
            param,
            &base.join("params").at(i).join(VAL),
        ));
    }

    errors.extend(validate_conditions("invariants", &raw.invariants, base));

    for (i, case) in raw.cases.iter().enumerate() {
        let path = base.join("cases").at(i);
        errors.extend(validate_conditions("where", &case.where_, &path));
        errors.extend(validate_conditions("expected", &case.expected, &path));
    }

    errors
}

fn validate_file_path(path: &str, rc: &ResourcePath) -> Vec<SpecError> {
    match std::fs::metadata(Path::new(path)) {
        Err(_) => vec![SpecError::value(
            format!("is not file or directory: {}", path),
            rc.clone(),
        )],
        Ok(meta) if meta.is_dir() => vec![SpecError::value(
            format!("expected file, but got directory: {}", path),
            rc.clone(),
        )],
        Ok(meta) if !meta.is_file() => vec![SpecError::value(
            format!("expected regular file: {}", path),
            rc.clone(),
        )],
        Ok(_) => Vec::new(),
    }
}

fn validate_param_values(param: &RawParam, rc: &ResourcePath) -> Vec<SpecError> {
    match ScalarType::from_name(&param.type_name) {
        None => vec![SpecError::value(
            format!("unsupported type: {}", param.type_name),
            rc.clone(),
        )],
        Some(t) if !t.accepts(&param.value) => vec![SpecError::value(
            format!("value is invalid {}", param.type_name),
            rc.clone(),
        )],
        Some(_) => Vec::new(),
    }
}

fn validate_conditions(container: &str, conditions: &[String], base: &ResourcePath) -> Vec<SpecError> {
    conditions
        .iter()
        .enumerate()
        .filter_map(|(i, condition)| {
            parser::parse(condition).err().map(|e| {
                SpecError::value(e.to_string(), base.join(container).at(i).join(VAL))
            })
        })
        .collect()
}
