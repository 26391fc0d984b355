use crate::document::Document;
use crate::error::SpecError;
use crate::rcpath::{ResourcePath, VAL};

const TOP_REQUIRED: &[&str] = &["query_path"];
const TOP_OPTIONAL: &[&str] = &["params", "columns"];
/// At least one of these must be present.
const TOP_EITHER_OR_BOTH: &[&str] = &["cases", "invariants"];

const PARAM_TEXT_FIELDS: &[&str] = &["type", "name"];
const PARAM_KNOWN: &[&str] = &["type", "name", "value"];

const CASE_REQUIRED: &[&str] = &["where", "expected"];

fn missing_error(name: &str, path: &ResourcePath, parent: Option<&str>) -> SpecError {
    match parent {
        Some(parent) => SpecError::schema(format!("{} required to '{}'", parent, name), path.clone()),
        None => SpecError::schema(format!("{} is required", name), path.clone()),
    }
}

fn insufficient_error(name: &str, either_or_both: &[&str], path: &ResourcePath) -> SpecError {
    let mut keys = either_or_both.to_vec();
    keys.sort_unstable();
    SpecError::schema(
        format!("{} required to either or both: {}", name, keys.join(",")),
        path.clone(),
    )
}

fn type_error(name: &str, type_name: &str, path: ResourcePath) -> SpecError {
    SpecError::schema(format!("{} must be {}", name, type_name), path)
}

fn unknown_property_error(got: &str, path: &ResourcePath) -> SpecError {
    SpecError::schema(format!("'{}' is unknown property", got), path.key_of(got))
}

fn unknown_properties(
    entries: &[(String, Document)],
    known: &[&str],
    path: &ResourcePath,
) -> Vec<SpecError> {
    entries
        .iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, _)| unknown_property_error(key, path))
        .collect()
}

/// Structurally validate a decoded specification document.
///
/// A non-mapping top level is the only fatal condition: a single error is
/// returned because nothing below it can be inspected.
pub fn validate_schema(doc: &Document) -> Vec<SpecError> {
    validate_schema_at(doc, &ResourcePath::root())
}

pub(crate) fn validate_schema_at(doc: &Document, path: &ResourcePath) -> Vec<SpecError> {
    let Some(entries) = doc.as_mapping() else {
        return vec![type_error("top level object", "mapping", path.join(VAL))];
    };

    let mut errors = Vec::new();

    match doc.get("query_path") {
        None => errors.push(missing_error("query_path", path, None)),
        Some(Document::Text(_)) => {}
        Some(_) => errors.push(type_error("query_path", "text", path.value_of("query_path"))),
    }

    if let Some(params) = doc.get("params") {
        match params.as_sequence() {
            None => errors.push(type_error("params", "sequence", path.value_of("params"))),
            Some(items) => {
                for (i, param) in items.iter().enumerate() {
                    errors.extend(validate_param_schema(param, &path.join("params").at(i)));
                }
            }
        }
    }

    if let Some(columns) = doc.get("columns") {
        errors.extend(validate_text_sequence("columns", columns, path));
    }

    if let Some(invariants) = doc.get("invariants") {
        errors.extend(validate_text_sequence("invariants", invariants, path));
    }

    if let Some(cases) = doc.get("cases") {
        match cases.as_sequence() {
            None => errors.push(type_error("cases", "sequence", path.value_of("cases"))),
            Some(items) => {
                for (i, case) in items.iter().enumerate() {
                    errors.extend(validate_case_schema(case, &path.join("cases").at(i)));
                }
            }
        }
    }

    if !TOP_EITHER_OR_BOTH.iter().any(|key| doc.contains_key(key)) {
        errors.push(insufficient_error(
            "top level object",
            TOP_EITHER_OR_BOTH,
            path,
        ));
    }

    let known: Vec<&str> = TOP_REQUIRED
        .iter()
        .chain(TOP_OPTIONAL)
        .chain(TOP_EITHER_OR_BOTH)
        .copied()
        .collect();
    errors.extend(unknown_properties(entries, &known, path));

    errors
}

fn validate_param_schema(doc: &Document, path: &ResourcePath) -> Vec<SpecError> {
    let Some(entries) = doc.as_mapping() else {
        return vec![type_error("param", "mapping", path.clone())];
    };

    let mut errors = Vec::new();

    for key in PARAM_TEXT_FIELDS {
        match doc.get(key) {
            None => errors.push(missing_error(key, path, Some("param"))),
            Some(Document::Text(_)) => {}
            Some(_) => errors.push(type_error(key, "text", path.value_of(key))),
        }
    }

    match doc.get("value") {
        None => errors.push(missing_error("value", path, Some("param"))),
        Some(value) if value.as_scalar().is_none() => errors.push(type_error(
            "value",
            "scalar (text,int,float,bool,timestamp,date)",
            path.value_of("value"),
        )),
        Some(_) => {}
    }

    errors.extend(unknown_properties(entries, PARAM_KNOWN, path));
    errors
}

fn validate_case_schema(doc: &Document, path: &ResourcePath) -> Vec<SpecError> {
    let Some(entries) = doc.as_mapping() else {
        return vec![type_error("case", "mapping", path.join(VAL))];
    };

    let mut errors = Vec::new();

    for key in CASE_REQUIRED {
        match doc.get(key) {
            None => errors.push(missing_error(key, path, Some("case"))),
            Some(conditions) => errors.extend(validate_text_sequence(key, conditions, path)),
        }
    }

    errors.extend(unknown_properties(entries, CASE_REQUIRED, path));
    errors
}

/// A sequence whose every element is text. Each offending element is
/// reported with its own index.
fn validate_text_sequence(container: &str, doc: &Document, path: &ResourcePath) -> Vec<SpecError> {
    let Some(items) = doc.as_sequence() else {
        return vec![type_error(container, "sequence", path.value_of(container))];
    };

    let element_name = format!("element of {}", container);
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.as_text().is_none())
        .map(|(i, _)| type_error(&element_name, "text", path.join(container).at(i).join(VAL)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;
    use crate::error::ErrorKind;

    fn errors_for(yaml: &str) -> Vec<SpecError> {
        validate_schema(&parse_document(yaml).unwrap())
    }

    fn paths(errors: &[SpecError]) -> Vec<String> {
        errors
            .iter()
            .map(|e| e.resource_path.clone().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn minimal_valid_document() {
        assert!(errors_for("query_path: q.sql\ninvariants: ['a > 0']\n").is_empty());
        assert!(errors_for("query_path: q.sql\ncases: []\n").is_empty());
    }

    #[test]
    fn non_mapping_top_level_is_fatal() {
        let errors = errors_for("- a\n- b\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "top level object must be mapping");
        assert_eq!(paths(&errors), vec!["$val"]);
    }

    #[test]
    fn missing_query_path_reported_once() {
        let errors = errors_for("invariants: ['a > 0']\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ErrorKind::SchemaError);
        assert_eq!(errors[0].message, "query_path is required");
    }

    #[test]
    fn query_path_must_be_text() {
        let errors = errors_for("query_path: 12\ninvariants: []\n");
        assert_eq!(paths(&errors), vec!["query_path>$val"]);
    }

    #[test]
    fn insufficient_without_invariants_or_cases() {
        let errors = errors_for("query_path: q.sql\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "top level object required to either or both: cases,invariants"
        );
    }

    #[test]
    fn unknown_top_level_key_is_located() {
        let errors = errors_for("query_path: q.sql\ninvariants: []\nexpect: 1\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "'expect' is unknown property");
        assert_eq!(paths(&errors), vec!["expect>$key"]);
    }

    #[test]
    fn each_bad_condition_reported_with_index() {
        let errors = errors_for("query_path: q.sql\ninvariants: ['ok', 1, 'ok', [x]]\n");
        assert_eq!(
            paths(&errors),
            vec!["invariants>#1>$val", "invariants>#3>$val"]
        );
    }

    #[test]
    fn param_errors_accumulate() {
        let errors = errors_for(
            r#"
query_path: q.sql
invariants: []
params:
  - {type: 1, value: [1], extra: x}
  - nope
"#,
        );
        let got: Vec<(String, String)> = errors
            .iter()
            .map(|e| {
                (
                    e.resource_path.clone().unwrap_or_default().to_string(),
                    e.message.clone(),
                )
            })
            .collect();
        assert_eq!(
            got,
            vec![
                ("params>#0>type>$val".into(), "type must be text".into()),
                ("params>#0".into(), "param required to 'name'".into()),
                (
                    "params>#0>value>$val".into(),
                    "value must be scalar (text,int,float,bool,timestamp,date)".into()
                ),
                ("params>#0>extra>$key".into(), "'extra' is unknown property".into()),
                ("params>#1".into(), "param must be mapping".into()),
            ]
        );
    }

    #[test]
    fn case_shape_errors() {
        let errors = errors_for(
            r#"
query_path: q.sql
cases:
  - where: ["a == 1"]
  - where: "a == 1"
    expected: [2]
    note: hi
  - 3
"#,
        );
        assert_eq!(
            paths(&errors),
            vec![
                "cases>#0",
                "cases>#1>where>$val",
                "cases>#1>expected>#0>$val",
                "cases>#1>note>$key",
                "cases>#2>$val",
            ]
        );
        assert_eq!(errors[0].message, "case required to 'expected'");
    }

    #[test]
    fn wrong_container_types() {
        let errors = errors_for("query_path: q.sql\nparams: {}\ncolumns: x\ncases: 1\n");
        assert_eq!(
            paths(&errors),
            vec!["params>$val", "columns>$val", "cases>$val"]
        );
    }
}
