//! Raw specification model: the typed shape of a schema-valid document
//! before parameter types are resolved and conditions are parsed.

use crate::document::{Document, Scalar};
use crate::error::SpecError;
use crate::rcpath::ResourcePath;

/// One query parameter binding as written.
#[derive(Debug, Clone, PartialEq)]
pub struct RawParam {
    pub type_name: String,
    pub name: String,
    pub value: Scalar,
}

/// A guarded expectation as written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCase {
    pub where_: Vec<String>,
    pub expected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSpec {
    pub query_path: String,
    pub params: Vec<RawParam>,
    pub columns: Vec<String>,
    pub invariants: Vec<String>,
    pub cases: Vec<RawCase>,
}

impl RawSpec {
    /// Convert a document that passed [`crate::validate::validate_schema`].
    ///
    /// Absent optional containers become empty. Shape mismatches are
    /// reported as schema errors rather than panicking, but cannot occur
    /// on a schema-valid document.
    pub fn from_document(doc: &Document) -> Result<RawSpec, SpecError> {
        let root = ResourcePath::root();
        if doc.as_mapping().is_none() {
            return Err(SpecError::schema(
                "top level object must be mapping",
                root.join(crate::rcpath::VAL),
            ));
        }

        let query_path = doc
            .get("query_path")
            .and_then(Document::as_text)
            .ok_or_else(|| SpecError::schema("query_path is required", root.clone()))?
            .to_owned();

        let params = match doc.get("params") {
            Some(list) => sequence(list, &root.value_of("params"))?
                .iter()
                .enumerate()
                .map(|(i, p)| raw_param(p, &root.join("params").at(i)))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let columns = optional_texts(doc, "columns", &root)?;
        let invariants = optional_texts(doc, "invariants", &root)?;

        let cases = match doc.get("cases") {
            Some(list) => sequence(list, &root.value_of("cases"))?
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let path = root.join("cases").at(i);
                    Ok(RawCase {
                        where_: required_texts(c, "where", &path)?,
                        expected: required_texts(c, "expected", &path)?,
                    })
                })
                .collect::<Result<Vec<_>, SpecError>>()?,
            None => Vec::new(),
        };

        Ok(RawSpec {
            query_path,
            params,
            columns,
            invariants,
            cases,
        })
    }

    /// Every condition string in declaration order: invariants first, then
    /// each case's `where` followed by its `expected`.
    pub fn condition_texts(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.invariants.iter().map(String::as_str).collect();
        for case in &self.cases {
            out.extend(case.where_.iter().map(String::as_str));
            out.extend(case.expected.iter().map(String::as_str));
        }
        out
    }
}

fn sequence<'a>(doc: &'a Document, path: &ResourcePath) -> Result<&'a [Document], SpecError> {
    doc.as_sequence()
        .ok_or_else(|| SpecError::schema("expected sequence", path.clone()))
}

fn texts(doc: &Document, path: &ResourcePath, container: &str) -> Result<Vec<String>, SpecError> {
    sequence(doc, &path.value_of(container))?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_text().map(str::to_owned).ok_or_else(|| {
                SpecError::schema(
                    format!("element of {} must be text", container),
                    path.join(container).at(i).join(crate::rcpath::VAL),
                )
            })
        })
        .collect()
}

fn optional_texts(
    doc: &Document,
    key: &str,
    path: &ResourcePath,
) -> Result<Vec<String>, SpecError> {
    match doc.get(key) {
        Some(list) => texts(list, path, key),
        None => Ok(Vec::new()),
    }
}

fn required_texts(
    doc: &Document,
    key: &str,
    path: &ResourcePath,
) -> Result<Vec<String>, SpecError> {
    match doc.get(key) {
        Some(list) => texts(list, path, key),
        None => Err(SpecError::schema(
            format!("case required to '{}'", key),
            path.clone(),
        )),
    }
}

fn raw_param(doc: &Document, path: &ResourcePath) -> Result<RawParam, SpecError> {
    let text_field = |key: &str| {
        doc.get(key)
            .and_then(Document::as_text)
            .map(str::to_owned)
            .ok_or_else(|| SpecError::schema(format!("param required to '{}'", key), path.clone()))
    };
    let value = doc
        .get("value")
        .and_then(Document::as_scalar)
        .ok_or_else(|| SpecError::schema("param required to 'value'", path.clone()))?;
    Ok(RawParam {
        type_name: text_field("type")?,
        name: text_field("name")?,
        value,
    })
}
