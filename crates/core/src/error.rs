use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rcpath::ResourcePath;

/// Which validation stage rejected the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The document does not have the required shape.
    SchemaError,
    /// The document is well-formed but a value is semantically invalid.
    ValueError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SchemaError => "SchemaError",
            ErrorKind::ValueError => "ValueError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A located validation failure.
///
/// Validators collect these into ordered lists; nothing mutates one after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecError {
    pub error_type: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_path: Option<ResourcePath>,
}

impl SpecError {
    pub fn new(
        error_type: ErrorKind,
        message: impl Into<String>,
        resource_path: Option<ResourcePath>,
    ) -> Self {
        SpecError {
            error_type,
            message: message.into(),
            resource_path,
        }
    }

    pub fn schema(message: impl Into<String>, resource_path: ResourcePath) -> Self {
        SpecError::new(ErrorKind::SchemaError, message, Some(resource_path))
    }

    pub fn value(message: impl Into<String>, resource_path: ResourcePath) -> Self {
        SpecError::new(ErrorKind::ValueError, message, Some(resource_path))
    }

    /// Serialize to JSON with every field present (null for a missing path).
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "error_type":    self.error_type.as_str(),
            "message":       self.message,
            "resource_path": self.resource_path,
        })
    }
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_path {
            Some(path) => write!(f, "{} {}: {}", self.error_type, path, self.message),
            None => write!(f, "{}: {}", self.error_type, self.message),
        }
    }
}

impl std::error::Error for SpecError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_path_and_message() {
        let err = SpecError::schema(
            "query_path must be text",
            ResourcePath::root().value_of("query_path"),
        );
        assert_eq!(
            err.to_string(),
            "SchemaError query_path>$val: query_path must be text"
        );
    }

    #[test]
    fn json_keeps_null_path() {
        let err = SpecError::new(ErrorKind::ValueError, "bad", None);
        let json = err.to_json_value();
        assert_eq!(json["error_type"], "ValueError");
        assert!(json["resource_path"].is_null());
    }
}
