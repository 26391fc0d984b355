//! Untyped document tree decoded from a specification file.
//!
//! Validators never assume a shape: every step downcasts explicitly and
//! reports a located error when the tree does not match.

use std::fmt;
use std::path::Path;

/// Errors that prevent a document from being decoded at all.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("error reading file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported mapping key: {0}")]
    UnsupportedKey(String),
}

/// A decoded YAML node.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Strings, including date and time literals: temporal values are
    /// always ISO text and are interpreted by the declared parameter type.
    Text(String),
    Sequence(Vec<Document>),
    /// Entries in document order.
    Mapping(Vec<(String, Document)>),
}

/// The scalar subset of [`Document`] allowed as a parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Document {
    /// Human-readable kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Bool(_) => "bool",
            Document::Int(_) => "int",
            Document::Float(_) => "float",
            Document::Text(_) => "text",
            Document::Sequence(_) => "sequence",
            Document::Mapping(_) => "mapping",
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, Document)]> {
        match self {
            Document::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Document]> {
        match self {
            Document::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Document::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Document::Text(s) => Some(Scalar::Text(s.clone())),
            Document::Int(n) => Some(Scalar::Int(*n)),
            Document::Float(f) => Some(Scalar::Float(*f)),
            Document::Bool(b) => Some(Scalar::Bool(*b)),
            Document::Null | Document::Sequence(_) | Document::Mapping(_) => None,
        }
    }

    /// Look up a mapping entry by key. `None` for missing keys and non-mappings.
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{:?}", s),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Read and decode a YAML specification file.
pub fn load_document(path: &Path) -> Result<Document, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "loaded specification");
    parse_document(&text)
}

/// Decode YAML text into a [`Document`].
pub fn parse_document(text: &str) -> Result<Document, LoadError> {
    if text.trim().is_empty() {
        return Ok(Document::Null);
    }
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    convert(value)
}

fn convert(value: serde_yaml::Value) -> Result<Document, LoadError> {
    use serde_yaml::Value;

    Ok(match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Document::Int(i)
            } else {
                // u64 beyond i64 range and all non-integral numbers
                Document::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Document::Text(s),
        Value::Sequence(items) => Document::Sequence(
            items
                .into_iter()
                .map(convert)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Mapping(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (k, v) in map {
                entries.push((key_text(k)?, convert(v)?));
            }
            Document::Mapping(entries)
        }
        // Explicit tags (`!!timestamp`, custom `!x`) do not change how the
        // value is read.
        Value::Tagged(tagged) => convert(tagged.value)?,
    })
}

fn key_text(key: serde_yaml::Value) -> Result<String, LoadError> {
    use serde_yaml::Value;

    match key {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok("null".to_owned()),
        other => Err(LoadError::UnsupportedKey(format!("{:?}", other))),
    }
}
