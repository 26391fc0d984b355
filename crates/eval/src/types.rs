//! Runtime value types for condition evaluation.
//!
//! These are DISTINCT from bqspec-core document types: a [`Value`] is what
//! the warehouse returned for one column of one row, while a
//! `bqspec_core::Document` is what the user wrote in the spec file.

use std::fmt;

use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors that can occur while evaluating a condition against a row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The condition references a column the row does not have.
    #[error("unknown field: {name}")]
    UnknownField { name: String },

    /// Operands of incompatible types.
    #[error("type error: {message}")]
    TypeError { message: String },

    #[error("division by zero")]
    DivisionByZero,

    /// Integer or decimal arithmetic left the representable range.
    #[error("numeric overflow: {message}")]
    Overflow { message: String },
}

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

/// One warehouse value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// NUMERIC / BIGNUMERIC, kept exact.
    Numeric(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(Date),
    DateTime(PrimitiveDateTime),
    Time(Time),
    Timestamp(OffsetDateTime),
    List(Vec<Value>),
    /// STRUCT fields in schema order.
    Record(IndexMap<String, Value>),
}

/// A result row: column name to value, in result column order.
pub type Row = IndexMap<String, Value>;

impl Value {
    /// Returns the warehouse type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int(_) => "INT64",
            Value::Float(_) => "FLOAT64",
            Value::Numeric(_) => "NUMERIC",
            Value::Text(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::Date(_) => "DATE",
            Value::DateTime(_) => "DATETIME",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::List(_) => "ARRAY",
            Value::Record(_) => "STRUCT",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used when a condition's result is not a plain boolean.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Numeric(d) => !d.is_zero(),
            Value::Text(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Record(fields) => !fields.is_empty(),
            Value::Date(_) | Value::DateTime(_) | Value::Time(_) | Value::Timestamp(_) => true,
        }
    }

    /// Numeric view as f64, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Numeric(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Build a value from untyped JSON (fixture rows).
    ///
    /// Integral numbers become `Int`, other numbers `Float`.
    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(fields) => Value::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON rendering for machine-readable reports.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Int(n) => J::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(J::Number)
                .unwrap_or_else(|| J::String(f.to_string())),
            Value::Numeric(d) => J::String(d.to_string()),
            Value::Text(s) => J::String(s.clone()),
            Value::Bytes(b) => J::String(hex(b)),
            Value::Date(_) | Value::DateTime(_) | Value::Time(_) => J::String(self.to_string()),
            Value::Timestamp(ts) => J::String(ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())),
            Value::List(items) => J::Array(items.iter().map(Value::to_json).collect()),
            Value::Record(fields) => J::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Numeric(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Value::Bytes(b) => write!(f, "b'{}'", hex(b)),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}T{}", dt.date(), dt.time()),
            Value::Time(t) => write!(f, "{}", t),
            Value::Timestamp(ts) => match ts.format(&Rfc3339) {
                Ok(s) => f.write_str(&s),
                Err(_) => write!(f, "{}", ts),
            },
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Record(fields) => fmt_fields(f, fields),
        }
    }
}

fn fmt_fields(f: &mut fmt::Formatter<'_>, fields: &IndexMap<String, Value>) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", k, v)?;
    }
    f.write_str("}")
}

/// Render a row as `{col: value, ...}`.
pub fn format_row(row: &Row) -> String {
    struct Display<'a>(&'a Row);
    impl fmt::Display for Display<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt_fields(f, self.0)
        }
    }
    Display(row).to_string()
}

/// Render a row as a JSON object.
pub fn row_to_json(row: &Row) -> serde_json::Value {
    serde_json::Value::Object(
        row.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}
