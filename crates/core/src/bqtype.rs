//! Warehouse scalar types accepted for query parameters.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::document::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScalarType {
    String,
    Int64,
    Float64,
    Bool,
    Timestamp,
    Datetime,
    Date,
}

impl ScalarType {
    pub const ALL: [ScalarType; 7] = [
        ScalarType::String,
        ScalarType::Int64,
        ScalarType::Float64,
        ScalarType::Bool,
        ScalarType::Timestamp,
        ScalarType::Datetime,
        ScalarType::Date,
    ];

    /// Resolve a declared type name, ignoring case.
    pub fn from_name(name: &str) -> Option<ScalarType> {
        let upper = name.to_ascii_uppercase();
        ScalarType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == upper)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "STRING",
            ScalarType::Int64 => "INT64",
            ScalarType::Float64 => "FLOAT64",
            ScalarType::Bool => "BOOL",
            ScalarType::Timestamp => "TIMESTAMP",
            ScalarType::Datetime => "DATETIME",
            ScalarType::Date => "DATE",
        }
    }

    /// Whether a raw parameter value has this type's native representation.
    pub fn accepts(&self, value: &Scalar) -> bool {
        match (self, value) {
            (ScalarType::String, Scalar::Text(_)) => true,
            (ScalarType::Int64, Scalar::Int(_)) => true,
            (ScalarType::Float64, Scalar::Float(_)) => true,
            (ScalarType::Bool, Scalar::Bool(_)) => true,
            (ScalarType::Timestamp | ScalarType::Datetime, Scalar::Text(s)) => {
                parse_timestamp(s).is_some()
            }
            (ScalarType::Date, Scalar::Text(s)) => parse_date(s).is_some(),
            _ => false,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Parse a timestamp in RFC 3339 or `YYYY-MM-DD HH:MM:SS[.fff]` form.
///
/// A trailing ` UTC` suffix is accepted; values without an offset are
/// taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(ts);
    }
    let s = s.strip_suffix(" UTC").unwrap_or(s);
    if let Ok(ts) = OffsetDateTime::parse(
        s,
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Some(ts);
    }
    parse_datetime(s).map(PrimitiveDateTime::assume_utc)
}

/// Parse a civil date-time (no offset), with a space or `T` separator.
pub fn parse_datetime(s: &str) -> Option<PrimitiveDateTime> {
    let s = s.trim();
    PrimitiveDateTime::parse(
        s,
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
        ),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            s,
            format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
            ),
        )
    })
    .ok()
}
