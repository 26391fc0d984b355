//! Resolved, executable specification.
//!
//! [`build`] turns a validated [`RawSpec`] into a [`Spec`]: parameter
//! types are resolved to [`ScalarType`]s with typed values, and every
//! condition string is parsed exactly once.

use bqspec_core::bqtype::{parse_date, parse_datetime, parse_timestamp};
use bqspec_core::rcpath::{ResourcePath, VAL};
use bqspec_core::{parse, Expr, ParseError, RawParam, RawSpec, Scalar, ScalarType, SpecError};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::predicate;
use crate::types::{EvalError, Row};

// ──────────────────────────────────────────────
// Conditions and cases
// ──────────────────────────────────────────────

/// A condition's source text paired with its parsed form.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub source: String,
    pub expr: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Condition, ParseError> {
        Ok(Condition {
            source: source.to_owned(),
            expr: parse(source)?,
        })
    }

    /// Evaluate against a row; the result uses truthiness.
    pub fn eval(&self, row: &Row) -> Result<bool, EvalError> {
        predicate::eval_condition(&self.expr, row)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub where_: Vec<Condition>,
    pub expected: Vec<Condition>,
}

// ──────────────────────────────────────────────
// Query parameters
// ──────────────────────────────────────────────

/// A parameter value in its native representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Timestamp(OffsetDateTime),
    Datetime(PrimitiveDateTime),
    Date(Date),
}

/// A warehouse-ready typed parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParam {
    pub name: String,
    pub scalar_type: ScalarType,
    pub value: ParamValue,
}

impl QueryParam {
    /// Resolve a raw parameter. `None` when the value does not fit the type.
    pub fn resolve(scalar_type: ScalarType, raw: &RawParam) -> Option<QueryParam> {
        let value = match (scalar_type, &raw.value) {
            (ScalarType::String, Scalar::Text(s)) => ParamValue::String(s.clone()),
            (ScalarType::Int64, Scalar::Int(n)) => ParamValue::Int64(*n),
            (ScalarType::Float64, Scalar::Float(f)) => ParamValue::Float64(*f),
            (ScalarType::Bool, Scalar::Bool(b)) => ParamValue::Bool(*b),
            (ScalarType::Timestamp, Scalar::Text(s)) => ParamValue::Timestamp(parse_timestamp(s)?),
            (ScalarType::Datetime, Scalar::Text(s)) => ParamValue::Datetime(
                parse_datetime(s).or_else(|| parse_timestamp(s).map(civil))?,
            ),
            (ScalarType::Date, Scalar::Text(s)) => ParamValue::Date(parse_date(s)?),
            _ => return None,
        };
        Some(QueryParam {
            name: raw.name.clone(),
            scalar_type,
            value,
        })
    }
}

/// Civil UTC date-time of an instant.
fn civil(ts: OffsetDateTime) -> PrimitiveDateTime {
    let utc = ts.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

// ──────────────────────────────────────────────
// Spec
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Spec {
    pub query_path: String,
    pub params: Vec<QueryParam>,
    pub columns: Vec<String>,
    pub invariants: Vec<Condition>,
    pub cases: Vec<Case>,
}

impl Spec {
    /// Every condition in declaration order: invariants, then each case's
    /// `where` followed by its `expected`.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.invariants.iter().chain(
            self.cases
                .iter()
                .flat_map(|c| c.where_.iter().chain(c.expected.iter())),
        )
    }
}

/// Build an executable spec from a raw spec that passed value validation.
///
/// Errors can only arise from input that skipped validation; they carry the
/// same messages and locations the value validator would report.
pub fn build(raw: &RawSpec) -> Result<Spec, SpecError> {
    let root = ResourcePath::root();

    let params = raw
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let path = root.join("params").at(i).join(VAL);
            let scalar_type = ScalarType::from_name(&p.type_name).ok_or_else(|| {
                SpecError::value(format!("unsupported type: {}", p.type_name), path.clone())
            })?;
            QueryParam::resolve(scalar_type, p).ok_or_else(|| {
                SpecError::value(format!("value is invalid {}", p.type_name), path)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let invariants = conditions(&raw.invariants, &root.join("invariants"))?;

    let cases = raw
        .cases
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let path = root.join("cases").at(i);
            Ok(Case {
                where_: conditions(&c.where_, &path.join("where"))?,
                expected: conditions(&c.expected, &path.join("expected"))?,
            })
        })
        .collect::<Result<Vec<_>, SpecError>>()?;

    Ok(Spec {
        query_path: raw.query_path.clone(),
        params,
        columns: raw.columns.clone(),
        invariants,
        cases,
    })
}

fn conditions(sources: &[String], path: &ResourcePath) -> Result<Vec<Condition>, SpecError> {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Condition::parse(s)
                .map_err(|e| SpecError::value(e.to_string(), path.at(i).join(VAL)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bqspec_core::RawCase;
    use time::macros::{date, datetime};

    fn param(type_name: &str, value: Scalar) -> RawParam {
        RawParam {
            type_name: type_name.into(),
            name: "p".into(),
            value,
        }
    }

    fn raw() -> RawSpec {
        RawSpec {
            query_path: "q.sql".into(),
            params: Vec::new(),
            columns: vec!["amount".into()],
            invariants: vec!["amount > 0".into(), "amount < 100".into()],
            cases: vec![RawCase {
                where_: vec!["status == 'done'".into()],
                expected: vec!["amount > 10".into()],
            }],
        }
    }

    #[test]
    fn conditions_keep_source_and_order() {
        let spec = build(&raw()).unwrap();
        let sources: Vec<&str> = spec.conditions().map(|c| c.source.as_str()).collect();
        assert_eq!(
            sources,
            vec!["amount > 0", "amount < 100", "status == 'done'", "amount > 10"]
        );
        assert_eq!(sources, raw().condition_texts());
    }

    #[test]
    fn param_types_resolve_case_insensitively() {
        let mut r = raw();
        r.params = vec![
            param("int64", Scalar::Int(3)),
            param("date", Scalar::Text("2024-01-31".into())),
            param("DATETIME", Scalar::Text("2024-01-31T10:00:00+02:00".into())),
            param("timestamp", Scalar::Text("2024-01-31 10:00:00 UTC".into())),
        ];
        let spec = build(&r).unwrap();
        assert_eq!(spec.params[0].scalar_type, ScalarType::Int64);
        assert_eq!(spec.params[0].value, ParamValue::Int64(3));
        assert_eq!(spec.params[1].value, ParamValue::Date(date!(2024 - 01 - 31)));
        assert_eq!(
            spec.params[2].value,
            ParamValue::Datetime(datetime!(2024-01-31 08:00))
        );
        assert_eq!(
            spec.params[3].value,
            ParamValue::Timestamp(datetime!(2024-01-31 10:00 UTC))
        );
    }

    #[test]
    fn unvalidated_input_is_an_error_not_a_panic() {
        let mut r = raw();
        r.params = vec![param("INT64", Scalar::Float(3.5))];
        let err = build(&r).unwrap_err();
        assert_eq!(
            err.resource_path.unwrap().to_string(),
            "params>#0>$val"
        );

        let mut r = raw();
        r.cases[0].expected = vec!["x ===".into()];
        let err = build(&r).unwrap_err();
        assert_eq!(
            err.resource_path.unwrap().to_string(),
            "cases>#0>expected>#0>$val"
        );
    }

    #[test]
    fn condition_eval_uses_row() {
        let c = Condition::parse("amount > 0").unwrap();
        let mut row = Row::new();
        row.insert("amount".into(), crate::types::Value::Int(-1));
        assert!(!c.eval(&row).unwrap());
    }
}
