//! Comparison and arithmetic over runtime values.
//!
//! Numbers promote `Int -> Numeric -> Float`. Integer and decimal
//! arithmetic is checked; overflow is an error, never a wrap. Text
//! compared against a temporal value is parsed as that temporal type.

use std::cmp::Ordering;

use bqspec_core::ast::{ArithOp, CmpOp};
use bqspec_core::bqtype::{parse_date, parse_datetime, parse_timestamp};
use rust_decimal::Decimal;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::types::{EvalError, Value};

// ──────────────────────────────────────────────
// Comparison
// ──────────────────────────────────────────────

/// Evaluate one comparison operator.
pub fn compare_values(left: &Value, right: &Value, op: CmpOp) -> Result<bool, EvalError> {
    match op {
        CmpOp::Eq | CmpOp::Is => Ok(values_equal(left, right)),
        CmpOp::Neq | CmpOp::IsNot => Ok(!values_equal(left, right)),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|found| !found),
        CmpOp::Lt | CmpOp::Lte | CmpOp::Gt | CmpOp::Gte => {
            if left.is_null() || right.is_null() {
                return Ok(false);
            }
            Ok(match order(left, right, op.symbol())? {
                None => false,
                Some(ord) => match op {
                    CmpOp::Lt => ord == Ordering::Less,
                    CmpOp::Lte => ord != Ordering::Greater,
                    CmpOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                },
            })
        }
    }
}

/// Equality that never fails: values of incomparable types are unequal.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Record(a), Value::Record(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => matches!(order(left, right, "=="), Ok(Some(Ordering::Equal))),
    }
}

fn contains(container: &Value, needle: &Value) -> Result<bool, EvalError> {
    match (container, needle) {
        (Value::List(items), _) => Ok(items.iter().any(|item| values_equal(item, needle))),
        (Value::Text(haystack), Value::Text(sub)) => Ok(haystack.contains(sub.as_str())),
        (Value::Text(_), _) => Err(EvalError::TypeError {
            message: format!(
                "'in <STRING>' requires STRING as left operand, not {}",
                needle.type_name()
            ),
        }),
        (Value::Null, _) => Ok(false),
        _ => Err(EvalError::TypeError {
            message: format!("argument of type {} is not a container", container.type_name()),
        }),
    }
}

fn unsupported(symbol: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeError {
        message: format!(
            "'{}' not supported between {} and {}",
            symbol,
            left.type_name(),
            right.type_name()
        ),
    }
}

/// Total order between two comparable values.
///
/// `Ok(None)` means comparable types but unordered values (NaN).
/// `Err` means the types cannot be compared at all.
fn order(left: &Value, right: &Value, symbol: &str) -> Result<Option<Ordering>, EvalError> {
    use Value::*;
    let ord = match (left, right) {
        (Int(a), Int(b)) => Some(a.cmp(b)),
        (Numeric(a), Numeric(b)) => Some(a.cmp(b)),
        (Int(a), Numeric(b)) => Some(Decimal::from(*a).cmp(b)),
        (Numeric(a), Int(b)) => Some(a.cmp(&Decimal::from(*b))),
        (Int(_) | Float(_) | Numeric(_), Int(_) | Float(_) | Numeric(_)) => {
            match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            }
        }
        (Bool(a), Bool(b)) => Some(a.cmp(b)),
        (Text(a), Text(b)) => Some(a.cmp(b)),
        (Bytes(a), Bytes(b)) => Some(a.cmp(b)),
        (Date(a), Date(b)) => Some(a.cmp(b)),
        (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
        (Time(a), Time(b)) => Some(a.cmp(b)),
        (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
        (Date(_) | DateTime(_) | Timestamp(_), Date(_) | DateTime(_) | Timestamp(_)) => {
            match (instant(left), instant(right)) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            }
        }
        (Text(s), temporal) if is_temporal(temporal) => {
            let parsed = coerce_text(s, temporal)?;
            return order(&parsed, temporal, symbol);
        }
        (temporal, Text(s)) if is_temporal(temporal) => {
            let parsed = coerce_text(s, temporal)?;
            return order(temporal, &parsed, symbol);
        }
        (List(a), List(b)) => {
            for (x, y) in a.iter().zip(b) {
                match order(x, y, symbol)? {
                    Some(Ordering::Equal) => continue,
                    other => return Ok(other),
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => return Err(unsupported(symbol, left, right)),
    };
    Ok(ord)
}

fn is_temporal(v: &Value) -> bool {
    matches!(
        v,
        Value::Date(_) | Value::DateTime(_) | Value::Time(_) | Value::Timestamp(_)
    )
}

/// Dates and civil date-times are placed on the UTC timeline.
fn instant(v: &Value) -> Option<OffsetDateTime> {
    match v {
        Value::Date(d) => Some(d.midnight().assume_utc()),
        Value::DateTime(dt) => Some(dt.assume_utc()),
        Value::Timestamp(ts) => Some(*ts),
        _ => None,
    }
}

/// Parse text as the temporal type of `like`.
fn coerce_text(s: &str, like: &Value) -> Result<Value, EvalError> {
    let parsed = match like {
        Value::Date(_) => parse_date(s).map(Value::Date),
        Value::DateTime(_) => parse_datetime(s).map(Value::DateTime),
        Value::Timestamp(_) => parse_timestamp(s).map(Value::Timestamp),
        Value::Time(_) => parse_time(s).map(Value::Time),
        _ => None,
    };
    parsed.ok_or_else(|| EvalError::TypeError {
        message: format!("cannot interpret '{}' as {}", s, like.type_name()),
    })
}

/// Parse `HH:MM:SS[.ffffff]`.
pub fn parse_time(s: &str) -> Option<time::Time> {
    time::Time::parse(
        s.trim(),
        format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .ok()
}

// ──────────────────────────────────────────────
// Arithmetic
// ──────────────────────────────────────────────

/// Evaluate a binary arithmetic operator. `null` operands yield `null`.
pub fn eval_arith(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    use Value::*;
    match (left, right) {
        (Null, _) | (_, Null) => Ok(Null),
        (Int(a), Int(b)) => int_arith(op, *a, *b),
        (Int(_) | Numeric(_), Int(_) | Numeric(_)) => {
            decimal_arith(op, to_decimal(left)?, to_decimal(right)?)
        }
        (Int(_) | Float(_) | Numeric(_), Int(_) | Float(_) | Numeric(_)) => {
            match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => float_arith(op, a, b),
                _ => Err(EvalError::Overflow {
                    message: "numeric value not representable as FLOAT64".to_string(),
                }),
            }
        }
        (Text(a), Text(b)) if op == ArithOp::Add => Ok(Text(format!("{}{}", a, b))),
        (List(a), List(b)) if op == ArithOp::Add => {
            Ok(List(a.iter().chain(b).cloned().collect()))
        }
        _ => Err(EvalError::TypeError {
            message: format!(
                "unsupported operand types for {}: {} and {}",
                arith_symbol(op),
                left.type_name(),
                right.type_name()
            ),
        }),
    }
}

/// Unary minus.
pub fn eval_neg(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| EvalError::Overflow {
            message: format!("cannot negate {}", n),
        }),
        Value::Float(f) => Ok(Value::Float(-f)),
        Value::Numeric(d) => Ok(Value::Numeric(-*d)),
        other => Err(EvalError::TypeError {
            message: format!("bad operand type for unary -: {}", other.type_name()),
        }),
    }
}

fn arith_symbol(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
        ArithOp::Mod => "%",
    }
}

fn to_decimal(v: &Value) -> Result<Decimal, EvalError> {
    match v {
        Value::Int(n) => Ok(Decimal::from(*n)),
        Value::Numeric(d) => Ok(*d),
        other => Err(EvalError::TypeError {
            message: format!("expected a number, got {}", other.type_name()),
        }),
    }
}

fn overflow(op: ArithOp) -> EvalError {
    EvalError::Overflow {
        message: format!("'{}' result out of range", arith_symbol(op)),
    }
}

fn int_arith(op: ArithOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        // True division, as for every other numeric pair.
        ArithOp::Div => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        ArithOp::Mod => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_rem(b).map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
    };
    result.map(Value::Int).ok_or_else(|| overflow(op))
}

fn decimal_arith(op: ArithOp, a: Decimal, b: Decimal) -> Result<Value, EvalError> {
    if matches!(op, ArithOp::Div | ArithOp::Mod) && b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => a.checked_div(b),
        ArithOp::Mod => a.checked_rem(b).map(|r| {
            if !r.is_zero() && r.is_sign_negative() != b.is_sign_negative() {
                r + b
            } else {
                r
            }
        }),
    };
    result.map(Value::Numeric).ok_or_else(|| overflow(op))
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        ArithOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            }
        }
    };
    Ok(Value::Float(result))
}
