//! Condition expression evaluator.
//!
//! Walks a parsed [`Expr`] against one result row. Column references
//! resolve through the row mapping passed in; nothing is bound
//! dynamically.

use bqspec_core::ast::{Builtin, Expr, Literal};

use crate::numeric;
use crate::types::{EvalError, Row, Value};

/// Evaluate an expression against a row.
///
/// Logical and comparison nodes produce `Value::Bool`; other nodes produce
/// whatever value they compute.
pub fn eval_expr(expr: &Expr, row: &Row) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(literal_value(lit)),

        Expr::Field(name) => row
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownField { name: name.clone() }),

        Expr::List(items) => items
            .iter()
            .map(|item| eval_expr(item, row))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),

        Expr::Neg(inner) => numeric::eval_neg(&eval_expr(inner, row)?),

        Expr::Not(inner) => Ok(Value::Bool(!eval_expr(inner, row)?.is_truthy())),

        // Short-circuit: the right side is not evaluated (and cannot fail)
        // when the left side decides the result.
        Expr::And(left, right) => {
            if !eval_expr(left, row)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval_expr(right, row)?.is_truthy()))
        }

        Expr::Or(left, right) => {
            if eval_expr(left, row)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval_expr(right, row)?.is_truthy()))
        }

        Expr::Arith { op, left, right } => {
            let l = eval_expr(left, row)?;
            let r = eval_expr(right, row)?;
            numeric::eval_arith(*op, &l, &r)
        }

        Expr::Compare { first, rest } => {
            let mut left = eval_expr(first, row)?;
            for (op, operand) in rest {
                let right = eval_expr(operand, row)?;
                if !numeric::compare_values(&left, &right, *op)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }

        Expr::Call { func, args } => eval_call(*func, args, row),
    }
}

/// Evaluate a condition to a boolean using truthiness.
pub fn eval_condition(expr: &Expr, row: &Row) -> Result<bool, EvalError> {
    eval_expr(expr, row).map(|v| v.is_truthy())
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Text(s.clone()),
    }
}

fn eval_call(func: Builtin, args: &[Expr], row: &Row) -> Result<Value, EvalError> {
    if func == Builtin::Coalesce {
        for arg in args {
            let v = eval_expr(arg, row)?;
            if !v.is_null() {
                return Ok(v);
            }
        }
        return Ok(Value::Null);
    }

    // Every other builtin takes exactly one argument (checked by the parser).
    let Some(arg) = args.first() else {
        return Err(EvalError::TypeError {
            message: format!("{}() takes exactly one argument", func.name()),
        });
    };
    let v = eval_expr(arg, row)?;
    if v.is_null() {
        return Ok(Value::Null);
    }

    match (func, &v) {
        (Builtin::Len, Value::Text(s)) => Ok(Value::Int(s.chars().count() as i64)),
        (Builtin::Len, Value::Bytes(b)) => Ok(Value::Int(b.len() as i64)),
        (Builtin::Len, Value::List(items)) => Ok(Value::Int(items.len() as i64)),
        (Builtin::Len, Value::Record(fields)) => Ok(Value::Int(fields.len() as i64)),
        (Builtin::Abs, Value::Int(n)) => {
            n.checked_abs()
                .map(Value::Int)
                .ok_or_else(|| EvalError::Overflow {
                    message: format!("abs({}) out of range", n),
                })
        }
        (Builtin::Abs, Value::Float(f)) => Ok(Value::Float(f.abs())),
        (Builtin::Abs, Value::Numeric(d)) => Ok(Value::Numeric(d.abs())),
        (Builtin::Lower, Value::Text(s)) => Ok(Value::Text(s.to_lowercase())),
        (Builtin::Upper, Value::Text(s)) => Ok(Value::Text(s.to_uppercase())),
        _ => Err(EvalError::TypeError {
            message: format!("{}() does not accept {}", func.name(), v.type_name()),
        }),
    }
}
