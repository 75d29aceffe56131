//! Condition and formula evaluation over an immutable value map.
//!
//! Condition evaluation is total: an absent field is not an error, each
//! operator defines its own truth value for absence (an equality against
//! nothing is false, an inequality is true, presence tests answer
//! directly). Formula evaluation is stricter: reading a field with no
//! value is an error, while division by zero yields an absent result
//! rather than a poisoned one.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use quill_core::condition::{CompareOp, Condition};
use quill_core::expr::{ArithOp, Expr};
use quill_core::pack::Pack;
use quill_core::value::Value;

use crate::error::EvalError;

/// Evaluate a condition tree against the effective value map.
pub fn eval_condition(cond: &Condition, values: &BTreeMap<String, Value>) -> bool {
    match cond {
        Condition::Compare {
            op,
            field,
            value,
            values: list,
        } => eval_leaf(*op, values.get(field), value.as_ref(), list),
        Condition::All(children) => children.iter().all(|c| eval_condition(c, values)),
        Condition::Any(children) => children.iter().any(|c| eval_condition(c, values)),
        Condition::Not(inner) => !eval_condition(inner, values),
    }
}

fn eval_leaf(
    op: CompareOp,
    current: Option<&Value>,
    literal: Option<&Value>,
    list: &[Value],
) -> bool {
    use CompareOp::*;

    match (op, current) {
        (Exists, v) => v.is_some(),
        (NotExists, v) => v.is_none(),
        (IsEmpty, None) => true,
        (IsEmpty, Some(v)) => v.is_empty(),
        (NotEmpty, None) => false,
        (NotEmpty, Some(v)) => !v.is_empty(),
        (Equals, None) => false,
        (Equals, Some(v)) => literal.is_some_and(|l| v == l),
        (NotEquals, None) => true,
        (NotEquals, Some(v)) => !literal.is_some_and(|l| v == l),
        (Gt | Gte | Lt | Lte, None) => false,
        (Gt, Some(v)) => ordered(v, literal, &[Ordering::Greater]),
        (Gte, Some(v)) => ordered(v, literal, &[Ordering::Greater, Ordering::Equal]),
        (Lt, Some(v)) => ordered(v, literal, &[Ordering::Less]),
        (Lte, Some(v)) => ordered(v, literal, &[Ordering::Less, Ordering::Equal]),
        (In, None) => false,
        (In, Some(v)) => list.contains(v),
        (NotIn, None) => true,
        (NotIn, Some(v)) => !list.contains(v),
        (Contains, None) => false,
        (Contains, Some(v)) => contains(v, literal),
        (NotContains, None) => true,
        (NotContains, Some(v)) => !contains(v, literal),
        (StartsWith | EndsWith, None) => false,
        (StartsWith, Some(v)) => str_pair(v, literal).is_some_and(|(s, p)| s.starts_with(p)),
        (EndsWith, Some(v)) => str_pair(v, literal).is_some_and(|(s, p)| s.ends_with(p)),
    }
}

fn ordered(v: &Value, literal: Option<&Value>, accept: &[Ordering]) -> bool {
    literal
        .and_then(|l| v.try_cmp(l))
        .is_some_and(|ord| accept.contains(&ord))
}

fn contains(v: &Value, literal: Option<&Value>) -> bool {
    match (v, literal) {
        (Value::Str(s), Some(Value::Str(needle))) => s.contains(needle.as_str()),
        (Value::List(items), Some(l)) => items.contains(l),
        _ => false,
    }
}

fn str_pair<'a>(v: &'a Value, literal: Option<&'a Value>) -> Option<(&'a str, &'a str)> {
    match (v, literal) {
        (Value::Str(s), Some(Value::Str(p))) => Some((s.as_str(), p.as_str())),
        _ => None,
    }
}

/// Evaluate every derived field in topological order, extending `values`
/// in place. Returns the derived values alone for the trace.
///
/// A formula that divides by zero yields no value; later formulas reading
/// it propagate that absence instead of erroring.
pub fn resolve_derived(
    pack: &Pack,
    topo: &[String],
    values: &mut BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>, EvalError> {
    let mut out = BTreeMap::new();
    let mut absent: BTreeSet<String> = BTreeSet::new();

    for id in topo {
        let Some(derived) = pack.derived_field(id) else {
            continue;
        };
        match eval_expr(&derived.id, &derived.expr, values, &absent)? {
            Some(value) => {
                values.insert(derived.id.clone(), value.clone());
                out.insert(derived.id.clone(), value);
            }
            None => {
                absent.insert(derived.id.clone());
            }
        }
    }

    Ok(out)
}

/// Evaluate a formula. `Ok(None)` means the result is absent (division by
/// zero somewhere below), never an error.
fn eval_expr(
    derived_id: &str,
    expr: &Expr,
    values: &BTreeMap<String, Value>,
    absent: &BTreeSet<String>,
) -> Result<Option<Value>, EvalError> {
    match expr {
        Expr::Field(id) => match values.get(id) {
            Some(v) => Ok(Some(v.clone())),
            None if absent.contains(id) => Ok(None),
            None => Err(EvalError::MissingField {
                derived_id: derived_id.to_string(),
                field_id: id.clone(),
            }),
        },
        Expr::Literal(value) => Ok(Some(value.clone())),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(derived_id, lhs, values, absent)?;
            let rhs = eval_expr(derived_id, rhs, values, absent)?;
            let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
                return Ok(None);
            };
            let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
                return Err(EvalError::TypeMismatch {
                    derived_id: derived_id.to_string(),
                    op: op.to_string(),
                    left: lhs.type_name(),
                    right: rhs.type_name(),
                });
            };
            let result = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => {
                    if b == 0.0 {
                        return Ok(None);
                    }
                    a / b
                }
            };
            Ok(Some(Value::Number(result)))
        }
        Expr::Predicate(cond) => Ok(Some(Value::Bool(eval_condition(cond, values)))),
    }
}
