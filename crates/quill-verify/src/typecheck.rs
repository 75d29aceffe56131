//! Static type consistency over the declared field contract.
//!
//! Every literal a condition or formula compares against is checked at
//! load time against the declared type of the field it touches, so a
//! type error surfaces as a validation finding and never as a runtime
//! surprise mid-generation.

use quill_core::condition::{CompareOp, Condition};
use quill_core::expr::Expr;
use quill_core::field::FieldType;
use quill_core::pack::Pack;
use quill_core::value::Value;

use crate::report::{Finding, FindingCode, ValidationReport};

/// Check derived-field formulas and every rule condition against the
/// declared field types.
pub fn check_types(pack: &Pack, report: &mut ValidationReport) {
    for derived in &pack.derived {
        if let Some(inferred) = infer_expr(pack, &derived.id, &derived.expr, report) {
            if !result_compatible(derived.result_type, inferred) {
                report.push(Finding::error(
                    FindingCode::TypeMismatch,
                    derived.id.clone(),
                    format!(
                        "derived field '{}' declares type {} but its formula produces {}",
                        derived.id, derived.result_type, inferred
                    ),
                ));
            }
        }
    }

    for (_, rule) in pack.rules() {
        check_condition(pack, &rule.id, &rule.condition, report);
    }
}

/// A formula declared `enum` may legitimately be built from string
/// operations; everything else must match exactly.
fn result_compatible(declared: FieldType, inferred: FieldType) -> bool {
    declared == inferred || (declared == FieldType::Enum && inferred == FieldType::Str)
}

/// Infer the result type of an expression. Returns `None` when a field
/// reference is unresolved (already reported by the reference check) so
/// one unknown field does not cascade into spurious type findings.
fn infer_expr(
    pack: &Pack,
    subject: &str,
    expr: &Expr,
    report: &mut ValidationReport,
) -> Option<FieldType> {
    match expr {
        Expr::Field(id) => pack.field_type(id),
        Expr::Literal(value) => Some(literal_type(value)),
        Expr::Binary { op, lhs, rhs } => {
            let mut numeric = true;
            for operand in [lhs.as_ref(), rhs.as_ref()] {
                if let Some(t) = infer_expr(pack, subject, operand, report) {
                    if t != FieldType::Number {
                        report.push(Finding::error(
                            FindingCode::TypeMismatch,
                            subject.to_string(),
                            format!("operator '{op}' in '{subject}' requires number operands, found {t}"),
                        ));
                        numeric = false;
                    }
                } else {
                    numeric = false;
                }
            }
            numeric.then_some(FieldType::Number)
        }
        Expr::Predicate(cond) => {
            check_condition(pack, subject, cond, report);
            Some(FieldType::Bool)
        }
    }
}

fn literal_type(value: &Value) -> FieldType {
    match value {
        Value::Str(_) => FieldType::Str,
        Value::Number(_) => FieldType::Number,
        Value::Bool(_) => FieldType::Bool,
        Value::Date(_) => FieldType::Date,
        Value::List(_) => FieldType::List,
    }
}

/// Walk a condition tree and check every leaf against the declared type
/// of the field it reads.
fn check_condition(pack: &Pack, subject: &str, cond: &Condition, report: &mut ValidationReport) {
    match cond {
        Condition::Compare {
            op,
            field,
            value,
            values,
        } => {
            // Unresolved fields are the reference check's finding.
            let Some(field_type) = pack.field_type(field) else {
                return;
            };
            check_leaf(pack, subject, *op, field, field_type, value, values, report);
        }
        Condition::All(children) | Condition::Any(children) => {
            for child in children {
                check_condition(pack, subject, child, report);
            }
        }
        Condition::Not(inner) => check_condition(pack, subject, inner, report),
    }
}

#[allow(clippy::too_many_arguments)]
fn check_leaf(
    pack: &Pack,
    subject: &str,
    op: CompareOp,
    field: &str,
    field_type: FieldType,
    value: &Option<Value>,
    values: &[Value],
    report: &mut ValidationReport,
) {
    let mismatch = |message: String| Finding::error(FindingCode::TypeMismatch, subject.to_string(), message);

    if op.is_unary() {
        let emptiness = matches!(op, CompareOp::IsEmpty | CompareOp::NotEmpty);
        let emptiable = matches!(field_type, FieldType::Str | FieldType::Enum | FieldType::List);
        if emptiness && !emptiable {
            report.push(mismatch(format!(
                "'{}' applies '{}' to field '{}' of type {}, which has no emptiness",
                subject,
                op.name(),
                field,
                field_type
            )));
        }
        return;
    }

    if op.is_membership() {
        if values.is_empty() {
            report.push(mismatch(format!(
                "'{}' applies '{}' to field '{}' with an empty literal list",
                subject,
                op.name(),
                field
            )));
        }
        for v in values {
            check_literal(pack, subject, op, field, field_type, v, report);
        }
        return;
    }

    // Binary operators need a literal operand.
    let Some(literal) = value else {
        report.push(mismatch(format!(
            "'{}' applies '{}' to field '{}' without a literal operand",
            subject,
            op.name(),
            field
        )));
        return;
    };

    if op.is_ordering() {
        let orderable = matches!(field_type, FieldType::Number | FieldType::Date);
        if !orderable {
            report.push(mismatch(format!(
                "'{}' applies '{}' to field '{}' of type {}, which has no ordering",
                subject,
                op.name(),
                field,
                field_type
            )));
            return;
        }
        if !field_type.admits(literal) {
            report.push(mismatch(format!(
                "'{}' compares field '{}' ({}) against a {} literal",
                subject,
                field,
                field_type,
                literal.type_name()
            )));
        }
        return;
    }

    if op.is_string() {
        let content = matches!(op, CompareOp::Contains | CompareOp::NotContains);
        let allowed = if content {
            matches!(field_type, FieldType::Str | FieldType::Enum | FieldType::List)
        } else {
            matches!(field_type, FieldType::Str | FieldType::Enum)
        };
        if !allowed {
            report.push(mismatch(format!(
                "'{}' applies '{}' to field '{}' of type {}",
                subject,
                op.name(),
                field,
                field_type
            )));
            return;
        }
        if field_type != FieldType::List && !matches!(literal, Value::Str(_)) {
            report.push(mismatch(format!(
                "'{}' applies '{}' to field '{}' with a {} literal (string expected)",
                subject,
                op.name(),
                field,
                literal.type_name()
            )));
        }
        return;
    }

    // equals / not_equals
    check_literal(pack, subject, op, field, field_type, literal, report);
}

/// Check one literal against the field's declared type, including enum
/// domain membership.
fn check_literal(
    pack: &Pack,
    subject: &str,
    op: CompareOp,
    field: &str,
    field_type: FieldType,
    literal: &Value,
    report: &mut ValidationReport,
) {
    if !field_type.admits(literal) {
        report.push(Finding::error(
            FindingCode::TypeMismatch,
            subject.to_string(),
            format!(
                "'{}' compares field '{}' ({}) against a {} literal",
                subject,
                field,
                field_type,
                literal.type_name()
            ),
        ));
        return;
    }
    if field_type == FieldType::Enum {
        if let (Some(spec), Value::Str(s)) = (pack.field(field), literal) {
            if !spec.domain.is_empty() && !spec.domain.iter().any(|d| d == s) {
                report.push(Finding::error(
                    FindingCode::TypeMismatch,
                    subject.to_string(),
                    format!(
                        "'{}' uses '{}' with enum field '{}' and literal '{}' outside its domain",
                        subject,
                        op.name(),
                        field,
                        s
                    ),
                ));
            }
        }
    }
}
