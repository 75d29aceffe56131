//! Condition trees for the controlled rule DSL.
//!
//! A condition is a tagged union: a leaf comparison or one of the
//! combinators ALL/ANY/NOT. Unknown operators and untyped nesting are
//! structurally unrepresentable; the nesting-depth bound is a numeric
//! property checked once by the static validator, never per evaluation.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Maximum combinator nesting depth of a condition tree. A single leaf
/// has depth 1.
pub const MAX_CONDITION_DEPTH: usize = 3;

/// Allowlisted leaf comparison operators. There is deliberately no
/// regular-expression or user-code operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equals,
    NotEquals,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Exists,
    NotExists,
    IsEmpty,
    NotEmpty,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    /// Operators that compare by ordering and therefore require two
    /// numeric or two date operands.
    pub fn is_ordering(&self) -> bool {
        matches!(self, CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte)
    }

    /// Operators that test key presence or emptiness and take no literal.
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            CompareOp::Exists | CompareOp::NotExists | CompareOp::IsEmpty | CompareOp::NotEmpty
        )
    }

    /// Operators that test membership against a literal list.
    pub fn is_membership(&self) -> bool {
        matches!(self, CompareOp::In | CompareOp::NotIn)
    }

    /// Operators that inspect string content.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::NotContains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }

    /// Wire name of the operator, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            CompareOp::Equals => "equals",
            CompareOp::NotEquals => "not_equals",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::In => "in",
            CompareOp::NotIn => "not_in",
            CompareOp::Exists => "exists",
            CompareOp::NotExists => "not_exists",
            CompareOp::IsEmpty => "is_empty",
            CompareOp::NotEmpty => "not_empty",
            CompareOp::Contains => "contains",
            CompareOp::NotContains => "not_contains",
            CompareOp::StartsWith => "starts_with",
            CompareOp::EndsWith => "ends_with",
        }
    }
}

/// A condition tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Leaf comparison against one field.
    Compare {
        op: CompareOp,
        field: String,
        /// Literal operand for binary operators.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        /// Literal list for membership operators.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        values: Vec<Value>,
    },
    /// True when every child is true.
    All(Vec<Condition>),
    /// True when any child is true.
    Any(Vec<Condition>),
    /// Logical negation.
    Not(Box<Condition>),
}

impl Condition {
    /// Leaf comparison with a single literal operand.
    pub fn compare(op: CompareOp, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Compare {
            op,
            field: field.into(),
            value: Some(value.into()),
            values: Vec::new(),
        }
    }

    /// Unary leaf (exists / not_exists / is_empty / not_empty).
    pub fn unary(op: CompareOp, field: impl Into<String>) -> Self {
        Condition::Compare {
            op,
            field: field.into(),
            value: None,
            values: Vec::new(),
        }
    }

    /// Membership leaf against a literal list.
    pub fn membership(op: CompareOp, field: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::Compare {
            op,
            field: field.into(),
            value: None,
            values,
        }
    }

    /// Nesting depth of this tree. A leaf has depth 1; each combinator
    /// adds one level.
    pub fn depth(&self) -> usize {
        match self {
            Condition::Compare { .. } => 1,
            Condition::All(children) | Condition::Any(children) => {
                1 + children.iter().map(Condition::depth).max().unwrap_or(0)
            }
            Condition::Not(inner) => 1 + inner.depth(),
        }
    }

    /// Collect every field identifier referenced anywhere in this tree.
    pub fn referenced_fields(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut BTreeSet<String>) {
        match self {
            Condition::Compare { field, .. } => {
                out.insert(field.clone());
            }
            Condition::All(children) | Condition::Any(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Condition::Not(inner) => inner.collect_fields(out),
        }
    }

    /// Conservative syntactic implication: whenever `self` holds, does
    /// `other` necessarily hold?
    ///
    /// Used by the shadowing check: a later rule whose condition implies an
    /// earlier rule's condition can never fire. The check is sound but
    /// incomplete. It recognizes structural equality, ALL/ANY containment,
    /// equals-into-membership, and ordering-bound entailment, and answers
    /// `false` for anything it cannot prove.
    pub fn implies(&self, other: &Condition) -> bool {
        if self == other {
            return true;
        }
        // A conjunction implies anything one of its clauses implies.
        if let Condition::All(clauses) = self {
            if clauses.iter().any(|c| c.implies(other)) {
                return true;
            }
        }
        // Anything that implies one arm of a disjunction implies the disjunction.
        if let Condition::Any(arms) = other {
            if arms.iter().any(|arm| self.implies(arm)) {
                return true;
            }
        }
        // A disjunction implies a target only if every arm does.
        if let Condition::Any(arms) = self {
            if !arms.is_empty() && arms.iter().all(|arm| arm.implies(other)) {
                return true;
            }
        }
        // A target conjunction is implied only if every clause is.
        if let Condition::All(clauses) = other {
            if !clauses.is_empty() && clauses.iter().all(|c| self.implies(c)) {
                return true;
            }
        }
        if let (
            Condition::Compare {
                op: lop,
                field: lfield,
                value: lvalue,
                values: lvalues,
            },
            Condition::Compare {
                op: rop,
                field: rfield,
                value: rvalue,
                values: rvalues,
            },
        ) = (self, other)
        {
            if lfield == rfield {
                return leaf_implies(*lop, lvalue, lvalues, *rop, rvalue, rvalues);
            }
        }
        false
    }
}

/// Leaf-level entailment over the same field.
fn leaf_implies(
    lop: CompareOp,
    lvalue: &Option<Value>,
    lvalues: &[Value],
    rop: CompareOp,
    rvalue: &Option<Value>,
    rvalues: &[Value],
) -> bool {
    use CompareOp::*;

    match (lop, rop) {
        // equals(f, v) implies in(f, [.., v, ..])
        (Equals, In) => lvalue.as_ref().is_some_and(|v| rvalues.contains(v)),
        // in(f, vs) implies in(f, ws) when vs ⊆ ws
        (In, In) => lvalues.iter().all(|v| rvalues.contains(v)),
        // equals with a concrete value implies exists
        (Equals | In | Contains | StartsWith | EndsWith | NotEmpty, Exists) => true,
        // gt(f, a) implies gt(f, b) when a >= b; likewise for the other bounds
        (Gt, Gt) | (Gte, Gte) | (Gt, Gte) => cmp_bounds(lvalue, rvalue, Ordering::Greater),
        (Lt, Lt) | (Lte, Lte) | (Lt, Lte) => cmp_bounds(lvalue, rvalue, Ordering::Less),
        // gte(f, a) implies gt(f, b) only when a > b (strict)
        (Gte, Gt) => matches!(
            bound_cmp(lvalue, rvalue),
            Some(Ordering::Greater)
        ),
        (Lte, Lt) => matches!(bound_cmp(lvalue, rvalue), Some(Ordering::Less)),
        _ => false,
    }
}

fn bound_cmp(lvalue: &Option<Value>, rvalue: &Option<Value>) -> Option<Ordering> {
    match (lvalue, rvalue) {
        (Some(l), Some(r)) => l.try_cmp(r),
        _ => None,
    }
}

fn cmp_bounds(lvalue: &Option<Value>, rvalue: &Option<Value>, tighter: Ordering) -> bool {
    matches!(bound_cmp(lvalue, rvalue), Some(ord) if ord == tighter || ord == Ordering::Equal)
}
