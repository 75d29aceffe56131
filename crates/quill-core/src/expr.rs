//! Expression grammar for derived fields.
//!
//! Derived fields are computed scalars/booleans built from raw fields and
//! earlier derived fields, using the same controlled grammar as rule
//! conditions: field references, literals, the four arithmetic operators,
//! and boolean predicates. There is no user code and no string templating.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::value::Value;

/// Arithmetic operators available to derived-field formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
        }
    }
}

/// A derived-field expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Reference to a raw field or an earlier derived field.
    Field(String),
    /// Literal scalar.
    Literal(Value),
    /// Arithmetic over two numeric subexpressions.
    Binary {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Boolean predicate reusing the rule condition grammar.
    Predicate(Condition),
}

impl Expr {
    /// Field reference.
    pub fn field(id: impl Into<String>) -> Self {
        Expr::Field(id.into())
    }

    /// Literal value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Arithmetic node.
    pub fn binary(op: ArithOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Collect every field identifier this expression depends on.
    pub fn referenced_fields(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Field(id) => {
                out.insert(id.clone());
            }
            Expr::Literal(_) => {}
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
            Expr::Predicate(cond) => {
                out.extend(cond.referenced_fields());
            }
        }
    }
}
