//! Evaluation errors.
//!
//! Every failure mode is a typed variant naming the entity involved, so a
//! caller can act (fix the pack, fix the input) without parsing message
//! strings. Static-validation failures carry the full report.

use quill_core::contract::ContractViolation;
use quill_verify::ValidationReport;
use thiserror::Error;

/// Errors surfaced by pack preparation and evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The pack failed static validation and must not be evaluated.
    #[error("pack '{pack_id}' failed static validation with {} error(s)", .report.error_count())]
    ConfigStructure {
        pack_id: String,
        report: ValidationReport,
    },

    /// The raw input violated the field contract.
    #[error("input violates the field contract: {} violation(s)", .violations.len())]
    Contract { violations: Vec<ContractViolation> },

    /// A derived-field formula read a field that has no value.
    #[error("derived field '{derived_id}' reads field '{field_id}', which has no value")]
    MissingField {
        derived_id: String,
        field_id: String,
    },

    /// An arithmetic operator met operands it is not defined for.
    #[error("operator '{op}' in derived field '{derived_id}' applied to {left} and {right}")]
    TypeMismatch {
        derived_id: String,
        op: String,
        left: &'static str,
        right: &'static str,
    },

    /// No rule matched and the decision declares no default.
    #[error("decision '{decision_id}' matched no rule and declares no default outcome")]
    NoOutcome { decision_id: String },

    /// A selected variant id did not resolve. Static validation makes this
    /// unreachable for prepared packs; it is kept so evaluation never panics.
    #[error("decision '{decision_id}' selected undefined variant '{variant_id}'")]
    UnresolvedReference {
        decision_id: String,
        variant_id: String,
    },
}

impl EvalError {
    /// The contract violations, when this is a contract failure.
    pub fn violations(&self) -> Option<&[ContractViolation]> {
        match self {
            EvalError::Contract { violations } => Some(violations),
            _ => None,
        }
    }
}
