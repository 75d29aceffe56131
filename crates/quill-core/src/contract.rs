//! Request-time checking of raw input against the field contract.
//!
//! The contract gate runs before any derived field or decision is
//! evaluated: required fields must be present (or carry a declared
//! default), values must match their declared types, and enum values must
//! fall inside their domain. Violations name the offending field so a
//! caller can act without re-deriving state.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::field::FieldSpec;
use crate::value::Value;

/// A single contract violation for one field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("required field '{field_id}' is missing and has no default")]
    MissingField { field_id: String },

    #[error("field '{field_id}' expects {expected}, got {found}")]
    TypeMismatch {
        field_id: String,
        expected: String,
        found: String,
    },

    #[error("field '{field_id}' value '{value}' is not in the declared domain")]
    OutOfDomain { field_id: String, value: String },
}

impl ContractViolation {
    /// The field this violation names.
    pub fn field_id(&self) -> &str {
        match self {
            ContractViolation::MissingField { field_id }
            | ContractViolation::TypeMismatch { field_id, .. }
            | ContractViolation::OutOfDomain { field_id, .. } => field_id,
        }
    }
}

/// A borrowed view over a pack's field specs, offering request checking.
#[derive(Debug, Clone, Copy)]
pub struct FieldContract<'a> {
    fields: &'a [FieldSpec],
}

impl<'a> FieldContract<'a> {
    pub fn new(fields: &'a [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Look up a field spec by id.
    pub fn field(&self, id: &str) -> Option<&'a FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Ids of fields flagged sensitive, in declaration order.
    pub fn sensitive_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.sensitive)
            .map(|f| f.id.clone())
            .collect()
    }

    /// Check raw input and produce the effective value map: raw values
    /// plus declared defaults for absent fields. Violations are collected
    /// for every field rather than stopping at the first.
    pub fn check(
        &self,
        raw: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>, Vec<ContractViolation>> {
        let mut effective = raw.clone();
        let mut violations = Vec::new();

        for spec in self.fields {
            match raw.get(&spec.id) {
                None => {
                    if let Some(default) = &spec.default {
                        effective.insert(spec.id.clone(), default.clone());
                    } else if spec.required {
                        violations.push(ContractViolation::MissingField {
                            field_id: spec.id.clone(),
                        });
                    }
                }
                Some(value) => {
                    if !spec.field_type.admits(value) {
                        violations.push(ContractViolation::TypeMismatch {
                            field_id: spec.id.clone(),
                            expected: spec.field_type.to_string(),
                            found: value.type_name().to_string(),
                        });
                    } else if !spec.domain.is_empty() {
                        let in_domain = value
                            .as_str()
                            .is_some_and(|s| spec.domain.iter().any(|d| d == s));
                        if !in_domain {
                            violations.push(ContractViolation::OutOfDomain {
                                field_id: spec.id.clone(),
                                value: value.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(effective)
        } else {
            Err(violations)
        }
    }
}
