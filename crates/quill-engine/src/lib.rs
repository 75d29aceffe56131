//! Deterministic pack evaluation.
//!
//! A pack must be *prepared* before it can evaluate anything: preparation
//! runs the full static validation suite and fixes the derived-field
//! evaluation order, so every later call works on a pack known to be
//! well-formed. Evaluation itself takes one raw-input map and produces an
//! immutable [`RenderContext`] plus a replayable [`EvaluationTrace`], and
//! is a pure function of pack, input, timestamp, and trace id.

pub mod context;
pub mod error;
pub mod eval;
pub mod trace;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use quill_core::hash::fingerprint;
use quill_core::pack::Pack;
use quill_core::value::Value;
use quill_verify::{derived_topo_order, validate_pack, ValidationReport};

pub use context::{RenderContext, Selection};
pub use error::EvalError;
pub use trace::{EvaluationTrace, RuleCheck, TraceEntry, TraceOutcome, MASK};

/// The result of one successful evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub context: RenderContext,
    pub trace: EvaluationTrace,
}

/// A pack that passed static validation, ready to evaluate inputs.
#[derive(Debug, Clone)]
pub struct PreparedPack {
    pack: Pack,
    fingerprint: String,
    topo: Vec<String>,
    report: ValidationReport,
}

impl PreparedPack {
    /// Validate the pack and fix its derived-field evaluation order.
    ///
    /// A pack with any error-severity finding is rejected here and can
    /// never reach evaluation.
    pub fn prepare(pack: Pack) -> Result<Self, EvalError> {
        let report = validate_pack(&pack);
        if !report.is_valid() {
            return Err(EvalError::ConfigStructure {
                pack_id: pack.id.clone(),
                report,
            });
        }
        let Ok(topo) = derived_topo_order(&pack) else {
            return Err(EvalError::ConfigStructure {
                pack_id: pack.id.clone(),
                report,
            });
        };
        let fingerprint = report.pack_fingerprint.clone();
        info!(pack_id = %pack.id, fingerprint = %fingerprint, "pack prepared");
        Ok(Self {
            pack,
            fingerprint,
            topo,
            report,
        })
    }

    pub fn pack(&self) -> &Pack {
        &self.pack
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The validation report, retained for its warnings.
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Evaluate one raw-input map with a fresh trace id and the current
    /// time.
    pub fn evaluate(&self, raw: &BTreeMap<String, Value>) -> Result<Evaluation, EvalError> {
        self.evaluate_at(raw, Utc::now(), Uuid::new_v4())
    }

    /// Evaluate with an explicit timestamp and trace id. Given equal
    /// arguments, the result is byte-identical across runs.
    pub fn evaluate_at(
        &self,
        raw: &BTreeMap<String, Value>,
        timestamp: DateTime<Utc>,
        trace_id: Uuid,
    ) -> Result<Evaluation, EvalError> {
        let contract = self.pack.contract();
        let mut values = contract
            .check(raw)
            .map_err(|violations| EvalError::Contract { violations })?;
        let input_hash = fingerprint(raw);
        let effective_inputs = values.clone();

        let derived = eval::resolve_derived(&self.pack, &self.topo, &mut values)?;

        let mut selections = Vec::with_capacity(self.pack.decisions.len());
        let mut entries = Vec::with_capacity(self.pack.decisions.len());
        for decision in &self.pack.decisions {
            let mut checks = Vec::new();
            let mut fired: Option<(String, String)> = None;
            for rule in &decision.rules {
                let matched = eval::eval_condition(&rule.condition, &values);
                checks.push(RuleCheck {
                    rule_id: rule.id.clone(),
                    matched,
                });
                if matched {
                    fired = Some((rule.id.clone(), rule.variant_id.clone()));
                    break;
                }
            }

            let (outcome, variant_id) = match fired {
                Some((rule_id, variant_id)) => (TraceOutcome::Rule { rule_id }, variant_id),
                None => match &decision.default {
                    Some(variant_id) => (TraceOutcome::Default, variant_id.clone()),
                    None => {
                        return Err(EvalError::NoOutcome {
                            decision_id: decision.id.clone(),
                        })
                    }
                },
            };
            let Some(variant) = self.pack.variant(&variant_id) else {
                return Err(EvalError::UnresolvedReference {
                    decision_id: decision.id.clone(),
                    variant_id,
                });
            };
            debug!(
                decision = %decision.id,
                variant = %variant.id,
                "decision resolved"
            );

            let rule_id = match &outcome {
                TraceOutcome::Rule { rule_id } => Some(rule_id.clone()),
                TraceOutcome::Default => None,
            };
            selections.push(Selection {
                decision_id: decision.id.clone(),
                variant_id: variant.id.clone(),
                rule_id,
                source_blocks: variant.source_blocks.clone(),
            });
            entries.push(TraceEntry {
                decision_id: decision.id.clone(),
                checks,
                outcome,
                variant_id: variant.id.clone(),
                source_blocks: variant.source_blocks.clone(),
                timestamp,
            });
        }

        let masked_fields = contract.sensitive_fields();
        let mut inputs = effective_inputs;
        for field_id in &masked_fields {
            if inputs.contains_key(field_id) {
                inputs.insert(field_id.clone(), Value::Str(MASK.to_string()));
            }
        }

        let context = RenderContext {
            pack_id: self.pack.id.clone(),
            pack_version: self.pack.version.clone(),
            pack_fingerprint: self.fingerprint.clone(),
            values,
            selections,
        };
        let trace = EvaluationTrace {
            trace_id,
            pack_id: self.pack.id.clone(),
            pack_fingerprint: self.fingerprint.clone(),
            input_hash,
            timestamp,
            inputs,
            derived,
            masked_fields,
            entries,
        };
        Ok(Evaluation { context, trace })
    }
}
