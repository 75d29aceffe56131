//! Replayable audit trace of one evaluation.
//!
//! The trace records every rule checked per decision, in order, with its
//! boolean result, plus the masked input echo and the derived values. For
//! a fixed timestamp and trace id the trace is a pure function of pack
//! and input, so two runs serialize byte for byte.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::value::Value;

/// Replacement shown for sensitive field values in traces.
pub const MASK: &str = "***";

/// How one decision resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    /// A rule fired.
    Rule { rule_id: String },
    /// No rule matched; the declared default was taken.
    Default,
}

/// One rule checked during a decision, with its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCheck {
    pub rule_id: String,
    pub matched: bool,
}

/// The full record of one decision: every rule checked up to and
/// including the winner, and the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub decision_id: String,
    pub checks: Vec<RuleCheck>,
    pub outcome: TraceOutcome,
    pub variant_id: String,
    /// Provenance of the selected variant, echoed for audit replay.
    pub source_blocks: Vec<String>,
    /// Request timestamp, repeated per entry so entries replay standalone.
    pub timestamp: DateTime<Utc>,
}

/// Audit trace of one complete evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub trace_id: Uuid,
    pub pack_id: String,
    pub pack_fingerprint: String,
    /// SHA-256 fingerprint of the raw input, taken before masking.
    pub input_hash: String,
    pub timestamp: DateTime<Utc>,
    /// Effective input echo with sensitive values replaced by [`MASK`].
    pub inputs: BTreeMap<String, Value>,
    /// Derived values in field-id order. Absent derived fields are absent here too.
    pub derived: BTreeMap<String, Value>,
    /// Ids of the fields that were masked, in declaration order.
    pub masked_fields: Vec<String>,
    pub entries: Vec<TraceEntry>,
}

impl fmt::Display for EvaluationTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Evaluation Trace {} ===", self.trace_id)?;
        writeln!(f, "Pack: {} ({})", self.pack_id, self.pack_fingerprint)?;
        writeln!(f, "Input hash: {}", self.input_hash)?;
        writeln!(f, "At: {}", self.timestamp.to_rfc3339())?;
        for entry in &self.entries {
            let outcome = match &entry.outcome {
                TraceOutcome::Rule { rule_id } => format!("rule '{rule_id}'"),
                TraceOutcome::Default => "default".to_string(),
            };
            writeln!(
                f,
                "{}: {} -> '{}' ({} rule(s) checked)",
                entry.decision_id,
                outcome,
                entry.variant_id,
                entry.checks.len()
            )?;
        }
        Ok(())
    }
}
