//! The immutable render context produced by a successful evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use quill_core::value::Value;

/// The resolved outcome of one decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub decision_id: String,
    pub variant_id: String,
    /// The rule that fired, or `None` when the default was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Provenance of the selected variant.
    pub source_blocks: Vec<String>,
}

/// Everything a downstream renderer needs: the effective value map (raw
/// input, defaults, and derived values) and one selection per decision
/// point, in document order. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    pub pack_id: String,
    pub pack_version: String,
    pub pack_fingerprint: String,
    pub values: BTreeMap<String, Value>,
    pub selections: Vec<Selection>,
}

impl RenderContext {
    /// Value of a raw or derived field, if present.
    pub fn value(&self, field_id: &str) -> Option<&Value> {
        self.values.get(field_id)
    }

    /// Selection for a decision point, if the pack declares one.
    pub fn selection(&self, decision_id: &str) -> Option<&Selection> {
        self.selections.iter().find(|s| s.decision_id == decision_id)
    }

    /// Canonical JSON form. Key order is fixed by the underlying
    /// `BTreeMap`s, so equal contexts serialize byte for byte.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).expect("serialization should not fail")
    }
}
