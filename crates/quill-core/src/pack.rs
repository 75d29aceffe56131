//! Pack tables: derived fields, rules, decision points, variants, and the
//! pack container.
//!
//! A pack is authored once, loaded, statically validated, and thereafter
//! read-only. Declaration order is significant everywhere: rules within a
//! decision evaluate top-down, decisions evaluate in pack order, and
//! derived fields may reference only earlier entries.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::contract::FieldContract;
use crate::expr::Expr;
use crate::field::{FieldSpec, FieldType};
use crate::hash::fingerprint;

/// A computed field built from raw fields and earlier derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedField {
    /// Pack-unique identifier; shares the namespace with raw fields.
    pub id: String,
    /// Expression tree.
    pub expr: Expr,
    /// Declared result type.
    pub result_type: FieldType,
}

impl DerivedField {
    pub fn new(id: impl Into<String>, expr: Expr, result_type: FieldType) -> Self {
        Self {
            id: id.into(),
            expr,
            result_type,
        }
    }
}

/// One condition→outcome rule inside a decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Pack-unique rule identifier.
    pub id: String,
    /// Condition tree; depth is bounded by the static validator.
    pub condition: Condition,
    /// The variant selected when this rule fires.
    pub variant_id: String,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        condition: Condition,
        variant_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            condition,
            variant_id: variant_id.into(),
        }
    }
}

/// A named location in the document where an ordered rule list selects
/// exactly one output variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPoint {
    /// Pack-unique decision identifier.
    pub id: String,
    /// Rules in declaration order; the first whose condition holds wins.
    pub rules: Vec<Rule>,
    /// Outcome when no rule matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl DecisionPoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: Vec::new(),
            default: None,
        }
    }

    /// Builder: append a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Builder: set the default variant.
    pub fn with_default(mut self, variant_id: impl Into<String>) -> Self {
        self.default = Some(variant_id.into());
        self
    }
}

/// The shape of a selectable variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Fixed text with named placeholders to be substituted downstream.
    Text {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        placeholders: Vec<String>,
    },
    /// Table schema rendered downstream.
    Table { columns: Vec<String> },
}

/// A fixed-text or table-schema alternative selectable by a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Pack-unique variant identifier.
    pub id: String,
    pub kind: VariantKind,
    /// Provenance pointers to the origin blocks in the source template.
    /// The validator requires at least one.
    pub source_blocks: Vec<String>,
}

impl Variant {
    /// Text variant.
    pub fn text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: VariantKind::Text {
                content: content.into(),
                placeholders: Vec::new(),
            },
            source_blocks: Vec::new(),
        }
    }

    /// Table variant.
    pub fn table(id: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            id: id.into(),
            kind: VariantKind::Table {
                columns: columns.iter().map(|s| s.to_string()).collect(),
            },
            source_blocks: Vec::new(),
        }
    }

    /// Builder: add a provenance pointer.
    pub fn with_source_block(mut self, block_id: impl Into<String>) -> Self {
        self.source_blocks.push(block_id.into());
        self
    }
}

/// The complete set of configuration tables for one document template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    /// Pack identifier.
    pub id: String,
    /// Authored version string.
    pub version: String,
    /// Field contract entries, in declaration order.
    pub fields: Vec<FieldSpec>,
    /// Derived fields, in declaration order (no forward references).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<DerivedField>,
    /// Decision points, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<DecisionPoint>,
    /// Variant table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
}

impl Pack {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: "0.1.0".to_string(),
            fields: Vec::new(),
            derived: Vec::new(),
            decisions: Vec::new(),
            variants: Vec::new(),
        }
    }

    /// Builder: set the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Builder: append a field spec.
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Builder: append a derived field.
    pub fn with_derived(mut self, derived: DerivedField) -> Self {
        self.derived.push(derived);
        self
    }

    /// Builder: append a decision point.
    pub fn with_decision(mut self, decision: DecisionPoint) -> Self {
        self.decisions.push(decision);
        self
    }

    /// Builder: append a variant.
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Borrowed field-contract view.
    pub fn contract(&self) -> FieldContract<'_> {
        FieldContract::new(&self.fields)
    }

    /// Look up a raw field spec by id.
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Look up a derived field by id.
    pub fn derived_field(&self, id: &str) -> Option<&DerivedField> {
        self.derived.iter().find(|d| d.id == id)
    }

    /// Declared type of a raw or derived field, if defined.
    pub fn field_type(&self, id: &str) -> Option<FieldType> {
        self.field(id)
            .map(|f| f.field_type)
            .or_else(|| self.derived_field(id).map(|d| d.result_type))
    }

    /// Look up a decision point by id.
    pub fn decision(&self, id: &str) -> Option<&DecisionPoint> {
        self.decisions.iter().find(|d| d.id == id)
    }

    /// Look up a variant by id.
    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Iterate over every rule in the pack, with its owning decision id.
    pub fn rules(&self) -> impl Iterator<Item = (&DecisionPoint, &Rule)> {
        self.decisions
            .iter()
            .flat_map(|d| d.rules.iter().map(move |r| (d, r)))
    }

    /// Hex SHA-256 fingerprint of the pack's canonical JSON form.
    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{CompareOp, Condition};

    fn small_pack() -> Pack {
        Pack::new("pt_review")
            .with_field(FieldSpec::new("amount", FieldType::Number).required())
            .with_variant(Variant::text("zero", "No amount.").with_source_block("blk_1"))
            .with_variant(Variant::text("nonzero", "Amount due.").with_source_block("blk_2"))
            .with_decision(
                DecisionPoint::new("amount_section")
                    .with_rule(Rule::new(
                        "r_zero",
                        Condition::compare(CompareOp::Equals, "amount", 0i64),
                        "zero",
                    ))
                    .with_default("nonzero"),
            )
    }

    #[test]
    fn lookups() {
        let pack = small_pack();
        assert!(pack.field("amount").is_some());
        assert!(pack.field("missing").is_none());
        assert!(pack.decision("amount_section").is_some());
        assert_eq!(pack.variant("zero").unwrap().source_blocks, vec!["blk_1"]);
        assert_eq!(pack.rules().count(), 1);
    }

    #[test]
    fn field_type_spans_raw_and_derived() {
        let pack = small_pack().with_derived(DerivedField::new(
            "double_amount",
            Expr::binary(
                crate::expr::ArithOp::Mul,
                Expr::field("amount"),
                Expr::literal(2i64),
            ),
            FieldType::Number,
        ));
        assert_eq!(pack.field_type("amount"), Some(FieldType::Number));
        assert_eq!(pack.field_type("double_amount"), Some(FieldType::Number));
        assert_eq!(pack.field_type("nope"), None);
    }

    #[test]
    fn fingerprint_stable_and_content_sensitive() {
        let pack = small_pack();
        assert_eq!(pack.fingerprint(), small_pack().fingerprint());

        let changed = small_pack().with_version("0.2.0");
        assert_ne!(pack.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn serde_round_trip() {
        let pack = small_pack();
        let json = serde_json::to_string_pretty(&pack).unwrap();
        let back: Pack = serde_json::from_str(&json).unwrap();
        assert_eq!(pack, back);
    }
}
