//! Static pack validation.
//!
//! Every check here runs once, at pack load time, before any document is
//! generated: reference resolution across all tables, derived-field
//! dependency ordering, condition-depth bounds, duplicate and shadowed
//! rules, decision coverage, variant provenance, and type consistency.
//! The result is a [`ValidationReport`] whose findings appear in a fixed
//! pass order and, within a pass, in declaration order, so the same pack
//! always renders the same report byte for byte.

pub mod graph;
pub mod report;
pub mod structural;
pub mod typecheck;

use quill_core::pack::Pack;
use tracing::{debug, info};

pub use graph::{collect_references, derived_topo_order, RefKind, ReferenceEdge};
pub use report::{Finding, FindingCode, Severity, ValidationReport};

/// Run the full static validation suite over one pack.
///
/// Pass order is fixed: identifiers, references and derived-field
/// ordering, condition depth, rule overlap, coverage, provenance, types.
pub fn validate_pack(pack: &Pack) -> ValidationReport {
    let mut report = ValidationReport::new(pack.id.clone(), pack.fingerprint());

    structural::check_ids(pack, &mut report);
    graph::check_references(pack, &mut report);
    graph::check_derived_dag(pack, &mut report);
    structural::check_depth(pack, &mut report);
    structural::check_rule_overlap(pack, &mut report);
    structural::check_coverage(pack, &mut report);
    structural::check_provenance(pack, &mut report);
    typecheck::check_types(pack, &mut report);

    if report.is_valid() {
        debug!(
            pack_id = %report.pack_id,
            warnings = report.warning_count(),
            "pack validated"
        );
    } else {
        info!(
            pack_id = %report.pack_id,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "pack rejected by static validation"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::condition::{CompareOp, Condition};
    use quill_core::expr::{ArithOp, Expr};
    use quill_core::field::{FieldSpec, FieldType};
    use quill_core::pack::{DecisionPoint, DerivedField, Pack, Rule, Variant};

    fn valid_pack() -> Pack {
        Pack::new("pt_review")
            .with_field(FieldSpec::new("amount", FieldType::Number).required())
            .with_field(
                FieldSpec::new("status", FieldType::Enum)
                    .required()
                    .with_domain(&["open", "closed"]),
            )
            .with_derived(DerivedField::new(
                "doubled",
                Expr::binary(ArithOp::Mul, Expr::field("amount"), Expr::literal(2i64)),
                FieldType::Number,
            ))
            .with_variant(Variant::text("v_open", "Case is open.").with_source_block("blk_1"))
            .with_variant(Variant::text("v_closed", "Case is closed.").with_source_block("blk_2"))
            .with_decision(
                DecisionPoint::new("status_section")
                    .with_rule(Rule::new(
                        "r_open",
                        Condition::compare(CompareOp::Equals, "status", "open"),
                        "v_open",
                    ))
                    .with_rule(Rule::new(
                        "r_closed",
                        Condition::compare(CompareOp::Equals, "status", "closed"),
                        "v_closed",
                    )),
            )
    }

    #[test]
    fn well_formed_pack_passes() {
        let report = validate_pack(&valid_pack());
        assert!(report.is_valid(), "{report}");
        assert_eq!(report.findings.len(), 0);
    }

    #[test]
    fn broken_pack_collects_findings_from_every_pass() {
        // One pack, three independent defects: a dangling variant
        // reference, a derived-field cycle, and a variant without
        // provenance.
        let pack = Pack::new("broken")
            .with_field(FieldSpec::new("amount", FieldType::Number))
            .with_derived(DerivedField::new("a", Expr::field("b"), FieldType::Number))
            .with_derived(DerivedField::new("b", Expr::field("a"), FieldType::Number))
            .with_variant(Variant::text("v1", "text"))
            .with_decision(
                DecisionPoint::new("d1")
                    .with_rule(Rule::new(
                        "r1",
                        Condition::compare(CompareOp::Gt, "amount", 0i64),
                        "missing_variant",
                    ))
                    .with_default("v1"),
            );

        let report = validate_pack(&pack);
        assert!(!report.is_valid());
        assert!(report
            .errors()
            .any(|f| f.code == FindingCode::UnresolvedReference));
        assert!(report.errors().any(|f| f.code == FindingCode::Cycle));
        assert!(report
            .errors()
            .any(|f| f.code == FindingCode::MissingProvenance));
    }

    #[test]
    fn report_is_deterministic() {
        let pack = valid_pack();
        let a = serde_json::to_string(&validate_pack(&pack)).unwrap();
        let b = serde_json::to_string(&validate_pack(&pack)).unwrap();
        assert_eq!(a, b);
    }
}
