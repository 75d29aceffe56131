//! End-to-end evaluation scenarios over small but complete packs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use quill_core::condition::{CompareOp, Condition};
use quill_core::expr::Expr;
use quill_core::field::{FieldSpec, FieldType};
use quill_core::pack::{DecisionPoint, DerivedField, Pack, Rule, Variant};
use quill_core::value::Value;
use quill_engine::{EvalError, PreparedPack, TraceOutcome};
use quill_verify::{validate_pack, FindingCode};

fn input(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn amount_rule_selects_zero_variant_and_default_otherwise() {
    let pack = Pack::new("amount_demo")
        .with_field(FieldSpec::new("amount", FieldType::Number).required())
        .with_variant(Variant::text("zero", "Nothing due.").with_source_block("blk_1"))
        .with_variant(Variant::text("nonzero", "Amount due.").with_source_block("blk_2"))
        .with_decision(
            DecisionPoint::new("amount_section")
                .with_rule(Rule::new(
                    "r_zero",
                    Condition::compare(CompareOp::Equals, "amount", 0i64),
                    "zero",
                ))
                .with_default("nonzero"),
        );
    let prepared = PreparedPack::prepare(pack).unwrap();

    let result = prepared
        .evaluate(&input(&[("amount", Value::Number(0.0))]))
        .unwrap();
    assert_eq!(
        result.context.selection("amount_section").unwrap().variant_id,
        "zero"
    );

    let result = prepared
        .evaluate(&input(&[("amount", Value::Number(5.0))]))
        .unwrap();
    assert_eq!(
        result.context.selection("amount_section").unwrap().variant_id,
        "nonzero"
    );
}

#[test]
fn derived_predicate_routes_minor_to_default() {
    let pack = Pack::new("age_demo")
        .with_field(FieldSpec::new("age", FieldType::Number).required())
        .with_derived(DerivedField::new(
            "is_adult",
            Expr::Predicate(Condition::compare(CompareOp::Gte, "age", 18i64)),
            FieldType::Bool,
        ))
        .with_variant(Variant::text("adult", "Adult clause.").with_source_block("blk_1"))
        .with_variant(Variant::text("minor", "Minor clause.").with_source_block("blk_2"))
        .with_decision(
            DecisionPoint::new("age_section")
                .with_rule(Rule::new(
                    "r_adult",
                    Condition::compare(CompareOp::Equals, "is_adult", true),
                    "adult",
                ))
                .with_default("minor"),
        );
    let prepared = PreparedPack::prepare(pack).unwrap();

    let result = prepared
        .evaluate(&input(&[("age", Value::Number(17.0))]))
        .unwrap();
    assert_eq!(result.context.value("is_adult"), Some(&Value::Bool(false)));
    assert_eq!(
        result.context.selection("age_section").unwrap().variant_id,
        "minor"
    );
    assert_eq!(result.trace.entries[0].outcome, TraceOutcome::Default);
}

#[test]
fn duplicate_conditions_block_generation() {
    let pack = Pack::new("dup_demo")
        .with_field(
            FieldSpec::new("status", FieldType::Enum)
                .required()
                .with_domain(&["A", "B"]),
        )
        .with_variant(Variant::text("v1", "one").with_source_block("b1"))
        .with_variant(Variant::text("v2", "two").with_source_block("b2"))
        .with_decision(
            DecisionPoint::new("d1")
                .with_rule(Rule::new(
                    "r1",
                    Condition::compare(CompareOp::Equals, "status", "A"),
                    "v1",
                ))
                .with_rule(Rule::new(
                    "r2",
                    Condition::compare(CompareOp::Equals, "status", "A"),
                    "v2",
                ))
                .with_default("v1"),
        );

    let report = validate_pack(&pack);
    assert!(report
        .errors()
        .any(|f| f.code == FindingCode::AmbiguousRule));

    let err = PreparedPack::prepare(pack).unwrap_err();
    assert!(matches!(err, EvalError::ConfigStructure { .. }));
}

#[test]
fn missing_required_field_names_the_field() {
    let pack = Pack::new("contract_demo")
        .with_field(FieldSpec::new("client_name", FieldType::Str).required())
        .with_variant(Variant::text("v1", "text").with_source_block("b1"))
        .with_decision(
            DecisionPoint::new("d1")
                .with_rule(Rule::new(
                    "r1",
                    Condition::unary(CompareOp::NotEmpty, "client_name"),
                    "v1",
                ))
                .with_default("v1"),
        );
    let prepared = PreparedPack::prepare(pack).unwrap();

    let err = prepared.evaluate(&BTreeMap::new()).unwrap_err();
    let violations = err.violations().expect("contract failure expected");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field_id(), "client_name");
}

#[test]
fn reordering_mutually_exclusive_rules_does_not_change_the_winner() {
    let rule_open = Rule::new(
        "r_open",
        Condition::compare(CompareOp::Equals, "status", "open"),
        "v_open",
    );
    let rule_closed = Rule::new(
        "r_closed",
        Condition::compare(CompareOp::Equals, "status", "closed"),
        "v_closed",
    );

    let build = |first: Rule, second: Rule| {
        Pack::new("order_demo")
            .with_field(
                FieldSpec::new("status", FieldType::Enum)
                    .required()
                    .with_domain(&["open", "closed"]),
            )
            .with_variant(Variant::text("v_open", "Open.").with_source_block("b1"))
            .with_variant(Variant::text("v_closed", "Closed.").with_source_block("b2"))
            .with_decision(
                DecisionPoint::new("status_section")
                    .with_rule(first)
                    .with_rule(second),
            )
    };

    let raw = input(&[("status", Value::Str("closed".into()))]);
    let forward = PreparedPack::prepare(build(rule_open.clone(), rule_closed.clone()))
        .unwrap()
        .evaluate(&raw)
        .unwrap();
    let reversed = PreparedPack::prepare(build(rule_closed, rule_open))
        .unwrap()
        .evaluate(&raw)
        .unwrap();

    assert_eq!(
        forward.context.selection("status_section").unwrap().variant_id,
        reversed.context.selection("status_section").unwrap().variant_id,
    );
}

#[test]
fn reordering_overlapping_rules_changes_the_winner() {
    let narrow = Rule::new(
        "r_narrow",
        Condition::All(vec![
            Condition::compare(CompareOp::Gt, "amount", 100i64),
            Condition::compare(CompareOp::Equals, "status", "open"),
        ]),
        "v_narrow",
    );
    let wide = Rule::new(
        "r_wide",
        Condition::compare(CompareOp::Gt, "amount", 100i64),
        "v_wide",
    );

    let build = |first: Rule, second: Rule| {
        Pack::new("overlap_demo")
            .with_field(FieldSpec::new("amount", FieldType::Number).required())
            .with_field(
                FieldSpec::new("status", FieldType::Enum)
                    .required()
                    .with_domain(&["open", "closed"]),
            )
            .with_variant(Variant::text("v_narrow", "Narrow.").with_source_block("b1"))
            .with_variant(Variant::text("v_wide", "Wide.").with_source_block("b2"))
            .with_variant(Variant::text("v_else", "Else.").with_source_block("b3"))
            .with_decision(
                DecisionPoint::new("d1")
                    .with_rule(first)
                    .with_rule(second)
                    .with_default("v_else"),
            )
    };

    let raw = input(&[
        ("amount", Value::Number(500.0)),
        ("status", Value::Str("open".into())),
    ]);
    let narrow_first = PreparedPack::prepare(build(narrow.clone(), wide.clone()))
        .unwrap()
        .evaluate(&raw)
        .unwrap();
    assert_eq!(
        narrow_first.context.selection("d1").unwrap().variant_id,
        "v_narrow"
    );

    // Wide first shadows the narrow rule; validation warns but allows it,
    // and the wide rule now wins.
    let wide_first = PreparedPack::prepare(build(wide, narrow)).unwrap();
    assert!(wide_first
        .report()
        .findings
        .iter()
        .any(|f| f.code == FindingCode::ShadowedRule));
    let result = wide_first.evaluate(&raw).unwrap();
    assert_eq!(result.context.selection("d1").unwrap().variant_id, "v_wide");
}

#[test]
fn depth_four_condition_rejected_whatever_the_operators() {
    let depth4 = Condition::All(vec![Condition::Any(vec![Condition::Not(Box::new(
        Condition::unary(CompareOp::Exists, "amount"),
    ))])]);
    let pack = Pack::new("deep_demo")
        .with_field(FieldSpec::new("amount", FieldType::Number))
        .with_variant(Variant::text("v1", "text").with_source_block("b1"))
        .with_decision(
            DecisionPoint::new("d1")
                .with_rule(Rule::new("r1", depth4, "v1"))
                .with_default("v1"),
        );

    let report = validate_pack(&pack);
    assert!(report
        .errors()
        .any(|f| f.code == FindingCode::DepthExceeded));
}

#[test]
fn identical_runs_are_byte_identical() {
    let pack = Pack::new("det_demo")
        .with_field(FieldSpec::new("amount", FieldType::Number).required())
        .with_field(FieldSpec::new("tax_id", FieldType::Str).sensitive())
        .with_derived(DerivedField::new(
            "is_large",
            Expr::Predicate(Condition::compare(CompareOp::Gt, "amount", 1000i64)),
            FieldType::Bool,
        ))
        .with_variant(Variant::text("v_large", "Large.").with_source_block("b1"))
        .with_variant(Variant::text("v_small", "Small.").with_source_block("b2"))
        .with_decision(
            DecisionPoint::new("size_section")
                .with_rule(Rule::new(
                    "r_large",
                    Condition::compare(CompareOp::Equals, "is_large", true),
                    "v_large",
                ))
                .with_default("v_small"),
        );

    // Validation is idempotent byte for byte.
    let report_a = serde_json::to_string(&validate_pack(&pack)).unwrap();
    let report_b = serde_json::to_string(&validate_pack(&pack)).unwrap();
    assert_eq!(report_a, report_b);

    let prepared = PreparedPack::prepare(pack).unwrap();
    let raw = input(&[
        ("amount", Value::Number(2000.0)),
        ("tax_id", Value::Str("X99".into())),
    ]);
    let at = DateTime::parse_from_rfc3339("2026-02-01T09:30:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let id = Uuid::nil();

    let a = prepared.evaluate_at(&raw, at, id).unwrap();
    let b = prepared.evaluate_at(&raw, at, id).unwrap();
    assert_eq!(a.context.canonical_json(), b.context.canonical_json());
    assert_eq!(
        serde_json::to_string(&a.trace).unwrap(),
        serde_json::to_string(&b.trace).unwrap()
    );
}
