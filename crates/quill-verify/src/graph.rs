//! Identifier graph spanning all pack tables.
//!
//! Cross-table integrity is a graph problem: build one edge list covering
//! every reference (rule → variant, default → variant, condition → field,
//! derived expression → field), then run resolution, forward-reference,
//! and cycle checks over it once at load time.

use std::collections::{BTreeMap, BTreeSet};

use quill_core::pack::Pack;

use crate::report::{Finding, FindingCode, ValidationReport};

/// What kind of reference an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Rule outcome pointing at a variant.
    RuleOutcome,
    /// Decision default pointing at a variant.
    DecisionDefault,
    /// Condition leaf reading a raw or derived field.
    ConditionField,
    /// Derived-field expression reading a raw or derived field.
    DerivedOperand,
}

/// One directed reference edge, used purely for static-integrity checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEdge {
    pub from: String,
    pub to: String,
    pub kind: RefKind,
}

/// Collect every reference edge in the pack, in declaration order.
pub fn collect_references(pack: &Pack) -> Vec<ReferenceEdge> {
    let mut edges = Vec::new();

    for derived in &pack.derived {
        for field in derived.expr.referenced_fields() {
            edges.push(ReferenceEdge {
                from: derived.id.clone(),
                to: field,
                kind: RefKind::DerivedOperand,
            });
        }
    }

    for decision in &pack.decisions {
        for rule in &decision.rules {
            for field in rule.condition.referenced_fields() {
                edges.push(ReferenceEdge {
                    from: rule.id.clone(),
                    to: field,
                    kind: RefKind::ConditionField,
                });
            }
            edges.push(ReferenceEdge {
                from: rule.id.clone(),
                to: rule.variant_id.clone(),
                kind: RefKind::RuleOutcome,
            });
        }
        if let Some(default) = &decision.default {
            edges.push(ReferenceEdge {
                from: decision.id.clone(),
                to: default.clone(),
                kind: RefKind::DecisionDefault,
            });
        }
    }

    edges
}

/// Check that every edge target resolves to a defined entity of the
/// expected kind.
pub fn check_references(pack: &Pack, report: &mut ValidationReport) {
    for edge in collect_references(pack) {
        let resolved = match edge.kind {
            RefKind::RuleOutcome | RefKind::DecisionDefault => pack.variant(&edge.to).is_some(),
            RefKind::ConditionField | RefKind::DerivedOperand => {
                pack.field_type(&edge.to).is_some()
            }
        };
        if !resolved {
            report.push(Finding::error(
                FindingCode::UnresolvedReference,
                edge.from.clone(),
                format!("'{}' references undefined '{}'", edge.from, edge.to),
            ));
        }
    }
}

/// Check that derived fields reference only raw fields and *earlier*
/// derived fields, and that their dependencies form no cycle.
///
/// With forward references banned, declaration order is already a valid
/// evaluation order; the cycle check still runs so a corrupted pack
/// reports `Cycle` rather than a cascade of forward-reference findings.
pub fn check_derived_dag(pack: &Pack, report: &mut ValidationReport) {
    let mut seen: BTreeSet<&str> = pack.fields.iter().map(|f| f.id.as_str()).collect();
    for derived in &pack.derived {
        for dep in derived.expr.referenced_fields() {
            let is_later_derived = pack.derived_field(&dep).is_some() && !seen.contains(dep.as_str());
            if is_later_derived && dep != derived.id {
                report.push(Finding::error(
                    FindingCode::ForwardReference,
                    derived.id.clone(),
                    format!(
                        "derived field '{}' references '{}' before it is defined",
                        derived.id, dep
                    ),
                ));
            }
        }
        seen.insert(derived.id.as_str());
    }

    if let Err(cycle_members) = derived_topo_order(pack) {
        for id in cycle_members {
            report.push(Finding::error(
                FindingCode::Cycle,
                id.clone(),
                format!("derived field '{id}' participates in a dependency cycle"),
            ));
        }
    }
}

/// Topological evaluation order of the derived fields (Kahn's algorithm
/// with sorted tie-breaking for determinism).
///
/// Returns the cycle members, sorted, when the dependency graph is cyclic.
pub fn derived_topo_order(pack: &Pack) -> Result<Vec<String>, Vec<String>> {
    let derived_ids: BTreeSet<&str> = pack.derived.iter().map(|d| d.id.as_str()).collect();

    // Dependencies restricted to derived-to-derived edges; raw fields are
    // always available and impose no ordering.
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for derived in &pack.derived {
        in_degree.entry(derived.id.as_str()).or_insert(0);
    }
    for derived in &pack.derived {
        for dep in derived.expr.referenced_fields() {
            if let Some(dep_id) = derived_ids.get(dep.as_str()) {
                if *dep_id == derived.id {
                    // Self-reference is a one-node cycle.
                    return Err(vec![derived.id.clone()]);
                }
                *in_degree.entry(derived.id.as_str()).or_insert(0) += 1;
                dependents
                    .entry(*dep_id)
                    .or_default()
                    .push(derived.id.as_str());
            }
        }
    }

    let mut queue: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| *id)
        .collect();
    queue.sort();

    let mut order = Vec::with_capacity(pack.derived.len());
    while let Some(id) = queue.pop() {
        order.push(id.to_string());
        for dependent in dependents.get(id).cloned().unwrap_or_default() {
            if let Some(deg) = in_degree.get_mut(dependent) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push(dependent);
                }
            }
        }
        queue.sort();
    }

    if order.len() == pack.derived.len() {
        Ok(order)
    } else {
        let mut cycle: Vec<String> = in_degree
            .iter()
            .filter(|(id, _)| !order.iter().any(|o| o.as_str() == **id))
            .map(|(id, _)| id.to_string())
            .collect();
        cycle.sort();
        Err(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::condition::{CompareOp, Condition};
    use quill_core::expr::{ArithOp, Expr};
    use quill_core::field::{FieldSpec, FieldType};
    use quill_core::pack::{DecisionPoint, DerivedField, Rule, Variant};

    fn base_pack() -> Pack {
        Pack::new("p")
            .with_field(FieldSpec::new("amount", FieldType::Number))
            .with_variant(Variant::text("v1", "text").with_source_block("b1"))
    }

    fn report_for(pack: &Pack) -> ValidationReport {
        ValidationReport::new(pack.id.clone(), pack.fingerprint())
    }

    #[test]
    fn edges_cover_rules_defaults_and_expressions() {
        let pack = base_pack()
            .with_derived(DerivedField::new(
                "doubled",
                Expr::binary(ArithOp::Mul, Expr::field("amount"), Expr::literal(2i64)),
                FieldType::Number,
            ))
            .with_decision(
                DecisionPoint::new("d1")
                    .with_rule(Rule::new(
                        "r1",
                        Condition::compare(CompareOp::Gt, "doubled", 10i64),
                        "v1",
                    ))
                    .with_default("v1"),
            );

        let edges = collect_references(&pack);
        assert!(edges.iter().any(|e| e.from == "doubled"
            && e.to == "amount"
            && e.kind == RefKind::DerivedOperand));
        assert!(edges
            .iter()
            .any(|e| e.from == "r1" && e.to == "v1" && e.kind == RefKind::RuleOutcome));
        assert!(edges
            .iter()
            .any(|e| e.from == "d1" && e.to == "v1" && e.kind == RefKind::DecisionDefault));
    }

    #[test]
    fn unresolved_variant_reported() {
        let pack = base_pack().with_decision(DecisionPoint::new("d1").with_rule(Rule::new(
            "r1",
            Condition::compare(CompareOp::Equals, "amount", 0i64),
            "no_such_variant",
        )));
        let mut report = report_for(&pack);
        check_references(&pack, &mut report);
        assert!(report
            .errors()
            .any(|f| f.code == FindingCode::UnresolvedReference && f.subject == "r1"));
    }

    #[test]
    fn unresolved_field_reported() {
        let pack = base_pack().with_decision(DecisionPoint::new("d1").with_rule(Rule::new(
            "r1",
            Condition::compare(CompareOp::Equals, "ghost", 0i64),
            "v1",
        )));
        let mut report = report_for(&pack);
        check_references(&pack, &mut report);
        assert!(report
            .errors()
            .any(|f| f.message.contains("'ghost'")));
    }

    #[test]
    fn forward_reference_reported() {
        let pack = base_pack()
            .with_derived(DerivedField::new(
                "early",
                Expr::field("late"),
                FieldType::Number,
            ))
            .with_derived(DerivedField::new(
                "late",
                Expr::field("amount"),
                FieldType::Number,
            ));
        let mut report = report_for(&pack);
        check_derived_dag(&pack, &mut report);
        assert!(report
            .errors()
            .any(|f| f.code == FindingCode::ForwardReference && f.subject == "early"));
    }

    #[test]
    fn cycle_reported_for_mutual_dependency() {
        let pack = base_pack()
            .with_derived(DerivedField::new("a", Expr::field("b"), FieldType::Number))
            .with_derived(DerivedField::new("b", Expr::field("a"), FieldType::Number));
        let mut report = report_for(&pack);
        check_derived_dag(&pack, &mut report);
        assert!(report.errors().any(|f| f.code == FindingCode::Cycle));

        assert_eq!(
            derived_topo_order(&pack),
            Err(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn topo_order_respects_dependencies() {
        let pack = base_pack()
            .with_derived(DerivedField::new(
                "x",
                Expr::field("amount"),
                FieldType::Number,
            ))
            .with_derived(DerivedField::new("y", Expr::field("x"), FieldType::Number));
        let order = derived_topo_order(&pack).unwrap();
        let pos_x = order.iter().position(|id| id == "x").unwrap();
        let pos_y = order.iter().position(|id| id == "y").unwrap();
        assert!(pos_x < pos_y);
    }
}
