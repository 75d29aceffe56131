//! Structural pack checks: identifier uniqueness, condition depth,
//! duplicate and shadowed rules, decision coverage, and variant
//! provenance.

use std::collections::BTreeSet;

use quill_core::condition::{Condition, MAX_CONDITION_DEPTH};
use quill_core::field::FieldType;
use quill_core::pack::{DecisionPoint, Pack};

use crate::report::{Finding, FindingCode, ValidationReport};

/// Check global uniqueness of every identifier namespace. Raw and derived
/// fields share one namespace; rules and decisions are pack-unique.
pub fn check_ids(pack: &Pack, report: &mut ValidationReport) {
    let mut fields: BTreeSet<&str> = BTreeSet::new();
    for spec in &pack.fields {
        if !fields.insert(&spec.id) {
            report.push(duplicate(&spec.id, "field"));
        }
    }
    for derived in &pack.derived {
        if !fields.insert(&derived.id) {
            report.push(duplicate(&derived.id, "derived field"));
        }
    }

    let mut decisions: BTreeSet<&str> = BTreeSet::new();
    let mut rules: BTreeSet<&str> = BTreeSet::new();
    for decision in &pack.decisions {
        if !decisions.insert(&decision.id) {
            report.push(duplicate(&decision.id, "decision"));
        }
        for rule in &decision.rules {
            if !rules.insert(&rule.id) {
                report.push(duplicate(&rule.id, "rule"));
            }
        }
    }

    let mut variants: BTreeSet<&str> = BTreeSet::new();
    for variant in &pack.variants {
        if !variants.insert(&variant.id) {
            report.push(duplicate(&variant.id, "variant"));
        }
    }
}

fn duplicate(id: &str, kind: &str) -> Finding {
    Finding::error(
        FindingCode::DuplicateId,
        id,
        format!("duplicate {kind} id '{id}'"),
    )
}

/// Check that every rule's condition tree respects the depth bound.
pub fn check_depth(pack: &Pack, report: &mut ValidationReport) {
    for (decision, rule) in pack.rules() {
        let depth = rule.condition.depth();
        if depth > MAX_CONDITION_DEPTH {
            report.push(Finding::error(
                FindingCode::DepthExceeded,
                rule.id.clone(),
                format!(
                    "condition of rule '{}' in decision '{}' has depth {} (max {})",
                    rule.id, decision.id, depth, MAX_CONDITION_DEPTH
                ),
            ));
        }
    }
}

/// Check for duplicate and shadowed conditions within each decision.
///
/// Two rules with structurally identical conditions are ambiguous and
/// block the pack. A later rule whose condition merely implies an earlier
/// rule's condition is unreachable and flagged as a warning.
pub fn check_rule_overlap(pack: &Pack, report: &mut ValidationReport) {
    for decision in &pack.decisions {
        for (later_idx, later) in decision.rules.iter().enumerate() {
            for earlier in &decision.rules[..later_idx] {
                if later.condition == earlier.condition {
                    report.push(Finding::error(
                        FindingCode::AmbiguousRule,
                        later.id.clone(),
                        format!(
                            "rule '{}' duplicates the condition of earlier rule '{}' in decision '{}'",
                            later.id, earlier.id, decision.id
                        ),
                    ));
                } else if later.condition.implies(&earlier.condition) {
                    report.push(Finding::warning(
                        FindingCode::ShadowedRule,
                        later.id.clone(),
                        format!(
                            "rule '{}' is unreachable: earlier rule '{}' in decision '{}' already covers it",
                            later.id, earlier.id, decision.id
                        ),
                    ));
                }
            }
        }
    }
}

/// Check that every decision either declares a default outcome or has
/// provably total rule coverage. A decision with neither is an error,
/// never a silent empty-output fallback.
pub fn check_coverage(pack: &Pack, report: &mut ValidationReport) {
    for decision in &pack.decisions {
        if decision.default.is_some() {
            continue;
        }
        if !coverage_provable(pack, decision) {
            report.push(Finding::error(
                FindingCode::MissingCoverage,
                decision.id.clone(),
                format!(
                    "decision '{}' has no default outcome and total coverage is not provable",
                    decision.id
                ),
            ));
        }
    }
}

/// Conservative coverage proof. Recognizes two shapes:
/// a structural complement pair (some rule's condition is the negation of
/// another's), and equals-rules exhausting a required enum field's domain.
fn coverage_provable(pack: &Pack, decision: &DecisionPoint) -> bool {
    let conditions: Vec<&Condition> = decision.rules.iter().map(|r| &r.condition).collect();

    // Complement pair: C and Not(C).
    for a in &conditions {
        for b in &conditions {
            if let Condition::Not(inner) = b {
                if inner.as_ref() == *a {
                    return true;
                }
            }
        }
    }

    // Equals-rules exhausting a required enum domain.
    let mut by_field: Vec<(&str, BTreeSet<&str>)> = Vec::new();
    for cond in &conditions {
        if let Condition::Compare {
            op: quill_core::condition::CompareOp::Equals,
            field,
            value: Some(quill_core::value::Value::Str(literal)),
            ..
        } = cond
        {
            match by_field.iter_mut().find(|(f, _)| *f == field.as_str()) {
                Some((_, values)) => {
                    values.insert(literal.as_str());
                }
                None => {
                    let mut values = BTreeSet::new();
                    values.insert(literal.as_str());
                    by_field.push((field.as_str(), values));
                }
            }
        }
    }
    for (field_id, covered) in by_field {
        if let Some(spec) = pack.field(field_id) {
            let exhaustive = spec.field_type == FieldType::Enum
                && spec.required
                && !spec.domain.is_empty()
                && spec.domain.iter().all(|d| covered.contains(d.as_str()));
            if exhaustive {
                return true;
            }
        }
    }

    false
}

/// Check that every variant carries at least one source-block provenance
/// pointer.
pub fn check_provenance(pack: &Pack, report: &mut ValidationReport) {
    for variant in &pack.variants {
        if variant.source_blocks.is_empty() {
            report.push(Finding::error(
                FindingCode::MissingProvenance,
                variant.id.clone(),
                format!("variant '{}' carries no source_block_id", variant.id),
            ));
        }
    }
}
