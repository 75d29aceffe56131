//! Validation report: structured findings with severity and summary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a validation finding. Errors block generation for the
/// pack; warnings do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARN"),
        }
    }
}

/// Machine-readable category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCode {
    /// An identifier referenced somewhere does not resolve to a defined entity.
    UnresolvedReference,
    /// Two entities share an identifier that must be unique.
    DuplicateId,
    /// Two rules in one decision carry structurally identical conditions.
    AmbiguousRule,
    /// A rule is unreachable because an earlier rule's condition covers it.
    ShadowedRule,
    /// A condition tree exceeds the maximum nesting depth.
    DepthExceeded,
    /// A decision has neither a default outcome nor provably total coverage.
    MissingCoverage,
    /// A variant carries no source-block provenance pointer.
    MissingProvenance,
    /// An operator is applied to operands of incompatible declared types.
    TypeMismatch,
    /// Derived-field dependencies form a cycle.
    Cycle,
    /// A derived field references a derived field declared after it.
    ForwardReference,
}

/// One validation finding, naming the entity it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: FindingCode,
    /// Identifier of the offending entity (decision, rule, field, or variant).
    pub subject: String,
    pub message: String,
}

impl Finding {
    pub fn error(code: FindingCode, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn warning(
        code: FindingCode,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// The complete result of statically validating one pack.
///
/// Findings appear in declaration order of the offending entities, so an
/// identical pack always produces a byte-identical report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub pack_id: String,
    pub pack_fingerprint: String,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new(pack_id: impl Into<String>, pack_fingerprint: impl Into<String>) -> Self {
        Self {
            pack_id: pack_id.into(),
            pack_fingerprint: pack_fingerprint.into(),
            findings: Vec::new(),
        }
    }

    /// True when no finding carries `Severity::Error`.
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count()
    }

    /// Iterate over error-severity findings.
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Pack Validation Report: {} ===", self.pack_id)?;
        writeln!(
            f,
            "Findings: {} | Errors: {} | Warnings: {}",
            self.findings.len(),
            self.error_count(),
            self.warning_count(),
        )?;
        if self.findings.is_empty() {
            writeln!(f, "No findings.")?;
        } else {
            for finding in &self.findings {
                writeln!(
                    f,
                    "[{}] {:?} at '{}': {}",
                    finding.severity, finding.code, finding.subject, finding.message
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_tracks_error_severity() {
        let mut report = ValidationReport::new("p", "fp");
        assert!(report.is_valid());

        report.push(Finding::warning(
            FindingCode::ShadowedRule,
            "r2",
            "unreachable",
        ));
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 1);

        report.push(Finding::error(
            FindingCode::UnresolvedReference,
            "r1",
            "dangling variant",
        ));
        assert!(!report.is_valid());
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn display_contains_counts_and_findings() {
        let mut report = ValidationReport::new("pt_review", "fp");
        report.push(Finding::error(
            FindingCode::MissingCoverage,
            "d1",
            "no default and coverage not provable",
        ));
        let rendered = report.to_string();
        assert!(rendered.contains("Pack Validation Report: pt_review"));
        assert!(rendered.contains("Errors: 1"));
        assert!(rendered.contains("'d1'"));
    }

    #[test]
    fn serde_round_trip() {
        let mut report = ValidationReport::new("p", "fp");
        report.push(Finding::error(FindingCode::Cycle, "a", "cycle a -> b -> a"));
        let json = serde_json::to_string(&report).unwrap();
        let back: ValidationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
