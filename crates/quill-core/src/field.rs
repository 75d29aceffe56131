//! Field contract: the typed schema of every input field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Declared type of an input or derived field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Str,
    Number,
    Bool,
    Date,
    Enum,
    List,
}

impl FieldType {
    /// Whether a concrete value satisfies this declared type.
    /// Enum values are carried as strings; domain membership is a separate
    /// contract check.
    pub fn admits(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::Str, Value::Str(_))
                | (FieldType::Number, Value::Number(_))
                | (FieldType::Bool, Value::Bool(_))
                | (FieldType::Date, Value::Date(_))
                | (FieldType::Enum, Value::Str(_))
                | (FieldType::List, Value::List(_))
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Str => write!(f, "string"),
            FieldType::Number => write!(f, "number"),
            FieldType::Bool => write!(f, "boolean"),
            FieldType::Date => write!(f, "date"),
            FieldType::Enum => write!(f, "enum"),
            FieldType::List => write!(f, "list"),
        }
    }
}

/// Schema entry for one input field. Immutable once the pack is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Pack-unique field identifier.
    pub id: String,
    /// Declared type.
    pub field_type: FieldType,
    /// Whether a request must supply this field (or a default must exist).
    #[serde(default)]
    pub required: bool,
    /// Allowed values for enum fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<String>,
    /// Sensitive fields are masked in traces and serialized input echoes.
    #[serde(default)]
    pub sensitive: bool,
    /// Declared default, substituted when the field is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human-readable label for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FieldSpec {
    /// Create a field spec with the given id and type.
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            required: false,
            domain: Vec::new(),
            sensitive: false,
            default: None,
            label: None,
        }
    }

    /// Builder: mark required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder: mark sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Builder: set the enum domain.
    pub fn with_domain(mut self, domain: &[&str]) -> Self {
        self.domain = domain.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Builder: set the declared default.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Builder: set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label if declared, field id otherwise.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_admission() {
        assert!(FieldType::Number.admits(&Value::Number(1.0)));
        assert!(!FieldType::Number.admits(&Value::Str("1".into())));
        assert!(FieldType::Enum.admits(&Value::Str("open".into())));
        assert!(!FieldType::Bool.admits(&Value::Number(0.0)));
    }

    #[test]
    fn builder() {
        let f = FieldSpec::new("status", FieldType::Enum)
            .required()
            .with_domain(&["open", "closed"])
            .with_label("Case status");
        assert!(f.required);
        assert_eq!(f.domain, vec!["open", "closed"]);
        assert_eq!(f.display_name(), "Case status");
        assert!(!f.sensitive);
    }
}
