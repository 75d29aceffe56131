//! Core data model for the quill document-generation engine.
//!
//! A *pack* is the complete, read-only set of configuration tables for one
//! document template: the field contract, derived-field formulas, decision
//! points with their ordered rule lists, and the selectable text/table
//! variants with provenance pointers. This crate defines those tables and
//! the controlled condition/expression grammar they share; static
//! validation lives in `quill-verify` and evaluation in `quill-engine`.
//!
//! # Example
//!
//! ```rust
//! use quill_core::condition::{CompareOp, Condition};
//! use quill_core::field::{FieldSpec, FieldType};
//! use quill_core::pack::{DecisionPoint, Pack, Rule, Variant};
//!
//! let pack = Pack::new("pt_review")
//!     .with_field(FieldSpec::new("amount", FieldType::Number).required())
//!     .with_variant(Variant::text("zero", "Nothing due.").with_source_block("blk_1"))
//!     .with_variant(Variant::text("nonzero", "Amount due.").with_source_block("blk_2"))
//!     .with_decision(
//!         DecisionPoint::new("amount_section")
//!             .with_rule(Rule::new(
//!                 "r_zero",
//!                 Condition::compare(CompareOp::Equals, "amount", 0i64),
//!                 "zero",
//!             ))
//!             .with_default("nonzero"),
//!     );
//!
//! assert_eq!(pack.rules().count(), 1);
//! ```

pub mod condition;
pub mod contract;
pub mod expr;
pub mod field;
pub mod hash;
pub mod pack;
pub mod value;

pub use condition::{CompareOp, Condition, MAX_CONDITION_DEPTH};
pub use contract::{ContractViolation, FieldContract};
pub use expr::{ArithOp, Expr};
pub use field::{FieldSpec, FieldType};
pub use pack::{DecisionPoint, DerivedField, Pack, Rule, Variant, VariantKind};
pub use value::Value;
