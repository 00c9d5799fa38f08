//! External translators consuming the canonical tree
//!
//! A translator turns a canonical tree into a query for some storage
//! backend instead of evaluating it in-process. Translators rely on the
//! same canonical invariants the evaluator does, and raise
//! [`crate::errors::TranslatorError`] for node kinds or operators their
//! target cannot express. They are not required to reproduce evaluator
//! semantics exactly when the backend differs, but every such discrepancy
//! must be documented on the translator.

pub mod sql;

pub use sql::SqlTranslator;
