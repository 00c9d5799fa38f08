//! record-query: a filter-query engine for structured records
//!
//! A compact, human-oriented filter syntax is parsed into a surface tree,
//! normalized into a canonical backend-independent tree, and then either
//! evaluated in-process against records or handed to a translator that
//! emits a query for a storage backend.
//!
//! ```
//! use record_query::{build_predicate, normalize, parse, EvaluationOptions, NormalizeOptions};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), record_query::QueryError> {
//! let (tree, _tokens) = parse(r#"category: "Spirits" AND year > 1990"#)?;
//! let canonical = normalize(&tree, &NormalizeOptions::default())?;
//! let predicate = build_predicate(canonical, EvaluationOptions::default());
//!
//! assert!(predicate.matches(&json!({"category": "Spirits", "year": 2000}))?);
//! assert!(!predicate.matches(&json!({"category": "Drink", "year": 2020}))?);
//! # Ok(())
//! # }
//! ```
//!
//! Every stage is a pure function: no I/O, no global state, no internal
//! concurrency. Failures carry a stable machine-readable code (see
//! [`ErrorCode`]); the library itself performs no logging beyond `tracing`
//! instrumentation events.

pub mod adapters;
pub mod errors;
pub mod evaluator;
pub mod lexer;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod text;

pub use errors::{
    ErrorCode, EvaluationError, NormalizeError, ParseError, QueryError, TranslatorError,
};
pub use evaluator::{build_predicate, evaluate, Predicate, Record};
pub use lexer::{Token, TokenKind};
pub use models::{
    CanonicalNode, ComparisonOp, EvaluationOptions, Expr, FieldPath, Literal, LogicalOp,
    NormalizeOptions, OrderingOp, Quantifier, TextOp,
};
pub use normalizer::normalize;
pub use parser::parse;

use serde::Serialize;

/// Outcome of [`validate`]: either the canonical tree (serialized for
/// display) or the first error with its kind, code and position.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub error: Option<ValidationIssue>,
    /// Canonical tree as tagged JSON when validation succeeded
    pub canonical_tree: Option<serde_json::Value>,
}

/// One validation failure, flattened for display and API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Failing stage: `parse` or `normalize`
    pub kind: &'static str,
    pub code: ErrorCode,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Run parse + normalize and report the outcome in a structured form.
///
/// Sugar over [`parse`] and [`normalize`] for callers that want a display
/// friendly result (editors, HTTP endpoints) instead of `Result` plumbing.
pub fn validate(input: &str, options: &NormalizeOptions) -> ValidationReport {
    let expr = match parse(input) {
        Ok((expr, _tokens)) => expr,
        Err(err) => {
            return ValidationReport {
                is_valid: false,
                error: Some(ValidationIssue {
                    kind: "parse",
                    code: err.code(),
                    message: err.to_string(),
                    line: Some(err.line()),
                    column: Some(err.column()),
                }),
                canonical_tree: None,
            };
        }
    };

    match normalize(&expr, options) {
        Ok(tree) => ValidationReport {
            is_valid: true,
            error: None,
            canonical_tree: serde_json::to_value(&tree).ok(),
        },
        Err(err) => ValidationReport {
            is_valid: false,
            error: Some(ValidationIssue {
                kind: "normalize",
                code: err.code(),
                message: err.to_string(),
                line: None,
                column: None,
            }),
            canonical_tree: None,
        },
    }
}
