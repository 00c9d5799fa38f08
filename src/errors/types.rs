//! Error type definitions for the query engine
//!
//! This module defines all error types used throughout the pipeline,
//! providing a hierarchical error system with one error kind per stage and a
//! stable machine-readable code per failure class.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable machine-readable error codes.
///
/// The `Display` form of a code is the wire-stable identifier (for example
/// `E_PARSE_UNEXPECTED_TOKEN`); it never changes across releases even when
/// the human-readable message does.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum ErrorCode {
    #[serde(rename = "E_PARSE_UNEXPECTED_TOKEN")]
    #[strum(serialize = "E_PARSE_UNEXPECTED_TOKEN")]
    ParseUnexpectedToken,
    #[serde(rename = "E_PARSE_GENERIC")]
    #[strum(serialize = "E_PARSE_GENERIC")]
    ParseGeneric,
    #[serde(rename = "E_NORMALIZE_UNSUPPORTED_NODE")]
    #[strum(serialize = "E_NORMALIZE_UNSUPPORTED_NODE")]
    NormalizeUnsupportedNode,
    #[serde(rename = "E_NORMALIZE_GENERIC")]
    #[strum(serialize = "E_NORMALIZE_GENERIC")]
    NormalizeGeneric,
    #[serde(rename = "E_EVAL_TYPE_MISMATCH")]
    #[strum(serialize = "E_EVAL_TYPE_MISMATCH")]
    EvalTypeMismatch,
    #[serde(rename = "E_EVAL_GENERIC")]
    #[strum(serialize = "E_EVAL_GENERIC")]
    EvalGeneric,
    #[serde(rename = "E_ADAPTER_UNSUPPORTED_FEATURE")]
    #[strum(serialize = "E_ADAPTER_UNSUPPORTED_FEATURE")]
    AdapterUnsupportedFeature,
    #[serde(rename = "E_ADAPTER_GENERIC")]
    #[strum(serialize = "E_ADAPTER_GENERIC")]
    AdapterGeneric,
}

/// Top-level error type aggregating every pipeline stage.
///
/// Stage entry points return their own error kind; this enum exists so that
/// callers driving the whole pipeline (parse, then normalize, then evaluate)
/// can use a single error type with `?`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Lexing or parsing failures
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Normalization failures
    #[error("Normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Evaluation failures
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// External-translator failures
    #[error("Translator error: {0}")]
    Translator(#[from] TranslatorError),
}

impl QueryError {
    /// The stable code of the underlying stage error.
    pub fn code(&self) -> ErrorCode {
        match self {
            QueryError::Parse(e) => e.code(),
            QueryError::Normalize(e) => e.code(),
            QueryError::Evaluation(e) => e.code(),
            QueryError::Translator(e) => e.code(),
        }
    }
}

/// Lexer and parser errors.
///
/// Both variants pinpoint a 1-based line/column position and the offending
/// lexeme. Only the first mismatch is surfaced; the parser does not attempt
/// recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A character or token the grammar has no rule for at this position
    #[error("Unexpected token '{lexeme}' at {line}:{column}.")]
    UnexpectedToken {
        lexeme: String,
        line: u32,
        column: u32,
    },

    /// A structural mismatch (missing operand, unbalanced parenthesis, bad
    /// call arity, trailing input, ...)
    #[error("{message} at {line}:{column} (near '{lexeme}').")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
        lexeme: String,
    },
}

impl ParseError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::UnexpectedToken { .. } => ErrorCode::ParseUnexpectedToken,
            ParseError::Syntax { .. } => ErrorCode::ParseGeneric,
        }
    }

    /// 1-based line of the offending lexeme.
    pub fn line(&self) -> u32 {
        match self {
            ParseError::UnexpectedToken { line, .. } | ParseError::Syntax { line, .. } => *line,
        }
    }

    /// 1-based column of the offending lexeme.
    pub fn column(&self) -> u32 {
        match self {
            ParseError::UnexpectedToken { column, .. } | ParseError::Syntax { column, .. } => {
                *column
            }
        }
    }

    /// The offending lexeme text.
    pub fn lexeme(&self) -> &str {
        match self {
            ParseError::UnexpectedToken { lexeme, .. } | ParseError::Syntax { lexeme, .. } => {
                lexeme
            }
        }
    }

    /// Create a structural-mismatch error.
    pub fn syntax<S: Into<String>, L: Into<String>>(
        message: S,
        line: u32,
        column: u32,
        lexeme: L,
    ) -> Self {
        ParseError::Syntax {
            message: message.into(),
            line,
            column,
            lexeme: lexeme.into(),
        }
    }
}

/// Normalizer errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// A surface node that has no canonical counterpart in this position
    #[error("Unsupported node '{node}': {reason}.")]
    UnsupportedNode {
        /// Tag of the offending surface node
        node: &'static str,
        reason: String,
    },

    /// Any other normalization failure
    #[error("{message}.")]
    Generic { message: String },
}

impl NormalizeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            NormalizeError::UnsupportedNode { .. } => ErrorCode::NormalizeUnsupportedNode,
            NormalizeError::Generic { .. } => ErrorCode::NormalizeGeneric,
        }
    }

    pub fn unsupported<S: Into<String>>(node: &'static str, reason: S) -> Self {
        NormalizeError::UnsupportedNode {
            node,
            reason: reason.into(),
        }
    }

    pub fn generic<S: Into<String>>(message: S) -> Self {
        NormalizeError::Generic {
            message: message.into(),
        }
    }
}

/// Evaluation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// An ordering comparison over operands that are not both numbers or
    /// both strings
    #[error("Type mismatch for '{operator}': expected number|string, got {left}/{right}.")]
    TypeMismatch {
        /// Canonical operator name (`gt`, `gte`, `lt`, `lte`)
        operator: String,
        /// Type of the record-side operand (`null` when absent)
        left: &'static str,
        /// Type of the literal operand
        right: &'static str,
    },

    /// Any other evaluation failure
    #[error("{message}.")]
    Generic {
        message: String,
        operator: Option<String>,
    },
}

impl EvaluationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EvaluationError::TypeMismatch { .. } => ErrorCode::EvalTypeMismatch,
            EvaluationError::Generic { .. } => ErrorCode::EvalGeneric,
        }
    }

    pub fn generic<S: Into<String>>(message: S) -> Self {
        EvaluationError::Generic {
            message: message.into(),
            operator: None,
        }
    }
}

/// External-translator errors.
///
/// Raised by translators that consume the canonical tree and emit a backend
/// query, for node kinds or operators the target language cannot express.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslatorError {
    /// The canonical tree uses a feature the target cannot express
    #[error("Unsupported feature '{feature}' for target '{target}'.")]
    UnsupportedFeature { target: String, feature: String },

    /// Any other translation failure
    #[error("{message}.")]
    Generic {
        message: String,
        target: Option<String>,
    },
}

impl TranslatorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TranslatorError::UnsupportedFeature { .. } => ErrorCode::AdapterUnsupportedFeature,
            TranslatorError::Generic { .. } => ErrorCode::AdapterGeneric,
        }
    }

    pub fn unsupported<T: Into<String>, F: Into<String>>(target: T, feature: F) -> Self {
        TranslatorError::UnsupportedFeature {
            target: target.into(),
            feature: feature.into(),
        }
    }

    pub fn generic<S: Into<String>>(message: S) -> Self {
        TranslatorError::Generic {
            message: message.into(),
            target: None,
        }
    }
}
