//! Error handling for the query engine
//!
//! Every stage failure is surfaced as a typed error carrying a stable,
//! machine-readable code. Callers match on the code for machine-driven
//! handling and on the error kind for grouped handling. The library never
//! logs the errors it returns and never substitutes sentinel values.

pub mod types;

pub use types::{
    ErrorCode, EvaluationError, NormalizeError, ParseError, QueryError, TranslatorError,
};
