//! Evaluation of canonical trees against in-memory records
//!
//! A [`Predicate`] is built once from a canonical tree plus
//! [`EvaluationOptions`] and then applied to any number of records. It is
//! immutable after construction and freely shareable across threads;
//! applying it never mutates the record or the tree.
//!
//! Records are abstracted behind the [`Record`] trait, so the engine never
//! commits to one in-memory encoding. An implementation for
//! [`serde_json::Value`] is bundled.

use tracing::trace;

use crate::errors::EvaluationError;
use crate::models::{
    CanonicalNode, ComparisonOp, EvaluationOptions, FieldPath, Literal, Quantifier, TextOp,
};
use crate::text;

/// The reserved path head naming the current sequence element inside a
/// quantifier predicate.
const VALUE_SEGMENT: &str = "value";

/// Minimal record interface the evaluator needs: lookup by segment,
/// sequence iteration, and scalar classification/extraction.
///
/// Implementations must be cheap to call; the evaluator performs no caching.
pub trait Record {
    /// Look up a mapping entry. `None` when `self` is not a mapping or has
    /// no such key.
    fn get(&self, segment: &str) -> Option<&Self>;

    /// Borrow the elements when `self` is an ordered sequence.
    fn as_sequence(&self) -> Option<&[Self]>
    where
        Self: Sized;

    fn as_str(&self) -> Option<&str>;

    fn as_number(&self) -> Option<f64>;

    fn as_bool(&self) -> Option<bool>;

    fn is_null(&self) -> bool;

    /// Type name used in error messages (`string`, `number`, `boolean`,
    /// `null`, `sequence`, `mapping`).
    fn type_name(&self) -> &'static str;
}

impl Record for serde_json::Value {
    fn get(&self, segment: &str) -> Option<&Self> {
        self.as_object()?.get(segment)
    }

    fn as_sequence(&self) -> Option<&[Self]> {
        self.as_array().map(Vec::as_slice)
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        self.as_f64()
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            serde_json::Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, serde_json::Value::Null)
    }

    fn type_name(&self) -> &'static str {
        match self {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "sequence",
            serde_json::Value::Object(_) => "mapping",
        }
    }
}

/// A compiled filter: a canonical tree plus the evaluation options captured
/// at build time.
#[derive(Debug, Clone)]
pub struct Predicate {
    tree: CanonicalNode,
    options: EvaluationOptions,
}

impl Predicate {
    pub fn new(tree: CanonicalNode, options: EvaluationOptions) -> Self {
        trace!("[EVAL] predicate built: root={}", tree.node_kind());
        Self { tree, options }
    }

    /// Apply the predicate to one record.
    pub fn matches<R: Record>(&self, record: &R) -> Result<bool, EvaluationError> {
        eval_node(&self.tree, record, &self.options, false)
    }

    pub fn tree(&self) -> &CanonicalNode {
        &self.tree
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }
}

/// Build a reusable predicate from a canonical tree.
pub fn build_predicate(tree: CanonicalNode, options: EvaluationOptions) -> Predicate {
    Predicate::new(tree, options)
}

/// One-shot evaluation of a canonical tree against a single record.
pub fn evaluate<R: Record>(
    tree: &CanonicalNode,
    record: &R,
    options: &EvaluationOptions,
) -> Result<bool, EvaluationError> {
    eval_node(tree, record, options, false)
}

fn eval_node<R: Record>(
    node: &CanonicalNode,
    record: &R,
    options: &EvaluationOptions,
    in_element: bool,
) -> Result<bool, EvaluationError> {
    match node {
        CanonicalNode::And { children } => {
            for child in children {
                if !eval_node(child, record, options, in_element)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        CanonicalNode::Or { children } => {
            for child in children {
                if eval_node(child, record, options, in_element)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        CanonicalNode::Not { child } => Ok(!eval_node(child, record, options, in_element)?),
        CanonicalNode::Comparison { path, op, value } => {
            let left = resolve(record, path, in_element);
            eval_comparison(left, *op, value)
        }
        CanonicalNode::Text { path, op, value } => {
            let left = resolve(record, path, in_element);
            Ok(eval_text(left, *op, value, options))
        }
        CanonicalNode::Quantified {
            quantifier,
            path,
            predicate,
        } => eval_quantified(*quantifier, path, predicate, record, options, in_element),
    }
}

/// Walk `path` through `record`. Returns `None` as soon as a step hits a
/// null or absent value; a present null leaf also resolves to `None`.
///
/// Inside a quantifier predicate the reserved head `value` names the
/// current element itself, letting predicates reach into sequences of
/// primitives.
fn resolve<'r, R: Record>(record: &'r R, path: &FieldPath, in_element: bool) -> Option<&'r R> {
    let mut segments = path.segments().iter();
    if in_element && path.head() == VALUE_SEGMENT {
        segments.next();
    }

    let mut current = record;
    for segment in segments {
        if current.is_null() {
            return None;
        }
        current = current.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn eval_comparison<R: Record>(
    left: Option<&R>,
    op: ComparisonOp,
    value: &Literal,
) -> Result<bool, EvaluationError> {
    match op {
        ComparisonOp::Eq => Ok(literal_eq(left, value)),
        ComparisonOp::Neq => Ok(!literal_eq(left, value)),
        ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte => {
            // Ordering is defined only for number/number and string/string.
            if let (Some(l), Literal::Num(r)) = (left.and_then(Record::as_number), value) {
                return Ok(compare_ordered(&l, r, op));
            }
            if let (Some(l), Literal::Str(r)) = (left.and_then(Record::as_str), value) {
                return Ok(compare_ordered(&l, &r.as_str(), op));
            }
            Err(EvaluationError::TypeMismatch {
                operator: op.to_string(),
                left: left.map_or("null", Record::type_name),
                right: value.type_name(),
            })
        }
    }
}

/// Ordering on two operands of the same type. IEEE semantics apply to
/// numbers: every ordering against NaN is false.
fn compare_ordered<T: PartialOrd + ?Sized>(left: &T, right: &T, op: ComparisonOp) -> bool {
    match op {
        ComparisonOp::Gt => left > right,
        ComparisonOp::Gte => left >= right,
        ComparisonOp::Lt => left < right,
        ComparisonOp::Lte => left <= right,
        ComparisonOp::Eq | ComparisonOp::Neq => unreachable!("equality handled separately"),
    }
}

/// Strict equality: both null, or both non-null, same type and equal.
/// `NaN` never compares equal to anything, itself included.
fn literal_eq<R: Record>(left: Option<&R>, value: &Literal) -> bool {
    match (left, value) {
        (None, Literal::Null) => true,
        (None, _) => false,
        // `resolve` never returns a null value, so a present left operand
        // is non-null here.
        (Some(_), Literal::Null) => false,
        (Some(v), Literal::Str(s)) => v.as_str() == Some(s.as_str()),
        (Some(v), Literal::Num(n)) => v.as_number().is_some_and(|x| x == *n),
        (Some(v), Literal::Bool(b)) => v.as_bool() == Some(*b),
    }
}

/// Text matching over the pre-processed forms. A non-string (or absent)
/// left value is simply no match, never an error.
fn eval_text<R: Record>(
    left: Option<&R>,
    op: TextOp,
    needle: &str,
    options: &EvaluationOptions,
) -> bool {
    let Some(haystack) = left.and_then(Record::as_str) else {
        return false;
    };
    let haystack = text::preprocess(haystack, options);
    let needle = text::preprocess(needle, options);
    match op {
        TextOp::Contains => haystack.contains(needle.as_ref()),
        TextOp::StartsWith => haystack.starts_with(needle.as_ref()),
        TextOp::EndsWith => haystack.ends_with(needle.as_ref()),
    }
}

fn eval_quantified<R: Record>(
    quantifier: Quantifier,
    path: &FieldPath,
    predicate: &CanonicalNode,
    record: &R,
    options: &EvaluationOptions,
    in_element: bool,
) -> Result<bool, EvaluationError> {
    let source = resolve(record, path, in_element);

    match source {
        // Null/absent is the empty sequence: any=false, all=false, none=true.
        None => Ok(matches!(quantifier, Quantifier::None)),
        Some(value) => match value.as_sequence() {
            Some(elements) => quantify(quantifier, elements.iter(), predicate, options),
            // A single value acts as a one-element sequence.
            None => quantify(quantifier, std::iter::once(value), predicate, options),
        },
    }
}

fn quantify<'r, R: Record + 'r>(
    quantifier: Quantifier,
    elements: impl Iterator<Item = &'r R>,
    predicate: &CanonicalNode,
    options: &EvaluationOptions,
) -> Result<bool, EvaluationError> {
    match quantifier {
        Quantifier::Any => {
            for element in elements {
                if eval_node(predicate, element, options, true)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Quantifier::All => {
            let mut non_empty = false;
            for element in elements {
                non_empty = true;
                if !eval_node(predicate, element, options, true)? {
                    return Ok(false);
                }
            }
            // An empty universe does not witness universality.
            Ok(non_empty)
        }
        Quantifier::None => {
            for element in elements {
                if eval_node(predicate, element, options, true)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}
