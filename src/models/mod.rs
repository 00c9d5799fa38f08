//! Shared type definitions for the query pipeline
//!
//! Three families of types flow through the engine:
//!
//! * building blocks shared by every stage ([`FieldPath`], [`Literal`] and
//!   the operator enums),
//! * the surface tree ([`Expr`]) produced by the parser, preserving the
//!   author's syntactic choices (shorthands, value lists, grouping),
//! * the canonical tree ([`CanonicalNode`]) produced by the normalizer and
//!   consumed by the evaluator and by external translators.
//!
//! Both trees are closed unions expressed as tagged enums; downstream code
//! pattern-matches on the variant rather than probing node contents. They
//! serialize to tagged JSON so callers can display or persist them.

use std::fmt;

use serde::{Deserialize, Serialize};

// -------------------------------------------------------------------------------------------------
// Paths and literals
// -------------------------------------------------------------------------------------------------

/// An ordered, non-empty sequence of segments naming a location inside a
/// record.
///
/// The first segment is always a plain identifier; later segments may have
/// been written as quoted identifiers (their quotes are stripped during
/// parsing, so a segment holds the bare name either way).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Create a path from its segments. `segments` must be non-empty.
    pub fn new(segments: Vec<String>) -> Self {
        assert!(!segments.is_empty(), "a field path has at least one segment");
        Self { segments }
    }

    /// Create a single-segment path.
    pub fn single<S: Into<String>>(segment: S) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_single(&self) -> bool {
        self.segments.len() == 1
    }

    /// First segment.
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Split into the first segment and the (possibly absent) remainder.
    pub fn split_first(&self) -> (&str, Option<FieldPath>) {
        let rest = if self.segments.len() > 1 {
            Some(FieldPath {
                segments: self.segments[1..].to_vec(),
            })
        } else {
            None
        };
        (&self.segments[0], rest)
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if !is_plain_segment(segment) {
                write_quoted(f, segment)?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}

/// Whether a segment can be rendered without quoting.
fn is_plain_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if crate::lexer::is_reserved_word(segment) {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A literal value as written in the surface syntax.
///
/// Numbers are IEEE-754 doubles; the lexer only produces finite values, and
/// `NaN` never compares equal during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl Literal {
    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Num(_) => "number",
            Literal::Bool(_) => "boolean",
            Literal::Null => "null",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write_quoted(f, s),
            Literal::Num(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// Write a string as a double-quoted literal, re-escaping what the lexer
/// unescapes.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\u{0008}' => f.write_str("\\b")?,
            '\u{000C}' => f.write_str("\\f")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\u{000B}' => f.write_str("\\v")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04X}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

// -------------------------------------------------------------------------------------------------
// Operators
// -------------------------------------------------------------------------------------------------

/// Comparison operators shared by the surface and canonical trees.
///
/// The `Display` form is the canonical short name (`eq`, `gt`, ...) used in
/// error messages and serialized trees; [`ComparisonOp::symbol`] is the
/// surface spelling.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    /// The operator whose result is the logical complement of `self`.
    ///
    /// This is an involution: `op.inverse().inverse() == op`.
    pub fn inverse(self) -> Self {
        match self {
            ComparisonOp::Eq => ComparisonOp::Neq,
            ComparisonOp::Neq => ComparisonOp::Eq,
            ComparisonOp::Gt => ComparisonOp::Lte,
            ComparisonOp::Lte => ComparisonOp::Gt,
            ComparisonOp::Gte => ComparisonOp::Lt,
            ComparisonOp::Lt => ComparisonOp::Gte,
        }
    }

    /// Whether this operator requires ordered operands (numbers or strings).
    pub fn is_ordering(self) -> bool {
        !matches!(self, ComparisonOp::Eq | ComparisonOp::Neq)
    }

    /// The surface spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Neq => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
        }
    }
}

/// The ordering subset of comparison operators, as allowed in a comparison
/// shorthand (`price: >10`) and in value-list items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl OrderingOp {
    /// Widen into the full comparison-operator set.
    pub fn comparison(self) -> ComparisonOp {
        match self {
            OrderingOp::Gt => ComparisonOp::Gt,
            OrderingOp::Gte => ComparisonOp::Gte,
            OrderingOp::Lt => ComparisonOp::Lt,
            OrderingOp::Lte => ComparisonOp::Lte,
        }
    }

    pub fn symbol(self) -> &'static str {
        self.comparison().symbol()
    }
}

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
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogicalOp {
    And,
    Or,
}

/// Text-matching operators. The `Display` form is the surface function name.
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
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

/// Sequence quantifiers.
///
/// `All` over an empty sequence is false: an empty universe does not witness
/// universality. `Any` over an empty sequence is false and `None` is true.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Quantifier {
    Any,
    All,
    None,
}

/// Function names accepted in call syntax.
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
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum CallName {
    Contains,
    StartsWith,
    EndsWith,
    Any,
    All,
    None,
}

impl CallName {
    /// The text operator for text-function names, if this is one.
    pub fn text_op(self) -> Option<TextOp> {
        match self {
            CallName::Contains => Some(TextOp::Contains),
            CallName::StartsWith => Some(TextOp::StartsWith),
            CallName::EndsWith => Some(TextOp::EndsWith),
            _ => None,
        }
    }

    /// The quantifier for quantifier-function names, if this is one.
    pub fn quantifier(self) -> Option<Quantifier> {
        match self {
            CallName::Any => Some(Quantifier::Any),
            CallName::All => Some(Quantifier::All),
            CallName::None => Some(Quantifier::None),
            _ => None,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Surface tree
// -------------------------------------------------------------------------------------------------

/// The surface tree produced by the parser.
///
/// Read-only after construction; the normalizer consumes it by reference and
/// builds a fresh [`CanonicalNode`] tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    /// A bare field path in boolean position (truthy-path form)
    Path { path: FieldPath },
    /// A bare literal (only meaningful inside calls; a normalizer error in
    /// boolean position)
    Literal { value: Literal },
    /// Binary boolean connective, left-associative
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Boolean negation
    Not { expr: Box<Expr> },
    /// Explicit comparison `path op literal`
    Comparison {
        path: FieldPath,
        op: ComparisonOp,
        value: Literal,
    },
    /// Colon shorthand `path: rhs`
    Shorthand { path: FieldPath, rhs: ShorthandRhs },
    /// Function-call syntax (`contains(...)`, `any(...)`, ...)
    Call { name: CallName, args: Vec<Expr> },
    /// Parenthesized expression, preserved so downstream phases see the
    /// author's grouping; normalization drops it
    Group { expr: Box<Expr> },
}

impl Expr {
    /// Tag of this node, used in diagnostics.
    pub fn node_kind(&self) -> &'static str {
        match self {
            Expr::Path { .. } => "path",
            Expr::Literal { .. } => "literal",
            Expr::Logical { .. } => "logical",
            Expr::Not { .. } => "not",
            Expr::Comparison { .. } => "comparison",
            Expr::Shorthand { .. } => "shorthand",
            Expr::Call { .. } => "call",
            Expr::Group { .. } => "group",
        }
    }
}

/// Right-hand side of a colon shorthand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShorthandRhs {
    /// `name: "gin"` / `year: 1954`
    Literal { value: Literal },
    /// `price: >10`
    Comparison { op: OrderingOp, value: Literal },
    /// `tags: ("gin", "rum")` / `price: (>5 AND <=13)`
    ValueList {
        items: Vec<ValueListItem>,
        /// Explicit combinator when the author separated items with
        /// `AND`/`OR` instead of commas
        combinator: Option<LogicalOp>,
    },
}

/// One item of a value list: a literal or a comparison shorthand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueListItem {
    Literal { value: Literal },
    Comparison { op: OrderingOp, value: Literal },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Path { path } => write!(f, "{path}"),
            Expr::Literal { value } => write!(f, "{value}"),
            Expr::Logical { op, left, right } => {
                write_expr_operand(f, left, *op)?;
                write!(f, " {op} ")?;
                write_expr_operand(f, right, *op)
            }
            Expr::Not { expr } => {
                f.write_str("NOT ")?;
                if matches!(**expr, Expr::Logical { .. }) {
                    write!(f, "({expr})")
                } else {
                    write!(f, "{expr}")
                }
            }
            Expr::Comparison { path, op, value } => {
                write!(f, "{path} {} {value}", op.symbol())
            }
            Expr::Shorthand { path, rhs } => write!(f, "{path}: {rhs}"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Group { expr } => write!(f, "({expr})"),
        }
    }
}

/// Parenthesize an operand when it binds looser than its parent connective.
fn write_expr_operand(f: &mut fmt::Formatter<'_>, operand: &Expr, parent: LogicalOp) -> fmt::Result {
    match operand {
        Expr::Logical { op, .. } if parent == LogicalOp::And && *op == LogicalOp::Or => {
            write!(f, "({operand})")
        }
        _ => write!(f, "{operand}"),
    }
}

impl fmt::Display for ShorthandRhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShorthandRhs::Literal { value } => write!(f, "{value}"),
            ShorthandRhs::Comparison { op, value } => write!(f, "{}{value}", op.symbol()),
            ShorthandRhs::ValueList { items, combinator } => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        match combinator {
                            Some(op) => write!(f, " {op} ")?,
                            None => f.write_str(", ")?,
                        }
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for ValueListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueListItem::Literal { value } => write!(f, "{value}"),
            ValueListItem::Comparison { op, value } => write!(f, "{}{value}", op.symbol()),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Canonical tree
// -------------------------------------------------------------------------------------------------

/// The canonical, equivalence-closed tree produced by the normalizer.
///
/// Invariants (established by normalization and relied upon by evaluators
/// and translators):
///
/// * no surface-only construct survives (shorthands, value lists, calls,
///   grouping, bare paths/literals);
/// * every `Comparison` and `Text` path has exactly one segment, deeper
///   paths having been lifted into nested `Quantified(any, ...)` layers;
/// * `And` never directly contains `And`, `Or` never directly contains `Or`,
///   and both always have at least two children;
/// * `Not` never wraps `Not`, `And`, `Or` or `Comparison` (double negation
///   is removed, De Morgan is applied, comparisons are inverted); it may
///   wrap `Text` or `Quantified`.
///
/// The tree is immutable after construction and freely shareable across
/// threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalNode {
    And {
        children: Vec<CanonicalNode>,
    },
    Or {
        children: Vec<CanonicalNode>,
    },
    Not {
        child: Box<CanonicalNode>,
    },
    Comparison {
        path: FieldPath,
        op: ComparisonOp,
        value: Literal,
    },
    Text {
        path: FieldPath,
        op: TextOp,
        value: String,
    },
    Quantified {
        quantifier: Quantifier,
        path: FieldPath,
        predicate: Box<CanonicalNode>,
    },
}

impl CanonicalNode {
    /// Tag of this node, used in diagnostics.
    pub fn node_kind(&self) -> &'static str {
        match self {
            CanonicalNode::And { .. } => "and",
            CanonicalNode::Or { .. } => "or",
            CanonicalNode::Not { .. } => "not",
            CanonicalNode::Comparison { .. } => "comparison",
            CanonicalNode::Text { .. } => "text",
            CanonicalNode::Quantified { .. } => "quantified",
        }
    }
}

impl fmt::Display for CanonicalNode {
    /// Renders the node as surface syntax. Re-parsing and re-normalizing the
    /// rendered text yields a structurally equal tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalNode::And { children } => write_connective(f, "AND", children, self),
            CanonicalNode::Or { children } => write_connective(f, "OR", children, self),
            CanonicalNode::Not { child } => {
                f.write_str("NOT ")?;
                write!(f, "{child}")
            }
            CanonicalNode::Comparison { path, op, value } => {
                write!(f, "{path} {} {value}", op.symbol())
            }
            CanonicalNode::Text { path, op, value } => {
                write!(f, "{op}({path}, ")?;
                write_quoted(f, value)?;
                f.write_str(")")
            }
            CanonicalNode::Quantified {
                quantifier,
                path,
                predicate,
            } => write!(f, "{quantifier}({path}, {predicate})"),
        }
    }
}

fn write_connective(
    f: &mut fmt::Formatter<'_>,
    keyword: &str,
    children: &[CanonicalNode],
    parent: &CanonicalNode,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {keyword} ")?;
        }
        let needs_parens = matches!(
            (parent, child),
            (CanonicalNode::And { .. }, CanonicalNode::Or { .. })
                | (CanonicalNode::Or { .. }, CanonicalNode::And { .. })
        );
        if needs_parens {
            write!(f, "({child})")?;
        } else {
            write!(f, "{child}")?;
        }
    }
    Ok(())
}

// -------------------------------------------------------------------------------------------------
// Options
// -------------------------------------------------------------------------------------------------

/// Options consumed by normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Paths a one-argument text function (`contains("needle")`) expands
    /// over. Empty means full-text calls are rejected.
    pub text_search_targets: Vec<FieldPath>,
}

impl NormalizeOptions {
    pub fn with_text_search_targets(mut self, targets: Vec<FieldPath>) -> Self {
        self.text_search_targets = targets;
        self
    }
}

/// Options captured by a predicate at build time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    /// Lowercase both sides of text matches before comparing
    pub ignore_case: bool,
    /// Strip combining diacritical marks from both sides of text matches
    pub fold_diacritics: bool,
    /// BCP 47-style tag selecting locale-aware lowercasing (`"tr"`,
    /// `"az-Latn"`, ...); absent means locale-independent lowercasing
    pub locale: Option<String>,
}

impl EvaluationOptions {
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_fold_diacritics(mut self, fold_diacritics: bool) -> Self {
        self.fold_diacritics = fold_diacritics;
        self
    }

    pub fn with_locale<S: Into<String>>(mut self, locale: S) -> Self {
        self.locale = Some(locale.into());
        self
    }
}
