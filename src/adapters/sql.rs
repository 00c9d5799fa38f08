//! Reference translator emitting a SQL `WHERE` clause
//!
//! Maps the canonical tree onto a flat-table layout: single-segment leaf
//! paths become columns of the configured table, and each quantified path
//! becomes a child table named `{parent}_{path}` probed with `EXISTS` /
//! `NOT EXISTS`. Inside a quantifier predicate the reserved `value` path
//! reads a child-table column literally named `value`.
//!
//! Documented discrepancies from the in-process evaluator:
//!
//! * case-insensitivity is approximated with `LOWER(...)` on both sides,
//!   which ignores locale-specific mappings and diacritic folding;
//! * the `all` quantifier is not translated and raises
//!   `E_ADAPTER_UNSUPPORTED_FEATURE`;
//! * string ordering uses the database collation, not byte order.

use crate::errors::TranslatorError;
use crate::models::{CanonicalNode, ComparisonOp, FieldPath, Literal, Quantifier, TextOp};

const TARGET: &str = "sql";

/// Translate canonical trees into SQL `WHERE` clauses for one root table.
#[derive(Debug, Clone)]
pub struct SqlTranslator {
    table: String,
    ignore_case: bool,
}

impl SqlTranslator {
    pub fn new<S: Into<String>>(table: S) -> Self {
        Self {
            table: table.into(),
            ignore_case: false,
        }
    }

    /// Approximate case-insensitive text matching with `LOWER(...)`.
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Render `node` as a SQL boolean expression over the root table.
    pub fn translate(&self, node: &CanonicalNode) -> Result<String, TranslatorError> {
        self.render(node, &self.table)
    }

    fn render(&self, node: &CanonicalNode, table: &str) -> Result<String, TranslatorError> {
        match node {
            CanonicalNode::And { children } => self.render_connective(children, "AND", table),
            CanonicalNode::Or { children } => self.render_connective(children, "OR", table),
            CanonicalNode::Not { child } => {
                Ok(format!("NOT ({})", self.render(child, table)?))
            }
            CanonicalNode::Comparison { path, op, value } => {
                self.render_comparison(path, *op, value, table)
            }
            CanonicalNode::Text { path, op, value } => self.render_text(path, *op, value, table),
            CanonicalNode::Quantified {
                quantifier,
                path,
                predicate,
            } => self.render_quantified(*quantifier, path, predicate, table),
        }
    }

    fn render_connective(
        &self,
        children: &[CanonicalNode],
        keyword: &str,
        table: &str,
    ) -> Result<String, TranslatorError> {
        let rendered = children
            .iter()
            .map(|child| self.render(child, table))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", rendered.join(&format!(" {keyword} "))))
    }

    fn render_comparison(
        &self,
        path: &FieldPath,
        op: ComparisonOp,
        value: &Literal,
        table: &str,
    ) -> Result<String, TranslatorError> {
        let column = self.column(path, table)?;
        match value {
            Literal::Null => match op {
                ComparisonOp::Eq => Ok(format!("{column} IS NULL")),
                ComparisonOp::Neq => Ok(format!("{column} IS NOT NULL")),
                _ => Err(TranslatorError::generic(format!(
                    "cannot order column '{column}' against null"
                ))),
            },
            Literal::Str(s) => Ok(format!("{column} {} {}", sql_op(op), quote_str(s))),
            Literal::Num(n) => Ok(format!("{column} {} {n}", sql_op(op))),
            Literal::Bool(b) => {
                let rendered = if *b { "TRUE" } else { "FALSE" };
                match op {
                    ComparisonOp::Eq | ComparisonOp::Neq => {
                        Ok(format!("{column} {} {rendered}", sql_op(op)))
                    }
                    _ => Err(TranslatorError::generic(format!(
                        "cannot order column '{column}' against a boolean"
                    ))),
                }
            }
        }
    }

    fn render_text(
        &self,
        path: &FieldPath,
        op: TextOp,
        value: &str,
        table: &str,
    ) -> Result<String, TranslatorError> {
        let column = self.column(path, table)?;
        let escaped = escape_like(value);
        let pattern = match op {
            TextOp::Contains => format!("%{escaped}%"),
            TextOp::StartsWith => format!("{escaped}%"),
            TextOp::EndsWith => format!("%{escaped}"),
        };
        let pattern = quote_str(&pattern);
        if self.ignore_case {
            Ok(format!(
                "LOWER({column}) LIKE LOWER({pattern}) ESCAPE '\\'"
            ))
        } else {
            Ok(format!("{column} LIKE {pattern} ESCAPE '\\'"))
        }
    }

    fn render_quantified(
        &self,
        quantifier: Quantifier,
        path: &FieldPath,
        predicate: &CanonicalNode,
        table: &str,
    ) -> Result<String, TranslatorError> {
        let child_table = format!("{table}_{}", path.segments().join("_"));
        let exists = format!(
            "EXISTS (SELECT 1 FROM {} WHERE {})",
            quote_ident(&child_table),
            self.render(predicate, &child_table)?
        );
        match quantifier {
            Quantifier::Any => Ok(exists),
            Quantifier::None => Ok(format!("NOT {exists}")),
            Quantifier::All => Err(TranslatorError::unsupported(TARGET, "all")),
        }
    }

    /// Column reference for a leaf path, which canonical trees keep at a
    /// single segment.
    fn column(&self, path: &FieldPath, table: &str) -> Result<String, TranslatorError> {
        if !path.is_single() {
            return Err(TranslatorError::generic(format!(
                "leaf path '{path}' spans {} segments; expected a lifted canonical tree",
                path.len()
            )));
        }
        Ok(format!(
            "{}.{}",
            quote_ident(table),
            quote_ident(path.head())
        ))
    }
}

fn sql_op(op: ComparisonOp) -> &'static str {
    match op {
        ComparisonOp::Eq => "=",
        ComparisonOp::Neq => "<>",
        ComparisonOp::Gt => ">",
        ComparisonOp::Gte => ">=",
        ComparisonOp::Lt => "<",
        ComparisonOp::Lte => "<=",
    }
}

/// Single-quote a string literal, doubling embedded quotes.
fn quote_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote an identifier unless it is a plain lowercase name.
fn quote_ident(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Escape the LIKE wildcards and the escape character itself.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
