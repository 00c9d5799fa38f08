//! Normalization of surface trees into canonical trees
//!
//! A pure, bottom-up rewrite: children are normalized before their parents,
//! and every shorthand the surface syntax offers is expanded into the small
//! canonical vocabulary (`and`/`or`/`not`, comparisons, text matches,
//! quantifiers). Two surface trees that denote the same boolean function up
//! to these rules normalize to structurally equal canonical trees.
//!
//! The passes, in the order they apply to any given node:
//!
//! * shorthand expansion — `path: "s"` becomes a `contains` text match,
//!   `path: 42` an equality, `path: >10` an ordering comparison;
//! * value-list expansion — each item becomes its own leaf, combined with
//!   the default combinator (OR for literals, AND for comparisons) or the
//!   explicit one the author wrote;
//! * bare-path truthiness — a path in boolean position becomes `path != null`;
//! * array-shorthand lifting — every emitted comparison/text leaf with a
//!   multi-segment path is wrapped into nested `any` quantifiers, one per
//!   leading segment;
//! * negation push-down — double negation is removed, comparisons are
//!   inverted (before De Morgan, so no comparison ever stays under a `not`),
//!   De Morgan distributes over `and`/`or`, quantifiers dualize
//!   (`any`↔`none`, `all` becomes `any` of the negated predicate); only a
//!   negated text match keeps its `not` node;
//! * flattening — `and` never directly contains `and` (same for `or`), and
//!   single-child connectives collapse to the child.

use tracing::trace;

use crate::errors::NormalizeError;
use crate::models::{
    CanonicalNode, Expr, FieldPath, Literal, LogicalOp, NormalizeOptions, Quantifier,
    ShorthandRhs, TextOp, ValueListItem,
};

/// Normalize a surface tree into a canonical tree.
///
/// The input is never mutated; the canonical tree is fresh, immutable
/// structure.
pub fn normalize(expr: &Expr, options: &NormalizeOptions) -> Result<CanonicalNode, NormalizeError> {
    let node = normalize_expr(expr, options)?;
    trace!(
        "[NORMALIZE] {} root -> {} root",
        expr.node_kind(),
        node.node_kind()
    );
    Ok(node)
}

fn normalize_expr(expr: &Expr, options: &NormalizeOptions) -> Result<CanonicalNode, NormalizeError> {
    match expr {
        Expr::Group { expr } => normalize_expr(expr, options),

        // A bare path in boolean position asks "is there a value here".
        Expr::Path { path } => Ok(lift_array_shorthand(CanonicalNode::Comparison {
            path: path.clone(),
            op: crate::models::ComparisonOp::Neq,
            value: Literal::Null,
        })),

        Expr::Literal { .. } => Err(NormalizeError::generic("literal truthiness not defined")),

        Expr::Logical { op, left, right } => {
            let left = normalize_expr(left, options)?;
            let right = normalize_expr(right, options)?;
            Ok(combine(*op, vec![left, right]))
        }

        Expr::Not { expr } => {
            let inner = normalize_expr(expr, options)?;
            Ok(negate(inner))
        }

        Expr::Comparison { path, op, value } => Ok(lift_array_shorthand(CanonicalNode::Comparison {
            path: path.clone(),
            op: *op,
            value: value.clone(),
        })),

        Expr::Shorthand { path, rhs } => expand_shorthand(path, rhs, options),

        Expr::Call { name, args } => normalize_call(*name, args, options),
    }
}

// ── Shorthand and value-list expansion ─────────────────────────────────

fn expand_shorthand(
    path: &FieldPath,
    rhs: &ShorthandRhs,
    _options: &NormalizeOptions,
) -> Result<CanonicalNode, NormalizeError> {
    match rhs {
        ShorthandRhs::Literal { value } => literal_leaf(path, value),
        ShorthandRhs::Comparison { op, value } => {
            Ok(lift_array_shorthand(CanonicalNode::Comparison {
                path: path.clone(),
                op: op.comparison(),
                value: value.clone(),
            }))
        }
        ShorthandRhs::ValueList { items, combinator } => {
            expand_value_list(path, items, *combinator)
        }
    }
}

/// The single-literal shorthand: strings mean `contains`, numbers mean
/// equality, booleans and null have no defined meaning.
fn literal_leaf(path: &FieldPath, value: &Literal) -> Result<CanonicalNode, NormalizeError> {
    match value {
        Literal::Str(s) => Ok(lift_array_shorthand(CanonicalNode::Text {
            path: path.clone(),
            op: TextOp::Contains,
            value: s.clone(),
        })),
        Literal::Num(n) => Ok(lift_array_shorthand(CanonicalNode::Comparison {
            path: path.clone(),
            op: crate::models::ComparisonOp::Eq,
            value: Literal::Num(*n),
        })),
        Literal::Bool(_) | Literal::Null => Err(NormalizeError::unsupported(
            "shorthand",
            format!("{} shorthand values have no defined meaning", value.type_name()),
        )),
    }
}

fn expand_value_list(
    path: &FieldPath,
    items: &[ValueListItem],
    combinator: Option<LogicalOp>,
) -> Result<CanonicalNode, NormalizeError> {
    if items.is_empty() {
        // The grammar rejects empty lists; kept for hand-built trees.
        return Err(NormalizeError::generic("value list must not be empty"));
    }

    let has_literals = items
        .iter()
        .any(|item| matches!(item, ValueListItem::Literal { .. }));
    let has_comparisons = items
        .iter()
        .any(|item| matches!(item, ValueListItem::Comparison { .. }));
    if has_literals && has_comparisons {
        return Err(NormalizeError::unsupported("value_list", "mixed types"));
    }

    if has_literals {
        // Literal lists enumerate alternatives, so they default to OR.
        let children = items
            .iter()
            .map(|item| match item {
                ValueListItem::Literal { value } => literal_leaf(path, value),
                ValueListItem::Comparison { .. } => unreachable!("mixed lists rejected above"),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(combine(combinator.unwrap_or(LogicalOp::Or), children))
    } else {
        // Comparison lists describe a range, so they default to AND.
        let children = items
            .iter()
            .map(|item| match item {
                ValueListItem::Comparison { op, value } => {
                    lift_array_shorthand(CanonicalNode::Comparison {
                        path: path.clone(),
                        op: op.comparison(),
                        value: value.clone(),
                    })
                }
                ValueListItem::Literal { .. } => unreachable!("mixed lists rejected above"),
            })
            .collect();
        Ok(combine(combinator.unwrap_or(LogicalOp::And), children))
    }
}

// ── Function-call normalization ────────────────────────────────────────

fn normalize_call(
    name: crate::models::CallName,
    args: &[Expr],
    options: &NormalizeOptions,
) -> Result<CanonicalNode, NormalizeError> {
    if let Some(op) = name.text_op() {
        return normalize_text_call(op, args, options);
    }

    let quantifier = name
        .quantifier()
        .expect("call names are either text functions or quantifiers");
    let [source, predicate] = args else {
        return Err(NormalizeError::generic(
            "quantifier functions take exactly two arguments",
        ));
    };
    let Some(path) = path_argument(source) else {
        return Err(NormalizeError::unsupported(
            source.node_kind(),
            "quantifier source must be a field path",
        ));
    };
    let predicate = normalize_expr(predicate, options)?;
    Ok(CanonicalNode::Quantified {
        quantifier,
        path: path.clone(),
        predicate: Box::new(predicate),
    })
}

fn normalize_text_call(
    op: TextOp,
    args: &[Expr],
    options: &NormalizeOptions,
) -> Result<CanonicalNode, NormalizeError> {
    match args {
        // One argument: a full-text search over the configured targets.
        [needle] => {
            let Some(needle) = string_argument(needle) else {
                return Err(NormalizeError::generic(
                    "text functions require a string literal as the argument",
                ));
            };
            if options.text_search_targets.is_empty() {
                return Err(NormalizeError::generic(
                    "full-text search targets not configured",
                ));
            }
            let children = options
                .text_search_targets
                .iter()
                .map(|target| {
                    lift_array_shorthand(CanonicalNode::Text {
                        path: target.clone(),
                        op,
                        value: needle.clone(),
                    })
                })
                .collect();
            Ok(combine(LogicalOp::Or, children))
        }
        [source, needle] => {
            let Some(path) = path_argument(source) else {
                return Err(NormalizeError::unsupported(
                    source.node_kind(),
                    "text functions require a field path as the first argument",
                ));
            };
            let Some(needle) = string_argument(needle) else {
                return Err(NormalizeError::generic(
                    "text functions require a string literal as the second argument",
                ));
            };
            Ok(lift_array_shorthand(CanonicalNode::Text {
                path: path.clone(),
                op,
                value: needle,
            }))
        }
        _ => Err(NormalizeError::generic(
            "text functions take one or two arguments",
        )),
    }
}

/// Unwrap grouping and return the argument's path, if it is one.
fn path_argument(expr: &Expr) -> Option<&FieldPath> {
    match expr {
        Expr::Group { expr } => path_argument(expr),
        Expr::Path { path } => Some(path),
        _ => None,
    }
}

/// Unwrap grouping and return the argument's string value, if it is one.
fn string_argument(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Group { expr } => string_argument(expr),
        Expr::Literal {
            value: Literal::Str(s),
        } => Some(s.clone()),
        _ => None,
    }
}

// ── Canonical constructors ─────────────────────────────────────────────

/// Build an n-ary connective, splicing in children of the same kind and
/// collapsing a single child to itself.
fn combine(op: LogicalOp, children: Vec<CanonicalNode>) -> CanonicalNode {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match (op, child) {
            (LogicalOp::And, CanonicalNode::And { children }) => flat.extend(children),
            (LogicalOp::Or, CanonicalNode::Or { children }) => flat.extend(children),
            (_, other) => flat.push(other),
        }
    }
    if flat.len() == 1 {
        return flat.pop().expect("exactly one child");
    }
    match op {
        LogicalOp::And => CanonicalNode::And { children: flat },
        LogicalOp::Or => CanonicalNode::Or { children: flat },
    }
}

/// Push a negation down into `node`, returning its logical complement.
///
/// Comparison inversion fires before De Morgan, so no comparison ever ends
/// up under a `not`. Only a text match keeps an explicit `not` wrapper.
fn negate(node: CanonicalNode) -> CanonicalNode {
    match node {
        CanonicalNode::Not { child } => *child,
        CanonicalNode::And { children } => combine(
            LogicalOp::Or,
            children.into_iter().map(negate).collect(),
        ),
        CanonicalNode::Or { children } => combine(
            LogicalOp::And,
            children.into_iter().map(negate).collect(),
        ),
        CanonicalNode::Comparison { path, op, value } => CanonicalNode::Comparison {
            path,
            op: op.inverse(),
            value,
        },
        CanonicalNode::Quantified {
            quantifier,
            path,
            predicate,
        } => match quantifier {
            Quantifier::Any => CanonicalNode::Quantified {
                quantifier: Quantifier::None,
                path,
                predicate,
            },
            Quantifier::None => CanonicalNode::Quantified {
                quantifier: Quantifier::Any,
                path,
                predicate,
            },
            Quantifier::All => CanonicalNode::Quantified {
                quantifier: Quantifier::Any,
                path,
                predicate: Box::new(negate(*predicate)),
            },
        },
        text @ CanonicalNode::Text { .. } => CanonicalNode::Not {
            child: Box::new(text),
        },
    }
}

/// Lift a comparison/text leaf with a multi-segment path into nested
/// `any` quantifiers, one layer per leading segment. Called at every place
/// a leaf is emitted; other node kinds pass through untouched.
fn lift_array_shorthand(node: CanonicalNode) -> CanonicalNode {
    match node {
        CanonicalNode::Comparison { path, op, value } if !path.is_single() => {
            let (head, rest) = path.split_first();
            let head = FieldPath::single(head);
            let rest = rest.expect("multi-segment path has a tail");
            CanonicalNode::Quantified {
                quantifier: Quantifier::Any,
                path: head,
                predicate: Box::new(lift_array_shorthand(CanonicalNode::Comparison {
                    path: rest,
                    op,
                    value,
                })),
            }
        }
        CanonicalNode::Text { path, op, value } if !path.is_single() => {
            let (head, rest) = path.split_first();
            let head = FieldPath::single(head);
            let rest = rest.expect("multi-segment path has a tail");
            CanonicalNode::Quantified {
                quantifier: Quantifier::Any,
                path: head,
                predicate: Box::new(lift_array_shorthand(CanonicalNode::Text {
                    path: rest,
                    op,
                    value,
                })),
            }
        }
        other => other,
    }
}
