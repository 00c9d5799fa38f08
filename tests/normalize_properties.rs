/*!
 * Property suite for the pipeline's universal guarantees.
 *
 * Generated surface trees cover the whole shorthand surface (paths,
 * comparisons, colon shorthands, value lists, calls, grouping, negation);
 * generated records share the same small field alphabet so that
 * evaluations actually reach the interesting branches instead of resolving
 * everything to absent.
 */

use proptest::prelude::*;
use record_query::{
    evaluate, normalize, parse, text, CanonicalNode, ComparisonOp, EvaluationOptions, Expr,
    FieldPath, Literal, LogicalOp, NormalizeOptions, OrderingOp,
};
use record_query::models::{CallName, ShorthandRhs, ValueListItem};
use serde_json::json;

// ── Strategies ─────────────────────────────────────────────────────────

const FIELDS: &[&str] = &["a", "b", "c", "xs", "tags", "value"];
const STRINGS: &[&str] = &["gin", "rum", "water", "Café", ""];

fn field() -> impl Strategy<Value = String> {
    proptest::sample::select(FIELDS).prop_map(str::to_string)
}

fn path() -> impl Strategy<Value = FieldPath> {
    proptest::collection::vec(field(), 1..=3).prop_map(FieldPath::new)
}

fn string_value() -> impl Strategy<Value = String> {
    proptest::sample::select(STRINGS).prop_map(str::to_string)
}

fn comparable_literal() -> impl Strategy<Value = Literal> {
    prop_oneof![
        (-50i64..50).prop_map(|n| Literal::Num(n as f64)),
        string_value().prop_map(Literal::Str),
    ]
}

fn any_literal() -> impl Strategy<Value = Literal> {
    prop_oneof![
        comparable_literal(),
        Just(Literal::Null),
        any::<bool>().prop_map(Literal::Bool),
    ]
}

fn comparison_op() -> impl Strategy<Value = ComparisonOp> {
    proptest::sample::select(vec![
        ComparisonOp::Eq,
        ComparisonOp::Neq,
        ComparisonOp::Gt,
        ComparisonOp::Gte,
        ComparisonOp::Lt,
        ComparisonOp::Lte,
    ])
}

fn ordering_op() -> impl Strategy<Value = OrderingOp> {
    proptest::sample::select(vec![
        OrderingOp::Gt,
        OrderingOp::Gte,
        OrderingOp::Lt,
        OrderingOp::Lte,
    ])
}

/// Leaves that always normalize successfully.
fn leaf_expr() -> impl Strategy<Value = Expr> {
    prop_oneof![
        path().prop_map(|path| Expr::Path { path }),
        (path(), comparison_op(), any_literal()).prop_map(|(path, op, value)| {
            Expr::Comparison { path, op, value }
        }),
        (path(), string_value()).prop_map(|(path, s)| Expr::Shorthand {
            path,
            rhs: ShorthandRhs::Literal {
                value: Literal::Str(s),
            },
        }),
        (path(), -50i64..50).prop_map(|(path, n)| Expr::Shorthand {
            path,
            rhs: ShorthandRhs::Literal {
                value: Literal::Num(n as f64),
            },
        }),
        (path(), ordering_op(), comparable_literal()).prop_map(|(path, op, value)| {
            Expr::Shorthand {
                path,
                rhs: ShorthandRhs::Comparison { op, value },
            }
        }),
        // Uniform string value list, with and without an explicit combinator.
        (
            path(),
            proptest::collection::vec(string_value(), 1..4),
            proptest::option::of(proptest::sample::select(vec![LogicalOp::And, LogicalOp::Or])),
        )
            .prop_map(|(path, items, combinator)| Expr::Shorthand {
                path,
                rhs: ShorthandRhs::ValueList {
                    items: items
                        .into_iter()
                        .map(|s| ValueListItem::Literal {
                            value: Literal::Str(s),
                        })
                        .collect(),
                    combinator,
                },
            }),
        // Uniform comparison value list.
        (
            path(),
            proptest::collection::vec((ordering_op(), -50i64..50), 1..4),
            proptest::option::of(proptest::sample::select(vec![LogicalOp::And, LogicalOp::Or])),
        )
            .prop_map(|(path, items, combinator)| Expr::Shorthand {
                path,
                rhs: ShorthandRhs::ValueList {
                    items: items
                        .into_iter()
                        .map(|(op, n)| ValueListItem::Comparison {
                            op,
                            value: Literal::Num(n as f64),
                        })
                        .collect(),
                    combinator,
                },
            }),
        (path(), string_value()).prop_map(|(p, s)| Expr::Call {
            name: CallName::Contains,
            args: vec![
                Expr::Path { path: p },
                Expr::Literal {
                    value: Literal::Str(s),
                },
            ],
        }),
    ]
}

fn expr() -> impl Strategy<Value = Expr> {
    leaf_expr().prop_recursive(3, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone(), any::<bool>()).prop_map(|(left, right, is_and)| {
                Expr::Logical {
                    op: if is_and { LogicalOp::And } else { LogicalOp::Or },
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }),
            inner.clone().prop_map(|e| Expr::Not { expr: Box::new(e) }),
            inner.clone().prop_map(|e| Expr::Group { expr: Box::new(e) }),
            (
                proptest::sample::select(vec![CallName::Any, CallName::All, CallName::None]),
                path(),
                inner,
            )
                .prop_map(|(name, source, predicate)| Expr::Call {
                    name,
                    args: vec![Expr::Path { path: source }, predicate],
                }),
        ]
    })
}

fn scalar() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        (-50i64..50).prop_map(serde_json::Value::from),
        string_value().prop_map(serde_json::Value::from),
    ]
}

fn flat_object() -> impl Strategy<Value = serde_json::Value> {
    proptest::collection::btree_map(field(), scalar(), 0..4).prop_map(|m| json!(m))
}

fn record() -> impl Strategy<Value = serde_json::Value> {
    let value = prop_oneof![
        scalar(),
        proptest::collection::vec(scalar(), 0..4).prop_map(serde_json::Value::from),
        flat_object(),
        proptest::collection::vec(flat_object(), 0..3).prop_map(serde_json::Value::from),
    ];
    proptest::collection::btree_map(field(), value, 0..5).prop_map(|m| json!(m))
}

// ── Invariant checker ──────────────────────────────────────────────────

fn check_invariants(node: &CanonicalNode) {
    match node {
        CanonicalNode::And { children } | CanonicalNode::Or { children } => {
            assert!(children.len() >= 2, "degenerate connective: {node:?}");
            for child in children {
                assert_ne!(
                    child.node_kind(),
                    node.node_kind(),
                    "unflattened connective: {node:?}"
                );
                check_invariants(child);
            }
        }
        CanonicalNode::Not { child } => {
            assert!(
                matches!(
                    **child,
                    CanonicalNode::Text { .. } | CanonicalNode::Quantified { .. }
                ),
                "negation over a reducible node: {node:?}"
            );
            check_invariants(child);
        }
        CanonicalNode::Comparison { path, .. } | CanonicalNode::Text { path, .. } => {
            assert!(path.is_single(), "unlifted leaf path: {node:?}");
        }
        CanonicalNode::Quantified { predicate, .. } => check_invariants(predicate),
    }
}

// ── Properties ─────────────────────────────────────────────────────────

proptest! {
    /// Every successful normalization satisfies the canonical invariants.
    #[test]
    fn prop_canonical_invariants(e in expr()) {
        if let Ok(tree) = normalize(&e, &NormalizeOptions::default()) {
            check_invariants(&tree);
        }
    }

    /// Rendering a canonical tree and running it back through the pipeline
    /// reproduces the identical tree: normalization has a fixed point.
    #[test]
    fn prop_normalize_idempotent_through_rendering(e in expr()) {
        if let Ok(tree) = normalize(&e, &NormalizeOptions::default()) {
            let rendered = tree.to_string();
            let (reparsed, _tokens) = parse(&rendered)
                .unwrap_or_else(|err| panic!("rendered query '{rendered}' failed to parse: {err}"));
            let renormalized = normalize(&reparsed, &NormalizeOptions::default())
                .unwrap_or_else(|err| panic!("rendered query '{rendered}' failed to normalize: {err}"));
            prop_assert_eq!(renormalized, tree);
        }
    }

    /// A negated tree evaluates to the complement wherever both trees
    /// evaluate at all.
    #[test]
    fn prop_negation_complements(e in expr(), r in record()) {
        let plain = normalize(&e, &NormalizeOptions::default());
        let negated = normalize(
            &Expr::Not { expr: Box::new(e) },
            &NormalizeOptions::default(),
        );
        if let (Ok(plain), Ok(negated)) = (plain, negated) {
            let options = EvaluationOptions::default();
            if let (Ok(a), Ok(b)) = (
                evaluate(&plain, &r, &options),
                evaluate(&negated, &r, &options),
            ) {
                prop_assert_eq!(a, !b, "plain={} negated={}", plain, negated);
            }
        }
    }

    /// `p op v` agrees with `NOT (p inv(op) v)` whenever evaluation is
    /// defined, for every operator pair.
    #[test]
    fn prop_comparison_inversion_agrees(
        seg in field(),
        op in comparison_op(),
        value in comparable_literal(),
        r in record(),
    ) {
        let path = FieldPath::single(seg);
        let direct = CanonicalNode::Comparison {
            path: path.clone(),
            op,
            value: value.clone(),
        };
        let negated_inverse = CanonicalNode::Not {
            child: Box::new(CanonicalNode::Comparison {
                path,
                op: op.inverse(),
                value,
            }),
        };
        let options = EvaluationOptions::default();
        if let (Ok(a), Ok(b)) = (
            evaluate(&direct, &r, &options),
            evaluate(&negated_inverse, &r, &options),
        ) {
            prop_assert_eq!(a, b);
        }
    }

    /// Pre-processing is diacritic-fold first, then case-fold.
    #[test]
    fn prop_text_processing_order(s in "\\PC{0,12}") {
        let options = EvaluationOptions::default()
            .with_ignore_case(true)
            .with_fold_diacritics(true);
        let processed = text::preprocess(&s, &options);
        let composed = text::lowercase(&text::fold_diacritics(&s), None);
        prop_assert_eq!(processed.as_ref(), composed.as_str());
    }
}
