/*!
 * End-to-end pipeline scenarios.
 *
 * Each case drives the full pipeline (parse -> normalize -> predicate) over
 * a small fixed record set and asserts exactly which records match. The
 * record set deliberately exercises nested sequences (ingredients), primitive
 * sequences (tags), and an empty sequence (water has no ingredients).
 */

use record_query::{
    build_predicate, normalize, parse, EvaluationOptions, NormalizeOptions, Predicate,
};
use rstest::rstest;
use serde_json::json;

fn drinks() -> Vec<serde_json::Value> {
    vec![
        json!({
            "id": 1, "name": "gin", "brand": "Boodles", "category": "Spirits", "year": 1954,
            "ingredients": [{"name": "juniper", "alcohol_content": 40}],
            "tags": ["gin", "citrus"]
        }),
        json!({
            "id": 2, "name": "rum", "brand": "Bacardi", "category": "Spirits", "year": 2000,
            "ingredients": [{"name": "sugar", "alcohol_content": 37}],
            "tags": ["rum"]
        }),
        json!({
            "id": 3, "name": "water", "brand": "Evian", "category": "Drink", "year": 2020,
            "ingredients": [],
            "tags": ["water"]
        }),
    ]
}

fn predicate(query: &str) -> Predicate {
    predicate_with(query, EvaluationOptions::default())
}

fn predicate_with(query: &str, options: EvaluationOptions) -> Predicate {
    let (expr, _tokens) = parse(query).unwrap_or_else(|e| panic!("parse '{query}': {e}"));
    let tree = normalize(&expr, &NormalizeOptions::default())
        .unwrap_or_else(|e| panic!("normalize '{query}': {e}"));
    build_predicate(tree, options)
}

fn matching_ids(query: &str) -> Vec<u64> {
    let predicate = predicate(query);
    drinks()
        .iter()
        .filter(|record| {
            predicate
                .matches(*record)
                .unwrap_or_else(|e| panic!("evaluate '{query}': {e}"))
        })
        .map(|record| record["id"].as_u64().expect("numeric id"))
        .collect()
}

#[rstest]
#[case::shorthand_and_comparison(r#"category: "Spirits" AND year > 1990"#, &[2])]
#[case::array_shorthand(r#"ingredients.alcohol_content > 38"#, &[1])]
#[case::negated_quantifier(r#"NOT any(ingredients, name: "juniper")"#, &[2, 3])]
#[case::grouping_and_negation(
    r#"(category: "Spirits" AND year > 1990) OR NOT (name: "water")"#,
    &[1, 2]
)]
#[case::primitive_sequence(r#"any(tags, value: "gin") AND NOT any(tags, value: "water")"#, &[1])]
#[case::all_requires_witnesses(r#"all(ingredients, alcohol_content >= 0)"#, &[1, 2])]
fn test_scenarios(#[case] query: &str, #[case] expected: &[u64]) {
    assert_eq!(
        matching_ids(query),
        expected,
        "query '{query}' matched the wrong records"
    );
}

#[test]
fn test_all_fails_on_empty_sequence_specifically() {
    // Water carries an empty ingredients sequence; universality over an
    // empty universe is false, so id 3 must not match even though no
    // element violates the predicate.
    let ids = matching_ids(r#"all(ingredients, alcohol_content >= 0)"#);
    assert!(!ids.contains(&3));
}

#[test]
fn test_value_list_over_nested_path() {
    assert_eq!(
        matching_ids(r#"ingredients.alcohol_content: (>5, <=40)"#),
        vec![1, 2]
    );
    assert_eq!(
        matching_ids(r#"ingredients.alcohol_content: (>38, <=40)"#),
        vec![1]
    );
}

#[test]
fn test_folding_options_match_accented_and_cased_forms() {
    let options = EvaluationOptions::default()
        .with_ignore_case(true)
        .with_fold_diacritics(true);
    let folded = predicate_with(r#"name: "cafe""#, options);

    assert!(folded.matches(&json!({"name": "Café au lait"})).unwrap());
    assert!(folded.matches(&json!({"name": "CAFETERIA"})).unwrap());
    assert!(!folded.matches(&json!({"name": "tea"})).unwrap());

    // Without the options neither form matches.
    let plain = predicate(r#"name: "cafe""#);
    assert!(!plain.matches(&json!({"name": "Café au lait"})).unwrap());
    assert!(!plain.matches(&json!({"name": "CAFETERIA"})).unwrap());
}

#[test]
fn test_predicate_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}

    let predicate = predicate(r#"year > 1990"#);
    assert_send_sync(&predicate);

    let records = drinks();
    std::thread::scope(|scope| {
        for record in &records {
            let predicate = &predicate;
            scope.spawn(move || {
                let _ = predicate.matches(record).unwrap();
            });
        }
    });
}

#[tracing_test::traced_test]
#[test]
fn test_pipeline_emits_stage_trace_events() {
    // Each stage announces itself with a tagged trace event; none of them
    // log the errors they return.
    let ids = matching_ids(r#"category: "Spirits" AND year > 1990"#);
    assert_eq!(ids, vec![2]);

    assert!(logs_contain("[LEX]"));
    assert!(logs_contain("[PARSE]"));
    assert!(logs_contain("[NORMALIZE]"));
    assert!(logs_contain("[EVAL]"));
}

#[test]
fn test_case_insensitive_keywords_parse_identically() {
    assert_eq!(
        matching_ids(r#"category: "Spirits" and year > 1990"#),
        matching_ids(r#"category: "Spirits" AND year > 1990"#),
    );
    assert_eq!(
        matching_ids(r#"not ANY(ingredients, name: "juniper")"#),
        matching_ids(r#"NOT any(ingredients, name: "juniper")"#),
    );
}
