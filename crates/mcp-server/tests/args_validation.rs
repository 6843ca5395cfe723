//! Argument validation: invalid inputs never reach `execute` or the driver,
//! and the error text names the offending path.

mod support;

use serde_json::json;

use support::{harness_with, is_error, result_text, test_config, FakeProvider};

#[tokio::test]
async fn unknown_top_level_argument_is_rejected_before_any_driver_call() {
    let h = harness_with(test_config(), FakeProvider::new());
    let result = h
        .call(
            "find",
            json!({"database": "db", "collection": "c", "nonsense": 1}),
        )
        .await;
    assert!(is_error(&result));
    let text = result_text(&result);
    assert!(text.contains("Error running find"), "{text}");
    assert!(text.contains("nonsense"), "{text}");
    assert!(h.provider.recorded_calls().is_empty());
}

#[tokio::test]
async fn missing_required_argument_names_the_field() {
    let h = harness_with(test_config(), FakeProvider::new());
    let result = h.call("find", json!({"database": "db"})).await;
    assert!(is_error(&result));
    let text = result_text(&result);
    assert!(text.contains("collection"), "{text}");
    assert!(text.contains("InvalidArguments"), "{text}");
    assert!(h.provider.recorded_calls().is_empty());
}

#[tokio::test]
async fn type_mismatches_are_invalid_arguments() {
    let h = harness_with(test_config(), FakeProvider::new());
    let result = h
        .call(
            "shortest_path",
            json!({
                "database": "db",
                "collection": "roads",
                "startJunction": "not-a-number",
                "endJunction": 4,
            }),
        )
        .await;
    assert!(is_error(&result));
    assert!(result_text(&result).contains("InvalidArguments"));
    assert!(h.provider.recorded_calls().is_empty());
}

#[tokio::test]
async fn insert_many_requires_documents() {
    let h = harness_with(test_config(), FakeProvider::new());
    let result = h
        .call(
            "insert-many",
            json!({"database": "db", "collection": "c", "documents": []}),
        )
        .await;
    assert!(is_error(&result));
    assert!(result_text(&result).contains("at least one document"));
    assert!(h.provider.recorded_calls().is_empty());
}

#[tokio::test]
async fn empty_arguments_object_is_fine_for_parameterless_tools() {
    let h = harness_with(test_config(), FakeProvider::new());
    let result = h.call("list-databases", json!({})).await;
    assert!(!is_error(&result), "{}", result_text(&result));
}
