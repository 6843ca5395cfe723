//! Dispatcher gating: disabled tools, read-only policy, confirmation,
//! feature gates and telemetry emission.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use bson::doc;
use rmcp::model::JsonObject;
use serde_json::json;

use mongo_mcp_config::PreviewFeature;
use mongo_mcp_server::error::ServerError;
use mongo_mcp_server::registry::ToolRegistry;
use mongo_mcp_server::telemetry::ToolEventResult;
use mongo_mcp_server::tool::{
    schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};
use mongo_mcp_server::tools;

use support::{harness_with, harness_with_registry, is_error, result_text, test_config, FakeProvider};

#[tokio::test]
async fn unknown_tool_is_reported_without_execution() {
    let h = harness_with(test_config(), FakeProvider::new());
    let result = h.call("definitely-not-a-tool", json!({})).await;
    assert!(is_error(&result));
    let text = result_text(&result);
    assert!(text.contains("Error running definitely-not-a-tool"), "{text}");
    assert!(text.contains("ToolNotFound"), "{text}");
    assert!(h.provider.recorded_calls().is_empty());
}

#[tokio::test]
async fn disabled_by_name_category_and_operation_type() {
    for entry in ["delete-many", "mongodb", "delete"] {
        let config = test_config();
        let config = mongo_mcp_config::Config {
            disabled_tools: vec![entry.to_string()],
            ..config
        };
        let h = harness_with(config, FakeProvider::new());
        let result = h
            .call("delete-many", json!({"database": "db", "collection": "c"}))
            .await;
        assert!(is_error(&result), "disabled via '{entry}'");
        assert!(
            result_text(&result).contains("ToolDisabled"),
            "disabled via '{entry}': {}",
            result_text(&result)
        );
        assert!(h.provider.recorded_calls().is_empty());
    }
}

#[tokio::test]
async fn read_only_blocks_write_operation_types() {
    let config = mongo_mcp_config::Config {
        read_only: true,
        ..test_config()
    };
    let h = harness_with(config, FakeProvider::new());

    for (tool, args) in [
        ("insert-many", json!({"database": "db", "collection": "c", "documents": [{"a": 1}]})),
        ("update-many", json!({"database": "db", "collection": "c", "update": {"$set": {"a": 1}}})),
        ("delete-many", json!({"database": "db", "collection": "c"})),
    ] {
        let result = h.call(tool, args).await;
        assert!(is_error(&result), "{tool} must be blocked");
        assert!(
            result_text(&result).contains("ForbiddenWriteOperation"),
            "{tool}: {}",
            result_text(&result)
        );
    }
    // Reads still work.
    let result = h
        .call("find", json!({"database": "db", "collection": "c"}))
        .await;
    assert!(!is_error(&result), "{}", result_text(&result));
    assert!(h
        .provider
        .recorded_calls()
        .iter()
        .all(|call| !call.starts_with("insert") && !call.starts_with("delete")));
}

#[tokio::test]
async fn read_only_rejects_out_and_merge_stages() {
    let config = mongo_mcp_config::Config {
        read_only: true,
        ..test_config()
    };
    let h = harness_with(
        config,
        FakeProvider::new().with_documents("db", "c", vec![doc! {"a": 1}]),
    );
    let result = h
        .call(
            "aggregate",
            json!({
                "database": "db",
                "collection": "c",
                "pipeline": [ {"$match": {"a": 1}}, {"$out": "other"} ],
            }),
        )
        .await;
    assert!(is_error(&result));
    assert!(result_text(&result).contains("ForbiddenWriteOperation"));
}

#[tokio::test]
async fn declined_confirmation_is_a_non_error_and_skips_the_driver() {
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents("db", "c", vec![doc! {"a": 1}]),
    );
    let result = h
        .call_with_confirmation(
            "drop-collection",
            json!({"database": "db", "collection": "c"}),
            false,
        )
        .await;
    assert!(!is_error(&result), "decline is not an error");
    let text = result_text(&result);
    assert!(text.contains("did not confirm"), "{text}");
    assert!(h.provider.recorded_calls().is_empty());
    // The collection still exists.
    assert_eq!(h.provider.documents("db", "c").len(), 1);

    // The non-error decline still reaches telemetry under its stable code.
    let events = h.telemetry.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0].result, ToolEventResult::Success));
    assert_eq!(
        events[0].error_code.map(|c| c.as_str()),
        Some("ConfirmationDeclined")
    );
}

#[tokio::test]
async fn confirmed_destructive_tool_runs() {
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents("db", "c", vec![doc! {"a": 1}]),
    );
    let result = h
        .call("drop-collection", json!({"database": "db", "collection": "c"}))
        .await;
    assert!(!is_error(&result), "{}", result_text(&result));
    assert!(h.provider.documents("db", "c").is_empty());
}

#[tokio::test]
async fn one_telemetry_event_per_call_with_result_and_code() {
    let h = harness_with(test_config(), FakeProvider::new());

    let ok = h.call("find", json!({"database": "db", "collection": "c"})).await;
    assert!(!is_error(&ok));
    let failed = h
        .call("find", json!({"database": "db", "collection": "c", "bogus": true}))
        .await;
    assert!(is_error(&failed));

    let events = h.telemetry.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0].result, ToolEventResult::Success));
    assert!(matches!(events[1].result, ToolEventResult::Failure));
    assert_eq!(
        events[1].error_code.map(|c| c.as_str()),
        Some("InvalidArguments")
    );
}

#[tokio::test]
async fn a_fired_cancellation_signal_stops_the_call_as_a_distinct_error() {
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents("db", "c", vec![doc! {"a": 1}]),
    );
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();
    let result = h
        .call_with_token(
            "find",
            json!({"database": "db", "collection": "c"}),
            true,
            token,
        )
        .await;
    assert!(is_error(&result));
    assert!(result_text(&result).contains("Cancelled"), "{}", result_text(&result));
}

struct FeatureGatedTool;

#[async_trait]
impl ServerTool for FeatureGatedTool {
    fn name(&self) -> &'static str {
        "feature-gated"
    }
    fn description(&self) -> &'static str {
        "test tool behind the vectorSearch preview feature"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }
    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }
    fn required_features(&self) -> &'static [PreviewFeature] {
        &[PreviewFeature::VectorSearch]
    }
    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<JsonObject>()
    }
    async fn execute(
        &self,
        _args: JsonObject,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ServerError> {
        Ok(ToolOutput::text("ran"))
    }
}

#[tokio::test]
async fn missing_preview_feature_is_rejected() {
    let mut registry = ToolRegistry::new();
    tools::register_defaults(&mut registry);
    registry.register(Arc::new(FeatureGatedTool));

    let h = harness_with_registry(test_config(), FakeProvider::new(), registry);
    let result = h.call("feature-gated", json!({})).await;
    assert!(is_error(&result));
    assert!(result_text(&result).contains("FeatureDisabled"));
}

#[tokio::test]
async fn enabled_preview_feature_lets_the_tool_run() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FeatureGatedTool));

    let mut config = test_config();
    config.preview_features.insert(PreviewFeature::VectorSearch);
    let h = harness_with_registry(config, FakeProvider::new(), registry);
    let result = h.call("feature-gated", json!({})).await;
    assert!(!is_error(&result), "{}", result_text(&result));
    assert_eq!(result_text(&result), "ran");
}
