//! Shared fakes and harness for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::StreamExt;
use rmcp::model::CallToolResult;
use tokio_util::sync::CancellationToken;

use mongo_mcp_config::Config;
use mongo_mcp_embeddings::{
    value_at_path, EmbeddingError, EmbeddingParameters, EmbeddingService, InputType,
};
use mongo_mcp_server::dispatch::Dispatcher;
use mongo_mcp_server::elicitation::StaticConfirmation;
use mongo_mcp_server::error::ServerError;
use mongo_mcp_server::provider::{DocumentStream, FindQuery, Provider};
use mongo_mcp_server::registry::ToolRegistry;
use mongo_mcp_server::session::{Connector, Session};
use mongo_mcp_server::telemetry::{TelemetrySink, ToolEvent};
use mongo_mcp_server::tools;

fn ns(db: &str, coll: &str) -> String {
    format!("{db}.{coll}")
}

/// In-memory provider. Filters support dotted-path equality; documents with
/// operator values match everything (the fakes only need to be as smart as
/// the tests).
#[derive(Default)]
pub struct FakeProvider {
    pub data: Mutex<HashMap<String, Vec<Document>>>,
    pub search_indexes: Mutex<HashMap<String, Vec<Document>>>,
    pub calls: Mutex<Vec<String>>,
    pub search_supported: bool,
    pub explain_response: Mutex<Option<Document>>,
    pub insert_error: Option<String>,
    /// Every pipeline handed to `aggregate`, post-rewrite.
    pub aggregations: Mutex<Vec<Vec<Document>>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            search_supported: true,
            ..Self::default()
        }
    }

    pub fn with_documents(self, db: &str, coll: &str, docs: Vec<Document>) -> Self {
        self.data.lock().unwrap().insert(ns(db, coll), docs);
        self
    }

    pub fn with_search_index(self, db: &str, coll: &str, index: Document) -> Self {
        self.search_indexes
            .lock()
            .unwrap()
            .entry(ns(db, coll))
            .or_default()
            .push(index);
        self
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn documents(&self, db: &str, coll: &str) -> Vec<Document> {
        self.data
            .lock()
            .unwrap()
            .get(&ns(db, coll))
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn matches(doc: &Document, filter: &Document) -> bool {
        for (key, expected) in filter {
            if key.starts_with('$') {
                return true;
            }
            if let Bson::Document(inner) = expected {
                if inner.keys().any(|k| k.starts_with('$')) {
                    continue;
                }
            }
            match value_at_path(doc, key) {
                Some(actual) if actual == expected => {}
                _ => return false,
            }
        }
        true
    }

    fn stream_of(docs: Vec<Document>) -> DocumentStream {
        futures::stream::iter(docs.into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn find(&self, db: &str, coll: &str, query: FindQuery) -> Result<DocumentStream, ServerError> {
        self.record(&format!("find:{}", ns(db, coll)));
        let mut docs: Vec<Document> = self
            .documents(db, coll)
            .into_iter()
            .filter(|doc| Self::matches(doc, &query.filter))
            .collect();
        if let Some(skip) = query.skip {
            docs = docs.into_iter().skip(skip as usize).collect();
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit as usize);
        }
        Ok(Self::stream_of(docs))
    }

    async fn aggregate(
        &self,
        db: &str,
        coll: &str,
        pipeline: Vec<Document>,
        _max_time: Option<Duration>,
    ) -> Result<DocumentStream, ServerError> {
        self.record(&format!("aggregate:{}", ns(db, coll)));
        self.aggregations.lock().unwrap().push(pipeline.clone());
        let mut docs = self.documents(db, coll);
        for stage in &pipeline {
            if let Ok(filter) = stage.get_document("$match") {
                docs.retain(|doc| Self::matches(doc, filter));
            } else if let Some(limit) = stage.get("$limit").and_then(|v| match v {
                Bson::Int32(n) => Some(*n as usize),
                Bson::Int64(n) => Some(*n as usize),
                _ => None,
            }) {
                docs.truncate(limit);
            } else if let Ok(key) = stage.get_str("$count") {
                let mut count_doc = Document::new();
                count_doc.insert(key, docs.len() as i64);
                docs = vec![count_doc];
            }
        }
        Ok(Self::stream_of(docs))
    }

    async fn insert_many(
        &self,
        db: &str,
        coll: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Bson>, ServerError> {
        self.record(&format!("insert_many:{}", ns(db, coll)));
        if let Some(message) = &self.insert_error {
            return Err(ServerError::unexpected(message.clone()));
        }
        let mut ids = Vec::with_capacity(docs.len());
        let mut stored = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = doc
                .get("_id")
                .cloned()
                .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
            doc.insert("_id", id.clone());
            ids.push(id);
            stored.push(doc);
        }
        self.data
            .lock()
            .unwrap()
            .entry(ns(db, coll))
            .or_default()
            .extend(stored);
        Ok(ids)
    }

    async fn update_many(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        _update: Document,
    ) -> Result<(u64, u64), ServerError> {
        self.record(&format!("update_many:{}", ns(db, coll)));
        let matched = self
            .documents(db, coll)
            .iter()
            .filter(|doc| Self::matches(doc, &filter))
            .count() as u64;
        Ok((matched, matched))
    }

    async fn delete_many(&self, db: &str, coll: &str, filter: Document) -> Result<u64, ServerError> {
        self.record(&format!("delete_many:{}", ns(db, coll)));
        let mut data = self.data.lock().unwrap();
        let docs = data.entry(ns(db, coll)).or_default();
        let before = docs.len();
        docs.retain(|doc| !Self::matches(doc, &filter));
        Ok((before - docs.len()) as u64)
    }

    async fn drop_collection(&self, db: &str, coll: &str) -> Result<(), ServerError> {
        self.record(&format!("drop_collection:{}", ns(db, coll)));
        self.data.lock().unwrap().remove(&ns(db, coll));
        Ok(())
    }

    async fn drop_database(&self, db: &str) -> Result<(), ServerError> {
        self.record(&format!("drop_database:{db}"));
        self.data
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(&format!("{db}.")));
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, ServerError> {
        self.record("list_databases");
        let mut names: Vec<String> = self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter_map(|key| key.split('.').next().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn list_collections(&self, db: &str) -> Result<Vec<String>, ServerError> {
        self.record(&format!("list_collections:{db}"));
        let prefix = format!("{db}.");
        Ok(self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn list_indexes(&self, db: &str, coll: &str) -> Result<Vec<Document>, ServerError> {
        self.record(&format!("list_indexes:{}", ns(db, coll)));
        Ok(vec![doc! { "name": "_id_", "key": { "_id": 1 } }])
    }

    async fn create_index(
        &self,
        db: &str,
        coll: &str,
        _keys: Document,
        name: Option<String>,
        _unique: bool,
    ) -> Result<String, ServerError> {
        self.record(&format!("create_index:{}", ns(db, coll)));
        Ok(name.unwrap_or_else(|| "index_1".to_string()))
    }

    async fn drop_index(&self, db: &str, coll: &str, name: &str) -> Result<(), ServerError> {
        self.record(&format!("drop_index:{}:{name}", ns(db, coll)));
        Ok(())
    }

    async fn list_search_indexes(&self, db: &str, coll: &str) -> Result<Vec<Document>, ServerError> {
        self.record(&format!("list_search_indexes:{}", ns(db, coll)));
        Ok(self
            .search_indexes
            .lock()
            .unwrap()
            .get(&ns(db, coll))
            .cloned()
            .unwrap_or_default())
    }

    async fn count(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        _max_time: Option<Duration>,
    ) -> Result<u64, ServerError> {
        self.record(&format!("count:{}", ns(db, coll)));
        Ok(self
            .documents(db, coll)
            .iter()
            .filter(|doc| Self::matches(doc, &filter))
            .count() as u64)
    }

    async fn run_command(&self, db: &str, command: Document) -> Result<Document, ServerError> {
        self.record(&format!("run_command:{db}"));
        if command.contains_key("explain") {
            if let Some(response) = self.explain_response.lock().unwrap().clone() {
                return Ok(response);
            }
            return Ok(doc! {
                "queryPlanner": { "winningPlan": { "stage": "IXSCAN", "indexName": "_id_" } }
            });
        }
        Ok(doc! { "ok": 1 })
    }

    async fn supports_search(&self, _db: &str, _coll: &str) -> Result<bool, ServerError> {
        self.record("supports_search");
        Ok(self.search_supported)
    }

    async fn close(&self) {
        self.record("close");
    }
}

pub struct FakeConnector {
    pub provider: Arc<FakeProvider>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _uri: &str) -> Result<Arc<dyn Provider>, ServerError> {
        Ok(self.provider.clone())
    }
}

/// Deterministic embedding service: every input becomes a vector of the
/// requested dimension filled with 0.5. Counts generation calls so tests
/// can assert single-batch behavior.
#[derive(Default)]
pub struct StubEmbeddingService {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingService for StubEmbeddingService {
    async fn generate(
        &self,
        inputs: &[String],
        params: &EmbeddingParameters,
        _input_type: InputType,
    ) -> Result<Vec<Vec<f64>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|_| vec![0.5; params.output_dimension as usize])
            .collect())
    }
}

#[derive(Default)]
pub struct CapturingTelemetry {
    pub events: Mutex<Vec<ToolEvent>>,
}

impl TelemetrySink for CapturingTelemetry {
    fn emit(&self, event: ToolEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub provider: Arc<FakeProvider>,
    pub session: Arc<Session>,
    pub dispatcher: Arc<Dispatcher>,
    pub telemetry: Arc<CapturingTelemetry>,
    pub embeddings: Arc<StubEmbeddingService>,
}

/// Config with a connection string so tools auto-connect to the fake.
pub fn test_config() -> Config {
    Config {
        connection_string: Some("mongodb://localhost:27017/?appName=test".to_string()),
        ..Config::default()
    }
}

pub fn harness_with(config: Config, provider: FakeProvider) -> Harness {
    let mut registry = ToolRegistry::new();
    tools::register_defaults(&mut registry);
    harness_with_registry(config, provider, registry)
}

pub fn harness_with_registry(
    config: Config,
    provider: FakeProvider,
    registry: ToolRegistry,
) -> Harness {
    let config = Arc::new(config);
    let provider = Arc::new(provider);
    let telemetry = Arc::new(CapturingTelemetry::default());
    let embeddings = Arc::new(StubEmbeddingService::default());
    let connector = Arc::new(FakeConnector {
        provider: provider.clone(),
    });
    let embedding_service: Arc<dyn EmbeddingService> = embeddings.clone();
    let session = Arc::new(Session::with_embedding_service(
        config.clone(),
        connector,
        None,
        Some(embedding_service),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        config,
        telemetry.clone(),
    ));
    Harness {
        provider,
        session,
        dispatcher,
        telemetry,
        embeddings,
    }
}

impl Harness {
    /// Dispatch a tool call with an always-accepting confirmation gate.
    pub async fn call(&self, name: &str, args: serde_json::Value) -> CallToolResult {
        self.call_with_confirmation(name, args, true).await
    }

    pub async fn call_with_confirmation(
        &self,
        name: &str,
        args: serde_json::Value,
        confirm: bool,
    ) -> CallToolResult {
        self.call_with_token(name, args, confirm, CancellationToken::new())
            .await
    }

    pub async fn call_with_token(
        &self,
        name: &str,
        args: serde_json::Value,
        confirm: bool,
        cancellation: CancellationToken,
    ) -> CallToolResult {
        let args = match args {
            serde_json::Value::Object(map) => map,
            _ => panic!("tool arguments must be a JSON object"),
        };
        self.dispatcher
            .dispatch(
                name,
                args,
                &self.session,
                &StaticConfirmation(confirm),
                cancellation,
            )
            .await
    }
}

/// All text blocks of a result, joined.
pub fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|content| content.as_text().map(|text| text.text.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn is_error(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}
