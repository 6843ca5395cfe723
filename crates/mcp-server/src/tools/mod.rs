//! The tool catalog.
//!
//! One module per tool family; `register_defaults` assembles the catalog a
//! server starts with.

mod aggregate;
mod atlas;
mod connect;
mod delete;
mod drop;
mod export;
mod find;
mod indexes;
mod insert;
mod metadata;
mod routing;
mod update;

use std::sync::Arc;

use bson::Document;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::content::extjson_byte_len;
use crate::error::ServerError;
use crate::provider::DocumentStream;
use crate::registry::ToolRegistry;

pub use aggregate::AggregateTool;
pub use atlas::{
    AtlasCreateAccessListTool, AtlasCreateDbUserTool, AtlasInspectClusterTool, AtlasListOrgsTool,
    AtlasListProjectsTool,
};
pub use connect::{ConnectTool, DisconnectTool};
pub use delete::DeleteManyTool;
pub use drop::{DropCollectionTool, DropDatabaseTool};
pub use export::ExportTool;
pub use find::FindTool;
pub use indexes::{CollectionIndexesTool, CreateIndexTool, DropIndexTool};
pub use insert::InsertManyTool;
pub use metadata::{CountTool, ListCollectionsTool, ListDatabasesTool};
pub use routing::{
    GetAoisByPoiTool, GetRoadsByAoiTool, ShortestPathFromGatesTool, ShortestPathTool,
};
pub use update::UpdateManyTool;

/// Register the full default catalog.
pub fn register_defaults(registry: &mut ToolRegistry) {
    registry.register(Arc::new(ConnectTool));
    registry.register(Arc::new(DisconnectTool));
    registry.register(Arc::new(FindTool));
    registry.register(Arc::new(AggregateTool));
    registry.register(Arc::new(InsertManyTool));
    registry.register(Arc::new(UpdateManyTool));
    registry.register(Arc::new(DeleteManyTool));
    registry.register(Arc::new(DropCollectionTool));
    registry.register(Arc::new(DropDatabaseTool));
    registry.register(Arc::new(CollectionIndexesTool));
    registry.register(Arc::new(CreateIndexTool));
    registry.register(Arc::new(DropIndexTool));
    registry.register(Arc::new(ListDatabasesTool));
    registry.register(Arc::new(ListCollectionsTool));
    registry.register(Arc::new(CountTool));
    registry.register(Arc::new(ExportTool));
    registry.register(Arc::new(ShortestPathTool));
    registry.register(Arc::new(ShortestPathFromGatesTool));
    registry.register(Arc::new(GetAoisByPoiTool));
    registry.register(Arc::new(GetRoadsByAoiTool));
    registry.register(Arc::new(AtlasListOrgsTool));
    registry.register(Arc::new(AtlasListProjectsTool));
    registry.register(Arc::new(AtlasInspectClusterTool));
    registry.register(Arc::new(AtlasCreateAccessListTool));
    registry.register(Arc::new(AtlasCreateDbUserTool));
}

pub(crate) fn namespace(db: &str, coll: &str) -> String {
    format!("{db}.{coll}")
}

/// Documents drained from a cursor under the response byte caps.
pub(crate) struct Collected {
    pub docs: Vec<Document>,
    pub bytes: usize,
    pub truncated_by_bytes: bool,
}

/// Drain a cursor until it is exhausted, the byte budget runs out or the
/// call is cancelled. Dropping the stream closes the cursor on every exit
/// path, including error and cancellation.
pub(crate) async fn collect_capped(
    mut stream: DocumentStream,
    byte_limit: usize,
    cancellation: &CancellationToken,
) -> Result<Collected, ServerError> {
    let mut docs = Vec::new();
    let mut bytes = 0usize;
    let mut truncated_by_bytes = false;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(ServerError::cancelled()),
            item = stream.next() => item,
        };
        let Some(item) = next else {
            break;
        };
        let doc = item?;
        let len = extjson_byte_len(&doc);
        if bytes + len > byte_limit && !docs.is_empty() {
            truncated_by_bytes = true;
            break;
        }
        bytes += len;
        docs.push(doc);
        if bytes >= byte_limit {
            truncated_by_bytes = true;
            break;
        }
    }

    Ok(Collected {
        docs,
        bytes,
        truncated_by_bytes,
    })
}

/// Effective byte budget for one call: the server cap, tightened by the
/// caller's `responseBytesLimit` when present.
pub(crate) fn effective_byte_limit(server_cap: u64, requested: Option<u64>) -> usize {
    let cap = match requested {
        Some(requested) if requested > 0 => requested.min(server_cap),
        _ => server_cap,
    };
    usize::try_from(cap).unwrap_or(usize::MAX)
}

/// True when a `queryPlanner` explain output resolves to a full collection
/// scan anywhere in the winning plan.
pub(crate) fn plan_is_collection_scan(plan: &Document) -> bool {
    use bson::Bson;
    for (key, value) in plan {
        match value {
            Bson::String(stage) if key == "stage" && stage == "COLLSCAN" => return true,
            Bson::Document(inner) => {
                if plan_is_collection_scan(inner) {
                    return true;
                }
            }
            Bson::Array(items) => {
                for item in items {
                    if let Bson::Document(inner) = item {
                        if plan_is_collection_scan(inner) {
                            return true;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    false
}
