//! Map-routing tools over a road collection.
//!
//! The collection mixes GeoJSON point features (junctions) and line
//! features (roads). Road attributes may live at the top level or under a
//! `properties` sub-document; both spellings are accepted, as are camelCase
//! and snake_case field names.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use mongo_mcp_routing::{
    attach_gate_endpoint, edge_weight, merge_consecutive_edges, passable_in_mode, resolve_gate,
    Gate, GateType, PathResult, Road, RoadEdge, RoadNetwork, RoutingError, TravelMode, WeightField,
    SYNTHETIC_JUNCTION_BASE,
};

use crate::content::{documents_to_extjson, wrap_untrusted};
use crate::error::ServerError;
use crate::provider::{FindQuery, Provider};
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};
use crate::tools::{collect_capped, effective_byte_limit, namespace};

/// Stored speeds are m/s; humans read km/h.
const MPS_TO_KMH: f64 = 3.6;

fn bson_to_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(*n as i64),
        Bson::Int64(n) => Some(*n),
        Bson::Double(n) => Some(*n as i64),
        _ => None,
    }
}

fn bson_to_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Look up a road attribute at the top level or under `properties`,
/// accepting both snake_case and camelCase spellings.
fn road_field<'a>(doc: &'a Document, snake: &str, camel: &str) -> Option<&'a Bson> {
    doc.get(snake)
        .or_else(|| doc.get(camel))
        .or_else(|| {
            doc.get_document("properties")
                .ok()
                .and_then(|props| props.get(snake).or_else(|| props.get(camel)))
        })
}

fn parse_coordinate(value: &Bson) -> Option<[f64; 2]> {
    let Bson::Array(pair) = value else {
        return None;
    };
    if pair.len() < 2 {
        return None;
    }
    Some([bson_to_f64(&pair[0])?, bson_to_f64(&pair[1])?])
}

fn parse_gate(value: &Bson) -> Option<Gate> {
    let Bson::Document(doc) = value else {
        return None;
    };
    let aoi_id = bson_to_i64(doc.get("aoi_id").or_else(|| doc.get("aoiId"))?)?;
    let gate_type = match doc.get_str("type").ok()? {
        "driving" => GateType::Driving,
        "walking" => GateType::Walking,
        _ => return None,
    };
    let coordinates = parse_coordinate(doc.get("coordinates")?)?;
    Some(Gate {
        aoi_id,
        gate_type,
        coordinates,
    })
}

/// Project a LineString document into a routable road. Point features and
/// malformed documents yield `None` and are skipped.
fn parse_road(doc: &Document) -> Option<Road> {
    let geometry = doc.get_document("geometry").ok()?;
    if geometry.get_str("type") != Ok("LineString") {
        return None;
    }
    let coordinates = geometry.get_array("coordinates").ok()?;
    let start = parse_coordinate(coordinates.first()?)?;
    let end = parse_coordinate(coordinates.last()?)?;

    let id = bson_to_i64(doc.get("_id").or_else(|| road_field(doc, "id", "id"))?)?;
    let from_junction = bson_to_i64(road_field(doc, "from_junction", "fromJunction")?)?;
    let to_junction = bson_to_i64(road_field(doc, "to_junction", "toJunction")?)?;
    let length = bson_to_f64(road_field(doc, "length", "length")?)?;
    let cost = bson_to_f64(road_field(doc, "cost", "cost")?)?;
    let name = road_field(doc, "name", "name")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let category = road_field(doc, "category", "category")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let max_speed = road_field(doc, "max_speed", "maxSpeed").and_then(bson_to_f64);
    let gates = road_field(doc, "gates", "gates")
        .and_then(|v| match v {
            Bson::Array(items) => Some(items.iter().filter_map(parse_gate).collect()),
            _ => None,
        })
        .unwrap_or_default();

    Some(Road {
        edge: RoadEdge {
            id,
            from_junction,
            to_junction,
            length,
            cost,
            name,
            category,
            max_speed,
        },
        start,
        end,
        gates,
    })
}

async fn load_roads(
    provider: &dyn Provider,
    db: &str,
    coll: &str,
    ctx: &ToolContext,
) -> Result<Vec<Road>, ServerError> {
    let stream = provider
        .find(
            db,
            coll,
            FindQuery {
                filter: doc! { "geometry.type": "LineString" },
                ..FindQuery::default()
            },
        )
        .await?;
    // Road networks are loaded whole; only cancellation bounds the read.
    let collected = collect_capped(stream, usize::MAX, &ctx.cancellation).await?;
    Ok(collected.docs.iter().filter_map(parse_road).collect())
}

fn edge_detail(edge: &RoadEdge) -> serde_json::Value {
    serde_json::json!({
        "id": edge.id,
        "fromJunction": edge.from_junction,
        "toJunction": edge.to_junction,
        "length": edge.length,
        "cost": edge.cost,
        "name": edge.name,
        "category": edge.category,
        "maxSpeedKmh": edge.max_speed.map(|v| v * MPS_TO_KMH),
    })
}

fn path_summary(path: &PathResult, edges: &[RoadEdge], include_details: bool) -> String {
    let mut summary = serde_json::json!({
        "path": path.junctions,
        "visitedJunctions": path.visited_junctions,
        "totalLength": path.total_length,
        "totalCost": path.total_cost,
    });
    if include_details {
        summary["roads"] = serde_json::Value::Array(edges.iter().map(edge_detail).collect());
    }
    serde_json::to_string_pretty(&summary).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// shortest_path
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShortestPathRequest {
    pub database: String,
    pub collection: String,
    pub start_junction: i64,
    pub end_junction: i64,
    /// Edge attribute minimized by the search.
    #[serde(default)]
    pub weight_field: Option<WeightField>,
    #[serde(default)]
    pub include_road_details: bool,
}

pub struct ShortestPathTool;

#[async_trait]
impl ServerTool for ShortestPathTool {
    fn name(&self) -> &'static str {
        "shortest_path"
    }

    fn description(&self) -> &'static str {
        "Find the shortest path between two road-network junctions by cost or length."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<ShortestPathRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: ShortestPathRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let roads = load_roads(provider.as_ref(), &request.database, &request.collection, ctx).await?;
        if roads.is_empty() {
            return Err(ServerError::invalid_arguments(format!(
                "No roads found in {}",
                namespace(&request.database, &request.collection)
            )));
        }

        let field = request.weight_field.unwrap_or(WeightField::Cost);
        let network = RoadNetwork::from_edges(roads.into_iter().map(|road| road.edge));
        let weight = move |edge: &RoadEdge| match field {
            WeightField::Cost => edge.cost,
            WeightField::Length => edge.length,
        };

        let path = match network.shortest_path(request.start_junction, request.end_junction, &weight)
        {
            Ok(path) => path,
            Err(RoutingError::NoRoute { from, to }) => {
                return Ok(ToolOutput::text(format!(
                    "No route exists between junction {from} and junction {to}."
                )));
            }
            Err(err) => return Err(err.into()),
        };

        let blocks = vec![
            format!(
                "Found a route from junction {} to junction {} through {} junction(s) ({} visited during the search).",
                request.start_junction,
                request.end_junction,
                path.junctions.len(),
                path.visited_junctions
            ),
            format!(
                "Total distance: {:.1} m. Total cost: {:.2}.",
                path.total_length, path.total_cost
            ),
            wrap_untrusted(&path_summary(&path, &path.edges, request.include_road_details)),
        ];
        let hops = path.edges.len();
        Ok(ToolOutput::texts(blocks).with_metadata("roads", serde_json::Value::from(hops)))
    }
}

// ---------------------------------------------------------------------------
// shortest_path_from_gates
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShortestPathFromGatesRequest {
    pub database: String,
    pub collection: String,
    /// Road carrying the departure gate.
    pub start_road_id: i64,
    /// AOI the departure gate belongs to.
    pub start_aoi_id: i64,
    /// Road carrying the arrival gate.
    pub end_road_id: i64,
    /// AOI the arrival gate belongs to.
    pub end_aoi_id: i64,
    #[serde(default)]
    pub mode: Option<TravelMode>,
    #[serde(default)]
    pub weight_field: Option<WeightField>,
    #[serde(default)]
    pub include_road_details: bool,
}

pub struct ShortestPathFromGatesTool;

#[async_trait]
impl ServerTool for ShortestPathFromGatesTool {
    fn name(&self) -> &'static str {
        "shortest_path_from_gates"
    }

    fn description(&self) -> &'static str {
        "Find the shortest path between two AOI access gates, splitting roads at the gates as needed."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<ShortestPathFromGatesRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: ShortestPathFromGatesRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;
        let mode = request.mode.unwrap_or(TravelMode::Driving);
        let field = request.weight_field.unwrap_or(WeightField::Cost);

        let all_roads =
            load_roads(provider.as_ref(), &request.database, &request.collection, ctx).await?;

        // Gate verification happens against the unfiltered set so a walking
        // query can still name a footway as its endpoint road.
        let start_road = all_roads
            .iter()
            .find(|road| road.edge.id == request.start_road_id)
            .ok_or(RoutingError::RoadNotFound(request.start_road_id))?;
        let end_road = all_roads
            .iter()
            .find(|road| road.edge.id == request.end_road_id)
            .ok_or(RoutingError::RoadNotFound(request.end_road_id))?;
        let start_gate = resolve_gate(start_road, request.start_aoi_id, mode)?.clone();
        let end_gate = resolve_gate(end_road, request.end_aoi_id, mode)?.clone();

        let roads: Vec<Road> = all_roads
            .into_iter()
            .filter(|road| passable_in_mode(road, mode))
            .collect();

        let mut next_synthetic = SYNTHETIC_JUNCTION_BASE;
        let start_attachment = attach_gate_endpoint(
            &roads,
            request.start_road_id,
            start_gate.coordinates,
            mode,
            &mut next_synthetic,
        )?;
        let end_attachment = attach_gate_endpoint(
            &roads,
            request.end_road_id,
            end_gate.coordinates,
            mode,
            &mut next_synthetic,
        )?;

        let mut replaced: Vec<i64> = start_attachment.replaced_roads.clone();
        replaced.extend(&end_attachment.replaced_roads);

        let mut network = RoadNetwork::new();
        for road in &roads {
            if !replaced.contains(&road.edge.id) {
                network.add_edge(road.edge.clone());
            }
        }
        for edge in start_attachment
            .split_edges
            .iter()
            .chain(&end_attachment.split_edges)
        {
            network.add_edge(edge.clone());
        }

        let weight = move |edge: &RoadEdge| edge_weight(edge, mode, field);
        let path = match network.shortest_path(
            start_attachment.junction,
            end_attachment.junction,
            &weight,
        ) {
            Ok(path) => path,
            Err(RoutingError::NoRoute { .. }) => {
                return Ok(ToolOutput::text(format!(
                    "No {} route exists between the gates of AOI {} (road {}) and AOI {} (road {}).",
                    mode.as_str(),
                    request.start_aoi_id,
                    request.start_road_id,
                    request.end_aoi_id,
                    request.end_road_id
                )));
            }
            Err(err) => return Err(err.into()),
        };

        let merged = merge_consecutive_edges(&path.edges);
        let blocks = vec![
            format!(
                "Found a {} route between the gates through {} junction(s); {} road segment(s) after merging ({} before).",
                mode.as_str(),
                path.junctions.len(),
                merged.len(),
                path.edges.len()
            ),
            format!(
                "Total distance: {:.1} m. Total cost: {:.2}.",
                path.total_length, path.total_cost
            ),
            wrap_untrusted(&path_summary(&path, &merged, request.include_road_details)),
        ];
        let segments = merged.len();
        Ok(ToolOutput::texts(blocks).with_metadata("roads", serde_json::Value::from(segments)))
    }
}

// ---------------------------------------------------------------------------
// AOI / POI lookups
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetAoisByPoiRequest {
    pub database: String,
    pub collection: String,
    /// POI name to look up.
    pub name: String,
    /// Match the name exactly instead of as a case-insensitive substring.
    #[serde(default)]
    pub exact_match: bool,
}

pub struct GetAoisByPoiTool;

#[async_trait]
impl ServerTool for GetAoisByPoiTool {
    fn name(&self) -> &'static str {
        "get_aois_by_poi"
    }

    fn description(&self) -> &'static str {
        "Find the AOIs containing a named point of interest."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<GetAoisByPoiRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: GetAoisByPoiRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;

        let filter = if request.exact_match {
            doc! { "name": &request.name }
        } else {
            doc! { "name": { "$regex": regex::escape(&request.name), "$options": "i" } }
        };

        let doc_cap = ctx.config.max_documents_per_query;
        let stream = provider
            .find(
                &request.database,
                &request.collection,
                FindQuery {
                    filter,
                    limit: (doc_cap > 0).then_some(doc_cap as i64),
                    ..FindQuery::default()
                },
            )
            .await?;
        let byte_limit = effective_byte_limit(ctx.config.max_bytes_per_query, None);
        let collected = collect_capped(stream, byte_limit, &ctx.cancellation).await?;

        let mut blocks = vec![format!(
            "Found {} AOI(s) matching '{}'.",
            collected.docs.len(),
            request.name
        )];
        if !collected.docs.is_empty() {
            blocks.push(wrap_untrusted(&documents_to_extjson(&collected.docs)));
        }
        Ok(ToolOutput::texts(blocks))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetRoadsByAoiRequest {
    pub database: String,
    pub collection: String,
    /// AOI whose gate-bearing roads to return.
    pub aoi_id: i64,
}

pub struct GetRoadsByAoiTool;

#[async_trait]
impl ServerTool for GetRoadsByAoiTool {
    fn name(&self) -> &'static str {
        "get_roads_by_aoi"
    }

    fn description(&self) -> &'static str {
        "List the roads carrying access gates of an AOI."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MongoDb
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<GetRoadsByAoiRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: GetRoadsByAoiRequest = parse_args(args)?;
        let provider = ctx.session.ensure_connected().await?;

        let filter = doc! { "$or": [
            { "gates.aoi_id": request.aoi_id },
            { "gates.aoiId": request.aoi_id },
            { "properties.gates.aoi_id": request.aoi_id },
            { "properties.gates.aoiId": request.aoi_id },
        ]};
        let stream = provider
            .find(
                &request.database,
                &request.collection,
                FindQuery {
                    filter,
                    ..FindQuery::default()
                },
            )
            .await?;
        let byte_limit = effective_byte_limit(ctx.config.max_bytes_per_query, None);
        let collected = collect_capped(stream, byte_limit, &ctx.cancellation).await?;

        let mut blocks = vec![format!(
            "Found {} road(s) with gates of AOI {}.",
            collected.docs.len(),
            request.aoi_id
        )];
        if !collected.docs.is_empty() {
            blocks.push(wrap_untrusted(&documents_to_extjson(&collected.docs)));
        }
        Ok(ToolOutput::texts(blocks))
    }
}
