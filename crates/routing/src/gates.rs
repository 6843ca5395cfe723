//! Gate-aware endpoint handling.
//!
//! The gate variant of shortest path starts and ends at AOI access points
//! lying somewhere along a road, not at pre-existing junctions. Each
//! endpoint either reuses a nearby road-end junction or splits every
//! sibling carriageway at the gate around a fresh synthetic junction.

use crate::error::{Result, RoutingError};
use crate::geo::{coordinates_match, haversine_distance_m};
use crate::types::{
    split_cost, Gate, JunctionId, Road, RoadEdge, TravelMode, SPLIT_FROM_OFFSET, SPLIT_TO_OFFSET,
};

/// Road categories that are not drivable.
const NON_DRIVABLE_CATEGORIES: &[&str] = &["footway", "cycleway", "steps"];

/// Whether a road participates in the network for the given travel mode.
pub fn passable_in_mode(road: &Road, mode: TravelMode) -> bool {
    match mode {
        TravelMode::Walking => true,
        TravelMode::Driving => road
            .edge
            .category
            .as_deref()
            .map(|category| !NON_DRIVABLE_CATEGORIES.contains(&category))
            .unwrap_or(true),
    }
}

/// Find the gate on `road` that belongs to `aoi_id` and is usable in `mode`.
pub fn resolve_gate(road: &Road, aoi_id: i64, mode: TravelMode) -> Result<&Gate> {
    road.gates
        .iter()
        .find(|gate| gate.aoi_id == aoi_id && gate.usable_in(mode))
        .ok_or(RoutingError::GateNotFound {
            road: road.edge.id,
            aoi: aoi_id,
            mode: mode.as_str(),
        })
}

/// Result of attaching one gate endpoint to the network.
#[derive(Clone, Debug)]
pub struct GateAttachment {
    /// The junction the path search should start from or end at.
    pub junction: JunctionId,
    /// Split halves to insert. Empty when an existing junction was reused.
    pub split_edges: Vec<RoadEdge>,
    /// Ids of roads replaced by their split halves.
    pub replaced_roads: Vec<i64>,
}

/// Attach a gate endpoint: reuse a road-end junction when the gate sits on
/// one, otherwise split every sibling sharing the gate coordinate around a
/// fresh synthetic junction.
pub fn attach_gate_endpoint(
    roads: &[Road],
    anchor_road_id: i64,
    gate_coordinate: [f64; 2],
    mode: TravelMode,
    next_synthetic: &mut JunctionId,
) -> Result<GateAttachment> {
    let anchor = roads
        .iter()
        .find(|road| road.edge.id == anchor_road_id)
        .ok_or(RoutingError::RoadNotFound(anchor_road_id))?;

    // Dual carriageways record the same physical gate on each direction's
    // road; every such sibling must be split at the shared point.
    let siblings: Vec<&Road> = roads
        .iter()
        .filter(|road| {
            road.gates
                .iter()
                .any(|gate| coordinates_match(gate.coordinates, gate_coordinate))
        })
        .collect();

    // Gate on (or within tolerance of) an existing road end: no split.
    for road in std::iter::once(anchor).chain(siblings.iter().copied()) {
        if coordinates_match(road.start, gate_coordinate) {
            return Ok(GateAttachment {
                junction: road.edge.from_junction,
                split_edges: Vec::new(),
                replaced_roads: Vec::new(),
            });
        }
        if coordinates_match(road.end, gate_coordinate) {
            return Ok(GateAttachment {
                junction: road.edge.to_junction,
                split_edges: Vec::new(),
                replaced_roads: Vec::new(),
            });
        }
    }

    let junction = *next_synthetic;
    *next_synthetic += 1;

    let mut split_edges = Vec::with_capacity(siblings.len() * 2);
    let mut replaced_roads = Vec::with_capacity(siblings.len());
    for road in siblings {
        if road.edge.id >= SPLIT_FROM_OFFSET {
            return Err(RoutingError::IdSpaceExhausted(road.edge.id));
        }

        let split_at = road
            .gates
            .iter()
            .find(|gate| coordinates_match(gate.coordinates, gate_coordinate))
            .map(|gate| gate.coordinates)
            .unwrap_or(gate_coordinate);

        let to_start = haversine_distance_m(road.start, split_at);
        let to_end = haversine_distance_m(road.end, split_at);
        let span = to_start + to_end;
        if span <= 0.0 {
            return Err(RoutingError::DegenerateRoad(road.edge.id));
        }

        let from_length = road.edge.length * to_start / span;
        let to_length = road.edge.length * to_end / span;
        let max_speed = road.edge.max_speed;

        split_edges.push(RoadEdge {
            id: road.edge.id + SPLIT_FROM_OFFSET,
            from_junction: road.edge.from_junction,
            to_junction: junction,
            length: from_length,
            cost: split_cost(from_length, mode, max_speed),
            name: road.edge.name.clone(),
            category: road.edge.category.clone(),
            max_speed,
        });
        split_edges.push(RoadEdge {
            id: road.edge.id + SPLIT_TO_OFFSET,
            from_junction: junction,
            to_junction: road.edge.to_junction,
            length: to_length,
            cost: split_cost(to_length, mode, max_speed),
            name: road.edge.name.clone(),
            category: road.edge.category.clone(),
            max_speed,
        });
        replaced_roads.push(road.edge.id);
    }

    Ok(GateAttachment {
        junction,
        split_edges,
        replaced_roads,
    })
}

/// Collapse consecutive path edges that belong to the same physical way.
/// The merged edge keeps the first id and endpoint orientation and sums
/// length and cost, so path totals are preserved.
pub fn merge_consecutive_edges(edges: &[RoadEdge]) -> Vec<RoadEdge> {
    let mut merged: Vec<RoadEdge> = Vec::with_capacity(edges.len());
    for edge in edges {
        match merged.last_mut() {
            Some(last) if last.same_way(edge) && last.to_junction == edge.from_junction => {
                last.to_junction = edge.to_junction;
                last.length += edge.length;
                last.cost += edge.cost;
            }
            _ => merged.push(edge.clone()),
        }
    }
    merged
}
