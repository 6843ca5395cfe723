//! Road-network routing over documents stored in a map collection.
//!
//! A road collection mixes point features (junctions) and line features
//! (roads). This crate models the line features as an undirected weighted
//! graph and answers shortest-path queries, including the gate-aware variant
//! where endpoints are access points of an area of interest rather than
//! pre-existing junctions.

mod error;
mod gates;
mod geo;
mod network;
mod types;

pub use error::{Result, RoutingError};
pub use gates::{
    attach_gate_endpoint, merge_consecutive_edges, passable_in_mode, resolve_gate, GateAttachment,
};
pub use geo::{coordinates_match, haversine_distance_m, GATE_COORDINATE_TOLERANCE_M};
pub use network::{PathResult, RoadNetwork};
pub use types::{
    edge_weight, split_cost, Gate, GateType, JunctionId, Road, RoadEdge, TravelMode, WeightField,
    DEFAULT_DRIVING_SPEED_MPS, SPLIT_FROM_OFFSET, SPLIT_TO_OFFSET, SYNTHETIC_JUNCTION_BASE,
    WALKING_SPEED_MPS,
};
