//! Road-network data model.

use serde::{Deserialize, Serialize};

pub type JunctionId = i64;

/// First id handed out for synthetic junctions created at gate split points.
/// The reserved range sits far above any real junction id.
pub const SYNTHETIC_JUNCTION_BASE: JunctionId = 60_000_000_000;

/// Id offset for the from-side half of a split road.
pub const SPLIT_FROM_OFFSET: i64 = 10_000_000_000;

/// Id offset for the to-side half of a split road.
pub const SPLIT_TO_OFFSET: i64 = 20_000_000_000;

/// Pedestrian speed used for walking-mode costs, in m/s.
pub const WALKING_SPEED_MPS: f64 = 1.4;

/// Fallback driving speed when a road reports no usable `maxSpeed`, in m/s.
pub const DEFAULT_DRIVING_SPEED_MPS: f64 = 8.33;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Walking,
}

impl TravelMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WeightField {
    Cost,
    Length,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateType {
    Driving,
    Walking,
}

/// An AOI access point lying on a road edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub aoi_id: i64,
    pub gate_type: GateType,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl Gate {
    /// Driving gates are usable on foot; walking gates are not drivable.
    pub fn usable_in(&self, mode: TravelMode) -> bool {
        match mode {
            TravelMode::Driving => self.gate_type == GateType::Driving,
            TravelMode::Walking => true,
        }
    }
}

/// One traversable edge of the network. For split roads the id carries the
/// originating road id plus a side offset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    pub id: i64,
    pub from_junction: JunctionId,
    pub to_junction: JunctionId,
    /// Meters.
    pub length: f64,
    pub cost: f64,
    pub name: Option<String>,
    pub category: Option<String>,
    /// Meters per second, as stored.
    pub max_speed: Option<f64>,
}

impl RoadEdge {
    /// The same edge oriented so that travel runs `from -> to`.
    pub fn oriented_from(&self, from: JunctionId) -> RoadEdge {
        if self.from_junction == from {
            self.clone()
        } else {
            let mut flipped = self.clone();
            flipped.from_junction = self.to_junction;
            flipped.to_junction = self.from_junction;
            flipped
        }
    }

    /// Whether two edges belong to the same physical way for merge purposes.
    pub fn same_way(&self, other: &RoadEdge) -> bool {
        self.name == other.name
            && self.category == other.category
            && self.max_speed == other.max_speed
    }
}

/// A LineString road document projected for routing: the edge data plus the
/// endpoint coordinates and any gates recorded on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub edge: RoadEdge,
    /// Coordinate of the `from_junction` end, `[lon, lat]`.
    pub start: [f64; 2],
    /// Coordinate of the `to_junction` end, `[lon, lat]`.
    pub end: [f64; 2],
    #[serde(default)]
    pub gates: Vec<Gate>,
}

/// Weight of an edge under the active travel mode. Walking always charges
/// time at pedestrian speed regardless of the requested weight field.
pub fn edge_weight(edge: &RoadEdge, mode: TravelMode, field: WeightField) -> f64 {
    match mode {
        TravelMode::Walking => edge.length / WALKING_SPEED_MPS,
        TravelMode::Driving => match field {
            WeightField::Cost => edge.cost,
            WeightField::Length => edge.length,
        },
    }
}

/// Travel cost assigned to a freshly split edge of the given length.
pub fn split_cost(length: f64, mode: TravelMode, max_speed: Option<f64>) -> f64 {
    match mode {
        TravelMode::Walking => length / WALKING_SPEED_MPS,
        TravelMode::Driving => {
            let speed = match max_speed {
                Some(v) if v > 0.0 => v,
                _ => DEFAULT_DRIVING_SPEED_MPS,
            };
            length / speed
        }
    }
}
