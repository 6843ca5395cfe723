use thiserror::Error;

pub type Result<T> = std::result::Result<T, RoutingError>;

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Junction not found: {0}")]
    JunctionNotFound(i64),

    #[error("Road not found: {0}")]
    RoadNotFound(i64),

    #[error("No route between junction {from} and junction {to}")]
    NoRoute { from: i64, to: i64 },

    #[error("Road {road} has no gate for AOI {aoi} usable in {mode} mode")]
    GateNotFound {
        road: i64,
        aoi: i64,
        mode: &'static str,
    },

    #[error("Road id {0} collides with the synthetic id space; cannot split")]
    IdSpaceExhausted(i64),

    #[error("Road {0} has zero length; cannot split at a gate")]
    DegenerateRoad(i64),
}
