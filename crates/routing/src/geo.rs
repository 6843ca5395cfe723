//! Great-circle helpers for gate matching and split proportions.

/// Gates recorded on parallel carriageways are the same physical access
/// point when their coordinates agree to about a meter.
pub const GATE_COORDINATE_TOLERANCE_M: f64 = 1.0;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two `[lon, lat]` coordinates, in meters.
pub fn haversine_distance_m(a: [f64; 2], b: [f64; 2]) -> f64 {
    let lat1 = a[1].to_radians();
    let lat2 = b[1].to_radians();
    let dlat = (b[1] - a[1]).to_radians();
    let dlon = (b[0] - a[0]).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Whether two coordinates name the same point within gate tolerance.
pub fn coordinates_match(a: [f64; 2], b: [f64; 2]) -> bool {
    haversine_distance_m(a, b) <= GATE_COORDINATE_TOLERANCE_M
}
