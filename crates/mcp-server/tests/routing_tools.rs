//! Routing tools over a fake road collection.

mod support;

use bson::{doc, Document};
use serde_json::json;

use mongo_mcp_server::content::data_from_untrusted_content;

use support::{harness_with, is_error, result_text, test_config, FakeProvider};

fn road(
    id: i64,
    from: i64,
    to: i64,
    coords: [[f64; 2]; 2],
    length: f64,
    cost: f64,
    gates: Vec<Document>,
) -> Document {
    doc! {
        "_id": id,
        "geometry": {
            "type": "LineString",
            "coordinates": [ [coords[0][0], coords[0][1]], [coords[1][0], coords[1][1]] ],
        },
        "from_junction": from,
        "to_junction": to,
        "length": length,
        "cost": cost,
        "name": format!("Road {id}"),
        "category": "primary",
        "max_speed": 10.0,
        "gates": gates,
    }
}

fn gate(aoi: i64, kind: &str, lon: f64, lat: f64) -> Document {
    doc! { "aoi_id": aoi, "type": kind, "coordinates": [lon, lat] }
}

/// Extract the JSON summary from the untrusted block of a result.
fn summary(result_text: &str) -> serde_json::Value {
    let payload = data_from_untrusted_content(result_text).expect("untrusted block present");
    serde_json::from_str(payload).expect("valid JSON summary")
}

#[tokio::test]
async fn shortest_path_takes_the_cheaper_detour() {
    // 1-2 cost 5, 1-3 cost 2, 3-2 cost 2, 2-4 cost 1: best 1 -> 3 -> 2 -> 4.
    let roads = vec![
        road(100, 1, 2, [[0.0, 0.0], [1.0, 0.0]], 500.0, 5.0, vec![]),
        road(101, 1, 3, [[0.0, 0.0], [0.0, 1.0]], 200.0, 2.0, vec![]),
        road(102, 3, 2, [[0.0, 1.0], [1.0, 0.0]], 200.0, 2.0, vec![]),
        road(103, 2, 4, [[1.0, 0.0], [2.0, 0.0]], 100.0, 1.0, vec![]),
        // A junction point feature mixed into the collection is skipped.
        doc! { "_id": 900_i64, "geometry": { "type": "Point", "coordinates": [0.0, 0.0] } },
    ];
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents("map", "roads", roads),
    );

    let result = h
        .call(
            "shortest_path",
            json!({
                "database": "map",
                "collection": "roads",
                "startJunction": 1,
                "endJunction": 4,
                "weightField": "cost",
            }),
        )
        .await;

    let text = result_text(&result);
    assert!(!is_error(&result), "{text}");
    let summary = summary(&text);
    assert_eq!(summary["path"], json!([1, 3, 2, 4]));
    assert_eq!(summary["totalCost"].as_f64().unwrap(), 5.0);
}

#[tokio::test]
async fn shortest_path_reports_missing_junctions() {
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents(
            "map",
            "roads",
            vec![road(1, 1, 2, [[0.0, 0.0], [1.0, 0.0]], 100.0, 1.0, vec![])],
        ),
    );
    let result = h
        .call(
            "shortest_path",
            json!({
                "database": "map",
                "collection": "roads",
                "startJunction": 1,
                "endJunction": 99,
            }),
        )
        .await;
    assert!(is_error(&result));
    assert!(result_text(&result).contains("Junction not found"));
}

#[tokio::test]
async fn disconnected_junctions_yield_a_non_error_no_route_answer() {
    let roads = vec![
        road(1, 1, 2, [[0.0, 0.0], [1.0, 0.0]], 100.0, 1.0, vec![]),
        road(2, 3, 4, [[5.0, 0.0], [6.0, 0.0]], 100.0, 1.0, vec![]),
    ];
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents("map", "roads", roads),
    );
    let result = h
        .call(
            "shortest_path",
            json!({
                "database": "map",
                "collection": "roads",
                "startJunction": 1,
                "endJunction": 4,
            }),
        )
        .await;
    assert!(!is_error(&result), "{}", result_text(&result));
    assert!(result_text(&result).contains("No route exists"));
}

#[tokio::test]
async fn gate_route_splits_the_start_road_and_reuses_end_junction() {
    // Road 1 runs one degree of longitude (stored length 1000 m) with the
    // AOI 100 gate a quarter of the way along; road 2 continues east and
    // carries the AOI 200 gate exactly on its far endpoint.
    let roads = vec![
        road(
            1,
            1,
            2,
            [[0.0, 0.0], [1.0, 0.0]],
            1000.0,
            100.0,
            vec![gate(100, "walking", 0.25, 0.0)],
        ),
        road(
            2,
            2,
            3,
            [[1.0, 0.0], [2.0, 0.0]],
            500.0,
            50.0,
            vec![gate(200, "driving", 2.0, 0.0)],
        ),
    ];
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents("map", "roads", roads),
    );

    let result = h
        .call(
            "shortest_path_from_gates",
            json!({
                "database": "map",
                "collection": "roads",
                "startRoadId": 1,
                "startAoiId": 100,
                "endRoadId": 2,
                "endAoiId": 200,
                "mode": "walking",
                "includeRoadDetails": true,
            }),
        )
        .await;

    let text = result_text(&result);
    assert!(!is_error(&result), "{text}");
    let summary = summary(&text);

    // Walk the to-side of the split (750 m) plus road 2 (500 m).
    let total_length = summary["totalLength"].as_f64().unwrap();
    assert!((total_length - 1250.0).abs() < 2.0, "got {total_length}");

    let path: Vec<i64> = summary["path"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    // Starts at a synthetic junction, ends at the reused junction 3.
    assert!(path.first().unwrap() >= &60_000_000_000_i64, "{path:?}");
    assert_eq!(*path.last().unwrap(), 3);

    let roads = summary["roads"].as_array().unwrap();
    assert_eq!(roads.len(), 2, "{roads:?}");
}

#[tokio::test]
async fn walking_gate_is_not_acceptable_for_driving() {
    let roads = vec![
        road(
            1,
            1,
            2,
            [[0.0, 0.0], [1.0, 0.0]],
            1000.0,
            100.0,
            vec![gate(100, "walking", 0.25, 0.0)],
        ),
        road(
            2,
            2,
            3,
            [[1.0, 0.0], [2.0, 0.0]],
            500.0,
            50.0,
            vec![gate(200, "driving", 2.0, 0.0)],
        ),
    ];
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents("map", "roads", roads),
    );

    let result = h
        .call(
            "shortest_path_from_gates",
            json!({
                "database": "map",
                "collection": "roads",
                "startRoadId": 1,
                "startAoiId": 100,
                "endRoadId": 2,
                "endAoiId": 200,
                "mode": "driving",
            }),
        )
        .await;

    assert!(is_error(&result));
    let text = result_text(&result);
    assert!(text.contains("no gate for AOI 100"), "{text}");
}

#[tokio::test]
async fn aoi_lookup_by_exact_name() {
    let aois = vec![
        doc! { "_id": 1_i64, "name": "Central Park", "kind": "park" },
        doc! { "_id": 2_i64, "name": "Central Station", "kind": "station" },
    ];
    let h = harness_with(
        test_config(),
        FakeProvider::new().with_documents("map", "aois", aois),
    );

    let result = h
        .call(
            "get_aois_by_poi",
            json!({
                "database": "map",
                "collection": "aois",
                "name": "Central Park",
                "exactMatch": true,
            }),
        )
        .await;

    let text = result_text(&result);
    assert!(!is_error(&result), "{text}");
    assert!(text.contains("Found 1 AOI(s)"), "{text}");
    assert!(text.contains("Central Park"), "{text}");
}
