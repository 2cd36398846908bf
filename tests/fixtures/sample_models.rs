// Helper functions to build test models with various configurations
#![allow(dead_code)]

use diagram_model::{CellKey, Geometry, GraphModel, Style};
use serde_json::json;

/// Add a plain vertex with the given id and bounds
pub fn vertex(model: &mut GraphModel, parent: CellKey, id: &str, x: f32, y: f32, w: f32, h: f32) -> CellKey {
    model
        .add_vertex(parent, Some(id), json!(id), Geometry::new(x, y, w, h), Style::new())
        .unwrap()
}

/// Add a swimlane with the given orientation
pub fn swimlane(model: &mut GraphModel, parent: CellKey, id: &str, horizontal: bool, w: f32, h: f32) -> CellKey {
    model
        .add_vertex(parent, Some(id), json!(id), Geometry::new(0.0, 0.0, w, h), Style::swimlane(horizontal))
        .unwrap()
}

/// Model with two vertices "a" and "b" connected by edge "e" on the default layer
pub fn create_connected_pair() -> (GraphModel, CellKey, CellKey, CellKey) {
    let mut model = GraphModel::new();
    let layer = model.default_parent().unwrap();

    let a = vertex(&mut model, layer, "a", 0.0, 0.0, 40.0, 40.0);
    let b = vertex(&mut model, layer, "b", 100.0, 0.0, 40.0, 40.0);
    let e = model.add_edge(layer, Some("e"), json!(null), Some(a), Some(b)).unwrap();

    (model, a, b, e)
}

/// Two groups on the default layer, each holding two vertices:
/// "g1" at (100, 100) with "v1", "v2" and "g2" at (400, 100) with "v3", "v4"
pub fn create_two_groups() -> (GraphModel, [CellKey; 2], [CellKey; 4]) {
    let mut model = GraphModel::new();
    let layer = model.default_parent().unwrap();

    let g1 = vertex(&mut model, layer, "g1", 100.0, 100.0, 200.0, 200.0);
    let g2 = vertex(&mut model, layer, "g2", 400.0, 100.0, 200.0, 200.0);
    let v1 = vertex(&mut model, g1, "v1", 10.0, 10.0, 30.0, 30.0);
    let v2 = vertex(&mut model, g1, "v2", 100.0, 10.0, 30.0, 30.0);
    let v3 = vertex(&mut model, g2, "v3", 10.0, 10.0, 30.0, 30.0);
    let v4 = vertex(&mut model, g2, "v4", 100.0, 10.0, 30.0, 30.0);

    (model, [g1, g2], [v1, v2, v3, v4])
}

/// Source model for merges: "a" holding "a1", "a2" and edge "e1" from "a1" to "a2"
pub fn create_merge_source() -> (GraphModel, CellKey) {
    let mut model = GraphModel::new();
    let layer = model.default_parent().unwrap();

    let a = vertex(&mut model, layer, "a", 0.0, 0.0, 300.0, 200.0);
    let a1 = vertex(&mut model, a, "a1", 10.0, 10.0, 40.0, 40.0);
    let a2 = vertex(&mut model, a, "a2", 100.0, 10.0, 40.0, 40.0);
    model.add_edge(a, Some("e1"), json!("link"), Some(a1), Some(a2)).unwrap();

    (model, a)
}

/// Target model for merges: a single vertex "b" on the default layer
pub fn create_merge_target() -> (GraphModel, CellKey) {
    let mut model = GraphModel::new();
    let layer = model.default_parent().unwrap();
    let b = vertex(&mut model, layer, "b", 0.0, 0.0, 300.0, 200.0);
    (model, b)
}
