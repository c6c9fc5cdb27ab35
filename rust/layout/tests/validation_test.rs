// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end checks: annotation JSON in, layout and violations out.

use approx::assert_abs_diff_eq;
use brooks_layout::reconcile::area_records_from_layout;
use brooks_layout::{
    layout_to_json, reconcile_areas, violations_to_json, Annotation, AreaType, EntityKey,
    HeightRange, LayoutConfig, LayoutHandler, LayoutValidator, LengthUnit, MapperOptions,
    Opening, OpeningType, Separator, SeparatorType, SimpleLayout, ViolationType,
};
use geo::{polygon, Area, Polygon};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
    json!([[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]])
}

/// Two rooms side by side in a 500 x 500 box of 20 wide walls. The middle
/// wall has a door between the rooms; the south wall has a door leading
/// nowhere.
fn two_room_plan() -> Annotation {
    Annotation::from_value(json!({
        "width": 500,
        "height": 500,
        "layers": {"layer-1": {
            "vertices": {
                "a": {"x": 0, "y": 0, "lines": ["s", "w"]},
                "b": {"x": 500, "y": 0, "lines": ["s", "e"]},
                "c": {"x": 500, "y": 500, "lines": ["e", "n"]},
                "d": {"x": 0, "y": 500, "lines": ["n", "w"]},
                "m1": {"x": 250, "y": 0, "lines": ["m"]},
                "m2": {"x": 250, "y": 500, "lines": ["m"]}
            },
            "lines": {
                "s": {"type": "wall", "vertices": ["a", "b"], "properties": {"width": 20}},
                "e": {"type": "wall", "vertices": ["b", "c"], "properties": {"width": 20}},
                "n": {"type": "wall", "vertices": ["c", "d"], "properties": {"width": 20}},
                "w": {"type": "wall", "vertices": ["d", "a"], "properties": {"width": 20}},
                "m": {"type": "wall", "vertices": ["m1", "m2"], "properties": {"width": 20}}
            },
            "holes": {
                "inner": {
                    "type": "door",
                    "line": "m",
                    "coordinates": rect(240.0, 200.0, 260.0, 280.0),
                    "door_sweeping_points": {
                        "angle_point": [250, 200],
                        "closed_point": [250, 280],
                        "opened_point": [330, 200]
                    }
                },
                "outer": {
                    "type": "door",
                    "line": "s",
                    "coordinates": rect(80.0, -10.0, 160.0, 10.0),
                    "door_sweeping_points": {
                        "angle_point": [80, 0],
                        "closed_point": [160, 0],
                        "opened_point": [80, 80]
                    }
                }
            }
        }}
    }))
    .unwrap()
}

fn handler() -> LayoutHandler {
    LayoutHandler::new(two_room_plan(), MapperOptions::default())
}

#[test]
fn test_unconnected_door_yields_exactly_one_violation() {
    let handler = handler();
    let layout = handler.get_layout(LayoutConfig::default()).unwrap();
    assert_eq!(layout.num_spaces(), 2);
    assert_eq!(layout.num_openings(), 2);

    let (outer, _) = layout
        .openings()
        .find(|(_, o)| o.source_id.as_deref() == Some("outer"))
        .unwrap();

    let violations = LayoutValidator::new(&layout).validate();
    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(violations[0].violation_type, ViolationType::DoorNotConnectingAreas);
    assert_eq!(violations[0].entity, EntityKey::Opening(outer));
}

#[test]
fn test_scaled_layout_yields_the_same_findings() {
    let handler = handler();
    let config = LayoutConfig {
        scaled: true,
        postprocessed: true,
        ..LayoutConfig::default()
    };
    let layout = handler.get_layout(config).unwrap();
    assert_eq!(layout.unit(), LengthUnit::Meters);
    let types: Vec<ViolationType> = LayoutValidator::new(&layout)
        .validate()
        .into_iter()
        .map(|v| v.violation_type)
        .collect();
    assert_eq!(types, vec![ViolationType::DoorNotConnectingAreas]);
}

#[test]
fn test_validator_is_deterministic() {
    let layout = handler().get_layout(LayoutConfig::default()).unwrap();
    let first = violations_to_json(&LayoutValidator::new(&layout).validate()).to_string();
    let second = violations_to_json(&LayoutValidator::new(&layout).validate()).to_string();
    assert_eq!(first, second);

    // A fresh assembly of the same annotation reports identically
    let again = handler().get_layout(LayoutConfig::default()).unwrap();
    let third = violations_to_json(&LayoutValidator::new(&again).validate()).to_string();
    assert_eq!(first, third);
    assert_eq!(layout_to_json(&layout), layout_to_json(&again));
}

#[test]
fn test_handler_memoizes_per_configuration() {
    let handler = handler();
    let raw = handler.get_layout(LayoutConfig::default()).unwrap();
    let scaled_config = LayoutConfig {
        scaled: true,
        ..LayoutConfig::default()
    };
    let scaled = handler.get_layout(scaled_config).unwrap();
    assert!(Rc::ptr_eq(&scaled, &handler.get_layout(scaled_config).unwrap()));
    assert!(Rc::ptr_eq(&raw, &handler.get_layout(LayoutConfig::default()).unwrap()));
    assert_eq!(handler.cached_layouts(), 2);
    assert_abs_diff_eq!(raw.net_area() * 1e-4, scaled.net_area(), epsilon = 1e-9);
}

#[test]
fn test_spaces_partition_into_their_areas() {
    let layout = handler().get_layout(LayoutConfig::default()).unwrap();
    for (key, space) in layout.spaces() {
        assert_abs_diff_eq!(
            layout.space_net_area(key),
            space.footprint.unsigned_area(),
            epsilon = 1e-3
        );
    }
    // Clear width: 10..240 and 260..490, height 10..490
    assert_abs_diff_eq!(layout.net_area(), 2.0 * 230.0 * 480.0, epsilon = 1e-2);
}

#[test]
fn test_reconciliation_against_records_of_the_same_plan() {
    let layout = handler().get_layout(LayoutConfig::default()).unwrap();
    let lookup = BTreeMap::from([(42u64, area_records_from_layout(&layout))]);
    let result = reconcile_areas(&layout, &lookup, 42, true).unwrap();
    assert!(result.is_consistent());
    assert_eq!(result.matched.len(), 2);

    // Records of another plan do not match
    let err = reconcile_areas(&layout, &lookup, 7, true).unwrap_err();
    assert!(matches!(err, brooks_layout::Error::AreaMismatch { .. }));
}

// =============================================================================
// Opening overlap symmetry
// =============================================================================

fn square(x0: f64, y0: f64, w: f64, h: f64) -> Polygon<f64> {
    polygon![(x: x0, y: y0), (x: x0 + w, y: y0), (x: x0 + w, y: y0 + h), (x: x0, y: y0 + h)]
}

fn window(footprint: Polygon<f64>) -> Opening {
    Opening::new(OpeningType::Window, footprint, HeightRange::new(90.0, 210.0), None).unwrap()
}

/// Layout with two overlapping windows on one wall, inserted in the given order.
fn overlapping_windows(first: Polygon<f64>, second: Polygon<f64>) -> SimpleLayout {
    let mut layout = SimpleLayout::new();
    let wall = layout.add_separator(Separator::new(
        SeparatorType::Wall,
        square(0.0, 0.0, 400.0, 20.0),
        HeightRange::new(0.0, 260.0),
    ));
    layout.add_opening(wall, window(first)).unwrap();
    layout.add_opening(wall, window(second)).unwrap();
    let space = layout.add_space(square(0.0, 20.0, 400.0, 300.0));
    layout
        .add_area(space, square(0.0, 20.0, 400.0, 300.0), AreaType::Room)
        .unwrap();
    layout
}

fn flagged_overlaps(layout: &SimpleLayout) -> Vec<f64> {
    LayoutValidator::new(layout)
        .check_openings_do_not_overlap()
        .into_iter()
        .map(|v| {
            assert_eq!(v.violation_type, ViolationType::OpeningOverlapsAnotherOpening);
            v.footprint_area
        })
        .collect()
}

#[test]
fn test_opening_overlap_is_symmetric() {
    let big = square(100.0, 0.0, 120.0, 20.0);
    let small = square(180.0, 0.0, 80.0, 20.0);
    let forward = flagged_overlaps(&overlapping_windows(big.clone(), small.clone()));
    let backward = flagged_overlaps(&overlapping_windows(small, big));
    assert_eq!(forward, backward);
    assert_eq!(forward, vec![1600.0]);
}

#[test]
fn test_equal_openings_flag_one_of_the_pair() {
    let a = square(100.0, 0.0, 80.0, 20.0);
    let b = square(120.0, 0.0, 80.0, 20.0);
    let layout = overlapping_windows(a, b);
    let violations = LayoutValidator::new(&layout).check_openings_do_not_overlap();
    assert_eq!(violations.len(), 1);
    // The tie goes to the later key
    let (last, _) = layout.openings().last().unwrap();
    assert_eq!(violations[0].entity, EntityKey::Opening(last));
}
