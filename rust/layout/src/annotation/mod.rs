// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw editor annotation documents
//!
//! The document shape is `{ width, height, layers: { id: Layer } }`. Every
//! collection is keyed by a stable string id and stored in a `BTreeMap`, so
//! iteration order is the id order regardless of the JSON key order.
//! Vertex/line back references are plain id lists, never owning pointers.

mod validation;

pub use validation::{validate_and_fix, AutoFix, AutoFixReport, VERTEX_TOLERANCE};

use crate::error::Result;
use geo::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A measurement written either as a bare number or as `{"value": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Value(f64),
    Object { value: f64 },
}

impl Measure {
    pub fn value(&self) -> f64 {
        match self {
            Measure::Value(v) | Measure::Object { value: v } => *v,
        }
    }
}

/// A polygon written as a list of rings, exterior first.
pub type RawRings = Vec<Vec<[f64; 2]>>;

/// Builds a polygon from raw rings. Returns `None` when there is no exterior
/// ring with at least three points.
pub fn polygon_from_rings(rings: &[Vec<[f64; 2]>]) -> Option<Polygon<f64>> {
    let to_ring = |ring: &Vec<[f64; 2]>| {
        LineString::from(
            ring.iter()
                .map(|[x, y]| Coord { x: *x, y: *y })
                .collect::<Vec<_>>(),
        )
    };
    let (exterior, interiors) = rings.split_first()?;
    if exterior.len() < 3 {
        return None;
    }
    Some(Polygon::new(
        to_ring(exterior),
        interiors.iter().filter(|r| r.len() >= 3).map(to_ring).collect(),
    ))
}

/// A complete annotation document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub layers: BTreeMap<String, Layer>,
}

impl Annotation {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Looks up a line in any layer.
    pub fn line(&self, id: &str) -> Option<&RawLine> {
        self.layers.values().find_map(|l| l.lines.get(id))
    }
}

/// One drawing layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default)]
    pub vertices: BTreeMap<String, RawVertex>,
    #[serde(default)]
    pub lines: BTreeMap<String, RawLine>,
    #[serde(default)]
    pub holes: BTreeMap<String, RawHole>,
    #[serde(default)]
    pub areas: BTreeMap<String, RawArea>,
    #[serde(default)]
    pub items: BTreeMap<String, RawItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVertex {
    pub x: f64,
    pub y: f64,
    /// Lines using this vertex
    #[serde(default)]
    pub lines: Vec<String>,
}

impl RawVertex {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineProperties {
    #[serde(default)]
    pub width: Option<Measure>,
    #[serde(default)]
    pub height: Option<Measure>,
}

/// A separator line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    #[serde(rename = "type")]
    pub line_type: String,
    #[serde(default)]
    pub vertices: Vec<String>,
    #[serde(rename = "auxVertices", default)]
    pub aux_vertices: Vec<String>,
    #[serde(default)]
    pub properties: LineProperties,
    /// Explicit footprint, preferred over the widened vertex segment
    #[serde(default)]
    pub coordinates: RawRings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoleHeights {
    #[serde(default)]
    pub lower_edge: Option<f64>,
    #[serde(default)]
    pub upper_edge: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoleProperties {
    #[serde(default)]
    pub width: Option<Measure>,
    #[serde(default)]
    pub length: Option<Measure>,
    #[serde(default)]
    pub altitude: Option<Measure>,
    #[serde(default)]
    pub heights: Option<HoleHeights>,
}

/// Hinge, closed and opened points of a swinging door as stored by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoorSweepingPoints {
    pub angle_point: [f64; 2],
    pub closed_point: [f64; 2],
    pub opened_point: [f64; 2],
}

/// A door or window hosted by a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHole {
    #[serde(rename = "type")]
    pub hole_type: String,
    pub line: String,
    #[serde(default)]
    pub properties: HoleProperties,
    #[serde(default)]
    pub coordinates: RawRings,
    #[serde(default)]
    pub door_sweeping_points: Option<DoorSweepingPoints>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaProperties {
    #[serde(rename = "areaType", default)]
    pub area_type: Option<String>,
}

/// A labelled area drawn in the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArea {
    #[serde(default)]
    pub coords: RawRings,
    #[serde(default)]
    pub properties: AreaProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    #[serde(default)]
    pub width: Option<Measure>,
    #[serde(default)]
    pub length: Option<Measure>,
}

/// A fixture placed in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Rotation in degrees, counter-clockwise
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub properties: ItemProperties,
    #[serde(default)]
    pub coordinates: RawRings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_document() {
        let doc = Annotation::from_value(json!({
            "width": 1000,
            "height": 800,
            "layers": {
                "layer-1": {
                    "vertices": {
                        "a": {"x": 0, "y": 0, "lines": ["l1"]},
                        "b": {"x": 100, "y": 0, "lines": ["l1"]}
                    },
                    "lines": {
                        "l1": {
                            "type": "wall",
                            "vertices": ["a", "b"],
                            "properties": {"width": {"value": 20}, "height": 260}
                        }
                    }
                }
            }
        }))
        .unwrap();

        let layer = &doc.layers["layer-1"];
        let line = &layer.lines["l1"];
        assert_eq!(line.line_type, "wall");
        assert_eq!(line.properties.width.map(|m| m.value()), Some(20.0));
        assert_eq!(line.properties.height.map(|m| m.value()), Some(260.0));
        assert!(line.coordinates.is_empty());
        assert!(layer.holes.is_empty());
        assert!(doc.line("l1").is_some());
    }

    #[test]
    fn test_parse_hole_with_sweeping_points() {
        let hole: RawHole = serde_json::from_value(json!({
            "type": "door",
            "line": "l1",
            "properties": {"heights": {"lower_edge": 0, "upper_edge": 200}},
            "coordinates": [[[0, 0], [80, 0], [80, 20], [0, 20], [0, 0]]],
            "door_sweeping_points": {
                "angle_point": [0, 10],
                "closed_point": [80, 10],
                "opened_point": [0, 90]
            }
        }))
        .unwrap();
        assert_eq!(hole.properties.heights.and_then(|h| h.upper_edge), Some(200.0));
        let footprint = polygon_from_rings(&hole.coordinates).unwrap();
        assert_eq!(footprint.unsigned_area(), 1600.0);
        assert!(hole.door_sweeping_points.is_some());
    }

    #[test]
    fn test_polygon_from_rings_rejects_degenerate() {
        assert!(polygon_from_rings(&[]).is_none());
        assert!(polygon_from_rings(&[vec![[0.0, 0.0], [1.0, 1.0]]]).is_none());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(Annotation::from_json("{\"layers\": 3}").is_err());
    }
}
