// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon validity repair and cleanup
//!
//! Raw annotation polygons are frequently self-intersecting, carry razor-thin
//! spikes or leave sub-millimetre gaps between neighbours. The functions here
//! turn them into valid `geo` geometry with a fixed chain of strategies:
//!
//! 1. keep the input as-is when it is already valid
//! 2. zero-width buffer (splits bow-ties into their lobes)
//! 3. unary union (resolves self-overlaps between members)
//! 4. buffer then negative buffer (closes small gaps)
//!
//! When a single polygon is required, components below an adaptive area
//! threshold are discarded until exactly one remains.

use crate::error::{Error, Result};
use crate::primitives::{coord_distance, EPSILON_2D};
use geo::{
    unary_union, Area, Buffer, Coord, Geometry, Line, MapCoords, MinimumRotatedRect,
    MultiPolygon, Polygon, RemoveRepeatedPoints, Validation,
};

/// Configuration for the repair chain
#[derive(Debug, Clone)]
pub struct RepairConfig {
    /// Fractions of the largest component's area below which other components
    /// are dropped when a single polygon is required. Tried in order.
    pub small_component_fractions: Vec<f64>,

    /// Buffer distance used by the gap-closing strategy. Default: 1e-6
    pub gap_closing_distance: f64,

    /// Interior rings below this area are removed by [`remove_small_holes`]. Default: 0.01
    pub min_hole_area: f64,

    /// Parts thinner than this are removed by [`remove_small_lines`]. Default: 0.01
    pub min_line_width: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            small_component_fractions: vec![0.001, 0.005, 0.01, 0.05],
            gap_closing_distance: 1e-6,
            min_hole_area: 0.01,
            min_line_width: 0.01,
        }
    }
}

/// Splits any polygonal geometry into its polygon components.
///
/// Non-areal members (points, lines) are ignored.
pub fn as_multipolygon(geometry: &Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
        Geometry::MultiPolygon(mp) => mp.clone(),
        Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
        Geometry::Triangle(t) => MultiPolygon::new(vec![t.to_polygon()]),
        Geometry::GeometryCollection(gc) => {
            MultiPolygon::new(gc.iter().flat_map(|g| as_multipolygon(g).0).collect())
        }
        _ => MultiPolygon::new(vec![]),
    }
}

/// Rounds every coordinate to `decimals` places and drops repeated vertices.
pub fn round_polygon(polygon: &Polygon<f64>, decimals: i32) -> Polygon<f64> {
    let factor = 10f64.powi(decimals);
    polygon
        .map_coords(|c| Coord {
            x: (c.x * factor).round() / factor,
            y: (c.y * factor).round() / factor,
        })
        .remove_repeated_points()
}

pub fn round_multipolygon(mp: &MultiPolygon<f64>, decimals: i32) -> MultiPolygon<f64> {
    MultiPolygon::new(mp.0.iter().map(|p| round_polygon(p, decimals)).collect())
}

/// Buffers outward then inward by `distance`, closing gaps narrower than
/// twice the distance.
pub fn close_gaps(mp: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    if distance <= 0.0 || mp.0.is_empty() {
        return mp.clone();
    }
    mp.buffer(distance).buffer(-distance)
}

/// Removes parts narrower than `min_width` (dangling lines, spikes).
pub fn remove_small_lines(mp: &MultiPolygon<f64>, min_width: f64) -> MultiPolygon<f64> {
    if min_width <= 0.0 || mp.0.is_empty() {
        return mp.clone();
    }
    let half = min_width / 2.0;
    drop_empty(mp.buffer(-half).buffer(half))
}

/// Removes interior rings smaller than `min_area` after a buffer round-trip.
pub fn remove_small_holes(polygon: &Polygon<f64>, config: &RepairConfig) -> MultiPolygon<f64> {
    let closed = close_gaps(
        &MultiPolygon::new(vec![polygon.clone()]),
        config.gap_closing_distance,
    );
    let polygons = closed
        .0
        .into_iter()
        .map(|p| {
            let (exterior, interiors) = p.into_inner();
            let interiors = interiors
                .into_iter()
                .filter(|ring| {
                    Polygon::new(ring.clone(), vec![]).unsigned_area() >= config.min_hole_area
                })
                .collect();
            Polygon::new(exterior, interiors)
        })
        .collect();
    drop_empty(MultiPolygon::new(polygons))
}

fn drop_empty(mp: MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(
        mp.0.into_iter()
            .filter(|p| p.unsigned_area() > EPSILON_2D)
            .collect(),
    )
}

fn is_valid_multipolygon(mp: &MultiPolygon<f64>) -> bool {
    mp.is_valid() && mp.0.iter().all(|p| p.unsigned_area() > EPSILON_2D)
}

/// Keeps only the dominant component, trying each area fraction in turn.
fn reduce_to_single(mp: &MultiPolygon<f64>, fractions: &[f64]) -> Option<Polygon<f64>> {
    match mp.0.len() {
        0 => return None,
        1 => return Some(mp.0[0].clone()),
        _ => {}
    }
    let largest = mp
        .0
        .iter()
        .map(|p| p.unsigned_area())
        .fold(0.0, f64::max);

    fractions.iter().find_map(|fraction| {
        let threshold = largest * fraction;
        let kept: Vec<&Polygon<f64>> = mp
            .0
            .iter()
            .filter(|p| p.unsigned_area() >= threshold)
            .collect();
        (kept.len() == 1).then(|| kept[0].clone())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Identity,
    ZeroBuffer,
    UnaryUnion,
    CloseGaps,
}

impl Strategy {
    const CHAIN: [Strategy; 4] = [
        Strategy::Identity,
        Strategy::ZeroBuffer,
        Strategy::UnaryUnion,
        Strategy::CloseGaps,
    ];

    fn apply(self, mp: &MultiPolygon<f64>, config: &RepairConfig) -> MultiPolygon<f64> {
        match self {
            Strategy::Identity => mp.clone(),
            Strategy::ZeroBuffer => mp.buffer(0.0),
            Strategy::UnaryUnion => unary_union(mp.0.iter()),
            Strategy::CloseGaps => {
                close_gaps(&unary_union(mp.0.iter()), config.gap_closing_distance)
            }
        }
    }
}

/// Returns a valid version of the geometry.
///
/// With `force_single`, the result holds exactly one polygon or the call
/// fails with [`Error::InvalidShape`]. A geometry that is already valid is
/// returned unchanged, so the function is idempotent.
pub fn ensure_geometry_validity(
    mp: &MultiPolygon<f64>,
    force_single: bool,
    config: &RepairConfig,
) -> Result<MultiPolygon<f64>> {
    for strategy in Strategy::CHAIN {
        let repaired = drop_empty(strategy.apply(mp, config));
        // A strategy that erased a non-empty input did not repair it
        if !is_valid_multipolygon(&repaired) || (repaired.0.is_empty() && !mp.0.is_empty()) {
            continue;
        }
        if !force_single {
            if strategy != Strategy::Identity {
                tracing::debug!(?strategy, "repaired invalid geometry");
            }
            return Ok(repaired);
        }
        if let Some(single) = reduce_to_single(&repaired, &config.small_component_fractions) {
            if strategy != Strategy::Identity || repaired.0.len() > 1 {
                tracing::debug!(
                    ?strategy,
                    components = repaired.0.len(),
                    "reduced geometry to a single valid polygon"
                );
            }
            return Ok(MultiPolygon::new(vec![single]));
        }
    }

    if force_single {
        return Err(Error::InvalidShape(format!(
            "no repair strategy produced a single valid polygon from {} component(s)",
            mp.0.len()
        )));
    }
    tracing::warn!(
        components = mp.0.len(),
        "geometry could not be repaired, returning empty geometry"
    );
    Ok(MultiPolygon::new(vec![]))
}

/// Single-polygon convenience wrapper over [`ensure_geometry_validity`].
pub fn ensure_polygon_validity(polygon: &Polygon<f64>, config: &RepairConfig) -> Result<Polygon<f64>> {
    let mut repaired = ensure_geometry_validity(
        &MultiPolygon::new(vec![polygon.clone()]),
        true,
        config,
    )?;
    repaired
        .0
        .pop()
        .ok_or_else(|| Error::InvalidShape("repair produced no polygon".to_string()))
}

/// The two axes of a rectangle-like polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterLines {
    /// From the midpoint of the shortest side to the midpoint of its opposite side.
    pub long_axis: Line<f64>,
    /// From the midpoint of the longest side to the midpoint of its opposite side.
    pub short_axis: Line<f64>,
}

impl CenterLines {
    /// Extent along the long axis.
    pub fn length(&self) -> f64 {
        coord_distance(self.long_axis.start, self.long_axis.end)
    }

    /// Extent along the short axis (thickness of a wall or door step).
    pub fn width(&self) -> f64 {
        coord_distance(self.short_axis.start, self.short_axis.end)
    }
}

fn midpoint(line: &Line<f64>) -> Coord<f64> {
    Coord {
        x: (line.start.x + line.end.x) / 2.0,
        y: (line.start.y + line.end.y) / 2.0,
    }
}

/// Centre line joining the midpoint of `side` to the midpoint of the side most
/// parallel to it.
fn axis_from_side(sides: &[Line<f64>], index: usize) -> Option<Line<f64>> {
    let side = sides[index];
    let (dx, dy) = (side.dx(), side.dy());
    let len = dx.hypot(dy);
    if len < EPSILON_2D {
        return None;
    }
    let opposite = sides
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .filter_map(|(i, other)| {
            let other_len = other.dx().hypot(other.dy());
            (other_len >= EPSILON_2D)
                .then(|| (i, ((dx * other.dx() + dy * other.dy()) / (len * other_len)).abs()))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))?;
    Some(Line::new(midpoint(&side), midpoint(&sides[opposite.0])))
}

/// Extracts the centre lines of a rectangle-like polygon from its minimum
/// rotated rectangle.
pub fn get_center_line_from_rectangle(polygon: &Polygon<f64>) -> Result<CenterLines> {
    let rect = polygon
        .minimum_rotated_rect()
        .ok_or_else(|| Error::DegenerateInput("polygon has no rotated rectangle".to_string()))?;
    let sides: Vec<Line<f64>> = rect.exterior().lines().collect();
    if sides.len() < 4 {
        return Err(Error::DegenerateInput(format!(
            "rotated rectangle has {} sides",
            sides.len()
        )));
    }

    let side_len = |l: &Line<f64>| l.dx().hypot(l.dy());
    let shortest = (0..sides.len())
        .min_by(|&a, &b| side_len(&sides[a]).total_cmp(&side_len(&sides[b])))
        .unwrap_or(0);
    let longest = (0..sides.len())
        .max_by(|&a, &b| side_len(&sides[a]).total_cmp(&side_len(&sides[b])).then(b.cmp(&a)))
        .unwrap_or(0);

    let long_axis = axis_from_side(&sides, shortest)
        .ok_or_else(|| Error::DegenerateInput("rectangle has a zero-length side".to_string()))?;
    let short_axis = axis_from_side(&sides, longest)
        .ok_or_else(|| Error::DegenerateInput("rectangle has a zero-length side".to_string()))?;

    Ok(CenterLines {
        long_axis,
        short_axis,
    })
}
