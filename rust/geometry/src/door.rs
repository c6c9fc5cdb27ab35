// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door footprints and sweeping points
//!
//! A swinging door is described by three points: the hinge (`angle_point`),
//! the leaf tip in closed position (`closed_point`) and the leaf tip when
//! opened by 90 degrees (`opened_point`). They come either from an editor hole
//! record or from a CAD door symbol, i.e. a leaf line paired with its swing arc.
//!
//! The CAD path:
//! 1. pair each arc with its nearest line (global greedy, closest pair first)
//! 2. classify arc endpoints into opening (far from the line) and closing (near)
//! 3. snap hinge and closing points onto the nearest wall boundary
//! 4. door width = short side of the nearest wall's rotated rectangle
//! 5. extension side from the sign of the hinge cross product
//! 6. door step = hinge-closing segment widened towards the extension side
//! 7. sweep points shifted to the middle of the door step
//!
//! Editor annotations carry no arcs, so layout assembly only uses
//! [`DoorSynthesizer::door_width_at`]; the CAD path serves drawing imports.

use crate::error::{Error, Result};
use crate::primitives::{
    closest_point_on_boundary, closest_point_on_linestring, coord_distance, cross,
    distance_to_polygon, left_normal, point_segment_distance, rectangle_from_segment,
    rotate_around, to_coord, to_vector, EPSILON_2D,
};
use crate::repair::get_center_line_from_rectangle;
use geo::{Coord, LineString, Point, Polygon};
use std::f64::consts::FRAC_PI_2;

/// Door width used when no wall is found near the hinge (20 cm interior wall).
pub const DEFAULT_DOOR_WIDTH: f64 = 20.0;

/// Side of the hinge-closing segment the door step extends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionType {
    Left,
    Right,
}

impl ExtensionType {
    /// Extension side for a door hinged at `axis` that closes towards
    /// `closing` and opens towards `opening`.
    ///
    /// A positive cross product puts the opening on the left, so the step
    /// extends to the right; a negative one extends to the left. Collinear
    /// points carry no side and yield `None`.
    pub fn from_points(axis: Coord<f64>, closing: Coord<f64>, opening: Coord<f64>) -> Option<Self> {
        let c = cross(axis, closing, opening);
        if c > EPSILON_2D {
            Some(ExtensionType::Right)
        } else if c < -EPSILON_2D {
            Some(ExtensionType::Left)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionType::Left => "LEFT",
            ExtensionType::Right => "RIGHT",
        }
    }
}

/// Hinge, closed and opened positions of a swinging door
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepingPoints {
    pub angle_point: Point<f64>,
    pub closed_point: Point<f64>,
    pub opened_point: Point<f64>,
}

impl SweepingPoints {
    /// Sweep points for a door hinged at `axis` whose step extends to
    /// `extension` by `door_width`.
    ///
    /// Hinge and closed points move to the middle of the door step; the
    /// opened point is the closed point rotated a quarter turn around the
    /// hinge, counter-clockwise for right extensions and clockwise for left.
    pub fn from_door_step(
        axis: Coord<f64>,
        closed: Coord<f64>,
        extension: ExtensionType,
        door_width: f64,
    ) -> Result<Self> {
        let n = left_normal(axis, closed)?;
        let half = door_width / 2.0;
        let (shift, angle) = match extension {
            ExtensionType::Right => (-n * half, FRAC_PI_2),
            ExtensionType::Left => (n * half, -FRAC_PI_2),
        };
        let angle_point = to_coord(&(to_vector(axis) + shift));
        let closed_point = to_coord(&(to_vector(closed) + shift));
        let opened_point = rotate_around(closed_point, angle_point, angle);
        Ok(Self {
            angle_point: angle_point.into(),
            closed_point: closed_point.into(),
            opened_point: opened_point.into(),
        })
    }

    /// Door leaf length (hinge to closed tip)
    pub fn leaf_length(&self) -> f64 {
        coord_distance(self.angle_point.0, self.closed_point.0)
    }

    /// Extension side implied by where the opened leaf lies.
    pub fn extension_type(&self) -> Option<ExtensionType> {
        ExtensionType::from_points(self.angle_point.0, self.closed_point.0, self.opened_point.0)
    }
}

/// A synthesized door: step footprint plus sweep description
#[derive(Debug, Clone, PartialEq)]
pub struct DoorGeometry {
    pub footprint: Polygon<f64>,
    pub sweeping_points: SweepingPoints,
    pub extension_type: ExtensionType,
    pub door_width: f64,
}

impl DoorGeometry {
    /// Builds the door step and sweep points from hinge and closed positions
    /// lying on a wall face.
    pub fn from_points(
        axis: Coord<f64>,
        closed: Coord<f64>,
        extension: ExtensionType,
        door_width: f64,
    ) -> Result<Self> {
        if door_width <= 0.0 {
            return Err(Error::DegenerateInput(format!(
                "non-positive door width {door_width}"
            )));
        }
        let footprint = match extension {
            ExtensionType::Left => rectangle_from_segment(axis, closed, door_width, 0.0)?,
            ExtensionType::Right => rectangle_from_segment(axis, closed, 0.0, door_width)?,
        };
        let sweeping_points = SweepingPoints::from_door_step(axis, closed, extension, door_width)?;
        Ok(Self {
            footprint,
            sweeping_points,
            extension_type: extension,
            door_width,
        })
    }
}

/// A door swing arc, approximated by a polyline
#[derive(Debug, Clone, PartialEq)]
pub struct CadArc {
    pub points: LineString<f64>,
}

impl CadArc {
    pub fn new(points: LineString<f64>) -> Self {
        Self { points }
    }

    /// First and last point of the arc
    pub fn endpoints(&self) -> Option<(Coord<f64>, Coord<f64>)> {
        Some((*self.points.0.first()?, *self.points.0.last()?))
    }
}

/// A straight CAD segment (door leaf candidate)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadLine {
    pub start: Coord<f64>,
    pub end: Coord<f64>,
}

impl CadLine {
    pub fn new(start: Coord<f64>, end: Coord<f64>) -> Self {
        Self { start, end }
    }

    pub fn distance_to(&self, p: Coord<f64>) -> f64 {
        point_segment_distance(p, self.start, self.end)
    }

    fn distance_to_arc(&self, arc: &CadArc) -> f64 {
        let to_line = arc
            .points
            .coords()
            .map(|c| self.distance_to(*c))
            .fold(f64::INFINITY, f64::min);
        let to_arc = [self.start, self.end]
            .iter()
            .filter_map(|c| closest_point_on_linestring(&arc.points, *c).map(|(_, d)| d))
            .fold(f64::INFINITY, f64::min);
        to_line.min(to_arc)
    }
}

/// Pairs arcs with lines, closest pairs first.
///
/// Every candidate pair within `max_distance` is queued and consumed in
/// ascending distance order (ties broken by arc then line index); each arc
/// and each line is used at most once. Arcs left without a line are dropped.
/// Returns `(arc_index, line_index)` sorted by arc index.
pub fn pair_arcs_with_lines(
    arcs: &[CadArc],
    lines: &[CadLine],
    max_distance: f64,
) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(f64, usize, usize)> = arcs
        .iter()
        .enumerate()
        .flat_map(|(ai, arc)| {
            lines.iter().enumerate().filter_map(move |(li, line)| {
                let d = line.distance_to_arc(arc);
                (d <= max_distance).then_some((d, ai, li))
            })
        })
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut arc_used = vec![false; arcs.len()];
    let mut line_used = vec![false; lines.len()];
    let mut pairs = Vec::new();
    for (_, ai, li) in candidates {
        if arc_used[ai] || line_used[li] {
            continue;
        }
        arc_used[ai] = true;
        line_used[li] = true;
        pairs.push((ai, li));
    }

    let unpaired = arc_used.iter().filter(|used| !**used).count();
    if unpaired > 0 {
        tracing::warn!(unpaired, "discarding door arcs without a nearby leaf line");
    }

    pairs.sort_unstable();
    pairs
}

/// Configuration for door synthesis from CAD symbols
#[derive(Debug, Clone)]
pub struct DoorSynthesisConfig {
    /// Maximum arc-to-line distance for pairing. Default: 5.0
    pub pairing_distance: f64,
    /// Maximum distance for snapping hinge/closing points onto a wall. Default: 10.0
    pub snapping_distance: f64,
    /// Width used when no wall lies within the snapping distance.
    pub default_door_width: f64,
}

impl Default for DoorSynthesisConfig {
    fn default() -> Self {
        Self {
            pairing_distance: 5.0,
            snapping_distance: 10.0,
            default_door_width: DEFAULT_DOOR_WIDTH,
        }
    }
}

/// Builds doors from CAD arcs and lines against a set of wall polygons.
#[derive(Debug)]
pub struct DoorSynthesizer<'a> {
    walls: &'a [Polygon<f64>],
    config: DoorSynthesisConfig,
}

impl<'a> DoorSynthesizer<'a> {
    pub fn new(walls: &'a [Polygon<f64>], config: DoorSynthesisConfig) -> Self {
        Self { walls, config }
    }

    /// Nearest wall to `p` within the snapping distance, with its distance.
    fn nearest_wall(&self, p: Coord<f64>) -> Option<(&'a Polygon<f64>, f64)> {
        self.walls
            .iter()
            .map(|w| (w, distance_to_polygon(p, w)))
            .filter(|(_, d)| *d <= self.config.snapping_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Moves `p` onto the boundary of the nearest wall, or keeps it unchanged
    /// when no wall is close enough.
    pub fn snap_to_wall(&self, p: Coord<f64>) -> Coord<f64> {
        self.walls
            .iter()
            .filter_map(|w| closest_point_on_boundary(w, p))
            .filter(|(_, d)| *d <= self.config.snapping_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(p, |(snapped, _)| snapped)
    }

    /// Thickness of the wall nearest to `p`, or the configured default.
    pub fn door_width_at(&self, p: Coord<f64>) -> f64 {
        self.nearest_wall(p)
            .and_then(|(wall, _)| get_center_line_from_rectangle(wall).ok())
            .map(|lines| lines.width())
            .filter(|w| *w > EPSILON_2D)
            .unwrap_or(self.config.default_door_width)
    }

    /// Synthesizes one door from an arc and its paired leaf line.
    pub fn door_from_arc_and_line(&self, arc: &CadArc, line: &CadLine) -> Result<DoorGeometry> {
        let (e0, e1) = arc
            .endpoints()
            .ok_or_else(|| Error::DegenerateInput("door arc has no points".to_string()))?;
        let (closing, opening) = if line.distance_to(e0) <= line.distance_to(e1) {
            (e0, e1)
        } else {
            (e1, e0)
        };

        let arc_distance = |c: Coord<f64>| {
            closest_point_on_linestring(&arc.points, c).map_or(f64::INFINITY, |(_, d)| d)
        };
        let axis = if arc_distance(line.start) >= arc_distance(line.end) {
            line.start
        } else {
            line.end
        };

        let extension = ExtensionType::from_points(axis, closing, opening).ok_or_else(|| {
            Error::DegenerateInput(format!(
                "door hinge ({}, {}) is collinear with its swing arc",
                axis.x, axis.y
            ))
        })?;

        let door_width = self.door_width_at(axis);
        let axis = self.snap_to_wall(axis);
        let closing = self.snap_to_wall(closing);

        DoorGeometry::from_points(axis, closing, extension, door_width)
    }

    /// Pairs arcs with lines and synthesizes a door per pair. Pairs whose
    /// geometry is degenerate are skipped.
    pub fn doors_from_arcs_and_lines(&self, arcs: &[CadArc], lines: &[CadLine]) -> Vec<DoorGeometry> {
        pair_arcs_with_lines(arcs, lines, self.config.pairing_distance)
            .into_iter()
            .filter_map(|(ai, li)| match self.door_from_arc_and_line(&arcs[ai], &lines[li]) {
                Ok(door) => Some(door),
                Err(e) => {
                    tracing::warn!(arc = ai, line = li, error = %e, "skipping door symbol");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{polygon, Area};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    /// Quarter arc of radius `r` around `center` from `from_angle` to `to_angle`.
    fn quarter_arc(center: Coord<f64>, r: f64, from_angle: f64, to_angle: f64) -> CadArc {
        let steps = 16;
        let points: Vec<Coord<f64>> = (0..=steps)
            .map(|i| {
                let t = from_angle + (to_angle - from_angle) * i as f64 / steps as f64;
                c(center.x + r * t.cos(), center.y + r * t.sin())
            })
            .collect();
        CadArc::new(LineString::from(points))
    }

    #[test]
    fn test_sweeping_points_right_extension() {
        let door = DoorGeometry::from_points(c(0.0, 0.25), c(1.0, 0.25), ExtensionType::Right, 0.5)
            .unwrap();
        let sp = door.sweeping_points;
        assert_abs_diff_eq!(sp.angle_point.x(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sp.angle_point.y(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sp.closed_point.x(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sp.closed_point.y(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sp.opened_point.x(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sp.opened_point.y(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(door.footprint.unsigned_area(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sweep_is_a_right_angle_on_the_extension_side() {
        for extension in [ExtensionType::Left, ExtensionType::Right] {
            let sp = SweepingPoints::from_door_step(c(3.0, 1.0), c(3.5, 2.0), extension, 0.2)
                .unwrap();
            let u = to_vector(sp.closed_point.0) - to_vector(sp.angle_point.0);
            let v = to_vector(sp.opened_point.0) - to_vector(sp.angle_point.0);
            assert_abs_diff_eq!(u.angle(&v), FRAC_PI_2, epsilon = 1e-6);
            assert_abs_diff_eq!(u.norm(), v.norm(), epsilon = 1e-12);
            assert_eq!(sp.extension_type(), Some(extension));
        }
    }

    #[test]
    fn test_extension_type_sign_convention() {
        let axis = c(0.0, 0.0);
        let closing = c(1.0, 0.0);
        assert_eq!(
            ExtensionType::from_points(axis, closing, c(0.0, 1.0)),
            Some(ExtensionType::Right)
        );
        assert_eq!(
            ExtensionType::from_points(axis, closing, c(0.0, -1.0)),
            Some(ExtensionType::Left)
        );
        assert_eq!(ExtensionType::from_points(axis, closing, c(2.0, 0.0)), None);
    }

    #[test]
    fn test_pairing_prefers_closest_and_drops_unpaired_arcs() {
        let arcs = vec![
            quarter_arc(c(0.0, 0.0), 80.0, 0.0, FRAC_PI_2),
            quarter_arc(c(500.0, 0.0), 80.0, 0.0, FRAC_PI_2),
        ];
        let lines = vec![
            CadLine::new(c(300.0, 0.0), c(380.0, 0.0)),
            CadLine::new(c(0.0, 0.0), c(80.0, 0.0)),
        ];
        let pairs = pair_arcs_with_lines(&arcs, &lines, 5.0);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_door_from_arc_and_line_snaps_to_wall() {
        // Wall 20 thick along the x axis, top face at y = 10
        let wall = polygon![
            (x: -100.0, y: -10.0),
            (x: 200.0, y: -10.0),
            (x: 200.0, y: 10.0),
            (x: -100.0, y: 10.0),
        ];
        let walls = vec![wall];
        let synthesizer = DoorSynthesizer::new(&walls, DoorSynthesisConfig::default());

        // Closed leaf drawn 1 unit above the wall face, arc swinging upwards
        let line = CadLine::new(c(0.0, 11.0), c(80.0, 11.0));
        let arc = quarter_arc(c(0.0, 11.0), 80.0, 0.0, FRAC_PI_2);

        let door = synthesizer.door_from_arc_and_line(&arc, &line).unwrap();
        assert_eq!(door.extension_type, ExtensionType::Right);
        assert_abs_diff_eq!(door.door_width, 20.0, epsilon = 1e-6);

        let sp = door.sweeping_points;
        assert_abs_diff_eq!(sp.angle_point.x(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sp.angle_point.y(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sp.closed_point.x(), 80.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sp.opened_point.y(), 80.0, epsilon = 1e-6);
        assert_abs_diff_eq!(door.footprint.unsigned_area(), 80.0 * 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_door_width_falls_back_without_walls() {
        let synthesizer = DoorSynthesizer::new(&[], DoorSynthesisConfig::default());
        assert_eq!(synthesizer.door_width_at(c(0.0, 0.0)), DEFAULT_DOOR_WIDTH);
        // No wall: points stay untouched
        assert_eq!(synthesizer.snap_to_wall(c(3.0, 4.0)), c(3.0, 4.0));
    }
}
