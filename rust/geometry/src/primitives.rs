// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar helpers shared by the repair, door and postprocessing modules.
//!
//! Distances are computed against polygon rings directly so that results are
//! stable across `geo` releases and never depend on a particular metric trait.

use crate::error::{Error, Result};
use geo::{Coord, Intersects, LineString, MultiPolygon, Point, Polygon};
use nalgebra::{Rotation2, Vector2};

/// Epsilon for floating point comparisons in 2D operations
pub const EPSILON_2D: f64 = 1e-9;

#[inline]
pub fn to_vector(c: Coord<f64>) -> Vector2<f64> {
    Vector2::new(c.x, c.y)
}

#[inline]
pub fn to_coord(v: &Vector2<f64>) -> Coord<f64> {
    Coord { x: v.x, y: v.y }
}

/// Euclidean distance between two coordinates
#[inline]
pub fn coord_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Closest point to `p` on the segment `a`-`b`
pub fn closest_point_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let v = to_vector(b) - to_vector(a);
    let w = to_vector(p) - to_vector(a);

    let c1 = w.dot(&v);
    if c1 <= 0.0 {
        return a;
    }
    let c2 = v.dot(&v);
    if c2 <= c1 {
        return b;
    }
    to_coord(&(to_vector(a) + v * (c1 / c2)))
}

/// Distance from `p` to the segment `a`-`b`
#[inline]
pub fn point_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    coord_distance(p, closest_point_on_segment(p, a, b))
}

/// Closest point on a line string and its distance to `p`.
pub fn closest_point_on_linestring(ls: &LineString<f64>, p: Coord<f64>) -> Option<(Coord<f64>, f64)> {
    if ls.0.len() == 1 {
        return Some((ls.0[0], coord_distance(ls.0[0], p)));
    }
    ls.lines()
        .map(|line| {
            let c = closest_point_on_segment(p, line.start, line.end);
            (c, coord_distance(c, p))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Closest point on any ring (exterior or interior) of the polygon.
pub fn closest_point_on_boundary(poly: &Polygon<f64>, p: Coord<f64>) -> Option<(Coord<f64>, f64)> {
    std::iter::once(poly.exterior())
        .chain(poly.interiors().iter())
        .filter_map(|ring| closest_point_on_linestring(ring, p))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Closest point on the boundary of any member of the multipolygon.
pub fn closest_point_on_multipolygon_boundary(
    mp: &MultiPolygon<f64>,
    p: Coord<f64>,
) -> Option<(Coord<f64>, f64)> {
    mp.0.iter()
        .filter_map(|poly| closest_point_on_boundary(poly, p))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Distance from a point to a polygon; zero when the point is inside or on it.
pub fn distance_to_polygon(p: Coord<f64>, poly: &Polygon<f64>) -> f64 {
    if poly.intersects(&Point::from(p)) {
        return 0.0;
    }
    closest_point_on_boundary(poly, p).map_or(f64::INFINITY, |(_, d)| d)
}

/// Distance from a point to the nearest member of a multipolygon.
pub fn distance_to_multipolygon(p: Coord<f64>, mp: &MultiPolygon<f64>) -> f64 {
    mp.0.iter()
        .map(|poly| distance_to_polygon(p, poly))
        .fold(f64::INFINITY, f64::min)
}

/// Minimum distance between two line strings, measured vertex to segment both ways.
pub fn linestring_distance(a: &LineString<f64>, b: &LineString<f64>) -> f64 {
    let one_way = |from: &LineString<f64>, to: &LineString<f64>| {
        from.coords()
            .filter_map(|c| closest_point_on_linestring(to, *c).map(|(_, d)| d))
            .fold(f64::INFINITY, f64::min)
    };
    one_way(a, b).min(one_way(b, a))
}

/// Unit normal pointing to the left of the direction `a -> b`.
pub fn left_normal(a: Coord<f64>, b: Coord<f64>) -> Result<Vector2<f64>> {
    let d = to_vector(b) - to_vector(a);
    let len = d.norm();
    if len < EPSILON_2D {
        return Err(Error::DegenerateInput(format!(
            "zero-length segment at ({}, {})",
            a.x, a.y
        )));
    }
    Ok(Vector2::new(-d.y, d.x) / len)
}

/// Rectangle covering the segment `a`-`b`, extended `left` units to its left
/// and `right` units to its right.
pub fn rectangle_from_segment(
    a: Coord<f64>,
    b: Coord<f64>,
    left: f64,
    right: f64,
) -> Result<Polygon<f64>> {
    let n = left_normal(a, b)?;
    let (va, vb) = (to_vector(a), to_vector(b));
    let ring = vec![
        to_coord(&(va - n * right)),
        to_coord(&(vb - n * right)),
        to_coord(&(vb + n * left)),
        to_coord(&(va + n * left)),
    ];
    Ok(Polygon::new(LineString::from(ring), vec![]))
}

/// Widens the segment `a`-`b` symmetrically into a rectangle of the given width.
pub fn add_width_to_linestring(a: Coord<f64>, b: Coord<f64>, width: f64) -> Result<Polygon<f64>> {
    if width <= 0.0 {
        return Err(Error::DegenerateInput(format!("non-positive width {width}")));
    }
    rectangle_from_segment(a, b, width / 2.0, width / 2.0)
}

/// Rotates `p` around `center` by `angle` radians (counter-clockwise positive).
pub fn rotate_around(p: Coord<f64>, center: Coord<f64>, angle: f64) -> Coord<f64> {
    let rotation = Rotation2::new(angle);
    let rotated = rotation * (to_vector(p) - to_vector(center));
    to_coord(&(rotated + to_vector(center)))
}

/// 2D cross product of `o -> a` and `o -> b`.
#[inline]
pub fn cross(o: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    (to_vector(a) - to_vector(o)).perp(&(to_vector(b) - to_vector(o)))
}
