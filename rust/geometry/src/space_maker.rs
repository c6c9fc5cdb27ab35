// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Space and area derivation
//!
//! Separators are full-width polygons, so enclosed spaces fall out of polygon
//! set algebra instead of graph planarization:
//!
//! 1. union all separators and close precision gaps
//! 2. subtract the union from an envelope slightly larger than the plan
//! 3. every resulting component that does not reach the envelope border is
//!    an enclosed space
//!
//! Spaces are then cut into areas by subtracting the union of the area
//! splitters.

use crate::primitives::EPSILON_2D;
use crate::repair::close_gaps;
use geo::{
    unary_union, Area, BooleanOps, BoundingRect, Centroid, Coord, Intersects, MultiPolygon,
    Polygon, Rect,
};
use std::cmp::Ordering;

/// Configuration for the space maker
#[derive(Debug, Clone)]
pub struct SpaceMakerConfig {
    /// Symmetric buffer closing precision gaps between separators. Default: 1e-4
    pub gap_closing_distance: f64,
    /// Spaces smaller than this are precision artifacts. Default: 1e-2
    pub min_space_area: f64,
    /// Area fragments smaller than this are discarded. Default: 1e-2
    pub min_area_area: f64,
    /// Minimum margin between the separators' bounds and the envelope. Default: 1.0
    pub envelope_margin: f64,
}

impl Default for SpaceMakerConfig {
    fn default() -> Self {
        Self {
            gap_closing_distance: 1e-4,
            min_space_area: 1e-2,
            min_area_area: 1e-2,
            envelope_margin: 1.0,
        }
    }
}

/// A derived space and the areas it is split into.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceFootprint {
    pub footprint: Polygon<f64>,
    pub areas: Vec<Polygon<f64>>,
}

/// Derives spaces from separators and areas from splitters.
#[derive(Debug, Clone, Default)]
pub struct SpaceMaker {
    config: SpaceMakerConfig,
}

impl SpaceMaker {
    pub fn new(config: SpaceMakerConfig) -> Self {
        Self { config }
    }

    /// Enclosed regions bounded by the separators, ordered by centroid.
    pub fn spaces_from_separators(&self, separators: &[Polygon<f64>]) -> Vec<Polygon<f64>> {
        if separators.is_empty() {
            return Vec::new();
        }
        let union = close_gaps(
            &unary_union(separators.iter()),
            self.config.gap_closing_distance,
        );
        let Some(bounds) = union.bounding_rect() else {
            return Vec::new();
        };

        let margin = self
            .config
            .envelope_margin
            .max(0.01 * bounds.width().max(bounds.height()));
        let envelope = Rect::new(
            Coord {
                x: bounds.min().x - margin,
                y: bounds.min().y - margin,
            },
            Coord {
                x: bounds.max().x + margin,
                y: bounds.max().y + margin,
            },
        );

        let free = envelope.to_polygon().difference(&union);
        let reach = margin / 2.0;
        let mut spaces: Vec<Polygon<f64>> = free
            .0
            .into_iter()
            .filter(|component| {
                let Some(r) = component.bounding_rect() else {
                    return false;
                };
                // The outside region is the only one touching the envelope.
                let outside = r.min().x <= envelope.min().x + reach
                    || r.min().y <= envelope.min().y + reach
                    || r.max().x >= envelope.max().x - reach
                    || r.max().y >= envelope.max().y - reach;
                !outside
            })
            .filter(|space| space.unsigned_area() >= self.config.min_space_area)
            .collect();
        spaces.sort_by(compare_by_centroid);

        tracing::debug!(
            separators = separators.len(),
            spaces = spaces.len(),
            "derived spaces from separators"
        );
        spaces
    }

    /// Splits a space into areas by subtracting the splitters.
    ///
    /// A space no splitter touches yields exactly one area equal to itself.
    /// Fragments below the minimum area are dropped, so a splitter covering a
    /// whole sliver simply yields no area for it.
    pub fn areas_from_space(&self, space: &Polygon<f64>, splitters: &MultiPolygon<f64>) -> Vec<Polygon<f64>> {
        if splitters.0.is_empty() || !splitters.intersects(space) {
            return vec![space.clone()];
        }
        let mut areas: Vec<Polygon<f64>> = space
            .difference(splitters)
            .0
            .into_iter()
            .filter(|area| area.unsigned_area() >= self.config.min_area_area)
            .collect();
        areas.sort_by(compare_by_centroid);
        areas
    }

    /// Derives all spaces and their areas.
    pub fn make(&self, separators: &[Polygon<f64>], splitters: &[Polygon<f64>]) -> Vec<SpaceFootprint> {
        let splitter_union = unary_union(splitters.iter());
        self.spaces_from_separators(separators)
            .into_iter()
            .map(|footprint| {
                let areas = self.areas_from_space(&footprint, &splitter_union);
                SpaceFootprint { footprint, areas }
            })
            .collect()
    }
}

/// Orders polygons by centroid x, then y, for deterministic output.
fn compare_by_centroid(a: &Polygon<f64>, b: &Polygon<f64>) -> Ordering {
    let key = |p: &Polygon<f64>| p.centroid().map_or((0.0, 0.0), |c| (c.x(), c.y()));
    let (ka, kb) = (key(a), key(b));
    let round = |v: f64| (v / EPSILON_2D).round() * EPSILON_2D;
    round(ka.0)
        .total_cmp(&round(kb.0))
        .then(round(ka.1).total_cmp(&round(kb.1)))
}
