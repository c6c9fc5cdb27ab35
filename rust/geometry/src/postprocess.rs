// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Separator merging
//!
//! Raw annotations describe every wall segment as its own polygon. This
//! module merges them per separator type into a minimal set of polygons and
//! keeps track of which source lines contributed to each merged polygon, so
//! that openings can later be attached to the merged separator that swallowed
//! their host line.
//!
//! Railings get extra treatment: the parts covered by walls or columns are cut
//! away and the remaining railing vertices lying a hair's breadth off the
//! wall boundary are snapped onto it, which keeps razor-thin slivers out of
//! the space computation.

use crate::primitives::{closest_point_on_multipolygon_boundary, distance_to_polygon, EPSILON_2D};
use crate::repair::{as_multipolygon, close_gaps, round_multipolygon, round_polygon};
use geo::{
    unary_union, Area, BooleanOps, Coord, Geometry, LineString, MultiPolygon, Polygon, Validation,
};
use std::fmt;

/// Configuration for separator merging. Distances are in editor units (cm).
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    /// Decimal places coordinates are rounded to before and after union. Default: 7
    pub precision: i32,
    /// Outward/inward buffer closing gaps between adjoining segments. Default: 1.0 (1 cm)
    pub gap_closing_distance: f64,
    /// Maximum vertex distance for a source polygon to match a merged one. Default: 1.0 (1 cm)
    pub vertex_match_tolerance: f64,
    /// Railing vertices closer than this to a wall are snapped onto it. Default: 0.1 (1 mm)
    pub railing_snap_distance: f64,
    /// Wall and column coverage at or below this area counts as empty. Default: 1e-2
    pub empty_area_tolerance: f64,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            precision: 7,
            gap_closing_distance: 1.0,
            vertex_match_tolerance: 1.0,
            railing_snap_distance: 0.1,
            empty_area_tolerance: 1e-2,
        }
    }
}

/// A raw separator polygon and the identifier of the line it was drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePolygon<Id> {
    pub id: Id,
    pub polygon: Polygon<f64>,
}

impl<Id> SourcePolygon<Id> {
    pub fn new(id: Id, polygon: Polygon<f64>) -> Self {
        Self { id, polygon }
    }
}

/// Merged polygons of one separator type with their contributing source ids.
///
/// `polygons[i]` was produced from the sources listed in `source_ids[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSeparators<Id> {
    pub polygons: Vec<Polygon<f64>>,
    pub source_ids: Vec<Vec<Id>>,
}

impl<Id> Default for MergedSeparators<Id> {
    fn default() -> Self {
        Self {
            polygons: Vec::new(),
            source_ids: Vec::new(),
        }
    }
}

impl<Id: PartialEq> MergedSeparators<Id> {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Index of the merged polygon the given source contributed to.
    pub fn index_of_source(&self, id: &Id) -> Option<usize> {
        self.source_ids.iter().position(|ids| ids.contains(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Polygon<f64>, &[Id])> {
        self.polygons
            .iter()
            .zip(self.source_ids.iter().map(|ids| ids.as_slice()))
    }
}

/// Result of postprocessing all separator types.
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessedSeparators<Id> {
    pub walls: MergedSeparators<Id>,
    pub railings: MergedSeparators<Id>,
    pub columns: MergedSeparators<Id>,
}

/// Merges raw separators per type and heals railings against walls.
#[derive(Debug, Clone, Default)]
pub struct SeparatorPostprocessor {
    config: PostprocessConfig,
}

impl SeparatorPostprocessor {
    pub fn new(config: PostprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    /// Merges walls, railings and columns. Railings are cut by the union of
    /// walls and columns and healed against it.
    pub fn process<Id: Clone + PartialEq + fmt::Debug>(
        &self,
        walls: &[SourcePolygon<Id>],
        railings: &[SourcePolygon<Id>],
        columns: &[SourcePolygon<Id>],
    ) -> PostprocessedSeparators<Id> {
        let walls = self.merge(walls);
        let columns = self.merge(columns);
        let railings = self.merge(railings);

        let blockers = unary_union(walls.polygons.iter().chain(columns.polygons.iter()));
        let railings = if blockers.unsigned_area() <= self.config.empty_area_tolerance {
            railings
        } else {
            self.cut_railings(railings, &blockers)
        };

        tracing::debug!(
            walls = walls.len(),
            railings = railings.len(),
            columns = columns.len(),
            "postprocessed separators"
        );

        PostprocessedSeparators {
            walls,
            railings,
            columns,
        }
    }

    /// Unions the sources of one separator type and maps every source back to
    /// the merged polygon it belongs to.
    pub fn merge<Id: Clone + fmt::Debug>(
        &self,
        sources: &[SourcePolygon<Id>],
    ) -> MergedSeparators<Id> {
        if sources.is_empty() {
            return MergedSeparators::default();
        }
        let precision = self.config.precision;

        // Naive float union silently drops thin interior rings, round first.
        let rounded: Vec<Polygon<f64>> = sources
            .iter()
            .map(|s| round_polygon(&s.polygon, precision))
            .collect();
        let union = unary_union(rounded.iter());
        let closed = round_multipolygon(
            &close_gaps(&union, self.config.gap_closing_distance),
            precision,
        );

        let polygons: Vec<Polygon<f64>> = as_multipolygon(&Geometry::MultiPolygon(closed))
            .0
            .into_iter()
            .filter(|p| is_usable(p))
            .collect();

        let mut source_ids: Vec<Vec<Id>> = vec![Vec::new(); polygons.len()];
        let mut unmatched: Vec<&Id> = Vec::new();
        for source in sources {
            match self.match_source(&source.polygon, &polygons) {
                Some(index) => source_ids[index].push(source.id.clone()),
                None => unmatched.push(&source.id),
            }
        }
        if !unmatched.is_empty() {
            tracing::debug!(?unmatched, "sources left without a merged polygon");
        }

        MergedSeparators {
            polygons,
            source_ids,
        }
    }

    /// The merged polygon containing every source vertex within tolerance,
    /// or else the one with the smallest summed vertex distance.
    fn match_source(&self, source: &Polygon<f64>, merged: &[Polygon<f64>]) -> Option<usize> {
        let vertices: Vec<Coord<f64>> = source.exterior().coords().copied().collect();
        let distances: Vec<Vec<f64>> = merged
            .iter()
            .map(|poly| {
                vertices
                    .iter()
                    .map(|v| distance_to_polygon(*v, poly))
                    .collect()
            })
            .collect();

        let tolerance = self.config.vertex_match_tolerance;
        if let Some(index) = distances
            .iter()
            .position(|ds| ds.iter().all(|d| *d < tolerance))
        {
            return Some(index);
        }
        distances
            .iter()
            .map(|ds| ds.iter().sum::<f64>())
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(index, _)| index)
    }

    fn cut_railings<Id: Clone>(
        &self,
        railings: MergedSeparators<Id>,
        blockers: &MultiPolygon<f64>,
    ) -> MergedSeparators<Id> {
        let mut result = MergedSeparators::default();
        for (polygon, ids) in railings.polygons.iter().zip(railings.source_ids) {
            for part in polygon.difference(blockers).0 {
                let healed = self.heal_railing(&part, blockers);
                if is_usable(&healed) {
                    result.polygons.push(healed);
                    result.source_ids.push(ids.clone());
                } else {
                    tracing::debug!("dropping degenerate railing fragment");
                }
            }
        }
        result
    }

    /// Snaps exterior vertices lying within the snap distance of the blockers
    /// (but not on them) onto the blocker boundary.
    fn heal_railing(&self, railing: &Polygon<f64>, blockers: &MultiPolygon<f64>) -> Polygon<f64> {
        let snap = self.config.railing_snap_distance;
        let exterior: Vec<Coord<f64>> = railing
            .exterior()
            .coords()
            .map(|c| match closest_point_on_multipolygon_boundary(blockers, *c) {
                Some((nearest, d)) if d > 0.0 && d <= snap => nearest,
                _ => *c,
            })
            .collect();
        Polygon::new(LineString::from(exterior), railing.interiors().to_vec())
    }
}

fn is_usable(polygon: &Polygon<f64>) -> bool {
    polygon.unsigned_area() > EPSILON_2D && polygon.is_valid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::add_width_to_linestring;
    use approx::assert_abs_diff_eq;
    use geo::{polygon, Contains, Point};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn segment(id: &str, a: (f64, f64), b: (f64, f64), width: f64) -> SourcePolygon<String> {
        SourcePolygon::new(
            id.to_string(),
            add_width_to_linestring(c(a.0, a.1), c(b.0, b.1), width).unwrap(),
        )
    }

    #[test]
    fn test_merge_joins_touching_walls_and_keeps_sources() {
        let processor = SeparatorPostprocessor::default();
        let walls = vec![
            segment("w1", (0.0, 0.0), (100.0, 0.0), 20.0),
            segment("w2", (100.0, 0.0), (200.0, 0.0), 20.0),
            segment("w3", (500.0, 0.0), (600.0, 0.0), 20.0),
        ];
        let merged = processor.merge(&walls);
        assert_eq!(merged.len(), 2);

        let joined = merged.index_of_source(&"w1".to_string()).unwrap();
        assert_eq!(merged.index_of_source(&"w2".to_string()), Some(joined));
        assert_ne!(merged.index_of_source(&"w3".to_string()), Some(joined));
        assert_abs_diff_eq!(merged.polygons[joined].unsigned_area(), 200.0 * 20.0, epsilon = 1.0);
    }

    #[test]
    fn test_merge_of_degenerate_sources_keeps_no_ids() {
        let processor = SeparatorPostprocessor::default();
        let collapsed = SourcePolygon::new(
            "ghost".to_string(),
            Polygon::new(
                LineString::from(vec![(0.0, 0.0), (100.0, 0.0), (50.0, 0.0), (0.0, 0.0)]),
                vec![],
            ),
        );
        let merged = processor.merge(&[collapsed]);
        assert!(merged.is_empty());
        assert_eq!(merged.index_of_source(&"ghost".to_string()), None);
    }

    #[test]
    fn test_merge_closes_sub_centimetre_gaps() {
        let processor = SeparatorPostprocessor::default();
        let walls = vec![
            segment("a", (0.0, 0.0), (100.0, 0.0), 20.0),
            segment("b", (100.5, 0.0), (200.0, 0.0), 20.0),
        ];
        let merged = processor.merge(&walls);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.source_ids[0], vec!["a".to_string(), "b".to_string()]);
        assert!(merged.polygons[0].contains(&Point::new(100.25, 0.0)));
    }

    #[test]
    fn test_railings_are_cut_by_walls() {
        let processor = SeparatorPostprocessor::default();
        let walls = vec![segment("w", (0.0, 0.0), (0.0, 200.0), 20.0)];
        let railings = vec![segment("r", (-50.0, 100.0), (300.0, 100.0), 5.0)];
        let result = processor.process(&walls, &railings, &[]);

        assert_eq!(result.walls.len(), 1);
        // The wall splits the railing into a stub on the left and the main run
        assert_eq!(result.railings.len(), 2);
        for (polygon, ids) in result.railings.iter() {
            assert_eq!(ids, &["r".to_string()]);
            assert!(!polygon.contains(&Point::new(0.0, 100.0)));
        }
        let total: f64 = result.railings.polygons.iter().map(|p| p.unsigned_area()).sum();
        assert_abs_diff_eq!(total, (350.0 - 20.0) * 5.0, epsilon = 1.0);
    }

    #[test]
    fn test_railings_untouched_without_walls() {
        let processor = SeparatorPostprocessor::default();
        let railings = vec![segment("r", (0.0, 0.0), (300.0, 0.0), 5.0)];
        let result = processor.process(&[], &railings, &[]);
        assert_eq!(result.railings.len(), 1);
        assert!(result.walls.is_empty());
        assert_abs_diff_eq!(result.railings.polygons[0].unsigned_area(), 1500.0, epsilon = 1e-3);
    }

    #[test]
    fn test_railing_vertex_near_wall_is_snapped() {
        let processor = SeparatorPostprocessor::default();
        let blockers = MultiPolygon::new(vec![add_width_to_linestring(
            c(0.0, 0.0),
            c(0.0, 100.0),
            20.0,
        )
        .unwrap()]);
        // Railing ending 0.05 short of the wall face at x = 10
        let railing = geo::polygon![
            (x: 10.05, y: 40.0),
            (x: 100.0, y: 40.0),
            (x: 100.0, y: 45.0),
            (x: 10.05, y: 45.0),
        ];
        let healed = processor.heal_railing(&railing, &blockers);
        let xs: Vec<f64> = healed.exterior().coords().map(|c| c.x).collect();
        assert!(xs.iter().any(|x| (x - 10.0).abs() < 1e-9));
        assert!(xs.iter().all(|x| (x - 10.05).abs() > 1e-9));
        assert!(xs.iter().any(|x| (x - 100.0).abs() < 1e-9));
    }
}
