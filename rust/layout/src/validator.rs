// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural layout validation
//!
//! A fixed battery of independent checks over an assembled layout. Every
//! check always runs; the layout is never modified. Violations are sorted by
//! the footprint area of the offending entity, smallest first, then by type
//! and key, so two runs over the same layout produce identical output.

use crate::keys::{EntityKey, OpeningKey};
use crate::layout::SimpleLayout;
use crate::types::{OpeningType, SeparatorType};
use geo::{Area as _, BooleanOps, Centroid, InteriorPoint, Point, Polygon};
use std::cmp::Ordering;
use std::fmt;

/// Closed set of structural findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViolationType {
    DoorNotConnectingAreas,
    SpaceNotAccessible,
    AreaOverlapsMultipleSpaces,
    FeatureNotAssigned,
    OpeningOverlapsMultipleWalls,
    OpeningOverlapsAnotherOpening,
    AreaMismatch,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::DoorNotConnectingAreas => "DOOR_NOT_CONNECTING_AREAS",
            ViolationType::SpaceNotAccessible => "SPACE_NOT_ACCESSIBLE",
            ViolationType::AreaOverlapsMultipleSpaces => "AREA_OVERLAPS_MULTIPLE_SPACES",
            ViolationType::FeatureNotAssigned => "FEATURE_NOT_ASSIGNED",
            ViolationType::OpeningOverlapsMultipleWalls => "OPENING_OVERLAPS_MULTIPLE_WALLS",
            ViolationType::OpeningOverlapsAnotherOpening => "OPENING_OVERLAPS_ANOTHER_OPENING",
            ViolationType::AreaMismatch => "AREA_MISMATCH",
        }
    }

    /// Whether the finding should halt downstream workflows.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            ViolationType::AreaOverlapsMultipleSpaces
                | ViolationType::OpeningOverlapsMultipleWalls
                | ViolationType::AreaMismatch
        )
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural finding about one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub violation_type: ViolationType,
    pub entity: EntityKey,
    /// Footprint area of the entity, the primary sort key
    pub footprint_area: f64,
    /// A point inside the entity, for display
    pub position: Point<f64>,
    pub is_blocking: bool,
    pub text: Option<String>,
}

impl Violation {
    pub fn new(violation_type: ViolationType, entity: EntityKey, footprint: &Polygon<f64>) -> Self {
        let position = footprint
            .interior_point()
            .or_else(|| footprint.centroid())
            .unwrap_or_else(|| Point::new(0.0, 0.0));
        Self {
            violation_type,
            entity,
            footprint_area: footprint.unsigned_area(),
            position,
            is_blocking: violation_type.is_blocking(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Total order: area, then type, then entity key.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.footprint_area
            .total_cmp(&other.footprint_area)
            .then(self.violation_type.cmp(&other.violation_type))
            .then(self.entity.cmp(&other.entity))
    }
}

/// Sorts violations into report order.
pub fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by(Violation::compare);
}

/// Configuration for the layout validator
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Overlaps up to this size are contact, not overlap, in cm². Default: 1.0
    pub overlap_tolerance_cm2: f64,
    /// Distinct areas a door must touch. Default: 2
    pub min_connected_areas: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            overlap_tolerance_cm2: 1.0,
            min_connected_areas: 2,
        }
    }
}

/// Runs the structural checks over one layout.
pub struct LayoutValidator<'a> {
    layout: &'a SimpleLayout,
    config: ValidatorConfig,
}

impl<'a> LayoutValidator<'a> {
    pub fn new(layout: &'a SimpleLayout) -> Self {
        Self::with_config(layout, ValidatorConfig::default())
    }

    pub fn with_config(layout: &'a SimpleLayout, config: ValidatorConfig) -> Self {
        Self { layout, config }
    }

    /// Runs every check and returns the sorted violations.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        violations.extend(self.check_doors_connect_areas());
        violations.extend(self.check_spaces_accessible());
        violations.extend(self.check_areas_in_one_space());
        violations.extend(self.check_features_assigned());
        violations.extend(self.check_openings_on_one_wall());
        violations.extend(self.check_openings_do_not_overlap());
        sort_violations(&mut violations);

        tracing::debug!(
            violations = violations.len(),
            blocking = violations.iter().filter(|v| v.is_blocking).count(),
            "validated layout"
        );
        violations
    }

    fn overlap_tolerance(&self) -> f64 {
        self.layout
            .unit()
            .cm2_to_unit(self.config.overlap_tolerance_cm2)
    }

    fn overlap(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
        a.intersection(b).unsigned_area()
    }

    /// Doors and sliding doors must connect at least two areas. Entrance
    /// doors open to the outside of the unit and are exempt.
    pub fn check_doors_connect_areas(&self) -> Vec<Violation> {
        self.layout
            .openings()
            .filter(|(_, o)| {
                matches!(o.opening_type, OpeningType::Door | OpeningType::SlidingDoor)
            })
            .filter_map(|(key, opening)| {
                let connected = self.layout.opening_areas(key).len();
                (connected < self.config.min_connected_areas).then(|| {
                    Violation::new(
                        ViolationType::DoorNotConnectingAreas,
                        key.into(),
                        &opening.footprint,
                    )
                    .with_text(format!("door connects {connected} area(s)"))
                })
            })
            .collect()
    }

    /// Spaces need a door or a stairs/elevator/shaft feature.
    pub fn check_spaces_accessible(&self) -> Vec<Violation> {
        let spaces_openings = self.layout.spaces_openings();
        self.layout
            .spaces()
            .filter(|(key, _)| {
                let has_door = spaces_openings.get(key).is_some_and(|openings| {
                    openings.iter().any(|o| self.is_door(*o))
                });
                let has_access_feature = self
                    .layout
                    .space_features(*key)
                    .iter()
                    .filter_map(|f| self.layout.feature(*f))
                    .any(|f| f.feature_type.grants_access());
                !has_door && !has_access_feature
            })
            .map(|(key, space)| {
                Violation::new(ViolationType::SpaceNotAccessible, key.into(), &space.footprint)
            })
            .collect()
    }

    fn is_door(&self, opening: OpeningKey) -> bool {
        self.layout
            .opening(opening)
            .is_some_and(|o| o.opening_type.is_door())
    }

    /// Every area must lie in exactly one space.
    pub fn check_areas_in_one_space(&self) -> Vec<Violation> {
        let tolerance = self.overlap_tolerance();
        self.layout
            .areas()
            .filter_map(|(key, area)| {
                let spaces = self
                    .layout
                    .spaces()
                    .filter(|(_, s)| Self::overlap(&area.footprint, &s.footprint) > tolerance)
                    .count();
                (spaces != 1).then(|| {
                    Violation::new(
                        ViolationType::AreaOverlapsMultipleSpaces,
                        key.into(),
                        &area.footprint,
                    )
                    .with_text(format!("area overlaps {spaces} spaces"))
                })
            })
            .collect()
    }

    /// Every feature must lie in exactly one area.
    pub fn check_features_assigned(&self) -> Vec<Violation> {
        let tolerance = self.overlap_tolerance();
        self.layout
            .features()
            .filter_map(|(key, feature)| {
                let areas = self
                    .layout
                    .areas()
                    .filter(|(_, a)| Self::overlap(&feature.footprint, &a.footprint) > tolerance)
                    .count();
                (areas != 1).then(|| {
                    Violation::new(
                        ViolationType::FeatureNotAssigned,
                        key.into(),
                        &feature.footprint,
                    )
                    .with_text(format!("feature overlaps {areas} areas"))
                })
            })
            .collect()
    }

    /// Openings must cut through a single wall, railing or column.
    pub fn check_openings_on_one_wall(&self) -> Vec<Violation> {
        let tolerance = self.overlap_tolerance();
        self.layout
            .openings()
            .filter_map(|(key, opening)| {
                let hosts = self
                    .layout
                    .separators()
                    .filter(|(_, s)| s.separator_type != SeparatorType::AreaSplitter)
                    .filter(|(_, s)| Self::overlap(&opening.footprint, &s.footprint) > tolerance)
                    .count();
                (hosts > 1).then(|| {
                    Violation::new(
                        ViolationType::OpeningOverlapsMultipleWalls,
                        key.into(),
                        &opening.footprint,
                    )
                    .with_text(format!("opening overlaps {hosts} separators"))
                })
            })
            .collect()
    }

    /// Overlapping openings: the smaller one of each pair is flagged. Pairs
    /// are unordered, so the outcome does not depend on iteration order.
    pub fn check_openings_do_not_overlap(&self) -> Vec<Violation> {
        let tolerance = self.overlap_tolerance();
        let openings: Vec<_> = self.layout.openings().collect();
        let mut flagged: Vec<OpeningKey> = Vec::new();
        for (i, (ka, a)) in openings.iter().enumerate() {
            for (kb, b) in openings.iter().skip(i + 1) {
                if Self::overlap(&a.footprint, &b.footprint) <= tolerance {
                    continue;
                }
                let (area_a, area_b) = (a.footprint.unsigned_area(), b.footprint.unsigned_area());
                let smaller = match area_a.total_cmp(&area_b) {
                    Ordering::Less => *ka,
                    Ordering::Greater => *kb,
                    Ordering::Equal => (*ka).max(*kb),
                };
                if !flagged.contains(&smaller) {
                    flagged.push(smaller);
                }
            }
        }
        flagged
            .into_iter()
            .filter_map(|key| {
                self.layout.opening(key).map(|o| {
                    Violation::new(
                        ViolationType::OpeningOverlapsAnotherOpening,
                        key.into(),
                        &o.footprint,
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::AreaType;
    use crate::layout::{Feature, Opening, Separator};
    use crate::types::{FeatureType, HeightRange};
    use brooks_geometry::SweepingPoints;
    use geo::polygon;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
    }

    fn door(footprint: Polygon<f64>) -> Opening {
        let sweep = SweepingPoints {
            angle_point: Point::new(0.0, 0.0),
            closed_point: Point::new(1.0, 0.0),
            opened_point: Point::new(0.0, 1.0),
        };
        Opening::new(
            OpeningType::Door,
            footprint,
            HeightRange::new(0.0, 200.0),
            Some(sweep),
        )
        .unwrap()
    }

    fn wall(footprint: Polygon<f64>) -> Separator {
        Separator::new(SeparatorType::Wall, footprint, HeightRange::new(0.0, 260.0))
    }

    /// Two 400 x 400 rooms separated by a 20 wide wall with a door.
    fn two_rooms() -> (SimpleLayout, OpeningKey) {
        let mut layout = SimpleLayout::new();
        let middle = layout.add_separator(wall(rect(400.0, 0.0, 420.0, 400.0)));
        let d = layout
            .add_opening(middle, door(rect(400.0, 100.0, 420.0, 180.0)))
            .unwrap();
        for x in [0.0, 420.0] {
            let s = layout.add_space(rect(x, 0.0, x + 400.0, 400.0));
            layout
                .add_area(s, rect(x, 0.0, x + 400.0, 400.0), AreaType::NotDefined)
                .unwrap();
        }
        (layout, d)
    }

    #[test]
    fn test_connected_layout_has_no_violations() {
        let (layout, _) = two_rooms();
        assert!(LayoutValidator::new(&layout).validate().is_empty());
    }

    #[test]
    fn test_door_into_nothing_is_flagged() {
        let (mut layout, _) = two_rooms();
        let outer = layout.add_separator(wall(rect(-20.0, 0.0, 0.0, 400.0)));
        let lonely = layout
            .add_opening(outer, door(rect(-20.0, 200.0, 0.0, 280.0)))
            .unwrap();
        let violations = LayoutValidator::new(&layout).validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::DoorNotConnectingAreas);
        assert_eq!(violations[0].entity, EntityKey::Opening(lonely));
        assert!(!violations[0].is_blocking);
    }

    #[test]
    fn test_entrance_doors_are_exempt() {
        let (mut layout, _) = two_rooms();
        let outer = layout.add_separator(wall(rect(-20.0, 0.0, 0.0, 400.0)));
        let sweep = SweepingPoints {
            angle_point: Point::new(0.0, 0.0),
            closed_point: Point::new(1.0, 0.0),
            opened_point: Point::new(0.0, 1.0),
        };
        let entrance = Opening::new(
            OpeningType::EntranceDoor,
            rect(-20.0, 200.0, 0.0, 280.0),
            HeightRange::new(0.0, 200.0),
            Some(sweep),
        )
        .unwrap();
        layout.add_opening(outer, entrance).unwrap();
        assert!(LayoutValidator::new(&layout).check_doors_connect_areas().is_empty());
    }

    #[test]
    fn test_space_without_door_is_not_accessible_unless_stairs() {
        let (mut layout, _) = two_rooms();
        let closet = layout.add_space(rect(0.0, 500.0, 100.0, 600.0));
        let area = layout
            .add_area(closet, rect(0.0, 500.0, 100.0, 600.0), AreaType::NotDefined)
            .unwrap();
        let violations = LayoutValidator::new(&layout).check_spaces_accessible();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].entity, EntityKey::Space(closet));

        layout
            .add_feature(
                Feature::new(FeatureType::Stairs, rect(10.0, 510.0, 90.0, 590.0)),
                Some(area),
            )
            .unwrap();
        assert!(LayoutValidator::new(&layout).check_spaces_accessible().is_empty());
    }

    #[test]
    fn test_area_spanning_two_spaces_is_blocking() {
        let (mut layout, _) = two_rooms();
        let (space, _) = layout.spaces().next().unwrap();
        let wide = layout
            .add_area(space, rect(300.0, 0.0, 500.0, 50.0), AreaType::NotDefined)
            .unwrap();
        let violations = LayoutValidator::new(&layout).check_areas_in_one_space();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].entity, EntityKey::Area(wide));
        assert!(violations[0].is_blocking);
    }

    #[test]
    fn test_feature_outside_or_across_areas() {
        let (mut layout, _) = two_rooms();
        let outside = layout
            .add_feature(Feature::new(FeatureType::Sink, rect(900.0, 0.0, 950.0, 50.0)), None)
            .unwrap();
        let across = layout
            .add_feature(Feature::new(FeatureType::Seat, rect(350.0, 0.0, 470.0, 50.0)), None)
            .unwrap();
        let inside = layout
            .add_feature(Feature::new(FeatureType::Sink, rect(10.0, 10.0, 50.0, 50.0)), None)
            .unwrap();
        let flagged: Vec<EntityKey> = LayoutValidator::new(&layout)
            .check_features_assigned()
            .into_iter()
            .map(|v| v.entity)
            .collect();
        assert!(flagged.contains(&EntityKey::Feature(outside)));
        assert!(flagged.contains(&EntityKey::Feature(across)));
        assert!(!flagged.contains(&EntityKey::Feature(inside)));
    }

    #[test]
    fn test_opening_across_two_walls() {
        let (mut layout, _) = two_rooms();
        let top = layout.add_separator(wall(rect(0.0, 400.0, 820.0, 420.0)));
        let corner = layout
            .add_opening(top, door(rect(395.0, 380.0, 425.0, 420.0)))
            .unwrap();
        let violations = LayoutValidator::new(&layout).check_openings_on_one_wall();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].entity, EntityKey::Opening(corner));
    }

    #[test]
    fn test_opening_overlap_flags_smaller_in_both_orders() {
        let build = |big_first: bool| {
            let mut layout = SimpleLayout::new();
            let w = layout.add_separator(wall(rect(0.0, 0.0, 1000.0, 20.0)));
            let big = rect(100.0, 0.0, 200.0, 20.0);
            let small = rect(150.0, 0.0, 220.0, 20.0);
            let order = if big_first { [big, small] } else { [small, big] };
            let keys: Vec<OpeningKey> = order
                .into_iter()
                .map(|fp| layout.add_opening(w, door(fp)).unwrap())
                .collect();
            let small_key = if big_first { keys[1] } else { keys[0] };
            let flagged: Vec<EntityKey> = LayoutValidator::new(&layout)
                .check_openings_do_not_overlap()
                .into_iter()
                .map(|v| v.entity)
                .collect();
            (flagged, small_key)
        };
        for big_first in [true, false] {
            let (flagged, small) = build(big_first);
            assert_eq!(flagged, vec![EntityKey::Opening(small)]);
        }
    }

    #[test]
    fn test_touching_openings_do_not_overlap() {
        let mut layout = SimpleLayout::new();
        let w = layout.add_separator(wall(rect(0.0, 0.0, 1000.0, 20.0)));
        layout.add_opening(w, door(rect(100.0, 0.0, 200.0, 20.0))).unwrap();
        layout.add_opening(w, door(rect(200.0, 0.0, 300.0, 20.0))).unwrap();
        assert!(LayoutValidator::new(&layout)
            .check_openings_do_not_overlap()
            .is_empty());
    }

    #[test]
    fn test_violations_sorted_smallest_first_and_deterministic() {
        let (mut layout, _) = two_rooms();
        layout.add_space(rect(0.0, 500.0, 100.0, 600.0));
        layout.add_space(rect(0.0, 700.0, 50.0, 750.0));
        let validator = LayoutValidator::new(&layout);
        let first = validator.validate();
        let second = validator.validate();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first[0].footprint_area <= first[1].footprint_area);
    }
}
