// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based layout model.
//!
//! The [`SimpleLayout`] owns every separator, opening, space, area and feature
//! of one floor plan in slot maps with stable keys. Ownership links that would
//! be mutual references (separator and its openings, space and its areas, area
//! and its features) are stored as keys on both sides and maintained only by
//! the arena's own insertion methods.
//!
//! Iteration follows insertion order, so every derived index is deterministic
//! for a given assembly.

use crate::classification::AreaType;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::types::{FeatureType, HeightRange, LengthUnit, OpeningType, SeparatorType};
use brooks_geometry::SweepingPoints;
use geo::{
    Area as _, BooleanOps, BoundingRect, Buffer, Coord, LineString, MapCoordsInPlace, Point,
    Polygon, Rect,
};
use slotmap::SlotMap;
use std::collections::BTreeMap;

/// Distance within which an opening or separator is considered to touch a
/// space or area, in centimetres.
pub const CONNECTIVITY_TOLERANCE_CM: f64 = 1.0;

/// A wall, railing, column or area splitter.
#[derive(Debug, Clone)]
pub struct Separator {
    pub separator_type: SeparatorType,
    pub footprint: Polygon<f64>,
    pub height: HeightRange,
    /// Identifiers of the raw annotation lines merged into this separator
    pub source_ids: Vec<String>,
    openings: Vec<OpeningKey>,
}

impl Separator {
    pub fn new(separator_type: SeparatorType, footprint: Polygon<f64>, height: HeightRange) -> Self {
        Self {
            separator_type,
            footprint,
            height,
            source_ids: Vec::new(),
            openings: Vec::new(),
        }
    }

    pub fn with_source_ids(mut self, source_ids: Vec<String>) -> Self {
        self.source_ids = source_ids;
        self
    }

    pub fn openings(&self) -> &[OpeningKey] {
        &self.openings
    }
}

/// A door or window cut into a separator.
#[derive(Debug, Clone)]
pub struct Opening {
    pub opening_type: OpeningType,
    pub footprint: Polygon<f64>,
    pub height: HeightRange,
    pub sweeping_points: Option<SweepingPoints>,
    pub source_id: Option<String>,
    separator: SeparatorKey,
}

impl Opening {
    /// Winged doors without sweeping points are rejected.
    pub fn new(
        opening_type: OpeningType,
        footprint: Polygon<f64>,
        height: HeightRange,
        sweeping_points: Option<SweepingPoints>,
    ) -> Result<Self> {
        if opening_type.is_winged() && sweeping_points.is_none() {
            return Err(Error::CorruptedAnnotation(format!(
                "{opening_type} opening requires sweeping points"
            )));
        }
        Ok(Self {
            opening_type,
            footprint,
            height,
            sweeping_points,
            source_id: None,
            separator: SeparatorKey::default(),
        })
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// The separator hosting this opening.
    pub fn separator(&self) -> SeparatorKey {
        self.separator
    }
}

/// An enclosed region bounded by separators.
#[derive(Debug, Clone)]
pub struct Space {
    pub footprint: Polygon<f64>,
    areas: Vec<AreaKey>,
}

impl Space {
    pub fn areas(&self) -> &[AreaKey] {
        &self.areas
    }
}

/// A subdivision of a space.
#[derive(Debug, Clone)]
pub struct Area {
    pub footprint: Polygon<f64>,
    pub area_type: AreaType,
    space: SpaceKey,
    features: Vec<FeatureKey>,
}

impl Area {
    pub fn space(&self) -> SpaceKey {
        self.space
    }

    pub fn features(&self) -> &[FeatureKey] {
        &self.features
    }
}

/// A fixture or equipment item.
#[derive(Debug, Clone)]
pub struct Feature {
    pub feature_type: FeatureType,
    pub footprint: Polygon<f64>,
    pub source_id: Option<String>,
    area: Option<AreaKey>,
}

impl Feature {
    pub fn new(feature_type: FeatureType, footprint: Polygon<f64>) -> Self {
        Self {
            feature_type,
            footprint,
            source_id: None,
            area: None,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// The area the feature was assigned to, if any.
    pub fn area(&self) -> Option<AreaKey> {
        self.area
    }
}

/// The assembled floor plan model.
#[derive(Debug, Clone, Default)]
pub struct SimpleLayout {
    separators: SlotMap<SeparatorKey, Separator>,
    openings: SlotMap<OpeningKey, Opening>,
    spaces: SlotMap<SpaceKey, Space>,
    areas: SlotMap<AreaKey, Area>,
    features: SlotMap<FeatureKey, Feature>,
    unit: LengthUnit,
}

impl SimpleLayout {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    pub fn add_separator(&mut self, separator: Separator) -> SeparatorKey {
        self.separators.insert(separator)
    }

    /// Attaches an opening to its host separator.
    pub fn add_opening(&mut self, separator: SeparatorKey, mut opening: Opening) -> Result<OpeningKey> {
        if !self.separators.contains_key(separator) {
            return Err(Error::NotFound(separator.into()));
        }
        opening.separator = separator;
        let key = self.openings.insert(opening);
        if let Some(host) = self.separators.get_mut(separator) {
            host.openings.push(key);
        }
        Ok(key)
    }

    pub fn add_space(&mut self, footprint: Polygon<f64>) -> SpaceKey {
        self.spaces.insert(Space {
            footprint,
            areas: Vec::new(),
        })
    }

    pub fn add_area(
        &mut self,
        space: SpaceKey,
        footprint: Polygon<f64>,
        area_type: AreaType,
    ) -> Result<AreaKey> {
        if !self.spaces.contains_key(space) {
            return Err(Error::NotFound(space.into()));
        }
        let key = self.areas.insert(Area {
            footprint,
            area_type,
            space,
            features: Vec::new(),
        });
        if let Some(owner) = self.spaces.get_mut(space) {
            owner.areas.push(key);
        }
        Ok(key)
    }

    /// Adds a feature, optionally assigned to an area.
    pub fn add_feature(&mut self, mut feature: Feature, area: Option<AreaKey>) -> Result<FeatureKey> {
        if let Some(a) = area {
            if !self.areas.contains_key(a) {
                return Err(Error::NotFound(a.into()));
            }
        }
        feature.area = area;
        let key = self.features.insert(feature);
        if let Some(owner) = area.and_then(|a| self.areas.get_mut(a)) {
            owner.features.push(key);
        }
        Ok(key)
    }

    pub fn set_area_type(&mut self, area: AreaKey, area_type: AreaType) -> Result<()> {
        let a = self
            .areas
            .get_mut(area)
            .ok_or(Error::NotFound(area.into()))?;
        a.area_type = area_type;
        Ok(())
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn separator(&self, key: SeparatorKey) -> Option<&Separator> {
        self.separators.get(key)
    }

    pub fn opening(&self, key: OpeningKey) -> Option<&Opening> {
        self.openings.get(key)
    }

    pub fn space(&self, key: SpaceKey) -> Option<&Space> {
        self.spaces.get(key)
    }

    pub fn area(&self, key: AreaKey) -> Option<&Area> {
        self.areas.get(key)
    }

    pub fn feature(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.get(key)
    }

    pub fn separators(&self) -> impl Iterator<Item = (SeparatorKey, &Separator)> {
        self.separators.iter()
    }

    pub fn openings(&self) -> impl Iterator<Item = (OpeningKey, &Opening)> {
        self.openings.iter()
    }

    pub fn spaces(&self) -> impl Iterator<Item = (SpaceKey, &Space)> {
        self.spaces.iter()
    }

    pub fn areas(&self) -> impl Iterator<Item = (AreaKey, &Area)> {
        self.areas.iter()
    }

    pub fn features(&self) -> impl Iterator<Item = (FeatureKey, &Feature)> {
        self.features.iter()
    }

    pub fn num_separators(&self) -> usize {
        self.separators.len()
    }

    pub fn num_openings(&self) -> usize {
        self.openings.len()
    }

    pub fn num_spaces(&self) -> usize {
        self.spaces.len()
    }

    pub fn num_areas(&self) -> usize {
        self.areas.len()
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub fn unit(&self) -> LengthUnit {
        self.unit
    }

    /// Footprint of any entity.
    pub fn footprint_of(&self, key: EntityKey) -> Option<&Polygon<f64>> {
        match key {
            EntityKey::Separator(k) => self.separators.get(k).map(|e| &e.footprint),
            EntityKey::Opening(k) => self.openings.get(k).map(|e| &e.footprint),
            EntityKey::Space(k) => self.spaces.get(k).map(|e| &e.footprint),
            EntityKey::Area(k) => self.areas.get(k).map(|e| &e.footprint),
            EntityKey::Feature(k) => self.features.get(k).map(|e| &e.footprint),
        }
    }

    pub fn space_of_area(&self, area: AreaKey) -> Option<SpaceKey> {
        self.areas.get(area).map(|a| a.space)
    }

    pub fn area_of_feature(&self, feature: FeatureKey) -> Option<AreaKey> {
        self.features.get(feature).and_then(|f| f.area)
    }

    /// Features assigned to any area of the space.
    pub fn space_features(&self, space: SpaceKey) -> Vec<FeatureKey> {
        self.spaces.get(space).map_or_else(Vec::new, |s| {
            s.areas
                .iter()
                .filter_map(|a| self.areas.get(*a))
                .flat_map(|a| a.features.iter().copied())
                .collect()
        })
    }

    /// Total footprint area of all areas.
    pub fn net_area(&self) -> f64 {
        self.areas.values().map(|a| a.footprint.unsigned_area()).sum()
    }

    /// Total footprint area of the areas of one space.
    pub fn space_net_area(&self, space: SpaceKey) -> f64 {
        self.spaces.get(space).map_or(0.0, |s| {
            s.areas
                .iter()
                .filter_map(|a| self.areas.get(*a))
                .map(|a| a.footprint.unsigned_area())
                .sum()
        })
    }

    /// Bounding rectangle of all separators and spaces.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.separators
            .values()
            .map(|s| &s.footprint)
            .chain(self.spaces.values().map(|s| &s.footprint))
            .filter_map(|p| p.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }

    // =========================================================================
    // Indices
    // =========================================================================

    pub fn areas_by_type(&self) -> BTreeMap<AreaType, Vec<AreaKey>> {
        let mut index: BTreeMap<AreaType, Vec<AreaKey>> = BTreeMap::new();
        for (key, area) in &self.areas {
            index.entry(area.area_type).or_default().push(key);
        }
        index
    }

    pub fn openings_by_type(&self) -> BTreeMap<OpeningType, Vec<OpeningKey>> {
        let mut index: BTreeMap<OpeningType, Vec<OpeningKey>> = BTreeMap::new();
        for (key, opening) in &self.openings {
            index.entry(opening.opening_type).or_default().push(key);
        }
        index
    }

    /// Openings touching each space. Spaces without openings are present
    /// with an empty list.
    pub fn spaces_openings(&self) -> BTreeMap<SpaceKey, Vec<OpeningKey>> {
        let tolerance = self.connectivity_tolerance();
        self.spaces
            .iter()
            .map(|(sk, space)| {
                let touching = self
                    .openings
                    .iter()
                    .filter(|(_, o)| touches(&o.footprint, &space.footprint, tolerance))
                    .map(|(ok, _)| ok)
                    .collect();
                (sk, touching)
            })
            .collect()
    }

    /// Openings touching each area.
    pub fn areas_openings(&self) -> BTreeMap<AreaKey, Vec<OpeningKey>> {
        let tolerance = self.connectivity_tolerance();
        self.areas
            .iter()
            .map(|(ak, area)| {
                let touching = self
                    .openings
                    .iter()
                    .filter(|(_, o)| touches(&o.footprint, &area.footprint, tolerance))
                    .map(|(ok, _)| ok)
                    .collect();
                (ak, touching)
            })
            .collect()
    }

    /// Separators bounding each area.
    pub fn areas_separators(&self) -> BTreeMap<AreaKey, Vec<SeparatorKey>> {
        let tolerance = self.connectivity_tolerance();
        self.areas
            .iter()
            .map(|(ak, area)| {
                let touching = self
                    .separators
                    .iter()
                    .filter(|(_, s)| touches(&s.footprint, &area.footprint, tolerance))
                    .map(|(sk, _)| sk)
                    .collect();
                (ak, touching)
            })
            .collect()
    }

    /// Areas touched by one opening.
    pub fn opening_areas(&self, opening: OpeningKey) -> Vec<AreaKey> {
        let tolerance = self.connectivity_tolerance();
        self.openings.get(opening).map_or_else(Vec::new, |o| {
            self.areas
                .iter()
                .filter(|(_, a)| touches(&o.footprint, &a.footprint, tolerance))
                .map(|(ak, _)| ak)
                .collect()
        })
    }

    fn connectivity_tolerance(&self) -> f64 {
        self.unit.cm_to_unit(CONNECTIVITY_TOLERANCE_CM)
    }

    // =========================================================================
    // Transformations
    // =========================================================================

    /// Uniformly scales every coordinate and height; the layout is then in
    /// metres.
    pub fn scale(&mut self, factor: f64) {
        let f = |c: Coord<f64>| Coord {
            x: c.x * factor,
            y: c.y * factor,
        };
        for s in self.separators.values_mut() {
            s.footprint.map_coords_in_place(f);
            s.height = s.height.scaled(factor);
        }
        for o in self.openings.values_mut() {
            o.footprint.map_coords_in_place(f);
            o.height = o.height.scaled(factor);
            if let Some(sp) = o.sweeping_points.as_mut() {
                sp.angle_point.map_coords_in_place(f);
                sp.closed_point.map_coords_in_place(f);
                sp.opened_point.map_coords_in_place(f);
            }
        }
        for s in self.spaces.values_mut() {
            s.footprint.map_coords_in_place(f);
        }
        for a in self.areas.values_mut() {
            a.footprint.map_coords_in_place(f);
        }
        for ft in self.features.values_mut() {
            ft.footprint.map_coords_in_place(f);
        }
        self.unit = LengthUnit::Meters;
    }

    /// Applies a fallible planar transformation to every coordinate. The
    /// layout is unchanged when any coordinate fails to transform.
    pub fn try_transform<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(Coord<f64>) -> Result<Coord<f64>>,
    {
        let mut out = self.clone();
        for s in out.separators.values_mut() {
            s.footprint = try_map_polygon(&s.footprint, &f)?;
        }
        for o in out.openings.values_mut() {
            o.footprint = try_map_polygon(&o.footprint, &f)?;
            if let Some(sp) = o.sweeping_points.as_mut() {
                sp.angle_point = Point::from(f(sp.angle_point.0)?);
                sp.closed_point = Point::from(f(sp.closed_point.0)?);
                sp.opened_point = Point::from(f(sp.opened_point.0)?);
            }
        }
        for s in out.spaces.values_mut() {
            s.footprint = try_map_polygon(&s.footprint, &f)?;
        }
        for a in out.areas.values_mut() {
            a.footprint = try_map_polygon(&a.footprint, &f)?;
        }
        for ft in out.features.values_mut() {
            ft.footprint = try_map_polygon(&ft.footprint, &f)?;
        }
        *self = out;
        Ok(())
    }
}

/// Whether `a` grown by `tolerance` overlaps `b` by more than a corner
/// contact.
pub(crate) fn touches(a: &Polygon<f64>, b: &Polygon<f64>, tolerance: f64) -> bool {
    a.buffer(tolerance).intersection(b).unsigned_area() > tolerance * tolerance
}

fn try_map_polygon<F>(polygon: &Polygon<f64>, f: &F) -> Result<Polygon<f64>>
where
    F: Fn(Coord<f64>) -> Result<Coord<f64>>,
{
    let ring = |ls: &LineString<f64>| -> Result<LineString<f64>> {
        ls.coords()
            .map(|c| f(*c))
            .collect::<Result<Vec<_>>>()
            .map(LineString::from)
    };
    let exterior = ring(polygon.exterior())?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(&ring)
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::polygon;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
    }

    fn sweep() -> SweepingPoints {
        SweepingPoints {
            angle_point: Point::new(0.0, 0.0),
            closed_point: Point::new(80.0, 0.0),
            opened_point: Point::new(0.0, 80.0),
        }
    }

    /// Two 400x400 rooms side by side, a 20 wide wall between them and a
    /// door through that wall.
    fn two_rooms() -> (SimpleLayout, OpeningKey) {
        let mut layout = SimpleLayout::new();
        let wall = layout.add_separator(Separator::new(
            SeparatorType::Wall,
            rect(400.0, 0.0, 420.0, 400.0),
            HeightRange::new(0.0, 260.0),
        ));
        let door = Opening::new(
            OpeningType::Door,
            rect(400.0, 100.0, 420.0, 180.0),
            HeightRange::new(0.0, 200.0),
            Some(sweep()),
        )
        .unwrap();
        let door = layout.add_opening(wall, door).unwrap();
        for x in [0.0, 420.0] {
            let space = layout.add_space(rect(x, 0.0, x + 400.0, 400.0));
            layout
                .add_area(space, rect(x, 0.0, x + 400.0, 400.0), AreaType::NotDefined)
                .unwrap();
        }
        (layout, door)
    }

    #[test]
    fn test_winged_door_requires_sweeping_points() {
        let result = Opening::new(
            OpeningType::EntranceDoor,
            rect(0.0, 0.0, 1.0, 1.0),
            HeightRange::new(0.0, 2.0),
            None,
        );
        assert!(matches!(result, Err(Error::CorruptedAnnotation(_))));

        let sliding = Opening::new(
            OpeningType::SlidingDoor,
            rect(0.0, 0.0, 1.0, 1.0),
            HeightRange::new(0.0, 2.0),
            None,
        );
        assert!(sliding.is_ok());
    }

    #[test]
    fn test_back_references_are_maintained() {
        let (layout, door) = two_rooms();
        let wall = layout.opening(door).unwrap().separator();
        assert_eq!(layout.separator(wall).unwrap().openings(), &[door]);
        for (sk, space) in layout.spaces() {
            for ak in space.areas() {
                assert_eq!(layout.space_of_area(*ak), Some(sk));
            }
        }
    }

    #[test]
    fn test_add_opening_to_unknown_separator_fails() {
        let (mut layout, _) = two_rooms();
        // A key for a slot this arena never allocated
        let mut scratch = SimpleLayout::new();
        let wall = || {
            Separator::new(
                SeparatorType::Wall,
                rect(0.0, 0.0, 1.0, 1.0),
                HeightRange::new(0.0, 1.0),
            )
        };
        let foreign = (0..4).map(|_| scratch.add_separator(wall())).last().unwrap();
        let window = Opening::new(
            OpeningType::Window,
            rect(0.0, 0.0, 1.0, 1.0),
            HeightRange::new(0.0, 1.0),
            None,
        )
        .unwrap();
        assert!(matches!(
            layout.add_opening(foreign, window),
            Err(Error::NotFound(EntityKey::Separator(_)))
        ));
    }

    #[test]
    fn test_door_connects_both_rooms() {
        let (layout, door) = two_rooms();
        assert_eq!(layout.opening_areas(door).len(), 2);
        let index = layout.spaces_openings();
        assert_eq!(index.len(), 2);
        assert!(index.values().all(|openings| openings == &vec![door]));
    }

    #[test]
    fn test_areas_separators() {
        let (layout, _) = two_rooms();
        let index = layout.areas_separators();
        assert!(index.values().all(|seps| seps.len() == 1));
    }

    #[test]
    fn test_index_by_type() {
        let (layout, door) = two_rooms();
        assert_eq!(layout.openings_by_type()[&OpeningType::Door], vec![door]);
        assert_eq!(layout.areas_by_type()[&AreaType::NotDefined].len(), 2);
    }

    #[test]
    fn test_feature_assignment() {
        let (mut layout, _) = two_rooms();
        let (area, _) = layout.areas().next().unwrap();
        let toilet = layout
            .add_feature(
                Feature::new(FeatureType::Toilet, rect(10.0, 10.0, 50.0, 70.0)),
                Some(area),
            )
            .unwrap();
        assert_eq!(layout.area_of_feature(toilet), Some(area));
        let space = layout.space_of_area(area).unwrap();
        assert_eq!(layout.space_features(space), vec![toilet]);
    }

    #[test]
    fn test_scale_converts_to_meters() {
        let (mut layout, door) = two_rooms();
        layout.scale(0.01);
        assert_eq!(layout.unit(), LengthUnit::Meters);
        assert_relative_eq!(layout.net_area(), 32.0, epsilon = 1e-9);
        let opening = layout.opening(door).unwrap();
        assert_relative_eq!(opening.height.upper, 2.0);
        let sp = opening.sweeping_points.unwrap();
        assert_relative_eq!(sp.closed_point.x(), 0.8);
        // Connectivity tolerance follows the unit
        assert_eq!(layout.opening_areas(door).len(), 2);
    }

    #[test]
    fn test_failed_transform_leaves_layout_untouched() {
        let (mut layout, _) = two_rooms();
        let before = layout.net_area();
        let result = layout.try_transform(|c| {
            if c.x > 500.0 {
                Err(Error::Reprojection("out of range".to_string()))
            } else {
                Ok(Coord { x: c.x + 1.0, y: c.y })
            }
        });
        assert!(result.is_err());
        assert_relative_eq!(layout.net_area(), before);
        let bounds = layout.bounds().unwrap();
        assert_relative_eq!(bounds.min().x, 0.0);
        assert_relative_eq!(bounds.max().x, 820.0);
    }
}
