// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layout assembly from raw annotations.
//!
//! [`LayoutMapper::map`] is the single entry point. It runs, in order:
//!
//! 1. schema validation and auto-fix (when `validate`)
//! 2. separators from lines, merged per type when `postprocessed`
//! 3. openings from holes, attached to the separator built from their line
//! 4. spaces and areas from the enclosing separators and area splitters
//! 5. features from items, each assigned to the area it overlaps most
//! 6. area types from editor labels and/or contained features (when `classified`)
//! 7. scaling to metres (when `scaled`) and georeferencing (when `georeferenced`)

use crate::annotation::{
    polygon_from_rings, validate_and_fix, Annotation, Layer, RawHole, RawItem, RawLine,
};
use crate::classification::AreaType;
use crate::error::{Error, Result};
use crate::georef::{CoordinateTransformer, GeoReference};
use crate::keys::{AreaKey, SeparatorKey};
use crate::layout::{Feature, Opening, Separator, SimpleLayout};
use crate::types::{FeatureType, HeightRange, OpeningType, SeparatorType};
use brooks_geometry::primitives::{rotate_around, EPSILON_2D};
use brooks_geometry::{
    add_width_to_linestring, ensure_polygon_validity, DoorSynthesisConfig, DoorSynthesizer,
    PostprocessConfig, RepairConfig, SeparatorPostprocessor, SourcePolygon,
    SpaceMaker, SpaceMakerConfig, SweepingPoints,
};
use geo::{Area as _, BooleanOps, Coord, Intersects, InteriorPoint, LineString, Point, Polygon};
use rustc_hash::FxHashMap;

/// Separator height when a line carries none, in editor units.
pub const DEFAULT_WALL_HEIGHT: f64 = 260.0;

/// Opening height above its lower edge when a hole carries none, in editor units.
pub const DEFAULT_OPENING_HEIGHT: f64 = 200.0;

/// The seven switches selecting how a layout is assembled.
///
/// This is the memoization key of the layout handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutConfig {
    pub scaled: bool,
    pub validate: bool,
    pub classified: bool,
    pub georeferenced: bool,
    pub postprocessed: bool,
    pub set_area_types_by_features: bool,
    pub set_area_types_from_react_areas: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            scaled: false,
            validate: true,
            classified: false,
            georeferenced: false,
            postprocessed: false,
            set_area_types_by_features: true,
            set_area_types_from_react_areas: false,
        }
    }
}

/// Options shared by every assembly of one plan
#[derive(Debug, Clone)]
pub struct MapperOptions {
    /// Editor units to metres. Default: 0.01
    pub scale_factor: f64,
    pub georeference: Option<GeoReference>,
    pub repair: RepairConfig,
    pub postprocess: PostprocessConfig,
    pub space_maker: SpaceMakerConfig,
    pub doors: DoorSynthesisConfig,
    pub default_wall_height: f64,
    pub default_opening_height: f64,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            scale_factor: 0.01,
            georeference: None,
            repair: RepairConfig::default(),
            postprocess: PostprocessConfig::default(),
            space_maker: SpaceMakerConfig::default(),
            doors: DoorSynthesisConfig::default(),
            default_wall_height: DEFAULT_WALL_HEIGHT,
            default_opening_height: DEFAULT_OPENING_HEIGHT,
        }
    }
}

/// Source line id to the separator(s) built from it. A railing cut by walls
/// maps to several pieces.
type LineIndex = FxHashMap<String, Vec<SeparatorKey>>;

/// Builds [`SimpleLayout`]s from annotations.
pub struct LayoutMapper<'a> {
    options: &'a MapperOptions,
    transformer: &'a dyn CoordinateTransformer,
}

impl<'a> LayoutMapper<'a> {
    pub fn new(options: &'a MapperOptions, transformer: &'a dyn CoordinateTransformer) -> Self {
        Self {
            options,
            transformer,
        }
    }

    /// Assembles a layout. The annotation itself is never modified; schema
    /// fixes are applied to a private copy.
    pub fn map(&self, annotation: &Annotation, config: LayoutConfig) -> Result<SimpleLayout> {
        let fixed;
        let annotation = if config.validate {
            let mut copy = annotation.clone();
            validate_and_fix(&mut copy)?;
            fixed = copy;
            &fixed
        } else {
            annotation
        };

        let mut layout = SimpleLayout::new();
        let lines = self.build_separators(annotation, config.postprocessed, &mut layout)?;
        self.build_openings(annotation, &lines, &mut layout)?;
        self.build_spaces(&mut layout)?;
        self.build_features(annotation, &mut layout)?;

        if config.classified {
            if config.set_area_types_from_react_areas {
                self.classify_from_annotation(annotation, &mut layout)?;
            }
            if config.set_area_types_by_features {
                classify_by_features(&mut layout)?;
            }
        }

        if config.scaled {
            layout.scale(self.options.scale_factor);
        }
        if config.georeferenced {
            let georef = self.options.georeference.as_ref().ok_or_else(|| {
                Error::Reprojection("georeferencing requested without a georeference".to_string())
            })?;
            layout.try_transform(|c| georef.georeference(self.transformer, c))?;
        }

        tracing::info!(
            separators = layout.num_separators(),
            openings = layout.num_openings(),
            spaces = layout.num_spaces(),
            areas = layout.num_areas(),
            features = layout.num_features(),
            ?config,
            "assembled layout"
        );
        Ok(layout)
    }

    // =========================================================================
    // Separators
    // =========================================================================

    fn build_separators(
        &self,
        annotation: &Annotation,
        postprocessed: bool,
        layout: &mut SimpleLayout,
    ) -> Result<LineIndex> {
        let mut raw: Vec<(SeparatorType, SourcePolygon<String>, HeightRange)> = Vec::new();
        for layer in annotation.layers.values() {
            for (line_id, line) in &layer.lines {
                let separator_type: SeparatorType = line.line_type.parse()?;
                let footprint = line_footprint(layer, line_id, line)?;
                if footprint.unsigned_area() <= EPSILON_2D {
                    tracing::warn!(line = %line_id, "discarding zero-area separator");
                    continue;
                }
                let footprint = ensure_polygon_validity(&footprint, &self.options.repair)?;
                let height = HeightRange::new(
                    0.0,
                    line.properties
                        .height
                        .map_or(self.options.default_wall_height, |h| h.value()),
                );
                raw.push((separator_type, SourcePolygon::new(line_id.clone(), footprint), height));
            }
        }

        let heights: FxHashMap<&str, HeightRange> = raw
            .iter()
            .map(|(_, s, h)| (s.id.as_str(), *h))
            .collect();
        let mut index = LineIndex::default();
        let mut insert = |layout: &mut SimpleLayout,
                          separator_type: SeparatorType,
                          footprint: Polygon<f64>,
                          ids: &[String]| {
            let upper = ids
                .iter()
                .filter_map(|id| heights.get(id.as_str()))
                .map(|h| h.upper)
                .fold(f64::NAN, f64::max);
            let upper = if upper.is_nan() {
                self.options.default_wall_height
            } else {
                upper
            };
            let key = layout.add_separator(
                Separator::new(separator_type, footprint, HeightRange::new(0.0, upper))
                    .with_source_ids(ids.to_vec()),
            );
            for id in ids {
                index.entry(id.clone()).or_default().push(key);
            }
        };

        let of_type = |t: SeparatorType| -> Vec<SourcePolygon<String>> {
            raw.iter()
                .filter(|(st, _, _)| *st == t)
                .map(|(_, s, _)| s.clone())
                .collect()
        };

        if postprocessed {
            let processed = SeparatorPostprocessor::new(self.options.postprocess.clone()).process(
                &of_type(SeparatorType::Wall),
                &of_type(SeparatorType::Railing),
                &of_type(SeparatorType::Column),
            );
            for (separator_type, merged) in [
                (SeparatorType::Wall, &processed.walls),
                (SeparatorType::Railing, &processed.railings),
                (SeparatorType::Column, &processed.columns),
            ] {
                for (footprint, ids) in merged.iter() {
                    insert(layout, separator_type, footprint.clone(), ids);
                }
            }
            for splitter in of_type(SeparatorType::AreaSplitter) {
                insert(
                    layout,
                    SeparatorType::AreaSplitter,
                    splitter.polygon,
                    std::slice::from_ref(&splitter.id),
                );
            }
        } else {
            for (separator_type, source, _) in &raw {
                insert(
                    layout,
                    *separator_type,
                    source.polygon.clone(),
                    std::slice::from_ref(&source.id),
                );
            }
        }

        tracing::debug!(
            lines = raw.len(),
            separators = layout.num_separators(),
            postprocessed,
            "built separators"
        );
        Ok(index)
    }

    // =========================================================================
    // Openings
    // =========================================================================

    fn build_openings(
        &self,
        annotation: &Annotation,
        lines: &LineIndex,
        layout: &mut SimpleLayout,
    ) -> Result<()> {
        for layer in annotation.layers.values() {
            for (hole_id, hole) in &layer.holes {
                let opening_type: OpeningType = hole.hole_type.parse()?;
                let sweeping_points = hole.door_sweeping_points.map(|sp| SweepingPoints {
                    angle_point: Point::new(sp.angle_point[0], sp.angle_point[1]),
                    closed_point: Point::new(sp.closed_point[0], sp.closed_point[1]),
                    opened_point: Point::new(sp.opened_point[0], sp.opened_point[1]),
                });

                let candidates = lines.get(&hole.line).ok_or_else(|| {
                    Error::CorruptedAnnotation(format!(
                        "hole '{hole_id}' is hosted by line '{}' which produced no separator",
                        hole.line
                    ))
                })?;

                let footprint = match polygon_from_rings(&hole.coordinates) {
                    Some(p) => p,
                    None => {
                        let host = candidates
                            .first()
                            .and_then(|k| layout.separator(*k))
                            .map(|s| s.footprint.clone());
                        door_footprint(hole_id, sweeping_points, host, &self.options.doors)?
                    }
                };
                let footprint = ensure_polygon_validity(&footprint, &self.options.repair)?;

                let host = pick_host(layout, candidates, &footprint).ok_or_else(|| {
                    Error::CorruptedAnnotation(format!("hole '{hole_id}' has no host separator"))
                })?;
                let opening = Opening::new(
                    opening_type,
                    footprint,
                    self.opening_height(hole),
                    sweeping_points,
                )
                .map_err(|e| match e {
                    Error::CorruptedAnnotation(msg) => {
                        Error::CorruptedAnnotation(format!("hole '{hole_id}': {msg}"))
                    }
                    other => other,
                })?
                .with_source_id(hole_id.clone());
                layout.add_opening(host, opening)?;
            }
        }
        tracing::debug!(openings = layout.num_openings(), "built openings");
        Ok(())
    }

    fn opening_height(&self, hole: &RawHole) -> HeightRange {
        let props = &hole.properties;
        let lower = props
            .heights
            .and_then(|h| h.lower_edge)
            .or_else(|| props.altitude.map(|a| a.value()))
            .unwrap_or(0.0);
        let upper = props
            .heights
            .and_then(|h| h.upper_edge)
            .unwrap_or(lower + self.options.default_opening_height);
        HeightRange::new(lower, upper)
    }

    // =========================================================================
    // Spaces, areas and features
    // =========================================================================

    fn build_spaces(&self, layout: &mut SimpleLayout) -> Result<()> {
        let (enclosing, splitters): (Vec<_>, Vec<_>) = layout
            .separators()
            .partition(|(_, s)| s.separator_type.encloses_spaces());
        let footprints = |entries: Vec<(SeparatorKey, &Separator)>| -> Vec<Polygon<f64>> {
            entries.into_iter().map(|(_, s)| s.footprint.clone()).collect()
        };
        let (enclosing, splitters) = (footprints(enclosing), footprints(splitters));

        let spaces = SpaceMaker::new(self.options.space_maker.clone()).make(&enclosing, &splitters);
        for space in spaces {
            let key = layout.add_space(space.footprint);
            for area in space.areas {
                layout.add_area(key, area, AreaType::NotDefined)?;
            }
        }
        Ok(())
    }

    fn build_features(&self, annotation: &Annotation, layout: &mut SimpleLayout) -> Result<()> {
        for layer in annotation.layers.values() {
            for (item_id, item) in &layer.items {
                let feature_type: FeatureType = match item.item_type.parse() {
                    Ok(t) => t,
                    Err(_) => {
                        tracing::warn!(
                            item = %item_id,
                            item_type = %item.item_type,
                            "skipping item of unknown type"
                        );
                        continue;
                    }
                };
                let footprint = item_footprint(item_id, item)?;
                let area = best_overlap(layout.areas().map(|(k, a)| (k, &a.footprint)), &footprint);
                if area.is_none() {
                    tracing::debug!(item = %item_id, "feature lies outside every area");
                }
                layout.add_feature(
                    Feature::new(feature_type, footprint).with_source_id(item_id.clone()),
                    area,
                )?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Applies editor area labels to the areas containing their interior point.
    fn classify_from_annotation(
        &self,
        annotation: &Annotation,
        layout: &mut SimpleLayout,
    ) -> Result<()> {
        let mut labelled: Vec<(Polygon<f64>, AreaType)> = Vec::new();
        for layer in annotation.layers.values() {
            for (area_id, raw) in &layer.areas {
                let Some(label) = raw.properties.area_type.as_deref() else {
                    continue;
                };
                let area_type = match label.parse::<AreaType>() {
                    Ok(t) => t,
                    Err(_) => {
                        tracing::warn!(area = %area_id, label, "ignoring unknown area type label");
                        continue;
                    }
                };
                if let Some(polygon) = polygon_from_rings(&raw.coords) {
                    labelled.push((polygon, area_type));
                }
            }
        }

        let assignments: Vec<(AreaKey, AreaType)> = layout
            .areas()
            .filter_map(|(key, area)| {
                labelled
                    .iter()
                    .filter(|(polygon, _)| {
                        polygon
                            .interior_point()
                            .is_some_and(|p| area.footprint.intersects(&p))
                    })
                    .map(|(polygon, t)| (polygon.intersection(&area.footprint).unsigned_area(), *t))
                    .fold(None, |best: Option<(f64, AreaType)>, candidate| match best {
                        Some(b) if b.0 >= candidate.0 => Some(b),
                        _ => Some(candidate),
                    })
                    .map(|(_, t)| (key, t))
            })
            .collect();
        for (key, area_type) in assignments {
            layout.set_area_type(key, area_type)?;
        }
        Ok(())
    }
}

/// Infers the type of every still unclassified area from its features.
fn classify_by_features(layout: &mut SimpleLayout) -> Result<()> {
    let inferred: Vec<(AreaKey, AreaType)> = layout
        .areas()
        .filter(|(_, a)| a.area_type == AreaType::NotDefined)
        .filter_map(|(key, area)| {
            let features = area
                .features()
                .iter()
                .filter_map(|f| layout.feature(*f))
                .map(|f| f.feature_type);
            AreaType::from_features(features).map(|t| (key, t))
        })
        .collect();
    for (key, area_type) in inferred {
        layout.set_area_type(key, area_type)?;
    }
    Ok(())
}

/// Footprint of a line: its explicit polygon, else its vertex segment widened
/// by the line width.
fn line_footprint(layer: &Layer, line_id: &str, line: &RawLine) -> Result<Polygon<f64>> {
    if let Some(polygon) = polygon_from_rings(&line.coordinates) {
        return Ok(polygon);
    }
    let width = line
        .properties
        .width
        .map(|w| w.value())
        .filter(|w| *w > 0.0)
        .ok_or_else(|| {
            Error::CorruptedAnnotation(format!(
                "line '{line_id}' has neither coordinates nor a positive width"
            ))
        })?;
    let vertex = |i: usize| -> Result<Coord<f64>> {
        line.vertices
            .get(i)
            .and_then(|id| layer.vertices.get(id))
            .map(|v| v.coord())
            .ok_or_else(|| {
                Error::CorruptedAnnotation(format!("line '{line_id}' is missing vertex {i}"))
            })
    };
    Ok(add_width_to_linestring(vertex(0)?, vertex(1)?, width)?)
}

/// Door step rectangle for a hole that only carries sweeping points. The
/// step spans hinge to closed point and is as deep as the host wall.
fn door_footprint(
    hole_id: &str,
    sweeping_points: Option<SweepingPoints>,
    host: Option<Polygon<f64>>,
    config: &DoorSynthesisConfig,
) -> Result<Polygon<f64>> {
    let sp = sweeping_points.ok_or_else(|| {
        Error::CorruptedAnnotation(format!(
            "hole '{hole_id}' has neither coordinates nor sweeping points"
        ))
    })?;
    if sp.extension_type().is_none() {
        return Err(Error::CorruptedAnnotation(format!(
            "hole '{hole_id}' has collinear sweeping points"
        )));
    }
    let walls: Vec<Polygon<f64>> = host.into_iter().collect();
    let width = DoorSynthesizer::new(&walls, config.clone()).door_width_at(sp.angle_point.0);
    Ok(add_width_to_linestring(
        sp.angle_point.0,
        sp.closed_point.0,
        width,
    )?)
}

/// Footprint of an item: its explicit polygon, else a `width` x `length`
/// rectangle centred on (x, y) and rotated counter-clockwise.
fn item_footprint(item_id: &str, item: &RawItem) -> Result<Polygon<f64>> {
    if let Some(polygon) = polygon_from_rings(&item.coordinates) {
        return Ok(polygon);
    }
    let (Some(w), Some(l)) = (item.properties.width, item.properties.length) else {
        return Err(Error::CorruptedAnnotation(format!(
            "item '{item_id}' has neither coordinates nor dimensions"
        )));
    };
    let (hw, hl) = (w.value() / 2.0, l.value() / 2.0);
    let center = Coord {
        x: item.x,
        y: item.y,
    };
    let angle = item.rotation.to_radians();
    let ring: Vec<Coord<f64>> = [(-hw, -hl), (hw, -hl), (hw, hl), (-hw, hl)]
        .into_iter()
        .map(|(dx, dy)| {
            rotate_around(
                Coord {
                    x: center.x + dx,
                    y: center.y + dy,
                },
                center,
                angle,
            )
        })
        .collect();
    Ok(Polygon::new(LineString::from(ring), vec![]))
}

/// Key whose footprint overlaps `footprint` the most, if any overlaps at all.
fn best_overlap<'p, K: Copy>(
    candidates: impl Iterator<Item = (K, &'p Polygon<f64>)>,
    footprint: &Polygon<f64>,
) -> Option<K> {
    candidates
        .map(|(k, p)| (k, p.intersection(footprint).unsigned_area()))
        .filter(|(_, overlap)| *overlap > EPSILON_2D)
        .fold(None, |best: Option<(K, f64)>, (k, overlap)| match best {
            Some(b) if b.1 >= overlap => Some(b),
            _ => Some((k, overlap)),
        })
        .map(|(k, _)| k)
}

/// Host for an opening: the only candidate, or the candidate piece it
/// overlaps most.
fn pick_host(
    layout: &SimpleLayout,
    candidates: &[SeparatorKey],
    footprint: &Polygon<f64>,
) -> Option<SeparatorKey> {
    match candidates {
        [] => None,
        [only] => Some(*only),
        _ => best_overlap(
            candidates
                .iter()
                .filter_map(|k| layout.separator(*k).map(|s| (*k, &s.footprint))),
            footprint,
        )
        .or_else(|| candidates.first().copied()),
    }
}
