// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brooks Geometry
//!
//! Deterministic 2D geometry for floor plan reconstruction:
//!
//! 1. [`repair`] - polygon validity repair, gap closing, small hole/line removal
//! 2. [`door`] - door footprints and sweeping points from CAD arcs or editor points
//! 3. [`postprocess`] - merging raw wall/railing/column polygons per type
//! 4. [`space_maker`] - enclosed spaces and their areas from merged separators
//!
//! All operations are synchronous and pure: the same input always yields the
//! same output, in the same order.

pub mod door;
pub mod error;
pub mod postprocess;
pub mod primitives;
pub mod repair;
pub mod space_maker;

// Re-export geo types for convenience
pub use geo::{Coord, LineString, MultiPolygon, Point, Polygon};

pub use door::{
    pair_arcs_with_lines, CadArc, CadLine, DoorGeometry, DoorSynthesisConfig, DoorSynthesizer,
    ExtensionType, SweepingPoints,
};
pub use error::{Error, Result};
pub use postprocess::{
    MergedSeparators, PostprocessConfig, PostprocessedSeparators, SeparatorPostprocessor,
    SourcePolygon,
};
pub use primitives::{add_width_to_linestring, distance_to_polygon};
pub use repair::{
    as_multipolygon, close_gaps, ensure_geometry_validity, ensure_polygon_validity,
    get_center_line_from_rectangle, remove_small_holes, remove_small_lines, round_multipolygon,
    round_polygon, CenterLines, RepairConfig,
};
pub use space_maker::{SpaceFootprint, SpaceMaker, SpaceMakerConfig};
