// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed element type enums and unit handling.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Physical boundary element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeparatorType {
    Wall,
    Railing,
    Column,
    AreaSplitter,
}

impl SeparatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeparatorType::Wall => "WALL",
            SeparatorType::Railing => "RAILING",
            SeparatorType::Column => "COLUMN",
            SeparatorType::AreaSplitter => "AREA_SPLITTER",
        }
    }

    /// Whether the separator bounds spaces. Area splitters only subdivide them.
    pub fn encloses_spaces(&self) -> bool {
        !matches!(self, SeparatorType::AreaSplitter)
    }
}

impl FromStr for SeparatorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wall" => Ok(SeparatorType::Wall),
            "railing" => Ok(SeparatorType::Railing),
            "column" => Ok(SeparatorType::Column),
            "area_splitter" => Ok(SeparatorType::AreaSplitter),
            other => Err(Error::CorruptedAnnotation(format!(
                "unknown line type '{other}'"
            ))),
        }
    }
}

/// Openings cut into separators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpeningType {
    Door,
    SlidingDoor,
    EntranceDoor,
    Window,
}

impl OpeningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpeningType::Door => "DOOR",
            OpeningType::SlidingDoor => "SLIDING_DOOR",
            OpeningType::EntranceDoor => "ENTRANCE_DOOR",
            OpeningType::Window => "WINDOW",
        }
    }

    /// Swinging doors, which always carry sweeping points.
    pub fn is_winged(&self) -> bool {
        matches!(self, OpeningType::Door | OpeningType::EntranceDoor)
    }

    pub fn is_door(&self) -> bool {
        !matches!(self, OpeningType::Window)
    }
}

impl FromStr for OpeningType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "door" => Ok(OpeningType::Door),
            "sliding_door" => Ok(OpeningType::SlidingDoor),
            "entrance_door" => Ok(OpeningType::EntranceDoor),
            "window" => Ok(OpeningType::Window),
            other => Err(Error::CorruptedAnnotation(format!(
                "unknown hole type '{other}'"
            ))),
        }
    }
}

/// Fixtures and equipment placed inside areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureType {
    Toilet,
    Sink,
    Shower,
    Bathtub,
    Kitchen,
    Stairs,
    Elevator,
    Shaft,
    WashingMachine,
    Seat,
    Ramp,
    BuildingVoid,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Toilet => "TOILET",
            FeatureType::Sink => "SINK",
            FeatureType::Shower => "SHOWER",
            FeatureType::Bathtub => "BATHTUB",
            FeatureType::Kitchen => "KITCHEN",
            FeatureType::Stairs => "STAIRS",
            FeatureType::Elevator => "ELEVATOR",
            FeatureType::Shaft => "SHAFT",
            FeatureType::WashingMachine => "WASHING_MACHINE",
            FeatureType::Seat => "SEAT",
            FeatureType::Ramp => "RAMP",
            FeatureType::BuildingVoid => "BUILDING_VOID",
        }
    }

    /// Features that make a space reachable without a door.
    pub fn grants_access(&self) -> bool {
        matches!(
            self,
            FeatureType::Stairs | FeatureType::Elevator | FeatureType::Shaft
        )
    }
}

impl FromStr for FeatureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let feature = match s.to_ascii_lowercase().as_str() {
            "toilet" => FeatureType::Toilet,
            "sink" => FeatureType::Sink,
            "shower" => FeatureType::Shower,
            "bathtub" => FeatureType::Bathtub,
            "kitchen" => FeatureType::Kitchen,
            "stairs" => FeatureType::Stairs,
            "elevator" => FeatureType::Elevator,
            "shaft" => FeatureType::Shaft,
            "washing_machine" => FeatureType::WashingMachine,
            "seat" => FeatureType::Seat,
            "ramp" => FeatureType::Ramp,
            "building_void" => FeatureType::BuildingVoid,
            other => {
                return Err(Error::CorruptedAnnotation(format!(
                    "unknown item type '{other}'"
                )))
            }
        };
        Ok(feature)
    }
}

macro_rules! impl_display_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_as_str!(SeparatorType, OpeningType, FeatureType);

/// Vertical extent of an element (lower and upper edge)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightRange {
    pub lower: f64,
    pub upper: f64,
}

impl HeightRange {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.lower * factor, self.upper * factor)
    }
}

/// Length unit of a layout's coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LengthUnit {
    /// Native editor unit (centimetres), before scaling
    #[default]
    EditorUnit,
    /// After applying the scale factor
    Meters,
}

impl LengthUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthUnit::EditorUnit => "EDITOR_UNIT",
            LengthUnit::Meters => "METERS",
        }
    }

    /// Converts a length in centimetres to this unit.
    pub fn cm_to_unit(&self, cm: f64) -> f64 {
        match self {
            LengthUnit::EditorUnit => cm,
            LengthUnit::Meters => cm / 100.0,
        }
    }

    /// Converts an area in square centimetres to this unit squared.
    pub fn cm2_to_unit(&self, cm2: f64) -> f64 {
        match self {
            LengthUnit::EditorUnit => cm2,
            LengthUnit::Meters => cm2 / 10_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_raw_type_names() {
        assert_eq!("wall".parse::<SeparatorType>().unwrap(), SeparatorType::Wall);
        assert_eq!(
            "AREA_SPLITTER".parse::<SeparatorType>().unwrap(),
            SeparatorType::AreaSplitter
        );
        assert_eq!(
            "entrance_door".parse::<OpeningType>().unwrap(),
            OpeningType::EntranceDoor
        );
        assert_eq!(
            "washing_machine".parse::<FeatureType>().unwrap(),
            FeatureType::WashingMachine
        );
        assert!("skylight".parse::<OpeningType>().is_err());
    }

    #[test]
    fn test_winged_doors() {
        assert!(OpeningType::Door.is_winged());
        assert!(OpeningType::EntranceDoor.is_winged());
        assert!(!OpeningType::SlidingDoor.is_winged());
        assert!(OpeningType::SlidingDoor.is_door());
        assert!(!OpeningType::Window.is_door());
    }

    #[test]
    fn test_unit_conversion() {
        assert_relative_eq!(LengthUnit::EditorUnit.cm_to_unit(1.0), 1.0);
        assert_relative_eq!(LengthUnit::Meters.cm_to_unit(1.0), 0.01);
        assert_relative_eq!(LengthUnit::Meters.cm2_to_unit(1.0), 1e-4);
    }
}
