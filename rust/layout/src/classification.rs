// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Area type taxonomy
//!
//! Area types are a closed enum. Their SIA 416 category and their place in the
//! parent/child classification tree live in a declarative table that is turned
//! into lookup maps once, on first use.

use crate::error::{Error, Result};
use crate::types::FeatureType;
use rustc_hash::FxHashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Room type of an area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AreaType {
    #[default]
    NotDefined,
    Room,
    Bedroom,
    LivingRoom,
    LivingDining,
    Dining,
    Office,
    Kitchen,
    KitchenDining,
    Bathroom,
    Storeroom,
    LaundryRoom,
    Garage,
    Outdoor,
    Balcony,
    Loggia,
    Terrace,
    Corridor,
    Staircase,
    Elevator,
    Shaft,
    TechnicalArea,
    Void,
}

/// SIA 416 floor area category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SiaCategory {
    /// Main usable area (Hauptnutzfläche)
    Hnf,
    /// Secondary usable area (Nebennutzfläche)
    Nnf,
    /// Circulation area (Verkehrsfläche)
    Vf,
    /// Functional area (Funktionsfläche)
    Ff,
    /// Exterior floor area (Aussengeschossfläche)
    Anf,
    #[default]
    NotDefined,
}

impl SiaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiaCategory::Hnf => "HNF",
            SiaCategory::Nnf => "NNF",
            SiaCategory::Vf => "VF",
            SiaCategory::Ff => "FF",
            SiaCategory::Anf => "ANF",
            SiaCategory::NotDefined => "NOT_DEFINED",
        }
    }
}

struct TaxonomyEntry {
    area_type: AreaType,
    name: &'static str,
    sia: SiaCategory,
    parent: Option<AreaType>,
}

const fn entry(
    area_type: AreaType,
    name: &'static str,
    sia: SiaCategory,
    parent: Option<AreaType>,
) -> TaxonomyEntry {
    TaxonomyEntry {
        area_type,
        name,
        sia,
        parent,
    }
}

use AreaType as A;
use SiaCategory as S;

const TAXONOMY: &[TaxonomyEntry] = &[
    entry(A::NotDefined, "NOT_DEFINED", S::NotDefined, None),
    entry(A::Room, "ROOM", S::Hnf, None),
    entry(A::Bedroom, "BEDROOM", S::Hnf, Some(A::Room)),
    entry(A::LivingRoom, "LIVING_ROOM", S::Hnf, Some(A::Room)),
    entry(A::LivingDining, "LIVING_DINING", S::Hnf, Some(A::Room)),
    entry(A::Dining, "DINING", S::Hnf, Some(A::Room)),
    entry(A::Office, "OFFICE", S::Hnf, Some(A::Room)),
    entry(A::Kitchen, "KITCHEN", S::Hnf, None),
    entry(A::KitchenDining, "KITCHEN_DINING", S::Hnf, Some(A::Kitchen)),
    entry(A::Bathroom, "BATHROOM", S::Hnf, None),
    entry(A::Storeroom, "STOREROOM", S::Nnf, None),
    entry(A::LaundryRoom, "LAUNDRY_ROOM", S::Nnf, Some(A::Storeroom)),
    entry(A::Garage, "GARAGE", S::Nnf, None),
    entry(A::Outdoor, "OUTDOOR", S::Anf, None),
    entry(A::Balcony, "BALCONY", S::Anf, Some(A::Outdoor)),
    entry(A::Loggia, "LOGGIA", S::Anf, Some(A::Outdoor)),
    entry(A::Terrace, "TERRACE", S::Anf, Some(A::Outdoor)),
    entry(A::Corridor, "CORRIDOR", S::Vf, None),
    entry(A::Staircase, "STAIRCASE", S::Vf, None),
    entry(A::Elevator, "ELEVATOR", S::Vf, None),
    entry(A::Shaft, "SHAFT", S::Ff, None),
    entry(A::TechnicalArea, "TECHNICAL_AREA", S::Ff, None),
    entry(A::Void, "VOID", S::NotDefined, None),
];

struct Taxonomy {
    by_type: FxHashMap<AreaType, &'static TaxonomyEntry>,
    by_name: FxHashMap<&'static str, AreaType>,
    children: FxHashMap<AreaType, Vec<AreaType>>,
}

fn taxonomy() -> &'static Taxonomy {
    static TAXONOMY_INDEX: OnceLock<Taxonomy> = OnceLock::new();
    TAXONOMY_INDEX.get_or_init(|| {
        let mut by_type = FxHashMap::default();
        let mut by_name = FxHashMap::default();
        let mut children: FxHashMap<AreaType, Vec<AreaType>> = FxHashMap::default();
        for e in TAXONOMY {
            by_type.insert(e.area_type, e);
            by_name.insert(e.name, e.area_type);
            if let Some(parent) = e.parent {
                children.entry(parent).or_default().push(e.area_type);
            }
        }
        Taxonomy {
            by_type,
            by_name,
            children,
        }
    })
}

impl AreaType {
    /// Every area type, in declaration order.
    pub fn all() -> impl Iterator<Item = AreaType> {
        TAXONOMY.iter().map(|e| e.area_type)
    }

    pub fn as_str(&self) -> &'static str {
        taxonomy()
            .by_type
            .get(self)
            .map_or("NOT_DEFINED", |e| e.name)
    }

    pub fn sia_category(&self) -> SiaCategory {
        taxonomy()
            .by_type
            .get(self)
            .map_or(SiaCategory::NotDefined, |e| e.sia)
    }

    pub fn parent(&self) -> Option<AreaType> {
        taxonomy().by_type.get(self).and_then(|e| e.parent)
    }

    pub fn children(&self) -> &'static [AreaType] {
        taxonomy()
            .children
            .get(self)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// Whether `self` is `ancestor` or one of its descendants.
    pub fn is_a(&self, ancestor: AreaType) -> bool {
        let mut current = Some(*self);
        while let Some(t) = current {
            if t == ancestor {
                return true;
            }
            current = t.parent();
        }
        false
    }

    /// Infers a room type from the features placed in an area. Vertical
    /// circulation wins over sanitary fixtures, which win over kitchens.
    pub fn from_features<I>(features: I) -> Option<AreaType>
    where
        I: IntoIterator<Item = FeatureType>,
    {
        features
            .into_iter()
            .filter_map(|f| match f {
                FeatureType::Stairs => Some((0, AreaType::Staircase)),
                FeatureType::Elevator => Some((1, AreaType::Elevator)),
                FeatureType::Shaft => Some((2, AreaType::Shaft)),
                FeatureType::Toilet | FeatureType::Shower | FeatureType::Bathtub => {
                    Some((3, AreaType::Bathroom))
                }
                FeatureType::Kitchen => Some((4, AreaType::Kitchen)),
                _ => None,
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, t)| t)
    }
}

impl FromStr for AreaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        taxonomy()
            .by_name
            .get(name.as_str())
            .copied()
            .ok_or_else(|| Error::CorruptedAnnotation(format!("unknown area type '{s}'")))
    }
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_is_in_the_table() {
        assert_eq!(AreaType::all().count(), TAXONOMY.len());
        for t in AreaType::all() {
            assert_eq!(t.as_str().parse::<AreaType>().unwrap(), t);
        }
    }

    #[test]
    fn test_parse_is_lenient_on_case_and_separators() {
        assert_eq!("living room".parse::<AreaType>().unwrap(), AreaType::LivingRoom);
        assert_eq!("kitchen-dining".parse::<AreaType>().unwrap(), AreaType::KitchenDining);
        assert!("ballroom".parse::<AreaType>().is_err());
    }

    #[test]
    fn test_tree_relationships() {
        assert_eq!(AreaType::Bedroom.parent(), Some(AreaType::Room));
        assert!(AreaType::Room.children().contains(&AreaType::Bedroom));
        assert!(!AreaType::Room.is_leaf());
        assert!(AreaType::Bedroom.is_leaf());
        assert!(AreaType::Balcony.is_a(AreaType::Outdoor));
        assert!(!AreaType::Balcony.is_a(AreaType::Room));
    }

    #[test]
    fn test_sia_categories() {
        assert_eq!(AreaType::Bedroom.sia_category(), SiaCategory::Hnf);
        assert_eq!(AreaType::Corridor.sia_category(), SiaCategory::Vf);
        assert_eq!(AreaType::Shaft.sia_category(), SiaCategory::Ff);
        assert_eq!(AreaType::Loggia.sia_category(), SiaCategory::Anf);
        assert_eq!(AreaType::NotDefined.sia_category(), SiaCategory::NotDefined);
    }

    #[test]
    fn test_feature_inference() {
        use FeatureType::*;
        assert_eq!(AreaType::from_features([Sink, Toilet]), Some(AreaType::Bathroom));
        assert_eq!(AreaType::from_features([Kitchen, Shower]), Some(AreaType::Bathroom));
        assert_eq!(AreaType::from_features([Kitchen]), Some(AreaType::Kitchen));
        assert_eq!(AreaType::from_features([Toilet, Stairs]), Some(AreaType::Staircase));
        assert_eq!(AreaType::from_features([Seat, Sink]), None);
        assert_eq!(AreaType::from_features(Vec::new()), None);
    }
}
