// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layout key types for arena-based storage.
//!
//! Keys are created by `slotmap::SlotMap`; they are stable for the lifetime of
//! a layout and deterministic for a given insertion order, which makes them
//! usable as ordering keys in reports.

use slotmap::{new_key_type, Key};

new_key_type! {
    /// Key for a separator (wall, railing, column or area splitter).
    pub struct SeparatorKey;

    /// Key for an opening hosted by a separator.
    pub struct OpeningKey;

    /// Key for an enclosed space.
    pub struct SpaceKey;

    /// Key for an area inside a space.
    pub struct AreaKey;

    /// Key for a feature (fixture or equipment item).
    pub struct FeatureKey;
}

/// A key that can reference any layout entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Separator(SeparatorKey),
    Opening(OpeningKey),
    Space(SpaceKey),
    Area(AreaKey),
    Feature(FeatureKey),
}

/// The kind of layout entity a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Separator,
    Opening,
    Space,
    Area,
    Feature,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Separator => "SEPARATOR",
            EntityKind::Opening => "OPENING",
            EntityKind::Space => "SPACE",
            EntityKind::Area => "AREA",
            EntityKind::Feature => "FEATURE",
        }
    }
}

impl EntityKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityKey::Separator(_) => EntityKind::Separator,
            EntityKey::Opening(_) => EntityKind::Opening,
            EntityKey::Space(_) => EntityKind::Space,
            EntityKey::Area(_) => EntityKind::Area,
            EntityKey::Feature(_) => EntityKind::Feature,
        }
    }

    /// Numeric id stable for a given layout, used in serialized output.
    pub fn id(&self) -> u64 {
        match self {
            EntityKey::Separator(k) => key_id(*k),
            EntityKey::Opening(k) => key_id(*k),
            EntityKey::Space(k) => key_id(*k),
            EntityKey::Area(k) => key_id(*k),
            EntityKey::Feature(k) => key_id(*k),
        }
    }
}

/// Numeric id of any slot map key.
pub fn key_id<K: Key>(key: K) -> u64 {
    key.data().as_ffi()
}

impl From<SeparatorKey> for EntityKey {
    fn from(k: SeparatorKey) -> Self {
        EntityKey::Separator(k)
    }
}

impl From<OpeningKey> for EntityKey {
    fn from(k: OpeningKey) -> Self {
        EntityKey::Opening(k)
    }
}

impl From<SpaceKey> for EntityKey {
    fn from(k: SpaceKey) -> Self {
        EntityKey::Space(k)
    }
}

impl From<AreaKey> for EntityKey {
    fn from(k: AreaKey) -> Self {
        EntityKey::Area(k)
    }
}

impl From<FeatureKey> for EntityKey {
    fn from(k: FeatureKey) -> Self {
        EntityKey::Feature(k)
    }
}
