// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON encoding of layouts and violations.
//!
//! Every serializable shape is a [`BrooksValue`]; [`encode`] is the single
//! recursive match turning one into a `serde_json::Value`. Polygons follow
//! the GeoJSON geometry layout, entities are referenced by [`EntityKey::id`].

use crate::error::Result;
use crate::keys::EntityKey;
use crate::layout::SimpleLayout;
use crate::types::HeightRange;
use crate::validator::Violation;
use brooks_geometry::SweepingPoints;
use geo::{LineString, MultiPolygon, Point, Polygon};
use serde_json::{Map, Number, Value};

/// The closed set of values the encoder understands.
#[derive(Debug, Clone, PartialEq)]
pub enum BrooksValue {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    Point(Point<f64>),
    /// Upper-case label of a closed enumeration
    Enum(&'static str),
    Violation(Box<Violation>),
    Entity(EntityKey),
    Number(f64),
    Text(String),
    Bool(bool),
    Map(Vec<(String, BrooksValue)>),
    Collection(Vec<BrooksValue>),
    Null,
}

impl BrooksValue {
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, BrooksValue)>) -> Self {
        BrooksValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn collection<T: Into<BrooksValue>>(items: impl IntoIterator<Item = T>) -> Self {
        BrooksValue::Collection(items.into_iter().map(Into::into).collect())
    }
}

impl From<Polygon<f64>> for BrooksValue {
    fn from(p: Polygon<f64>) -> Self {
        BrooksValue::Polygon(p)
    }
}

impl From<Point<f64>> for BrooksValue {
    fn from(p: Point<f64>) -> Self {
        BrooksValue::Point(p)
    }
}

impl From<Violation> for BrooksValue {
    fn from(v: Violation) -> Self {
        BrooksValue::Violation(Box::new(v))
    }
}

impl From<EntityKey> for BrooksValue {
    fn from(k: EntityKey) -> Self {
        BrooksValue::Entity(k)
    }
}

impl From<f64> for BrooksValue {
    fn from(n: f64) -> Self {
        BrooksValue::Number(n)
    }
}

impl From<String> for BrooksValue {
    fn from(s: String) -> Self {
        BrooksValue::Text(s)
    }
}

impl<T: Into<BrooksValue>> From<Option<T>> for BrooksValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(BrooksValue::Null, Into::into)
    }
}

/// Encodes a value into JSON.
///
/// Non-finite numbers encode as `null`.
pub fn encode(value: &BrooksValue) -> Value {
    match value {
        BrooksValue::Polygon(p) => geometry("Polygon", polygon_rings(p)),
        BrooksValue::MultiPolygon(mp) => geometry(
            "MultiPolygon",
            Value::Array(mp.0.iter().map(polygon_rings).collect()),
        ),
        BrooksValue::Point(p) => geometry("Point", position(p.x(), p.y())),
        BrooksValue::Enum(label) => Value::String((*label).to_string()),
        BrooksValue::Violation(v) => encode(&violation_value(v)),
        BrooksValue::Entity(key) => Value::from(key.id()),
        BrooksValue::Number(n) => number(*n),
        BrooksValue::Text(s) => Value::String(s.clone()),
        BrooksValue::Bool(b) => Value::Bool(*b),
        BrooksValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (k, v) in entries {
                map.insert(k.clone(), encode(v));
            }
            Value::Object(map)
        }
        BrooksValue::Collection(items) => Value::Array(items.iter().map(encode).collect()),
        BrooksValue::Null => Value::Null,
    }
}

fn number(n: f64) -> Value {
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

fn position(x: f64, y: f64) -> Value {
    Value::Array(vec![number(x), number(y)])
}

fn ring(ls: &LineString<f64>) -> Value {
    Value::Array(ls.0.iter().map(|c| position(c.x, c.y)).collect())
}

fn polygon_rings(p: &Polygon<f64>) -> Value {
    let mut rings = vec![ring(p.exterior())];
    rings.extend(p.interiors().iter().map(ring));
    Value::Array(rings)
}

fn geometry(kind: &str, coordinates: Value) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::String(kind.into()));
    map.insert("coordinates".into(), coordinates);
    Value::Object(map)
}

fn height_value(h: &HeightRange) -> BrooksValue {
    BrooksValue::map([
        ("lower", BrooksValue::Number(h.lower)),
        ("upper", BrooksValue::Number(h.upper)),
    ])
}

fn sweeping_points_value(sp: &SweepingPoints) -> BrooksValue {
    BrooksValue::map([
        ("angle_point", BrooksValue::Point(sp.angle_point)),
        ("closed_point", BrooksValue::Point(sp.closed_point)),
        ("opened_point", BrooksValue::Point(sp.opened_point)),
    ])
}

fn violation_value(v: &Violation) -> BrooksValue {
    BrooksValue::map([
        ("type", BrooksValue::Enum(v.violation_type.as_str())),
        ("entity_kind", BrooksValue::Enum(v.entity.kind().as_str())),
        ("entity_id", v.entity.into()),
        ("position", v.position.into()),
        ("is_blocking", BrooksValue::Bool(v.is_blocking)),
        ("text", v.text.clone().into()),
    ])
}

fn ids<K: Into<EntityKey> + Copy>(keys: &[K]) -> BrooksValue {
    BrooksValue::Collection(keys.iter().map(|k| BrooksValue::Entity((*k).into())).collect())
}

/// The layout as an encoder value.
pub fn layout_value(layout: &SimpleLayout) -> BrooksValue {
    let separators = layout.separators().map(|(key, s)| {
        BrooksValue::map([
            ("id", EntityKey::from(key).into()),
            ("type", BrooksValue::Enum(s.separator_type.as_str())),
            ("footprint", s.footprint.clone().into()),
            ("height", height_value(&s.height)),
            ("openings", ids(s.openings())),
        ])
    });
    let openings = layout.openings().map(|(key, o)| {
        BrooksValue::map([
            ("id", EntityKey::from(key).into()),
            ("type", BrooksValue::Enum(o.opening_type.as_str())),
            ("footprint", o.footprint.clone().into()),
            ("height", height_value(&o.height)),
            ("separator", EntityKey::from(o.separator()).into()),
            (
                "sweeping_points",
                o.sweeping_points
                    .as_ref()
                    .map_or(BrooksValue::Null, sweeping_points_value),
            ),
        ])
    });
    let spaces = layout.spaces().map(|(key, s)| {
        BrooksValue::map([
            ("id", EntityKey::from(key).into()),
            ("footprint", s.footprint.clone().into()),
            ("areas", ids(s.areas())),
        ])
    });
    let areas = layout.areas().map(|(key, a)| {
        BrooksValue::map([
            ("id", EntityKey::from(key).into()),
            ("type", BrooksValue::Enum(a.area_type.as_str())),
            ("footprint", a.footprint.clone().into()),
            ("space", EntityKey::from(a.space()).into()),
            ("features", ids(a.features())),
        ])
    });
    let features = layout.features().map(|(key, f)| {
        BrooksValue::map([
            ("id", EntityKey::from(key).into()),
            ("type", BrooksValue::Enum(f.feature_type.as_str())),
            ("footprint", f.footprint.clone().into()),
            ("area", f.area().map(EntityKey::from).into()),
        ])
    });

    BrooksValue::map([
        ("unit", BrooksValue::Enum(layout.unit().as_str())),
        ("separators", BrooksValue::Collection(separators.collect())),
        ("openings", BrooksValue::Collection(openings.collect())),
        ("spaces", BrooksValue::Collection(spaces.collect())),
        ("areas", BrooksValue::Collection(areas.collect())),
        ("features", BrooksValue::Collection(features.collect())),
    ])
}

/// Encodes the whole layout.
pub fn layout_to_json(layout: &SimpleLayout) -> Value {
    encode(&layout_value(layout))
}

/// Encodes violations in the given order.
pub fn violations_to_json(violations: &[Violation]) -> Value {
    encode(&BrooksValue::collection(violations.iter().cloned()))
}

/// Renders the layout as a JSON string.
pub fn layout_to_string(layout: &SimpleLayout, pretty: bool) -> Result<String> {
    let value = layout_to_json(layout);
    let s = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(s)
}
