// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconciliation of freshly assembled areas with stored area records.
//!
//! Records are matched to areas by a representative point inside the area,
//! rounded to [`MATCH_DECIMALS`] decimals. A record whose point is not an
//! exact match still matches the single unmatched area containing it.

use crate::classification::AreaType;
use crate::error::{Error, Result};
use crate::keys::AreaKey;
use crate::layout::SimpleLayout;
use crate::validator::{sort_violations, Violation, ViolationType};
use geo::{Intersects, InteriorPoint, Point, Polygon};
use std::collections::BTreeMap;

/// Decimals kept when comparing representative points
pub const MATCH_DECIMALS: i32 = 3;

/// A stored area as seen by the persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaRecord {
    pub id: u64,
    pub coord_x: f64,
    pub coord_y: f64,
    pub area_type: AreaType,
}

/// Lookup of stored area records for a plan.
pub trait AreaRecordLookup {
    fn area_records(&self, plan_id: u64) -> Result<Vec<AreaRecord>>;
}

impl AreaRecordLookup for BTreeMap<u64, Vec<AreaRecord>> {
    fn area_records(&self, plan_id: u64) -> Result<Vec<AreaRecord>> {
        Ok(self.get(&plan_id).cloned().unwrap_or_default())
    }
}

/// Outcome of a reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub matched: BTreeMap<AreaKey, u64>,
    pub unmatched_areas: Vec<AreaKey>,
    pub unmatched_records: Vec<u64>,
    /// One `AREA_MISMATCH` per unmatched area
    pub violations: Vec<Violation>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.unmatched_areas.is_empty() && self.unmatched_records.is_empty()
    }
}

/// Rounded point guaranteed to lie inside the polygon.
pub fn representative_point(polygon: &Polygon<f64>) -> Option<(f64, f64)> {
    let p = polygon.interior_point()?;
    Some((round(p.x()), round(p.y())))
}

fn round(v: f64) -> f64 {
    let factor = 10f64.powi(MATCH_DECIMALS);
    (v * factor).round() / factor
}

fn match_key(x: f64, y: f64) -> (i64, i64) {
    let factor = 10f64.powi(MATCH_DECIMALS);
    ((x * factor).round() as i64, (y * factor).round() as i64)
}

/// Records describing the layout's current areas, numbered in layout order.
pub fn area_records_from_layout(layout: &SimpleLayout) -> Vec<AreaRecord> {
    layout
        .areas()
        .filter_map(|(_, area)| {
            representative_point(&area.footprint).map(|(x, y)| (x, y, area.area_type))
        })
        .enumerate()
        .map(|(i, (coord_x, coord_y, area_type))| AreaRecord {
            id: i as u64 + 1,
            coord_x,
            coord_y,
            area_type,
        })
        .collect()
}

/// Matches the layout's areas against the stored records of `plan_id`.
///
/// With `raise_on_inconsistency`, any unmatched area or record is an
/// [`Error::AreaMismatch`]; otherwise unmatched areas are reported as
/// violations.
pub fn reconcile_areas(
    layout: &SimpleLayout,
    lookup: &dyn AreaRecordLookup,
    plan_id: u64,
    raise_on_inconsistency: bool,
) -> Result<Reconciliation> {
    let records = lookup.area_records(plan_id)?;
    let mut by_key: BTreeMap<(i64, i64), Vec<u64>> = BTreeMap::new();
    for r in &records {
        by_key
            .entry(match_key(r.coord_x, r.coord_y))
            .or_default()
            .push(r.id);
    }

    let mut result = Reconciliation::default();
    let mut pending: Vec<AreaKey> = Vec::new();
    for (key, area) in layout.areas() {
        let exact = representative_point(&area.footprint)
            .and_then(|(x, y)| by_key.get_mut(&match_key(x, y)))
            .and_then(|ids| (!ids.is_empty()).then(|| ids.remove(0)));
        match exact {
            Some(id) => {
                result.matched.insert(key, id);
            }
            None => pending.push(key),
        }
    }

    // Second pass: a leftover record inside exactly one leftover area.
    let mut leftover: Vec<&AreaRecord> = records
        .iter()
        .filter(|r| by_key.values().any(|ids| ids.contains(&r.id)))
        .collect();
    for key in pending {
        let Some(area) = layout.area(key) else {
            continue;
        };
        let inside: Vec<usize> = leftover
            .iter()
            .enumerate()
            .filter(|(_, r)| area.footprint.intersects(&Point::new(r.coord_x, r.coord_y)))
            .map(|(i, _)| i)
            .collect();
        if let [i] = inside.as_slice() {
            let record = leftover.remove(*i);
            result.matched.insert(key, record.id);
        } else {
            result.unmatched_areas.push(key);
        }
    }
    result.unmatched_records = leftover.iter().map(|r| r.id).collect();

    if !result.is_consistent() {
        let details = format!(
            "{} unmatched area(s), unmatched record id(s) {:?}",
            result.unmatched_areas.len(),
            result.unmatched_records
        );
        if raise_on_inconsistency {
            return Err(Error::AreaMismatch {
                expected: records.len(),
                actual: layout.num_areas(),
                details,
            });
        }
        tracing::warn!(plan_id, %details, "area records do not match layout");
        result.violations = result
            .unmatched_areas
            .iter()
            .filter_map(|k| {
                layout.area(*k).map(|a| {
                    Violation::new(ViolationType::AreaMismatch, (*k).into(), &a.footprint)
                        .with_text("area has no stored record")
                })
            })
            .collect();
        sort_violations(&mut result.violations);
    }
    Ok(result)
}
