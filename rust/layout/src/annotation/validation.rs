// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema-level validation with deterministic auto-fix.
//!
//! Orphaned or missing back references are repaired; anything that cannot be
//! repaired without guessing raises [`Error::CorruptedAnnotation`].

use super::{Annotation, Layer};
use crate::error::{Error, Result};
use brooks_geometry::primitives::coord_distance;
use geo::Coord;

/// Vertices of one line closer than this are duplicates.
pub const VERTEX_TOLERANCE: f64 = 1e-5;

/// A single repair applied to the annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoFix {
    /// The vertex did not list a line that uses it.
    AddedBackReference { vertex: String, line: String },
    /// The vertex listed a line that is missing or does not use it.
    RemovedBackReference { vertex: String, line: String },
    /// A near-coincident duplicate vertex was removed from the line.
    CollapsedDuplicateVertex { line: String, vertex: String },
    /// An auxiliary vertex reference pointed to nothing.
    RemovedAuxVertex { line: String, vertex: String },
}

/// Every repair applied by [`validate_and_fix`], in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoFixReport {
    pub fixes: Vec<AutoFix>,
}

impl AutoFixReport {
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }
}

/// Validates every layer of the annotation, repairing what can be repaired.
pub fn validate_and_fix(annotation: &mut Annotation) -> Result<AutoFixReport> {
    let mut report = AutoFixReport::default();
    for (layer_id, layer) in annotation.layers.iter_mut() {
        fix_layer(layer, &mut report.fixes).map_err(|e| match e {
            Error::CorruptedAnnotation(msg) => {
                Error::CorruptedAnnotation(format!("layer '{layer_id}': {msg}"))
            }
            other => other,
        })?;
    }
    for fix in &report.fixes {
        tracing::debug!(?fix, "annotation auto-fix");
    }
    if !report.is_empty() {
        tracing::warn!(fixes = report.len(), "annotation repaired");
    }
    Ok(report)
}

fn fix_layer(layer: &mut Layer, fixes: &mut Vec<AutoFix>) -> Result<()> {
    // Lines: resolve vertices and collapse duplicates.
    for (line_id, line) in layer.lines.iter_mut() {
        let mut kept: Vec<(String, Coord<f64>)> = Vec::with_capacity(line.vertices.len());
        for vertex_id in &line.vertices {
            let vertex = layer.vertices.get(vertex_id).ok_or_else(|| {
                Error::CorruptedAnnotation(format!(
                    "line '{line_id}' references missing vertex '{vertex_id}'"
                ))
            })?;
            let c = vertex.coord();
            if kept.iter().any(|(_, k)| coord_distance(*k, c) <= VERTEX_TOLERANCE) {
                fixes.push(AutoFix::CollapsedDuplicateVertex {
                    line: line_id.clone(),
                    vertex: vertex_id.clone(),
                });
            } else {
                kept.push((vertex_id.clone(), c));
            }
        }
        if kept.len() != 2 {
            return Err(Error::CorruptedAnnotation(format!(
                "line '{line_id}' has {} distinct vertex positions, expected 2",
                kept.len()
            )));
        }
        line.vertices = kept.into_iter().map(|(id, _)| id).collect();

        let vertices = &layer.vertices;
        line.aux_vertices.retain(|v| {
            let exists = vertices.contains_key(v);
            if !exists {
                fixes.push(AutoFix::RemovedAuxVertex {
                    line: line_id.clone(),
                    vertex: v.clone(),
                });
            }
            exists
        });
    }

    // Vertices: add missing back references, drop stale ones.
    for (line_id, line) in &layer.lines {
        for vertex_id in line.vertices.iter().chain(line.aux_vertices.iter()) {
            if let Some(vertex) = layer.vertices.get_mut(vertex_id) {
                if !vertex.lines.contains(line_id) {
                    vertex.lines.push(line_id.clone());
                    fixes.push(AutoFix::AddedBackReference {
                        vertex: vertex_id.clone(),
                        line: line_id.clone(),
                    });
                }
            }
        }
    }
    let lines = &layer.lines;
    for (vertex_id, vertex) in layer.vertices.iter_mut() {
        vertex.lines.retain(|line_id| {
            let used = lines.get(line_id).is_some_and(|l| {
                l.vertices.contains(vertex_id) || l.aux_vertices.contains(vertex_id)
            });
            if !used {
                fixes.push(AutoFix::RemovedBackReference {
                    vertex: vertex_id.clone(),
                    line: line_id.clone(),
                });
            }
            used
        });
    }

    // Holes must sit on an existing line.
    for (hole_id, hole) in &layer.holes {
        if !layer.lines.contains_key(&hole.line) {
            return Err(Error::CorruptedAnnotation(format!(
                "hole '{hole_id}' references missing line '{}'",
                hole.line
            )));
        }
    }
    Ok(())
}
