// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for layout assembly and validation.

use crate::keys::EntityKey;

/// Result type alias for layout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling or checking a layout.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The annotation violates a structural rule that cannot be auto-fixed.
    #[error("corrupted annotation: {0}")]
    CorruptedAnnotation(String),

    /// Geometry repair gave up on a footprint.
    #[error(transparent)]
    InvalidShape(#[from] brooks_geometry::Error),

    /// Area records disagree with the layout's areas.
    #[error("area mismatch: expected {expected} areas, found {actual}: {details}")]
    AreaMismatch {
        expected: usize,
        actual: usize,
        details: String,
    },

    /// Coordinate transformation into the target reference system failed.
    #[error("reprojection failed: {0}")]
    Reprojection(String),

    /// A referenced layout entity was not found in the arena.
    #[error("layout entity not found: {0:?}")]
    NotFound(EntityKey),

    /// The annotation JSON could not be parsed.
    #[error("annotation JSON: {0}")]
    Json(#[from] serde_json::Error),
}
