// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during floor plan geometry processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Every repair strategy was exhausted without producing a valid polygon.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Input that cannot describe a shape at all (empty rings, zero-length segments).
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),
}
