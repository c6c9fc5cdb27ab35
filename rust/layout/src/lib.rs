// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Brooks Layout
//!
//! Typed floor plan layouts assembled from raw editor annotations, plus the
//! structural validator run over them.
//!
//! ## Overview
//!
//! - **Annotation**: the raw editor document ([`annotation`]) with schema
//!   validation and deterministic auto-fix
//! - **Assembly**: [`LayoutMapper`] builds a [`SimpleLayout`] of separators,
//!   openings, spaces, areas and features; [`LayoutHandler`] memoizes one
//!   layout per [`LayoutConfig`]
//! - **Validation**: [`LayoutValidator`] reports [`Violation`]s in a
//!   deterministic order
//! - **Output**: [`serialization`] encodes layouts and violations as JSON
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brooks_layout::{Annotation, LayoutConfig, LayoutHandler, LayoutValidator, MapperOptions};
//!
//! let annotation = Annotation::from_json(&std::fs::read_to_string("plan.json")?)?;
//! let handler = LayoutHandler::new(annotation, MapperOptions::default());
//! let layout = handler.get_layout(LayoutConfig { scaled: true, ..Default::default() })?;
//!
//! for violation in LayoutValidator::new(&layout).validate() {
//!     println!("{} on {:?}", violation.violation_type, violation.entity);
//! }
//! ```
//!
//! A handler keeps its cache in a `RefCell`: use one per plan and keep it on
//! the thread that created it.

pub mod annotation;
pub mod classification;
pub mod error;
pub mod georef;
pub mod handler;
pub mod keys;
pub mod layout;
pub mod mapper;
pub mod reconcile;
pub mod serialization;
pub mod types;
pub mod validator;

pub use annotation::{validate_and_fix, Annotation, AutoFix, AutoFixReport};
pub use classification::{AreaType, SiaCategory};
pub use error::{Error, Result};
pub use georef::{CoordinateTransformer, GeoReference, IdentityTransformer};
pub use handler::LayoutHandler;
pub use keys::{AreaKey, EntityKey, EntityKind, FeatureKey, OpeningKey, SeparatorKey, SpaceKey};
pub use layout::{Area, Feature, Opening, Separator, SimpleLayout, Space};
pub use mapper::{LayoutConfig, LayoutMapper, MapperOptions};
pub use reconcile::{reconcile_areas, AreaRecord, AreaRecordLookup, Reconciliation};
pub use serialization::{encode, layout_to_json, violations_to_json, BrooksValue};
pub use types::{FeatureType, HeightRange, LengthUnit, OpeningType, SeparatorType};
pub use validator::{
    sort_violations, LayoutValidator, ValidatorConfig, Violation, ViolationType,
};
