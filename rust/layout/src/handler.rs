// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-plan layout handler with a memoized layout per configuration.
//!
//! The cache lives in a `RefCell` and hands out `Rc`s, so a handler is
//! neither `Send` nor `Sync`: create one per plan, on the thread that
//! processes it.

use crate::annotation::Annotation;
use crate::error::Result;
use crate::georef::{CoordinateTransformer, IdentityTransformer};
use crate::layout::SimpleLayout;
use crate::mapper::{LayoutConfig, LayoutMapper, MapperOptions};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Owns one plan's annotation and the layouts assembled from it.
pub struct LayoutHandler {
    annotation: Annotation,
    options: MapperOptions,
    transformer: Box<dyn CoordinateTransformer>,
    /// Assembled layouts keyed by configuration
    layout_cache: RefCell<FxHashMap<LayoutConfig, Rc<SimpleLayout>>>,
}

impl LayoutHandler {
    pub fn new(annotation: Annotation, options: MapperOptions) -> Self {
        Self::with_transformer(annotation, options, Box::new(IdentityTransformer))
    }

    pub fn with_transformer(
        annotation: Annotation,
        options: MapperOptions,
        transformer: Box<dyn CoordinateTransformer>,
    ) -> Self {
        Self {
            annotation,
            options,
            transformer,
            layout_cache: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Returns the layout for `config`, assembling it on first request.
    ///
    /// Repeated requests for the same configuration return the same `Rc`.
    /// Failed assemblies are not cached.
    pub fn get_layout(&self, config: LayoutConfig) -> Result<Rc<SimpleLayout>> {
        if let Some(layout) = self.layout_cache.borrow().get(&config) {
            return Ok(Rc::clone(layout));
        }

        let mapper = LayoutMapper::new(&self.options, self.transformer.as_ref());
        let layout = Rc::new(mapper.map(&self.annotation, config)?);
        self.layout_cache
            .borrow_mut()
            .insert(config, Rc::clone(&layout));
        Ok(layout)
    }

    /// Number of configurations assembled so far.
    pub fn cached_layouts(&self) -> usize {
        self.layout_cache.borrow().len()
    }

    /// Drops every cached layout.
    pub fn clear_cache(&self) {
        self.layout_cache.borrow_mut().clear();
    }
}
