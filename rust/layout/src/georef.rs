// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Georeferencing Support
//!
//! A plan is placed in the world by rotating it around a pivot, scaling it
//! and translating the pivot to eastings/northings in the source reference
//! system. Reprojection into the target reference system is delegated to an
//! injected [`CoordinateTransformer`].

use crate::error::{Error, Result};
use geo::Coord;

/// Placement of a plan's local coordinates in a spatial reference system
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    /// Reference system the placement is expressed in (e.g., "EPSG:2056")
    pub source_crs: Option<String>,
    /// Reference system to reproject into, if different
    pub target_crs: Option<String>,
    /// Local point that lands on (eastings, northings)
    pub pivot_x: f64,
    pub pivot_y: f64,
    /// X offset in the source reference system
    pub eastings: f64,
    /// Y offset in the source reference system
    pub northings: f64,
    /// X-axis abscissa (cos of rotation angle)
    pub x_axis_abscissa: f64,
    /// X-axis ordinate (sin of rotation angle)
    pub x_axis_ordinate: f64,
    /// Scale factor (default 1.0)
    pub scale: f64,
}

impl Default for GeoReference {
    fn default() -> Self {
        Self {
            source_crs: None,
            target_crs: None,
            pivot_x: 0.0,
            pivot_y: 0.0,
            eastings: 0.0,
            northings: 0.0,
            x_axis_abscissa: 1.0,
            x_axis_ordinate: 0.0,
            scale: 1.0,
        }
    }
}

impl GeoReference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placement rotated counter-clockwise by `degrees`.
    pub fn with_rotation_degrees(mut self, degrees: f64) -> Self {
        let r = degrees.to_radians();
        self.x_axis_abscissa = r.cos();
        self.x_axis_ordinate = r.sin();
        self
    }

    pub fn with_translation(mut self, eastings: f64, northings: f64) -> Self {
        self.eastings = eastings;
        self.northings = northings;
        self
    }

    pub fn with_pivot(mut self, x: f64, y: f64) -> Self {
        self.pivot_x = x;
        self.pivot_y = y;
        self
    }

    /// Get rotation angle in radians
    #[inline]
    pub fn rotation(&self) -> f64 {
        self.x_axis_ordinate.atan2(self.x_axis_abscissa)
    }

    /// Transform local coordinates to map coordinates
    #[inline]
    pub fn local_to_map(&self, x: f64, y: f64) -> (f64, f64) {
        let cos_r = self.x_axis_abscissa;
        let sin_r = self.x_axis_ordinate;
        let s = self.scale;
        let (dx, dy) = (x - self.pivot_x, y - self.pivot_y);

        let e = s * (cos_r * dx - sin_r * dy) + self.eastings;
        let n = s * (sin_r * dx + cos_r * dy) + self.northings;
        (e, n)
    }

    /// Transform map coordinates to local coordinates
    #[inline]
    pub fn map_to_local(&self, e: f64, n: f64) -> (f64, f64) {
        let cos_r = self.x_axis_abscissa;
        let sin_r = self.x_axis_ordinate;
        // A zero scale collapses the plan onto the pivot; leave it unscaled
        let inv_scale = if self.scale.abs() < f64::EPSILON {
            1.0
        } else {
            1.0 / self.scale
        };

        let dx = e - self.eastings;
        let dy = n - self.northings;

        // Inverse rotation: transpose of rotation matrix
        let x = inv_scale * (cos_r * dx + sin_r * dy) + self.pivot_x;
        let y = inv_scale * (-sin_r * dx + cos_r * dy) + self.pivot_y;
        (x, y)
    }

    /// Full local-to-target mapping: placement, then reprojection.
    pub fn georeference(
        &self,
        transformer: &dyn CoordinateTransformer,
        c: Coord<f64>,
    ) -> Result<Coord<f64>> {
        let (e, n) = self.local_to_map(c.x, c.y);
        let (x, y) = transformer.transform(
            self.source_crs.as_deref(),
            self.target_crs.as_deref(),
            e,
            n,
        )?;
        if !(x.is_finite() && y.is_finite()) {
            return Err(Error::Reprojection(format!(
                "non-finite result for ({e}, {n})"
            )));
        }
        Ok(Coord { x, y })
    }
}

/// Reprojects points between named spatial reference systems.
pub trait CoordinateTransformer {
    fn transform(
        &self,
        source: Option<&str>,
        target: Option<&str>,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64)>;
}

/// Accepts only identical (or unspecified) source and target systems.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl CoordinateTransformer for IdentityTransformer {
    fn transform(
        &self,
        source: Option<&str>,
        target: Option<&str>,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64)> {
        match (source, target) {
            (Some(s), Some(t)) if !s.eq_ignore_ascii_case(t) => Err(Error::Reprojection(
                format!("no transformation available from {s} to {t}"),
            )),
            _ => Ok((x, y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_georef_local_to_map() {
        let georef = GeoReference::new().with_translation(2_600_000.0, 1_200_000.0);
        let (e, n) = georef.local_to_map(10.0, 20.0);
        assert_relative_eq!(e, 2_600_010.0);
        assert_relative_eq!(n, 1_200_020.0);
    }

    #[test]
    fn test_georef_rotation_around_pivot() {
        let georef = GeoReference::new()
            .with_rotation_degrees(90.0)
            .with_pivot(10.0, 0.0)
            .with_translation(100.0, 100.0);
        assert_relative_eq!(georef.rotation(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        // The pivot lands on the translation target
        let (e, n) = georef.local_to_map(10.0, 0.0);
        assert_relative_eq!(e, 100.0, epsilon = 1e-9);
        assert_relative_eq!(n, 100.0, epsilon = 1e-9);
        // One unit along +x ends up one unit along +y
        let (e, n) = georef.local_to_map(11.0, 0.0);
        assert_relative_eq!(e, 100.0, epsilon = 1e-9);
        assert_relative_eq!(n, 101.0, epsilon = 1e-9);
    }

    #[test]
    fn test_georef_roundtrip() {
        let mut georef = GeoReference::new()
            .with_rotation_degrees(33.0)
            .with_pivot(4.0, -2.0)
            .with_translation(500.0, 800.0);
        georef.scale = 2.0;
        let (e, n) = georef.local_to_map(7.5, 3.25);
        let (x, y) = georef.map_to_local(e, n);
        assert_relative_eq!(x, 7.5, epsilon = 1e-9);
        assert_relative_eq!(y, 3.25, epsilon = 1e-9);
    }

    #[test]
    fn test_identity_transformer_rejects_distinct_systems() {
        let t = IdentityTransformer;
        assert!(t.transform(Some("EPSG:2056"), Some("epsg:2056"), 1.0, 2.0).is_ok());
        assert!(t.transform(None, Some("EPSG:4326"), 1.0, 2.0).is_ok());
        assert!(matches!(
            t.transform(Some("EPSG:2056"), Some("EPSG:4326"), 1.0, 2.0),
            Err(Error::Reprojection(_))
        ));
    }
}
