//! Mapping between plan coordinates and screen pixels.
//!
//! `screen_x = x * scale + offset_x` and `screen_y = -y * scale + offset_y`;
//! the y axis flips because plan data is up-positive while screens grow down.

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Point};

/// Scale used when the data has no extent along either axis.
pub const NOMINAL_SCALE: f64 = 50.0;
/// Fraction of the available viewport a fitted model occupies.
pub const FIT_MARGIN: f64 = 0.9;
pub const DEFAULT_PADDING: f64 = 50.0;
pub const MIN_SCALE: f64 = 0.01;
pub const MAX_SCALE: f64 = 100.0;
/// Zoom sensitivity of pinch and ctrl+wheel gestures.
pub const WHEEL_ZOOM_RATE: f64 = 0.005;

/// Affine plan-to-screen transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl ViewTransform {
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Centers and scales `bounds` into a `width` x `height` viewport.
    ///
    /// Without bounds, or with an empty viewport, the origin is placed at the
    /// viewport center at unit scale.
    pub fn fit_to_bounds(
        bounds: Option<BoundingBox>,
        width: f64,
        height: f64,
        padding: f64,
    ) -> Self {
        let bb = match bounds {
            Some(bb) if width > 0.0 && height > 0.0 => bb,
            _ => return Self::new(1.0, width / 2.0, height / 2.0),
        };
        let data_w = bb.width();
        let data_h = bb.height();
        let eff_w = (width - 2.0 * padding).max(1.0);
        let eff_h = (height - 2.0 * padding).max(1.0);

        let mut scale = if data_w == 0.0 && data_h == 0.0 {
            NOMINAL_SCALE
        } else if data_w == 0.0 {
            if data_h > 0.0 {
                eff_h / data_h
            } else {
                NOMINAL_SCALE
            }
        } else if data_h == 0.0 {
            if data_w > 0.0 {
                eff_w / data_w
            } else {
                NOMINAL_SCALE
            }
        } else {
            (eff_w / data_w).min(eff_h / data_h)
        };
        scale *= FIT_MARGIN;
        if !scale.is_finite() || scale <= 0.0 {
            scale = 1.0;
        }

        Self {
            scale,
            offset_x: padding + (eff_w - data_w * scale) / 2.0 - bb.min_x * scale,
            offset_y: padding + (eff_h - data_h * scale) / 2.0 + bb.max_y * scale,
        }
    }

    /// Plan point to screen pixels.
    pub fn to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.offset_x, -p.y * self.scale + self.offset_y)
    }

    /// Screen pixels to plan point.
    pub fn to_data(&self, sx: f64, sy: f64) -> Point {
        Point::new(
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / -self.scale,
        )
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        *self = Self::new(self.scale, self.offset_x + dx, self.offset_y + dy);
    }

    /// Scales by `factor` keeping the plan point under (`sx`, `sy`) fixed.
    /// The resulting scale is clamped to `[min_scale, max_scale]`; a range
    /// that is empty or not strictly positive falls back to the default one.
    pub fn zoom_at_point_within(
        &mut self,
        factor: f64,
        sx: f64,
        sy: f64,
        min_scale: f64,
        max_scale: f64,
    ) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let (min_scale, max_scale) = if min_scale > 0.0 && min_scale <= max_scale {
            (min_scale, max_scale)
        } else {
            (MIN_SCALE, MAX_SCALE)
        };
        let anchor_x = (sx - self.offset_x) / self.scale;
        let anchor_y = (sy - self.offset_y) / self.scale;
        let scale = (self.scale * factor).clamp(min_scale, max_scale);
        *self = Self::new(scale, sx - anchor_x * scale, sy - anchor_y * scale);
    }

    /// [`Self::zoom_at_point_within`] with the default scale range.
    pub fn zoom_at_point(&mut self, factor: f64, sx: f64, sy: f64) {
        self.zoom_at_point_within(factor, sx, sy, MIN_SCALE, MAX_SCALE);
    }

    /// Zooms about the center of a `width` x `height` viewport, as the
    /// on-screen zoom buttons do.
    pub fn zoom_at_center(
        &mut self,
        factor: f64,
        width: f64,
        height: f64,
        min_scale: f64,
        max_scale: f64,
    ) {
        self.zoom_at_point_within(factor, width / 2.0, height / 2.0, min_scale, max_scale);
    }

    /// Applies a wheel or trackpad gesture. With `ctrl` held (or a pinch) the
    /// vertical delta zooms at the cursor, otherwise both deltas pan.
    pub fn wheel(&mut self, delta_x: f64, delta_y: f64, ctrl: bool, sx: f64, sy: f64) {
        if ctrl {
            self.zoom_at_point((-delta_y * WHEEL_ZOOM_RATE).exp(), sx, sy);
        } else {
            self.pan_by(-delta_x, -delta_y);
        }
    }
}
