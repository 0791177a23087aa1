//! Viewfinder geometry, a pure function of the view size

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in f32 pixel space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    #[cfg(test)]
    pub fn aspect_ratio(&self) -> f32 {
        self.width() / self.height()
    }

    /// Scale each axis independently about the origin
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.left * sx, self.top * sy, self.right * sx, self.bottom * sy)
    }

    /// Point test against this rectangle with rounded corners.
    /// Inverted (degenerate) rectangles contain nothing.
    pub fn contains_rounded(&self, x: f32, y: f32, radius: f32) -> bool {
        if x < self.left || x > self.right || y < self.top || y > self.bottom {
            return false;
        }
        let r = radius.min(self.width() / 2.0).min(self.height() / 2.0).max(0.0);
        // Nearest point of the inner rectangle the corner arcs are centred on
        let cx = x.max(self.left + r).min(self.right - r);
        let cy = y.max(self.top + r).min(self.bottom - r);
        let (dx, dy) = (x - cx, y - cy);
        dx * dx + dy * dy <= r * r
    }
}

/// Fixed parameters of the viewfinder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayConstants {
    /// Inset of the target square from the half of the shorter side
    pub margin: i32,
    pub corner_radius: f32,
    /// Canonical coordinate space the reference rectangle is expressed in
    pub reference_width: f32,
    pub reference_height: f32,
    pub fill_alpha: u8,
}

impl Default for OverlayConstants {
    fn default() -> Self {
        Self {
            margin: 50,
            corner_radius: 20.0,
            reference_width: 480.0,
            reference_height: 640.0,
            fill_alpha: 80,
        }
    }
}

/// Target rectangle in view pixels and in the reference space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayGeometry {
    pub view_rect: Rect,
    pub reference_rect: Rect,
}

/// Compute the viewfinder for a `width` x `height` view.
///
/// Halves use integer division. A view smaller than twice the margin yields
/// an inverted rectangle, which is kept as is. Both sides must be non-zero
/// for the reference rectangle to be finite.
pub fn compute_geometry(width: u32, height: u32, constants: &OverlayConstants) -> OverlayGeometry {
    let center_x = (width / 2) as f32;
    let center_y = (height / 2) as f32;
    let square_side = (i64::from(width.min(height) / 2) - i64::from(constants.margin)) as f32;

    let view_rect = Rect::new(
        center_x - square_side,
        center_y - square_side,
        center_x + square_side,
        center_y + square_side,
    );
    let reference_rect = view_rect.scale(
        constants.reference_width / width as f32,
        constants.reference_height / height as f32,
    );

    OverlayGeometry {
        view_rect,
        reference_rect,
    }
}
