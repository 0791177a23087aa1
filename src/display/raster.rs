//! Software rasterizer for the viewfinder overlay

use std::path::Path;

use image::{ImageFormat, ImageResult, Rgba, RgbaImage};
use tracing::{info, instrument};

use super::geometry::{OverlayConstants, OverlayGeometry};

pub const DETECTED_RGB: [u8; 3] = [0, 255, 0];
pub const IDLE_RGB: [u8; 3] = [255, 0, 0];

/// Translucent fill over the whole surface with the rounded target window
/// cut out to fully transparent pixels.
#[instrument(level = "debug", skip(geometry, constants))]
pub fn render_overlay(
    width: u32,
    height: u32,
    geometry: &OverlayGeometry,
    constants: &OverlayConstants,
    detection_active: bool,
) -> RgbaImage {
    let [r, g, b] = if detection_active {
        DETECTED_RGB
    } else {
        IDLE_RGB
    };
    let fill = Rgba([r, g, b, constants.fill_alpha]);
    let window = Rgba([0, 0, 0, 0]);
    let rect = geometry.view_rect;
    let radius = constants.corner_radius;

    RgbaImage::from_fn(width, height, |x, y| {
        // Sample at the pixel centre
        if rect.contains_rounded(x as f32 + 0.5, y as f32 + 0.5, radius) {
            window
        } else {
            fill
        }
    })
}

/// Write the overlay surface to disk as PNG
pub fn save_snapshot(surface: &RgbaImage, path: &Path) -> ImageResult<()> {
    surface.save_with_format(path, ImageFormat::Png)?;
    info!("Overlay snapshot written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::geometry::compute_geometry;

    #[test]
    fn fill_outside_and_clear_window_inside() {
        let constants = OverlayConstants::default();
        let geometry = compute_geometry(480, 640, &constants);
        let idle = render_overlay(480, 640, &geometry, &constants, false);

        assert_eq!(idle.dimensions(), (480, 640));
        assert_eq!(idle.get_pixel(5, 5), &Rgba([255, 0, 0, 80]));
        assert_eq!(idle.get_pixel(240, 320), &Rgba([0, 0, 0, 0]));
        // Corner of the square lies outside the rounded window
        assert_eq!(idle.get_pixel(50, 130), &Rgba([255, 0, 0, 80]));

        let active = render_overlay(480, 640, &geometry, &constants, true);
        assert_eq!(active.get_pixel(5, 5), &Rgba([0, 255, 0, 80]));
        assert_eq!(active.get_pixel(240, 320), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn degenerate_window_fills_everything() {
        let constants = OverlayConstants::default();
        let geometry = compute_geometry(40, 40, &constants);
        let surface = render_overlay(40, 40, &geometry, &constants, false);
        assert!(surface.pixels().all(|p| p == &Rgba([255, 0, 0, 80])));
    }

    #[test]
    fn snapshot_round_trips_through_png() {
        let constants = OverlayConstants::default();
        let geometry = compute_geometry(120, 160, &constants);
        let surface = render_overlay(120, 160, &geometry, &constants, true);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        save_snapshot(&surface, &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, surface);
    }
}
