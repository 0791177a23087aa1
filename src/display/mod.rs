pub mod geometry;
pub mod overlay;
pub mod raster;

pub use geometry::{compute_geometry, OverlayConstants, OverlayGeometry, Rect};
pub use overlay::{GeometryState, OverlayCommand, OverlayHandle, OverlayRenderer};
