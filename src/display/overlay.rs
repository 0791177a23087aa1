//! Viewfinder overlay over the camera preview
//!
//! Geometry is cached and recomputed lazily at the next paint after a layout
//! change. State changes from other threads go through an `OverlayHandle`
//! and are applied on the render side by `pump` or `wait_for_commands`.

use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use image::RgbaImage;
use tracing::{debug, trace};

use super::geometry::{compute_geometry, OverlayConstants, OverlayGeometry, Rect};
use super::raster;

/// Requests posted to the render side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCommand {
    SetDetection(bool),
    /// The host layout pass ran; dimensions may have changed
    Layout { width: u32, height: u32 },
}

/// Cloneable, thread-safe handle to an overlay owned by the render loop
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    tx: Sender<OverlayCommand>,
}

impl OverlayHandle {
    pub fn channel() -> (Self, Receiver<OverlayCommand>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    pub fn set_detection(&self, active: bool) {
        self.post(OverlayCommand::SetDetection(active));
    }

    pub fn layout(&self, width: u32, height: u32) {
        self.post(OverlayCommand::Layout { width, height });
    }

    fn post(&self, command: OverlayCommand) {
        if self.tx.send(command).is_err() {
            trace!(?command, "Overlay gone, dropping command");
        }
    }
}

/// Geometry cache lifecycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryState {
    Stale,
    Fresh(OverlayGeometry),
}

pub struct OverlayRenderer {
    constants: OverlayConstants,
    width: u32,
    height: u32,
    geometry: GeometryState,
    detection_active: bool,
    needs_repaint: bool,
    surface: Option<RgbaImage>,
    commands: Option<Receiver<OverlayCommand>>,
    geometry_recomputes: u64,
    repaint_requests: u64,
    paints: u64,
}

impl OverlayRenderer {
    pub fn new(constants: OverlayConstants) -> Self {
        Self {
            constants,
            width: 0,
            height: 0,
            geometry: GeometryState::Stale,
            detection_active: false,
            needs_repaint: false,
            surface: None,
            commands: None,
            geometry_recomputes: 0,
            repaint_requests: 0,
            paints: 0,
        }
    }

    /// Create a renderer together with the handle that feeds it
    pub fn with_handle(constants: OverlayConstants) -> (Self, OverlayHandle) {
        let (handle, rx) = OverlayHandle::channel();
        let mut renderer = Self::new(constants);
        renderer.commands = Some(rx);
        (renderer, handle)
    }

    /// Layout pass notification. Only invalidates; geometry waits for `draw`.
    pub fn on_layout(&mut self, width: u32, height: u32) {
        debug!(width, height, "Overlay layout changed");
        self.width = width;
        self.height = height;
        self.geometry = GeometryState::Stale;
    }

    /// Set the detection highlight. Returns whether a repaint was requested.
    pub fn update_overlay(&mut self, detection_active: bool) -> bool {
        if detection_active == self.detection_active {
            return false;
        }
        self.detection_active = detection_active;
        self.needs_repaint = true;
        self.repaint_requests += 1;
        true
    }

    /// Apply commands posted through handles. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let Some(rx) = self.commands.take() else {
            return 0;
        };
        let mut applied = 0;
        for command in rx.try_iter() {
            self.apply(command);
            applied += 1;
        }
        self.commands = Some(rx);
        applied
    }

    /// Block up to `timeout` for commands, then apply everything queued.
    /// Returns false once every handle has been dropped.
    pub fn wait_for_commands(&mut self, timeout: Duration) -> bool {
        let Some(rx) = self.commands.take() else {
            return false;
        };
        let alive = match rx.recv_timeout(timeout) {
            Ok(command) => {
                self.apply(command);
                for command in rx.try_iter() {
                    self.apply(command);
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        };
        self.commands = Some(rx);
        alive
    }

    fn apply(&mut self, command: OverlayCommand) {
        match command {
            OverlayCommand::SetDetection(active) => {
                self.update_overlay(active);
            }
            OverlayCommand::Layout { width, height } => self.on_layout(width, height),
        }
    }

    /// Paint pass. Brings geometry up to date and re-rasterizes only when
    /// something changed. `None` until the view has a non-zero size.
    pub fn draw(&mut self) -> Option<&RgbaImage> {
        if self.width == 0 || self.height == 0 {
            return None;
        }

        let mut rasterize = self.needs_repaint || self.surface.is_none();
        let geometry = match self.geometry {
            GeometryState::Fresh(geometry) => geometry,
            GeometryState::Stale => {
                let geometry = compute_geometry(self.width, self.height, &self.constants);
                debug!(
                    view = ?geometry.view_rect,
                    reference = ?geometry.reference_rect,
                    "Overlay geometry recomputed"
                );
                self.geometry = GeometryState::Fresh(geometry);
                self.geometry_recomputes += 1;
                rasterize = true;
                geometry
            }
        };

        if rasterize {
            self.surface = Some(raster::render_overlay(
                self.width,
                self.height,
                &geometry,
                &self.constants,
                self.detection_active,
            ));
            self.needs_repaint = false;
            self.paints += 1;
        }
        self.surface.as_ref()
    }

    /// Target rectangle in view pixels, `None` while geometry is stale
    pub fn view_rect(&self) -> Option<Rect> {
        match self.geometry {
            GeometryState::Fresh(g) => Some(g.view_rect),
            GeometryState::Stale => None,
        }
    }

    /// Target rectangle in the reference coordinate space. Never drawn.
    pub fn reference_rect(&self) -> Option<Rect> {
        match self.geometry {
            GeometryState::Fresh(g) => Some(g.reference_rect),
            GeometryState::Stale => None,
        }
    }

    /// The overlay is visual feedback only and never takes input
    pub fn is_interactive(&self) -> bool {
        false
    }

    pub fn detection_active(&self) -> bool {
        self.detection_active
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint || self.geometry == GeometryState::Stale
    }

    pub fn geometry_state(&self) -> GeometryState {
        self.geometry
    }

    pub fn geometry_recomputes(&self) -> u64 {
        self.geometry_recomputes
    }

    pub fn repaint_requests(&self) -> u64 {
        self.repaint_requests
    }

    pub fn paints(&self) -> u64 {
        self.paints
    }
}
