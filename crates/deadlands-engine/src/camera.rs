//! Camera state shared between the camera system and the render pass.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use deadlands_ecs::world::WorldBounds;

/// Axis-aligned rectangle in world units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn expand(&self, padding: f64) -> Rect {
        Rect::new(
            self.x - padding,
            self.y - padding,
            self.width + 2.0 * padding,
            self.height + 2.0 * padding,
        )
    }
}

/// What the camera currently shows. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraView {
    pub x: f64,
    pub y: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Set once the camera has snapped to its first target.
    pub initialized: bool,
}

impl CameraView {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.viewport_width, self.viewport_height)
    }

    /// World point to screen point.
    pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.x, y - self.y)
    }
}

/// Top-left corner that centers the viewport on `(cx, cy)` while keeping it
/// inside `bounds`. An axis where the viewport is larger than the world is
/// centered on the world instead.
pub fn clamp_to_bounds(
    cx: f64,
    cy: f64,
    viewport_width: f64,
    viewport_height: f64,
    bounds: WorldBounds,
) -> (f64, f64) {
    let axis = |center: f64, view: f64, world: f64| -> f64 {
        if view >= world {
            (world - view) / 2.0
        } else {
            (center - view / 2.0).clamp(0.0, world - view)
        }
    };
    (
        axis(cx, viewport_width, bounds.width),
        axis(cy, viewport_height, bounds.height),
    )
}

/// Frame-rate independent interpolation factor for a smoothing value given
/// per nominal 1/60 s frame.
pub fn smoothing_alpha(smoothing: f64, dt: f64) -> f64 {
    1.0 - (1.0 - smoothing).powf(dt * 60.0)
}

/// Shared handle to the camera view.
#[derive(Debug, Clone)]
pub struct CameraRig {
    view: Rc<RefCell<CameraView>>,
    frustum_padding: f64,
}

impl CameraRig {
    pub fn new(viewport_width: f64, viewport_height: f64, frustum_padding: f64) -> Self {
        Self {
            view: Rc::new(RefCell::new(CameraView {
                viewport_width,
                viewport_height,
                ..CameraView::default()
            })),
            frustum_padding,
        }
    }

    pub fn view(&self) -> CameraView {
        *self.view.borrow()
    }

    pub fn set_view(&self, view: CameraView) {
        *self.view.borrow_mut() = view;
    }

    pub fn resize(&self, viewport_width: f64, viewport_height: f64) {
        let mut view = self.view.borrow_mut();
        view.viewport_width = viewport_width;
        view.viewport_height = viewport_height;
    }

    /// Camera rectangle grown by the frustum padding.
    pub fn frustum(&self) -> Rect {
        self.view().rect().expand(self.frustum_padding)
    }
}
