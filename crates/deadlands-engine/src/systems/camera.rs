//! Camera follow.

use deadlands_ecs::components::{Collision, Position};
use deadlands_ecs::world::World;

use crate::camera::{clamp_to_bounds, smoothing_alpha, CameraRig};
use crate::config::EngineConfig;

use super::System;

/// Centers the shared [`CameraRig`] on the player.
///
/// The first update snaps straight to the target; later ones ease toward it
/// with a frame-rate independent smoothing factor. The view is always kept
/// inside the world bounds.
pub struct CameraSystem {
    rig: CameraRig,
    smoothing: f64,
}

impl CameraSystem {
    pub const NAME: &'static str = "camera";

    pub fn new(config: &EngineConfig, rig: CameraRig) -> Self {
        Self {
            rig,
            smoothing: config.camera.smoothing,
        }
    }
}

impl System for CameraSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let Some(player) = world.player() else {
            return;
        };
        let Some(pos) = world.get::<Position>(player).copied() else {
            return;
        };
        let center = world
            .get::<Collision>(player)
            .map_or(pos, |c| c.center(&pos));

        let mut view = self.rig.view();
        let (cx, cy) = if view.initialized {
            let alpha = smoothing_alpha(self.smoothing, dt);
            let (current_x, current_y) = (
                view.x + view.viewport_width / 2.0,
                view.y + view.viewport_height / 2.0,
            );
            (
                current_x + (center.x - current_x) * alpha,
                current_y + (center.y - current_y) * alpha,
            )
        } else {
            (center.x, center.y)
        };
        let (x, y) = clamp_to_bounds(
            cx,
            cy,
            view.viewport_width,
            view.viewport_height,
            world.bounds(),
        );
        view.x = x;
        view.y = y;
        view.initialized = true;
        self.rig.set_view(view);
    }
}
