//! Render queue construction and the render target boundary.
//!
//! The engine does not draw. Once per frame it builds a [`RenderFrame`] (the
//! camera view, the visible ground tiles and a `z_index`-ordered list of
//! sprite draws in screen coordinates) and hands it to the host's
//! [`RenderTarget`].

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use deadlands_ecs::components::Sprite;
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::terrain::TileKind;
use deadlands_ecs::world::World;

use crate::camera::{CameraRig, CameraView, Rect};
use crate::systems::sprite_loader::{ImageCache, ImageInfo};

// ---------------------------------------------------------------------------
// Draw records
// ---------------------------------------------------------------------------

/// One ground tile, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileDraw {
    pub column: u32,
    pub row: u32,
    pub kind: TileKind,
    pub dest: Rect,
}

/// One sprite, in screen coordinates, with the sheet cell to sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteDraw {
    pub entity: EntityId,
    pub image: String,
    pub dest: Rect,
    pub source: Rect,
    pub alpha: f64,
    pub z_index: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderFrame {
    pub camera: CameraView,
    pub tiles: Vec<TileDraw>,
    /// Sorted by `z_index`, ties in entity slot order.
    pub sprites: Vec<SpriteDraw>,
}

// ---------------------------------------------------------------------------
// RenderTarget
// ---------------------------------------------------------------------------

/// Host-side drawing surface.
pub trait RenderTarget {
    /// Drawable size in pixels.
    fn size(&self) -> (f64, f64);

    fn present(&mut self, frame: &RenderFrame);
}

/// Discards every frame.
#[derive(Debug, Clone, Copy)]
pub struct NullTarget {
    pub width: f64,
    pub height: f64,
}

impl NullTarget {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl RenderTarget for NullTarget {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn present(&mut self, _frame: &RenderFrame) {}
}

/// Keeps every presented frame. Clones share the recording.
#[derive(Debug, Clone)]
pub struct RecordingTarget {
    width: f64,
    height: f64,
    frames: Rc<RefCell<Vec<RenderFrame>>>,
}

impl RecordingTarget {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            frames: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn last_frame(&self) -> Option<RenderFrame> {
        self.frames.borrow().last().cloned()
    }
}

impl RenderTarget for RecordingTarget {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn present(&mut self, frame: &RenderFrame) {
        self.frames.borrow_mut().push(frame.clone());
    }
}

// ---------------------------------------------------------------------------
// Queue building
// ---------------------------------------------------------------------------

/// Pixel rectangle of the sheet cell `sprite` currently shows.
///
/// The sheet is split into `columns x rows` equal cells, each inset by the
/// sprite padding. The column is the animation frame, the row the heading.
pub fn source_rect(sprite: &Sprite, image: ImageInfo) -> Rect {
    let columns = sprite.columns.max(1);
    let rows = sprite.rows.max(1);
    let cell_w = image.width / f64::from(columns);
    let cell_h = image.height / f64::from(rows);
    let column = sprite.frame.min(columns - 1);
    let row = sprite.direction_row.min(rows - 1);
    Rect::new(
        f64::from(column) * cell_w + sprite.padding,
        f64::from(row) * cell_h + sprite.padding,
        (cell_w - 2.0 * sprite.padding).max(0.0),
        (cell_h - 2.0 * sprite.padding).max(0.0),
    )
}

fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x <= b.x + b.width && b.x <= a.x + a.width && a.y <= b.y + b.height && b.y <= a.y + a.height
}

/// Everything visible through `rig` this frame.
///
/// Sprites are culled against the padded frustum and skipped while their
/// image is not ready.
pub fn build_render_queue(world: &World, rig: &CameraRig, images: &ImageCache) -> RenderFrame {
    let view = rig.view();
    let frustum = rig.frustum();
    let stores = world.stores();

    let tiles = world
        .tiles()
        .visible(view.x, view.y, view.viewport_width, view.viewport_height)
        .into_iter()
        .map(|(column, row, kind)| {
            let size = world.tiles().tile_size();
            let (x, y) = view.to_screen(f64::from(column) * size, f64::from(row) * size);
            TileDraw {
                column,
                row,
                kind,
                dest: Rect::new(x, y, size, size),
            }
        })
        .collect();

    let mut sprites: Vec<SpriteDraw> = stores
        .sprite
        .iter()
        .filter_map(|(id, sprite)| {
            let pos = stores.position.get(id)?;
            let (w, h) = sprite.scaled_size();
            let world_rect = Rect::new(pos.x - w / 2.0, pos.y - h / 2.0, w, h);
            if !overlaps(&world_rect, &frustum) {
                return None;
            }
            let image = images.ready(&sprite.source)?;
            let (x, y) = view.to_screen(world_rect.x, world_rect.y);
            Some(SpriteDraw {
                entity: id,
                image: sprite.source.clone(),
                dest: Rect::new(x, y, w, h),
                source: source_rect(sprite, image),
                alpha: sprite.alpha,
                z_index: sprite.z_index,
            })
        })
        .collect();
    sprites.sort_by_key(|s| s.z_index);

    RenderFrame {
        camera: view,
        tiles,
        sprites,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
