//! Ground tile grid owned by the world.

use serde::{Deserialize, Serialize};

/// Ground cover of one tile. Purely visual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TileKind {
    #[default]
    Grass,
    Dirt,
    Gravel,
    Mud,
}

impl TileKind {
    pub const ALL: [TileKind; 4] = [TileKind::Grass, TileKind::Dirt, TileKind::Gravel, TileKind::Mud];
}

/// Row-major tile grid anchored at the world origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMap {
    columns: u32,
    rows: u32,
    tile_size: f64,
    tiles: Vec<TileKind>,
}

impl TileMap {
    /// A grid filled with `fill`.
    pub fn filled(columns: u32, rows: u32, tile_size: f64, fill: TileKind) -> Self {
        Self {
            columns,
            rows,
            tile_size,
            tiles: vec![fill; columns as usize * rows as usize],
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn get(&self, column: u32, row: u32) -> Option<TileKind> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.tiles.get((row * self.columns + column) as usize).copied()
    }

    pub fn set(&mut self, column: u32, row: u32, kind: TileKind) {
        if column < self.columns && row < self.rows {
            self.tiles[(row * self.columns + column) as usize] = kind;
        }
    }

    /// Tiles intersecting the world rectangle `[x, x + w) x [y, y + h)`,
    /// as `(column, row, kind)`.
    pub fn visible(&self, x: f64, y: f64, w: f64, h: f64) -> Vec<(u32, u32, TileKind)> {
        if self.tile_size <= 0.0 || self.tiles.is_empty() {
            return Vec::new();
        }
        let to_cell = |v: f64, limit: u32| -> u32 {
            (v / self.tile_size).floor().clamp(0.0, f64::from(limit)) as u32
        };
        let (c0, c1) = (to_cell(x, self.columns), to_cell(x + w, self.columns - 1));
        let (r0, r1) = (to_cell(y, self.rows), to_cell(y + h, self.rows - 1));
        let mut out = Vec::new();
        for row in r0..=r1.min(self.rows - 1) {
            for column in c0..=c1.min(self.columns - 1) {
                if let Some(kind) = self.get(column, row) {
                    out.push((column, row, kind));
                }
            }
        }
        out
    }
}
