//! The tile grid of the factory floor.
//!
//! Tiles live in a flat arena indexed by `(col, row)` -- no per-tile
//! allocation and no id-aliased references. Workers hold [`TilePos`] values
//! and acquire tile occupancy through the grid as they step.

use crate::fixed::Fixed64;
use crate::id::{StageId, WorkerId};
use serde::{Deserialize, Serialize};

/// Default edge length of one tile, in world units.
pub const DEFAULT_TILE_SIZE: u32 = 48;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A tile coordinate on the floor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub col: i32,
    pub row: i32,
}

impl TilePos {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Manhattan distance to another tile.
    pub fn manhattan_distance(&self, other: &TilePos) -> u32 {
        (self.col - other.col).unsigned_abs() + (self.row - other.row).unsigned_abs()
    }

    /// The four cardinal neighbors, in fixed N/S/W/E order. The fixed order
    /// keeps every grid search deterministic.
    pub fn neighbors4(&self) -> [TilePos; 4] {
        [
            TilePos::new(self.col, self.row - 1),
            TilePos::new(self.col, self.row + 1),
            TilePos::new(self.col - 1, self.row),
            TilePos::new(self.col + 1, self.row),
        ]
    }
}

/// A continuous position in world units. Sub-tile resolution for smooth
/// worker interpolation between tile centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl WorldPos {
    pub fn new(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self {
            x: Fixed64::ZERO,
            y: Fixed64::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

/// Base terrain of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Floor,
    Wall,
    Corridor,
}

/// One tile of the factory floor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub walkable: bool,
    /// Department zone this tile belongs to, if any.
    pub stage: Option<StageId>,
    /// Workers perform PROCESS work standing here.
    pub workstation: bool,
    /// Items are deposited/picked up here.
    pub drop_point: bool,
    /// Worker currently standing on this tile.
    pub occupant: Option<WorkerId>,
}

impl Tile {
    /// A plain walkable floor tile.
    pub fn floor() -> Self {
        Self {
            kind: TileKind::Floor,
            walkable: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// FloorGrid
// ---------------------------------------------------------------------------

/// The 2D tile grid. Flat `Vec` storage, row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorGrid {
    cols: u32,
    rows: u32,
    tile_size: u32,
    tiles: Vec<Tile>,
}

impl FloorGrid {
    /// Create a grid of all-walkable floor tiles.
    pub fn new(cols: u32, rows: u32, tile_size: u32) -> Self {
        Self {
            cols,
            rows,
            tile_size,
            tiles: (0..cols as usize * rows as usize).map(|_| Tile::floor()).collect(),
        }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.col >= 0 && pos.row >= 0 && (pos.col as u32) < self.cols && (pos.row as u32) < self.rows
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.row as usize * self.cols as usize + pos.col as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).map(|i| &mut self.tiles[i])
    }

    /// True when the tile exists and is passable.
    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.tile(pos).is_some_and(|t| t.walkable)
    }

    /// Center of a tile, in world units.
    pub fn tile_center(&self, pos: TilePos) -> WorldPos {
        let ts = self.tile_size as i64;
        WorldPos::new(
            Fixed64::from_num(pos.col as i64 * ts + ts / 2),
            Fixed64::from_num(pos.row as i64 * ts + ts / 2),
        )
    }

    /// The tile containing a world position.
    pub fn world_to_tile(&self, pos: WorldPos) -> TilePos {
        let ts = Fixed64::from_num(self.tile_size);
        TilePos::new(
            (pos.x / ts).floor().to_num::<i32>(),
            (pos.y / ts).floor().to_num::<i32>(),
        )
    }

    // -- Occupancy --

    pub fn occupant(&self, pos: TilePos) -> Option<WorkerId> {
        self.tile(pos).and_then(|t| t.occupant)
    }

    /// Claim a tile for a worker. Overwrites nothing: the claim is skipped if
    /// another worker is recorded on the tile.
    pub fn set_occupant(&mut self, pos: TilePos, worker: WorkerId) {
        if let Some(tile) = self.tile_mut(pos)
            && tile.occupant.is_none()
        {
            tile.occupant = Some(worker);
        }
    }

    /// Release a tile held by the given worker. A tile held by someone else
    /// is left untouched.
    pub fn clear_occupant(&mut self, pos: TilePos, worker: WorkerId) {
        if let Some(tile) = self.tile_mut(pos)
            && tile.occupant == Some(worker)
        {
            tile.occupant = None;
        }
    }
}
