//! Tile Definitions
//!
//! Tiles are the only thing a board is made of: occupancy is derived from
//! the tile set, there is no grid of empty cells.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Largest value a tile may hold going into a move; doubling it still fits in a `u64`.
pub const MAX_TILE_VALUE: u64 = 1 << 62;

// =============================================================================
// TILE ID
// =============================================================================

/// Unique tile identifier.
///
/// Opaque to the engine, which only compares ids. Implements Ord so that
/// per-tile results can live in a BTreeMap with deterministic iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl TileId {
    /// Create from a raw counter value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw counter value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

// =============================================================================
// POSITION
// =============================================================================

/// A cell on the board (zero-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Row index, 0 at the top
    pub row: usize,
    /// Column index, 0 at the left
    pub col: usize,
}

impl Position {
    /// Create a position.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Check that the cell lies inside a board of `board_size`.
    #[inline]
    pub fn is_within(self, board_size: usize) -> bool {
        self.row < board_size && self.col < board_size
    }

    /// Reflect across the vertical axis (column `c` becomes `size-1-c`).
    #[inline]
    pub fn mirror_horizontal(self, board_size: usize) -> Self {
        Self::new(self.row, board_size - 1 - self.col)
    }

    /// Reflect across the horizontal axis (row `r` becomes `size-1-r`).
    #[inline]
    pub fn mirror_vertical(self, board_size: usize) -> Self {
        Self::new(board_size - 1 - self.row, self.col)
    }

    /// Swap row and column.
    #[inline]
    pub fn transpose(self) -> Self {
        Self::new(self.col, self.row)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// =============================================================================
// TILE
// =============================================================================

/// A numbered tile on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Stable identity; kept by the survivor of a merge
    pub id: TileId,
    /// Face value, always a power of two >= 2
    pub value: u64,
    /// Row index
    pub row: usize,
    /// Column index
    pub col: usize,
}

impl Tile {
    /// Create a tile.
    pub const fn new(id: TileId, value: u64, row: usize, col: usize) -> Self {
        Self { id, value, row, col }
    }

    /// Create a tile at `position`.
    pub const fn at(id: TileId, value: u64, position: Position) -> Self {
        Self::new(id, value, position.row, position.col)
    }

    /// Current cell.
    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }

    /// Move to `position`.
    #[inline]
    pub fn set_position(&mut self, position: Position) {
        self.row = position.row;
        self.col = position.col;
    }

    /// Check the value is a power of two in `2..=MAX_TILE_VALUE`.
    #[inline]
    pub fn has_valid_value(&self) -> bool {
        (2..=MAX_TILE_VALUE).contains(&self.value) && self.value.is_power_of_two()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_id_ordering() {
        assert!(TileId::new(1) < TileId::new(2));
        assert_eq!(TileId::new(7).raw(), 7);
        assert_eq!(TileId::new(7).to_string(), "t7");
    }

    #[test]
    fn test_position_mirrors() {
        let pos = Position::new(1, 0);
        assert_eq!(pos.mirror_horizontal(4), Position::new(1, 3));
        assert_eq!(pos.mirror_vertical(4), Position::new(2, 0));
        assert_eq!(pos.mirror_horizontal(4).mirror_horizontal(4), pos);
        assert_eq!(pos.transpose(), Position::new(0, 1));
    }

    #[test]
    fn test_position_bounds() {
        assert!(Position::new(3, 3).is_within(4));
        assert!(!Position::new(4, 0).is_within(4));
        assert!(!Position::new(0, 4).is_within(4));
    }

    #[test]
    fn test_tile_value_validation() {
        let id = TileId::new(0);
        assert!(Tile::new(id, 2, 0, 0).has_valid_value());
        assert!(Tile::new(id, 131072, 0, 0).has_valid_value());
        assert!(!Tile::new(id, 0, 0, 0).has_valid_value());
        assert!(!Tile::new(id, 1, 0, 0).has_valid_value());
        assert!(!Tile::new(id, 6, 0, 0).has_valid_value());
        assert!(Tile::new(id, MAX_TILE_VALUE, 0, 0).has_valid_value());
        assert!(!Tile::new(id, 1 << 63, 0, 0).has_valid_value());
    }

    #[test]
    fn test_set_position() {
        let mut tile = Tile::new(TileId::new(3), 4, 0, 0);
        tile.set_position(Position::new(2, 1));
        assert_eq!(tile.position(), Position::new(2, 1));
        assert_eq!((tile.row, tile.col), (2, 1));
    }
}
