//! Board Transition Engine
//!
//! Pure compaction-and-merge sweep. Given the tiles on the board and a slide
//! direction, computes where every tile goes, which pairs merge and whether
//! the board changed at all. Holds no state and performs no I/O: applying
//! the result is the caller's job.
//!
//! ## Rules
//!
//! - Every row (left/right) or column (up/down) is swept on its own.
//! - Tiles in a line are visited from the edge they slide toward.
//! - A compaction pointer starts at that edge and advances one cell per
//!   placement (a single tile or a merged pair).
//! - Two consecutive tiles merge iff their values are equal. A tile merges
//!   at most once per move, so `[2, 2, 2]` sliding left becomes `[4, 2]`.
//! - The earlier tile in sweep order survives and keeps its id.
//! - A merge always counts as a move.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::MIN_BOARD_SIZE;
use crate::game::input::Direction;
use crate::game::tile::{Position, Tile, TileId};

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Two tiles collapsing into one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MergeEvent {
    /// Tile that keeps its id and takes the doubled value
    pub survivor: TileId,
    /// Tile removed from the board once the merge is applied
    pub absorbed: TileId,
    /// Value of the survivor after the merge
    pub new_value: u64,
}

/// Outcome of one engine invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    /// Target cell of every input tile. Merging pairs share a cell.
    pub targets: BTreeMap<TileId, Position>,
    /// Merges in line order, then sweep order within a line
    pub merges: Vec<MergeEvent>,
    /// Whether any tile changed cell or any merge happened
    pub moved: bool,
}

impl MoveResult {
    /// Target cell of a tile, if it was part of the input.
    pub fn target(&self, id: TileId) -> Option<Position> {
        self.targets.get(&id).copied()
    }

    /// Points scored by this move (sum of merged values).
    pub fn points(&self) -> u64 {
        self.merges.iter().map(|m| m.new_value).sum()
    }

    /// Slide every tile to its target cell.
    ///
    /// Merging pairs end up sharing a cell until [`apply_merges`] runs.
    ///
    /// [`apply_merges`]: MoveResult::apply_merges
    pub fn apply_slides(&self, tiles: &mut [Tile]) {
        for tile in tiles.iter_mut() {
            if let Some(target) = self.targets.get(&tile.id) {
                tile.set_position(*target);
            }
        }
    }

    /// Double every survivor and drop every absorbed tile.
    pub fn apply_merges(&self, tiles: &mut Vec<Tile>) {
        if self.merges.is_empty() {
            return;
        }

        let survivors: BTreeMap<TileId, u64> = self.merges
            .iter()
            .map(|m| (m.survivor, m.new_value))
            .collect();
        let absorbed: BTreeSet<TileId> = self.merges.iter().map(|m| m.absorbed).collect();

        for tile in tiles.iter_mut() {
            if let Some(value) = survivors.get(&tile.id) {
                tile.value = *value;
            }
        }
        tiles.retain(|tile| !absorbed.contains(&tile.id));
    }

    /// Apply slides then merges as one step.
    pub fn apply(&self, tiles: &mut Vec<Tile>) {
        self.apply_slides(tiles);
        self.apply_merges(tiles);
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Malformed board input.
///
/// The engine never repairs a board; callers own tile construction, so any
/// of these means a caller bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Board side below the minimum.
    #[error("board size {board_size} is below the minimum of {}", MIN_BOARD_SIZE)]
    BoardTooSmall {
        /// Requested side length
        board_size: usize,
    },

    /// Tile outside the grid.
    #[error("tile {id} at ({row}, {col}) is outside a {board_size}x{board_size} board")]
    OutOfBounds {
        /// Offending tile
        id: TileId,
        /// Its row
        row: usize,
        /// Its column
        col: usize,
        /// Board side length
        board_size: usize,
    },

    /// Two tiles on one cell.
    #[error("tiles {first} and {second} both occupy {position}")]
    DuplicatePosition {
        /// Shared cell
        position: Position,
        /// Tile seen first
        first: TileId,
        /// Tile seen second
        second: TileId,
    },

    /// Two tiles with one id.
    #[error("tile id {0} appears more than once")]
    DuplicateTileId(TileId),

    /// Value that is not a power of two in `2..=MAX_TILE_VALUE`.
    #[error("tile {id} has invalid value {value}")]
    InvalidValue {
        /// Offending tile
        id: TileId,
        /// Its value
        value: u64,
    },

    /// Perfect board values do not fit in a u64.
    #[error("no perfect board for a {0}x{0} board")]
    PerfectBoardTooLarge(usize),
}

// =============================================================================
// ENGINE
// =============================================================================

/// Board engine bound to one board size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardEngine {
    board_size: usize,
}

impl BoardEngine {
    /// Create an engine for a `board_size` x `board_size` grid.
    pub fn new(board_size: usize) -> Result<Self, EngineError> {
        if board_size < MIN_BOARD_SIZE {
            return Err(EngineError::BoardTooSmall { board_size });
        }
        Ok(Self { board_size })
    }

    /// Side length.
    pub fn board_size(&self) -> usize {
        self.board_size
    }

    /// See [`compute_move`].
    pub fn compute_move(&self, tiles: &[Tile], direction: Direction) -> Result<MoveResult, EngineError> {
        compute_move(tiles, self.board_size, direction)
    }

    /// See [`validate_board`].
    pub fn validate(&self, tiles: &[Tile]) -> Result<(), EngineError> {
        validate_board(tiles, self.board_size)
    }

    /// Empty cells in row-major order.
    pub fn empty_positions(&self, tiles: &[Tile]) -> Vec<Position> {
        let occupied: BTreeSet<Position> = tiles.iter().map(Tile::position).collect();

        (0..self.board_size)
            .flat_map(|row| (0..self.board_size).map(move |col| Position::new(row, col)))
            .filter(|pos| !occupied.contains(pos))
            .collect()
    }

    /// Whether any direction would change the board.
    pub fn can_move(&self, tiles: &[Tile]) -> Result<bool, EngineError> {
        for direction in Direction::ALL {
            if self.compute_move(tiles, direction)?.moved {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// No direction changes the board.
    pub fn is_game_over(&self, tiles: &[Tile]) -> Result<bool, EngineError> {
        Ok(!self.can_move(tiles)?)
    }

    /// A full board of distinct descending powers of two, row-major.
    ///
    /// The last cell holds 4 and the first holds `2^(size*size + 1)`, so no
    /// move is possible. Ids are allocated from `first_id` upward.
    pub fn perfect_board(&self, first_id: TileId) -> Result<Vec<Tile>, EngineError> {
        let cells = self.board_size * self.board_size;
        if cells + 1 >= u64::BITS as usize {
            return Err(EngineError::PerfectBoardTooLarge(self.board_size));
        }

        Ok((0..cells)
            .map(|i| {
                let exponent = (cells + 1 - i) as u32;
                Tile::new(
                    TileId::new(first_id.raw() + i as u64),
                    1u64 << exponent,
                    i / self.board_size,
                    i % self.board_size,
                )
            })
            .collect())
    }
}

/// Check the preconditions of [`compute_move`].
pub fn validate_board(tiles: &[Tile], board_size: usize) -> Result<(), EngineError> {
    if board_size < MIN_BOARD_SIZE {
        return Err(EngineError::BoardTooSmall { board_size });
    }

    let mut cells: BTreeMap<Position, TileId> = BTreeMap::new();
    let mut ids: BTreeSet<TileId> = BTreeSet::new();

    for tile in tiles {
        let position = tile.position();
        if !position.is_within(board_size) {
            return Err(EngineError::OutOfBounds {
                id: tile.id,
                row: tile.row,
                col: tile.col,
                board_size,
            });
        }
        if !tile.has_valid_value() {
            return Err(EngineError::InvalidValue { id: tile.id, value: tile.value });
        }
        if !ids.insert(tile.id) {
            return Err(EngineError::DuplicateTileId(tile.id));
        }
        if let Some(first) = cells.insert(position, tile.id) {
            return Err(EngineError::DuplicatePosition {
                position,
                first,
                second: tile.id,
            });
        }
    }

    Ok(())
}

/// Compute the outcome of sliding `tiles` toward `direction`.
///
/// Validates the board first and either returns a complete result or fails;
/// there is no partial result.
pub fn compute_move(
    tiles: &[Tile],
    board_size: usize,
    direction: Direction,
) -> Result<MoveResult, EngineError> {
    validate_board(tiles, board_size)?;

    let mut lines: Vec<Vec<&Tile>> = vec![Vec::new(); board_size];
    for tile in tiles {
        let line = if direction.is_horizontal() { tile.row } else { tile.col };
        lines[line].push(tile);
    }

    let mut result = MoveResult::default();
    for (line_index, line) in lines.iter_mut().enumerate() {
        sweep_line(line, line_index, board_size, direction, &mut result);
    }

    Ok(result)
}

/// Compact and merge one line, appending to `result`.
fn sweep_line(
    line: &mut [&Tile],
    line_index: usize,
    board_size: usize,
    direction: Direction,
    result: &mut MoveResult,
) {
    let horizontal = direction.is_horizontal();
    let ascending = direction.is_ascending();

    let along = |tile: &Tile| if horizontal { tile.col } else { tile.row };
    if ascending {
        line.sort_by_key(|tile| along(*tile));
    } else {
        line.sort_by_key(|tile| Reverse(along(*tile)));
    }

    // Compaction pointer, expressed as a count of placements from the edge
    let mut placed = 0;
    let mut i = 0;

    while i < line.len() {
        let slot = if ascending { placed } else { board_size - 1 - placed };
        let target = if horizontal {
            Position::new(line_index, slot)
        } else {
            Position::new(slot, line_index)
        };

        let current = line[i];
        match line.get(i + 1) {
            Some(next) if next.value == current.value => {
                result.targets.insert(current.id, target);
                result.targets.insert(next.id, target);
                result.merges.push(MergeEvent {
                    survivor: current.id,
                    absorbed: next.id,
                    new_value: current.value * 2,
                });
                result.moved = true;
                i += 2;
            }
            _ => {
                result.targets.insert(current.id, target);
                if current.position() != target {
                    result.moved = true;
                }
                i += 1;
            }
        }

        placed += 1;
    }
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Random board: side 2..=6, each cell empty or holding 2..=16.
    fn arb_board() -> impl Strategy<Value = (usize, Vec<Tile>)> {
        (2usize..=6)
            .prop_flat_map(|size| {
                (Just(size), prop::collection::vec(prop::option::of(1u32..=4), size * size))
            })
            .prop_map(|(size, cells)| {
                let tiles = cells
                    .iter()
                    .enumerate()
                    .filter_map(|(i, exp)| {
                        exp.map(|e| Tile::new(TileId::new(i as u64), 1u64 << e, i / size, i % size))
                    })
                    .collect();
                (size, tiles)
            })
    }

    fn arb_direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    fn map_tiles(tiles: &[Tile], f: impl Fn(Position) -> Position) -> Vec<Tile> {
        tiles
            .iter()
            .map(|t| Tile::at(t.id, t.value, f(t.position())))
            .collect()
    }

    fn map_result(result: &MoveResult, f: impl Fn(Position) -> Position) -> MoveResult {
        MoveResult {
            targets: result.targets.iter().map(|(id, pos)| (*id, f(*pos))).collect(),
            merges: result.merges.clone(),
            moved: result.moved,
        }
    }

    proptest! {
        #[test]
        fn right_is_mirrored_left((size, tiles) in arb_board()) {
            let mirror = |p: Position| p.mirror_horizontal(size);

            let right = compute_move(&tiles, size, Direction::Right).unwrap();
            let left = compute_move(&map_tiles(&tiles, mirror), size, Direction::Left).unwrap();

            prop_assert_eq!(right, map_result(&left, mirror));
        }

        #[test]
        fn down_is_mirrored_up((size, tiles) in arb_board()) {
            let mirror = |p: Position| p.mirror_vertical(size);

            let down = compute_move(&tiles, size, Direction::Down).unwrap();
            let up = compute_move(&map_tiles(&tiles, mirror), size, Direction::Up).unwrap();

            prop_assert_eq!(down, map_result(&up, mirror));
        }

        #[test]
        fn up_is_transposed_left((size, tiles) in arb_board()) {
            let up = compute_move(&tiles, size, Direction::Up).unwrap();
            let left = compute_move(&map_tiles(&tiles, Position::transpose), size, Direction::Left).unwrap();

            prop_assert_eq!(up, map_result(&left, Position::transpose));
        }

        #[test]
        fn rows_do_not_interact(
            (size, tiles, perm) in arb_board().prop_flat_map(|(size, tiles)| {
                let perm = Just((0..size).collect::<Vec<usize>>()).prop_shuffle();
                (Just(size), Just(tiles), perm)
            }),
            leftward in any::<bool>(),
        ) {
            let direction = if leftward { Direction::Left } else { Direction::Right };
            let shuffle = |p: Position| Position::new(perm[p.row], p.col);

            let original = compute_move(&tiles, size, direction).unwrap();
            let shuffled = compute_move(&map_tiles(&tiles, shuffle), size, direction).unwrap();

            prop_assert_eq!(&shuffled.targets, &map_result(&original, shuffle).targets);
            prop_assert_eq!(shuffled.moved, original.moved);

            let mut a = original.merges.clone();
            let mut b = shuffled.merges.clone();
            a.sort();
            b.sort();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn result_is_deterministic_and_order_free((size, tiles) in arb_board(), direction in arb_direction()) {
            let first = compute_move(&tiles, size, direction).unwrap();
            let second = compute_move(&tiles, size, direction).unwrap();
            prop_assert_eq!(&first, &second);

            let mut reversed = tiles.clone();
            reversed.reverse();
            prop_assert_eq!(&first, &compute_move(&reversed, size, direction).unwrap());
        }

        #[test]
        fn merges_conserve_value((size, tiles) in arb_board(), direction in arb_direction()) {
            let result = compute_move(&tiles, size, direction).unwrap();
            prop_assert_eq!(result.targets.len(), tiles.len());

            let mut after = tiles.clone();
            result.apply(&mut after);

            let before_sum: u64 = tiles.iter().map(|t| t.value).sum();
            let after_sum: u64 = after.iter().map(|t| t.value).sum();
            prop_assert_eq!(before_sum, after_sum);
            prop_assert_eq!(after.len(), tiles.len() - result.merges.len());
            prop_assert!(validate_board(&after, size).is_ok());
        }

        #[test]
        fn settled_board_only_moves_by_merging((size, tiles) in arb_board(), direction in arb_direction()) {
            let result = compute_move(&tiles, size, direction).unwrap();
            let mut after = tiles.clone();
            result.apply(&mut after);

            let again = compute_move(&after, size, direction).unwrap();
            prop_assert_eq!(again.moved, !again.merges.is_empty());
            if !again.moved {
                for t in &after {
                    prop_assert_eq!(again.target(t.id), Some(t.position()));
                }
            }
        }
    }
}
