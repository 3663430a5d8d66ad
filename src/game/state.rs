//! Game State Definitions
//!
//! Everything a controller owns between moves. Serializable so callers can
//! persist it however they like; the crate itself writes no save files.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::game::tile::{Position, Tile, TileId};

// =============================================================================
// GAME LEVEL
// =============================================================================

/// Difficulty level: how often the higher spawn value appears.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum GameLevel {
    /// Spawns are always the base value
    OnlyTwos = 0,
    /// Mostly base value
    #[default]
    Regular = 1,
    /// Mostly the doubled value
    Easy = 2,
    /// Spawns are always the doubled value
    OnlyFours = 3,
}

impl GameLevel {
    /// All levels, easiest spawn mix last.
    pub const ALL: [GameLevel; 4] = [
        GameLevel::OnlyTwos,
        GameLevel::Regular,
        GameLevel::Easy,
        GameLevel::OnlyFours,
    ];

    /// Chance, in percent, that a spawn takes the doubled value.
    pub fn probability_of_fours(self) -> u8 {
        match self {
            GameLevel::OnlyTwos => 0,
            GameLevel::Regular => 10,
            GameLevel::Easy => 90,
            GameLevel::OnlyFours => 100,
        }
    }

    /// Seconds added to every cheat penalty at this level.
    pub fn penalty_seconds(self) -> i64 {
        match self {
            GameLevel::OnlyTwos => -1,
            GameLevel::Regular => 0,
            GameLevel::Easy => 1,
            GameLevel::OnlyFours => 2,
        }
    }

    /// Human readable label.
    pub fn description(self) -> &'static str {
        match self {
            GameLevel::OnlyTwos => "Only 2s",
            GameLevel::Regular => "2s > 4s",
            GameLevel::Easy => "2s < 4s",
            GameLevel::OnlyFours => "Only 4s",
        }
    }
}

impl FromStr for GameLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "onlytwos" | "twos" | "2" => Ok(GameLevel::OnlyTwos),
            "regular" | "normal" => Ok(GameLevel::Regular),
            "easy" => Ok(GameLevel::Easy),
            "onlyfours" | "fours" | "4" => Ok(GameLevel::OnlyFours),
            _ => Err(format!("unknown game level: {s:?}")),
        }
    }
}

/// Cheats that cost time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Penalty {
    /// Restoring the previous board
    Undo,
    /// Placing a 4 by hand
    ForceTile,
}

impl Penalty {
    /// Penalty in seconds at `level`.
    pub fn seconds(self, level: GameLevel) -> i64 {
        let base = match self {
            Penalty::Undo => 5,
            Penalty::ForceTile => 20,
        };
        base + level.penalty_seconds()
    }
}

// =============================================================================
// UNDO HISTORY
// =============================================================================

/// Bounded stack of tile-set snapshots, oldest dropped first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoHistory {
    snapshots: VecDeque<Vec<Tile>>,
    limit: usize,
}

impl UndoHistory {
    /// Create an empty history holding at most `limit` snapshots.
    pub fn new(limit: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Record a snapshot.
    pub fn push(&mut self, tiles: Vec<Tile>) {
        if self.limit == 0 {
            return;
        }
        while self.snapshots.len() >= self.limit {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(tiles);
    }

    /// Take the most recent snapshot.
    pub fn pop(&mut self) -> Option<Vec<Tile>> {
        self.snapshots.pop_back()
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// No snapshots stored.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Maximum number of snapshots.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Snapshots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &[Tile]> {
        self.snapshots.iter().map(Vec::as_slice)
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Game identifier (UUID bytes)
    pub game_id: [u8; 16],

    /// Board side length
    pub board_size: usize,

    /// Tiles at rest
    pub tiles: Vec<Tile>,

    /// Elapsed play time
    pub seconds: u64,

    /// Time added (or refunded) by cheats
    pub penalty_seconds: i64,

    /// Snapshots for undo
    pub undo_history: UndoHistory,

    /// Spawn mix
    pub level: GameLevel,

    /// Spawn base follows the smallest tile on the board
    pub escalating_mode: bool,

    /// Undos taken this game
    pub undos_used: u32,

    /// Tiles placed by hand this game
    pub forced_tiles_used: u32,

    /// Moves that changed the board
    pub move_count: u32,

    /// Sum of all merge values this game
    pub score: u64,

    /// Next tile id (monotonic counter, never rewound)
    pub next_tile_id: u64,
}

impl GameState {
    /// Create an empty game.
    pub fn new(
        game_id: [u8; 16],
        board_size: usize,
        level: GameLevel,
        escalating_mode: bool,
        undo_limit: usize,
    ) -> Self {
        Self {
            game_id,
            board_size,
            tiles: Vec::new(),
            seconds: 0,
            penalty_seconds: 0,
            undo_history: UndoHistory::new(undo_limit),
            level,
            escalating_mode,
            undos_used: 0,
            forced_tiles_used: 0,
            move_count: 0,
            score: 0,
            next_tile_id: 0,
        }
    }

    /// Hand out a fresh tile id.
    pub fn allocate_tile_id(&mut self) -> TileId {
        let id = TileId::new(self.next_tile_id);
        self.next_tile_id += 1;
        id
    }

    /// Clear the board and per-game counters, keeping settings and the id counter.
    pub fn reset(&mut self) {
        self.tiles.clear();
        self.undo_history.clear();
        self.seconds = 0;
        self.penalty_seconds = 0;
        self.undos_used = 0;
        self.forced_tiles_used = 0;
        self.move_count = 0;
        self.score = 0;
    }

    /// Get a tile by id.
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    /// Get the tile on a cell.
    pub fn tile_at(&self, position: Position) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.position() == position)
    }

    /// Sum of all tile values on the board.
    pub fn total_score(&self) -> u64 {
        self.tiles.iter().map(|t| t.value).sum()
    }

    /// Largest tile on the board.
    pub fn highest_tile(&self) -> u64 {
        self.tiles.iter().map(|t| t.value).max().unwrap_or(0)
    }

    /// Undos plus forced tiles.
    pub fn cheats_used(&self) -> u32 {
        self.undos_used + self.forced_tiles_used
    }

    /// Elapsed time with penalties applied.
    pub fn adjusted_seconds(&self) -> i64 {
        self.seconds as i64 + self.penalty_seconds
    }

    /// Game id as a UUID string.
    pub fn game_id_string(&self) -> String {
        uuid::Uuid::from_bytes(self.game_id).to_string()
    }

    /// Compute hash of current state for verification.
    ///
    /// Tiles are hashed in cell order so the storage order of `tiles`
    /// does not matter.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.move_count, self.board_size, |hasher| {
            hasher.update_uuid(&self.game_id);

            hash_tiles(hasher, &self.tiles);

            hasher.update_u64(self.seconds);
            hasher.update_i64(self.penalty_seconds);
            hasher.update_usize(self.undo_history.len());
            for snapshot in self.undo_history.iter() {
                hash_tiles(hasher, snapshot);
            }
            hasher.update_u8(self.level as u8);
            hasher.update_bool(self.escalating_mode);
            hasher.update_u32(self.undos_used);
            hasher.update_u32(self.forced_tiles_used);
            hasher.update_u64(self.score);
            hasher.update_u64(self.next_tile_id);
        })
    }
}

/// Hash a tile set in cell order, so storage order does not matter.
fn hash_tiles(hasher: &mut StateHasher, tiles: &[Tile]) {
    let mut sorted: Vec<&Tile> = tiles.iter().collect();
    sorted.sort_by_key(|t| (t.position(), t.id));

    hasher.update_usize(sorted.len());
    for tile in sorted {
        hasher.update_u64(tile.id.raw());
        hasher.update_u64(tile.value);
        hasher.update_usize(tile.row);
        hasher.update_usize(tile.col);
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .tiles
            .iter()
            .map(|t| t.value.to_string().len())
            .max()
            .unwrap_or(1)
            .max(4);
        let rule = "-".repeat((width + 1) * self.board_size + 1);

        writeln!(f, "{rule}")?;
        for row in 0..self.board_size {
            write!(f, "|")?;
            for col in 0..self.board_size {
                match self.tile_at(Position::new(row, col)) {
                    Some(tile) => write!(f, "{:>width$}|", tile.value)?,
                    None => write!(f, "{:>width$}|", ".")?,
                }
            }
            writeln!(f)?;
        }
        write!(f, "{rule}")
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new([7; 16], 4, GameLevel::Regular, false, 20)
    }

    #[test]
    fn test_level_probabilities() {
        assert_eq!(GameLevel::OnlyTwos.probability_of_fours(), 0);
        assert_eq!(GameLevel::Regular.probability_of_fours(), 10);
        assert_eq!(GameLevel::Easy.probability_of_fours(), 90);
        assert_eq!(GameLevel::OnlyFours.probability_of_fours(), 100);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("only-twos".parse(), Ok(GameLevel::OnlyTwos));
        assert_eq!("Regular".parse(), Ok(GameLevel::Regular));
        assert_eq!("EASY".parse(), Ok(GameLevel::Easy));
        assert_eq!("only_fours".parse(), Ok(GameLevel::OnlyFours));
        assert!("impossible".parse::<GameLevel>().is_err());
    }

    #[test]
    fn test_penalties() {
        assert_eq!(Penalty::Undo.seconds(GameLevel::Regular), 5);
        assert_eq!(Penalty::Undo.seconds(GameLevel::OnlyTwos), 4);
        assert_eq!(Penalty::ForceTile.seconds(GameLevel::OnlyFours), 22);
    }

    #[test]
    fn test_undo_history_is_bounded() {
        let mut history = UndoHistory::new(3);
        for i in 0..5u64 {
            history.push(vec![Tile::new(TileId::new(i), 2, 0, 0)]);
        }

        assert_eq!(history.len(), 3);
        let oldest: Vec<TileId> = history.iter().map(|snapshot| snapshot[0].id).collect();
        assert_eq!(oldest, vec![TileId::new(2), TileId::new(3), TileId::new(4)]);
        assert_eq!(history.pop().unwrap()[0].id, TileId::new(4));
        assert_eq!(history.pop().unwrap()[0].id, TileId::new(3));
        assert_eq!(history.pop().unwrap()[0].id, TileId::new(2));
        assert!(history.pop().is_none());
    }

    #[test]
    fn test_undo_history_zero_limit() {
        let mut history = UndoHistory::new(0);
        history.push(Vec::new());
        assert!(history.is_empty());
    }

    #[test]
    fn test_tile_ids_are_monotonic() {
        let mut state = state();
        let a = state.allocate_tile_id();
        let b = state.allocate_tile_id();
        assert!(a < b);

        state.reset();
        assert!(state.allocate_tile_id() > b);
    }

    #[test]
    fn test_scores_and_lookup() {
        let mut state = state();
        state.tiles = vec![Tile::new(TileId::new(0), 2, 0, 0), Tile::new(TileId::new(1), 32, 3, 1)];

        assert_eq!(state.total_score(), 34);
        assert_eq!(state.highest_tile(), 32);
        assert_eq!(state.tile_at(Position::new(3, 1)).map(|t| t.id), Some(TileId::new(1)));
        assert!(state.tile_at(Position::new(1, 1)).is_none());
        assert_eq!(state.tile(TileId::new(0)).map(|t| t.value), Some(2));
    }

    #[test]
    fn test_hash_ignores_tile_order() {
        let mut a = state();
        a.tiles = vec![Tile::new(TileId::new(0), 2, 0, 0), Tile::new(TileId::new(1), 4, 1, 1)];
        let mut b = a.clone();
        b.tiles.reverse();

        assert_eq!(a.compute_hash(), b.compute_hash());

        b.tiles[0].value = 8;
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_hash_covers_undo_snapshots() {
        let mut a = state();
        a.undo_history.push(vec![Tile::new(TileId::new(0), 2, 0, 0)]);
        let mut b = state();
        b.undo_history.push(vec![Tile::new(TileId::new(0), 4, 0, 0)]);

        assert_eq!(a.undo_history.len(), b.undo_history.len());
        assert_ne!(a.compute_hash(), b.compute_hash());

        let mut c = state();
        c.undo_history.push(vec![Tile::new(TileId::new(0), 2, 0, 0)]);
        assert_eq!(a.compute_hash(), c.compute_hash());
    }

    #[test]
    fn test_display_grid() {
        let mut state = GameState::new([0; 16], 2, GameLevel::Regular, false, 20);
        state.tiles = vec![Tile::new(TileId::new(0), 2048, 0, 1)];

        let rendered = state.to_string();
        assert!(rendered.contains("|   .|2048|"));
        assert!(rendered.contains("|   .|   .|"));
    }

    #[test]
    fn test_game_id_string() {
        let state = GameState::new([0; 16], 4, GameLevel::Regular, false, 20);
        assert_eq!(state.game_id_string(), "00000000-0000-0000-0000-000000000000");
    }
}
