//! Game Events
//!
//! Events generated by the controller, in place of observable properties.
//! A UI drains them after each command and redraws from them.

use serde::{Serialize, Deserialize};
use crate::game::input::Direction;
use crate::game::state::GameLevel;
use crate::game::tile::{Position, TileId};

/// Priority for event processing order.
///
/// Lower value = processed first. Within one move, slides happen before
/// merges and merges before the follow-up spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// New game setup
    Lifecycle = 0,
    /// Tiles sliding
    Slide = 1,
    /// Tiles merging
    Merge = 2,
    /// Tiles appearing
    Spawn = 3,
    /// Undo restoring a snapshot
    Undo = 4,
    /// Lowest priority
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A fresh board was dealt
    GameStarted {
        /// Board side length
        board_size: usize,
        /// Spawn mix
        level: GameLevel,
    },

    /// Tiles slid toward an edge
    TilesSlid {
        /// Slide direction
        direction: Direction,
        /// Tiles that changed cell
        moved_tiles: u32,
    },

    /// Two tiles merged
    TilesMerged {
        /// Tile that stays
        survivor: TileId,
        /// Tile removed
        absorbed: TileId,
        /// Doubled value
        new_value: u64,
    },

    /// A tile appeared
    TileSpawned {
        /// New tile
        tile_id: TileId,
        /// Its value
        value: u64,
        /// Its cell
        position: Position,
        /// Placed by the force-tile cheat
        forced: bool,
    },

    /// The previous board was restored
    UndoApplied {
        /// Tiles on the restored board
        restored_tiles: u32,
    },

    /// No direction changes the board any more
    GameOver {
        /// Final score
        score: u64,
        /// Largest tile on the board
        highest_tile: u64,
    },
}

/// A game event with ordering metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Move number when the event occurred
    pub move_number: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Tile involved (for tie-breaking)
    pub tile_id: Option<TileId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(move_number: u32, priority: EventPriority, data: GameEventData) -> Self {
        let tile_id = match &data {
            GameEventData::TilesMerged { survivor, .. } => Some(*survivor),
            GameEventData::TileSpawned { tile_id, .. } => Some(*tile_id),
            _ => None,
        };

        Self {
            move_number,
            priority,
            tile_id,
            data,
        }
    }

    /// Create game started event.
    pub fn game_started(board_size: usize, level: GameLevel) -> Self {
        Self::new(0, EventPriority::Lifecycle, GameEventData::GameStarted { board_size, level })
    }

    /// Create tiles slid event.
    pub fn tiles_slid(move_number: u32, direction: Direction, moved_tiles: u32) -> Self {
        Self::new(
            move_number,
            EventPriority::Slide,
            GameEventData::TilesSlid { direction, moved_tiles },
        )
    }

    /// Create tiles merged event.
    pub fn tiles_merged(move_number: u32, survivor: TileId, absorbed: TileId, new_value: u64) -> Self {
        Self::new(
            move_number,
            EventPriority::Merge,
            GameEventData::TilesMerged { survivor, absorbed, new_value },
        )
    }

    /// Create tile spawned event.
    pub fn tile_spawned(
        move_number: u32,
        tile_id: TileId,
        value: u64,
        position: Position,
        forced: bool,
    ) -> Self {
        Self::new(
            move_number,
            EventPriority::Spawn,
            GameEventData::TileSpawned { tile_id, value, position, forced },
        )
    }

    /// Create undo applied event.
    pub fn undo_applied(move_number: u32, restored_tiles: u32) -> Self {
        Self::new(move_number, EventPriority::Undo, GameEventData::UndoApplied { restored_tiles })
    }

    /// Create game over event.
    pub fn game_over(move_number: u32, score: u64, highest_tile: u64) -> Self {
        Self::new(
            move_number,
            EventPriority::Other,
            GameEventData::GameOver { score, highest_tile },
        )
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.move_number == other.move_number
            && self.priority == other.priority
            && self.tile_id == other.tile_id
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: move number, then priority, then tile id
        self.move_number
            .cmp(&other.move_number)
            .then(self.priority.cmp(&other.priority))
            .then(self.tile_id.cmp(&other.tile_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let slide = GameEvent::tiles_slid(3, Direction::Left, 2);
        let merge_a = GameEvent::tiles_merged(3, TileId::new(1), TileId::new(2), 4);
        let merge_b = GameEvent::tiles_merged(3, TileId::new(5), TileId::new(6), 8);
        let spawn = GameEvent::tile_spawned(3, TileId::new(0), 2, Position::new(0, 0), false);
        let later = GameEvent::tiles_slid(4, Direction::Up, 1);

        // Same move: slide < merge < spawn
        assert!(slide < merge_a);
        assert!(merge_a < spawn);

        // Same move and priority: lower survivor id first
        assert!(merge_a < merge_b);

        assert!(spawn < later);
    }

    #[test]
    fn test_tile_id_extracted() {
        let merge = GameEvent::tiles_merged(1, TileId::new(9), TileId::new(3), 16);
        assert_eq!(merge.tile_id, Some(TileId::new(9)));

        let over = GameEvent::game_over(10, 100, 64);
        assert_eq!(over.tile_id, None);
    }
}
