//! Game Logic Module
//!
//! Board engine plus everything around it. Deterministic for a given seed.
//!
//! ## Module Structure
//!
//! - `tile`: Tile ids, positions, tiles
//! - `input`: Directions and key parsing
//! - `engine`: Pure move computation and board queries
//! - `spawn`: Random tile placement
//! - `state`: Game state, levels, undo history
//! - `controller`: Two-phase move settling, cheats, config
//! - `events`: Game events for UIs and logs
//! - `replay`: Command log and replay verification

pub mod tile;
pub mod input;
pub mod engine;
pub mod spawn;
pub mod state;
pub mod controller;
pub mod events;
pub mod replay;

// Re-export key types
pub use tile::{Tile, TileId, Position};
pub use input::{Direction, InputAction};
pub use engine::{BoardEngine, MoveResult, MergeEvent, EngineError, compute_move};
pub use state::{GameState, GameLevel};
pub use controller::{GameController, GameConfig, GameError, MovePhase, MoveSummary};
pub use events::GameEvent;
pub use replay::{Command, ReplayLog, replay_game};
