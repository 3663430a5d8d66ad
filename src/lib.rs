//! # Tile Quest
//!
//! Deterministic 2048-style board engine with a game controller on top.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TILE QUEST                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── rng.rs       - Seeded Xorshift128+ PRNG                 │
//! │  └── hash.rs      - State hashing for verification           │
//! │                                                              │
//! │  game/            - Game logic                               │
//! │  ├── tile.rs      - Tiles, ids, positions                    │
//! │  ├── input.rs     - Directions and key parsing               │
//! │  ├── engine.rs    - Pure move computation                    │
//! │  ├── spawn.rs     - Random tile placement                    │
//! │  ├── state.rs     - Game state and undo history              │
//! │  ├── controller.rs- Two-phase move settling and cheats       │
//! │  ├── events.rs    - Game events                              │
//! │  └── replay.rs    - Command log and replay                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! - The engine is a pure function of the tiles, board size and direction
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same seed and commands, a game replays to the same state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::engine::{BoardEngine, MoveResult, MergeEvent, compute_move};
pub use game::input::Direction;
pub use game::tile::{Tile, TileId, Position};
pub use game::controller::{GameController, GameConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Smallest board the engine accepts
pub const MIN_BOARD_SIZE: usize = 2;

/// Smallest board offered for play
pub const MIN_PLAYABLE_BOARD_SIZE: usize = 4;

/// Largest board offered for play
pub const MAX_BOARD_SIZE: usize = 10;

/// Default board side length
pub const DEFAULT_BOARD_SIZE: usize = 4;

/// Default number of undo snapshots kept
pub const DEFAULT_UNDO_LIMIT: usize = 20;
