//! Replay Log
//!
//! Every command a controller accepts is recorded. Given the starting
//! config and game id, replaying the commands reproduces the game exactly,
//! which the final state hash confirms.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::hash::StateHash;
use crate::game::controller::{GameConfig, GameController, GameError};
use crate::game::input::Direction;
use crate::game::state::{GameLevel, GameState};

/// Replay log format version.
pub const REPLAY_VERSION: u8 = 1;

/// A recorded controller command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Settled move (or a move that changed nothing)
    Move(Direction),
    /// Undo
    Undo,
    /// Force-tile cheat
    ForceTile,
    /// One second of play time
    Tick,
    /// New game with current settings
    NewGame,
    /// Board size change (starts a new game)
    SetBoardSize(usize),
    /// Level change
    SetLevel(GameLevel),
    /// Escalating mode toggle
    SetEscalating(bool),
    /// Perfect board cheat
    PerfectBoard,
}

/// Mid-game starting point for a log recorded after `load_state`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStart {
    /// State that was loaded
    pub state: GameState,
    /// Spawn RNG state at load time
    pub rng_state: [u64; 2],
}

/// Everything needed to reproduce a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Format version
    pub version: u8,
    /// Game id the controller was created with
    pub game_id: [u8; 16],
    /// Starting config (seed always set)
    pub config: GameConfig,
    /// Loaded state, if the log starts mid-game
    pub start: Option<ReplayStart>,
    /// Commands in order
    pub commands: Vec<Command>,
    /// State hash after the last command
    pub final_hash: StateHash,
}

impl ReplayLog {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl GameController {
    /// Snapshot the log of this game so far.
    pub fn replay_log(&self) -> ReplayLog {
        let start = self.replay_start.as_ref().map(|(state, rng_state)| ReplayStart {
            state: state.clone(),
            rng_state: *rng_state,
        });

        ReplayLog {
            version: REPLAY_VERSION,
            game_id: self.state().game_id,
            config: self.initial_config().clone(),
            start,
            commands: self.commands().to_vec(),
            final_hash: self.state().compute_hash(),
        }
    }
}

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Log written by an incompatible version.
    #[error("replay version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Supported version
        expected: u8,
        /// Version in the log
        got: u8,
    },

    /// Replay diverged from the recorded game.
    #[error("final hash mismatch: expected {}, computed {}", hex::encode(.expected), hex::encode(.computed))]
    HashMismatch {
        /// Hash in the log
        expected: StateHash,
        /// Hash after replay
        computed: StateHash,
    },

    /// A command was rejected during replay.
    #[error("command {index} failed: {source}")]
    Command {
        /// Position in the log
        index: usize,
        /// Controller error
        source: GameError,
    },

    /// Controller could not be created.
    #[error("game error: {0}")]
    Game(#[from] GameError),

    /// JSON decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary decoding failed.
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Apply one recorded command.
pub fn apply_command(controller: &mut GameController, command: Command) -> Result<(), GameError> {
    match command {
        Command::Move(direction) => controller.play(direction).map(|_| ()),
        Command::Undo => controller.undo(),
        Command::ForceTile => controller.force_tile().map(|_| ()),
        Command::Tick => {
            controller.tick_second();
            Ok(())
        }
        Command::NewGame => {
            controller.new_game();
            Ok(())
        }
        Command::SetBoardSize(board_size) => controller.set_board_size(board_size),
        Command::SetLevel(level) => {
            controller.set_level(level);
            Ok(())
        }
        Command::SetEscalating(enabled) => {
            controller.set_escalating_mode(enabled);
            Ok(())
        }
        Command::PerfectBoard => controller.set_perfect_board(),
    }
}

/// Rebuild a game from its log and check the final hash.
///
/// Returns the replayed controller on success.
pub fn replay_game(log: &ReplayLog) -> Result<GameController, ReplayError> {
    if log.version != REPLAY_VERSION {
        return Err(ReplayError::VersionMismatch {
            expected: REPLAY_VERSION,
            got: log.version,
        });
    }

    let mut controller = GameController::with_game_id(log.config.clone(), log.game_id)?;
    if let Some(start) = &log.start {
        controller.restore(start.state.clone(), start.rng_state)?;
    }

    for (index, command) in log.commands.iter().enumerate() {
        apply_command(&mut controller, *command)
            .map_err(|source| ReplayError::Command { index, source })?;
    }

    let computed = controller.state().compute_hash();
    if computed != log.final_hash {
        return Err(ReplayError::HashMismatch {
            expected: log.final_hash,
            computed,
        });
    }

    debug!(
        "Replayed {} commands, final hash {}",
        log.commands.len(),
        hex::encode(&computed[..8])
    );
    Ok(controller)
}

// =============================================================================
// TESTS
// =============================================================================
