//! Game Controller
//!
//! Owns the mutable side of a game: tile ids, spawning, undo, cheat
//! counters and elapsed time. Calls the engine once per move and applies
//! the result in two phases so a UI can animate between them.
//!
//! ```text
//! Idle --begin_move--> Sliding --finish_slide--> Merging --finish_merge--> Idle
//! ```
//!
//! No command other than `new_game` is accepted while a move is settling.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{DEFAULT_BOARD_SIZE, DEFAULT_UNDO_LIMIT, MAX_BOARD_SIZE, MIN_PLAYABLE_BOARD_SIZE};
use crate::core::rng::{DeterministicRng, derive_game_seed};
use crate::game::engine::{BoardEngine, EngineError, MergeEvent, MoveResult};
use crate::game::events::GameEvent;
use crate::game::input::Direction;
use crate::game::replay::Command;
use crate::game::spawn::{SpawnConfig, place_tile, spawn_random_tile};
use crate::game::state::{GameLevel, GameState, Penalty};
use crate::game::tile::{Tile, TileId};

/// Value placed by the force-tile cheat.
pub const FORCED_TILE_VALUE: u64 = 4;

/// Tiles dealt at the start of a game.
pub const OPENING_TILES: usize = 2;

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Board side length
    pub board_size: usize,
    /// Spawn mix
    pub level: GameLevel,
    /// Spawn base follows the smallest tile
    pub escalating_mode: bool,
    /// Maximum undo snapshots kept
    pub undo_limit: usize,
    /// Fixed RNG seed; derived from the game id when absent
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            level: GameLevel::Regular,
            escalating_mode: false,
            undo_limit: DEFAULT_UNDO_LIMIT,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Environment variable for the board size.
    pub const ENV_BOARD_SIZE: &'static str = "TILE_QUEST_BOARD_SIZE";
    /// Environment variable for the level.
    pub const ENV_LEVEL: &'static str = "TILE_QUEST_LEVEL";
    /// Environment variable for escalating mode.
    pub const ENV_ESCALATING: &'static str = "TILE_QUEST_ESCALATING";
    /// Environment variable for the undo limit.
    pub const ENV_UNDO_LIMIT: &'static str = "TILE_QUEST_UNDO_LIMIT";
    /// Environment variable for the seed.
    pub const ENV_SEED: &'static str = "TILE_QUEST_SEED";

    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(Self::ENV_BOARD_SIZE) {
            config.board_size = parse_value(Self::ENV_BOARD_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(Self::ENV_LEVEL) {
            config.level = parse_value(Self::ENV_LEVEL, &raw)?;
        }
        if let Some(raw) = lookup(Self::ENV_ESCALATING) {
            config.escalating_mode = parse_flag(Self::ENV_ESCALATING, &raw)?;
        }
        if let Some(raw) = lookup(Self::ENV_UNDO_LIMIT) {
            config.undo_limit = parse_value(Self::ENV_UNDO_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(Self::ENV_SEED) {
            config.seed = Some(parse_value(Self::ENV_SEED, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_board_size(self.board_size)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn validate_board_size(board_size: usize) -> Result<(), ConfigError> {
    if !(MIN_PLAYABLE_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&board_size) {
        return Err(ConfigError::BoardSizeOutOfRange(board_size));
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Value could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Setting name
        key: &'static str,
        /// Raw value
        value: String,
    },

    /// Board size outside the playable range.
    #[error("board size {0} is outside the playable range")]
    BoardSizeOutOfRange(usize),
}

// =============================================================================
// PHASES & RESULTS
// =============================================================================

/// Where the controller is in settling a move.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MovePhase {
    /// Ready for input
    #[default]
    Idle,
    /// Tiles are at their targets; merges not yet applied
    Sliding(MoveResult),
    /// Merges applied; follow-up spawn pending
    Merging(MoveResult),
}

impl MovePhase {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            MovePhase::Idle => "idle",
            MovePhase::Sliding(_) => "sliding",
            MovePhase::Merging(_) => "merging",
        }
    }
}

/// What a synchronous [`GameController::play`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveSummary {
    /// Requested direction
    pub direction: Direction,
    /// Whether the board changed
    pub moved: bool,
    /// Merges applied
    pub merges: Vec<MergeEvent>,
    /// Points scored
    pub points: u64,
    /// Tile spawned after the move
    pub spawned: Option<Tile>,
    /// No further move is possible
    pub game_over: bool,
}

/// Controller errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Board failed validation.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A previous move has not settled yet.
    #[error("move in progress ({0})")]
    MoveInProgress(&'static str),

    /// Phase step called out of order.
    #[error("expected {expected} phase, found {found}")]
    PhaseMismatch {
        /// Phase the step needs
        expected: &'static str,
        /// Phase the controller is in
        found: &'static str,
    },

    /// Undo history is empty.
    #[error("nothing to undo")]
    NothingToUndo,

    /// No empty cell for a new tile.
    #[error("board is full")]
    BoardFull,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Single-owner game controller.
pub struct GameController {
    config: GameConfig,
    engine: BoardEngine,
    state: GameState,
    rng: DeterministicRng,
    rng_seed: u64,
    phase: MovePhase,
    pending_direction: Option<Direction>,
    game_over: bool,
    pending_events: Vec<GameEvent>,
    initial_config: GameConfig,
    commands: Vec<Command>,
    pub(crate) replay_start: Option<(GameState, [u64; 2])>,
}

impl GameController {
    /// Create a controller with a fresh random game id and deal a new game.
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        Self::with_game_id(config, *uuid::Uuid::new_v4().as_bytes())
    }

    /// Create a controller for a known game id and deal a new game.
    pub fn with_game_id(config: GameConfig, game_id: [u8; 16]) -> Result<Self, GameError> {
        config.validate()?;
        let engine = BoardEngine::new(config.board_size)?;
        let rng_seed = config.seed.unwrap_or_else(|| derive_game_seed(&game_id));
        let state = GameState::new(
            game_id,
            config.board_size,
            config.level,
            config.escalating_mode,
            config.undo_limit,
        );

        let mut controller = Self {
            initial_config: GameConfig { seed: Some(rng_seed), ..config.clone() },
            config,
            engine,
            state,
            rng: DeterministicRng::new(rng_seed),
            rng_seed,
            phase: MovePhase::Idle,
            pending_direction: None,
            game_over: false,
            pending_events: Vec::new(),
            commands: Vec::new(),
            replay_start: None,
        };
        controller.deal();

        info!(
            "Game {} created: {}x{}, level {:?}, seed {}",
            controller.state.game_id_string(),
            controller.config.board_size,
            controller.config.board_size,
            controller.config.level,
            rng_seed
        );
        Ok(controller)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Configuration this controller was built with (kept in sync with setters).
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Engine for the current board size.
    pub fn engine(&self) -> &BoardEngine {
        &self.engine
    }

    /// Seed of the spawn RNG.
    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Current settling phase.
    pub fn phase(&self) -> &MovePhase {
        &self.phase
    }

    /// Ready for input.
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, MovePhase::Idle)
    }

    /// No direction changes the board.
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Config the replay starts from, with the seed pinned.
    pub fn initial_config(&self) -> &GameConfig {
        &self.initial_config
    }

    /// Commands accepted since the replay start.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    fn ensure_idle(&self) -> Result<(), GameError> {
        if self.is_idle() {
            Ok(())
        } else {
            warn!("Rejected command while {}", self.phase.name());
            Err(GameError::MoveInProgress(self.phase.name()))
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start over with the current settings.
    ///
    /// Allowed in any phase; an unsettled move is abandoned.
    pub fn new_game(&mut self) {
        self.commands.push(Command::NewGame);
        self.deal();
    }

    fn deal(&mut self) {
        self.phase = MovePhase::Idle;
        self.pending_direction = None;
        self.game_over = false;
        self.state.reset();
        self.push_event(GameEvent::game_started(self.state.board_size, self.state.level));

        for _ in 0..OPENING_TILES {
            self.spawn(false);
        }
        info!("New game dealt on {}x{} board", self.state.board_size, self.state.board_size);
    }

    /// Change the board size and start a new game.
    pub fn set_board_size(&mut self, board_size: usize) -> Result<(), GameError> {
        validate_board_size(board_size)?;
        if board_size == self.state.board_size {
            return Ok(());
        }

        self.engine = BoardEngine::new(board_size)?;
        self.config.board_size = board_size;
        self.state.board_size = board_size;
        self.commands.push(Command::SetBoardSize(board_size));
        self.deal();
        Ok(())
    }

    /// Change the spawn mix for future spawns.
    pub fn set_level(&mut self, level: GameLevel) {
        self.config.level = level;
        self.state.level = level;
        self.commands.push(Command::SetLevel(level));
    }

    /// Toggle escalating spawns.
    pub fn set_escalating_mode(&mut self, enabled: bool) {
        self.config.escalating_mode = enabled;
        self.state.escalating_mode = enabled;
        self.commands.push(Command::SetEscalating(enabled));
    }

    /// Adopt a previously exported state.
    ///
    /// The board and every undo snapshot are validated first. The id counter
    /// is bumped past every id on the board or in the undo history so no id
    /// is ever reissued.
    pub fn load_state(&mut self, mut state: GameState) -> Result<(), GameError> {
        validate_board_size(state.board_size)?;
        let engine = BoardEngine::new(state.board_size)?;
        engine.validate(&state.tiles)?;
        for snapshot in state.undo_history.iter() {
            engine.validate(snapshot)?;
        }

        let max_id = state
            .undo_history
            .iter()
            .flatten()
            .chain(&state.tiles)
            .map(|t| t.id.raw())
            .max()
            .map_or(0, |id| id + 1);
        state.next_tile_id = state.next_tile_id.max(max_id);

        self.engine = engine;
        self.config.board_size = state.board_size;
        self.config.level = state.level;
        self.config.escalating_mode = state.escalating_mode;
        self.phase = MovePhase::Idle;
        self.pending_direction = None;
        self.game_over = engine.is_game_over(&state.tiles)? && !state.tiles.is_empty();
        self.state = state;

        self.initial_config = GameConfig { seed: Some(self.rng_seed), ..self.config.clone() };
        self.commands.clear();
        self.replay_start = Some((self.state.clone(), self.rng.state()));

        info!("Loaded game {} with {} tiles", self.state.game_id_string(), self.state.tiles.len());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Moves
    // -------------------------------------------------------------------------

    /// Compute a move and slide the tiles.
    ///
    /// Returns whether the board changed. On a change the controller enters
    /// `Sliding` and the undo history gains the pre-move board; otherwise it
    /// stays `Idle` and nothing is recorded in the history.
    pub fn begin_move(&mut self, direction: Direction) -> Result<bool, GameError> {
        self.ensure_idle()?;

        let result = self.engine.compute_move(&self.state.tiles, direction)?;

        if !result.moved {
            self.commands.push(Command::Move(direction));
            debug!("Move {} changed nothing", direction);
            return Ok(false);
        }

        self.state.undo_history.push(self.state.tiles.clone());
        self.state.move_count += 1;

        let moved_tiles = self
            .state
            .tiles
            .iter()
            .filter(|t| result.target(t.id).is_some_and(|target| target != t.position()))
            .count() as u32;

        result.apply_slides(&mut self.state.tiles);
        self.push_event(GameEvent::tiles_slid(self.state.move_count, direction, moved_tiles));

        debug!(
            "Move {} #{}: {} tiles slid, {} merges pending",
            direction,
            self.state.move_count,
            moved_tiles,
            result.merges.len()
        );
        self.phase = MovePhase::Sliding(result);
        self.pending_direction = Some(direction);
        Ok(true)
    }

    /// Apply the merges of the move in progress.
    pub fn finish_slide(&mut self) -> Result<Vec<MergeEvent>, GameError> {
        let result = match std::mem::take(&mut self.phase) {
            MovePhase::Sliding(result) => result,
            other => {
                let found = other.name();
                self.phase = other;
                return Err(GameError::PhaseMismatch { expected: "sliding", found });
            }
        };

        result.apply_merges(&mut self.state.tiles);
        self.state.score += result.points();

        for merge in &result.merges {
            self.push_event(GameEvent::tiles_merged(
                self.state.move_count,
                merge.survivor,
                merge.absorbed,
                merge.new_value,
            ));
        }

        let merges = result.merges.clone();
        self.phase = MovePhase::Merging(result);
        Ok(merges)
    }

    /// Spawn the follow-up tile and return to `Idle`.
    pub fn finish_merge(&mut self) -> Result<Option<Tile>, GameError> {
        if !matches!(self.phase, MovePhase::Merging(_)) {
            return Err(GameError::PhaseMismatch {
                expected: "merging",
                found: self.phase.name(),
            });
        }

        self.phase = MovePhase::Idle;
        // Recorded once settled so an abandoned move never reaches the log
        if let Some(direction) = self.pending_direction.take() {
            self.commands.push(Command::Move(direction));
        }
        let spawned = self.spawn(false);
        self.check_game_over()?;
        Ok(spawned)
    }

    /// Step whichever phase is pending. Does nothing when idle.
    pub fn advance(&mut self) -> Result<(), GameError> {
        match self.phase {
            MovePhase::Idle => Ok(()),
            MovePhase::Sliding(_) => self.finish_slide().map(|_| ()),
            MovePhase::Merging(_) => self.finish_merge().map(|_| ()),
        }
    }

    /// Run a whole move synchronously.
    pub fn play(&mut self, direction: Direction) -> Result<MoveSummary, GameError> {
        let moved = self.begin_move(direction)?;
        if !moved {
            return Ok(MoveSummary {
                direction,
                moved,
                merges: Vec::new(),
                points: 0,
                spawned: None,
                game_over: self.game_over,
            });
        }

        let merges = self.finish_slide()?;
        let spawned = self.finish_merge()?;

        Ok(MoveSummary {
            direction,
            moved,
            points: merges.iter().map(|m| m.new_value).sum(),
            merges,
            spawned,
            game_over: self.game_over,
        })
    }

    // -------------------------------------------------------------------------
    // Cheats & time
    // -------------------------------------------------------------------------

    /// Restore the board from before the last move.
    pub fn undo(&mut self) -> Result<(), GameError> {
        self.ensure_idle()?;
        let snapshot = self.state.undo_history.pop().ok_or(GameError::NothingToUndo)?;

        self.state.tiles = snapshot;
        self.state.undos_used += 1;
        self.state.penalty_seconds += Penalty::Undo.seconds(self.state.level);
        self.game_over = false;
        self.commands.push(Command::Undo);

        let restored = self.state.tiles.len() as u32;
        self.push_event(GameEvent::undo_applied(self.state.move_count, restored));
        debug!("Undo restored {} tiles ({} snapshots left)", restored, self.state.undo_history.len());
        Ok(())
    }

    /// Place a 4 on a random empty cell.
    ///
    /// Nothing is counted or recorded unless the resulting board is valid.
    pub fn force_tile(&mut self) -> Result<Tile, GameError> {
        self.ensure_idle()?;
        let rng_state = self.rng.state();
        let next_tile_id = self.state.next_tile_id;

        let tile = place_tile(&mut self.state, &self.engine, &mut self.rng, FORCED_TILE_VALUE)
            .ok_or(GameError::BoardFull)?;

        if let Err(e) = self.engine.validate(&self.state.tiles) {
            self.state.tiles.pop();
            self.state.next_tile_id = next_tile_id;
            self.rng.set_state(rng_state);
            warn!("Forced tile rejected: {}", e);
            return Err(e.into());
        }

        self.state.forced_tiles_used += 1;
        self.state.penalty_seconds += Penalty::ForceTile.seconds(self.state.level);
        self.commands.push(Command::ForceTile);
        self.push_event(GameEvent::tile_spawned(
            self.state.move_count,
            tile.id,
            tile.value,
            tile.position(),
            true,
        ));
        self.check_game_over()?;
        Ok(tile)
    }

    /// Replace the board with the perfect board.
    pub fn set_perfect_board(&mut self) -> Result<(), GameError> {
        self.ensure_idle()?;
        let first_id = TileId::new(self.state.next_tile_id);
        let tiles = self.engine.perfect_board(first_id)?;

        self.state.next_tile_id += tiles.len() as u64;
        self.state.tiles = tiles;
        self.commands.push(Command::PerfectBoard);
        self.check_game_over()?;
        Ok(())
    }

    /// Count one elapsed second of play.
    ///
    /// Time only runs while there are tiles on the board and the game is not over.
    pub fn tick_second(&mut self) {
        self.commands.push(Command::Tick);
        if !self.state.tiles.is_empty() && !self.game_over {
            self.state.seconds += 1;
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn spawn(&mut self, forced: bool) -> Option<Tile> {
        let config = SpawnConfig::from_state(&self.state);
        let tile = spawn_random_tile(&mut self.state, &self.engine, &mut self.rng, &config)?;

        self.push_event(GameEvent::tile_spawned(
            self.state.move_count,
            tile.id,
            tile.value,
            tile.position(),
            forced,
        ));
        Some(tile)
    }

    fn check_game_over(&mut self) -> Result<(), GameError> {
        if self.game_over || !self.engine.is_game_over(&self.state.tiles)? {
            return Ok(());
        }

        self.game_over = true;
        info!(
            "Game over after {} moves: score {}, highest tile {}",
            self.state.move_count,
            self.state.score,
            self.state.highest_tile()
        );
        self.push_event(GameEvent::game_over(
            self.state.move_count,
            self.state.score,
            self.state.highest_tile(),
        ));
        Ok(())
    }

    pub(crate) fn restore(&mut self, state: GameState, rng_state: [u64; 2]) -> Result<(), GameError> {
        self.load_state(state)?;
        self.rng.set_state(rng_state);
        self.replay_start = Some((self.state.clone(), rng_state));
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
