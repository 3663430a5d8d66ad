//! Tile Spawning
//!
//! Deterministic spawn policy: a uniformly chosen empty cell receives the
//! base value, or twice the base value with the level's probability.

use crate::core::rng::DeterministicRng;
use crate::game::engine::BoardEngine;
use crate::game::state::{GameLevel, GameState};
use crate::game::tile::{Position, Tile};

/// Smallest value ever spawned.
pub const BASE_SPAWN_VALUE: u64 = 2;

/// Configuration for tile spawning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnConfig {
    /// Chance (percent) of spawning the doubled value
    pub four_chance: u8,
    /// Base value tracks the smallest tile on the board
    pub escalating: bool,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self::for_level(GameLevel::default(), false)
    }
}

impl SpawnConfig {
    /// Spawn settings for a level.
    pub fn for_level(level: GameLevel, escalating: bool) -> Self {
        Self {
            four_chance: level.probability_of_fours(),
            escalating,
        }
    }

    /// Spawn settings matching a game's current options.
    pub fn from_state(state: &GameState) -> Self {
        Self::for_level(state.level, state.escalating_mode)
    }
}

/// Base spawn value for the current board.
///
/// In escalating mode, once no 2s remain the spawns move up to 4s and 8s,
/// once no 4s remain to 8s and 16s, and so on.
pub fn spawn_base(tiles: &[Tile], escalating: bool) -> u64 {
    if !escalating {
        return BASE_SPAWN_VALUE;
    }
    tiles
        .iter()
        .map(|t| t.value)
        .min()
        .unwrap_or(BASE_SPAWN_VALUE)
        .max(BASE_SPAWN_VALUE)
}

/// Draw a spawn value.
pub fn random_spawn_value(rng: &mut DeterministicRng, config: &SpawnConfig, tiles: &[Tile]) -> u64 {
    let base = spawn_base(tiles, config.escalating);
    if rng.next_chance(config.four_chance) {
        base * 2
    } else {
        base
    }
}

/// Spawn one tile on a random empty cell.
///
/// The cell is drawn before the value. Returns the new tile, or `None` when
/// the board is full.
pub fn spawn_random_tile(
    state: &mut GameState,
    engine: &BoardEngine,
    rng: &mut DeterministicRng,
    config: &SpawnConfig,
) -> Option<Tile> {
    let position = random_empty_cell(state, engine, rng)?;
    let value = random_spawn_value(rng, config, &state.tiles);
    Some(insert_tile(state, value, position))
}

/// Place a tile of a fixed `value` on a random empty cell.
pub fn place_tile(
    state: &mut GameState,
    engine: &BoardEngine,
    rng: &mut DeterministicRng,
    value: u64,
) -> Option<Tile> {
    let position = random_empty_cell(state, engine, rng)?;
    Some(insert_tile(state, value, position))
}

fn random_empty_cell(state: &GameState, engine: &BoardEngine, rng: &mut DeterministicRng) -> Option<Position> {
    let empty = engine.empty_positions(&state.tiles);
    rng.choose(&empty).copied()
}

fn insert_tile(state: &mut GameState, value: u64, position: Position) -> Tile {
    let tile = Tile::at(state.allocate_tile_id(), value, position);
    state.tiles.push(tile);
    tile
}

// =============================================================================
// TESTS
// =============================================================================
