//! Tile Quest
//!
//! Runs a seeded auto-play demo and verifies it by replay, or with `play`
//! reads moves from stdin.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tile_quest::{
    VERSION,
    game::{
        controller::{GameConfig, GameController, GameError},
        events::GameEventData,
        input::{parse_line, Direction, InputAction},
        replay::{replay_game, ReplayLog},
    },
};

/// Seed used by the demo when none is configured.
const DEMO_SEED: u64 = 12345;

/// Upper bound on demo moves.
const MAX_DEMO_MOVES: u32 = 10_000;

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Tile Quest v{}", VERSION);

    let config = GameConfig::from_env().context("invalid configuration")?;
    info!(
        "Board: {}x{}, level: {:?}, escalating: {}, undo limit: {}",
        config.board_size, config.board_size, config.level, config.escalating_mode, config.undo_limit
    );

    match std::env::args().nth(1).as_deref() {
        None | Some("demo") => demo_game(config),
        Some("play") => interactive_game(config),
        Some(other) => bail!("unknown mode {other:?} (expected `demo` or `play`)"),
    }
}

/// Pick the move that scores the most, falling back to any move that changes the board.
fn greedy_direction(controller: &GameController) -> Result<Option<Direction>> {
    let tiles = &controller.state().tiles;
    let mut best: Option<(u64, Direction)> = None;

    for direction in Direction::ALL {
        let result = controller.engine().compute_move(tiles, direction)?;
        if !result.moved {
            continue;
        }
        let points = result.points();
        if best.map_or(true, |(best_points, _)| points > best_points) {
            best = Some((points, direction));
        }
    }

    Ok(best.map(|(_, direction)| direction))
}

/// Auto-play one game and verify it by replay.
fn demo_game(mut config: GameConfig) -> Result<()> {
    info!("=== Starting Demo Game ===");
    config.seed = config.seed.or(Some(DEMO_SEED));

    let mut controller = GameController::new(config)?;
    info!("Game ID: {}", controller.state().game_id_string());
    info!("RNG Seed: {}", controller.rng_seed());

    let mut total_events = controller.take_events().len();

    for _ in 0..MAX_DEMO_MOVES {
        let Some(direction) = greedy_direction(&controller)? else {
            break;
        };

        let summary = controller.play(direction)?;
        controller.tick_second();

        for event in controller.take_events() {
            total_events += 1;
            if let GameEventData::TilesMerged { new_value, .. } = event.data {
                if new_value >= 1024 {
                    info!("Reached {} on move {}", new_value, event.move_number);
                }
            }
        }

        let moves = controller.state().move_count;
        if moves % 100 == 0 {
            info!(
                "Move {}: score {}, highest {}, {} tiles",
                moves,
                controller.state().score,
                controller.state().highest_tile(),
                controller.state().tiles.len()
            );
        }

        if summary.game_over {
            break;
        }
    }

    // Print final results
    info!("=== Game Results ===");
    println!("{}", controller.state());

    let state = controller.state();
    let hash = state.compute_hash();
    info!("Moves: {}", state.move_count);
    info!("Score: {}", state.score);
    info!("Highest tile: {}", state.highest_tile());
    info!("Total events: {}", total_events);
    info!("Final State Hash: {}", hex::encode(hash));

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let json = controller.replay_log().to_json()?;
    info!("Replay log: {} commands, {} bytes", controller.commands().len(), json.len());

    let log = ReplayLog::from_json(&json)?;
    let replayed = replay_game(&log).context("replay diverged")?;
    info!("Replay State Hash: {}", hex::encode(replayed.state().compute_hash()));
    info!("DETERMINISM VERIFIED: Hashes match!");

    Ok(())
}

/// Read moves from stdin until `q` or end of input.
fn interactive_game(config: GameConfig) -> Result<()> {
    let mut controller = GameController::new(config)?;
    controller.take_events();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("wasd / up down left right to move, u undo, f force a 4, n new game, q quit");
    println!("{}", controller.state());

    loop {
        print!("score {} > ", controller.state().score);
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let actions = match parse_line(&line) {
            Ok(actions) => actions,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        for action in actions {
            let outcome = match action {
                InputAction::Move(direction) => controller.play(direction).map(|summary| {
                    if !summary.moved {
                        println!("nothing moves {direction}");
                    }
                }),
                InputAction::Undo => controller.undo(),
                InputAction::ForceTile => controller.force_tile().map(|_| ()),
                InputAction::NewGame => {
                    controller.new_game();
                    Ok(())
                }
                InputAction::Quit => return Ok(()),
            };

            match outcome {
                Ok(()) => {}
                Err(e @ (GameError::NothingToUndo | GameError::BoardFull)) => println!("{e}"),
                Err(e) => {
                    warn!("Command failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        controller.take_events();
        println!("{}", controller.state());
        if controller.is_game_over() {
            println!(
                "Game over: score {}, highest tile {}. Press n for a new game.",
                controller.state().score,
                controller.state().highest_tile()
            );
        }
    }

    Ok(())
}
