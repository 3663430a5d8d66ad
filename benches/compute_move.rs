use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;

use tile_quest::game::controller::{GameConfig, GameController};
use tile_quest::{BoardEngine, Direction, Tile};

/// Boards of increasing density from a seeded game.
fn corpus(board_size: usize) -> Vec<Vec<Tile>> {
    let config = GameConfig { board_size, seed: Some(42), ..GameConfig::default() };
    let mut controller = match GameController::with_game_id(config, [0; 16]) {
        Ok(controller) => controller,
        Err(e) => panic!("bench setup failed: {e}"),
    };

    let mut boards = vec![controller.state().tiles.clone()];
    let seq = [Direction::Left, Direction::Up, Direction::Right, Direction::Down];
    for i in 0..40 {
        if controller.play(seq[i % seq.len()]).is_err() || controller.is_game_over() {
            break;
        }
        boards.push(controller.state().tiles.clone());
    }
    boards
}

fn bench_compute_move(c: &mut Criterion) {
    for board_size in [4, 6, 10] {
        let engine = BoardEngine::new(board_size).unwrap_or_else(|e| panic!("{e}"));
        let boards = corpus(board_size);

        for direction in Direction::ALL {
            c.bench_function(&format!("compute_move/{board_size}x{board_size}/{direction}"), |bch| {
                bch.iter(|| {
                    let mut merges = 0usize;
                    for tiles in &boards {
                        if let Ok(result) = engine.compute_move(black_box(tiles), direction) {
                            merges += result.merges.len();
                        }
                    }
                    black_box(merges)
                })
            });
        }
    }
}

fn bench_play(c: &mut Criterion) {
    c.bench_function("controller/play_100", |bch| {
        bch.iter_batched(
            || {
                let config = GameConfig { seed: Some(7), ..GameConfig::default() };
                GameController::with_game_id(config, [1; 16]).unwrap_or_else(|e| panic!("{e}"))
            },
            |mut controller| {
                for i in 0..100 {
                    let _ = controller.play(Direction::ALL[i % 4]);
                }
                black_box(controller.state().score)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_compute_move, bench_play);
criterion_main!(benches);
