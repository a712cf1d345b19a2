use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chroma_fuse::core::chain::resolve_step;
use chroma_fuse::core::{detect_groups, Board, GameSnapshot, GameState, SimpleRng};
use chroma_fuse::engine::{choose_placement, Weights};
use chroma_fuse::types::{Direction, PALETTE};

/// Lower half of the default board filled with mixed colors
fn mixed_board() -> Board {
    Board::from_rows(&[
        "........",
        "........",
        "........",
        "........",
        "........",
        "........",
        "........",
        "........",
        "RRBBGGRR",
        "RBBGGRRB",
        "BBGGRRBB",
        "BGGRRBBG",
        "GGRRBBGG",
        "GRRBBGGR",
        "RRBBGGRR",
        "RBBGGRRB",
    ])
}

fn bench_tick(c: &mut Criterion) {
    let mut state = GameState::new(12345);
    state.start();

    c.bench_function("game_tick_16ms", |b| {
        b.iter(|| {
            state.tick(black_box(16));
        })
    });
}

fn bench_detect_groups(c: &mut Criterion) {
    let board = mixed_board();
    c.bench_function("detect_groups", |b| {
        b.iter(|| detect_groups(black_box(&board)))
    });
}

fn bench_resolve_cascade(c: &mut Criterion) {
    let board = mixed_board();
    c.bench_function("resolve_cascade", |b| {
        b.iter(|| {
            let mut board = board.clone();
            let mut rng = SimpleRng::new(7);
            while resolve_step(&mut board, Direction::Down, &PALETTE[..3], &mut rng).is_some() {}
            board
        })
    });
}

fn bench_hard_drop_cycle(c: &mut Criterion) {
    c.bench_function("hard_drop_cycle", |b| {
        b.iter(|| {
            let mut state = GameState::new(black_box(12345));
            state.start();
            for _ in 0..8 {
                if state.hard_drop().is_err() {
                    break;
                }
                state.run_resolution();
            }
            state.score()
        })
    });
}

fn bench_choose_placement(c: &mut Criterion) {
    let mut state = GameState::new(12345);
    state.start();
    let weights = Weights::default();

    c.bench_function("choose_placement", |b| {
        b.iter(|| choose_placement(black_box(&state), &weights))
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let mut state = GameState::new(12345);
    state.start();
    let mut snap = GameSnapshot::default();

    c.bench_function("snapshot_into", |b| {
        b.iter(|| {
            state.snapshot_into(&mut snap);
        })
    });
}

criterion_group!(
    benches,
    bench_tick,
    bench_detect_groups,
    bench_resolve_cascade,
    bench_hard_drop_cycle,
    bench_choose_placement,
    bench_snapshot
);
criterion_main!(benches);
