//! Garbage injection
//!
//! From `garbage_min_level` on, a timer accumulates game time while a piece is
//! falling. Each expiry queues one or two rows (at most
//! [`GARBAGE_MAX_PENDING`]). Queued rows are only written at the end of a
//! lock's resolution cycle: the stack shifts one line toward the spawn edge
//! and a new line appears at the far edge.

use tracing::info;

use crate::board::Board;
use crate::rng::RandomSource;
use crate::types::{
    Color, Direction, SpecialType, GARBAGE_BASE_INTERVAL_MS, GARBAGE_INTERVAL_STEP_MS,
    GARBAGE_MAX_PENDING, GARBAGE_MIN_INTERVAL_MS, GARBAGE_STONE_PER_MILLE,
};

/// Garbage interval for a level at or above `min_level`
pub fn garbage_interval_ms(level: u32, min_level: u32) -> u32 {
    let steps = level.saturating_sub(min_level);
    GARBAGE_BASE_INTERVAL_MS
        .saturating_sub(GARBAGE_INTERVAL_STEP_MS.saturating_mul(steps))
        .max(GARBAGE_MIN_INTERVAL_MS)
}

/// Result of writing the queued rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    /// `rows` lines were written
    Injected { rows: u8 },
    /// A shift pushed a cell into the spawn edge; the round is lost
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GarbageInjector {
    timer_ms: u32,
    pending: u8,
}

impl GarbageInjector {
    pub fn pending(&self) -> u8 {
        self.pending
    }

    pub fn timer_ms(&self) -> u32 {
        self.timer_ms
    }

    /// Queue rows directly (tests and scripted puzzles)
    pub fn queue(&mut self, rows: u8) {
        self.pending = self.pending.saturating_add(rows).min(GARBAGE_MAX_PENDING);
    }

    /// Advance the timer; returns how many rows were queued
    pub fn tick<R: RandomSource>(
        &mut self,
        elapsed_ms: u32,
        level: u32,
        min_level: u32,
        rng: &mut R,
    ) -> u8 {
        if level < min_level {
            self.timer_ms = 0;
            return 0;
        }
        self.timer_ms = self.timer_ms.saturating_add(elapsed_ms);
        let interval = garbage_interval_ms(level, min_level);
        if self.timer_ms < interval {
            return 0;
        }
        self.timer_ms -= interval;
        let before = self.pending;
        self.queue(1 + rng.next_range(2) as u8);
        self.pending - before
    }

    /// Write every queued row, toward the far edge in `gravity`
    pub fn inject<R: RandomSource>(
        &mut self,
        board: &mut Board,
        gravity: Direction,
        palette: &[Color],
        rng: &mut R,
        now_ms: u64,
    ) -> Injection {
        let rows = std::mem::take(&mut self.pending);
        for _ in 0..rows {
            if board.shift_toward(gravity.opposite()) {
                info!(rows, "garbage overflow");
                return Injection::Overflow;
            }
            write_row(board, gravity, palette, rng, now_ms);
        }
        if rows > 0 {
            info!(rows, gravity = gravity.as_str(), "garbage injected");
        }
        Injection::Injected { rows }
    }
}

/// One garbage line at the far edge: random colors, one gap, maybe a stone
fn write_row<R: RandomSource>(
    board: &mut Board,
    gravity: Direction,
    palette: &[Color],
    rng: &mut R,
    now_ms: u64,
) {
    let line = board.edge_positions(gravity);
    if line.is_empty() {
        return;
    }
    let gap = rng.next_range(line.len() as u32) as usize;
    let stone = rng
        .chance(GARBAGE_STONE_PER_MILLE)
        .then(|| rng.next_range(line.len() as u32) as usize)
        .filter(|&i| i != gap);

    for (i, &(x, y)) in line.iter().enumerate() {
        if i == gap {
            continue;
        }
        let color = rng.pick(palette).copied().unwrap_or(Color::Red);
        let special = if Some(i) == stone {
            SpecialType::Stone
        } else {
            SpecialType::Normal
        };
        board.place(x, y, color, special, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SimpleRng;
    use crate::types::GARBAGE_MIN_LEVEL;

    const PALETTE: [Color; 3] = [Color::Red, Color::Blue, Color::Green];

    #[test]
    fn test_interval_shrinks_to_floor() {
        assert_eq!(garbage_interval_ms(5, GARBAGE_MIN_LEVEL), 30_000);
        assert_eq!(garbage_interval_ms(6, GARBAGE_MIN_LEVEL), 28_000);
        assert_eq!(garbage_interval_ms(20, GARBAGE_MIN_LEVEL), GARBAGE_MIN_INTERVAL_MS);
    }

    #[test]
    fn test_inactive_below_min_level() {
        let mut garbage = GarbageInjector::default();
        let mut rng = SimpleRng::new(1);
        assert_eq!(garbage.tick(100_000, 4, GARBAGE_MIN_LEVEL, &mut rng), 0);
        assert_eq!(garbage.pending(), 0);
    }

    #[test]
    fn test_timer_queues_rows_and_caps() {
        let mut garbage = GarbageInjector::default();
        let mut rng = SimpleRng::new(1);
        assert_eq!(garbage.tick(29_999, 5, GARBAGE_MIN_LEVEL, &mut rng), 0);
        let queued = garbage.tick(1, 5, GARBAGE_MIN_LEVEL, &mut rng);
        assert!((1..=2).contains(&queued));
        for _ in 0..10 {
            garbage.tick(30_000, 5, GARBAGE_MIN_LEVEL, &mut rng);
        }
        assert_eq!(garbage.pending(), GARBAGE_MAX_PENDING);
    }

    #[test]
    fn test_queue_and_timer_saturate() {
        let mut garbage = GarbageInjector::default();
        garbage.queue(3);
        garbage.queue(u8::MAX);
        assert_eq!(garbage.pending(), GARBAGE_MAX_PENDING);

        let mut garbage = GarbageInjector::default();
        let mut rng = SimpleRng::new(1);
        assert_eq!(garbage.tick(10, 5, GARBAGE_MIN_LEVEL, &mut rng), 0);
        assert!(garbage.tick(u32::MAX, 5, GARBAGE_MIN_LEVEL, &mut rng) > 0);
    }

    #[test]
    fn test_inject_writes_row_with_one_gap() {
        let mut board = Board::new();
        board.place(0, 15, Color::Red, SpecialType::Normal, 0);
        let mut garbage = GarbageInjector::default();
        garbage.queue(1);
        let mut rng = SimpleRng::new(9);
        let result = garbage.inject(&mut board, Direction::Down, &PALETTE, &mut rng, 0);
        assert_eq!(result, Injection::Injected { rows: 1 });
        assert_eq!(garbage.pending(), 0);

        // The old cell moved up one row, the bottom row has exactly one gap.
        assert_eq!(board.get(0, 14).map(|c| c.color), Some(Color::Red));
        let filled = (0..8).filter(|&x| board.is_occupied(x, 15)).count();
        assert_eq!(filled, 7);
    }

    #[test]
    fn test_inject_overflow_on_full_spawn_row() {
        let mut board = Board::new();
        for x in 0..8 {
            board.place(x, 0, Color::Blue, SpecialType::Normal, 0);
        }
        let mut garbage = GarbageInjector::default();
        garbage.queue(1);
        let mut rng = SimpleRng::new(9);
        let result = garbage.inject(&mut board, Direction::Down, &PALETTE, &mut rng, 0);
        assert_eq!(result, Injection::Overflow);
    }

    #[test]
    fn test_inject_sideways_gravity() {
        let mut board = Board::new();
        let mut garbage = GarbageInjector::default();
        garbage.queue(2);
        let mut rng = SimpleRng::new(4);
        garbage.inject(&mut board, Direction::Right, &PALETTE, &mut rng, 0);
        let right = (0..16).filter(|&y| board.is_occupied(7, y)).count();
        let next = (0..16).filter(|&y| board.is_occupied(6, y)).count();
        assert_eq!(right, 15);
        assert_eq!(next, 15);
    }
}
