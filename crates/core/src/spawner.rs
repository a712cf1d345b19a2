//! Piece spawner - shapes, colors, specials and entry position
//!
//! Pieces are generated into a preview queue of [`NEXT_QUEUE_LEN`] entries.
//! Each generated piece:
//!
//! - takes its cell count from the level curve and a random template of that size
//! - draws one color per cell from a rolling color queue; a fresh draw never
//!   repeats the previous one while the palette has more than one color
//! - may carry a special on its primary cell, with a hard guarantee after
//!   `special_guarantee_interval` pieces without one
//!
//! The entry position is only computed at spawn time, from the gravity active
//! at that moment.

use std::collections::VecDeque;

use arrayvec::ArrayVec;

use crate::board::Board;
use crate::config::RulesConfig;
use crate::piece::{FallingPiece, PieceCell};
use crate::rng::RandomSource;
use crate::shapes::bounds;
use crate::types::{Color, Direction, SpecialType, MAX_PIECE_CELLS, NEXT_QUEUE_LEN};

/// Special kinds with the level they unlock at and their draw weight
pub const SPECIAL_TABLE: [(SpecialType, u32, u32); 8] = [
    (SpecialType::Bomb, 1, 3),
    (SpecialType::Multiplier, 1, 2),
    (SpecialType::Frozen, 2, 2),
    (SpecialType::ColorShift, 2, 2),
    (SpecialType::Lightning, 3, 2),
    (SpecialType::Cross, 3, 2),
    (SpecialType::Shuffle, 4, 1),
    (SpecialType::Stone, 5, 1),
];

/// Length of the rolling color queue
const COLOR_QUEUE_LEN: usize = 8;

/// Draw a special kind from the entries unlocked at `level`
pub fn draw_special<R: RandomSource>(level: u32, rng: &mut R) -> SpecialType {
    let unlocked = SPECIAL_TABLE.iter().filter(|(_, min, _)| *min <= level);
    let total: u32 = unlocked.clone().map(|(_, _, w)| w).sum();
    let mut roll = rng.next_range(total);
    for &(special, _, weight) in unlocked {
        if roll < weight {
            return special;
        }
        roll -= weight;
    }
    SpecialType::Bomb
}

/// Base position placing `piece`'s bounding box at the entry edge for `gravity`
///
/// The entry edge is opposite the travel direction; the box is centered on
/// the perpendicular axis.
pub fn entry_position(board: &Board, piece: &FallingPiece, gravity: Direction) -> (i8, i8) {
    let (min_x, min_y, max_x, max_y) = bounds(&piece.offsets);
    let (w, h) = (board.width() as i8, board.height() as i8);
    let center_x = (w - (max_x - min_x + 1)) / 2 - min_x;
    let center_y = (h - (max_y - min_y + 1)) / 2 - min_y;
    match gravity {
        Direction::Down => (center_x, -min_y),
        Direction::Up => (center_x, h - 1 - max_y),
        Direction::Left => (w - 1 - max_x, center_y),
        Direction::Right => (-min_x, center_y),
    }
}

/// True if `piece` (already positioned) cannot enter the board
pub fn spawn_blocked(board: &Board, piece: &FallingPiece, gravity: Direction) -> bool {
    if gravity == Direction::Down && board.edge_rows_full(Direction::Up, 2) {
        return true;
    }
    !piece.is_valid(board)
}

/// Preview queue plus the state behind color and special draws
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Spawner {
    next: VecDeque<FallingPiece>,
    colors: VecDeque<Color>,
    last_color: Option<Color>,
    since_special: u32,
}

impl Spawner {
    /// Create a spawner with a full preview queue for `level`
    pub fn new<R: RandomSource>(config: &RulesConfig, level: u32, rng: &mut R) -> Self {
        let mut spawner = Self::default();
        spawner.refill(config, level, rng);
        spawner
    }

    /// Upcoming pieces, next first
    pub fn preview(&self) -> impl Iterator<Item = &FallingPiece> + '_ {
        self.next.iter()
    }

    /// Pieces generated since the last special
    pub fn since_special(&self) -> u32 {
        self.since_special
    }

    /// Take the next piece and top the queue back up
    pub fn pop<R: RandomSource>(
        &mut self,
        config: &RulesConfig,
        level: u32,
        rng: &mut R,
    ) -> FallingPiece {
        let piece = match self.next.pop_front() {
            Some(piece) => piece,
            None => self.generate(config, level, rng),
        };
        self.refill(config, level, rng);
        piece
    }

    fn refill<R: RandomSource>(&mut self, config: &RulesConfig, level: u32, rng: &mut R) {
        while self.next.len() < NEXT_QUEUE_LEN {
            let piece = self.generate(config, level, rng);
            self.next.push_back(piece);
        }
    }

    /// Generate one piece at base position (0, 0)
    pub fn generate<R: RandomSource>(
        &mut self,
        config: &RulesConfig,
        level: u32,
        rng: &mut R,
    ) -> FallingPiece {
        let size = config.piece_cells(level);
        let template = rng.pick(config.shapes.templates(size));
        let (name, offsets) = match template {
            Some(t) => (t.name.clone(), t.to_offsets()),
            None => ("mono".to_string(), [(0, 0)].into_iter().collect()),
        };

        let mut cells: ArrayVec<PieceCell, MAX_PIECE_CELLS> = ArrayVec::new();
        for _ in 0..offsets.len() {
            let color = self.next_color(config, level, rng);
            cells.push(PieceCell::normal(color));
        }

        let forced = self.since_special + 1 >= config.special_guarantee_interval;
        if forced || rng.chance(config.special_chance(level)) {
            cells[0].special = draw_special(level, rng);
            self.since_special = 0;
        } else {
            self.since_special += 1;
        }

        FallingPiece::new(name, &cells, &offsets, 0, 0)
    }

    /// Pop the color queue, refilling it from the level palette
    fn next_color<R: RandomSource>(&mut self, config: &RulesConfig, level: u32, rng: &mut R) -> Color {
        let palette = config.palette(level);
        while self.colors.len() < COLOR_QUEUE_LEN {
            let color = self.draw_color(palette, rng);
            self.colors.push_back(color);
        }
        let queued = self.colors.pop_front().unwrap_or(palette[0]);
        // Colors queued before a palette change may have left the palette.
        let color = if palette.contains(&queued) {
            queued
        } else {
            self.draw_color(palette, rng)
        };

        if level >= config.wildcard_min_level && rng.chance(config.wildcard_per_mille) {
            return Color::Wildcard;
        }
        color
    }

    fn draw_color<R: RandomSource>(&mut self, palette: &[Color], rng: &mut R) -> Color {
        let choices: ArrayVec<Color, 8> = palette
            .iter()
            .copied()
            .filter(|&c| palette.len() == 1 || Some(c) != self.last_color)
            .collect();
        let color = rng.pick(&choices).copied().unwrap_or(Color::Red);
        self.last_color = Some(color);
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SimpleRng;
    use crate::shapes::{ShapeCatalog, ShapeTemplate};

    #[test]
    fn test_queue_is_full() {
        let config = RulesConfig::default();
        let mut rng = SimpleRng::new(12345);
        let mut spawner = Spawner::new(&config, 1, &mut rng);
        assert_eq!(spawner.preview().count(), NEXT_QUEUE_LEN);
        let first = spawner.preview().next().cloned().unwrap();
        assert_eq!(spawner.pop(&config, 1, &mut rng), first);
        assert_eq!(spawner.preview().count(), NEXT_QUEUE_LEN);
    }

    #[test]
    fn test_piece_size_follows_level() {
        let config = RulesConfig::default();
        let mut rng = SimpleRng::new(3);
        let mut spawner = Spawner::default();
        for level in 1..=20 {
            let piece = spawner.generate(&config, level, &mut rng);
            assert_eq!(piece.len(), config.piece_cells(level));
        }
    }

    #[test]
    fn test_consecutive_colors_differ() {
        let config = RulesConfig {
            wildcard_per_mille: 0,
            ..RulesConfig::default()
        };
        let mut rng = SimpleRng::new(99);
        let mut spawner = Spawner::default();
        let mut last = None;
        for _ in 0..200 {
            let color = spawner.next_color(&config, 1, &mut rng);
            assert!(config.palette(1).contains(&color));
            assert_ne!(Some(color), last);
            last = Some(color);
        }
    }

    #[test]
    fn test_single_color_palette_repeats() {
        let config = RulesConfig {
            palette_size_curve: vec![1],
            wildcard_per_mille: 0,
            ..RulesConfig::default()
        };
        let mut rng = SimpleRng::new(5);
        let mut spawner = Spawner::default();
        for _ in 0..10 {
            assert_eq!(spawner.next_color(&config, 1, &mut rng), Color::Red);
        }
    }

    #[test]
    fn test_special_guarantee() {
        let config = RulesConfig {
            special_base_per_mille: 0,
            special_per_level_per_mille: 0,
            ..RulesConfig::default()
        };
        let mut rng = SimpleRng::new(1);
        let mut spawner = Spawner::default();
        for i in 1..=30 {
            let piece = spawner.generate(&config, 1, &mut rng);
            let special = piece.primary().unwrap().special;
            assert_eq!(special.is_special(), i % 10 == 0, "piece {}", i);
            assert!(piece.cells[1..].iter().all(|c| !c.special.is_special()));
        }
    }

    #[test]
    fn test_special_table_respects_level() {
        let mut rng = SimpleRng::new(77);
        for _ in 0..200 {
            let special = draw_special(1, &mut rng);
            assert!(matches!(special, SpecialType::Bomb | SpecialType::Multiplier));
        }
    }

    #[test]
    fn test_entry_position_by_gravity() {
        let board = Board::new();
        let cells = [PieceCell::normal(Color::Red); 3];
        let piece = FallingPiece::new("tri_line", &cells, &[(0, 0), (1, 0), (2, 0)], 0, 0);

        assert_eq!(entry_position(&board, &piece, Direction::Down), (2, 0));
        assert_eq!(entry_position(&board, &piece, Direction::Up), (2, 15));
        assert_eq!(entry_position(&board, &piece, Direction::Left), (5, 7));
        assert_eq!(entry_position(&board, &piece, Direction::Right), (0, 7));
    }

    #[test]
    fn test_spawn_blocked() {
        let cells = [PieceCell::normal(Color::Red)];
        let piece = FallingPiece::new("mono", &cells, &[(0, 0)], 3, 0);

        let mut board = Board::new();
        assert!(!spawn_blocked(&board, &piece, Direction::Down));
        board.place(3, 0, Color::Blue, SpecialType::Normal, 0);
        assert!(spawn_blocked(&board, &piece, Direction::Down));

        // Top two rows full everywhere blocks even a piece that would fit.
        let mut board = Board::with_size(4, 6);
        for x in 0..4 {
            board.place(x, 0, Color::Blue, SpecialType::Normal, 0);
            board.place(x, 1, Color::Green, SpecialType::Normal, 0);
        }
        board.take(3, 0);
        let piece = FallingPiece::new("mono", &cells, &[(0, 0)], 3, 0);
        assert!(!spawn_blocked(&board, &piece, Direction::Down));
        board.place(3, 0, Color::Blue, SpecialType::Normal, 0);
        assert!(spawn_blocked(&board, &piece.translated(0, 3), Direction::Down));
    }

    #[test]
    fn test_custom_catalog_is_used() {
        let config = RulesConfig {
            shapes: ShapeCatalog::new(vec![ShapeTemplate::new("dot", vec![(0, 0)])]).unwrap(),
            piece_size_curve: vec![1],
            ..RulesConfig::default()
        };
        let mut rng = SimpleRng::new(1);
        let piece = Spawner::default().generate(&config, 1, &mut rng);
        assert_eq!(piece.shape, "dot");
    }
}
