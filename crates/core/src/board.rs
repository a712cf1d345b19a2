//! Board module - manages the game grid
//!
//! The board is a fixed width x height grid where each position holds at most one
//! [`Cell`]. Storage is a flat row-major vector so the dimensions can come from
//! configuration while staying constant for a round.
//! Coordinates: (x, y) where x grows left to right and y grows top to bottom.
//!
//! Settled cells only move through [`Board::compact`] (after a removal step) and
//! [`Board::shift_toward`] (garbage injection). Both rewrite the stored
//! coordinates of every cell they move.

use crate::types::{Color, Direction, Pos, SpecialType, BOARD_HEIGHT, BOARD_WIDTH, FROZEN_HITS};

/// A settled cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Identity assigned when the cell is created on the board
    pub id: u32,
    pub color: Color,
    pub special: SpecialType,
    /// Remaining hits for `Frozen` cells, 0 for every other type
    pub frozen_count: u8,
    /// Game time (ms) at which the cell was created
    pub created_ms: u64,
    pub x: i8,
    pub y: i8,
}

impl Cell {
    pub fn pos(&self) -> Pos {
        (self.x, self.y)
    }
}

/// The game board using flat vector storage
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    width: u8,
    height: u8,
    /// Row-major cells (y * width + x)
    cells: Vec<Option<Cell>>,
    next_id: u32,
}

impl Board {
    /// Create a new empty board with the default dimensions
    pub fn new() -> Self {
        Self::with_size(BOARD_WIDTH, BOARD_HEIGHT)
    }

    /// Create a new empty board with explicit dimensions
    pub fn with_size(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
            next_id: 1,
        }
    }

    /// Build a board from text rows, top row first.
    ///
    /// `.` is empty; `R B G Y P O C K` are the palette colors and `*` is the
    /// wildcard. Any other character is treated as empty. Used by fixtures and
    /// the adapter's board loader.
    ///
    /// ```
    /// use chroma_fuse_core::Board;
    /// use chroma_fuse_core::types::Color;
    ///
    /// let board = Board::from_rows(&["R.", "BB"]);
    /// assert_eq!(board.width(), 2);
    /// assert_eq!(board.get(0, 0).map(|c| c.color), Some(Color::Red));
    /// assert!(board.get(1, 0).is_none());
    /// ```
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u8;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u8;
        let mut board = Self::with_size(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let color = match ch {
                    'R' => Color::Red,
                    'B' => Color::Blue,
                    'G' => Color::Green,
                    'Y' => Color::Yellow,
                    'P' => Color::Purple,
                    'O' => Color::Orange,
                    'C' => Color::Cyan,
                    'K' => Color::Pink,
                    '*' => Color::Wildcard,
                    _ => continue,
                };
                board.place(x as i8, y as i8, color, SpecialType::Normal, 0);
            }
        }
        board
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(&self, x: i8, y: i8) -> Option<usize> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Get the cell at (x, y); None if empty or out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<&Cell> {
        self.index(x, y).and_then(|idx| self.cells[idx].as_ref())
    }

    pub fn get_mut(&mut self, x: i8, y: i8) -> Option<&mut Cell> {
        let idx = self.index(x, y)?;
        self.cells[idx].as_mut()
    }

    /// Set or clear the cell at (x, y)
    ///
    /// The stored coordinates of the cell are rewritten to (x, y).
    /// Returns false if out of bounds.
    pub fn set(&mut self, x: i8, y: i8, cell: Option<Cell>) -> bool {
        match self.index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell.map(|c| Cell { x, y, ..c });
                true
            }
            None => false,
        }
    }

    /// Remove and return the cell at (x, y)
    pub fn take(&mut self, x: i8, y: i8) -> Option<Cell> {
        let idx = self.index(x, y)?;
        self.cells[idx].take()
    }

    /// Create a new cell with a fresh identity at (x, y)
    ///
    /// Frozen cells start with [`FROZEN_HITS`]. Returns false if the position is
    /// out of bounds or occupied.
    pub fn place(&mut self, x: i8, y: i8, color: Color, special: SpecialType, now_ms: u64) -> bool {
        if !self.is_valid(x, y) {
            return false;
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let frozen_count = if special == SpecialType::Frozen {
            FROZEN_HITS
        } else {
            0
        };
        self.set(
            x,
            y,
            Some(Cell {
                id,
                color,
                special,
                frozen_count,
                created_ms: now_ms,
                x,
                y,
            }),
        )
    }

    pub fn in_bounds(&self, x: i8, y: i8) -> bool {
        x >= 0 && (x as i16) < self.width as i16 && y >= 0 && (y as i16) < self.height as i16
    }

    /// Check if position is valid (within bounds and empty)
    pub fn is_valid(&self, x: i8, y: i8) -> bool {
        matches!(self.index(x, y), Some(idx) if self.cells[idx].is_none())
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        self.get(x, y).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Iterate over occupied cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter().filter_map(Option::as_ref)
    }

    /// Number of lines parallel to `dir` (columns for vertical directions)
    pub fn line_count(&self, dir: Direction) -> u8 {
        if dir.is_vertical() {
            self.width
        } else {
            self.height
        }
    }

    /// Positions of one line parallel to `dir`, ordered from the far edge in
    /// `dir` backwards.
    pub fn line_positions(&self, dir: Direction, line: u8) -> Vec<Pos> {
        let l = line as i8;
        let (w, h) = (self.width as i8, self.height as i8);
        match dir {
            Direction::Down => (0..h).rev().map(|y| (l, y)).collect(),
            Direction::Up => (0..h).map(|y| (l, y)).collect(),
            Direction::Right => (0..w).rev().map(|x| (x, l)).collect(),
            Direction::Left => (0..w).map(|x| (x, l)).collect(),
        }
    }

    /// Positions of the edge line the vector `dir` points at
    pub fn edge_positions(&self, dir: Direction) -> Vec<Pos> {
        (0..self.line_count(dir))
            .filter_map(|line| self.line_positions(dir, line).first().copied())
            .collect()
    }

    /// Slide every cell toward the far edge in `dir`, closing gaps
    ///
    /// Relative order within each line is preserved. Returns how many cells moved.
    pub fn compact(&mut self, dir: Direction) -> u32 {
        let mut moved = 0;
        for line in 0..self.line_count(dir) {
            let positions = self.line_positions(dir, line);
            let stack: Vec<Cell> = positions
                .iter()
                .filter_map(|&(x, y)| self.take(x, y))
                .collect();
            for (cell, &(x, y)) in stack.into_iter().zip(positions.iter()) {
                if cell.pos() != (x, y) {
                    moved += 1;
                }
                self.set(x, y, Some(cell));
            }
        }
        moved
    }

    /// Shift every cell one step in `dir`
    ///
    /// Cells pushed past the edge are dropped. Returns true if any cell was
    /// pushed into or past the edge line in `dir`.
    pub fn shift_toward(&mut self, dir: Direction) -> bool {
        let (dx, dy) = dir.vector();
        let mut overflow = false;
        for line in 0..self.line_count(dir) {
            let positions = self.line_positions(dir, line);
            let edge = positions[0];
            for &(x, y) in &positions {
                let Some(cell) = self.take(x, y) else {
                    continue;
                };
                let (nx, ny) = (x + dx, y + dy);
                if !self.in_bounds(nx, ny) {
                    overflow = true;
                    continue;
                }
                if (nx, ny) == edge {
                    overflow = true;
                }
                self.set(nx, ny, Some(cell));
            }
        }
        overflow
    }

    /// True if, in every line, the `depth` positions nearest the edge in `dir`
    /// are all occupied.
    pub fn edge_rows_full(&self, dir: Direction, depth: usize) -> bool {
        (0..self.line_count(dir)).all(|line| {
            self.line_positions(dir, line)
                .iter()
                .take(depth)
                .all(|&(x, y)| self.is_occupied(x, y))
        })
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }

    /// Write a row-major grid of color codes (0 = empty) into `out`
    pub fn write_color_grid(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend(self.cells.iter().map(|c| c.map_or(0, |c| c.color.code())));
    }

    /// Text rendering using the same alphabet as [`Board::from_rows`]
    pub fn to_rows(&self) -> Vec<String> {
        (0..self.height as i8)
            .map(|y| {
                (0..self.width as i8)
                    .map(|x| match self.get(x, y).map(|c| c.color) {
                        None => '.',
                        Some(Color::Red) => 'R',
                        Some(Color::Blue) => 'B',
                        Some(Color::Green) => 'G',
                        Some(Color::Yellow) => 'Y',
                        Some(Color::Purple) => 'P',
                        Some(Color::Orange) => 'O',
                        Some(Color::Cyan) => 'C',
                        Some(Color::Pink) => 'K',
                        Some(Color::Wildcard) => '*',
                    })
                    .collect()
            })
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
