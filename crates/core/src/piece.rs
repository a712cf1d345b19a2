//! Falling piece model and drop geometry
//!
//! A [`FallingPiece`] is an ordered list of cells placed at `base + offsets[i]`.
//! Only the first (primary) cell may carry a special type. The piece exists
//! between spawn and lock; [`settle_independently`] computes where each cell
//! ends up on a hard drop, where cells are not rigidly linked.

use arrayvec::ArrayVec;

use crate::board::Board;
use crate::shapes::{try_rotate, Offsets};
use crate::types::{Color, Direction, Pos, SpecialType, MAX_PIECE_CELLS};

/// Color and special type of one piece cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceCell {
    pub color: Color,
    pub special: SpecialType,
}

impl PieceCell {
    pub fn normal(color: Color) -> Self {
        Self {
            color,
            special: SpecialType::Normal,
        }
    }
}

/// Active falling piece
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FallingPiece {
    pub shape: String,
    pub cells: ArrayVec<PieceCell, MAX_PIECE_CELLS>,
    pub offsets: Offsets,
    pub x: i8,
    pub y: i8,
}

impl FallingPiece {
    /// Build a piece; `cells` and `offsets` are matched index by index
    pub fn new(shape: impl Into<String>, cells: &[PieceCell], offsets: &[Pos], x: i8, y: i8) -> Self {
        let n = cells.len().min(offsets.len());
        Self {
            shape: shape.into(),
            cells: cells[..n].iter().copied().collect(),
            offsets: offsets[..n].iter().copied().collect(),
            x,
            y,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn primary(&self) -> Option<&PieceCell> {
        self.cells.first()
    }

    /// Absolute board positions of every cell, in cell order
    pub fn positions(&self) -> ArrayVec<Pos, MAX_PIECE_CELLS> {
        self.offsets
            .iter()
            .map(|&(dx, dy)| (self.x + dx, self.y + dy))
            .collect()
    }

    /// Check if all cells are at valid positions on the board
    pub fn is_valid(&self, board: &Board) -> bool {
        self.fits(board, 0, 0)
    }

    /// Check if the piece would fit translated by (dx, dy)
    pub fn fits(&self, board: &Board, dx: i8, dy: i8) -> bool {
        self.positions()
            .iter()
            .all(|&(x, y)| board.is_valid(x + dx, y + dy))
    }

    /// Translated copy of the piece
    pub fn translated(&self, dx: i8, dy: i8) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }

    /// Rotated copy (clockwise about the primary cell, with kicks)
    pub fn rotated(&self, board: &Board) -> Option<Self> {
        let (offsets, kick) = try_rotate(&self.offsets, self.x, self.y, |x, y| board.is_valid(x, y))?;
        Some(Self {
            offsets,
            x: self.x + kick,
            ..self.clone()
        })
    }

    /// Check if any cell rests against an obstacle along `gravity`
    pub fn is_grounded(&self, board: &Board, gravity: Direction) -> bool {
        let (dx, dy) = gravity.vector();
        !self.fits(board, dx, dy)
    }
}

/// Final position of every cell of a hard drop, in cell order
///
/// Cells are processed from the one nearest the eventual obstruction; each
/// travels along `gravity` until the next step is out of bounds, occupied on the
/// board, or taken by a cell that already settled during this drop.
pub fn settle_independently(
    board: &Board,
    positions: &[Pos],
    gravity: Direction,
) -> ArrayVec<Pos, MAX_PIECE_CELLS> {
    let (dx, dy) = gravity.vector();

    // Larger projection on the gravity vector = closer to the far edge.
    let mut order: ArrayVec<usize, MAX_PIECE_CELLS> = (0..positions.len()).collect();
    order.sort_by_key(|&i| {
        let (x, y) = positions[i];
        -(x as i16 * dx as i16 + y as i16 * dy as i16)
    });

    let mut settled: ArrayVec<Pos, MAX_PIECE_CELLS> = positions.iter().copied().collect();
    let mut done: ArrayVec<Pos, MAX_PIECE_CELLS> = ArrayVec::new();
    for i in order {
        let (mut x, mut y) = positions[i];
        loop {
            let (nx, ny) = (x + dx, y + dy);
            if !board.is_valid(nx, ny) || done.contains(&(nx, ny)) {
                break;
            }
            x = nx;
            y = ny;
        }
        settled[i] = (x, y);
        done.push((x, y));
    }
    settled
}
