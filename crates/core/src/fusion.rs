//! Fusion detection - flood fill over the settled board
//!
//! The board is scanned in row-major order. Every unvisited occupied cell that
//! is not a stone starts a 4-directional breadth-first fill. A fill carries an
//! anchor color fixed by its first non-wildcard member; a neighbour joins if
//! it is the wildcard, if the anchor is still unset, or if it matches the
//! anchor. Cells are marked visited once per pass, so groups never overlap.

use std::collections::VecDeque;

use crate::board::Board;
use crate::types::{Color, Pos, SpecialType, FUSION_MIN};

const DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// A connected region large enough to fuse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionGroup {
    /// Anchor color; `Wildcard` if every member is a wildcard
    pub color: Color,
    /// Members in discovery order
    pub cells: Vec<Pos>,
}

impl FusionGroup {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn joins(board: &Board, x: i8, y: i8) -> Option<Color> {
    board
        .get(x, y)
        .filter(|c| c.special != SpecialType::Stone)
        .map(|c| c.color)
}

/// Flood fill from (sx, sy), marking every member in `visited`
fn fill(board: &Board, sx: i8, sy: i8, visited: &mut [bool]) -> FusionGroup {
    let width = board.width() as usize;
    let mut anchor = joins(board, sx, sy).filter(|c| !c.is_wildcard());
    let mut queue = VecDeque::new();
    let mut cells = Vec::new();

    visited[sy as usize * width + sx as usize] = true;
    queue.push_back((sx, sy));
    cells.push((sx, sy));

    while let Some((x, y)) = queue.pop_front() {
        for (dx, dy) in DIRS {
            let (nx, ny) = (x + dx, y + dy);
            if !board.in_bounds(nx, ny) || visited[ny as usize * width + nx as usize] {
                continue;
            }
            let Some(color) = joins(board, nx, ny) else {
                continue;
            };
            let accepted = match anchor {
                _ if color.is_wildcard() => true,
                None => {
                    anchor = Some(color);
                    true
                }
                Some(a) => a == color,
            };
            if accepted {
                visited[ny as usize * width + nx as usize] = true;
                queue.push_back((nx, ny));
                cells.push((nx, ny));
            }
        }
    }

    FusionGroup {
        color: anchor.unwrap_or(Color::Wildcard),
        cells,
    }
}

/// Every group of at least [`FUSION_MIN`] cells, in scan order
pub fn detect_groups(board: &Board) -> Vec<FusionGroup> {
    let width = board.width() as usize;
    let mut visited = vec![false; width * board.height() as usize];
    let mut found = Vec::new();

    for y in 0..board.height() as i8 {
        for x in 0..board.width() as i8 {
            if visited[y as usize * width + x as usize] || joins(board, x, y).is_none() {
                continue;
            }
            let group = fill(board, x, y, &mut visited);
            if group.len() >= FUSION_MIN {
                found.push(group);
            }
        }
    }
    found
}
