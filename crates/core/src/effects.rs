//! Special effect resolution
//!
//! Expands the fused cells of one step into the final removal set. Every
//! special in the fused set is evaluated against the same pre-removal board,
//! so effects never see each other's output within a step.
//!
//! | Special | Effect |
//! |---------|--------|
//! | `Bomb` | adds the square of radius [`BOMB_RADIUS`] around it |
//! | `Lightning` | adds every cell of its color |
//! | `Cross` | adds its full row and column |
//! | `ColorShift` | recolors its 8 neighbours to its own color |
//! | `Shuffle` | recolors its 8 neighbours to random palette colors |
//! | `Multiplier` | doubles the step multiplier (capped) |
//! | `Frozen` | absorbs the hit; removed only once its count reaches 0 |
//! | `Stone` | never removed directly; breaks next to a removed cell |
//!
//! Order: expansion, then frozen exclusion, then stone adjacency against the
//! finalized removal set. Recolors land only on cells that survive the step.

use crate::board::Board;
use crate::fusion::FusionGroup;
use crate::rng::RandomSource;
use crate::types::{
    ClearedCell, Color, EffectTrigger, Pos, SpecialType, BOMB_RADIUS, MULTIPLIER_CAP,
};

const NEIGHBORS_8: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const NEIGHBORS_4: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Positions as a board-sized membership mask
struct Mask {
    width: usize,
    bits: Vec<bool>,
}

impl Mask {
    fn new(board: &Board) -> Self {
        Self {
            width: board.width() as usize,
            bits: vec![false; board.width() as usize * board.height() as usize],
        }
    }

    fn insert(&mut self, board: &Board, (x, y): Pos) {
        if board.is_occupied(x, y) {
            self.bits[y as usize * self.width + x as usize] = true;
        }
    }

    fn remove(&mut self, (x, y): Pos) {
        self.bits[y as usize * self.width + x as usize] = false;
    }

    fn contains(&self, board: &Board, (x, y): Pos) -> bool {
        board.in_bounds(x, y) && self.bits[y as usize * self.width + x as usize]
    }

    /// Members in row-major order
    fn positions(&self) -> Vec<Pos> {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| ((i % self.width) as i8, (i / self.width) as i8))
            .collect()
    }
}

/// The computed outcome of one step, not yet applied to the board
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Cells to remove, row-major
    pub removed: Vec<Pos>,
    /// Frozen cells that absorb a hit and stay, with their new count
    pub frozen_hits: Vec<(Pos, u8)>,
    /// Recolors for cells that survive, in application order
    pub recolors: Vec<(Pos, Color)>,
    pub effects: Vec<EffectTrigger>,
    /// Product of multiplier cells, capped at [`MULTIPLIER_CAP`]
    pub multiplier: u32,
}

/// Compute the removal set for `groups` on the current board
pub fn resolve_effects<R: RandomSource>(
    board: &Board,
    groups: &[FusionGroup],
    palette: &[Color],
    rng: &mut R,
) -> Resolution {
    let mut candidates = Mask::new(board);
    let mut out = Resolution {
        multiplier: 1,
        ..Default::default()
    };

    for group in groups {
        for &pos in &group.cells {
            candidates.insert(board, pos);
        }
    }

    for group in groups {
        for &(x, y) in &group.cells {
            let Some(cell) = board.get(x, y) else {
                continue;
            };
            // A wildcard special acts with the color of the group it fused into.
            let own_color = if cell.color.is_wildcard() {
                group.color
            } else {
                cell.color
            };
            match cell.special {
                SpecialType::Normal | SpecialType::Frozen | SpecialType::Stone => continue,
                SpecialType::Bomb => {
                    for dy in -BOMB_RADIUS..=BOMB_RADIUS {
                        for dx in -BOMB_RADIUS..=BOMB_RADIUS {
                            candidates.insert(board, (x + dx, y + dy));
                        }
                    }
                }
                SpecialType::Lightning => {
                    for other in board.iter().filter(|c| c.color == own_color) {
                        candidates.insert(board, other.pos());
                    }
                }
                SpecialType::Cross => {
                    for cx in 0..board.width() as i8 {
                        candidates.insert(board, (cx, y));
                    }
                    for cy in 0..board.height() as i8 {
                        candidates.insert(board, (x, cy));
                    }
                }
                SpecialType::ColorShift => {
                    for (dx, dy) in NEIGHBORS_8 {
                        if board.is_occupied(x + dx, y + dy) {
                            out.recolors.push(((x + dx, y + dy), own_color));
                        }
                    }
                }
                SpecialType::Shuffle => {
                    for (dx, dy) in NEIGHBORS_8 {
                        if board.is_occupied(x + dx, y + dy) {
                            let color = rng.pick(palette).copied().unwrap_or(own_color);
                            out.recolors.push(((x + dx, y + dy), color));
                        }
                    }
                }
                SpecialType::Multiplier => {
                    out.multiplier = (out.multiplier * 2).min(MULTIPLIER_CAP);
                }
            }
            out.effects.push(EffectTrigger {
                special: cell.special,
                x,
                y,
            });
        }
    }

    // Frozen exclusion, then stones leave the candidate set.
    for pos in candidates.positions() {
        let Some(cell) = board.get(pos.0, pos.1) else {
            continue;
        };
        match cell.special {
            SpecialType::Frozen => {
                let left = cell.frozen_count.saturating_sub(1);
                if left > 0 {
                    candidates.remove(pos);
                    out.frozen_hits.push((pos, left));
                }
            }
            SpecialType::Stone => candidates.remove(pos),
            _ => {}
        }
    }

    // Stones break next to anything finalized above.
    let stones: Vec<Pos> = board
        .iter()
        .filter(|c| c.special == SpecialType::Stone)
        .map(|c| c.pos())
        .filter(|&(x, y)| {
            NEIGHBORS_4
                .iter()
                .any(|&(dx, dy)| candidates.contains(board, (x + dx, y + dy)))
        })
        .collect();
    for pos in stones {
        candidates.insert(board, pos);
    }

    out.removed = candidates.positions();
    out.recolors.retain(|(pos, _)| !out.removed.contains(pos));
    out
}

/// Apply a resolution: frozen hits, removals and recolors
///
/// Returns the removed cells with their pre-removal positions.
pub fn apply_resolution(board: &mut Board, resolution: &Resolution) -> Vec<ClearedCell> {
    for &((x, y), left) in &resolution.frozen_hits {
        if let Some(cell) = board.get_mut(x, y) {
            cell.frozen_count = left;
        }
    }
    let cleared = resolution
        .removed
        .iter()
        .filter_map(|&(x, y)| board.take(x, y))
        .map(|c| ClearedCell {
            x: c.x,
            y: c.y,
            color: c.color,
            special: c.special,
        })
        .collect();
    for &((x, y), color) in &resolution.recolors {
        if let Some(cell) = board.get_mut(x, y) {
            cell.color = color;
        }
    }
    cleared
}
