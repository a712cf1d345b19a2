//! Greedy autoplay
//!
//! Tries every reachable placement of the active piece on a cloned state,
//! resolves the cycle, and keeps the placement with the best evaluation.
//! Used by the headless `simulate` runner and the benches.

use tracing::trace;

use chroma_fuse_core::{Board, GameState, RandomSource};
use chroma_fuse_types::{Direction, Phase};

use crate::place::{apply_place, PlaceError, Placement};

/// Evaluation weights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weights {
    /// Per point of score gained by the placement
    pub score: i64,
    /// Per line of stack depth measured from the far edge
    pub stack: i64,
    /// Per pair of same-colored orthogonal neighbours
    pub adjacency: i64,
    /// Per empty cell sealed under an occupied one
    pub holes: i64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            score: 1,
            stack: -40,
            adjacency: 15,
            holes: -25,
        }
    }
}

/// Every lane/rotation/hold combination worth trying for the current piece
pub fn candidates<R: RandomSource + Clone>(state: &GameState<R>) -> Vec<Placement> {
    let Some(piece) = state.active() else {
        return Vec::new();
    };
    let board = state.board();
    let extent = if state.gravity().is_vertical() {
        board.width() as i8
    } else {
        board.height() as i8
    };
    let rotations = if piece.len() > 1 { 4 } else { 1 };
    let holds: &[bool] = if state.can_hold() {
        &[false, true]
    } else {
        &[false]
    };

    let mut out = Vec::with_capacity(holds.len() * rotations as usize * extent as usize);
    for &use_hold in holds {
        for rotation in 0..rotations {
            for lane in 0..extent {
                let mut placement = Placement::new(rotation, lane);
                placement.use_hold = use_hold;
                out.push(placement);
            }
        }
    }
    out
}

/// Score a settled board after a placement
pub fn evaluate(board: &Board, gravity: Direction, gained: u64, weights: &Weights) -> i64 {
    let (dx, dy) = gravity.vector();
    let (w, h) = (board.width() as i8, board.height() as i8);

    // Depth of a cell = how many lines it sits away from the far edge
    let depth = |x: i8, y: i8| -> i64 {
        match gravity {
            Direction::Down => (h - y) as i64,
            Direction::Up => (y + 1) as i64,
            Direction::Right => (w - x) as i64,
            Direction::Left => (x + 1) as i64,
        }
    };

    let mut stack = 0;
    let mut adjacency = 0;
    for cell in board.iter() {
        stack = stack.max(depth(cell.x, cell.y));
        for (nx, ny) in [(cell.x + 1, cell.y), (cell.x, cell.y + 1)] {
            if let Some(other) = board.get(nx, ny) {
                if other.color.connects(cell.color) {
                    adjacency += 1;
                }
            }
        }
    }

    let mut holes = 0;
    for cell in board.iter() {
        let (hx, hy) = (cell.x + dx, cell.y + dy);
        if board.in_bounds(hx, hy) && !board.is_occupied(hx, hy) {
            holes += 1;
        }
    }

    weights.score * gained.min(i64::MAX as u64) as i64
        + weights.stack * stack
        + weights.adjacency * adjacency
        + weights.holes * holes
}

/// Best placement for the active piece, or `None` if nothing can be placed
pub fn choose_placement<R: RandomSource + Clone>(
    state: &GameState<R>,
    weights: &Weights,
) -> Option<Placement> {
    let mut best: Option<(i64, Placement)> = None;
    for placement in candidates(state) {
        let mut trial = state.clone();
        if apply_place(&mut trial, placement).is_err() {
            continue;
        }
        trial.run_resolution();

        let value = if trial.phase() == Phase::GameOver {
            i64::MIN
        } else {
            let gained = trial.score() - state.score();
            evaluate(trial.board(), trial.gravity(), gained, weights)
        };
        trace!(?placement, value, "candidate");
        if best.map_or(true, |(v, _)| value > v) {
            best = Some((value, placement));
        }
    }
    best.map(|(_, placement)| placement)
}

/// Choose and execute the best placement; the lock is left unresolved
pub fn play_piece<R: RandomSource + Clone>(
    state: &mut GameState<R>,
    weights: &Weights,
) -> Result<Placement, PlaceError> {
    if state.phase() != Phase::AwaitingInput || state.paused() {
        return Err(PlaceError::NotPlayable);
    }
    let placement = choose_placement(state, weights).ok_or(PlaceError::LaneBlocked)?;
    apply_place(state, placement)?;
    Ok(placement)
}
