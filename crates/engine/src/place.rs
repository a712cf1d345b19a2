//! Placement planner
//!
//! Turns a target placement (rotation count, lane and optional hold) into the
//! command sequence that reaches it: hold first, then rotations, then single
//! steps along the lane axis, then a hard drop.
//!
//! The lane axis is perpendicular to gravity: the pivot column for vertical
//! gravity, the pivot row for horizontal gravity. A failed plan leaves the
//! game exactly as it was.

use chroma_fuse_core::shapes::bounds;
use chroma_fuse_core::{CommandError, GameState, RandomSource};
use chroma_fuse_types::{Direction, Phase};

/// A target placement for the active piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Clockwise quarter turns applied before moving
    pub rotations: u8,
    /// Pivot coordinate on the lane axis (x for vertical gravity, y otherwise)
    pub lane: i8,
    /// Swap the primary cell through the hold slot first
    pub use_hold: bool,
}

impl Placement {
    pub fn new(rotations: u8, lane: i8) -> Self {
        Self {
            rotations,
            lane,
            use_hold: false,
        }
    }

    pub fn with_hold(mut self) -> Self {
        self.use_hold = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    /// Piece commands are not accepted in the current phase
    NotPlayable,
    HoldUnavailable,
    /// A rotation was blocked even after kicks
    RotationBlocked,
    /// The lane puts a cell outside the board
    LaneOutOfBounds,
    /// A cell on the way to the lane is occupied
    LaneBlocked,
    /// The hold emptied the slot and the next piece could not spawn
    NoActivePiece,
}

impl PlaceError {
    pub fn code(&self) -> &'static str {
        match self {
            PlaceError::NotPlayable => "not_playable",
            PlaceError::HoldUnavailable => "hold_unavailable",
            PlaceError::RotationBlocked => "rotation_blocked",
            PlaceError::LaneOutOfBounds => "lane_out_of_bounds",
            PlaceError::LaneBlocked => "lane_blocked",
            PlaceError::NoActivePiece => "no_active_piece",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PlaceError::NotPlayable => "piece commands are not accepted now",
            PlaceError::HoldUnavailable => "hold is unavailable",
            PlaceError::RotationBlocked => "rotation is blocked",
            PlaceError::LaneOutOfBounds => "lane is out of bounds",
            PlaceError::LaneBlocked => "lane is blocked",
            PlaceError::NoActivePiece => "no active piece",
        }
    }
}

impl std::fmt::Display for PlaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for PlaceError {}

/// Lane axis direction pair (toward lower, toward higher) for a gravity
fn lane_steps(gravity: Direction) -> (Direction, Direction) {
    if gravity.is_vertical() {
        (Direction::Left, Direction::Right)
    } else {
        (Direction::Up, Direction::Down)
    }
}

/// Execute `placement` on the active piece and hard drop it
///
/// On success the game is in [`Phase::Resolving`]. On failure the state is
/// restored to what it was before the call.
pub fn apply_place<R: RandomSource + Clone>(
    state: &mut GameState<R>,
    placement: Placement,
) -> Result<(), PlaceError> {
    if state.phase() != Phase::AwaitingInput || state.paused() {
        return Err(PlaceError::NotPlayable);
    }

    let before = state.clone();
    let result = plan(state, placement);
    if result.is_err() {
        *state = before;
    }
    result
}

fn plan<R: RandomSource + Clone>(
    state: &mut GameState<R>,
    placement: Placement,
) -> Result<(), PlaceError> {
    if placement.use_hold {
        state.hold().map_err(|err| match err {
            CommandError::HoldUnavailable => PlaceError::HoldUnavailable,
            _ => PlaceError::NotPlayable,
        })?;
        if state.active().is_none() {
            return Err(PlaceError::NoActivePiece);
        }
    }

    for _ in 0..placement.rotations % 4 {
        state.rotate().map_err(|_| PlaceError::RotationBlocked)?;
    }

    let gravity = state.gravity();
    let piece = state.active().ok_or(PlaceError::NoActivePiece)?;
    let (min_x, min_y, max_x, max_y) = bounds(&piece.offsets);
    let (current, low, high, extent) = if gravity.is_vertical() {
        (piece.x, min_x, max_x, state.board().width() as i8)
    } else {
        (piece.y, min_y, max_y, state.board().height() as i8)
    };
    if placement.lane + low < 0 || placement.lane + high >= extent {
        return Err(PlaceError::LaneOutOfBounds);
    }

    let (toward_low, toward_high) = lane_steps(gravity);
    let dir = if placement.lane < current {
        toward_low
    } else {
        toward_high
    };
    for _ in 0..(placement.lane - current).unsigned_abs() {
        state
            .move_piece(dir)
            .map_err(|_| PlaceError::LaneBlocked)?;
    }

    state.hard_drop().map_err(|_| PlaceError::NotPlayable)
}
