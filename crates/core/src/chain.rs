//! Chain step - one detect/resolve/remove/compact iteration
//!
//! [`resolve_step`] is the unit a scheduler drives. It returns `None` once no
//! group remains, which ends the resolution cycle. Every step that returns
//! `Some` either removed a cell or decremented a frozen count, so a cycle on a
//! board of `n` cells ends within `2 * n` steps.

use tracing::debug;

use crate::board::Board;
use crate::effects::{apply_resolution, resolve_effects};
use crate::fusion::detect_groups;
use crate::rng::RandomSource;
use crate::types::{ClearedCell, Color, Direction, EffectTrigger, Pos};

/// Board-level outcome of one step, before scoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub groups: u32,
    pub cleared: Vec<ClearedCell>,
    pub effects: Vec<EffectTrigger>,
    pub frozen_hits: Vec<Pos>,
    pub multiplier: u32,
    /// Cells moved by compaction
    pub compacted: u32,
}

/// Run one chain step on `board`; `None` if nothing fuses
pub fn resolve_step<R: RandomSource>(
    board: &mut Board,
    gravity: Direction,
    palette: &[Color],
    rng: &mut R,
) -> Option<StepOutcome> {
    let groups = detect_groups(board);
    if groups.is_empty() {
        return None;
    }

    let resolution = resolve_effects(board, &groups, palette, rng);
    let cleared = apply_resolution(board, &resolution);
    let compacted = board.compact(gravity);

    debug!(
        groups = groups.len(),
        cleared = cleared.len(),
        frozen_hits = resolution.frozen_hits.len(),
        compacted,
        "chain step"
    );

    Some(StepOutcome {
        groups: groups.len() as u32,
        cleared,
        effects: resolution.effects,
        frozen_hits: resolution.frozen_hits.iter().map(|&(pos, _)| pos).collect(),
        multiplier: resolution.multiplier,
        compacted,
    })
}
