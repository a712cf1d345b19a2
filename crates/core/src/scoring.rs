//! Scoring module - step score, combo timer, fever gauge and level curve
//!
//! Per resolution step:
//!
//! ```text
//! score = blocks * 10 * round(chain^2.5) * level * (10 + combo) / 10 * multiplier
//!       + 5000 * level            (board empty after the step)
//! score *= 3                      (fever active)
//! ```
//!
//! Combo counts consecutive placement cycles that cleared something. It only
//! drops back to zero when [`ComboTracker`]'s timeout expires, never because a
//! placement cleared nothing.

use crate::types::{
    BLOCK_POINTS, CHAIN_EXPONENT, COMBO_TIMEOUT_MS, DROP_INTERVALS, DROP_INTERVAL_FLOOR_MS,
    FEVER_DECAY_INTERVAL_MS, FEVER_DURATION_MS, FEVER_GAUGE_MAX, FEVER_PER_CELL, FEVER_PER_CHAIN,
    FEVER_PER_COMBO, FEVER_SCORE_MULTIPLIER, LEVEL_UP_BLOCKS, MAX_LEVEL, PERFECT_CLEAR_BONUS,
};

/// Inputs of one step's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepScoreInput {
    pub blocks: u32,
    /// 1-based chain index
    pub chain: u32,
    pub combo: u32,
    pub level: u32,
    pub multiplier: u32,
    pub perfect_clear: bool,
    pub fever: bool,
}

/// Super-linear chain term: round(chain^2.5)
pub fn chain_factor(chain: u32) -> u64 {
    (chain.max(1) as f64).powf(CHAIN_EXPONENT).round() as u64
}

/// Score of one resolution step
pub fn calculate_step_score(input: StepScoreInput) -> u64 {
    let level = input.level.max(1) as u64;
    let base = (input.blocks as u64)
        .saturating_mul(BLOCK_POINTS)
        .saturating_mul(chain_factor(input.chain))
        .saturating_mul(level)
        .saturating_mul(10 + input.combo as u64)
        / 10;
    let mut total = base.saturating_mul(input.multiplier.max(1) as u64);
    if input.perfect_clear {
        total = total.saturating_add(PERFECT_CLEAR_BONUS * level);
    }
    if input.fever {
        total = total.saturating_mul(FEVER_SCORE_MULTIPLIER);
    }
    total
}

/// Endless-mode level for a total of cleared cells
pub fn calculate_level(start_level: u32, total_cleared: u32) -> u32 {
    (1 + total_cleared / LEVEL_UP_BLOCKS)
        .max(start_level)
        .min(MAX_LEVEL)
}

/// Get drop interval for a level (in milliseconds)
pub fn get_drop_interval_ms(level: u32) -> u32 {
    let idx = level.max(1) as usize - 1;
    DROP_INTERVALS
        .get(idx)
        .copied()
        .unwrap_or(DROP_INTERVAL_FLOOR_MS)
}

/// True if `score` beats the previously recorded high score
pub fn is_new_high_score(score: u64, previous_high_score: u64) -> bool {
    score > previous_high_score
}

/// Combo depth with its expiry timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComboTracker {
    count: u32,
    /// Remaining time before the combo expires; only meaningful when count > 0
    remaining_ms: u32,
}

impl ComboTracker {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    /// A placement cycle produced its first clear
    pub fn register_clear(&mut self) -> u32 {
        self.count += 1;
        self.remaining_ms = COMBO_TIMEOUT_MS;
        self.count
    }

    /// Advance the timer; returns the expired combo depth if it just ran out
    pub fn tick(&mut self, elapsed_ms: u32) -> Option<u32> {
        if self.count == 0 {
            return None;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        if self.remaining_ms > 0 {
            return None;
        }
        let expired = self.count;
        self.count = 0;
        Some(expired)
    }
}

/// Fever state change reported by [`FeverGauge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeverChange {
    Started,
    Ended,
}

/// Fever gauge and fever mode timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeverGauge {
    gauge: u32,
    active: bool,
    remaining_ms: u32,
    decay_ms: u32,
}

impl FeverGauge {
    pub fn gauge(&self) -> u32 {
        self.gauge
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    /// Gauge gain of one step
    pub fn gain(cells: u32, chain: u32, combo: u32) -> u32 {
        cells * FEVER_PER_CELL + chain * FEVER_PER_CHAIN + combo * FEVER_PER_COMBO
    }

    /// Feed one resolution step; fever starts when the gauge reaches its max
    pub fn add(&mut self, cells: u32, chain: u32, combo: u32) -> Option<FeverChange> {
        if self.active {
            return None;
        }
        self.gauge = (self.gauge + Self::gain(cells, chain, combo)).min(FEVER_GAUGE_MAX);
        if self.gauge < FEVER_GAUGE_MAX {
            return None;
        }
        self.active = true;
        self.remaining_ms = FEVER_DURATION_MS;
        self.decay_ms = 0;
        Some(FeverChange::Started)
    }

    /// Advance fever duration or gauge decay
    pub fn tick(&mut self, elapsed_ms: u32) -> Option<FeverChange> {
        if self.active {
            self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
            if self.remaining_ms == 0 {
                self.active = false;
                self.gauge = 0;
                return Some(FeverChange::Ended);
            }
            return None;
        }
        if self.gauge == 0 {
            self.decay_ms = 0;
            return None;
        }
        self.decay_ms = self.decay_ms.saturating_add(elapsed_ms);
        let points = self.decay_ms / FEVER_DECAY_INTERVAL_MS;
        self.decay_ms %= FEVER_DECAY_INTERVAL_MS;
        self.gauge = self.gauge.saturating_sub(points);
        None
    }
}
