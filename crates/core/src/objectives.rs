//! Objective tracking
//!
//! Objectives are updated once per resolution step with that step's
//! contribution. A round is won when every objective of a non-empty list is
//! complete. Puzzle mode also carries a move budget; running out before
//! completion loses the round.

use crate::error::ConfigError;
use crate::types::{Color, StepEvent};

/// What an objective counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectiveKind {
    /// Total points scored
    Score,
    /// Cells cleared
    BlocksCleared,
    /// Deepest chain index reached in one cycle
    ChainReached,
    /// Cells of the objective's color cleared
    ColorCleared,
    /// Special cells cleared
    SpecialsCleared,
}

impl ObjectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveKind::Score => "score",
            ObjectiveKind::BlocksCleared => "blocksCleared",
            ObjectiveKind::ChainReached => "chainReached",
            ObjectiveKind::ColorCleared => "colorCleared",
            ObjectiveKind::SpecialsCleared => "specialsCleared",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "score" => Some(ObjectiveKind::Score),
            "blockscleared" => Some(ObjectiveKind::BlocksCleared),
            "chainreached" => Some(ObjectiveKind::ChainReached),
            "colorcleared" => Some(ObjectiveKind::ColorCleared),
            "specialscleared" => Some(ObjectiveKind::SpecialsCleared),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Objective {
    pub kind: ObjectiveKind,
    pub target: u64,
    pub current: u64,
    /// Required for `ColorCleared`, ignored otherwise
    pub color: Option<Color>,
    pub completed: bool,
}

impl Objective {
    pub fn new(kind: ObjectiveKind, target: u64) -> Self {
        Self {
            kind,
            target,
            current: 0,
            color: None,
            completed: false,
        }
    }

    pub fn color_cleared(color: Color, target: u64) -> Self {
        Self {
            color: Some(color),
            ..Self::new(ObjectiveKind::ColorCleared, target)
        }
    }

    /// Contribution of one resolution step to this objective
    fn contribution(&self, step: &StepEvent) -> u64 {
        match self.kind {
            ObjectiveKind::Score => step.score,
            ObjectiveKind::BlocksCleared => step.cleared.len() as u64,
            ObjectiveKind::ChainReached => step.chain_index as u64,
            ObjectiveKind::ColorCleared => step
                .cleared
                .iter()
                .filter(|c| Some(c.color) == self.color)
                .count() as u64,
            ObjectiveKind::SpecialsCleared => step
                .cleared
                .iter()
                .filter(|c| c.special.is_special())
                .count() as u64,
        }
    }

    /// Apply a step; returns true if the objective just became complete
    fn record(&mut self, step: &StepEvent) -> bool {
        if self.completed {
            return false;
        }
        let amount = self.contribution(step);
        self.current = match self.kind {
            ObjectiveKind::ChainReached => self.current.max(amount),
            _ => self.current.saturating_add(amount),
        };
        if self.current >= self.target {
            self.completed = true;
            return true;
        }
        false
    }
}

/// Objective list of the current round plus the optional move budget
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectiveTracker {
    objectives: Vec<Objective>,
    moves_left: Option<u32>,
}

impl ObjectiveTracker {
    /// Validate and start tracking `objectives` with fresh counters
    pub fn new(objectives: Vec<Objective>, move_budget: Option<u32>) -> Result<Self, ConfigError> {
        validate_objectives(&objectives)?;
        Ok(Self {
            objectives: objectives
                .into_iter()
                .map(|o| Objective {
                    current: 0,
                    completed: false,
                    ..o
                })
                .collect(),
            moves_left: move_budget,
        })
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn moves_left(&self) -> Option<u32> {
        self.moves_left
    }

    /// Apply one step to every objective; returns indices that just completed
    pub fn record_step(&mut self, step: &StepEvent) -> Vec<usize> {
        self.objectives
            .iter_mut()
            .enumerate()
            .filter_map(|(i, o)| o.record(step).then_some(i))
            .collect()
    }

    /// Consume one move of the budget (no-op without a budget)
    pub fn spend_move(&mut self) {
        if let Some(m) = self.moves_left.as_mut() {
            *m = m.saturating_sub(1);
        }
    }

    /// True when there is at least one objective and all are complete
    pub fn all_complete(&self) -> bool {
        !self.objectives.is_empty() && self.objectives.iter().all(|o| o.completed)
    }

    pub fn moves_exhausted(&self) -> bool {
        self.moves_left == Some(0)
    }
}

/// Reject zero targets and color objectives without a color
pub fn validate_objectives(objectives: &[Objective]) -> Result<(), ConfigError> {
    for (index, o) in objectives.iter().enumerate() {
        if o.target == 0 {
            return Err(ConfigError::InvalidObjective {
                index,
                reason: "target must be positive",
            });
        }
        if o.kind == ObjectiveKind::ColorCleared && o.color.is_none() {
            return Err(ConfigError::InvalidObjective {
                index,
                reason: "color objective without a color",
            });
        }
    }
    Ok(())
}

/// Default objectives for a level
///
/// Targets scale with the level; the color objective rotates through the
/// colors active at that level.
pub fn objectives_for_level(level: u32, palette: &[Color]) -> Vec<Objective> {
    let level = level.max(1) as u64;
    let mut out = vec![
        Objective::new(ObjectiveKind::Score, 2_000 * level),
        Objective::new(ObjectiveKind::BlocksCleared, 20 + 8 * level),
    ];
    if level >= 2 {
        out.push(Objective::new(ObjectiveKind::ChainReached, (1 + level / 2).min(5)));
    }
    if level >= 3 {
        if let Some(&color) = palette.get(level as usize % palette.len().max(1)) {
            out.push(Objective::color_cleared(color, 8 + 2 * level));
        }
    }
    if level >= 4 {
        out.push(Objective::new(ObjectiveKind::SpecialsCleared, level / 2));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClearedCell, SpecialType};

    fn step(chain_index: u32, score: u64, cleared: &[(Color, SpecialType)]) -> StepEvent {
        StepEvent {
            chain_index,
            score,
            cleared: cleared
                .iter()
                .map(|&(color, special)| ClearedCell {
                    x: 0,
                    y: 0,
                    color,
                    special,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_counters_accumulate_per_step() {
        let mut tracker = ObjectiveTracker::new(
            vec![
                Objective::new(ObjectiveKind::Score, 100),
                Objective::new(ObjectiveKind::BlocksCleared, 6),
                Objective::color_cleared(Color::Red, 3),
                Objective::new(ObjectiveKind::SpecialsCleared, 1),
            ],
            None,
        )
        .unwrap();

        let four_red = [(Color::Red, SpecialType::Normal); 4];
        assert!(tracker.record_step(&step(1, 60, &four_red)).contains(&2));
        assert!(!tracker.all_complete());

        let done = tracker.record_step(&step(
            2,
            60,
            &[
                (Color::Blue, SpecialType::Bomb),
                (Color::Blue, SpecialType::Normal),
            ],
        ));
        assert_eq!(done, vec![0, 1, 3]);
        assert!(tracker.all_complete());
    }

    #[test]
    fn test_chain_objective_tracks_maximum() {
        let mut tracker =
            ObjectiveTracker::new(vec![Objective::new(ObjectiveKind::ChainReached, 3)], None)
                .unwrap();
        tracker.record_step(&step(2, 0, &[]));
        tracker.record_step(&step(1, 0, &[]));
        assert_eq!(tracker.objectives()[0].current, 2);
        tracker.record_step(&step(3, 0, &[]));
        assert!(tracker.all_complete());
    }

    #[test]
    fn test_move_budget() {
        let mut tracker =
            ObjectiveTracker::new(vec![Objective::new(ObjectiveKind::Score, 10)], Some(2)).unwrap();
        tracker.spend_move();
        assert!(!tracker.moves_exhausted());
        tracker.spend_move();
        assert!(tracker.moves_exhausted());
        tracker.spend_move();
        assert_eq!(tracker.moves_left(), Some(0));
    }

    #[test]
    fn test_empty_list_is_never_complete() {
        let tracker = ObjectiveTracker::default();
        assert!(!tracker.all_complete());
    }

    #[test]
    fn test_validation() {
        let zero = vec![Objective::new(ObjectiveKind::Score, 0)];
        assert!(ObjectiveTracker::new(zero, None).is_err());

        let colorless = vec![Objective::new(ObjectiveKind::ColorCleared, 5)];
        assert_eq!(
            validate_objectives(&colorless),
            Err(ConfigError::InvalidObjective {
                index: 0,
                reason: "color objective without a color",
            })
        );
    }

    #[test]
    fn test_generator_is_valid_for_all_levels() {
        let palette = [Color::Red, Color::Blue, Color::Green];
        for level in 1..=20 {
            let objectives = objectives_for_level(level, &palette);
            assert!(validate_objectives(&objectives).is_ok());
            assert!(objectives.len() >= 2);
        }
    }
}
