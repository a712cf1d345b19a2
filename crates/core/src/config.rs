//! Rules configuration
//!
//! Pure data supplied by the environment: board size, level curves, spawn
//! probabilities and the game mode. The engine reads it and never mutates it.
//! [`RulesConfig::validate`] must pass before a round starts.

use crate::error::ConfigError;
use crate::objectives::{validate_objectives, Objective};
use crate::shapes::ShapeCatalog;
use crate::types::{
    Color, BOARD_HEIGHT, BOARD_WIDTH, GARBAGE_MIN_LEVEL, MAX_LEVEL, MAX_PIECE_CELLS, PALETTE,
    SPECIAL_GUARANTEE_INTERVAL,
};

/// Round objective structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameMode {
    /// No objectives; the level rises with cleared cells
    #[default]
    Endless,
    /// Generated objectives for the starting level
    Objective,
    /// Objectives plus a fixed move budget
    Puzzle { moves: u32 },
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Endless => "endless",
            GameMode::Objective => "objective",
            GameMode::Puzzle { .. } => "puzzle",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RulesConfig {
    pub width: u8,
    pub height: u8,
    pub mode: GameMode,
    pub start_level: u32,
    /// Piece cell count per level, index 0 = level 1; the last entry repeats
    pub piece_size_curve: Vec<u8>,
    /// Active palette size per level, index 0 = level 1; the last entry repeats
    pub palette_size_curve: Vec<u8>,
    /// Special chance at level 1 (per mille)
    pub special_base_per_mille: u32,
    /// Added special chance per level above 1 (per mille)
    pub special_per_level_per_mille: u32,
    pub special_max_per_mille: u32,
    pub special_guarantee_interval: u32,
    /// Chance that a generated cell is the wildcard (per mille)
    pub wildcard_per_mille: u32,
    pub wildcard_min_level: u32,
    pub garbage_min_level: u32,
    /// Spawn the next piece as soon as a resolution cycle ends
    pub auto_spawn: bool,
    /// Presentation pause between chain steps; never changes results
    pub chain_step_delay_ms: u32,
    /// Explicit objectives; `None` uses the level generator
    pub objectives: Option<Vec<Objective>>,
    pub shapes: ShapeCatalog,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            mode: GameMode::Endless,
            start_level: 1,
            piece_size_curve: vec![1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8],
            palette_size_curve: vec![3, 3, 4, 4, 5, 5, 6],
            special_base_per_mille: 50,
            special_per_level_per_mille: 10,
            special_max_per_mille: 300,
            special_guarantee_interval: SPECIAL_GUARANTEE_INTERVAL,
            wildcard_per_mille: 20,
            wildcard_min_level: 3,
            garbage_min_level: GARBAGE_MIN_LEVEL,
            auto_spawn: true,
            chain_step_delay_ms: 300,
            objectives: None,
            shapes: ShapeCatalog::standard(),
        }
    }
}

fn curve_at(curve: &[u8], level: u32) -> u8 {
    let idx = (level.max(1) - 1) as usize;
    curve
        .get(idx)
        .or_else(|| curve.last())
        .copied()
        .unwrap_or(1)
}

impl RulesConfig {
    /// Cell count of pieces spawned at `level`
    pub fn piece_cells(&self, level: u32) -> usize {
        curve_at(&self.piece_size_curve, level) as usize
    }

    /// Colors active at `level`
    pub fn palette(&self, level: u32) -> &'static [Color] {
        let n = (curve_at(&self.palette_size_curve, level) as usize).clamp(1, PALETTE.len());
        &PALETTE[..n]
    }

    /// Special piece chance at `level` (per mille)
    pub fn special_chance(&self, level: u32) -> u32 {
        let extra = self.special_per_level_per_mille * level.saturating_sub(1);
        (self.special_base_per_mille + extra).min(self.special_max_per_mille)
    }

    /// Move budget of the mode, if any
    pub fn move_budget(&self) -> Option<u32> {
        match self.mode {
            GameMode::Puzzle { moves } => Some(moves),
            _ => None,
        }
    }

    /// Check dimensions, curves, shapes and objectives
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 4 || self.height < 4 || self.width > 64 || self.height > 64 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.piece_size_curve.is_empty()
            || self
                .piece_size_curve
                .iter()
                .any(|&n| n == 0 || n as usize > MAX_PIECE_CELLS)
        {
            return Err(ConfigError::InvalidCurve {
                name: "piece_size_curve",
            });
        }
        if self.palette_size_curve.is_empty()
            || self
                .palette_size_curve
                .iter()
                .any(|&n| n == 0 || n as usize > PALETTE.len())
        {
            return Err(ConfigError::InvalidCurve {
                name: "palette_size_curve",
            });
        }
        if self.start_level == 0 || self.start_level > MAX_LEVEL {
            return Err(ConfigError::InvalidCurve {
                name: "start_level",
            });
        }
        for &n in &self.piece_size_curve {
            self.shapes.require(n as usize)?;
        }
        if let Some(objectives) = &self.objectives {
            validate_objectives(objectives)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objectives::ObjectiveKind;
    use crate::shapes::ShapeTemplate;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RulesConfig::default().validate().is_ok());
    }

    #[test]
    fn test_curves_repeat_last_entry() {
        let config = RulesConfig::default();
        assert_eq!(config.piece_cells(1), 1);
        assert_eq!(config.piece_cells(6), 4);
        assert_eq!(config.piece_cells(14), 8);
        assert_eq!(config.piece_cells(40), 8);
        assert_eq!(config.palette(1).len(), 3);
        assert_eq!(config.palette(99).len(), 6);
    }

    #[test]
    fn test_special_chance_is_capped() {
        let config = RulesConfig::default();
        assert_eq!(config.special_chance(1), 50);
        assert_eq!(config.special_chance(3), 70);
        assert_eq!(config.special_chance(100), 300);
    }

    #[test]
    fn test_validate_rejects_missing_shapes() {
        let config = RulesConfig {
            shapes: ShapeCatalog::new(vec![ShapeTemplate::new("mono", vec![(0, 0)])]).unwrap(),
            ..RulesConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingShapes { cells: 2 })
        );
    }

    #[test]
    fn test_validate_rejects_bad_objectives_and_sizes() {
        let config = RulesConfig {
            objectives: Some(vec![Objective::new(ObjectiveKind::ColorCleared, 4)]),
            ..RulesConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidObjective { index: 0, .. })
        ));

        let config = RulesConfig {
            width: 2,
            ..RulesConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RulesConfig {
            piece_size_curve: vec![9],
            ..RulesConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
