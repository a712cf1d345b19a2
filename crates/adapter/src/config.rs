//! Session configuration
//!
//! Rules are loaded from a JSON rules file into [`RulesConfig`]. Every field
//! is optional and falls back to the core defaults.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CHROMA_FUSE_SEED` | 1 | RNG seed of the session |
//! | `CHROMA_FUSE_CONFIG` | unset | Path of a JSON rules file |
//! | `CHROMA_FUSE_STEP_DELAY_MS` | from rules | Override of the chain step delay |
//!
//! # Rules File
//!
//! ```json
//! {
//!   "width": 8,
//!   "height": 16,
//!   "mode": "puzzle",
//!   "moves": 12,
//!   "objectives": [{ "kind": "colorCleared", "target": 20, "color": "red" }],
//!   "shapes": [{ "name": "bar", "cells": [[0, 0], [1, 0]] }]
//! }
//! ```

use std::path::Path;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use chroma_fuse_core::shapes::{ShapeCatalog, ShapeTemplate};
use chroma_fuse_core::types::Color;
use chroma_fuse_core::{GameMode, Objective, ObjectiveKind, RulesConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesFile {
    pub width: Option<u8>,
    pub height: Option<u8>,
    /// `endless`, `objective` or `puzzle`
    pub mode: Option<String>,
    /// Move budget, required for `puzzle`
    pub moves: Option<u32>,
    #[serde(rename = "startLevel", alias = "start_level")]
    pub start_level: Option<u32>,
    #[serde(rename = "pieceSizeCurve", alias = "piece_size_curve")]
    pub piece_size_curve: Option<Vec<u8>>,
    #[serde(rename = "paletteSizeCurve", alias = "palette_size_curve")]
    pub palette_size_curve: Option<Vec<u8>>,
    #[serde(rename = "specialGuaranteeInterval", alias = "special_guarantee_interval")]
    pub special_guarantee_interval: Option<u32>,
    #[serde(rename = "specialBasePerMille", alias = "special_base_per_mille")]
    pub special_base_per_mille: Option<u32>,
    #[serde(rename = "wildcardPerMille", alias = "wildcard_per_mille")]
    pub wildcard_per_mille: Option<u32>,
    #[serde(rename = "garbageMinLevel", alias = "garbage_min_level")]
    pub garbage_min_level: Option<u32>,
    #[serde(rename = "autoSpawn", alias = "auto_spawn")]
    pub auto_spawn: Option<bool>,
    #[serde(rename = "chainStepDelayMs", alias = "chain_step_delay_ms")]
    pub chain_step_delay_ms: Option<u32>,
    pub objectives: Option<Vec<ObjectiveFile>>,
    pub shapes: Option<Vec<ShapeFile>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveFile {
    pub kind: String,
    pub target: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeFile {
    pub name: String,
    pub cells: Vec<[i8; 2]>,
}

impl ObjectiveFile {
    fn to_objective(&self) -> anyhow::Result<Objective> {
        let kind = ObjectiveKind::from_str(&self.kind)
            .ok_or_else(|| anyhow!("unknown objective kind '{}'", self.kind))?;
        let color = match &self.color {
            Some(name) => {
                Some(Color::from_str(name).ok_or_else(|| anyhow!("unknown color '{}'", name))?)
            }
            None => None,
        };
        Ok(Objective {
            color,
            ..Objective::new(kind, self.target)
        })
    }
}

impl RulesFile {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("malformed rules file")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rules file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Apply the file on top of the default rules and validate the result
    pub fn into_config(self) -> anyhow::Result<RulesConfig> {
        let mut config = RulesConfig::default();

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(mode) = self.mode.as_deref() {
            config.mode = parse_mode(mode, self.moves)?;
        }
        if let Some(level) = self.start_level {
            config.start_level = level;
        }
        if let Some(curve) = self.piece_size_curve {
            config.piece_size_curve = curve;
        }
        if let Some(curve) = self.palette_size_curve {
            config.palette_size_curve = curve;
        }
        if let Some(interval) = self.special_guarantee_interval {
            config.special_guarantee_interval = interval;
        }
        if let Some(chance) = self.special_base_per_mille {
            config.special_base_per_mille = chance;
        }
        if let Some(chance) = self.wildcard_per_mille {
            config.wildcard_per_mille = chance;
        }
        if let Some(level) = self.garbage_min_level {
            config.garbage_min_level = level;
        }
        if let Some(auto_spawn) = self.auto_spawn {
            config.auto_spawn = auto_spawn;
        }
        if let Some(delay) = self.chain_step_delay_ms {
            config.chain_step_delay_ms = delay;
        }
        if let Some(objectives) = &self.objectives {
            config.objectives = Some(
                objectives
                    .iter()
                    .map(ObjectiveFile::to_objective)
                    .collect::<anyhow::Result<_>>()?,
            );
        }
        if let Some(shapes) = self.shapes {
            let templates = shapes
                .into_iter()
                .map(|s| ShapeTemplate::new(s.name, s.cells.iter().map(|&[x, y]| (x, y)).collect()))
                .collect();
            config.shapes = ShapeCatalog::new(templates)?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse a mode name; `puzzle` needs a move budget
pub fn parse_mode(name: &str, moves: Option<u32>) -> anyhow::Result<GameMode> {
    match name.to_lowercase().as_str() {
        "endless" => Ok(GameMode::Endless),
        "objective" => Ok(GameMode::Objective),
        "puzzle" => {
            let moves = moves.ok_or_else(|| anyhow!("puzzle mode needs a move budget"))?;
            if moves == 0 {
                return Err(anyhow!("puzzle move budget must be positive"));
            }
            Ok(GameMode::Puzzle { moves })
        }
        other => Err(anyhow!("unknown mode '{}'", other)),
    }
}

/// Everything a session needs to start a round
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub seed: u32,
    pub rules: RulesConfig,
    /// Emit `event` messages for every engine event
    pub stream_events: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            rules: RulesConfig::default(),
            stream_events: true,
        }
    }
}

impl SessionConfig {
    /// Create from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        use std::env;

        let seed = match env::var("CHROMA_FUSE_SEED") {
            Ok(s) => s
                .trim()
                .parse()
                .with_context(|| format!("CHROMA_FUSE_SEED is not a number: '{}'", s))?,
            Err(_) => 1,
        };

        let rules = match env::var("CHROMA_FUSE_CONFIG")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            Some(path) => RulesFile::load(path)?.into_config()?,
            None => RulesConfig::default(),
        };

        let mut config = Self {
            seed,
            rules,
            ..Self::default()
        };
        if let Some(delay) = env::var("CHROMA_FUSE_STEP_DELAY_MS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            config.rules.chain_step_delay_ms = delay;
        }
        Ok(config)
    }
}
