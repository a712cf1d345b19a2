//! Core game logic module - pure, deterministic, and testable
//!
//! This crate contains the whole simulation: board model, piece spawning and
//! control, fusion detection, special effects, chain resolution, scoring,
//! fever, garbage and objectives. It has **no dependencies** on rendering,
//! input decoding or I/O, making it:
//!
//! - **Deterministic**: the same seed and command sequence produce the same round
//! - **Testable**: every rule is exercised by unit tests
//! - **Portable**: runs headless, behind the JSON adapter, or inside a UI
//!
//! # Module Structure
//!
//! - [`board`]: configurable grid with directional compaction
//! - [`shapes`]: shape catalog (1-8 cells) and pivot rotation with kicks
//! - [`piece`]: falling piece model and independent per-cell settling
//! - [`spawner`]: shape, color and special selection, entry position
//! - [`fusion`]: breadth-first flood fill producing fusion groups
//! - [`effects`]: special effect resolution against one board snapshot
//! - [`chain`]: one detect/resolve/remove/compact step
//! - [`scoring`]: step score, combo timer, fever gauge, level curve
//! - [`garbage`]: timer-driven garbage rows
//! - [`objectives`]: objective tracking and move budgets
//! - [`game_state`]: the engine state machine tying everything together
//!
//! # Game Rules
//!
//! - **Fusion**: 4 or more 4-connected cells of one color (wildcards join any
//!   color) clear together
//! - **Chains**: removals compact the board along gravity; new groups keep
//!   resolving, with a super-linear chain bonus
//! - **Gravity**: one of four directions; pieces enter from the opposite edge
//! - **Hard drop**: every cell settles independently on uneven terrain
//! - **Fever**: a full gauge triples scoring for a fixed duration
//!
//! # Example
//!
//! ```
//! use chroma_fuse_core::GameState;
//! use chroma_fuse_core::types::{Direction, GameCommand, Phase};
//!
//! let mut game = GameState::new(12345);
//! game.start();
//!
//! let _ = game.apply_command(GameCommand::Move(Direction::Right));
//! game.apply_command(GameCommand::HardDrop).unwrap();
//! assert_eq!(game.phase(), Phase::Resolving);
//!
//! game.run_resolution();
//! assert_eq!(game.phase(), Phase::AwaitingInput);
//! ```
//!
//! # Timing
//!
//! The engine has no clock of its own. Call
//! [`GameState::tick`](game_state::GameState::tick) with the elapsed
//! milliseconds; drop cadence, combo timeout, fever and garbage timers all run
//! on that game time.

pub mod board;
pub mod chain;
pub mod config;
pub mod effects;
pub mod error;
pub mod fusion;
pub mod game_state;
pub mod garbage;
pub mod objectives;
pub mod piece;
pub mod rng;
pub mod scoring;
pub mod shapes;
pub mod snapshot;
pub mod spawner;

pub use chroma_fuse_types as types;

// Re-export commonly used types for convenience
pub use board::{Board, Cell};
pub use config::{GameMode, RulesConfig};
pub use error::{CommandError, ConfigError};
pub use fusion::{detect_groups, FusionGroup};
pub use game_state::GameState;
pub use objectives::{Objective, ObjectiveKind, ObjectiveTracker};
pub use piece::{settle_independently, FallingPiece, PieceCell};
pub use rng::{RandomSource, ScriptedRng, SimpleRng};
pub use scoring::{calculate_step_score, is_new_high_score, StepScoreInput};
pub use shapes::{ShapeCatalog, ShapeTemplate};
pub use snapshot::{GameSnapshot, PieceSnapshot};
