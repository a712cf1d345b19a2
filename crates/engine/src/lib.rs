//! Engine helpers driving the core simulation
//!
//! - [`place`]: reach a target lane/rotation with core commands and hard drop
//! - [`scheduler`]: pace chain steps with a presentation delay
//! - [`autoplay`]: greedy placement search used by the headless runner

pub mod autoplay;
pub mod place;
pub mod scheduler;

pub use autoplay::{choose_placement, play_piece, Weights};
pub use place::{apply_place, PlaceError, Placement};
pub use scheduler::{Advance, Scheduler};
