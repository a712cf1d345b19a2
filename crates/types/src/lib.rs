//! Core types module - shared data structures and constants
//!
//! This crate defines the fundamental types used throughout the workspace.
//! All types are plain data with no external dependencies, so they can be used
//! by the simulation core, the scheduler, and the JSON adapter alike.
//!
//! # Board Dimensions
//!
//! - **Width**: 8 columns (indexed 0-7)
//! - **Height**: 16 rows (indexed 0-15, row 0 is the top)
//!
//! Coordinates are `(x, y)` with `y` growing downward, so the default gravity
//! vector [`Direction::Down`] is `(0, 1)`.
//!
//! # Timing Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `COMBO_TIMEOUT_MS` | 3000 | Combo decays to zero after this long without a clear |
//! | `FEVER_DURATION_MS` | 8000 | Length of fever mode once the gauge fills |
//! | `FEVER_DECAY_INTERVAL_MS` | 500 | Gauge loses one point per interval outside fever |
//! | `GARBAGE_BASE_INTERVAL_MS` | 30000 | Garbage interval at `GARBAGE_MIN_LEVEL` |
//! | `GARBAGE_MIN_INTERVAL_MS` | 8000 | Garbage interval floor |
//!
//! # Examples
//!
//! ```
//! use chroma_fuse_types::{Color, Direction, GameCommand, SpecialType};
//!
//! assert_eq!(Color::from_str("red"), Some(Color::Red));
//! assert!(Color::Wildcard.connects(Color::Blue));
//! assert_eq!(Direction::Down.vector(), (0, 1));
//! assert_eq!(SpecialType::from_str("colorShift"), Some(SpecialType::ColorShift));
//! assert_eq!(GameCommand::from_str("hardDrop"), Some(GameCommand::HardDrop));
//! ```

/// Default board width in cells
pub const BOARD_WIDTH: u8 = 8;

/// Default board height in cells
pub const BOARD_HEIGHT: u8 = 16;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Minimum size of a connected group for it to fuse. Independent of level.
pub const FUSION_MIN: usize = 4;

/// Hits a frozen cell absorbs before it can be removed.
pub const FROZEN_HITS: u8 = 2;

/// Half-width of the square a bomb clears (1 => 3x3).
pub const BOMB_RADIUS: i8 = 1;

/// Largest piece the shape catalog carries.
pub const MAX_PIECE_CELLS: usize = 8;

/// Number of upcoming pieces kept for preview.
pub const NEXT_QUEUE_LEN: usize = 3;

/// Horizontal offsets tried, in order, when an in-place rotation is blocked.
pub const KICK_OFFSETS: [i8; 4] = [1, -1, 2, -2];

/// Combo decays to zero if no clear happens within this window.
pub const COMBO_TIMEOUT_MS: u32 = 3000;

/// Fever gauge capacity; reaching it activates fever mode.
pub const FEVER_GAUGE_MAX: u32 = 100;

/// Fever mode duration.
pub const FEVER_DURATION_MS: u32 = 8000;

/// Outside fever mode the gauge loses one point per interval.
pub const FEVER_DECAY_INTERVAL_MS: u32 = 500;

/// Score multiplier applied while fever mode is active.
pub const FEVER_SCORE_MULTIPLIER: u64 = 3;

/// Fever gauge gained per cleared cell.
pub const FEVER_PER_CELL: u32 = 2;

/// Fever gauge gained per chain index of a step.
pub const FEVER_PER_CHAIN: u32 = 10;

/// Fever gauge gained per combo depth of a step.
pub const FEVER_PER_COMBO: u32 = 5;

/// Base points per cleared cell.
pub const BLOCK_POINTS: u64 = 10;

/// Exponent of the chain term; above 2 so deep cascades dominate.
pub const CHAIN_EXPONENT: f64 = 2.5;

/// Bonus per level for a step that leaves the board empty.
pub const PERFECT_CLEAR_BONUS: u64 = 5000;

/// Upper bound on the product of multiplier cells in one step.
pub const MULTIPLIER_CAP: u32 = 8;

/// A special piece is forced if this many placements went by without one.
pub const SPECIAL_GUARANTEE_INTERVAL: u32 = 10;

/// Garbage injection is active from this level on.
pub const GARBAGE_MIN_LEVEL: u32 = 5;

/// Garbage interval at `GARBAGE_MIN_LEVEL`.
pub const GARBAGE_BASE_INTERVAL_MS: u32 = 30_000;

/// Interval shrink per level above `GARBAGE_MIN_LEVEL`.
pub const GARBAGE_INTERVAL_STEP_MS: u32 = 2_000;

/// Garbage interval floor.
pub const GARBAGE_MIN_INTERVAL_MS: u32 = 8_000;

/// Maximum number of queued garbage rows.
pub const GARBAGE_MAX_PENDING: u8 = 4;

/// Chance (per mille) that a garbage row carries one stone cell.
pub const GARBAGE_STONE_PER_MILLE: u32 = 150;

/// Cleared cells needed per level in endless mode.
pub const LEVEL_UP_BLOCKS: u32 = 40;

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 20;

/// Drop intervals by level (milliseconds per step), index 0 = level 1
pub const DROP_INTERVALS: [u32; 10] = [1000, 850, 720, 610, 520, 440, 370, 310, 260, 220];

/// Drop interval floor beyond the table
pub const DROP_INTERVAL_FLOOR_MS: u32 = 180;

/// Board coordinate `(x, y)`.
pub type Pos = (i8, i8);

/// Cell colors: a fixed palette plus the wildcard.
///
/// The wildcard connects to every other color during fusion detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Cyan,
    Pink,
    Wildcard,
}

/// The palette in activation order. A level with palette size `n` uses the first `n`.
pub const PALETTE: [Color; 8] = [
    Color::Red,
    Color::Blue,
    Color::Green,
    Color::Yellow,
    Color::Purple,
    Color::Orange,
    Color::Cyan,
    Color::Pink,
];

impl Color {
    /// Whether two colors connect for flood-fill purposes.
    pub fn connects(self, other: Color) -> bool {
        self == other || self == Color::Wildcard || other == Color::Wildcard
    }

    pub fn is_wildcard(self) -> bool {
        self == Color::Wildcard
    }

    /// Parse color from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "red" => Some(Color::Red),
            "blue" => Some(Color::Blue),
            "green" => Some(Color::Green),
            "yellow" => Some(Color::Yellow),
            "purple" => Some(Color::Purple),
            "orange" => Some(Color::Orange),
            "cyan" => Some(Color::Cyan),
            "pink" => Some(Color::Pink),
            "wildcard" | "rainbow" => Some(Color::Wildcard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Purple => "purple",
            Color::Orange => "orange",
            Color::Cyan => "cyan",
            Color::Pink => "pink",
            Color::Wildcard => "wildcard",
        }
    }

    /// Compact numeric code used by grid snapshots (0 is reserved for empty).
    pub fn code(&self) -> u8 {
        match self {
            Color::Red => 1,
            Color::Blue => 2,
            Color::Green => 3,
            Color::Yellow => 4,
            Color::Purple => 5,
            Color::Orange => 6,
            Color::Cyan => 7,
            Color::Pink => 8,
            Color::Wildcard => 9,
        }
    }
}

/// Special block behaviors
///
/// Only the primary (first) cell of a falling piece carries a special type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialType {
    Normal,
    /// Clears a square around itself
    Bomb,
    /// Clears every cell of its color
    Lightning,
    /// Clears its row and column
    Cross,
    /// Absorbs hits before it can be removed
    Frozen,
    /// Never fuses; breaks when a neighbour is removed
    Stone,
    /// Multiplies the score of its step
    Multiplier,
    /// Recolors its neighbours at random
    Shuffle,
    /// Recolors its neighbours to its own color
    ColorShift,
}

impl SpecialType {
    pub fn is_special(&self) -> bool {
        !matches!(self, SpecialType::Normal)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(SpecialType::Normal),
            "bomb" => Some(SpecialType::Bomb),
            "lightning" => Some(SpecialType::Lightning),
            "cross" => Some(SpecialType::Cross),
            "frozen" => Some(SpecialType::Frozen),
            "stone" => Some(SpecialType::Stone),
            "multiplier" => Some(SpecialType::Multiplier),
            "shuffle" => Some(SpecialType::Shuffle),
            "colorshift" => Some(SpecialType::ColorShift),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialType::Normal => "normal",
            SpecialType::Bomb => "bomb",
            SpecialType::Lightning => "lightning",
            SpecialType::Cross => "cross",
            SpecialType::Frozen => "frozen",
            SpecialType::Stone => "stone",
            SpecialType::Multiplier => "multiplier",
            SpecialType::Shuffle => "shuffle",
            SpecialType::ColorShift => "colorShift",
        }
    }
}

/// Gravity and movement directions
///
/// Gravity is one of four fixed unit vectors. Pieces enter from the edge
/// opposite to the gravity direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Down,
    Up,
    Left,
    Right,
}

impl Direction {
    /// Unit vector `(dx, dy)` for this direction
    ///
    /// ```
    /// use chroma_fuse_types::Direction;
    ///
    /// assert_eq!(Direction::Up.vector(), (0, -1));
    /// assert_eq!(Direction::Right.vector(), (1, 0));
    /// ```
    pub fn vector(&self) -> (i8, i8) {
        match self {
            Direction::Down => (0, 1),
            Direction::Up => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// True for `Down`/`Up`, where lines of compaction are columns.
    pub fn is_vertical(&self) -> bool {
        matches!(self, Direction::Down | Direction::Up)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "down" | "d" => Some(Direction::Down),
            "up" | "u" => Some(Direction::Up),
            "left" | "l" => Some(Direction::Left),
            "right" | "r" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Commands accepted by the engine
///
/// These are used by the adapter protocol, the autoplay planner and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    /// Spawn the next piece when none is active
    Spawn,
    /// Translate the active piece one cell
    Move(Direction),
    /// Rotate the active piece 90° clockwise
    Rotate,
    /// Step along gravity, locking when blocked
    SoftDrop,
    /// Settle every cell independently and lock
    HardDrop,
    /// Swap the primary cell with the hold slot
    Hold,
    /// Change the gravity vector
    SetGravity(Direction),
    Pause,
    Resume,
    /// Restart the round with the same seed
    Restart,
}

impl GameCommand {
    /// Parse a command from its camelCase protocol name
    ///
    /// ```
    /// use chroma_fuse_types::{Direction, GameCommand};
    ///
    /// assert_eq!(GameCommand::from_str("moveLeft"), Some(GameCommand::Move(Direction::Left)));
    /// assert_eq!(GameCommand::from_str("gravityUp"), Some(GameCommand::SetGravity(Direction::Up)));
    /// assert_eq!(GameCommand::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "spawn" => Some(GameCommand::Spawn),
            "moveleft" => Some(GameCommand::Move(Direction::Left)),
            "moveright" => Some(GameCommand::Move(Direction::Right)),
            "moveup" => Some(GameCommand::Move(Direction::Up)),
            "movedown" => Some(GameCommand::Move(Direction::Down)),
            "rotate" | "rotatecw" => Some(GameCommand::Rotate),
            "softdrop" => Some(GameCommand::SoftDrop),
            "harddrop" => Some(GameCommand::HardDrop),
            "hold" => Some(GameCommand::Hold),
            "gravitydown" => Some(GameCommand::SetGravity(Direction::Down)),
            "gravityup" => Some(GameCommand::SetGravity(Direction::Up)),
            "gravityleft" => Some(GameCommand::SetGravity(Direction::Left)),
            "gravityright" => Some(GameCommand::SetGravity(Direction::Right)),
            "pause" => Some(GameCommand::Pause),
            "resume" => Some(GameCommand::Resume),
            "restart" => Some(GameCommand::Restart),
            _ => None,
        }
    }

    /// Convert to camelCase string for the protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            GameCommand::Spawn => "spawn",
            GameCommand::Move(Direction::Left) => "moveLeft",
            GameCommand::Move(Direction::Right) => "moveRight",
            GameCommand::Move(Direction::Up) => "moveUp",
            GameCommand::Move(Direction::Down) => "moveDown",
            GameCommand::Rotate => "rotate",
            GameCommand::SoftDrop => "softDrop",
            GameCommand::HardDrop => "hardDrop",
            GameCommand::Hold => "hold",
            GameCommand::SetGravity(Direction::Down) => "gravityDown",
            GameCommand::SetGravity(Direction::Up) => "gravityUp",
            GameCommand::SetGravity(Direction::Left) => "gravityLeft",
            GameCommand::SetGravity(Direction::Right) => "gravityRight",
            GameCommand::Pause => "pause",
            GameCommand::Resume => "resume",
            GameCommand::Restart => "restart",
        }
    }
}

/// Engine phase
///
/// Replaces a boolean "busy" flag: each command checks the phase it needs,
/// so overlapping transitions (e.g. moving during a resolution) are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Round not started
    Idle,
    /// Waiting for the next piece to be spawned
    Spawning,
    /// A piece is falling and accepts commands
    AwaitingInput,
    /// A lock is being resolved; commands and the drop timer are gated
    Resolving,
    /// Terminal: the round was lost
    GameOver,
    /// Terminal: every objective was completed
    RoundWon,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::GameOver | Phase::RoundWon)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Spawning => "spawning",
            Phase::AwaitingInput => "awaitingInput",
            Phase::Resolving => "resolving",
            Phase::GameOver => "gameOver",
            Phase::RoundWon => "roundWon",
        }
    }
}

/// Why a round was lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOverReason {
    /// The entry cells of the next piece were occupied
    SpawnBlocked,
    /// A garbage shift pushed cells into the spawn edge
    GarbageOverflow,
    /// Puzzle mode ran out of moves before completing its objectives
    MovesExhausted,
}

impl GameOverReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOverReason::SpawnBlocked => "spawnBlocked",
            GameOverReason::GarbageOverflow => "garbageOverflow",
            GameOverReason::MovesExhausted => "movesExhausted",
        }
    }
}

/// Terminal signal of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    GameOver(GameOverReason),
    RoundWon,
}

/// A special effect that fired during a resolution step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectTrigger {
    pub special: SpecialType,
    pub x: i8,
    pub y: i8,
}

/// A cell removed during a resolution step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearedCell {
    pub x: i8,
    pub y: i8,
    pub color: Color,
    pub special: SpecialType,
}

/// Outcome of one chain-orchestrator iteration, for animation/audio hooks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepEvent {
    /// 1-based chain index within the current placement cycle
    pub chain_index: u32,
    /// Number of fusion groups detected in this step
    pub groups: u32,
    /// Cells removed (positions are pre-compaction)
    pub cleared: Vec<ClearedCell>,
    /// Special effects that fired
    pub effects: Vec<EffectTrigger>,
    /// Frozen cells that absorbed a hit and stayed
    pub frozen_hits: Vec<Pos>,
    /// Score awarded for this step
    pub score: u64,
    /// Product of multiplier cells in the step
    pub multiplier: u32,
    /// Combo depth used for scoring
    pub combo: u32,
    pub perfect_clear: bool,
    pub fever_active: bool,
}

/// Engine event stream consumed by presentation layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A piece became part of the board
    Locked { cells: u32 },
    /// One chain-reaction step resolved
    Step(StepEvent),
    /// The resolution cycle of a lock finished
    ResolutionFinished { chain: u32, cleared: u32 },
    /// Garbage rows were pushed in from the far edge
    GarbageInjected { rows: u8 },
    FeverStarted,
    FeverEnded,
    ComboExpired { combo: u32 },
    LevelUp { level: u32 },
    ObjectiveCompleted { index: usize },
    GameOver(GameOverReason),
    RoundWon,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_connects_to_everything() {
        for color in PALETTE {
            assert!(Color::Wildcard.connects(color));
            assert!(color.connects(Color::Wildcard));
        }
        assert!(!Color::Red.connects(Color::Blue));
    }

    #[test]
    fn direction_opposites_cancel() {
        for dir in [Direction::Down, Direction::Up, Direction::Left, Direction::Right] {
            let (ax, ay) = dir.vector();
            let (bx, by) = dir.opposite().vector();
            assert_eq!((ax + bx, ay + by), (0, 0));
        }
    }

    #[test]
    fn command_names_roundtrip() {
        for cmd in [
            GameCommand::Spawn,
            GameCommand::Move(Direction::Left),
            GameCommand::Move(Direction::Right),
            GameCommand::Rotate,
            GameCommand::SoftDrop,
            GameCommand::HardDrop,
            GameCommand::Hold,
            GameCommand::SetGravity(Direction::Left),
            GameCommand::Pause,
            GameCommand::Resume,
            GameCommand::Restart,
        ] {
            assert_eq!(GameCommand::from_str(cmd.as_str()), Some(cmd));
        }
    }

    #[test]
    fn special_names_roundtrip() {
        for special in [
            SpecialType::Normal,
            SpecialType::Bomb,
            SpecialType::Lightning,
            SpecialType::Cross,
            SpecialType::Frozen,
            SpecialType::Stone,
            SpecialType::Multiplier,
            SpecialType::Shuffle,
            SpecialType::ColorShift,
        ] {
            assert_eq!(SpecialType::from_str(special.as_str()), Some(special));
        }
    }
}
