use crate::objectives::Objective;
use crate::piece::{FallingPiece, PieceCell};
use crate::types::{Color, Direction, Outcome, Phase, Pos, SpecialType};

/// One cell of a piece snapshot; absolute for the active piece, relative for previews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceCellSnapshot {
    pub x: i8,
    pub y: i8,
    pub color: Color,
    pub special: SpecialType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PieceSnapshot {
    pub shape: String,
    pub x: i8,
    pub y: i8,
    pub cells: Vec<PieceCellSnapshot>,
}

impl PieceSnapshot {
    /// Cells at board positions
    pub fn absolute(piece: &FallingPiece) -> Self {
        Self::build(piece, true)
    }

    /// Cells at offsets from the pivot
    pub fn relative(piece: &FallingPiece) -> Self {
        Self::build(piece, false)
    }

    fn build(piece: &FallingPiece, absolute: bool) -> Self {
        let (bx, by) = if absolute { (piece.x, piece.y) } else { (0, 0) };
        Self {
            shape: piece.shape.clone(),
            x: bx,
            y: by,
            cells: piece
                .cells
                .iter()
                .zip(piece.offsets.iter())
                .map(|(cell, &(dx, dy))| PieceCellSnapshot {
                    x: bx + dx,
                    y: by + dy,
                    color: cell.color,
                    special: cell.special,
                })
                .collect(),
        }
    }
}

/// A settled cell with a non-normal special
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecialCellSnapshot {
    pub x: i8,
    pub y: i8,
    pub special: SpecialType,
    pub frozen_count: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimersSnapshot {
    pub drop_ms: u32,
    pub combo_ms: u32,
    pub fever_ms: u32,
    pub garbage_ms: u32,
}

/// Read-only view of the whole engine state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub width: u8,
    pub height: u8,
    /// Row-major color codes, 0 = empty
    pub board: Vec<u8>,
    pub specials: Vec<SpecialCellSnapshot>,
    pub active: Option<PieceSnapshot>,
    pub ghost: Vec<Pos>,
    pub next: Vec<PieceSnapshot>,
    pub hold: Option<PieceCell>,
    pub can_hold: bool,
    pub gravity: Direction,
    pub phase: Phase,
    pub paused: bool,
    pub outcome: Option<Outcome>,
    pub episode_id: u32,
    pub pieces_locked: u32,
    pub score: u64,
    pub level: u32,
    pub cleared: u32,
    pub combo: u32,
    pub chain: u32,
    pub max_chain: u32,
    pub fever_gauge: u32,
    pub fever_active: bool,
    pub garbage_pending: u8,
    pub objectives: Vec<Objective>,
    pub moves_left: Option<u32>,
    pub timers: TimersSnapshot,
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.board.clear();
        self.specials.clear();
        self.active = None;
        self.ghost.clear();
        self.next.clear();
        self.hold = None;
        self.can_hold = true;
        self.gravity = Direction::Down;
        self.phase = Phase::Idle;
        self.paused = false;
        self.outcome = None;
        self.episode_id = 0;
        self.pieces_locked = 0;
        self.score = 0;
        self.level = 0;
        self.cleared = 0;
        self.combo = 0;
        self.chain = 0;
        self.max_chain = 0;
        self.fever_gauge = 0;
        self.fever_active = false;
        self.garbage_pending = 0;
        self.objectives.clear();
        self.moves_left = None;
        self.timers = TimersSnapshot::default();
    }

    pub fn playable(&self) -> bool {
        !self.phase.is_terminal() && self.phase != Phase::Idle && !self.paused
    }

    /// Color code at (x, y); 0 for empty or out of bounds
    pub fn code_at(&self, x: i8, y: i8) -> u8 {
        if x < 0 || y < 0 || x as u8 >= self.width || y as u8 >= self.height {
            return 0;
        }
        self.board[y as usize * self.width as usize + x as usize]
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            board: Vec::new(),
            specials: Vec::new(),
            active: None,
            ghost: Vec::new(),
            next: Vec::new(),
            hold: None,
            can_hold: true,
            gravity: Direction::Down,
            phase: Phase::Idle,
            paused: false,
            outcome: None,
            episode_id: 0,
            pieces_locked: 0,
            score: 0,
            level: 0,
            cleared: 0,
            combo: 0,
            chain: 0,
            max_chain: 0,
            fever_gauge: 0,
            fever_active: false,
            garbage_pending: 0,
            objectives: Vec::new(),
            moves_left: None,
            timers: TimersSnapshot::default(),
        }
    }
}
