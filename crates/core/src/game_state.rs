//! Game state module - manages the complete engine state
//!
//! This module ties together all core components: board, spawner, piece
//! controller, chain resolution, scoring, fever, garbage and objectives.
//!
//! A lock moves the phase to [`Phase::Resolving`]. The resolution cycle is
//! advanced one chain step at a time with [`GameState::step_resolution`] (or
//! all at once with [`GameState::run_resolution`]); while it runs, movement
//! commands are rejected and the drop, combo, fever and garbage timers are
//! frozen, so any pacing between steps cannot change the result.

use arrayvec::ArrayVec;
use tracing::{debug, info, trace};

use crate::board::Board;
use crate::chain::resolve_step;
use crate::config::{GameMode, RulesConfig};
use crate::error::{CommandError, ConfigError};
use crate::garbage::{GarbageInjector, Injection};
use crate::objectives::{objectives_for_level, ObjectiveTracker};
use crate::piece::{settle_independently, FallingPiece, PieceCell};
use crate::rng::{RandomSource, SimpleRng};
use crate::scoring::{
    calculate_level, calculate_step_score, get_drop_interval_ms, is_new_high_score,
    ComboTracker, FeverChange, FeverGauge, StepScoreInput,
};
use crate::snapshot::{GameSnapshot, PieceSnapshot, SpecialCellSnapshot, TimersSnapshot};
use crate::spawner::{entry_position, spawn_blocked, Spawner};
use crate::types::*;

/// Complete engine state
#[derive(Debug, Clone)]
pub struct GameState<R: RandomSource = SimpleRng> {
    config: RulesConfig,
    rng: R,
    /// Copy of the source as it was at round start, replayed on restart
    initial_rng: R,
    board: Board,
    active: Option<FallingPiece>,
    spawner: Spawner,
    hold: Option<PieceCell>,
    can_hold: bool,
    gravity: Direction,
    phase: Phase,
    paused: bool,
    outcome: Option<Outcome>,
    /// Monotonic episode id (increments on restart)
    episode_id: u32,
    pieces_locked: u32,
    score: u64,
    level: u32,
    /// Cells cleared this round
    cleared_total: u32,
    /// Chain index of the current resolution cycle
    chain: u32,
    max_chain: u32,
    cycle_cleared: u32,
    /// Whether the current cycle already counted toward the combo
    cycle_combo: bool,
    combo: ComboTracker,
    fever: FeverGauge,
    garbage: GarbageInjector,
    objectives: ObjectiveTracker,
    drop_timer_ms: u32,
    /// Game time in ms, advanced by ticks outside resolution and pause
    now_ms: u64,
    events: Vec<GameEvent>,
}

impl GameState<SimpleRng> {
    /// Create a new game with the default rules and the given RNG seed
    pub fn new(seed: u32) -> Self {
        Self::build(RulesConfig::default(), SimpleRng::new(seed))
    }

    pub fn seed(&self) -> u32 {
        self.initial_rng.seed()
    }
}

impl<R: RandomSource + Clone> GameState<R> {
    /// Create a game from validated rules and an injected random source
    pub fn with_config(config: RulesConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, rng))
    }

    fn build(config: RulesConfig, rng: R) -> Self {
        let initial_rng = rng.clone();
        let mut rng = rng;
        let level = config.start_level.max(1);
        let objectives = match (config.mode, &config.objectives) {
            (_, Some(explicit)) => explicit.clone(),
            (GameMode::Endless, None) => Vec::new(),
            (_, None) => objectives_for_level(level, config.palette(level)),
        };
        let objectives =
            ObjectiveTracker::new(objectives, config.move_budget()).unwrap_or_default();
        let spawner = Spawner::new(&config, level, &mut rng);

        Self {
            board: Board::with_size(config.width, config.height),
            config,
            rng,
            initial_rng,
            active: None,
            spawner,
            hold: None,
            can_hold: true,
            gravity: Direction::Down,
            phase: Phase::Idle,
            paused: false,
            outcome: None,
            episode_id: 0,
            pieces_locked: 0,
            score: 0,
            level,
            cleared_total: 0,
            chain: 0,
            max_chain: 0,
            cycle_cleared: 0,
            cycle_combo: false,
            combo: ComboTracker::default(),
            fever: FeverGauge::default(),
            garbage: GarbageInjector::default(),
            objectives,
            drop_timer_ms: 0,
            now_ms: 0,
            events: Vec::new(),
        }
    }

    /// Start the round and spawn the first piece
    pub fn start(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        info!(
            mode = self.config.mode.as_str(),
            level = self.level,
            episode = self.episode_id,
            "round started"
        );
        self.spawn_next();
    }

    /// Reset to a fresh round with the same rules and random sequence
    pub fn restart(&mut self) {
        let episode_id = self.episode_id.wrapping_add(1);
        *self = Self::build(self.config.clone(), self.initial_rng.clone());
        self.episode_id = episode_id;
        self.start();
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    pub fn pieces_locked(&self) -> u32 {
        self.pieces_locked
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn cleared_total(&self) -> u32 {
        self.cleared_total
    }

    pub fn chain(&self) -> u32 {
        self.chain
    }

    pub fn max_chain(&self) -> u32 {
        self.max_chain
    }

    pub fn combo(&self) -> u32 {
        self.combo.count()
    }

    pub fn fever(&self) -> &FeverGauge {
        &self.fever
    }

    pub fn garbage(&self) -> &GarbageInjector {
        &self.garbage
    }

    pub fn objectives(&self) -> &ObjectiveTracker {
        &self.objectives
    }

    pub fn gravity(&self) -> Direction {
        self.gravity
    }

    pub fn hold_cell(&self) -> Option<PieceCell> {
        self.hold
    }

    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    pub fn active(&self) -> Option<&FallingPiece> {
        self.active.as_ref()
    }

    /// Upcoming pieces, next first
    pub fn next_pieces(&self) -> impl Iterator<Item = &FallingPiece> + '_ {
        self.spawner.preview()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable board access for fixtures and puzzle setup
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Current drop interval based on level
    pub fn drop_interval_ms(&self) -> u32 {
        get_drop_interval_ms(self.level)
    }

    /// True if the current score beats `previous_high_score`
    pub fn is_new_high_score(&self, previous_high_score: u64) -> bool {
        is_new_high_score(self.score, previous_high_score)
    }

    /// Drain the events produced since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queue garbage rows for the next lock boundary
    pub fn queue_garbage(&mut self, rows: u8) {
        self.garbage.queue(rows);
    }

    /// Where each cell of the active piece would settle on a hard drop
    pub fn ghost_positions(&self) -> Option<ArrayVec<Pos, MAX_PIECE_CELLS>> {
        let piece = self.active.as_ref()?;
        Some(settle_independently(
            &self.board,
            &piece.positions(),
            self.gravity,
        ))
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        out.width = self.board.width();
        out.height = self.board.height();
        self.board.write_color_grid(&mut out.board);
        out.specials.clear();
        out.specials.extend(
            self.board
                .iter()
                .filter(|c| c.special.is_special())
                .map(|c| SpecialCellSnapshot {
                    x: c.x,
                    y: c.y,
                    special: c.special,
                    frozen_count: c.frozen_count,
                }),
        );
        out.active = self.active.as_ref().map(PieceSnapshot::absolute);
        out.ghost.clear();
        if let Some(ghost) = self.ghost_positions() {
            out.ghost.extend(ghost);
        }
        out.next.clear();
        out.next
            .extend(self.spawner.preview().map(PieceSnapshot::relative));
        out.hold = self.hold;
        out.can_hold = self.can_hold;
        out.gravity = self.gravity;
        out.phase = self.phase;
        out.paused = self.paused;
        out.outcome = self.outcome;
        out.episode_id = self.episode_id;
        out.pieces_locked = self.pieces_locked;
        out.score = self.score;
        out.level = self.level;
        out.cleared = self.cleared_total;
        out.combo = self.combo.count();
        out.chain = self.chain;
        out.max_chain = self.max_chain;
        out.fever_gauge = self.fever.gauge();
        out.fever_active = self.fever.is_active();
        out.garbage_pending = self.garbage.pending();
        out.objectives.clear();
        out.objectives
            .extend(self.objectives.objectives().iter().cloned());
        out.moves_left = self.objectives.moves_left();
        out.timers = TimersSnapshot {
            drop_ms: self.drop_timer_ms,
            combo_ms: self.combo.remaining_ms(),
            fever_ms: self.fever.remaining_ms(),
            garbage_ms: self.garbage.timer_ms(),
        };
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    /// Gate shared by every piece command
    fn check_input(&self) -> Result<(), CommandError> {
        match self.phase {
            Phase::Idle | Phase::GameOver | Phase::RoundWon => Err(CommandError::NotPlaying),
            Phase::Resolving => Err(CommandError::ResolutionInProgress),
            _ if self.paused => Err(CommandError::Paused),
            Phase::Spawning => Err(CommandError::NoActivePiece),
            Phase::AwaitingInput => Ok(()),
        }
    }

    fn active_piece(&self) -> Result<&FallingPiece, CommandError> {
        self.active.as_ref().ok_or(CommandError::NoActivePiece)
    }

    /// Spawn the next piece; starts the round from `Idle`
    pub fn spawn_piece(&mut self) -> Result<(), CommandError> {
        match self.phase {
            Phase::Idle => {
                self.start();
                Ok(())
            }
            Phase::Spawning if self.paused => Err(CommandError::Paused),
            Phase::Spawning => {
                self.spawn_next();
                Ok(())
            }
            Phase::AwaitingInput => Err(CommandError::PieceActive),
            Phase::Resolving => Err(CommandError::ResolutionInProgress),
            Phase::GameOver | Phase::RoundWon => Err(CommandError::NotPlaying),
        }
    }

    fn spawn_next(&mut self) {
        let mut piece = self.spawner.pop(&self.config, self.level, &mut self.rng);
        let (x, y) = entry_position(&self.board, &piece, self.gravity);
        piece.x = x;
        piece.y = y;

        if spawn_blocked(&self.board, &piece, self.gravity) {
            self.end_round(Outcome::GameOver(GameOverReason::SpawnBlocked));
            return;
        }

        debug!(shape = %piece.shape, x, y, "piece spawned");
        self.active = Some(piece);
        self.phase = Phase::AwaitingInput;
        self.drop_timer_ms = 0;
    }

    /// Translate the active piece one cell; moving against gravity is rejected
    pub fn move_piece(&mut self, dir: Direction) -> Result<(), CommandError> {
        self.check_input()?;
        if dir == self.gravity.opposite() {
            return Err(CommandError::InvalidMove);
        }
        let piece = self.active_piece()?;
        let (dx, dy) = dir.vector();
        if !piece.fits(&self.board, dx, dy) {
            return Err(CommandError::InvalidMove);
        }
        let moved = piece.translated(dx, dy);
        self.active = Some(moved);
        Ok(())
    }

    /// Rotate clockwise about the primary cell, with horizontal kicks
    pub fn rotate(&mut self) -> Result<(), CommandError> {
        self.check_input()?;
        let rotated = self
            .active_piece()?
            .rotated(&self.board)
            .ok_or(CommandError::InvalidMove)?;
        self.active = Some(rotated);
        Ok(())
    }

    /// Step along gravity, locking if blocked
    pub fn soft_drop(&mut self) -> Result<(), CommandError> {
        self.check_input()?;
        self.active_piece()?;
        self.drop_timer_ms = 0;
        self.gravity_step();
        Ok(())
    }

    /// Settle every cell independently and lock
    pub fn hard_drop(&mut self) -> Result<(), CommandError> {
        self.check_input()?;
        let piece = self.active.take().ok_or(CommandError::NoActivePiece)?;
        let positions = settle_independently(&self.board, &piece.positions(), self.gravity);
        self.lock(piece, &positions);
        Ok(())
    }

    /// Swap the primary cell with the hold slot
    ///
    /// With an empty slot the piece is consumed and the next one spawns.
    /// Disabled until the next lock.
    pub fn hold(&mut self) -> Result<(), CommandError> {
        self.check_input()?;
        if !self.can_hold {
            return Err(CommandError::HoldUnavailable);
        }
        let piece = self.active.as_mut().ok_or(CommandError::NoActivePiece)?;
        let primary = *piece.primary().ok_or(CommandError::NoActivePiece)?;

        self.can_hold = false;
        match self.hold.replace(primary) {
            Some(held) => piece.cells[0] = held,
            None => {
                self.active = None;
                self.spawn_next();
            }
        }
        Ok(())
    }

    /// Change the gravity vector; the active piece keeps its position
    pub fn set_gravity(&mut self, dir: Direction) -> Result<(), CommandError> {
        match self.phase {
            Phase::Idle | Phase::GameOver | Phase::RoundWon => {
                return Err(CommandError::NotPlaying)
            }
            Phase::Resolving => return Err(CommandError::ResolutionInProgress),
            _ if self.paused => return Err(CommandError::Paused),
            _ => {}
        }
        if dir != self.gravity {
            info!(from = self.gravity.as_str(), to = dir.as_str(), "gravity changed");
            self.gravity = dir;
        }
        Ok(())
    }

    /// Suspend timers and piece commands; never interrupts a resolution
    pub fn pause(&mut self) -> Result<(), CommandError> {
        if self.phase == Phase::Idle || self.phase.is_terminal() {
            return Err(CommandError::NotPlaying);
        }
        self.paused = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), CommandError> {
        if self.phase == Phase::Idle || self.phase.is_terminal() {
            return Err(CommandError::NotPlaying);
        }
        self.paused = false;
        Ok(())
    }

    /// Apply a protocol command
    pub fn apply_command(&mut self, command: GameCommand) -> Result<(), CommandError> {
        let result = match command {
            GameCommand::Spawn => self.spawn_piece(),
            GameCommand::Move(dir) => self.move_piece(dir),
            GameCommand::Rotate => self.rotate(),
            GameCommand::SoftDrop => self.soft_drop(),
            GameCommand::HardDrop => self.hard_drop(),
            GameCommand::Hold => self.hold(),
            GameCommand::SetGravity(dir) => self.set_gravity(dir),
            GameCommand::Pause => self.pause(),
            GameCommand::Resume => self.resume(),
            GameCommand::Restart => {
                self.restart();
                Ok(())
            }
        };
        if let Err(err) = result {
            trace!(command = command.as_str(), code = err.code(), "command rejected");
        }
        result
    }

    /// Move the active piece along gravity; locks it if blocked.
    /// Returns true if the piece locked.
    fn gravity_step(&mut self) -> bool {
        let Some(piece) = self.active.take() else {
            return false;
        };
        let (dx, dy) = self.gravity.vector();
        if piece.fits(&self.board, dx, dy) {
            self.active = Some(piece.translated(dx, dy));
            return false;
        }
        let positions = piece.positions();
        self.lock(piece, &positions);
        true
    }

    /// Commit `piece` to the board at `positions` and start a resolution cycle
    fn lock(&mut self, piece: FallingPiece, positions: &[Pos]) {
        for (cell, &(x, y)) in piece.cells.iter().zip(positions) {
            self.board.place(x, y, cell.color, cell.special, self.now_ms);
        }
        self.active = None;
        self.chain = 0;
        self.cycle_cleared = 0;
        self.cycle_combo = false;
        self.can_hold = true;
        self.drop_timer_ms = 0;
        self.pieces_locked += 1;
        self.objectives.spend_move();
        self.phase = Phase::Resolving;

        debug!(shape = %piece.shape, cells = piece.len(), "piece locked");
        self.events.push(GameEvent::Locked {
            cells: piece.len() as u32,
        });
    }

    /// Run one chain step of the current resolution cycle
    ///
    /// Returns `None` when no group remains; that call also closes the cycle
    /// (objectives, garbage, level, next spawn). Pause does not stop it.
    pub fn step_resolution(&mut self) -> Option<StepEvent> {
        if self.phase != Phase::Resolving {
            return None;
        }
        let palette = self.config.palette(self.level);
        let Some(outcome) = resolve_step(&mut self.board, self.gravity, palette, &mut self.rng)
        else {
            self.finish_cycle();
            return None;
        };

        self.chain += 1;
        self.max_chain = self.max_chain.max(self.chain);
        let blocks = outcome.cleared.len() as u32;
        if blocks > 0 && !self.cycle_combo {
            self.combo.register_clear();
            self.cycle_combo = true;
        }
        let combo = self.combo.count();
        let perfect_clear = blocks > 0 && self.board.is_empty();
        let fever_active = self.fever.is_active();

        let score = calculate_step_score(StepScoreInput {
            blocks,
            chain: self.chain,
            combo,
            level: self.level,
            multiplier: outcome.multiplier,
            perfect_clear,
            fever: fever_active,
        });
        self.score = self.score.saturating_add(score);
        self.cleared_total += blocks;
        self.cycle_cleared += blocks;

        let step = StepEvent {
            chain_index: self.chain,
            groups: outcome.groups,
            cleared: outcome.cleared,
            effects: outcome.effects,
            frozen_hits: outcome.frozen_hits,
            score,
            multiplier: outcome.multiplier,
            combo,
            perfect_clear,
            fever_active,
        };
        debug!(chain = self.chain, blocks, score, combo, "resolution step");
        self.events.push(GameEvent::Step(step.clone()));

        if self.fever.add(blocks, self.chain, combo) == Some(FeverChange::Started) {
            info!(score = self.score, "fever started");
            self.events.push(GameEvent::FeverStarted);
        }
        for index in self.objectives.record_step(&step) {
            info!(index, "objective completed");
            self.events.push(GameEvent::ObjectiveCompleted { index });
        }
        Some(step)
    }

    /// Run the current resolution cycle to completion; returns the step count
    pub fn run_resolution(&mut self) -> u32 {
        let mut steps = 0;
        while self.step_resolution().is_some() {
            steps += 1;
        }
        steps
    }

    fn finish_cycle(&mut self) {
        self.events.push(GameEvent::ResolutionFinished {
            chain: self.chain,
            cleared: self.cycle_cleared,
        });

        if self.objectives.all_complete() {
            self.end_round(Outcome::RoundWon);
            return;
        }
        if self.objectives.moves_exhausted() {
            self.end_round(Outcome::GameOver(GameOverReason::MovesExhausted));
            return;
        }

        if self.garbage.pending() > 0 {
            let palette = self.config.palette(self.level);
            match self.garbage.inject(
                &mut self.board,
                self.gravity,
                palette,
                &mut self.rng,
                self.now_ms,
            ) {
                Injection::Overflow => {
                    self.end_round(Outcome::GameOver(GameOverReason::GarbageOverflow));
                    return;
                }
                Injection::Injected { rows } => {
                    self.events.push(GameEvent::GarbageInjected { rows });
                }
            }
        }

        if self.config.mode == GameMode::Endless {
            let level = calculate_level(self.config.start_level, self.cleared_total);
            if level > self.level {
                self.level = level;
                info!(level, "level up");
                self.events.push(GameEvent::LevelUp { level });
            }
        }

        if self.config.auto_spawn {
            self.spawn_next();
        } else {
            self.phase = Phase::Spawning;
        }
    }

    fn end_round(&mut self, outcome: Outcome) {
        self.active = None;
        self.outcome = Some(outcome);
        match outcome {
            Outcome::GameOver(reason) => {
                self.phase = Phase::GameOver;
                info!(
                    reason = reason.as_str(),
                    score = self.score,
                    level = self.level,
                    "game over"
                );
                self.events.push(GameEvent::GameOver(reason));
            }
            Outcome::RoundWon => {
                self.phase = Phase::RoundWon;
                info!(score = self.score, level = self.level, "round won");
                self.events.push(GameEvent::RoundWon);
            }
        }
    }

    /// Advance game time
    ///
    /// Timers only run while a piece is falling or waiting to spawn, and not
    /// while paused. Returns true if the drop timer moved or locked the piece.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if !matches!(self.phase, Phase::AwaitingInput | Phase::Spawning) || self.paused {
            return false;
        }
        self.now_ms = self.now_ms.saturating_add(u64::from(elapsed_ms));

        if let Some(combo) = self.combo.tick(elapsed_ms) {
            debug!(combo, "combo expired");
            self.events.push(GameEvent::ComboExpired { combo });
        }
        if self.fever.tick(elapsed_ms) == Some(FeverChange::Ended) {
            info!("fever ended");
            self.events.push(GameEvent::FeverEnded);
        }

        if self.phase != Phase::AwaitingInput {
            return false;
        }

        let queued = self.garbage.tick(
            elapsed_ms,
            self.level,
            self.config.garbage_min_level,
            &mut self.rng,
        );
        if queued > 0 {
            debug!(queued, pending = self.garbage.pending(), "garbage queued");
        }

        self.drop_timer_ms = self.drop_timer_ms.saturating_add(elapsed_ms);
        if self.drop_timer_ms < self.drop_interval_ms() {
            return false;
        }
        self.drop_timer_ms = 0;
        self.gravity_step();
        true
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objectives::{Objective, ObjectiveKind};
    use crate::shapes::{ShapeCatalog, ShapeTemplate};

    /// Rules producing plain 2x2 pieces with no specials or wildcards
    fn square_rules() -> RulesConfig {
        RulesConfig {
            piece_size_curve: vec![4],
            palette_size_curve: vec![1],
            special_base_per_mille: 0,
            special_per_level_per_mille: 0,
            special_guarantee_interval: u32::MAX,
            wildcard_per_mille: 0,
            shapes: ShapeCatalog::new(vec![ShapeTemplate::new(
                "square",
                vec![(0, 0), (1, 0), (0, 1), (1, 1)],
            )])
            .unwrap(),
            ..RulesConfig::default()
        }
    }

    fn started(config: RulesConfig) -> GameState {
        let mut game = GameState::with_config(config, SimpleRng::new(42)).unwrap();
        game.start();
        game
    }

    #[test]
    fn test_new_game_state() {
        let game = GameState::new(12345);
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.score(), 0);
        assert_eq!(game.level(), 1);
        assert!(game.active().is_none());
        assert_eq!(game.next_pieces().count(), NEXT_QUEUE_LEN);
        assert_eq!(game.seed(), 12345);
    }

    #[test]
    fn test_start_spawns_piece() {
        let mut game = GameState::new(1);
        game.start();
        assert_eq!(game.phase(), Phase::AwaitingInput);
        let piece = game.active().unwrap();
        assert!(piece.is_valid(game.board()));
    }

    #[test]
    fn test_commands_rejected_before_start() {
        let mut game = GameState::new(1);
        assert_eq!(game.rotate(), Err(CommandError::NotPlaying));
        assert_eq!(game.pause(), Err(CommandError::NotPlaying));
        assert_eq!(game.spawn_piece(), Ok(()));
        assert_eq!(game.phase(), Phase::AwaitingInput);
        assert_eq!(game.spawn_piece(), Err(CommandError::PieceActive));
    }

    #[test]
    fn test_move_and_rejected_move_leave_state() {
        let mut game = started(square_rules());
        let x = game.active().unwrap().x;
        assert_eq!(game.move_piece(Direction::Left), Ok(()));
        assert_eq!(game.active().unwrap().x, x - 1);

        for _ in 0..10 {
            let _ = game.move_piece(Direction::Left);
        }
        let before = game.active().cloned();
        assert_eq!(game.move_piece(Direction::Left), Err(CommandError::InvalidMove));
        assert_eq!(game.active().cloned(), before);

        // Against gravity
        assert_eq!(game.move_piece(Direction::Up), Err(CommandError::InvalidMove));
    }

    #[test]
    fn test_hard_drop_locks_and_resolves() {
        let mut game = started(square_rules());
        game.hard_drop().unwrap();
        assert_eq!(game.phase(), Phase::Resolving);
        assert_eq!(game.move_piece(Direction::Left), Err(CommandError::ResolutionInProgress));
        assert!(!game.tick(5_000));

        let step = game.step_resolution().unwrap();
        assert_eq!(step.chain_index, 1);
        assert_eq!(step.cleared.len(), 4);
        assert!(step.perfect_clear);
        assert!(game.step_resolution().is_none());
        assert_eq!(game.phase(), Phase::AwaitingInput);
        assert_eq!(game.combo(), 1);

        let events = game.take_events();
        assert!(matches!(events[0], GameEvent::Locked { cells: 4 }));
        assert!(matches!(events[1], GameEvent::Step(_)));
        assert!(events.contains(&GameEvent::ResolutionFinished { chain: 1, cleared: 4 }));
    }

    #[test]
    fn test_long_tick_saturates_drop_timer() {
        let mut game = started(square_rules());
        let y = game.active().unwrap().y;
        assert!(!game.tick(10));
        assert!(game.tick(u32::MAX));
        assert_eq!(game.active().unwrap().y, y + 1);
        assert!(!game.tick(10));
    }

    /// Plain dominoes: two stacked at the wall make a group of four
    fn domino_rules() -> RulesConfig {
        RulesConfig {
            piece_size_curve: vec![2],
            shapes: ShapeCatalog::new(vec![ShapeTemplate::new("domino", vec![(0, 0), (1, 0)])])
                .unwrap(),
            ..square_rules()
        }
    }

    fn drop_at_left_wall(game: &mut GameState) -> u32 {
        while game.move_piece(Direction::Left).is_ok() {}
        game.hard_drop().unwrap();
        game.run_resolution()
    }

    #[test]
    fn test_combo_survives_non_clearing_lock() {
        let mut game = started(domino_rules());
        drop_at_left_wall(&mut game);
        assert_eq!(game.combo(), 0);
        drop_at_left_wall(&mut game);
        assert_eq!(game.combo(), 1);

        // Nothing clears, the timer is still running
        game.tick(COMBO_TIMEOUT_MS / 2);
        drop_at_left_wall(&mut game);
        assert!(!game.board().is_empty());
        assert_eq!(game.combo(), 1);

        drop_at_left_wall(&mut game);
        assert_eq!(game.combo(), 2);
        game.take_events();

        game.tick(COMBO_TIMEOUT_MS);
        assert_eq!(game.combo(), 0);
        assert!(game
            .take_events()
            .contains(&GameEvent::ComboExpired { combo: 2 }));
    }

    #[test]
    fn test_fever_triples_step_score() {
        let mut game = started(square_rules());
        for _ in 0..20 {
            if game.fever().is_active() {
                break;
            }
            game.hard_drop().unwrap();
            game.run_resolution();
        }
        assert!(game.fever().is_active());

        let level = game.level();
        game.hard_drop().unwrap();
        let step = game.step_resolution().unwrap();
        assert!(step.fever_active);
        let plain = calculate_step_score(StepScoreInput {
            blocks: 4,
            chain: 1,
            combo: step.combo,
            level,
            multiplier: step.multiplier,
            perfect_clear: step.perfect_clear,
            fever: false,
        });
        assert_eq!(step.score, plain * 3);
    }

    #[test]
    fn test_pause_blocks_commands_and_timers() {
        let mut game = started(square_rules());
        game.pause().unwrap();
        assert_eq!(game.rotate(), Err(CommandError::Paused));
        let y = game.active().unwrap().y;
        assert!(!game.tick(10_000));
        assert_eq!(game.active().unwrap().y, y);
        game.resume().unwrap();
        assert!(game.tick(1_000));
        assert_eq!(game.active().unwrap().y, y + 1);
    }

    #[test]
    fn test_pause_does_not_interrupt_resolution() {
        let mut game = started(square_rules());
        game.hard_drop().unwrap();
        game.pause().unwrap();
        assert_eq!(game.run_resolution(), 1);
        assert_eq!(game.phase(), Phase::AwaitingInput);
        assert!(game.paused());
    }

    #[test]
    fn test_soft_drop_locks_when_blocked() {
        let mut game = started(square_rules());
        for _ in 0..14 {
            game.soft_drop().unwrap();
            assert_eq!(game.phase(), Phase::AwaitingInput);
        }
        game.soft_drop().unwrap();
        assert_eq!(game.phase(), Phase::Resolving);
    }

    #[test]
    fn test_hold_swaps_primary_cell() {
        let mut game = started(RulesConfig {
            wildcard_per_mille: 0,
            ..square_rules()
        });
        let first = *game.active().unwrap().primary().unwrap();
        game.hold().unwrap();
        assert_eq!(game.hold_cell(), Some(first));
        assert_eq!(game.phase(), Phase::AwaitingInput);
        assert_eq!(game.hold(), Err(CommandError::HoldUnavailable));

        game.hard_drop().unwrap();
        game.run_resolution();
        assert!(game.can_hold());
        let second = *game.active().unwrap().primary().unwrap();
        game.hold().unwrap();
        assert_eq!(game.active().unwrap().cells[0], first);
        assert_eq!(game.hold_cell(), Some(second));
    }

    #[test]
    fn test_set_gravity_changes_compaction() {
        let mut game = started(square_rules());
        game.set_gravity(Direction::Left).unwrap();
        assert_eq!(game.gravity(), Direction::Left);
        game.hard_drop().unwrap();
        assert!(game.board().iter().all(|c| c.x <= 1));
    }

    #[test]
    fn test_restart_replays_same_sequence() {
        let mut game = GameState::new(7);
        game.start();
        let first = game.active().cloned();
        game.hard_drop().unwrap();
        game.run_resolution();
        game.apply_command(GameCommand::Restart).unwrap();
        assert_eq!(game.episode_id(), 1);
        assert_eq!(game.score(), 0);
        assert_eq!(game.active().cloned(), first);
    }

    #[test]
    fn test_spawn_blocked_ends_round() {
        let mut game = GameState::with_config(square_rules(), SimpleRng::new(1)).unwrap();
        for x in 0..8 {
            for y in 0..2 {
                let color = if (x + y) % 2 == 0 { Color::Blue } else { Color::Green };
                game.board_mut().place(x, y, color, SpecialType::Normal, 0);
            }
        }
        game.start();
        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(
            game.outcome(),
            Some(Outcome::GameOver(GameOverReason::SpawnBlocked))
        );
        assert_eq!(game.rotate(), Err(CommandError::NotPlaying));
    }

    #[test]
    fn test_objective_mode_round_won() {
        let config = RulesConfig {
            mode: GameMode::Objective,
            objectives: Some(vec![Objective::new(ObjectiveKind::BlocksCleared, 4)]),
            ..square_rules()
        };
        let mut game = started(config);
        game.hard_drop().unwrap();
        game.run_resolution();
        assert_eq!(game.phase(), Phase::RoundWon);
        assert_eq!(game.outcome(), Some(Outcome::RoundWon));
        let events = game.take_events();
        assert!(events.contains(&GameEvent::ObjectiveCompleted { index: 0 }));
        assert!(events.contains(&GameEvent::RoundWon));
    }

    #[test]
    fn test_puzzle_moves_exhausted() {
        let config = RulesConfig {
            mode: GameMode::Puzzle { moves: 1 },
            objectives: Some(vec![Objective::new(ObjectiveKind::Score, 1_000_000)]),
            ..square_rules()
        };
        let mut game = started(config);
        game.hard_drop().unwrap();
        game.run_resolution();
        assert_eq!(
            game.outcome(),
            Some(Outcome::GameOver(GameOverReason::MovesExhausted))
        );
    }

    #[test]
    fn test_manual_spawn_mode() {
        let mut game = started(RulesConfig {
            auto_spawn: false,
            ..square_rules()
        });
        game.hard_drop().unwrap();
        game.run_resolution();
        assert_eq!(game.phase(), Phase::Spawning);
        assert_eq!(game.rotate(), Err(CommandError::NoActivePiece));
        game.spawn_piece().unwrap();
        assert_eq!(game.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut game = started(square_rules());
        let snap = game.snapshot();
        assert_eq!(snap.width, 8);
        assert_eq!(snap.board.len(), 8 * 16);
        assert_eq!(snap.active.as_ref().unwrap().cells.len(), 4);
        assert_eq!(snap.ghost.len(), 4);
        assert_eq!(snap.next.len(), NEXT_QUEUE_LEN);
        assert!(snap.playable());

        game.hard_drop().unwrap();
        let snap = game.snapshot();
        assert_eq!(snap.phase, Phase::Resolving);
        assert_eq!(snap.board.iter().filter(|&&c| c != 0).count(), 4);
    }

    #[test]
    fn test_is_new_high_score() {
        let mut game = started(square_rules());
        game.hard_drop().unwrap();
        game.run_resolution();
        let score = game.score();
        assert!(score > 0);
        assert!(game.is_new_high_score(score - 1));
        assert!(!game.is_new_high_score(score));
    }
}
