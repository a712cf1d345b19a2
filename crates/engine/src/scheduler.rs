//! Resolution scheduler - paces chain steps for presentation
//!
//! The core resolves a lock one step at a time and freezes its timers while
//! doing so. The scheduler decides *when* the next step runs: the first step
//! of a cycle runs on the first advance after the lock, every later step waits
//! `step_delay_ms` of wall time. A delay of zero resolves the whole cycle in
//! one advance. Pacing never changes the outcome of a cycle.
//!
//! Outside of a resolution the elapsed time is forwarded to
//! [`GameState::tick`].

use tracing::debug;

use chroma_fuse_core::{GameState, RandomSource, RulesConfig};
use chroma_fuse_types::{Phase, StepEvent};

/// What one [`Scheduler::advance`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advance {
    /// Chain steps run during this advance, in order
    pub steps: Vec<StepEvent>,
    /// The resolution cycle closed during this advance
    pub cycle_finished: bool,
    /// The drop timer moved or locked the active piece
    pub dropped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    step_delay_ms: u32,
    /// Time waited since the last step; `None` outside a cycle
    waited_ms: Option<u32>,
}

impl Scheduler {
    pub fn new(step_delay_ms: u32) -> Self {
        Self {
            step_delay_ms,
            waited_ms: None,
        }
    }

    pub fn from_config(config: &RulesConfig) -> Self {
        Self::new(config.chain_step_delay_ms)
    }

    pub fn step_delay_ms(&self) -> u32 {
        self.step_delay_ms
    }

    /// True while a cycle is being paced
    pub fn in_cycle(&self) -> bool {
        self.waited_ms.is_some()
    }

    /// Advance by `elapsed_ms` of wall time
    pub fn advance<R: RandomSource + Clone>(
        &mut self,
        state: &mut GameState<R>,
        elapsed_ms: u32,
    ) -> Advance {
        let mut out = Advance::default();

        if state.phase() != Phase::Resolving {
            self.waited_ms = None;
            out.dropped = state.tick(elapsed_ms);
            return out;
        }

        if self.step_delay_ms == 0 {
            self.run_all(state, &mut out);
            return out;
        }

        let mut waited = match self.waited_ms {
            // First step of the cycle runs right away
            None => {
                self.run_one(state, &mut out);
                if out.cycle_finished {
                    return out;
                }
                0
            }
            Some(w) => w,
        };

        waited = waited.saturating_add(elapsed_ms);
        while waited >= self.step_delay_ms && !out.cycle_finished {
            waited -= self.step_delay_ms;
            self.run_one(state, &mut out);
        }
        if !out.cycle_finished {
            self.waited_ms = Some(waited);
        }
        out
    }

    /// Resolve the current cycle without pacing
    pub fn settle<R: RandomSource + Clone>(&mut self, state: &mut GameState<R>) -> Advance {
        let mut out = Advance::default();
        if state.phase() == Phase::Resolving {
            self.run_all(state, &mut out);
        }
        out
    }

    fn run_all<R: RandomSource + Clone>(&mut self, state: &mut GameState<R>, out: &mut Advance) {
        while !out.cycle_finished {
            self.run_one(state, out);
        }
    }

    fn run_one<R: RandomSource + Clone>(&mut self, state: &mut GameState<R>, out: &mut Advance) {
        match state.step_resolution() {
            Some(step) => {
                self.waited_ms = Some(0);
                out.steps.push(step);
            }
            None => {
                debug!(steps = out.steps.len(), "cycle closed");
                self.waited_ms = None;
                out.cycle_finished = true;
            }
        }
    }
}
