//! The stepping state machine.
//!
//! A replay engine owns one cursor into one opened trace log. Forward
//! stepping re-derives state at every intermediate step and evaluates
//! breakpoints after each one. Backward stepping and seeking never
//! evaluate breakpoints, since they navigate rather than execute.
//! Stepping past the last recorded step clamps there and reports zero
//! further steps, so callers detect end of trace by comparing requested
//! and taken counts.

use crate::breakpoint::{BreakpointId, BreakpointRegistry};
use crate::memory::MemValue;
use crate::state::{MachineState, Reconstructor};
use rewind816_core::{CoreError, CoreResult, Registers, StepIndex};
use rewind816_log::LogStore;
use std::io::{Read, Seek};
use thiserror::Error;

/// Engine-level error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A trace with no steps has no step 0 to stand on
    #[error("trace log records no steps")]
    EmptyTrace,
}

impl From<EngineError> for CoreError {
    fn from(err: EngineError) -> Self {
        CoreError::Format {
            reason: err.to_string(),
        }
    }
}

/// Where the engine's state machine stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Cursor on a valid step, no pending breakpoint hit
    Ready,
    /// Forward stepping stopped on a breakpoint match
    Halted,
}

/// Result of a forward step request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Steps the caller asked for
    pub requested: u64,
    /// Steps actually taken
    pub taken: u64,
    /// Breakpoints that matched the step the engine halted on
    pub hits: Vec<BreakpointId>,
}

impl StepOutcome {
    /// Whether the request stopped on a breakpoint
    #[must_use]
    pub fn halted(&self) -> bool {
        !self.hits.is_empty()
    }

    /// Whether the request ran out of trace instead
    #[must_use]
    pub fn end_of_trace(&self) -> bool {
        self.taken < self.requested && self.hits.is_empty()
    }
}

/// Replay engine: cursor, cached state, and breakpoint evaluation
pub struct ReplayEngine<R> {
    recon: Reconstructor<R>,
    breakpoints: BreakpointRegistry,
    cursor: StepIndex,
    state: MachineState,
    phase: Phase,
}

impl<R: Read + Seek> ReplayEngine<R> {
    /// Open a trace log and stand Ready at step 0
    ///
    /// # Errors
    ///
    /// Fails when the source is not a valid log or records no steps
    pub fn open(source: R) -> CoreResult<Self> {
        let store = LogStore::open(source)?;
        if store.total_steps() == 0 {
            return Err(EngineError::EmptyTrace.into());
        }
        let mut recon = Reconstructor::new(store);
        let state = recon.state_at(StepIndex::zero())?;
        Ok(Self {
            recon,
            breakpoints: BreakpointRegistry::new(),
            cursor: StepIndex::zero(),
            state,
            phase: Phase::Ready,
        })
    }

    /// Current step index
    #[must_use]
    pub fn step_index(&self) -> StepIndex {
        self.cursor
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Total steps in the recorded run
    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.recon.store().total_steps()
    }

    /// Reconstructed registers at the cursor
    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.state.registers
    }

    /// Reconstructed state at the cursor
    #[must_use]
    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// Active breakpoints
    #[must_use]
    pub fn breakpoints(&self) -> &BreakpointRegistry {
        &self.breakpoints
    }

    /// Watch a single program-counter address
    pub fn set_breakpoint(&mut self, address: u32) -> BreakpointId {
        self.breakpoints.add(address)
    }

    /// Watch a half-open program-counter range
    ///
    /// # Errors
    ///
    /// Fails when the range contains no addresses
    pub fn set_breakpoint_range(&mut self, start: u32, end_exclusive: u32) -> CoreResult<BreakpointId> {
        self.breakpoints.add_range(start, end_exclusive)
    }

    /// Remove a breakpoint, returning whether it existed
    pub fn clear_breakpoint(&mut self, id: BreakpointId) -> bool {
        self.breakpoints.remove(id)
    }

    /// Read one reconstructed byte
    ///
    /// # Errors
    ///
    /// Fails with an address error outside every mapped region
    pub fn read_byte(&self, address: u32) -> CoreResult<MemValue<u8>> {
        self.state.memory.read_byte(address)
    }

    /// Read a reconstructed little-endian word
    ///
    /// # Errors
    ///
    /// Fails with an address error when the word is entirely unmapped
    pub fn read_word(&self, address: u32) -> CoreResult<MemValue<u16>> {
        self.state.memory.read_word(address)
    }

    fn last_step(&self) -> u64 {
        self.total_steps() - 1
    }

    /// Advance the cursor by up to `n` steps
    ///
    /// State is re-derived at every intermediate step and breakpoints
    /// are checked after each one; the first match halts the scan early.
    /// At the end of the trace the cursor clamps on the last step.
    ///
    /// # Errors
    ///
    /// Fails only when the log itself turns out to be inconsistent
    pub fn step_forward(&mut self, n: u64) -> CoreResult<StepOutcome> {
        self.step_forward_with(n, |_| Ok(()))
    }

    /// Advance the cursor by up to `n` steps, observing each one
    ///
    /// `on_step` runs after every step's state is derived, including the
    /// step a breakpoint halts on. One walker serves the whole request,
    /// so an `n`-step advance decodes each event frame once instead of
    /// re-opening at a checkpoint per step.
    ///
    /// # Errors
    ///
    /// Fails when the log is inconsistent or `on_step` itself fails
    pub fn step_forward_with<F>(&mut self, n: u64, mut on_step: F) -> CoreResult<StepOutcome>
    where
        F: FnMut(&MachineState) -> CoreResult<()>,
    {
        self.phase = Phase::Ready;
        let origin = self.cursor;
        let mut taken = 0u64;
        let mut hits = Vec::new();

        if n > 0 && origin.as_u64() < self.last_step() {
            let (_, mut walker) = self.recon.store_mut().open_at(origin)?;
            while taken < n {
                let Some(event) = walker.next_event()? else { break };
                // The walker starts at the checkpoint before the origin;
                // the cached state already folded those events in.
                if event.step <= origin {
                    continue;
                }
                self.state.apply_event(&event);
                self.cursor = event.step;
                taken += 1;
                on_step(&self.state)?;
                let matched = self.breakpoints.check(self.state.registers.pc());
                if !matched.is_empty() {
                    tracing::debug!(
                        step = self.cursor.as_u64(),
                        pc = format_args!("{:#08x}", self.state.registers.pc()),
                        matched = matched.len(),
                        "breakpoint hit"
                    );
                    self.phase = Phase::Halted;
                    hits = matched;
                    break;
                }
            }
        }

        Ok(StepOutcome {
            requested: n,
            taken,
            hits,
        })
    }

    /// Move the cursor back by up to `n` steps, clamping at step 0
    ///
    /// Backward stepping never evaluates breakpoints and always leaves
    /// the engine Ready.
    ///
    /// # Errors
    ///
    /// Fails only when the log itself turns out to be inconsistent
    pub fn step_backward(&mut self, n: u64) -> CoreResult<u64> {
        let mut target = self.cursor;
        target.retreat(n);
        let moved = self.cursor.as_u64() - target.as_u64();
        if moved > 0 {
            self.state = self.recon.state_at(target)?;
            self.cursor = target;
        }
        self.phase = Phase::Ready;
        Ok(moved)
    }

    /// Jump the cursor to an arbitrary step
    ///
    /// # Errors
    ///
    /// Fails with a range error outside `[0, total_steps)`; the session
    /// stays usable and the cursor does not move.
    pub fn seek(&mut self, index: StepIndex) -> CoreResult<()> {
        if index.as_u64() >= self.total_steps() {
            return Err(CoreError::Range {
                index: index.as_u64(),
                limit: self.total_steps(),
            });
        }
        if index != self.cursor {
            self.state = self.recon.state_at(index)?;
            self.cursor = index;
        }
        self.phase = Phase::Ready;
        Ok(())
    }
}
