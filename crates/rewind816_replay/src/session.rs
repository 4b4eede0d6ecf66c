//! Script-facing session surface.
//!
//! Everything a driving script can reach goes through an explicit
//! session handle: one replay engine plus one report writer, no ambient
//! globals. The register surface is a fixed set of methods resolved at
//! compile time rather than name-string dispatch. The `scan` callback is
//! the per-instruction hook: the host invokes the supplied printer once
//! per replayed step, starting with the step the cursor stands on, so a
//! whole-trace scan reports every recorded instruction.

use crate::breakpoint::BreakpointId;
use crate::engine::ReplayEngine;
use crate::memory::MemValue;
use crate::state::MachineState;
use rewind816_core::{CoreResult, StepIndex};
use rewind816_report::ReportWriter;
use std::io::{Read, Seek};

/// Read-only view of one reconstructed step handed to callbacks
pub struct StepView<'a> {
    state: &'a MachineState,
}

impl StepView<'_> {
    /// Current step index
    #[must_use]
    pub fn step_index(&self) -> StepIndex {
        self.state.step
    }

    /// 24-bit program counter
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.state.registers.pc()
    }

    /// 16-bit accumulator
    #[must_use]
    pub fn a(&self) -> u16 {
        self.state.registers.a()
    }

    /// Accumulator high byte
    #[must_use]
    pub fn ah(&self) -> u8 {
        self.state.registers.ah()
    }

    /// Accumulator low byte
    #[must_use]
    pub fn al(&self) -> u8 {
        self.state.registers.al()
    }

    /// 16-bit X index register
    #[must_use]
    pub fn x(&self) -> u16 {
        self.state.registers.x()
    }

    /// X high byte
    #[must_use]
    pub fn xh(&self) -> u8 {
        self.state.registers.xh()
    }

    /// X low byte
    #[must_use]
    pub fn xl(&self) -> u8 {
        self.state.registers.xl()
    }

    /// 16-bit Y index register
    #[must_use]
    pub fn y(&self) -> u16 {
        self.state.registers.y()
    }

    /// Y high byte
    #[must_use]
    pub fn yh(&self) -> u8 {
        self.state.registers.yh()
    }

    /// Y low byte
    #[must_use]
    pub fn yl(&self) -> u8 {
        self.state.registers.yl()
    }

    /// Stack pointer
    #[must_use]
    pub fn s(&self) -> u16 {
        self.state.registers.s()
    }

    /// Processor status word
    #[must_use]
    pub fn p(&self) -> u16 {
        self.state.registers.p()
    }

    /// Data-bank register
    #[must_use]
    pub fn db(&self) -> u8 {
        self.state.registers.db()
    }

    /// Direct-page register
    #[must_use]
    pub fn dp(&self) -> u16 {
        self.state.registers.dp()
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
}

/// Result of one scan request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Steps replayed during the scan
    pub steps: u64,
    /// Breakpoints that halted the scan, if any
    pub hits: Vec<BreakpointId>,
}

impl ScanSummary {
    /// Whether the scan stopped on a breakpoint
    #[must_use]
    pub fn halted(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// One analysis session: a replay engine and its report writer
pub struct ReplaySession<R> {
    engine: ReplayEngine<R>,
    report: ReportWriter,
    reported: Option<StepIndex>,
}

impl<R: Read + Seek> ReplaySession<R> {
    /// Open a trace log and construct a session standing at step 0
    ///
    /// # Errors
    ///
    /// Fails when the source is not a valid log or records no steps
    pub fn open(source: R) -> CoreResult<Self> {
        Ok(Self {
            engine: ReplayEngine::open(source)?,
            report: ReportWriter::new(),
            reported: None,
        })
    }

    /// The underlying engine
    #[must_use]
    pub fn engine(&self) -> &ReplayEngine<R> {
        &self.engine
    }

    /// Mutable access to the underlying engine
    pub fn engine_mut(&mut self) -> &mut ReplayEngine<R> {
        &mut self.engine
    }

    /// The session's report writer
    #[must_use]
    pub fn report(&self) -> &ReportWriter {
        &self.report
    }

    /// Mutable access to the report writer
    pub fn report_mut(&mut self) -> &mut ReportWriter {
        &mut self.report
    }

    /// Finish the session, keeping the accumulated report
    #[must_use]
    pub fn into_report(self) -> ReportWriter {
        self.report
    }

    /// Watch a single program-counter address
    pub fn set_breakpoint(&mut self, address: u32) -> BreakpointId {
        self.engine.set_breakpoint(address)
    }

    /// Watch a half-open program-counter range
    ///
    /// # Errors
    ///
    /// Fails when the range contains no addresses
    pub fn set_breakpoint_range(
        &mut self,
        start: u32,
        end_exclusive: u32,
    ) -> CoreResult<BreakpointId> {
        self.engine.set_breakpoint_range(start, end_exclusive)
    }

    /// Remove a breakpoint, returning whether it existed
    pub fn clear_breakpoint(&mut self, id: BreakpointId) -> bool {
        self.engine.clear_breakpoint(id)
    }

    /// Replay up to `max_steps` steps, invoking the printer per step
    ///
    /// The printer is the per-instruction hook: it sees the freshly
    /// reconstructed state and the session's report writer. The standing
    /// step is part of the scan, so a fresh session reports step 0
    /// before advancing; a scan resuming where a previous one stopped
    /// does not repeat the step already reported. The scan walks the
    /// event stream once, and stops early on the first breakpoint hit or
    /// at the end of the trace.
    ///
    /// # Errors
    ///
    /// Fails when the log is inconsistent or the printer itself fails
    pub fn scan<F>(&mut self, max_steps: u64, mut printer: F) -> CoreResult<ScanSummary>
    where
        F: FnMut(&StepView<'_>, &mut ReportWriter) -> CoreResult<()>,
    {
        tracing::debug!(max_steps, from = self.engine.step_index().as_u64(), "scan");

        if self.reported != Some(self.engine.step_index()) {
            printer(
                &StepView {
                    state: self.engine.state(),
                },
                &mut self.report,
            )?;
            self.reported = Some(self.engine.step_index());
        }

        let report = &mut self.report;
        let reported = &mut self.reported;
        let outcome = self.engine.step_forward_with(max_steps, |state| {
            printer(&StepView { state }, report)?;
            *reported = Some(state.step);
            Ok(())
        })?;

        Ok(ScanSummary {
            steps: outcome.taken,
            hits: outcome.hits,
        })
    }
}
