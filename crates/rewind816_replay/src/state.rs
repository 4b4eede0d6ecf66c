//! Machine state reconstruction.
//!
//! `state_at` is the one piece of real subtlety in the core: the state
//! for an arbitrary step is the nearest checkpoint at or before it plus
//! a fold of every event delta in between, so random access costs at
//! most one checkpoint interval of sequential decoding. Checkpointing
//! must never change observable results; the equivalence with a full
//! linear replay is pinned down by tests here.

use crate::memory::MemoryImage;
use rewind816_core::{CoreResult, Registers, StepIndex};
use rewind816_log::{Checkpoint, LogStore, TraceEvent};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};

/// Fully reconstructed machine state at one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    /// Step the state describes (state after this step ran)
    pub step: StepIndex,
    /// Register file
    pub registers: Registers,
    /// Memory revealed by the trace so far
    pub memory: MemoryImage,
}

impl MachineState {
    /// Restore a checkpoint into a state over the given regions
    #[must_use]
    pub fn from_checkpoint(
        checkpoint: &Checkpoint,
        regions: Vec<rewind816_core::MappedRegion>,
    ) -> Self {
        let mut memory = MemoryImage::new(regions);
        memory.reveal_all(checkpoint.memory.iter().map(|(&a, &v)| (a, v)));
        Self {
            step: checkpoint.step,
            registers: checkpoint.registers,
            memory,
        }
    }

    /// Fold one event's deltas into the state
    ///
    /// Both recorded reads and writes reveal memory contents: a read
    /// proves what the byte held when the instruction ran.
    pub fn apply_event(&mut self, event: &TraceEvent) {
        self.step = event.step;
        self.registers.set_pc(event.pc);
        for write in &event.reg_writes {
            self.registers.apply(write);
        }
        for access in &event.mem_accesses {
            self.memory.reveal(access.address, access.value);
        }
    }
}

/// Rebuilds machine state at arbitrary steps from a log store
pub struct Reconstructor<R> {
    store: LogStore<R>,
}

impl<R: Read + Seek> Reconstructor<R> {
    /// Wrap an opened store
    #[must_use]
    pub fn new(store: LogStore<R>) -> Self {
        Self { store }
    }

    /// The underlying store
    #[must_use]
    pub fn store(&self) -> &LogStore<R> {
        &self.store
    }

    /// Mutable access to the underlying store
    pub fn store_mut(&mut self) -> &mut LogStore<R> {
        &mut self.store
    }

    /// Reconstruct the state after `step` ran
    ///
    /// # Errors
    ///
    /// Fails with a range error when the step is out of bounds, or a
    /// format error when the log is inconsistent.
    pub fn state_at(&mut self, step: StepIndex) -> CoreResult<MachineState> {
        let regions = self.store.regions().to_vec();
        let (checkpoint, mut walker) = self.store.open_at(step)?;
        let mut state = MachineState::from_checkpoint(&checkpoint, regions);
        if state.step == step {
            return Ok(state);
        }
        while let Some(event) = walker.next_event()? {
            // The walker starts on the checkpoint's own step, which the
            // checkpoint already folded in.
            if event.step <= checkpoint.step {
                continue;
            }
            state.apply_event(&event);
            if event.step == step {
                break;
            }
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind816_core::{MappedRegion, RegField, RegWrite};
    use rewind816_log::{LogWriter, MemAccess};
    use std::io::Cursor;

    const WRAM: MappedRegion = MappedRegion::new(0x7E_0000, 0x80_0000);
    const ROM: MappedRegion = MappedRegion::new(0x00_8000, 0x01_0000);

    /// Ten steps, checkpoint interval 4. Each step bumps A, writes its
    /// step number into WRAM, and step 5 flips the X register.
    fn fixture() -> LogStore<Cursor<Vec<u8>>> {
        let mut writer = LogWriter::new(
            Cursor::new(Vec::new()),
            4,
            Registers::new(),
            vec![WRAM, ROM],
        )
        .unwrap();
        for i in 0..10u64 {
            let mut event = TraceEvent::new(StepIndex::from_raw(i), 0x00_8000 + i as u32 * 2)
                .with_reg(RegWrite::wide(RegField::A, i as u16 + 1))
                .with_mem(MemAccess::write(0x7E_0000 + i as u32, i as u8));
            if i == 5 {
                event = event.with_reg(RegWrite::wide(RegField::X, 0xBEEF));
            }
            writer.append(event).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        LogStore::open(cursor).unwrap()
    }

    /// Reference reconstruction: fold every event from step 0.
    fn linear_state_at(recon: &mut Reconstructor<Cursor<Vec<u8>>>, step: u64) -> MachineState {
        let regions = recon.store().regions().to_vec();
        let (checkpoint, mut walker) = recon.store_mut().open_at(StepIndex::zero()).unwrap();
        let mut state = MachineState::from_checkpoint(&checkpoint, regions);
        while let Some(event) = walker.next_event().unwrap() {
            if event.step <= checkpoint.step {
                continue;
            }
            if event.step.as_u64() > step {
                break;
            }
            state.apply_event(&event);
        }
        state
    }

    #[test]
    fn test_state_at_step_zero() {
        let mut recon = Reconstructor::new(fixture());
        let state = recon.state_at(StepIndex::zero()).unwrap();
        assert_eq!(state.registers.a(), 1);
        assert_eq!(state.registers.pc(), 0x00_8000);
    }

    #[test]
    fn test_state_at_folds_deltas_past_checkpoint() {
        let mut recon = Reconstructor::new(fixture());
        let state = recon.state_at(StepIndex::from_raw(7)).unwrap();
        assert_eq!(state.registers.a(), 8);
        assert_eq!(state.registers.x(), 0xBEEF);
        assert_eq!(state.registers.pc(), 0x00_800E);
        // Writes from before the checkpoint survive through it.
        assert_eq!(
            state.memory.read_byte(0x7E_0001).unwrap().known(),
            Some(1)
        );
        assert_eq!(
            state.memory.read_byte(0x7E_0007).unwrap().known(),
            Some(7)
        );
    }

    #[test]
    fn test_state_at_is_idempotent() {
        let mut recon = Reconstructor::new(fixture());
        let first = recon.state_at(StepIndex::from_raw(6)).unwrap();
        let second = recon.state_at(StepIndex::from_raw(6)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_checkpoint_reconstruction_matches_linear_replay() {
        let mut recon = Reconstructor::new(fixture());
        for step in 0..10 {
            let via_checkpoint = recon.state_at(StepIndex::from_raw(step)).unwrap();
            let via_linear = linear_state_at(&mut recon, step);
            assert_eq!(via_checkpoint, via_linear, "diverged at step {}", step);
        }
    }

    #[test]
    fn test_state_at_out_of_bounds() {
        let mut recon = Reconstructor::new(fixture());
        assert!(recon.state_at(StepIndex::from_raw(10)).is_err());
    }

    #[test]
    fn test_seek_seven_scenario() {
        // Log with 10 steps, checkpoint interval 4: state at step 7 must
        // match replaying steps 0..=7 sequentially.
        let mut recon = Reconstructor::new(fixture());
        let reconstructed = recon.state_at(StepIndex::from_raw(7)).unwrap();
        let sequential = linear_state_at(&mut recon, 7);
        assert_eq!(reconstructed, sequential);
    }
}
