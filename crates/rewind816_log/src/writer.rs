//! Trace log producer.
//!
//! The recording side of the format: folds each appended event into a
//! running machine state, emits a checkpoint frame ahead of every
//! interval-th step, and patches the trailer offset into the preamble on
//! finish. The replay core never writes logs; this exists for fixtures,
//! tests, and external producers that want the reference implementation
//! of the format.

use crate::checkpoint::{Checkpoint, CheckpointSlot};
use crate::encoding::FrameWriter;
use crate::event::TraceEvent;
use crate::format::{encode_preamble, Record, Trailer, PREAMBLE_LEN};
use rewind816_core::{CoreError, CoreResult, MappedRegion, Registers};
use std::collections::BTreeMap;
use std::io::{Seek, SeekFrom, Write};

/// Streaming trace log writer
pub struct LogWriter<W> {
    frames: FrameWriter<W>,
    interval: u32,
    regions: Vec<MappedRegion>,
    registers: Registers,
    memory: BTreeMap<u32, u8>,
    slots: Vec<CheckpointSlot>,
    next_step: u64,
}

impl<W: Write + Seek> LogWriter<W> {
    /// Start a new log on the sink
    ///
    /// The initial register snapshot is the machine state before step 0.
    ///
    /// # Errors
    ///
    /// Fails on a zero interval or when the preamble cannot be written
    pub fn new(
        mut sink: W,
        checkpoint_interval: u32,
        initial_registers: Registers,
        regions: Vec<MappedRegion>,
    ) -> CoreResult<Self> {
        if checkpoint_interval == 0 {
            return Err(CoreError::Format {
                reason: "checkpoint interval of zero".to_string(),
            });
        }
        sink.seek(SeekFrom::Start(0))?;
        // Placeholder preamble; the trailer offset is patched in finish().
        sink.write_all(&encode_preamble(0))?;
        Ok(Self {
            frames: FrameWriter::new(sink),
            interval: checkpoint_interval,
            regions,
            registers: initial_registers,
            memory: BTreeMap::new(),
            slots: Vec::new(),
            next_step: 0,
        })
    }

    /// Steps appended so far
    #[must_use]
    pub fn steps_written(&self) -> u64 {
        self.next_step
    }

    /// Append the next executed step
    ///
    /// # Errors
    ///
    /// Fails when the event's step index is not the next dense index, or
    /// when the sink cannot be written.
    pub fn append(&mut self, event: TraceEvent) -> CoreResult<()> {
        if event.step.as_u64() != self.next_step {
            return Err(CoreError::Format {
                reason: format!(
                    "appended step {} where step #{} was expected",
                    event.step, self.next_step
                ),
            });
        }

        // Fold the event into the running state first: a checkpoint frame
        // captures the state after its own step.
        self.registers.set_pc(event.pc);
        for write in &event.reg_writes {
            self.registers.apply(write);
        }
        for access in &event.mem_accesses {
            self.memory.insert(access.address & 0xFF_FFFF, access.value);
        }

        if self.next_step % u64::from(self.interval) == 0 {
            let checkpoint = Checkpoint::new(event.step, self.registers, self.memory.clone());
            let rel = self.frames.write_frame(&Record::Checkpoint(checkpoint))?;
            self.slots.push(CheckpointSlot {
                step: event.step,
                offset: PREAMBLE_LEN + rel,
            });
        }
        self.frames.write_frame(&Record::Step(event))?;
        self.next_step += 1;
        Ok(())
    }

    /// Write the trailer, patch the preamble, and return the sink
    ///
    /// # Errors
    ///
    /// Fails when the trailer or preamble cannot be written
    pub fn finish(mut self) -> CoreResult<W> {
        let trailer = Trailer {
            checkpoint_interval: self.interval,
            total_steps: self.next_step,
            regions: self.regions,
            checkpoints: self.slots,
        };
        let rel = self.frames.write_frame(&trailer)?;
        let trailer_offset = PREAMBLE_LEN + rel;
        self.frames.flush()?;

        let mut sink = self.frames.into_inner();
        sink.seek(SeekFrom::Start(0))?;
        sink.write_all(&encode_preamble(trailer_offset))?;
        sink.flush()?;
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LogStore;
    use rewind816_core::{RegField, RegWrite, StepIndex};
    use std::io::Cursor;

    #[test]
    fn test_empty_log_roundtrip() {
        let writer = LogWriter::new(Cursor::new(Vec::new()), 4, Registers::new(), Vec::new())
            .unwrap();
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);

        let store = LogStore::open(cursor).unwrap();
        assert_eq!(store.total_steps(), 0);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let result = LogWriter::new(Cursor::new(Vec::new()), 0, Registers::new(), Vec::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_sparse_steps() {
        let mut writer =
            LogWriter::new(Cursor::new(Vec::new()), 4, Registers::new(), Vec::new()).unwrap();
        let result = writer.append(TraceEvent::new(StepIndex::from_raw(5), 0x8000));
        assert!(result.is_err());
    }

    #[test]
    fn test_checkpoint_cadence() {
        let mut writer =
            LogWriter::new(Cursor::new(Vec::new()), 3, Registers::new(), Vec::new()).unwrap();
        for i in 0..7 {
            writer
                .append(TraceEvent::new(StepIndex::from_raw(i), 0x8000))
                .unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);

        let store = LogStore::open(cursor).unwrap();
        // Checkpoints at steps 0, 3 and 6.
        assert_eq!(
            store
                .nearest_slot_at_or_before(StepIndex::from_raw(5))
                .unwrap()
                .step,
            StepIndex::from_raw(3)
        );
        assert_eq!(
            store
                .nearest_slot_at_or_before(StepIndex::from_raw(6))
                .unwrap()
                .step,
            StepIndex::from_raw(6)
        );
    }

    #[test]
    fn test_checkpoint_folds_memory_and_registers() {
        let mut writer =
            LogWriter::new(Cursor::new(Vec::new()), 2, Registers::new(), Vec::new()).unwrap();
        writer
            .append(
                TraceEvent::new(StepIndex::from_raw(0), 0x8000)
                    .with_reg(RegWrite::wide(RegField::A, 0x1111)),
            )
            .unwrap();
        writer
            .append(
                TraceEvent::new(StepIndex::from_raw(1), 0x8003)
                    .with_mem(crate::event::MemAccess::write(0x7E0000, 0xAB)),
            )
            .unwrap();
        writer
            .append(
                TraceEvent::new(StepIndex::from_raw(2), 0x8006)
                    .with_reg(RegWrite::low(RegField::A, 0x22)),
            )
            .unwrap();
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);

        let mut store = LogStore::open(cursor).unwrap();
        let cp = store
            .nearest_checkpoint_at_or_before(StepIndex::from_raw(2))
            .unwrap();
        assert_eq!(cp.step, StepIndex::from_raw(2));
        assert_eq!(cp.registers.a(), 0x1122); // low-byte write preserved the high byte
        assert_eq!(cp.registers.pc(), 0x8006);
        assert_eq!(cp.memory.get(&0x7E0000), Some(&0xAB));
    }
}
