//! Read-only access to a recorded trace.
//!
//! The store validates the preamble and trailer once at open, then reads
//! event frames on demand by seeking to the nearest checkpoint frame and
//! walking forward. Nothing is mutated after open and the event stream is
//! never materialized in full.

use crate::checkpoint::{Checkpoint, CheckpointSlot};
use crate::encoding::FrameReader;
use crate::event::TraceEvent;
use crate::format::{decode_preamble, Record, Trailer, PREAMBLE_LEN};
use rewind816_core::{CoreError, CoreResult, MappedRegion, StepIndex};
use std::io::{Read, Seek, SeekFrom};
use thiserror::Error;

/// Store-level error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A frame held a record of the wrong kind
    #[error("expected a {expected} record at offset {offset}")]
    WrongRecord {
        /// Kind the reader was positioned for
        expected: &'static str,
        /// Absolute file offset of the frame
        offset: u64,
    },
    /// Step indices in the event stream are not dense
    #[error("event stream skipped from step {prior} to step {actual}")]
    SparseSteps {
        /// Previously decoded step
        prior: u64,
        /// Step that followed it
        actual: u64,
    },
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Format {
            reason: err.to_string(),
        }
    }
}

/// Read-only handle to an opened trace log
pub struct LogStore<R> {
    reader: FrameReader<R>,
    trailer: Trailer,
}

impl<R: Read + Seek> LogStore<R> {
    /// Open and validate a trace log
    ///
    /// # Errors
    ///
    /// Fails with a format, version, or truncation error when the source
    /// is not a supported trace log.
    pub fn open(mut source: R) -> CoreResult<Self> {
        source.seek(SeekFrom::Start(0))?;
        let mut preamble = [0u8; PREAMBLE_LEN as usize];
        source
            .read_exact(&mut preamble)
            .map_err(|_| CoreError::Truncated { offset: 0 })?;
        let trailer_offset = decode_preamble(&preamble)?;

        let mut reader = FrameReader::new(source);
        let trailer: Trailer = reader.read_frame_at(trailer_offset)?;
        trailer.validate()?;

        tracing::debug!(
            total_steps = trailer.total_steps,
            interval = trailer.checkpoint_interval,
            checkpoints = trailer.checkpoints.len(),
            "opened trace log"
        );

        Ok(Self { reader, trailer })
    }

    /// Total steps in the recorded run
    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.trailer.total_steps
    }

    /// Steps between checkpoints
    #[must_use]
    pub fn checkpoint_interval(&self) -> u32 {
        self.trailer.checkpoint_interval
    }

    /// Address ranges the trace covers
    #[must_use]
    pub fn regions(&self) -> &[MappedRegion] {
        &self.trailer.regions
    }

    /// Whether any mapped region covers the address
    #[must_use]
    pub fn is_mapped(&self, address: u32) -> bool {
        self.trailer.regions.iter().any(|r| r.contains(address))
    }

    fn check_bounds(&self, step: StepIndex) -> CoreResult<()> {
        if step.as_u64() >= self.trailer.total_steps {
            return Err(CoreError::Range {
                index: step.as_u64(),
                limit: self.trailer.total_steps,
            });
        }
        Ok(())
    }

    /// Table slot of the nearest checkpoint at or before a step
    ///
    /// O(1): checkpoints sit at fixed intervals, so the slot index is a
    /// division.
    ///
    /// # Errors
    ///
    /// Fails with a range error when the step is out of bounds
    pub fn nearest_slot_at_or_before(&self, step: StepIndex) -> CoreResult<CheckpointSlot> {
        self.check_bounds(step)?;
        let idx = (step.as_u64() / u64::from(self.trailer.checkpoint_interval)) as usize;
        self.trailer
            .checkpoints
            .get(idx)
            .copied()
            .ok_or_else(|| CoreError::Format {
                reason: format!("checkpoint table has no slot for step {}", step),
            })
    }

    /// Load the nearest checkpoint at or before a step
    ///
    /// # Errors
    ///
    /// Fails with a range error when the step is out of bounds, or a
    /// format error when the frame is not a checkpoint.
    pub fn nearest_checkpoint_at_or_before(&mut self, step: StepIndex) -> CoreResult<Checkpoint> {
        let slot = self.nearest_slot_at_or_before(step)?;
        let record: Record = self.reader.read_frame_at(slot.offset)?;
        match record {
            Record::Checkpoint(cp) => Ok(cp),
            Record::Step(_) => Err(StoreError::WrongRecord {
                expected: "checkpoint",
                offset: slot.offset,
            }
            .into()),
        }
    }

    /// Load a checkpoint and a walker over the events that follow it
    ///
    /// The walker starts at the checkpoint's own step; callers folding
    /// deltas on top of the checkpoint state skip events at or before it.
    ///
    /// # Errors
    ///
    /// Fails with a range error when the step is out of bounds
    pub fn open_at(&mut self, step: StepIndex) -> CoreResult<(Checkpoint, EventWalker<'_, R>)> {
        let checkpoint = self.nearest_checkpoint_at_or_before(step)?;
        let prior = checkpoint.step;
        let total = self.trailer.total_steps;
        Ok((
            checkpoint,
            EventWalker {
                reader: &mut self.reader,
                prior: Some(prior),
                total,
                started: false,
            },
        ))
    }

    /// Random access to a single event
    ///
    /// # Errors
    ///
    /// Fails with a range error when the step is out of bounds
    pub fn event_at(&mut self, step: StepIndex) -> CoreResult<TraceEvent> {
        let (_, mut walker) = self.open_at(step)?;
        while let Some(event) = walker.next_event()? {
            if event.step == step {
                return Ok(event);
            }
        }
        Err(CoreError::Format {
            reason: format!("event stream ended before step {}", step),
        })
    }
}

/// Sequential walker over event records
pub struct EventWalker<'a, R> {
    reader: &'a mut FrameReader<R>,
    prior: Option<StepIndex>,
    total: u64,
    started: bool,
}

impl<R: Read + Seek> EventWalker<'_, R> {
    /// Read the next event, or `None` past the last recorded step
    ///
    /// Checkpoint frames interleaved in the stream are skipped. Step
    /// indices are verified to stay dense.
    ///
    /// # Errors
    ///
    /// Fails with a format error on a torn or out-of-order stream
    pub fn next_event(&mut self) -> CoreResult<Option<TraceEvent>> {
        // The walker begins on the checkpoint's own step, so the first
        // event decoded carries `prior` itself rather than its successor.
        loop {
            if let Some(prior) = self.prior
                && self.started
                && prior.as_u64() + 1 >= self.total
            {
                return Ok(None);
            }
            let record: Option<Record> = self.reader.read_frame()?;
            match record {
                None => return Ok(None),
                Some(Record::Checkpoint(_)) => continue,
                Some(Record::Step(event)) => {
                    if let Some(prior) = self.prior {
                        let expected = if self.started {
                            prior.as_u64() + 1
                        } else {
                            prior.as_u64()
                        };
                        if event.step.as_u64() != expected {
                            return Err(StoreError::SparseSteps {
                                prior: prior.as_u64(),
                                actual: event.step.as_u64(),
                            }
                            .into());
                        }
                    }
                    self.prior = Some(event.step);
                    self.started = true;
                    return Ok(Some(event));
                }
            }
        }
    }
}
