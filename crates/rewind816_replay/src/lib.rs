//! REWIND816 Replay Engine
//!
//! Deterministic reconstruction of machine state from a recorded trace:
//! seek to any step, walk forward and back, and halt on breakpoints,
//! without re-executing the original program.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod breakpoint;
pub mod engine;
pub mod memory;
pub mod session;
pub mod state;

pub use breakpoint::{Breakpoint, BreakpointId, BreakpointRegistry};
pub use engine::{EngineError, Phase, ReplayEngine, StepOutcome};
pub use memory::{MemValue, MemoryImage};
pub use session::{ReplaySession, ScanSummary, StepView};
pub use state::{MachineState, Reconstructor};
