//! The 65C816-style register file.
//!
//! The accumulator and index registers are 16 bits wide with 8-bit views
//! onto each byte. Width-switched code writes through those views, so all
//! register mutation goes through a value/mask pair: the masked bits are
//! replaced and the rest of the register is left untouched.

use serde::{Deserialize, Serialize};

/// Processor status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum StatusFlag {
    /// Carry
    Carry = 0x0001,
    /// Zero
    Zero = 0x0002,
    /// IRQ disable
    IrqDisable = 0x0004,
    /// Decimal mode
    Decimal = 0x0008,
    /// Index registers are 8 bits wide when set
    IndexWidth = 0x0010,
    /// Accumulator is 8 bits wide when set
    MemoryWidth = 0x0020,
    /// Overflow
    Overflow = 0x0040,
    /// Negative
    Negative = 0x0080,
    /// Emulation mode
    Emulation = 0x0100,
}

/// Which register a delta writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegField {
    /// Accumulator
    A,
    /// X index register
    X,
    /// Y index register
    Y,
    /// Stack pointer
    S,
    /// Processor status
    P,
    /// Direct-page register
    Dp,
    /// Data-bank register
    Db,
}

/// One masked register write from a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegWrite {
    /// Target register
    pub field: RegField,
    /// New value for the masked bits
    pub value: u16,
    /// Which bits of the register the write touches
    pub mask: u16,
}

impl RegWrite {
    /// Full-width write
    #[must_use]
    pub const fn wide(field: RegField, value: u16) -> Self {
        Self {
            field,
            value,
            mask: 0xFFFF,
        }
    }

    /// Low-byte write
    #[must_use]
    pub const fn low(field: RegField, value: u8) -> Self {
        Self {
            field,
            value: value as u16,
            mask: 0x00FF,
        }
    }

    /// High-byte write
    #[must_use]
    pub const fn high(field: RegField, value: u8) -> Self {
        Self {
            field,
            value: (value as u16) << 8,
            mask: 0xFF00,
        }
    }
}

/// Full register snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Registers {
    a: u16,
    x: u16,
    y: u16,
    s: u16,
    p: u16,
    dp: u16,
    db: u8,
    pc: u32,
}

impl Registers {
    /// All registers zeroed
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            p: 0,
            dp: 0,
            db: 0,
            pc: 0,
        }
    }

    /// 16-bit accumulator
    #[must_use]
    pub const fn a(&self) -> u16 {
        self.a
    }

    /// Accumulator low byte
    #[must_use]
    pub const fn al(&self) -> u8 {
        (self.a & 0xFF) as u8
    }

    /// Accumulator high byte
    #[must_use]
    pub const fn ah(&self) -> u8 {
        (self.a >> 8) as u8
    }

    /// 16-bit X index register
    #[must_use]
    pub const fn x(&self) -> u16 {
        self.x
    }

    /// X low byte
    #[must_use]
    pub const fn xl(&self) -> u8 {
        (self.x & 0xFF) as u8
    }

    /// X high byte
    #[must_use]
    pub const fn xh(&self) -> u8 {
        (self.x >> 8) as u8
    }

    /// 16-bit Y index register
    #[must_use]
    pub const fn y(&self) -> u16 {
        self.y
    }

    /// Y low byte
    #[must_use]
    pub const fn yl(&self) -> u8 {
        (self.y & 0xFF) as u8
    }

    /// Y high byte
    #[must_use]
    pub const fn yh(&self) -> u8 {
        (self.y >> 8) as u8
    }

    /// Stack pointer
    #[must_use]
    pub const fn s(&self) -> u16 {
        self.s
    }

    /// Processor status word
    #[must_use]
    pub const fn p(&self) -> u16 {
        self.p
    }

    /// Direct-page register
    #[must_use]
    pub const fn dp(&self) -> u16 {
        self.dp
    }

    /// Data-bank register
    #[must_use]
    pub const fn db(&self) -> u8 {
        self.db
    }

    /// 24-bit program counter of the current step
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Whether a status flag is set
    #[must_use]
    pub const fn flag(&self, flag: StatusFlag) -> bool {
        self.p & (flag as u16) != 0
    }

    /// Set the program counter (masked to 24 bits)
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc & 0xFF_FFFF;
    }

    /// Set the masked bits of a register, leaving the rest untouched
    pub fn set_masked(&mut self, field: RegField, value: u16, mask: u16) {
        let reg = match field {
            RegField::A => &mut self.a,
            RegField::X => &mut self.x,
            RegField::Y => &mut self.y,
            RegField::S => &mut self.s,
            RegField::P => &mut self.p,
            RegField::Dp => &mut self.dp,
            RegField::Db => {
                self.db = ((value & mask) | (self.db as u16 & !mask)) as u8;
                return;
            }
        };
        *reg = (value & mask) | (*reg & !mask);
    }

    /// Apply one recorded register delta
    pub fn apply(&mut self, write: &RegWrite) {
        self.set_masked(write.field, write.value, write.mask);
    }
}
