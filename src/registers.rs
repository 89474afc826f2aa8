//! bxCAN register map
//!
//! Offsets are relative to the controller base address. Each register that
//! is decoded field-by-field gets a field enum with its mask and shift, in
//! the same way for every register, and values are handled through
//! [`Bitfield`].

use core::marker::PhantomData;

pub const MCR: usize = 0x000;
pub const MSR: usize = 0x004;
pub const TSR: usize = 0x008;
pub const RF0R: usize = 0x00C;
pub const RF1R: usize = 0x010;
pub const IER: usize = 0x014;
pub const ESR: usize = 0x018;
pub const BTR: usize = 0x01C;

pub const TX_MAILBOX_BASE: usize = 0x180;
pub const RX_FIFO_BASE: usize = 0x1B0;
pub const MAILBOX_STRIDE: usize = 0x10;

/// Identifier register within a mailbox / FIFO output slot.
pub const MB_IR: usize = 0x0;
/// Data length and timestamp register.
pub const MB_DTR: usize = 0x4;
/// Payload bytes 0..4.
pub const MB_DLR: usize = 0x8;
/// Payload bytes 4..8.
pub const MB_DHR: usize = 0xC;

pub const FMR: usize = 0x200;
pub const FM1R: usize = 0x204;
pub const FS1R: usize = 0x20C;
pub const FFA1R: usize = 0x214;
pub const FA1R: usize = 0x21C;
pub const FILTER_BANK_BASE: usize = 0x240;
pub const FILTER_BANK_STRIDE: usize = 0x8;

/// One past the last register offset of the block.
pub const BLOCK_SIZE: usize = FILTER_BANK_BASE + 28 * FILTER_BANK_STRIDE;

pub fn tx_mailbox(index: usize) -> usize {
    TX_MAILBOX_BASE + index * MAILBOX_STRIDE
}

pub fn rx_fifo(index: usize) -> usize {
    RX_FIFO_BASE + index * MAILBOX_STRIDE
}

pub fn rx_fifo_status(index: usize) -> usize {
    if index == 0 {
        RF0R
    } else {
        RF1R
    }
}

/// `reg` is 0 for FiR1 and 1 for FiR2.
pub fn filter_bank(bank: usize, reg: usize) -> usize {
    FILTER_BANK_BASE + bank * FILTER_BANK_STRIDE + reg * 4
}

pub trait Field: Copy {
    fn mask(&self) -> u32;
    fn shift(&self) -> u32;
}

/// A register value decoded through the fields of one register.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Bitfield<F> {
    val: u32,
    _field: PhantomData<F>,
}

impl<F: Field> Bitfield<F> {
    pub fn new() -> Self {
        Self::from_bits(0)
    }

    pub fn from_bits(val: u32) -> Self {
        Self {
            val,
            _field: PhantomData,
        }
    }

    pub fn bits(&self) -> u32 {
        self.val
    }

    pub fn write_field(&mut self, field: F, value: u32) {
        self.val = (self.val & (!field.mask())) | ((value << field.shift()) & field.mask());
    }

    pub fn read_field(&self, field: F) -> u32 {
        (self.val & field.mask()) >> field.shift()
    }

    pub fn is_set(&self, field: F) -> bool {
        self.val & field.mask() != 0
    }

    pub fn set(&mut self, field: F, state: bool) {
        self.write_field(field, if state { field.mask() >> field.shift() } else { 0 });
    }
}

impl<F: Field> Default for Bitfield<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> core::fmt::Debug for Bitfield<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", self.val)
    }
}

/// Master control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McrField {
    DBF,
    RESET,
    TTCM,
    ABOM,
    AWUM,
    NART,
    RFLM,
    TXFP,
    SLEEP,
    INRQ,
}

impl Field for McrField {
    fn mask(&self) -> u32 {
        1 << self.shift()
    }

    fn shift(&self) -> u32 {
        match self {
            McrField::DBF => 16,
            McrField::RESET => 15,
            McrField::TTCM => 7,
            McrField::ABOM => 6,
            McrField::AWUM => 5,
            McrField::NART => 4,
            McrField::RFLM => 3,
            McrField::TXFP => 2,
            McrField::SLEEP => 1,
            McrField::INRQ => 0,
        }
    }
}

/// Master status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsrField {
    RX,
    SAMP,
    RXM,
    TXM,
    SLAKI,
    WKUI,
    ERRI,
    SLAK,
    INAK,
}

impl Field for MsrField {
    fn mask(&self) -> u32 {
        1 << self.shift()
    }

    fn shift(&self) -> u32 {
        match self {
            MsrField::RX => 11,
            MsrField::SAMP => 10,
            MsrField::RXM => 9,
            MsrField::TXM => 8,
            MsrField::SLAKI => 4,
            MsrField::WKUI => 3,
            MsrField::ERRI => 2,
            MsrField::SLAK => 1,
            MsrField::INAK => 0,
        }
    }
}

/// Transmit status register. Per-mailbox fields carry the mailbox index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsrField {
    LOW(usize),
    TME(usize),
    CODE,
    ABRQ(usize),
    TERR(usize),
    ALST(usize),
    TXOK(usize),
    RQCP(usize),
}

impl Field for TsrField {
    fn mask(&self) -> u32 {
        match self {
            TsrField::CODE => 0x3 << 24,
            _ => 1 << self.shift(),
        }
    }

    fn shift(&self) -> u32 {
        match *self {
            TsrField::LOW(mb) => 29 + mb as u32,
            TsrField::TME(mb) => 26 + mb as u32,
            TsrField::CODE => 24,
            TsrField::ABRQ(mb) => 7 + 8 * mb as u32,
            TsrField::TERR(mb) => 3 + 8 * mb as u32,
            TsrField::ALST(mb) => 2 + 8 * mb as u32,
            TsrField::TXOK(mb) => 1 + 8 * mb as u32,
            TsrField::RQCP(mb) => 8 * mb as u32,
        }
    }
}

/// Receive FIFO status registers (RF0R / RF1R).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfrField {
    RFOM,
    FOVR,
    FULL,
    FMP,
}

impl Field for RfrField {
    fn mask(&self) -> u32 {
        match self {
            RfrField::RFOM => 1 << 5,
            RfrField::FOVR => 1 << 4,
            RfrField::FULL => 1 << 3,
            RfrField::FMP => 0x3,
        }
    }

    fn shift(&self) -> u32 {
        match self {
            RfrField::RFOM => 5,
            RfrField::FOVR => 4,
            RfrField::FULL => 3,
            RfrField::FMP => 0,
        }
    }
}

/// Error status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EsrField {
    REC,
    TEC,
    LEC,
    BOFF,
    EPVF,
    EWGF,
}

impl Field for EsrField {
    fn mask(&self) -> u32 {
        match self {
            EsrField::REC => 0xFF00_0000,
            EsrField::TEC => 0xFF_0000,
            EsrField::LEC => 0x70,
            EsrField::BOFF => 0x4,
            EsrField::EPVF => 0x2,
            EsrField::EWGF => 0x1,
        }
    }

    fn shift(&self) -> u32 {
        match self {
            EsrField::REC => 24,
            EsrField::TEC => 16,
            EsrField::LEC => 4,
            EsrField::BOFF => 2,
            EsrField::EPVF => 1,
            EsrField::EWGF => 0,
        }
    }
}

/// Bit timing register. SJW, TS1, TS2 and BRP hold "quanta minus one".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtrField {
    SILM,
    LBKM,
    SJW,
    TS2,
    TS1,
    BRP,
}

impl Field for BtrField {
    fn mask(&self) -> u32 {
        match self {
            BtrField::SILM => 0x8000_0000,
            BtrField::LBKM => 0x4000_0000,
            BtrField::SJW => 0x300_0000,
            BtrField::TS2 => 0x70_0000,
            BtrField::TS1 => 0xF_0000,
            BtrField::BRP => 0x3FF,
        }
    }

    fn shift(&self) -> u32 {
        match self {
            BtrField::SILM => 31,
            BtrField::LBKM => 30,
            BtrField::SJW => 24,
            BtrField::TS2 => 20,
            BtrField::TS1 => 16,
            BtrField::BRP => 0,
        }
    }
}

/// Identifier register of a transmit mailbox (TIxR) or FIFO slot (RIxR).
/// TXRQ only exists on the transmit side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    STID,
    EXID,
    IDE,
    RTR,
    TXRQ,
}

impl Field for IdField {
    fn mask(&self) -> u32 {
        match self {
            IdField::STID => 0xFFE0_0000,
            IdField::EXID => 0xFFFF_FFF8,
            IdField::IDE => 0x4,
            IdField::RTR => 0x2,
            IdField::TXRQ => 0x1,
        }
    }

    fn shift(&self) -> u32 {
        match self {
            IdField::STID => 21,
            IdField::EXID => 3,
            IdField::IDE => 2,
            IdField::RTR => 1,
            IdField::TXRQ => 0,
        }
    }
}

/// Length and timestamp register (TDTxR / RDTxR). FMI only exists on the
/// receive side, TGT only on the transmit side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtrField {
    TIME,
    FMI,
    TGT,
    DLC,
}

impl Field for DtrField {
    fn mask(&self) -> u32 {
        match self {
            DtrField::TIME => 0xFFFF_0000,
            DtrField::FMI => 0xFF00,
            DtrField::TGT => 0x100,
            DtrField::DLC => 0xF,
        }
    }

    fn shift(&self) -> u32 {
        match self {
            DtrField::TIME => 16,
            DtrField::FMI => 8,
            DtrField::TGT => 8,
            DtrField::DLC => 0,
        }
    }
}

/// Filter master register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmrField {
    CAN2SB,
    FINIT,
}

impl Field for FmrField {
    fn mask(&self) -> u32 {
        match self {
            FmrField::CAN2SB => 0x3F << 8,
            FmrField::FINIT => 0x1,
        }
    }

    fn shift(&self) -> u32 {
        match self {
            FmrField::CAN2SB => 8,
            FmrField::FINIT => 0,
        }
    }
}
