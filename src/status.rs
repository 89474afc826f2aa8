//! Error and status flags
//!
//! The controller counts errors and enters error passive or bus-off on its
//! own. These are snapshots only; recovery is up to the caller.

use embedded_hal::can::ErrorKind;

use crate::mmio::RegisterAccess;
use crate::registers::{Bitfield, EsrField, Field, MsrField, ESR, MSR};
use crate::Can;

/// Last error seen on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastErrorCode {
    NoError,
    Stuff,
    Form,
    Acknowledge,
    BitRecessive,
    BitDominant,
    Crc,
    /// Written by software, never by the hardware. Used to spot new codes.
    SetBySoftware,
}

impl LastErrorCode {
    fn from_bits(bits: u32) -> Self {
        match bits & 0x7 {
            0 => LastErrorCode::NoError,
            1 => LastErrorCode::Stuff,
            2 => LastErrorCode::Form,
            3 => LastErrorCode::Acknowledge,
            4 => LastErrorCode::BitRecessive,
            5 => LastErrorCode::BitDominant,
            6 => LastErrorCode::Crc,
            _ => LastErrorCode::SetBySoftware,
        }
    }

    /// Matching [`ErrorKind`], `None` when no bus error is recorded.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            LastErrorCode::NoError | LastErrorCode::SetBySoftware => None,
            LastErrorCode::Stuff => Some(ErrorKind::Stuff),
            LastErrorCode::Form => Some(ErrorKind::Form),
            LastErrorCode::Acknowledge => Some(ErrorKind::Acknowledge),
            LastErrorCode::BitRecessive | LastErrorCode::BitDominant => Some(ErrorKind::Bit),
            LastErrorCode::Crc => Some(ErrorKind::Crc),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorStatus {
    pub tec: u8,
    pub rec: u8,
    pub last_error: LastErrorCode,
    pub bus_off: bool,
    pub error_passive: bool,
    pub error_warning: bool,
}

/// Status change interrupt flags of MSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusInterrupts {
    /// ERRI: an error condition flagged in ESR raised the error interrupt
    pub error: bool,
    /// WKUI: start of frame seen while asleep
    pub wakeup: bool,
    /// SLAKI: sleep mode was entered
    pub sleep: bool,
}

impl<R: RegisterAccess> Can<R> {
    pub fn error_status(&self) -> ErrorStatus {
        let esr: Bitfield<EsrField> = Bitfield::from_bits(self.read_reg(ESR));

        ErrorStatus {
            tec: esr.read_field(EsrField::TEC) as u8,
            rec: esr.read_field(EsrField::REC) as u8,
            last_error: LastErrorCode::from_bits(esr.read_field(EsrField::LEC)),
            bus_off: esr.is_set(EsrField::BOFF),
            error_passive: esr.is_set(EsrField::EPVF),
            error_warning: esr.is_set(EsrField::EWGF),
        }
    }

    /// Marks the last error code as read, so the next bus error shows up as
    /// a change.
    pub fn reset_last_error_code(&mut self) {
        self.write_reg(ESR, EsrField::LEC.mask());
    }

    /// Current level of the receive pin.
    pub fn rx_level(&self) -> bool {
        self.msr().is_set(MsrField::RX)
    }

    pub fn status_interrupts(&self) -> StatusInterrupts {
        let msr = self.msr();

        StatusInterrupts {
            error: msr.is_set(MsrField::ERRI),
            wakeup: msr.is_set(MsrField::WKUI),
            sleep: msr.is_set(MsrField::SLAKI),
        }
    }

    pub fn clear_status_interrupts(&mut self) {
        self.write_reg(
            MSR,
            MsrField::ERRI.mask() | MsrField::WKUI.mask() | MsrField::SLAKI.mask(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Instance;
    use crate::sim::SimRegisters;

    fn can() -> Can<SimRegisters> {
        Can::new(SimRegisters::new(), Instance::Can1)
    }

    #[test]
    fn decodes_counters_and_flags() {
        let mut can = can();
        can.registers_mut().poke(ESR, 0x85FF_0036);

        let status = can.error_status();

        assert_eq!(status.rec, 0x85);
        assert_eq!(status.tec, 0xFF);
        assert_eq!(status.last_error, LastErrorCode::Acknowledge);
        assert!(status.bus_off && status.error_passive);
        assert!(!status.error_warning);
        assert_eq!(status.last_error.kind(), Some(ErrorKind::Acknowledge));
    }

    #[test]
    fn software_code_only_touches_lec() {
        let mut can = can();
        can.registers_mut().poke(ESR, 0x1020_0051);

        can.reset_last_error_code();

        assert_eq!(can.registers().peek(ESR), 0x1020_0071);
        assert_eq!(can.error_status().last_error, LastErrorCode::SetBySoftware);
        assert_eq!(can.error_status().last_error.kind(), None);
    }

    #[test]
    fn status_interrupts_are_told_apart() {
        let mut can = can();

        can.registers_mut().poke(MSR, 0x0000_0004);
        assert!(can.status_interrupts().error);
        assert!(!can.status_interrupts().wakeup && !can.status_interrupts().sleep);

        can.registers_mut().poke(MSR, 0x0000_0010);
        let flags = can.status_interrupts();
        assert!(flags.sleep);
        assert!(!flags.error && !flags.wakeup);
    }

    #[test]
    fn status_interrupts_clear_together() {
        let mut can = can();
        can.registers_mut().poke(MSR, 0x0000_0C1C);
        assert_eq!(
            can.status_interrupts(),
            StatusInterrupts {
                error: true,
                wakeup: true,
                sleep: true
            }
        );
        assert!(can.rx_level());

        can.clear_status_interrupts();

        assert_eq!(can.status_interrupts(), StatusInterrupts::default());
        assert_eq!(can.registers().peek(MSR), 0x0000_0C00);
    }
}
