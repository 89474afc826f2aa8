//! Interrupt related things
//!
//! Only the enable register is handled here. Vectors and handlers belong to
//! the application, which reads the status flags through the FIFO, mailbox
//! and error status accessors.

use crate::mmio::RegisterAccess;
use crate::registers::IER;
use crate::Can;

/// Interrupt sources of the enable register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    TransmitMailboxEmpty,
    Fifo0MessagePending,
    Fifo0Full,
    Fifo0Overrun,
    Fifo1MessagePending,
    Fifo1Full,
    Fifo1Overrun,
    ErrorWarning,
    ErrorPassive,
    BusOff,
    LastErrorCode,
    Error,
    Wakeup,
    Sleep,
}

impl Interrupt {
    pub fn mask(&self) -> u32 {
        match self {
            Interrupt::TransmitMailboxEmpty => 1 << 0,
            Interrupt::Fifo0MessagePending => 1 << 1,
            Interrupt::Fifo0Full => 1 << 2,
            Interrupt::Fifo0Overrun => 1 << 3,
            Interrupt::Fifo1MessagePending => 1 << 4,
            Interrupt::Fifo1Full => 1 << 5,
            Interrupt::Fifo1Overrun => 1 << 6,
            Interrupt::ErrorWarning => 1 << 8,
            Interrupt::ErrorPassive => 1 << 9,
            Interrupt::BusOff => 1 << 10,
            Interrupt::LastErrorCode => 1 << 11,
            Interrupt::Error => 1 << 15,
            Interrupt::Wakeup => 1 << 16,
            Interrupt::Sleep => 1 << 17,
        }
    }
}

impl<R: RegisterAccess> Can<R> {
    pub fn enable_interrupt(&mut self, interrupt: Interrupt) {
        self.modify_reg(IER, |reg| reg | interrupt.mask());
    }

    pub fn disable_interrupt(&mut self, interrupt: Interrupt) {
        self.modify_reg(IER, |reg| reg & !interrupt.mask());
    }

    /// Enables every source in `interrupts` with a single write.
    pub fn enable_interrupts(&mut self, interrupts: &[Interrupt]) {
        let mask = interrupts.iter().fold(0, |mask, interrupt| mask | interrupt.mask());
        self.modify_reg(IER, |reg| reg | mask);
    }

    /// Disables every source in `interrupts` with a single write.
    pub fn disable_interrupts(&mut self, interrupts: &[Interrupt]) {
        let mask = interrupts.iter().fold(0, |mask, interrupt| mask | interrupt.mask());
        self.modify_reg(IER, |reg| reg & !mask);
    }

    pub fn is_interrupt_enabled(&self, interrupt: Interrupt) -> bool {
        self.read_reg(IER) & interrupt.mask() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Instance;
    use crate::sim::SimRegisters;

    #[test]
    fn sources_map_to_their_bits() {
        let mut can = Can::new(SimRegisters::new(), Instance::Can1);

        can.enable_interrupts(&[
            Interrupt::Fifo0MessagePending,
            Interrupt::Fifo1Overrun,
            Interrupt::Error,
            Interrupt::Sleep,
        ]);

        assert_eq!(can.registers().peek(IER), 0x0002_8042);
        assert!(can.is_interrupt_enabled(Interrupt::Error));
        assert!(!can.is_interrupt_enabled(Interrupt::BusOff));
    }

    #[test]
    fn disable_touches_one_source() {
        let mut can = Can::new(SimRegisters::new(), Instance::Can1);
        can.enable_interrupt(Interrupt::TransmitMailboxEmpty);
        can.enable_interrupt(Interrupt::LastErrorCode);

        can.disable_interrupt(Interrupt::TransmitMailboxEmpty);

        assert_eq!(can.registers().peek(IER), 1 << 11);

        can.disable_interrupts(&[Interrupt::LastErrorCode, Interrupt::Wakeup]);
        assert_eq!(can.registers().peek(IER), 0);
    }
}
