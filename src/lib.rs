//! Register-level driver for the bxCAN controller of STM32F devices
//!
//! A [`Can`] handle owns the register block of one controller. Bring-up is
//! reset, enter init, apply timing, set options and filters, leave init.
//! After that frames go out through [`Can::transmit`] and come in through
//! [`Can::receive`].
//!
//! The driver is mechanism only. Calls never block except the `*_blocking`
//! mode transitions, which poll a bounded number of times. Nothing is
//! retried and nothing is locked: a caller sharing a controller between an
//! interrupt handler and thread code must serialize access itself.

#![cfg_attr(not(test), no_std)]

pub mod can_error;
pub mod config;
mod embedded_can;
pub mod filter;
mod init;
pub mod interrupt;
pub mod mailbox;
pub mod mmio;
mod mode;
pub mod rcc;
pub mod receive;
pub mod registers;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod status;
pub mod timing;
pub mod transfer;
pub(crate) mod util;

pub use can_error::{CanError, RxTxError};
pub use config::{Config, Fifo, FilterMode, FilterScale, Id, Instance, Mailbox, Mode, Options};
pub use filter::FilterBank;
pub use interrupt::Interrupt;
pub use mailbox::TxStatus;
pub use mmio::{Mmio, RegisterAccess};
pub use receive::RxFrame;
pub use status::{ErrorStatus, LastErrorCode, StatusInterrupts};
pub use timing::BitTiming;
pub use transfer::Frame;

static mut TAKEN: [bool; 2] = [false; 2];

pub struct Can<R> {
    regs: R,
    instance: Instance,
    ack_timeout: u32,
}

impl Can<Mmio> {
    /// Hands out the memory-mapped controller once per instance.
    pub fn take(instance: Instance) -> Option<Self> {
        cortex_m::interrupt::free(|_| unsafe {
            if TAKEN[instance.index()] {
                None
            } else {
                TAKEN[instance.index()] = true;

                Some(Can::new(Mmio::new(instance.base_address()), instance))
            }
        })
    }
}

impl<R: RegisterAccess> Can<R> {
    pub fn new(regs: R, instance: Instance) -> Self {
        Self {
            regs,
            instance,
            ack_timeout: config::ACK_TIMEOUT,
        }
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    /// Number of acknowledge polls the blocking mode transitions make.
    pub fn set_ack_timeout(&mut self, polls: u32) {
        self.ack_timeout = polls;
    }

    pub fn ack_timeout(&self) -> u32 {
        self.ack_timeout
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Gives the register block back.
    pub fn free(self) -> R {
        self.regs
    }

    pub(crate) fn read_reg(&self, offset: usize) -> u32 {
        self.regs.read(offset)
    }

    pub(crate) fn write_reg(&mut self, offset: usize, value: u32) {
        self.regs.write(offset, value);
    }

    pub(crate) fn modify_reg<F>(&mut self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        self.regs.modify(offset, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimRegisters;

    #[test]
    fn handle_keeps_its_instance_and_timeout() {
        let mut can = Can::new(SimRegisters::new(), Instance::Can2);
        assert_eq!(can.instance(), Instance::Can2);
        assert_eq!(can.ack_timeout(), 0xFFFF);

        can.set_ack_timeout(10);
        assert_eq!(can.ack_timeout(), 10);
    }

    #[test]
    fn free_returns_the_register_block() {
        let mut can = Can::new(SimRegisters::new(), Instance::Can1);
        can.write_reg(registers::IER, 0x3);
        let sim = can.free();
        assert_eq!(sim.peek(registers::IER), 0x3);
    }
}
