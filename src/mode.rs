//! Operating mode handshake
//!
//! Every transition is a request bit in MCR that the controller confirms
//! through an acknowledge bit in MSR once the bus allows it.

use crate::can_error::CanError;
use crate::config::Mode;
use crate::mmio::RegisterAccess;
use crate::rcc::ResetControl;
use crate::registers::{Bitfield, Field, McrField, MsrField, MCR, MSR};
use crate::Can;

impl<R: RegisterAccess> Can<R> {
    /// Pulses the peripheral reset line. The controller comes back in sleep
    /// mode with every register at its reset value.
    pub fn reset<C: ResetControl>(&mut self, rcc: &mut C) {
        rcc.assert_reset(self.instance);
        rcc.clear_reset(self.instance);

        log::debug!("{:?} reset", self.instance);
    }

    pub fn enter_init(&mut self) {
        self.modify_reg(MCR, |reg| reg | McrField::INRQ.mask());
    }

    pub fn leave_init(&mut self) {
        self.modify_reg(MCR, |reg| reg & !McrField::INRQ.mask());
    }

    pub fn enter_sleep(&mut self) {
        self.modify_reg(MCR, |reg| reg | McrField::SLEEP.mask());
    }

    pub fn leave_sleep(&mut self) {
        self.modify_reg(MCR, |reg| reg & !McrField::SLEEP.mask());
    }

    pub fn is_init(&self) -> bool {
        self.msr().is_set(MsrField::INAK)
    }

    pub fn is_sleep(&self) -> bool {
        self.msr().is_set(MsrField::SLAK)
    }

    pub fn mode(&self) -> Mode {
        let msr = self.msr();

        if msr.is_set(MsrField::INAK) {
            Mode::Init
        } else if msr.is_set(MsrField::SLAK) {
            Mode::Sleep
        } else {
            Mode::Normal
        }
    }

    /// Wakes the controller, requests init mode and polls for the
    /// acknowledge. On timeout the mode is whatever the hardware settled in.
    pub fn enter_init_blocking(&mut self) -> Result<(), CanError> {
        self.modify_reg(MCR, |reg| {
            (reg & !McrField::SLEEP.mask()) | McrField::INRQ.mask()
        });

        if !self.wait_for(|can| can.is_init()) {
            log::warn!("{:?} init request not acknowledged", self.instance);
            return Err(CanError::InitTimeout);
        }

        log::debug!("{:?} entered init", self.instance);
        Ok(())
    }

    /// Requests normal mode. The controller only leaves init after seeing
    /// 11 recessive bits on the bus.
    pub fn leave_init_blocking(&mut self) -> Result<(), CanError> {
        self.leave_init();

        if !self.wait_for(|can| !can.is_init()) {
            log::warn!("{:?} did not leave init", self.instance);
            return Err(CanError::LeaveInitTimeout);
        }

        log::debug!("{:?} left init", self.instance);
        Ok(())
    }

    pub fn enter_sleep_blocking(&mut self) -> Result<(), CanError> {
        self.enter_sleep();

        if !self.wait_for(|can| can.is_sleep()) {
            log::warn!("{:?} sleep request not acknowledged", self.instance);
            return Err(CanError::SleepTimeout);
        }

        Ok(())
    }

    pub fn leave_sleep_blocking(&mut self) -> Result<(), CanError> {
        self.leave_sleep();

        if !self.wait_for(|can| !can.is_sleep()) {
            log::warn!("{:?} did not wake up", self.instance);
            return Err(CanError::WakeupTimeout);
        }

        Ok(())
    }

    pub(crate) fn msr(&self) -> Bitfield<MsrField> {
        Bitfield::from_bits(self.read_reg(MSR))
    }

    /// Polls `f` up to `ack_timeout` times, returning whether it came true.
    fn wait_for<F>(&self, f: F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        for _ in 0..self.ack_timeout {
            if f(self) {
                return true;
            }
        }

        f(self)
    }
}
