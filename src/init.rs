//! Does all initialization oriented things

use crate::can_error::CanError;
use crate::config::{Config, Options};
use crate::mmio::RegisterAccess;
use crate::rcc::PeripheralClock;
use crate::registers::{Bitfield, BtrField, McrField, BTR, MCR};
use crate::timing::BitTiming;
use crate::Can;

impl<R: RegisterAccess> Can<R> {
    /// Brings the controller from reset to normal mode: init mode, timing,
    /// options, debug modes, then back out of init.
    ///
    /// Nothing is written when the timing cannot be computed. A mode
    /// timeout leaves the controller wherever the hardware settled.
    pub fn init<C: PeripheralClock>(
        &mut self,
        config: &Config,
        clocks: &C,
    ) -> Result<BitTiming, CanError> {
        let pclk = clocks.frequency(self.instance);
        let timing = BitTiming::compute(config.bitrate, config.sample_point, pclk)?;

        self.init_with_timing(&config.options, &timing, config.silent, config.loopback)?;

        log::info!(
            "{:?} running at {} bit/s from {} Hz",
            self.instance,
            timing.effective_bitrate(pclk),
            pclk
        );

        Ok(timing)
    }

    /// Same as [`Can::init`] with a precomputed timing.
    pub fn init_with_timing(
        &mut self,
        options: &Options,
        timing: &BitTiming,
        silent: bool,
        loopback: bool,
    ) -> Result<(), CanError> {
        self.enter_init_blocking()?;

        self.set_options(options);
        self.apply_timing(timing)?;
        self.set_silent(silent);
        self.set_loopback(loopback);

        self.leave_init_blocking()
    }

    /// Writes the MCR feature flags, leaving the mode request bits alone.
    pub fn set_options(&mut self, options: &Options) {
        self.modify_reg(MCR, |reg| {
            let mut mcr: Bitfield<McrField> = Bitfield::from_bits(reg);

            // Set:     Time triggered communication (TTCM)
            // Set:     Automatic bus-off management (ABOM)
            // Set:     Automatic wakeup (AWUM)
            // Set:     No automatic retransmission (NART)
            // Set:     Receive FIFO locked mode (RFLM)
            // Set:     Transmit FIFO priority (TXFP)
            mcr.set(McrField::TTCM, options.time_triggered);
            mcr.set(McrField::ABOM, options.auto_bus_off);
            mcr.set(McrField::AWUM, options.auto_wakeup);
            mcr.set(McrField::NART, options.no_auto_retransmit);
            mcr.set(McrField::RFLM, options.rx_fifo_locked);
            mcr.set(McrField::TXFP, options.tx_fifo_priority);

            mcr.bits()
        });
    }

    /// Flags currently set in MCR.
    pub fn options(&self) -> Options {
        let mcr: Bitfield<McrField> = Bitfield::from_bits(self.read_reg(MCR));

        Options {
            time_triggered: mcr.is_set(McrField::TTCM),
            auto_bus_off: mcr.is_set(McrField::ABOM),
            auto_wakeup: mcr.is_set(McrField::AWUM),
            no_auto_retransmit: mcr.is_set(McrField::NART),
            rx_fifo_locked: mcr.is_set(McrField::RFLM),
            tx_fifo_priority: mcr.is_set(McrField::TXFP),
        }
    }

    /// Silent mode: frames are received but the controller never drives the
    /// bus. Needs init mode.
    pub fn set_silent(&mut self, silent: bool) {
        self.modify_btr(BtrField::SILM, silent);
    }

    /// Loop back mode: transmitted frames are received internally. Needs
    /// init mode.
    pub fn set_loopback(&mut self, loopback: bool) {
        self.modify_btr(BtrField::LBKM, loopback);
    }

    fn modify_btr(&mut self, field: BtrField, value: bool) {
        self.modify_reg(BTR, |reg| {
            let mut btr: Bitfield<BtrField> = Bitfield::from_bits(reg);
            btr.set(field, value);
            btr.bits()
        });
    }
}
