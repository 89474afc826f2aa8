//! Clock and reset collaborators
//!
//! The driver does not own the RCC. It only needs to pulse the peripheral
//! reset line and to know the APB clock feeding the controller.

use crate::config::Instance;
use crate::mmio::{Mmio, RegisterAccess};

/// RCC_APB1RSTR on STM32F1 devices.
pub const APB1RSTR_F1: usize = 0x4002_1010;
/// RCC_APB1RSTR on STM32F2 and STM32F4 devices.
pub const APB1RSTR_F4: usize = 0x4002_3820;

const CAN1RST: u32 = 1 << 25;
const CAN2RST: u32 = 1 << 26;

pub trait ResetControl {
    fn assert_reset(&mut self, instance: Instance);
    fn clear_reset(&mut self, instance: Instance);
}

pub trait PeripheralClock {
    /// Frequency in Hz of the clock feeding `instance`.
    fn frequency(&self, instance: Instance) -> u32;
}

/// Both controllers hang off APB1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clocks {
    pub pclk1: u32,
}

impl PeripheralClock for Clocks {
    fn frequency(&self, _instance: Instance) -> u32 {
        self.pclk1
    }
}

/// Peripheral reset through the APB1 reset register.
pub struct Apb1Reset {
    rstr: Mmio,
}

impl Apb1Reset {
    /// # Safety
    ///
    /// `address` must be the APB1 reset register of the running device, and
    /// no other code may modify that register concurrently.
    pub unsafe fn new(address: usize) -> Self {
        Self {
            rstr: Mmio::new(address),
        }
    }

    fn reset_bit(instance: Instance) -> u32 {
        match instance {
            Instance::Can1 => CAN1RST,
            Instance::Can2 => CAN2RST,
        }
    }
}

impl ResetControl for Apb1Reset {
    fn assert_reset(&mut self, instance: Instance) {
        let bit = Self::reset_bit(instance);
        self.rstr.modify(0, |reg| reg | bit);
    }

    fn clear_reset(&mut self, instance: Instance) {
        let bit = Self::reset_bit(instance);
        self.rstr.modify(0, |reg| reg & !bit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_pulses_only_the_selected_bit() {
        let mut rstr = 0x0000_0011u32;
        let mut rcc = unsafe { Apb1Reset::new(&mut rstr as *mut u32 as usize) };

        rcc.assert_reset(Instance::Can2);
        assert_eq!(rcc.rstr.read(0), 0x0400_0011);

        rcc.clear_reset(Instance::Can2);
        assert_eq!(rcc.rstr.read(0), 0x0000_0011);

        rcc.assert_reset(Instance::Can1);
        assert_eq!(rcc.rstr.read(0), 0x0200_0011);
    }

    #[test]
    fn clocks_report_apb1() {
        let clocks = Clocks { pclk1: 36_000_000 };
        assert_eq!(clocks.frequency(Instance::Can1), 36_000_000);
        assert_eq!(clocks.frequency(Instance::Can2), 36_000_000);
    }
}
