//! Raw register access
//!
//! Everything above this module talks to the controller through
//! [`RegisterAccess`], so the same driver runs against real memory-mapped
//! registers ([`Mmio`]) or a simulated register file in tests.

use core::ptr;

pub trait RegisterAccess {
    /// Reads the 32-bit register at `offset` bytes from the block base.
    fn read(&self, offset: usize) -> u32;

    /// Writes the 32-bit register at `offset` bytes from the block base.
    fn write(&mut self, offset: usize, value: u32);

    /// Read-modify-write. Bits not touched by `f` are written back unchanged.
    fn modify<F>(&mut self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(offset);
        self.write(offset, f(value));
    }
}

/// A register block living at a fixed physical address.
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the address of a register block that nothing else
    /// accesses while this value is alive.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

impl RegisterAccess for Mmio {
    fn read(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        unsafe { ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mmio_reads_and_writes_through_the_base_address() {
        let mut backing = [0u32; 4];
        let mut regs = unsafe { Mmio::new(backing.as_mut_ptr() as usize) };

        regs.write(0x8, 0xDEAD_BEEF);
        regs.modify(0x8, |v| v & 0xFFFF);

        assert_eq!(regs.read(0x8), 0xBEEF);
        assert_eq!(regs.read(0x0), 0);
        drop(regs);
        assert_eq!(backing[2], 0xBEEF);
    }
}
