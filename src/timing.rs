//! Bit timing computation
//!
//! A bit is `1 + ts1 + ts2` time quanta long and one quantum is `brp`
//! peripheral clock cycles, so the bitrate is `pclk / ((1 + ts1 + ts2) * brp)`.
//! The sample point sits at the end of segment 1.

use crate::can_error::CanError;
use crate::mmio::RegisterAccess;
use crate::rcc::PeripheralClock;
use crate::registers::{Bitfield, BtrField, BTR};
use crate::Can;

const INITIAL_TS1: u32 = 14;
const INITIAL_TS2: u32 = 5;

const TS1_MAX: u32 = 16;
const TS2_MAX: u32 = 8;
const SJW_MAX: u32 = 4;
const BRP_MAX: u32 = 1024;

/// Segment lengths and prescaler, in quanta (not register encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitTiming {
    pub sjw: u8,
    pub ts1: u8,
    pub ts2: u8,
    pub brp: u16,
}

impl BitTiming {
    /// All fields zero. Never produced by a successful computation.
    pub const INVALID: BitTiming = BitTiming {
        sjw: 0,
        ts1: 0,
        ts2: 0,
        brp: 0,
    };

    /// Finds segment lengths and a prescaler giving exactly `bitrate` out of
    /// `pclk`, close to `sample_point` (a fraction of 255).
    ///
    /// Starts from a 20 quanta bit split 14/5 and shortens segment 1 while
    /// the sample point is later than requested, segment 2 otherwise, until
    /// the bit length divides the number of clock cycles per bit. This finds
    /// a valid split, not necessarily the one closest to the sample point.
    pub fn compute(bitrate: u32, sample_point: u8, pclk: u32) -> Result<BitTiming, CanError> {
        if bitrate == 0 || bitrate > pclk / 3 {
            return Err(CanError::BaudrateTooHigh);
        }

        if pclk % bitrate != 0 {
            return Err(CanError::BaudrateUnreachable);
        }

        let cycles_per_bit = pclk / bitrate;
        let target = sample_point as u32;

        let mut ts1 = INITIAL_TS1;
        let mut ts2 = INITIAL_TS2;

        loop {
            let quanta = 1 + ts1 + ts2;

            if cycles_per_bit % quanta == 0 {
                let brp = cycles_per_bit / quanta;
                if brp > BRP_MAX {
                    log::warn!("prescaler {} needed for {} bit/s", brp, bitrate);
                    return Err(CanError::PrescalarTooHigh);
                }

                return Ok(BitTiming {
                    sjw: ts2.min(SJW_MAX) as u8,
                    ts1: ts1 as u8,
                    ts2: ts2 as u8,
                    brp: brp as u16,
                });
            }

            let current = (1 + ts1) * 255 / quanta;
            let segment = if current > target { &mut ts1 } else { &mut ts2 };

            if *segment <= 1 {
                log::warn!(
                    "no bit timing for {} bit/s from {} Hz at sample point {}/255",
                    bitrate,
                    pclk,
                    sample_point
                );
                return Err(CanError::TimingUnsatisfiable);
            }

            *segment -= 1;
        }
    }

    pub fn quanta_per_bit(&self) -> u32 {
        1 + self.ts1 as u32 + self.ts2 as u32
    }

    /// `pclk / ((1 + ts1 + ts2) * brp)`, or 0 for an invalid timing.
    pub fn effective_bitrate(&self, pclk: u32) -> u32 {
        let divider = self.quanta_per_bit() * self.brp as u32;
        if !self.is_valid() || divider == 0 {
            return 0;
        }

        pclk / divider
    }

    /// Sample point as a fraction of 255.
    pub fn sample_point(&self) -> u8 {
        ((1 + self.ts1 as u32) * 255 / self.quanta_per_bit()) as u8
    }

    pub fn is_valid(&self) -> bool {
        (1..=TS1_MAX).contains(&(self.ts1 as u32))
            && (1..=TS2_MAX).contains(&(self.ts2 as u32))
            && (1..=SJW_MAX).contains(&(self.sjw as u32))
            && (1..=BRP_MAX).contains(&(self.brp as u32))
            && self.sjw <= self.ts2
    }

    fn from_register(btr: Bitfield<BtrField>) -> Self {
        BitTiming {
            sjw: btr.read_field(BtrField::SJW) as u8 + 1,
            ts1: btr.read_field(BtrField::TS1) as u8 + 1,
            ts2: btr.read_field(BtrField::TS2) as u8 + 1,
            brp: btr.read_field(BtrField::BRP) as u16 + 1,
        }
    }

    fn write_to(&self, btr: &mut Bitfield<BtrField>) {
        btr.write_field(BtrField::SJW, self.sjw as u32 - 1);
        btr.write_field(BtrField::TS2, self.ts2 as u32 - 1);
        btr.write_field(BtrField::TS1, self.ts1 as u32 - 1);
        btr.write_field(BtrField::BRP, self.brp as u32 - 1);
    }
}

/// See [`BitTiming::compute`].
pub fn compute_timing(bitrate: u32, sample_point: u8, pclk: u32) -> Result<BitTiming, CanError> {
    BitTiming::compute(bitrate, sample_point, pclk)
}

impl<R: RegisterAccess> Can<R> {
    /// Writes `timing` in a single BTR store, keeping the silent and loop
    /// back bits. The register is only writable in init mode, which is not
    /// checked here. An invalid timing is rejected without writing.
    pub fn apply_timing(&mut self, timing: &BitTiming) -> Result<(), CanError> {
        if !timing.is_valid() {
            log::warn!("refusing to apply {:?}", timing);
            return Err(CanError::InvalidTiming);
        }

        let current: Bitfield<BtrField> = Bitfield::from_bits(self.read_reg(BTR));
        let mut btr: Bitfield<BtrField> = Bitfield::new();
        btr.set(BtrField::SILM, current.is_set(BtrField::SILM));
        btr.set(BtrField::LBKM, current.is_set(BtrField::LBKM));
        timing.write_to(&mut btr);

        self.write_reg(BTR, btr.bits());

        log::debug!("{:?} timing {:?}", self.instance, timing);
        Ok(())
    }

    /// Timing currently held by the bit timing register.
    pub fn bit_timing(&self) -> BitTiming {
        BitTiming::from_register(Bitfield::from_bits(self.read_reg(BTR)))
    }

    /// Computes and applies the timing for `bitrate` from the clock feeding
    /// this controller. Needs init mode.
    pub fn set_bitrate<C: PeripheralClock>(
        &mut self,
        bitrate: u32,
        sample_point: u8,
        clocks: &C,
    ) -> Result<BitTiming, CanError> {
        let timing = BitTiming::compute(bitrate, sample_point, clocks.frequency(self.instance))?;
        self.apply_timing(&timing)?;
        Ok(timing)
    }
}
