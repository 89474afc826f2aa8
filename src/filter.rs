//! Acceptance filter banks
//!
//! Each bank holds two 32-bit registers, read as one 32-bit mask/ID pair,
//! two 32-bit IDs, two 16-bit mask/ID pairs or four 16-bit IDs depending on
//! its scale and mode. Bank edits only take while the filter init latch
//! (FMR.FINIT) is held, and no bank filters anything during that window.

use crate::can_error::CanError;
use crate::config::{Fifo, FilterMode, FilterScale, Id, FILTER_BANK_COUNT};
use crate::mmio::RegisterAccess;
use crate::registers::*;
use crate::Can;

/// Complete state of one filter bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterBank {
    pub scale: FilterScale,
    pub mode: FilterMode,
    pub fr1: u32,
    pub fr2: u32,
    pub fifo: Fifo,
    pub active: bool,
}

impl FilterBank {
    /// One 32-bit mask filter that matches every frame.
    pub fn accept_all(fifo: Fifo) -> Self {
        FilterBank {
            scale: FilterScale::Single32,
            mode: FilterMode::Mask,
            fr1: 0,
            fr2: 0,
            fifo,
            active: true,
        }
    }
}

/// Filter word for a 32-bit bank: STID[10:0] EXID[17:0] IDE RTR 0.
pub fn id_to_32bit(id: Id, rtr: bool) -> u32 {
    let mut word: Bitfield<IdField> = Bitfield::new();
    match id {
        Id::Standard(id) => word.write_field(IdField::STID, id),
        Id::Extended(id) => {
            word.write_field(IdField::EXID, id);
            word.set(IdField::IDE, true);
        }
    }
    word.set(IdField::RTR, rtr);
    word.bits()
}

/// Mask word for a 32-bit bank. Set bits must match; IDE and RTR are
/// always compared.
pub fn mask_to_32bit(id: Id) -> u32 {
    let mut word: Bitfield<IdField> = Bitfield::new();
    match id {
        Id::Standard(mask) => word.write_field(IdField::STID, mask),
        Id::Extended(mask) => word.write_field(IdField::EXID, mask),
    }
    word.set(IdField::IDE, true);
    word.set(IdField::RTR, true);
    word.bits()
}

/// Filter word for a 16-bit half: STID[10:0] RTR IDE EXID[17:15].
pub fn id_to_16bit(id: Id, rtr: bool) -> u16 {
    let word = id_to_32bit(id, rtr);
    to_16bit(word)
}

/// Mask word for a 16-bit half, comparing IDE and RTR.
pub fn mask_to_16bit(id: Id) -> u16 {
    to_16bit(mask_to_32bit(id))
}

fn to_16bit(word: u32) -> u16 {
    let stid = (word & IdField::STID.mask()) >> 16;
    let rtr = (word & IdField::RTR.mask()) << 3;
    let ide = (word & IdField::IDE.mask()) << 1;
    let exid_high = (word >> 18) & 0x7;
    (stid | rtr | ide | exid_high) as u16
}

impl<R: RegisterAccess> Can<R> {
    /// Rewrites one bank under the filter init latch and releases it.
    pub fn configure_filter(&mut self, bank: u8, config: &FilterBank) -> Result<(), CanError> {
        check_bank(bank)?;

        self.enter_filter_init();
        self.write_filter_bank(bank, config);
        self.leave_filter_init();

        Ok(())
    }

    /// Rewrites several banks while holding the latch once, so no partial
    /// set of banks is ever live.
    pub fn configure_filters(&mut self, banks: &[(u8, FilterBank)]) -> Result<(), CanError> {
        for (bank, _) in banks {
            check_bank(*bank)?;
        }

        self.enter_filter_init();
        for (bank, config) in banks {
            self.write_filter_bank(*bank, config);
        }
        self.leave_filter_init();

        Ok(())
    }

    /// Two 16-bit mask filters. Each argument is a raw 16-bit filter word.
    pub fn filter_id_mask_16bit(
        &mut self,
        bank: u8,
        id1: u16,
        mask1: u16,
        id2: u16,
        mask2: u16,
        fifo: Fifo,
        enable: bool,
    ) -> Result<(), CanError> {
        self.configure_filter(
            bank,
            &FilterBank {
                scale: FilterScale::Dual16,
                mode: FilterMode::Mask,
                fr1: ((id1 as u32) << 16) | mask1 as u32,
                fr2: ((id2 as u32) << 16) | mask2 as u32,
                fifo,
                active: enable,
            },
        )
    }

    /// One 32-bit mask filter from raw 32-bit filter words.
    pub fn filter_id_mask_32bit(
        &mut self,
        bank: u8,
        id: u32,
        mask: u32,
        fifo: Fifo,
        enable: bool,
    ) -> Result<(), CanError> {
        self.configure_filter(
            bank,
            &FilterBank {
                scale: FilterScale::Single32,
                mode: FilterMode::Mask,
                fr1: id,
                fr2: mask,
                fifo,
                active: enable,
            },
        )
    }

    /// Four exact 16-bit filter words.
    pub fn filter_id_list_16bit(
        &mut self,
        bank: u8,
        ids: [u16; 4],
        fifo: Fifo,
        enable: bool,
    ) -> Result<(), CanError> {
        self.configure_filter(
            bank,
            &FilterBank {
                scale: FilterScale::Dual16,
                mode: FilterMode::List,
                fr1: ((ids[0] as u32) << 16) | ids[1] as u32,
                fr2: ((ids[2] as u32) << 16) | ids[3] as u32,
                fifo,
                active: enable,
            },
        )
    }

    /// Two exact 32-bit filter words.
    pub fn filter_id_list_32bit(
        &mut self,
        bank: u8,
        ids: [u32; 2],
        fifo: Fifo,
        enable: bool,
    ) -> Result<(), CanError> {
        self.configure_filter(
            bank,
            &FilterBank {
                scale: FilterScale::Single32,
                mode: FilterMode::List,
                fr1: ids[0],
                fr2: ids[1],
                fifo,
                active: enable,
            },
        )
    }

    /// Reads a bank back from the filter registers.
    pub fn filter_bank(&self, bank: u8) -> Result<FilterBank, CanError> {
        check_bank(bank)?;
        let bit = 1u32 << bank;
        let index = bank as usize;

        Ok(FilterBank {
            scale: if self.read_reg(FS1R) & bit != 0 {
                FilterScale::Single32
            } else {
                FilterScale::Dual16
            },
            mode: if self.read_reg(FM1R) & bit != 0 {
                FilterMode::List
            } else {
                FilterMode::Mask
            },
            fr1: self.read_reg(filter_bank(index, 0)),
            fr2: self.read_reg(filter_bank(index, 1)),
            fifo: if self.read_reg(FFA1R) & bit != 0 {
                Fifo::Fifo1
            } else {
                Fifo::Fifo0
            },
            active: self.read_reg(FA1R) & bit != 0,
        })
    }

    pub fn set_filter_active(&mut self, bank: u8, active: bool) -> Result<(), CanError> {
        check_bank(bank)?;
        let bit = 1u32 << bank;

        self.enter_filter_init();
        self.modify_reg(FA1R, |reg| if active { reg | bit } else { reg & !bit });
        self.leave_filter_init();

        Ok(())
    }

    /// Splits the banks between the two controllers: banks below `start`
    /// belong to CAN1, the rest to CAN2. Only meaningful on connectivity
    /// line devices, and only through CAN1's register block.
    pub fn set_can2_start_bank(&mut self, start: u8) -> Result<(), CanError> {
        if start > 28 {
            return Err(CanError::InvalidFilterBank);
        }

        self.enter_filter_init();
        self.modify_reg(FMR, |reg| {
            let mut fmr: Bitfield<FmrField> = Bitfield::from_bits(reg);
            fmr.write_field(FmrField::CAN2SB, start as u32);
            fmr.bits()
        });
        self.leave_filter_init();

        Ok(())
    }

    pub fn can2_start_bank(&self) -> u8 {
        let fmr: Bitfield<FmrField> = Bitfield::from_bits(self.read_reg(FMR));
        fmr.read_field(FmrField::CAN2SB) as u8
    }

    fn enter_filter_init(&mut self) {
        self.modify_reg(FMR, |reg| reg | FmrField::FINIT.mask());
    }

    fn leave_filter_init(&mut self) {
        self.modify_reg(FMR, |reg| reg & !FmrField::FINIT.mask());
    }

    /// Expects the latch to be held.
    fn write_filter_bank(&mut self, bank: u8, config: &FilterBank) {
        let bit = 1u32 << bank;
        let index = bank as usize;

        self.modify_reg(FA1R, |reg| reg & !bit);

        let scale32 = config.scale == FilterScale::Single32;
        self.modify_reg(FS1R, |reg| if scale32 { reg | bit } else { reg & !bit });

        let list = config.mode == FilterMode::List;
        self.modify_reg(FM1R, |reg| if list { reg | bit } else { reg & !bit });

        self.write_reg(filter_bank(index, 0), config.fr1);
        self.write_reg(filter_bank(index, 1), config.fr2);

        let fifo1 = config.fifo == Fifo::Fifo1;
        self.modify_reg(FFA1R, |reg| if fifo1 { reg | bit } else { reg & !bit });

        if config.active {
            self.modify_reg(FA1R, |reg| reg | bit);
        }

        log::debug!("{:?} filter bank {}: {:?}", self.instance, bank, config);
    }
}

fn check_bank(bank: u8) -> Result<(), CanError> {
    if bank < FILTER_BANK_COUNT {
        Ok(())
    } else {
        Err(CanError::InvalidFilterBank)
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
    fn mask_32bit_scenario() {
        let mut can = can();
        can.filter_id_mask_32bit(0, 0x123, 0x7FF, Fifo::Fifo0, true).unwrap();

        let bank = can.filter_bank(0).unwrap();
        assert_eq!(bank.scale, FilterScale::Single32);
        assert_eq!(bank.mode, FilterMode::Mask);
        assert_eq!(bank.fifo, Fifo::Fifo0);
        assert!(bank.active);
        assert_eq!((bank.fr1, bank.fr2), (0x123, 0x7FF));
    }

    #[test]
    fn mask_32bit_with_extended_encoding() {
        let mut can = can();
        let id = id_to_32bit(Id::Extended(0x123), false);
        let mask = mask_to_32bit(Id::Extended(0x7FF));
        can.filter_id_mask_32bit(0, id, mask, Fifo::Fifo0, true).unwrap();

        let bank = can.filter_bank(0).unwrap();
        assert_eq!(bank.fr1, (0x123 << 3) | 0x4);
        assert_eq!(bank.fr2, (0x7FF << 3) | 0x6);
    }

    #[test]
    fn every_bank_round_trips() {
        let mut can = can();

        for bank in 0..FILTER_BANK_COUNT {
            let config = FilterBank {
                scale: if bank % 2 == 0 {
                    FilterScale::Single32
                } else {
                    FilterScale::Dual16
                },
                mode: if bank % 3 == 0 {
                    FilterMode::List
                } else {
                    FilterMode::Mask
                },
                fr1: 0x1000 + bank as u32,
                fr2: 0x2000 + bank as u32,
                fifo: if bank % 4 < 2 { Fifo::Fifo1 } else { Fifo::Fifo0 },
                active: bank % 5 != 0,
            };

            can.configure_filter(bank, &config).unwrap();
            assert_eq!(can.filter_bank(bank).unwrap(), config);
        }
    }

    #[test]
    fn editing_one_bank_leaves_the_others() {
        let mut can = can();
        can.filter_id_list_32bit(1, [0x10, 0x20], Fifo::Fifo1, true).unwrap();
        let before = can.filter_bank(1).unwrap();

        can.filter_id_mask_16bit(2, 0x1, 0x2, 0x3, 0x4, Fifo::Fifo0, false).unwrap();

        assert_eq!(can.filter_bank(1).unwrap(), before);
        let bank2 = can.filter_bank(2).unwrap();
        assert_eq!(bank2.fr1, 0x0001_0002);
        assert_eq!(bank2.fr2, 0x0003_0004);
        assert!(!bank2.active);
    }

    #[test]
    fn list_16bit_packs_four_ids() {
        let mut can = can();
        let ids = [
            id_to_16bit(Id::Standard(0x100), false),
            id_to_16bit(Id::Standard(0x101), false),
            id_to_16bit(Id::Standard(0x102), true),
            id_to_16bit(Id::Standard(0x103), false),
        ];
        can.filter_id_list_16bit(3, ids, Fifo::Fifo1, true).unwrap();

        let bank = can.filter_bank(3).unwrap();
        assert_eq!(bank.scale, FilterScale::Dual16);
        assert_eq!(bank.mode, FilterMode::List);
        assert_eq!(bank.fr1, (0x100 << 21) | (0x101 << 5));
        assert_eq!(bank.fr2, (0x102 << 21) | (1 << 20) | (0x103 << 5));
    }

    #[test]
    fn latch_is_released_after_every_edit() {
        let mut can = can();
        assert_ne!(can.registers().peek(FMR) & 0x1, 0);

        can.configure_filter(0, &FilterBank::accept_all(Fifo::Fifo0)).unwrap();
        assert_eq!(can.registers().peek(FMR) & 0x1, 0);

        can.configure_filters(&[
            (4, FilterBank::accept_all(Fifo::Fifo1)),
            (5, FilterBank::accept_all(Fifo::Fifo0)),
        ])
        .unwrap();
        assert_eq!(can.registers().peek(FMR) & 0x1, 0);
        assert_eq!(can.registers().peek(FA1R), 0b11_0001);
    }

    #[test]
    fn bank_edits_happen_under_the_latch() {
        let mut can = can();
        can.configure_filter(0, &FilterBank::accept_all(Fifo::Fifo0)).unwrap();
        assert_eq!(can.registers().peek(FMR) & 0x1, 0);

        let list = FilterBank {
            scale: FilterScale::Dual16,
            mode: FilterMode::List,
            fr1: 0x2000_2020,
            fr2: 0x2040_2060,
            fifo: Fifo::Fifo1,
            active: true,
        };
        can.configure_filter(1, &list).unwrap();
        can.configure_filters(&[
            (2, FilterBank::accept_all(Fifo::Fifo1)),
            (3, list),
        ])
        .unwrap();
        can.filter_id_mask_16bit(4, 0x1, 0x2, 0x3, 0x4, Fifo::Fifo1, true).unwrap();
        can.set_filter_active(4, false).unwrap();
        can.set_can2_start_bank(10).unwrap();

        assert_eq!(can.registers().latch_violations(), 0);
        assert_eq!(can.filter_bank(1).unwrap(), list);
        assert_eq!(can.filter_bank(3).unwrap(), list);
        assert_eq!(can.filter_bank(2).unwrap(), FilterBank::accept_all(Fifo::Fifo1));
        assert_eq!(can.filter_bank(4).unwrap().fr2, 0x0003_0004);
        assert_eq!(can.can2_start_bank(), 10);
    }

    #[test]
    fn out_of_range_bank_is_rejected_without_writes() {
        let mut can = can();
        let writes = can.registers().write_count();

        assert_eq!(
            can.configure_filter(FILTER_BANK_COUNT, &FilterBank::accept_all(Fifo::Fifo0)),
            Err(CanError::InvalidFilterBank)
        );
        assert_eq!(
            can.configure_filters(&[
                (0, FilterBank::accept_all(Fifo::Fifo0)),
                (200, FilterBank::accept_all(Fifo::Fifo0)),
            ]),
            Err(CanError::InvalidFilterBank)
        );
        assert_eq!(can.filter_bank(FILTER_BANK_COUNT), Err(CanError::InvalidFilterBank));
        assert_eq!(can.registers().write_count(), writes);
    }

    #[test]
    fn deactivate_and_reactivate() {
        let mut can = can();
        can.configure_filter(7, &FilterBank::accept_all(Fifo::Fifo0)).unwrap();

        can.set_filter_active(7, false).unwrap();
        assert!(!can.filter_bank(7).unwrap().active);

        can.set_filter_active(7, true).unwrap();
        assert!(can.filter_bank(7).unwrap().active);
    }

    #[test]
    fn can2_start_bank_split() {
        let mut can = can();
        assert_eq!(can.can2_start_bank(), 14);

        can.set_can2_start_bank(20).unwrap();
        assert_eq!(can.can2_start_bank(), 20);
        assert_eq!(can.registers().peek(FMR) & 0x1, 0);
        assert_eq!(can.set_can2_start_bank(29), Err(CanError::InvalidFilterBank));
    }

    #[test]
    fn sixteen_bit_encoding() {
        assert_eq!(id_to_16bit(Id::Standard(0x7FF), false), 0xFFE0);
        assert_eq!(id_to_16bit(Id::Standard(0x001), true), 0x0030);
        assert_eq!(id_to_16bit(Id::Extended(0x1FFF_FFFF), false), 0xFFEF);
        assert_eq!(mask_to_16bit(Id::Standard(0x7FF)), 0xFFF8);
    }
}
