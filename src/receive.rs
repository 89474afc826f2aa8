use crate::can_error::RxTxError;
use crate::config::{Fifo, Id};
use crate::mmio::RegisterAccess;
use crate::registers::*;
use crate::transfer::Frame;
use crate::util::unpack_payload;
use crate::Can;

/// A frame read from a receive FIFO.
///
/// All 8 data positions are copied. Bytes past `frame.dlc` are whatever the
/// hardware left in the output registers and carry no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFrame {
    pub frame: Frame,
    /// Index of the filter that accepted the frame.
    pub filter_match_index: u8,
    /// Value of the bit time counter at the start of frame, only counted in
    /// time triggered mode.
    pub timestamp: u16,
}

impl<R: RegisterAccess> Can<R> {
    /// Decodes the head of `fifo`.
    ///
    /// The FIFO is not checked for pending frames first; an empty FIFO
    /// yields stale register contents. With `auto_release` the head slot is
    /// released afterwards, otherwise [`Can::release_fifo`] must be called.
    pub fn receive(&mut self, fifo: Fifo, auto_release: bool) -> RxFrame {
        let base = rx_fifo(fifo.index());

        let ir: Bitfield<IdField> = Bitfield::from_bits(self.read_reg(base + MB_IR));
        let dtr: Bitfield<DtrField> = Bitfield::from_bits(self.read_reg(base + MB_DTR));
        let low = self.read_reg(base + MB_DLR);
        let high = self.read_reg(base + MB_DHR);

        let id = if ir.is_set(IdField::IDE) {
            Id::Extended(ir.read_field(IdField::EXID))
        } else {
            Id::Standard(ir.read_field(IdField::STID))
        };

        let rx_frame = RxFrame {
            frame: Frame {
                id,
                remote: ir.is_set(IdField::RTR),
                dlc: dtr.read_field(DtrField::DLC) as u8,
                data: unpack_payload(low, high),
            },
            filter_match_index: dtr.read_field(DtrField::FMI) as u8,
            timestamp: dtr.read_field(DtrField::TIME) as u16,
        };

        if auto_release {
            self.release_fifo(fifo);
        }

        if cfg!(feature = "debuginfo") {
            log::info!(
                "Received {}-byte frame w/ ID {:?} on {:?} (filter #{}); RIR: {:#x}, RDTR: {:#x}",
                rx_frame.frame.dlc,
                id,
                fifo,
                rx_frame.filter_match_index,
                ir.bits(),
                dtr.bits(),
            );
        }

        rx_frame
    }

    /// Like [`Can::receive`] with release, but checks for a pending frame
    /// first.
    pub fn try_receive(&mut self, fifo: Fifo) -> Result<RxFrame, RxTxError> {
        if self.fifo_pending(fifo) == 0 {
            return Err(RxTxError::FifoEmpty);
        }

        Ok(self.receive(fifo, true))
    }

    /// Drops the head frame of `fifo`.
    pub fn release_fifo(&mut self, fifo: Fifo) {
        // Only RFOM, so pending FULL/FOVR flags are not cleared by accident
        self.write_reg(rx_fifo_status(fifo.index()), RfrField::RFOM.mask());
    }

    /// Number of frames waiting in `fifo`, 0 to 3.
    pub fn fifo_pending(&self, fifo: Fifo) -> u8 {
        self.rfr(fifo).read_field(RfrField::FMP) as u8
    }

    pub fn is_fifo_full(&self, fifo: Fifo) -> bool {
        self.rfr(fifo).is_set(RfrField::FULL)
    }

    /// A frame was lost because `fifo` was full.
    pub fn is_fifo_overrun(&self, fifo: Fifo) -> bool {
        self.rfr(fifo).is_set(RfrField::FOVR)
    }

    pub fn clear_fifo_full(&mut self, fifo: Fifo) {
        self.write_reg(rx_fifo_status(fifo.index()), RfrField::FULL.mask());
    }

    pub fn clear_fifo_overrun(&mut self, fifo: Fifo) {
        self.write_reg(rx_fifo_status(fifo.index()), RfrField::FOVR.mask());

        log::debug!("{:?} {:?} overrun cleared", self.instance, fifo);
    }

    fn rfr(&self, fifo: Fifo) -> Bitfield<RfrField> {
        Bitfield::from_bits(self.read_reg(rx_fifo_status(fifo.index())))
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
    fn standard_frame_with_release() {
        let mut can = can();
        can.registers_mut()
            .push_rx(0, 0x123 << 21, 0x0000_0204, 0x4433_2211, 0);
        assert_eq!(can.fifo_pending(Fifo::Fifo0), 1);

        let rx = can.receive(Fifo::Fifo0, true);

        assert_eq!(rx.frame.id, Id::Standard(0x123));
        assert!(!rx.frame.remote);
        assert_eq!(rx.frame.dlc, 4);
        assert_eq!(&rx.frame.data[..4], &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(rx.filter_match_index, 2);
        assert_eq!(can.fifo_pending(Fifo::Fifo0), 0);
    }

    #[test]
    fn extended_remote_frame_and_timestamp() {
        let mut can = can();
        can.registers_mut().push_rx(
            1,
            (0x1ABC_DEF0 << 3) | 0x4 | 0x2,
            0xBEEF_0A00,
            0,
            0,
        );

        let rx = can.receive(Fifo::Fifo1, false);

        assert_eq!(rx.frame.id, Id::Extended(0x1ABC_DEF0));
        assert!(rx.frame.remote);
        assert_eq!(rx.frame.dlc, 0);
        assert_eq!(rx.filter_match_index, 0x0A);
        assert_eq!(rx.timestamp, 0xBEEF);
        assert_eq!(can.fifo_pending(Fifo::Fifo1), 1);

        can.release_fifo(Fifo::Fifo1);
        assert_eq!(can.fifo_pending(Fifo::Fifo1), 0);
    }

    #[test]
    fn copies_every_data_position() {
        let mut can = can();
        can.registers_mut()
            .push_rx(0, 0x10 << 21, 0x2, 0x4433_2211, 0x8877_6655);

        let rx = can.receive(Fifo::Fifo0, true);

        assert_eq!(rx.frame.data(), &[0x11, 0x22]);
        assert_eq!(rx.frame.data, [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
    }

    #[test]
    fn frames_come_out_in_order() {
        let mut can = can();
        for id in 1..=3 {
            assert!(can.registers_mut().push_rx(0, id << 21, 0, 0, 0));
        }
        assert!(can.is_fifo_full(Fifo::Fifo0));

        for id in 1..=3 {
            let rx = can.try_receive(Fifo::Fifo0).unwrap();
            assert_eq!(rx.frame.id, Id::Standard(id));
        }
        assert_eq!(can.try_receive(Fifo::Fifo0), Err(RxTxError::FifoEmpty));
    }

    #[test]
    fn release_keeps_status_flags() {
        let mut can = can();
        for id in 0..4 {
            can.registers_mut().push_rx(0, id << 21, 0, 0, 0);
        }
        assert!(can.is_fifo_overrun(Fifo::Fifo0));

        can.release_fifo(Fifo::Fifo0);

        assert_eq!(can.fifo_pending(Fifo::Fifo0), 2);
        assert!(can.is_fifo_overrun(Fifo::Fifo0));
        assert!(can.is_fifo_full(Fifo::Fifo0));

        can.clear_fifo_full(Fifo::Fifo0);
        can.clear_fifo_overrun(Fifo::Fifo0);
        assert!(!can.is_fifo_full(Fifo::Fifo0));
        assert!(!can.is_fifo_overrun(Fifo::Fifo0));
        assert_eq!(can.fifo_pending(Fifo::Fifo0), 2);
    }
}
