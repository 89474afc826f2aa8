use crate::can_error::RxTxError;
use crate::config::{Id, Mailbox};
use crate::mmio::RegisterAccess;
use crate::registers::*;
use crate::util::pack_payload;
use crate::Can;

/// A classic CAN frame, up to 8 data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub id: Id,
    pub remote: bool,
    pub dlc: u8,
    pub data: [u8; 8],
}

impl Frame {
    /// Data frame carrying the first 8 bytes of `data` at most.
    pub fn new(id: Id, data: &[u8]) -> Self {
        let len = data.len().min(8);
        let mut bytes = [0u8; 8];
        bytes[..len].copy_from_slice(&data[..len]);

        Frame {
            id,
            remote: false,
            dlc: len as u8,
            data: bytes,
        }
    }

    /// Remote request for `dlc` bytes.
    pub fn new_remote(id: Id, dlc: u8) -> Self {
        Frame {
            id,
            remote: true,
            dlc: dlc.min(8),
            data: [0; 8],
        }
    }

    /// Payload bytes up to the data length code.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlc.min(8) as usize]
    }
}

impl<R: RegisterAccess> Can<R> {
    /// Loads `frame` into the first empty mailbox and requests transmission.
    ///
    /// Fails right away when all three mailboxes are busy, touching nothing.
    /// Backpressure is up to the caller.
    pub fn transmit(&mut self, frame: &Frame) -> Result<Mailbox, RxTxError> {
        let mailbox = self.empty_mailbox().ok_or(RxTxError::MailboxUnavailable)?;
        let base = tx_mailbox(mailbox.index());

        let mut ir: Bitfield<IdField> = Bitfield::new();
        match frame.id {
            Id::Standard(id) => ir.write_field(IdField::STID, id),
            Id::Extended(id) => {
                ir.write_field(IdField::EXID, id);
                ir.set(IdField::IDE, true);
            }
        }
        ir.set(IdField::RTR, frame.remote);
        self.write_reg(base + MB_IR, ir.bits());

        let dlc = frame.dlc.min(8) as u32;
        self.modify_reg(base + MB_DTR, |reg| {
            let mut dtr: Bitfield<DtrField> = Bitfield::from_bits(reg);
            dtr.write_field(DtrField::DLC, dlc);
            dtr.bits()
        });

        let (low, high) = pack_payload(frame.data());
        self.write_reg(base + MB_DLR, low);
        self.write_reg(base + MB_DHR, high);

        // Hands the mailbox to the hardware
        self.modify_reg(base + MB_IR, |reg| reg | IdField::TXRQ.mask());

        if cfg!(feature = "debuginfo") {
            log::info!(
                "Sent {}-byte frame w/ ID {:?} on {:?}",
                dlc,
                frame.id,
                mailbox
            );
        }

        Ok(mailbox)
    }

    /// Same as [`Can::transmit`] with the arguments spelled out. Only the
    /// first 8 bytes of `data` are sent.
    pub fn transmit_raw(
        &mut self,
        id: u32,
        extended: bool,
        remote: bool,
        data: &[u8],
    ) -> Result<Mailbox, RxTxError> {
        let id = if extended {
            Id::Extended(id)
        } else {
            Id::Standard(id)
        };

        let frame = if remote {
            Frame::new_remote(id, data.len().min(8) as u8)
        } else {
            Frame::new(id, data)
        };

        self.transmit(&frame)
    }
}
