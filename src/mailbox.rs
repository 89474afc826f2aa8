//! Transmit mailboxes
//!
//! The three mailboxes are a pool owned by the hardware once a transmit
//! request is set. They come back empty when the frame is sent or aborted;
//! software never frees them.

use crate::config::Mailbox;
use crate::mmio::RegisterAccess;
use crate::registers::{Bitfield, Field, TsrField, TSR};
use crate::Can;

/// Outcome flags of the last request on one mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxStatus {
    pub empty: bool,
    pub request_completed: bool,
    pub tx_ok: bool,
    pub arbitration_lost: bool,
    pub tx_error: bool,
}

impl<R: RegisterAccess> Can<R> {
    /// Lowest-numbered empty mailbox. This is first fit; bus priority is
    /// decided by the hardware regardless of the slot used.
    pub fn empty_mailbox(&self) -> Option<Mailbox> {
        let tsr = self.tsr();
        Mailbox::ALL
            .iter()
            .copied()
            .find(|mailbox| tsr.is_set(TsrField::TME(mailbox.index())))
    }

    pub fn is_mailbox_available(&self) -> bool {
        let tsr = self.tsr();
        Mailbox::ALL
            .iter()
            .any(|mailbox| tsr.is_set(TsrField::TME(mailbox.index())))
    }

    pub fn is_mailbox_empty(&self, mailbox: Mailbox) -> bool {
        self.tsr().is_set(TsrField::TME(mailbox.index()))
    }

    pub fn tx_status(&self, mailbox: Mailbox) -> TxStatus {
        let tsr = self.tsr();
        let mb = mailbox.index();

        TxStatus {
            empty: tsr.is_set(TsrField::TME(mb)),
            request_completed: tsr.is_set(TsrField::RQCP(mb)),
            tx_ok: tsr.is_set(TsrField::TXOK(mb)),
            arbitration_lost: tsr.is_set(TsrField::ALST(mb)),
            tx_error: tsr.is_set(TsrField::TERR(mb)),
        }
    }

    /// Clears RQCP together with TXOK, ALST and TERR of `mailbox`.
    pub fn clear_request_completed(&mut self, mailbox: Mailbox) {
        // Write-1-to-clear: only the targeted bit is written
        self.write_reg(TSR, TsrField::RQCP(mailbox.index()).mask());
    }

    /// Asks the hardware to drop a pending transmission. The mailbox turns
    /// empty once the abort or the transmission itself completes.
    pub fn abort(&mut self, mailbox: Mailbox) {
        self.write_reg(TSR, TsrField::ABRQ(mailbox.index()).mask());

        log::debug!("{:?} abort {:?}", self.instance, mailbox);
    }

    fn tsr(&self) -> Bitfield<TsrField> {
        Bitfield::from_bits(self.read_reg(TSR))
    }
}
