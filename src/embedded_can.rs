//! `embedded_hal::can` trait impls.

use embedded_hal::can;

use crate::can_error::RxTxError;
use crate::config::{Fifo, Id};
use crate::mmio::RegisterAccess;
use crate::transfer::Frame;
use crate::Can;

impl From<can::Id> for Id {
    fn from(id: can::Id) -> Self {
        match id {
            can::Id::Standard(id) => Id::Standard(id.as_raw() as u32),
            can::Id::Extended(id) => Id::Extended(id.as_raw()),
        }
    }
}

impl From<Id> for can::Id {
    /// Bits above the identifier width are dropped.
    fn from(id: Id) -> Self {
        match id {
            Id::Standard(raw) => can::Id::Standard(
                can::StandardId::new((raw & 0x7FF) as u16).unwrap_or(can::StandardId::ZERO),
            ),
            Id::Extended(raw) => can::Id::Extended(
                can::ExtendedId::new(raw & 0x1FFF_FFFF).unwrap_or(can::ExtendedId::ZERO),
            ),
        }
    }
}

impl can::Frame for Frame {
    fn new(id: impl Into<can::Id>, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }

        let id: can::Id = id.into();
        Some(Frame::new(Id::from(id), data))
    }

    fn new_remote(id: impl Into<can::Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }

        let id: can::Id = id.into();
        Some(Frame::new_remote(Id::from(id), dlc as u8))
    }

    #[inline]
    fn is_extended(&self) -> bool {
        self.id.is_extended()
    }

    #[inline]
    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    #[inline]
    fn id(&self) -> can::Id {
        self.id.into()
    }

    #[inline]
    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.dlc.min(8) as usize]
        }
    }
}

impl<R: RegisterAccess> can::nb::Can for Can<R> {
    type Frame = Frame;

    type Error = RxTxError;

    /// Never replaces a pending frame, so the result is always `Ok(None)`
    /// once a mailbox is free.
    fn transmit(&mut self, frame: &Self::Frame) -> nb::Result<Option<Self::Frame>, Self::Error> {
        match Can::transmit(self, frame) {
            Ok(_) => Ok(None),
            Err(RxTxError::MailboxUnavailable) => Err(nb::Error::WouldBlock),
            Err(err) => Err(nb::Error::Other(err)),
        }
    }

    /// Drains FIFO 0 before FIFO 1. A lost frame is reported once as
    /// [`RxTxError::FifoOverrun`].
    fn receive(&mut self) -> nb::Result<Self::Frame, Self::Error> {
        for fifo in [Fifo::Fifo0, Fifo::Fifo1].iter().copied() {
            if self.is_fifo_overrun(fifo) {
                self.clear_fifo_overrun(fifo);
                return Err(nb::Error::Other(RxTxError::FifoOverrun));
            }

            if let Ok(rx_frame) = self.try_receive(fifo) {
                return Ok(rx_frame.frame);
            }
        }

        Err(nb::Error::WouldBlock)
    }
}
