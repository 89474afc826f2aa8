//! Errors relating to bxCAN

use embedded_hal::can::{Error, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanError {
    InitTimeout,
    LeaveInitTimeout,
    SleepTimeout,
    WakeupTimeout,
    BaudrateTooHigh,
    BaudrateUnreachable,
    PrescalarTooHigh,
    TimingUnsatisfiable,
    InvalidTiming,
    InvalidFilterBank,
}

impl CanError {
    pub fn get_error_message(&self) -> &'static str {
        match self {
            CanError::InitTimeout => "Init mode was not acknowledged, check the bus and clocks",
            CanError::LeaveInitTimeout => "Controller did not leave init mode, check the bus for recessive level",
            CanError::SleepTimeout => "Sleep mode was not acknowledged",
            CanError::WakeupTimeout => "Controller did not leave sleep mode",
            CanError::BaudrateTooHigh => "Baudrate is too high for the peripheral clock",
            CanError::BaudrateUnreachable => "Peripheral clock is not a multiple of the baudrate",
            CanError::PrescalarTooHigh => "Prescalar division is too high, check clock speed & baudrate",
            CanError::TimingUnsatisfiable => "No segment split divides the bit time, check clock speed & baudrate",
            CanError::InvalidTiming => "Bit timing segments are out of range or SJW exceeds TS2",
            CanError::InvalidFilterBank => "Filter bank index is out of range for this device",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxTxError {
    MailboxUnavailable,
    FifoEmpty,
    FifoOverrun,
}

impl Error for RxTxError {
    fn kind(&self) -> ErrorKind {
        match self {
            RxTxError::FifoOverrun => ErrorKind::Overrun,
            _ => ErrorKind::Other,
        }
    }
}
