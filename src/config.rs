//! All configuration related structures and enums

/// Default number of polls of the acknowledge flag before a blocking mode
/// transition gives up.
///
/// The controller only enters init after the frame currently on the bus is
/// finished, which at 100 kbit/s can take around 1.6 ms. How long one poll
/// takes depends on core clock, compiler and optimization level, so this is
/// a loose bound, not a time.
pub const ACK_TIMEOUT: u32 = 0xFFFF;

/// Number of filter banks on this device.
#[cfg(not(feature = "connectivity"))]
pub const FILTER_BANK_COUNT: u8 = 14;
#[cfg(feature = "connectivity")]
pub const FILTER_BANK_COUNT: u8 = 28;

/// One of the bxCAN controllers of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instance {
    Can1,
    Can2,
}

impl Instance {
    pub fn base_address(&self) -> usize {
        match self {
            Instance::Can1 => 0x4000_6400,
            Instance::Can2 => 0x4000_6800,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Instance::Can1 => 0,
            Instance::Can2 => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Id {
    /// 11-bit identifier
    Standard(u32),
    /// 29-bit identifier
    Extended(u32),
}

impl Id {
    pub fn raw(&self) -> u32 {
        match *self {
            Id::Standard(id) | Id::Extended(id) => id,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Id::Extended(_))
    }
}

/// Operating mode as acknowledged by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Init,
    Normal,
    Sleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mailbox {
    Mailbox0,
    Mailbox1,
    Mailbox2,
}

impl Mailbox {
    pub const ALL: [Mailbox; 3] = [Mailbox::Mailbox0, Mailbox::Mailbox1, Mailbox::Mailbox2];

    pub fn index(&self) -> usize {
        match self {
            Mailbox::Mailbox0 => 0,
            Mailbox::Mailbox1 => 1,
            Mailbox::Mailbox2 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fifo {
    Fifo0,
    Fifo1,
}

impl Fifo {
    pub fn index(&self) -> usize {
        match self {
            Fifo::Fifo0 => 0,
            Fifo::Fifo1 => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScale {
    /// Two 16-bit filters per bank
    Dual16,
    /// One 32-bit filter per bank
    Single32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// First register is an identifier, second is a mask
    Mask,
    /// Both registers are identifiers to match exactly
    List,
}

/// Feature flags of the master control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Options {
    /// TTCM: timestamp frames with the internal counter
    pub time_triggered: bool,
    /// ABOM: leave bus-off automatically after the recovery sequence
    pub auto_bus_off: bool,
    /// AWUM: wake from sleep on bus activity
    pub auto_wakeup: bool,
    /// NART: send every frame only once
    pub no_auto_retransmit: bool,
    /// RFLM: discard new frames instead of overwriting when a FIFO is full
    pub rx_fifo_locked: bool,
    /// TXFP: send mailboxes in request order instead of by identifier
    pub tx_fifo_priority: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub bitrate: u32,
    /// Sample point as a fraction of 255, e.g. 204 for 80%
    pub sample_point: u8,
    pub options: Options,
    pub silent: bool,
    pub loopback: bool,
}

impl Config {
    pub fn new(bitrate: u32) -> Self {
        Self {
            bitrate,
            sample_point: 204,
            options: Options::default(),
            silent: false,
            loopback: false,
        }
    }
}
