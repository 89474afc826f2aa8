//! Simulated bxCAN register file
//!
//! Models the parts of the controller the driver relies on: mode
//! request/acknowledge, mailbox ownership, FIFO queues, the write-1-to-clear
//! status bits and the filter init latch. Everything else behaves as plain
//! memory.

use crate::mmio::RegisterAccess;
use crate::registers::*;

const WORDS: usize = BLOCK_SIZE / 4;
const FIFO_DEPTH: usize = 3;

const MCR_RESET: u32 = 0x0001_0002;
const MSR_RESET: u32 = 0x0000_0C02;
const TSR_RESET: u32 = 0x1C00_0000;
const BTR_RESET: u32 = 0x0123_0000;
const FMR_RESET: u32 = 0x2A1C_0E01;

pub struct SimRegisters {
    regs: [u32; WORDS],
    fifos: [[[u32; 4]; FIFO_DEPTH]; 2],
    pending: [usize; 2],
    stall_acks: bool,
    writes: usize,
    latch_violations: usize,
}

impl SimRegisters {
    pub fn new() -> Self {
        let mut sim = Self {
            regs: [0; WORDS],
            fifos: [[[0; 4]; FIFO_DEPTH]; 2],
            pending: [0; 2],
            stall_acks: false,
            writes: 0,
            latch_violations: 0,
        };
        sim.power_on_reset();
        sim
    }

    /// Puts every register back to its reset value and empties the FIFOs.
    pub fn power_on_reset(&mut self) {
        self.regs = [0; WORDS];
        self.fifos = [[[0; 4]; FIFO_DEPTH]; 2];
        self.pending = [0; 2];
        self.poke(MCR, MCR_RESET);
        self.poke(MSR, MSR_RESET);
        self.poke(TSR, TSR_RESET);
        self.poke(BTR, BTR_RESET);
        self.poke(FMR, FMR_RESET);
    }

    /// While stalled, mode requests are stored but never acknowledged.
    pub fn set_stall_acks(&mut self, stall: bool) {
        self.stall_acks = stall;
    }

    /// Reads a register without going through the driver.
    pub fn peek(&self, offset: usize) -> u32 {
        self.regs[offset / 4]
    }

    /// Writes a register without any simulated side effect.
    pub fn poke(&mut self, offset: usize, value: u32) {
        self.regs[offset / 4] = value;
    }

    pub fn snapshot(&self) -> [u32; WORDS] {
        self.regs
    }

    /// Number of writes issued through [`RegisterAccess`].
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Marks a mailbox as owned by the hardware.
    /// Filter configuration writes dropped because FMR.FINIT was clear.
    pub fn latch_violations(&self) -> usize {
        self.latch_violations
    }

    fn filter_init(&self) -> bool {
        self.peek(FMR) & FmrField::FINIT.mask() != 0
    }

    pub fn occupy_mailbox(&mut self, mailbox: usize) {
        let tsr = self.peek(TSR) & !TsrField::TME(mailbox).mask();
        self.poke(TSR, tsr);
    }

    /// Finishes the pending transmission of `mailbox` successfully.
    pub fn complete_transmission(&mut self, mailbox: usize) {
        let ir = tx_mailbox(mailbox) + MB_IR;
        self.poke(ir, self.peek(ir) & !IdField::TXRQ.mask());

        let tsr = self.peek(TSR)
            | TsrField::TME(mailbox).mask()
            | TsrField::RQCP(mailbox).mask()
            | TsrField::TXOK(mailbox).mask();
        self.poke(TSR, tsr);
    }

    /// Queues a received frame given as raw RIxR/RDTxR/RDLxR/RDHxR values.
    /// Returns false and flags an overrun when the FIFO is already full.
    pub fn push_rx(&mut self, fifo: usize, ir: u32, dtr: u32, dlr: u32, dhr: u32) -> bool {
        let status = rx_fifo_status(fifo);

        if self.pending[fifo] == FIFO_DEPTH {
            self.poke(status, self.peek(status) | RfrField::FOVR.mask());
            return false;
        }

        self.fifos[fifo][self.pending[fifo]] = [ir, dtr, dlr, dhr];
        self.pending[fifo] += 1;
        self.sync_fifo(fifo);
        true
    }

    pub fn pending(&self, fifo: usize) -> usize {
        self.pending[fifo]
    }

    fn sync_fifo(&mut self, fifo: usize) {
        let status = rx_fifo_status(fifo);
        let mut rfr: Bitfield<RfrField> = Bitfield::from_bits(self.peek(status));
        rfr.write_field(RfrField::FMP, self.pending[fifo] as u32);
        if self.pending[fifo] == FIFO_DEPTH {
            rfr.set(RfrField::FULL, true);
        }
        self.poke(status, rfr.bits());

        // An empty FIFO leaves the previous frame in the output registers
        if self.pending[fifo] > 0 {
            let head = self.fifos[fifo][0];
            let base = rx_fifo(fifo);
            self.poke(base + MB_IR, head[0]);
            self.poke(base + MB_DTR, head[1]);
            self.poke(base + MB_DLR, head[2]);
            self.poke(base + MB_DHR, head[3]);
        }
    }

    fn release_fifo(&mut self, fifo: usize) {
        if self.pending[fifo] == 0 {
            return;
        }

        for slot in 1..FIFO_DEPTH {
            self.fifos[fifo][slot - 1] = self.fifos[fifo][slot];
        }
        self.pending[fifo] -= 1;
        self.sync_fifo(fifo);
    }

    fn write_mcr(&mut self, value: u32) {
        if value & McrField::RESET.mask() != 0 {
            self.power_on_reset();
            return;
        }

        self.poke(MCR, value & 0x0001_00FF);
        if self.stall_acks {
            return;
        }

        let mut msr: Bitfield<MsrField> = Bitfield::from_bits(self.peek(MSR));
        let inrq = value & McrField::INRQ.mask() != 0;
        let sleep = value & McrField::SLEEP.mask() != 0;
        msr.set(MsrField::INAK, inrq);
        msr.set(MsrField::SLAK, sleep && !inrq);
        self.poke(MSR, msr.bits());
    }

    fn write_tsr(&mut self, value: u32) {
        let mut tsr = self.peek(TSR);

        for mb in 0..3 {
            if value & TsrField::RQCP(mb).mask() != 0 {
                tsr &= !(TsrField::RQCP(mb).mask()
                    | TsrField::TXOK(mb).mask()
                    | TsrField::ALST(mb).mask()
                    | TsrField::TERR(mb).mask());
            }

            if value & TsrField::ABRQ(mb).mask() != 0 && tsr & TsrField::TME(mb).mask() == 0 {
                let ir = tx_mailbox(mb) + MB_IR;
                self.poke(ir, self.peek(ir) & !IdField::TXRQ.mask());
                tsr |= TsrField::TME(mb).mask() | TsrField::RQCP(mb).mask();
                tsr &= !TsrField::TXOK(mb).mask();
            }
        }

        self.poke(TSR, tsr);
    }

    /// Filter mode, scale, FIFO assignment and bank contents only take while
    /// the latch is held.
    fn write_filter_config(&mut self, offset: usize, value: u32) {
        if self.filter_init() {
            self.poke(offset, value);
        } else if self.peek(offset) != value {
            self.latch_violations += 1;
        }
    }

    fn write_fmr(&mut self, value: u32) {
        let can2sb = FmrField::CAN2SB.mask();
        let old = self.peek(FMR);

        if self.filter_init() || value & FmrField::FINIT.mask() != 0 {
            self.poke(FMR, value);
        } else {
            if (old ^ value) & can2sb != 0 {
                self.latch_violations += 1;
            }
            self.poke(FMR, (value & !can2sb) | (old & can2sb));
        }
    }

    fn write_rfr(&mut self, fifo: usize, value: u32) {
        let status = rx_fifo_status(fifo);
        let cleared = value & (RfrField::FULL.mask() | RfrField::FOVR.mask());
        self.poke(status, self.peek(status) & !cleared);

        if value & RfrField::RFOM.mask() != 0 {
            self.release_fifo(fifo);
        }
    }
}

impl Default for SimRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterAccess for SimRegisters {
    fn read(&self, offset: usize) -> u32 {
        self.peek(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.writes += 1;

        match offset {
            MCR => self.write_mcr(value),
            MSR => {
                let cleared = value
                    & (MsrField::SLAKI.mask() | MsrField::WKUI.mask() | MsrField::ERRI.mask());
                self.poke(MSR, self.peek(MSR) & !cleared);
            }
            TSR => self.write_tsr(value),
            RF0R => self.write_rfr(0, value),
            RF1R => self.write_rfr(1, value),
            ESR => {
                let esr = (self.peek(ESR) & !EsrField::LEC.mask()) | (value & EsrField::LEC.mask());
                self.poke(ESR, esr);
            }
            _ if offset >= RX_FIFO_BASE && offset < FMR => {}
            FMR => self.write_fmr(value),
            FM1R | FS1R | FFA1R => self.write_filter_config(offset, value),
            _ if offset >= FILTER_BANK_BASE && offset < BLOCK_SIZE => {
                self.write_filter_config(offset, value)
            }
            _ => {
                self.poke(offset, value);

                for mb in 0..3 {
                    if offset == tx_mailbox(mb) + MB_IR && value & IdField::TXRQ.mask() != 0 {
                        let tsr = self.peek(TSR) & !TsrField::TME(mb).mask();
                        self.poke(TSR, tsr);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_requests_are_acknowledged() {
        let mut sim = SimRegisters::new();
        assert_eq!(sim.read(MSR) & 0x3, 0x2);

        sim.write(MCR, 0x0001_0001);
        assert_eq!(sim.read(MSR) & 0x3, 0x1);

        sim.set_stall_acks(true);
        sim.write(MCR, 0x0001_0000);
        assert_eq!(sim.read(MSR) & 0x3, 0x1);
    }

    #[test]
    fn fifo_queue_and_release() {
        let mut sim = SimRegisters::new();
        assert!(sim.push_rx(1, 0x1, 0x2, 0x3, 0x4));
        assert!(sim.push_rx(1, 0x5, 0x6, 0x7, 0x8));
        assert_eq!(sim.read(RF1R) & 0x3, 2);
        assert_eq!(sim.read(rx_fifo(1) + MB_DHR), 0x4);

        sim.write(RF1R, RfrField::RFOM.mask());
        assert_eq!(sim.read(RF1R) & 0x3, 1);
        assert_eq!(sim.read(rx_fifo(1) + MB_IR), 0x5);

        assert!(sim.push_rx(1, 0, 0, 0, 0));
        assert!(sim.push_rx(1, 0, 0, 0, 0));
        assert!(!sim.push_rx(1, 0, 0, 0, 0));
        assert_ne!(sim.read(RF1R) & RfrField::FOVR.mask(), 0);
        assert_ne!(sim.read(RF1R) & RfrField::FULL.mask(), 0);
    }

    #[test]
    fn transmit_request_takes_the_mailbox() {
        let mut sim = SimRegisters::new();
        sim.write(tx_mailbox(1) + MB_IR, IdField::TXRQ.mask());
        assert_eq!(sim.read(TSR) & 0x1C00_0000, 0x1400_0000);

        sim.complete_transmission(1);
        assert_eq!(sim.read(TSR) & 0x1C00_0000, 0x1C00_0000);
        assert_ne!(sim.read(TSR) & TsrField::TXOK(1).mask(), 0);
    }

    #[test]
    fn filter_config_needs_the_latch() {
        let mut sim = SimRegisters::new();
        sim.write(FMR, sim.read(FMR) & !FmrField::FINIT.mask());

        sim.write(FS1R, 0x1);
        sim.write(filter_bank(0, 0), 0x1234);
        sim.write(FMR, 0x0000_1400);
        assert_eq!(sim.read(FS1R), 0);
        assert_eq!(sim.read(filter_bank(0, 0)), 0);
        assert_eq!(sim.read(FMR) & 0x3F00, 0x0E00);
        assert_eq!(sim.latch_violations(), 3);

        sim.write(FA1R, 0x1);
        assert_eq!(sim.read(FA1R), 0x1);

        sim.write(FMR, sim.read(FMR) | FmrField::FINIT.mask());
        sim.write(FS1R, 0x1);
        sim.write(filter_bank(0, 0), 0x1234);
        assert_eq!(sim.read(FS1R), 0x1);
        assert_eq!(sim.read(filter_bank(0, 0)), 0x1234);
        assert_eq!(sim.latch_violations(), 3);
    }
}
