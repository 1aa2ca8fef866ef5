//! serbridge-emu - Emulated SPI NOR flash
//!
//! This crate provides a flash chip that sits on the far side of a
//! [`SpiBus`] and answers byte by byte, the way a real chip answers while
//! chip select is held. It lets the bridge run on a host and be driven by a
//! real flashing tool without any hardware attached.
//!
//! Only the common single-I/O command set is understood. Anything else is
//! clocked through with the bus idling high.

use bitflags::bitflags;
use core::convert::Infallible;
use serbridge_core::SpiBus;

/// SPI NOR opcodes understood by the emulator
pub mod opcodes {
    /// Read JEDEC ID
    pub const RDID: u8 = 0x9F;
    /// Read data, 3-byte address
    pub const READ: u8 = 0x03;
    /// Read status register 1
    pub const RDSR: u8 = 0x05;
    /// Write enable
    pub const WREN: u8 = 0x06;
    /// Write disable
    pub const WRDI: u8 = 0x04;
    /// Page program, 3-byte address
    pub const PP: u8 = 0x02;
    /// 4 KiB sector erase, 3-byte address
    pub const SE_20: u8 = 0x20;
    /// Chip erase
    pub const CE_60: u8 = 0x60;
    /// Chip erase (alternate opcode)
    pub const CE_C7: u8 = 0xC7;
}

bitflags! {
    /// Status register 1
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Program or erase in progress (never set: operations are instant)
        const BUSY = 0x01;
        /// Write enable latch
        const WEL = 0x02;
    }
}

/// Byte the chip drives when it has nothing to say
const IDLE: u8 = 0xFF;

/// Number of address bytes after READ, PP and SE
const ADDR_BYTES: u8 = 3;

/// Configuration for the emulated flash
#[derive(Debug, Clone)]
pub struct FlashConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Sector size for the 0x20 erase
    pub sector_size: usize,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4018,     // W25Q128FV
            size: 16 * 1024 * 1024,
            page_size: 256,
            sector_size: 4096,
        }
    }
}

impl FlashConfig {
    /// The three bytes answered to RDID
    pub fn jedec_id(&self) -> [u8; 3] {
        [
            self.manufacturer_id,
            (self.device_id >> 8) as u8,
            self.device_id as u8,
        ]
    }

    /// Split a 24-bit JEDEC ID (`0xEF4018`) into manufacturer and device
    pub fn with_jedec_id(mut self, id: u32) -> Self {
        self.manufacturer_id = (id >> 16) as u8;
        self.device_id = id as u16;
        self
    }
}

/// Where the chip is within the current select window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Chip select is high
    Deselected,
    /// Selected, next byte is the opcode
    Opcode,
    /// Collecting address bytes for `op`
    Address { op: u8, got: u8 },
    /// Past the header of `op`; `index` counts payload bytes so far
    Payload { op: u8, index: usize },
}

/// Emulated SPI NOR flash
///
/// Program and read act on every byte as it is clocked. Write enable,
/// write disable and erases take effect when chip select is released, like
/// on real parts.
pub struct EmulatedFlash {
    config: FlashConfig,
    data: Vec<u8>,
    status: Status,
    phase: Phase,
    addr: usize,
    /// A program was attempted in this window with WEL set
    programmed: bool,
}

impl EmulatedFlash {
    /// Create an erased flash with the given configuration
    pub fn new(config: FlashConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            status: Status::empty(),
            phase: Phase::Deselected,
            addr: 0,
            programmed: false,
        }
    }

    /// Create a flash with default configuration (W25Q128FV)
    pub fn new_default() -> Self {
        Self::new(FlashConfig::default())
    }

    /// Create a flash with pre-filled data
    ///
    /// Data past the end of the chip is dropped.
    pub fn with_data(config: FlashConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Current status register
    pub fn status(&self) -> Status {
        self.status
    }

    fn write_enabled(&self) -> bool {
        self.status.contains(Status::WEL)
    }

    fn wrap(&self, addr: usize) -> usize {
        addr % self.data.len().max(1)
    }

    /// Byte driven on MISO for the clock window that follows `phase`
    fn drive(&self) -> u8 {
        match self.phase {
            Phase::Payload { op: opcodes::RDID, index } => {
                self.config.jedec_id().get(index).copied().unwrap_or(IDLE)
            }
            Phase::Payload { op: opcodes::RDSR, .. } => self.status.bits(),
            Phase::Payload { op: opcodes::READ, index } => {
                let at = self.wrap(self.addr + index);
                self.data.get(at).copied().unwrap_or(IDLE)
            }
            _ => IDLE,
        }
    }

    /// Advance the state machine with the byte just received on MOSI
    fn accept(&mut self, mosi: u8) {
        self.phase = match self.phase {
            Phase::Deselected => Phase::Deselected,
            Phase::Opcode => match mosi {
                opcodes::READ | opcodes::PP | opcodes::SE_20 => {
                    self.addr = 0;
                    Phase::Address { op: mosi, got: 0 }
                }
                op => Phase::Payload { op, index: 0 },
            },
            Phase::Address { op, got } => {
                self.addr = (self.addr << 8) | mosi as usize;
                if got + 1 == ADDR_BYTES {
                    self.addr = self.wrap(self.addr);
                    Phase::Payload { op, index: 0 }
                } else {
                    Phase::Address { op, got: got + 1 }
                }
            }
            Phase::Payload { op, index } => {
                if op == opcodes::PP {
                    self.program(index, mosi);
                }
                Phase::Payload {
                    op,
                    index: index + 1,
                }
            }
        };
    }

    fn program(&mut self, index: usize, byte: u8) {
        if !self.write_enabled() {
            return;
        }
        let page = self.config.page_size.max(1);
        let base = self.addr - self.addr % page;
        let at = self.wrap(base + (self.addr % page + index) % page);
        // Programming can only clear bits
        if let Some(cell) = self.data.get_mut(at) {
            *cell &= byte;
            self.programmed = true;
        }
    }

    fn erase(&mut self, start: usize, len: usize) {
        let end = core::cmp::min(start + len, self.data.len());
        self.data[start..end].fill(0xFF);
    }

    /// Apply whatever the finished select window commits to
    fn commit(&mut self, phase: Phase) {
        let op = match phase {
            Phase::Payload { op, .. } => op,
            // Address incomplete, or nothing clocked at all
            _ => return,
        };

        match op {
            opcodes::WREN => self.status.insert(Status::WEL),
            opcodes::WRDI => self.status.remove(Status::WEL),
            opcodes::PP if self.programmed => {
                log::debug!("Emulated flash: page program at 0x{:06X}", self.addr);
                self.status.remove(Status::WEL);
            }
            opcodes::SE_20 if self.write_enabled() => {
                let sector = self.config.sector_size.max(1);
                let start = self.addr - self.addr % sector;
                log::debug!("Emulated flash: sector erase at 0x{:06X}", start);
                self.erase(start, sector);
                self.status.remove(Status::WEL);
            }
            opcodes::CE_60 | opcodes::CE_C7 if self.write_enabled() => {
                log::debug!("Emulated flash: chip erase");
                self.erase(0, self.data.len());
                self.status.remove(Status::WEL);
            }
            _ => {}
        }
    }
}

impl SpiBus for EmulatedFlash {
    type Error = Infallible;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.phase = Phase::Opcode;
        self.programmed = false;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        let phase = core::mem::replace(&mut self.phase, Phase::Deselected);
        self.commit(phase);
        Ok(())
    }

    fn exchange(&mut self, out: u8) -> Result<u8, Self::Error> {
        let miso = self.drive();
        self.accept(out);
        Ok(miso)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serbridge_core::{ByteTransport, Dispatcher, DEFAULT_IDENTITY};
    use std::collections::VecDeque;

    /// Run one select window and return what came back on MISO
    fn transact(flash: &mut EmulatedFlash, mosi: &[u8]) -> Vec<u8> {
        flash.select().unwrap();
        let miso = mosi.iter().map(|&b| flash.exchange(b).unwrap()).collect();
        flash.deselect().unwrap();
        miso
    }

    fn read(flash: &mut EmulatedFlash, addr: u32, len: usize) -> Vec<u8> {
        let mut mosi = vec![opcodes::READ, (addr >> 16) as u8, (addr >> 8) as u8, addr as u8];
        mosi.resize(4 + len, 0);
        transact(flash, &mosi)[4..].to_vec()
    }

    fn program(flash: &mut EmulatedFlash, addr: u32, data: &[u8]) {
        transact(flash, &[opcodes::WREN]);
        let mut mosi = vec![opcodes::PP, (addr >> 16) as u8, (addr >> 8) as u8, addr as u8];
        mosi.extend_from_slice(data);
        transact(flash, &mosi);
    }

    #[test]
    fn test_read_jedec_id() {
        let mut flash = EmulatedFlash::new_default();
        let miso = transact(&mut flash, &[opcodes::RDID, 0, 0, 0, 0]);
        assert_eq!(miso, vec![0xFF, 0xEF, 0x40, 0x18, 0xFF]);
    }

    #[test]
    fn test_custom_jedec_id() {
        let config = FlashConfig::default().with_jedec_id(0xC22017);
        assert_eq!(config.jedec_id(), [0xC2, 0x20, 0x17]);
    }

    #[test]
    fn test_read_write() {
        let mut flash = EmulatedFlash::new_default();
        let data = [0x12, 0x34, 0x56, 0x78];
        program(&mut flash, 0x1000, &data);
        assert_eq!(read(&mut flash, 0x1000, 4), data);
        assert_eq!(read(&mut flash, 0x1004, 1), vec![0xFF]);
    }

    #[test]
    fn test_program_requires_wel() {
        let mut flash = EmulatedFlash::new_default();
        transact(&mut flash, &[opcodes::PP, 0, 0, 0, 0x00]);
        assert_eq!(flash.data()[0], 0xFF);
    }

    #[test]
    fn test_program_only_clears_bits() {
        let mut flash = EmulatedFlash::new_default();
        program(&mut flash, 0, &[0xF0]);
        program(&mut flash, 0, &[0x3C]);
        assert_eq!(flash.data()[0], 0x30);
    }

    #[test]
    fn test_program_wraps_within_page() {
        let mut flash = EmulatedFlash::new_default();
        program(&mut flash, 0x01FE, &[0x01, 0x02, 0x03]);
        assert_eq!(&flash.data()[0x1FE..0x200], &[0x01, 0x02]);
        assert_eq!(flash.data()[0x100], 0x03);
        assert_eq!(flash.data()[0x200], 0xFF);
    }

    #[test]
    fn test_wel_latched_on_deselect() {
        let mut flash = EmulatedFlash::new_default();
        flash.select().unwrap();
        flash.exchange(opcodes::WREN).unwrap();
        assert!(!flash.status().contains(Status::WEL));
        flash.deselect().unwrap();
        assert!(flash.status().contains(Status::WEL));

        let miso = transact(&mut flash, &[opcodes::RDSR, 0, 0]);
        assert_eq!(miso, vec![0xFF, 0x02, 0x02]);

        transact(&mut flash, &[opcodes::WRDI]);
        assert_eq!(flash.status(), Status::empty());
    }

    #[test]
    fn test_program_clears_wel() {
        let mut flash = EmulatedFlash::new_default();
        program(&mut flash, 0, &[0x00]);
        assert_eq!(flash.status(), Status::empty());
    }

    #[test]
    fn test_erase() {
        let mut flash = EmulatedFlash::new_default();
        program(&mut flash, 0x0FFF, &[0x00]);
        program(&mut flash, 0x1000, &[0x00]);

        transact(&mut flash, &[opcodes::WREN]);
        transact(&mut flash, &[opcodes::SE_20, 0x00, 0x0A, 0xBC]);

        assert_eq!(flash.data()[0x0FFF], 0xFF);
        assert_eq!(flash.data()[0x1000], 0x00);
        assert_eq!(flash.status(), Status::empty());
    }

    #[test]
    fn test_erase_requires_wel_and_full_address() {
        let mut flash = EmulatedFlash::with_data(FlashConfig::default(), &[0x00; 16]);
        transact(&mut flash, &[opcodes::SE_20, 0, 0, 0]);
        assert_eq!(flash.data()[0], 0x00);

        transact(&mut flash, &[opcodes::WREN]);
        transact(&mut flash, &[opcodes::SE_20, 0, 0]);
        assert_eq!(flash.data()[0], 0x00);
        assert!(flash.status().contains(Status::WEL));
    }

    #[test]
    fn test_chip_erase() {
        let config = FlashConfig {
            size: 64 * 1024,
            ..FlashConfig::default()
        };
        let mut flash = EmulatedFlash::with_data(config, &[0x55; 64 * 1024]);
        transact(&mut flash, &[opcodes::WREN]);
        transact(&mut flash, &[opcodes::CE_C7]);
        assert!(flash.data().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_read_wraps_at_end() {
        let config = FlashConfig {
            size: 4096,
            ..FlashConfig::default()
        };
        let mut image = vec![0xFF; 4096];
        image[0] = 0xAA;
        image[4095] = 0x55;
        let mut flash = EmulatedFlash::with_data(config, &image);
        assert_eq!(read(&mut flash, 4095, 2), vec![0x55, 0xAA]);
    }

    #[test]
    fn test_zero_size_chip() {
        let config = FlashConfig {
            size: 0,
            ..FlashConfig::default()
        };
        let mut flash = EmulatedFlash::new(config);
        program(&mut flash, 0, &[0x00]);
        assert!(flash.data().is_empty());
        assert_eq!(read(&mut flash, 0, 2), vec![0xFF, 0xFF]);

        // Nothing was programmed, so WEL stays set
        assert_eq!(transact(&mut flash, &[opcodes::RDSR, 0]), vec![0xFF, 0x02]);
        transact(&mut flash, &[opcodes::CE_60]);
        assert!(flash.data().is_empty());
    }

    #[test]
    fn test_unknown_opcode_idles_high() {
        let mut flash = EmulatedFlash::new_default();
        assert_eq!(transact(&mut flash, &[0xAB, 0, 0]), vec![0xFF; 3]);
    }

    /// Scripted host link for driving the dispatcher
    struct Host {
        input: VecDeque<u8>,
        output: Vec<u8>,
    }

    impl Host {
        fn new(input: &[u8]) -> Self {
            Self {
                input: input.iter().copied().collect(),
                output: vec![],
            }
        }
    }

    impl ByteTransport for Host {
        type Error = ();

        fn send_byte(&mut self, byte: u8) -> Result<(), ()> {
            self.output.push(byte);
            Ok(())
        }

        fn receive_byte(&mut self) -> Result<u8, ()> {
            self.input.pop_front().ok_or(())
        }
    }

    fn serve(flash: &mut EmulatedFlash, input: &[u8]) -> Vec<u8> {
        let mut d = Dispatcher::new(Host::new(input), flash, DEFAULT_IDENTITY);
        while d.poll().is_ok() {}
        let (host, _) = d.into_parts();
        host.output
    }

    #[test]
    fn test_rdid_through_dispatcher() {
        let mut flash = EmulatedFlash::new_default();
        let out = serve(&mut flash, &[0x13, 0x01, 0x00, 0x00, 0x03, 0x00, 0x00, 0x9F]);
        assert_eq!(out, vec![0x06, 0xEF, 0x40, 0x18]);
    }

    #[test]
    fn test_program_and_read_through_dispatcher() {
        let mut flash = EmulatedFlash::new_default();
        let mut input = vec![];
        // WREN
        input.extend_from_slice(&[0x13, 1, 0, 0, 0, 0, 0, 0x06]);
        // PP 0x000100 <- DE AD
        input.extend_from_slice(&[0x13, 6, 0, 0, 0, 0, 0, 0x02, 0x00, 0x01, 0x00, 0xDE, 0xAD]);
        // RDSR
        input.extend_from_slice(&[0x13, 1, 0, 0, 1, 0, 0, 0x05]);
        // READ 0x000100, 3 bytes
        input.extend_from_slice(&[0x13, 4, 0, 0, 3, 0, 0, 0x03, 0x00, 0x01, 0x00]);

        let out = serve(&mut flash, &input);
        assert_eq!(out, vec![0x06, 0x06, 0x06, 0x00, 0x06, 0xDE, 0xAD, 0xFF]);
    }

    #[test]
    fn test_erase_through_dispatcher() {
        let mut flash = EmulatedFlash::with_data(FlashConfig::default(), &[0x00; 8192]);
        let mut input = vec![];
        input.extend_from_slice(&[0x13, 1, 0, 0, 0, 0, 0, 0x06]);
        input.extend_from_slice(&[0x13, 4, 0, 0, 0, 0, 0, 0x20, 0x00, 0x10, 0x00]);
        serve(&mut flash, &input);

        assert!(flash.data()[..4096].iter().all(|&b| b == 0x00));
        assert!(flash.data()[4096..8192].iter().all(|&b| b == 0xFF));
    }
}
