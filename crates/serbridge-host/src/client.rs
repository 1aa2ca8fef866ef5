//! Host-side serprog client
//!
//! Brings a bridge to a known state and drives it the way a flashing tool
//! does: synchronize, check the interface version, learn the command map,
//! select the SPI bus, then issue `O_SPIOP` transactions.

use crate::error::{HostError, Result};
use crate::transport::Transport;
use serbridge_core::protocol::*;
use serbridge_core::{BusType, CommandMap};

/// Programmer capabilities discovered during initialization
#[derive(Debug, Clone)]
pub struct ProgrammerInfo {
    /// Interface version
    pub iface_version: u16,
    /// Programmer name (up to 16 characters)
    pub name: [u8; PGMNAME_SIZE],
    /// Supported bus types
    pub bustypes: BusType,
    /// Serial buffer size
    pub serbuf_size: u16,
    /// Maximum write-n length (0 = 2^24)
    pub max_write_n: u32,
    /// Maximum read-n length (0 = 2^24)
    pub max_read_n: u32,
    /// Supported commands bitmap
    pub cmdmap: CommandMap,
}

impl Default for ProgrammerInfo {
    fn default() -> Self {
        Self {
            iface_version: 0,
            name: [0; PGMNAME_SIZE],
            bustypes: BusType::empty(),
            serbuf_size: 16,
            max_write_n: 0,
            max_read_n: 0,
            cmdmap: CommandMap::new(),
        }
    }
}

impl ProgrammerInfo {
    /// Get the programmer name as a string
    pub fn name_str(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(PGMNAME_SIZE);
        core::str::from_utf8(&self.name[..len]).unwrap_or("(invalid)")
    }

    /// Get the effective max write length
    pub fn effective_max_write(&self) -> usize {
        if self.max_write_n == 0 {
            MAX_U24 as usize
        } else {
            self.max_write_n as usize
        }
    }

    /// Get the effective max read length
    pub fn effective_max_read(&self) -> usize {
        if self.max_read_n == 0 {
            MAX_U24 as usize
        } else {
            self.max_read_n as usize
        }
    }

    /// Check if SPI bus is supported
    pub fn supports_spi(&self) -> bool {
        self.bustypes.contains(BusType::SPI)
    }

    /// Check if a command is supported
    pub fn supports_cmd(&self, cmd: u8) -> bool {
        self.cmdmap.is_supported(cmd)
    }
}

/// Connection to a serprog bridge
pub struct Serprog<T: Transport> {
    transport: T,
    info: ProgrammerInfo,
    /// Refuse commands missing from the command map
    auto_check: bool,
}

impl<T: Transport> Serprog<T> {
    /// Connect to a bridge over `transport`
    ///
    /// This performs initialization:
    /// 1. Synchronize the protocol
    /// 2. Query interface version
    /// 3. Query command map and bus types
    /// 4. Select the SPI bus
    /// 5. Query name, buffer size and length limits
    pub fn new(transport: T) -> Result<Self> {
        let mut serprog = Self {
            transport,
            info: ProgrammerInfo::default(),
            auto_check: false,
        };

        serprog.synchronize()?;
        log::debug!("serprog: Synchronized");

        let version = serprog.query_iface()?;
        if version != SERPROG_PROTOCOL_VERSION {
            return Err(HostError::UnsupportedVersion(version));
        }
        serprog.info.iface_version = version;
        log::debug!("serprog: Interface version OK ({})", version);

        serprog.info.cmdmap = serprog.query_cmdmap()?;
        serprog.auto_check = true;

        serprog.info.bustypes = serprog.query_bustype().unwrap_or(BusType::NONSPI);
        log::debug!("serprog: Bus support: {:?}", serprog.info.bustypes);

        if !serprog.info.supports_spi() {
            return Err(HostError::SpiNotSupported);
        }
        if !serprog.info.supports_cmd(S_CMD_O_SPIOP) {
            log::error!("serprog: SPI operation not supported while bustype is SPI");
            return Err(HostError::CommandNotSupported(S_CMD_O_SPIOP));
        }

        if !serprog.set_bustype(BusType::SPI)? {
            return Err(HostError::Nak(S_CMD_S_BUSTYPE));
        }

        if let Ok(buf) = serprog.do_command_ret::<3>(S_CMD_Q_WRNMAXLEN) {
            serprog.info.max_write_n = u24_from_le(buf);
            log::debug!(
                "serprog: Maximum write-n length is {}",
                serprog.info.effective_max_write()
            );
        }

        if let Ok(buf) = serprog.do_command_ret::<3>(S_CMD_Q_RDNMAXLEN) {
            serprog.info.max_read_n = u24_from_le(buf);
            log::debug!(
                "serprog: Maximum read-n length is {}",
                serprog.info.effective_max_read()
            );
        }

        if let Ok(name) = serprog.do_command_ret::<PGMNAME_SIZE>(S_CMD_Q_PGMNAME) {
            serprog.info.name = name;
            log::info!(
                "serprog: Programmer name is \"{}\"",
                serprog.info.name_str()
            );
        }

        if let Ok(buf) = serprog.do_command_ret::<2>(S_CMD_Q_SERBUF) {
            serprog.info.serbuf_size = u16::from_le_bytes(buf);
            log::debug!(
                "serprog: Serial buffer size is {}",
                serprog.info.serbuf_size
            );
        }

        Ok(serprog)
    }

    /// Get programmer information
    pub fn info(&self) -> &ProgrammerInfo {
        &self.info
    }

    /// Send a NOP and wait for its ACK
    pub fn nop(&mut self) -> Result<()> {
        self.do_command(S_CMD_NOP, &[], &mut [])
    }

    /// Request a bus selection
    ///
    /// Returns `false` if the bridge NAKs the mask.
    pub fn set_bustype(&mut self, bus: BusType) -> Result<bool> {
        match self.do_command(S_CMD_S_BUSTYPE, &[bus.bits()], &mut []) {
            Ok(()) => Ok(true),
            Err(HostError::Nak(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Perform an SPI operation
    ///
    /// Clocks out `write_data`, then clocks in `read_buf.len()` bytes, all
    /// under one chip select.
    pub fn spi_op(&mut self, write_data: &[u8], read_buf: &mut [u8]) -> Result<()> {
        if write_data.len() > self.info.effective_max_write() {
            return Err(HostError::InvalidParameter(format!(
                "write length {} exceeds {}",
                write_data.len(),
                self.info.effective_max_write()
            )));
        }
        if read_buf.len() > self.info.effective_max_read() {
            return Err(HostError::InvalidParameter(format!(
                "read length {} exceeds {}",
                read_buf.len(),
                self.info.effective_max_read()
            )));
        }

        let mut params = Vec::with_capacity(6 + write_data.len());
        params.extend_from_slice(&u24_to_le(write_data.len() as u32));
        params.extend_from_slice(&u24_to_le(read_buf.len() as u32));
        params.extend_from_slice(write_data);

        self.do_command(S_CMD_O_SPIOP, &params, read_buf)
    }

    // ---- Protocol implementation ----

    /// Bring the bridge to its waiting-for-opcode state
    pub fn synchronize(&mut self) -> Result<()> {
        if self.test_sync()? {
            return Ok(());
        }

        log::debug!("serprog: Attempting to synchronize");

        // Complete whatever request the bridge might be stuck in
        self.transport.write(&[S_CMD_NOP; 8])?;

        let mut buf = [0u8; 512];
        for _ in 0..1024 {
            if self.transport.read_nonblock(&mut buf, 10)? == 0 {
                break;
            }
        }

        for _ in 0..8 {
            if self.test_sync()? {
                return Ok(());
            }
        }

        Err(HostError::SyncFailed)
    }

    /// Send SYNCNOP and look for NAK+ACK, twice in a row
    fn test_sync(&mut self) -> Result<bool> {
        self.transport.write(&[S_CMD_SYNCNOP])?;

        let mut c = [0u8];
        for _ in 0..10 {
            let n = self.transport.read_nonblock(&mut c, 50)?;
            if n == 0 || c[0] != S_NAK {
                continue;
            }

            let n = self.transport.read_nonblock(&mut c, 20)?;
            if n == 0 || c[0] != S_ACK {
                continue;
            }

            self.transport.write(&[S_CMD_SYNCNOP])?;

            let n = self.transport.read_nonblock(&mut c, 500)?;
            if n == 0 || c[0] != S_NAK {
                return Ok(false);
            }

            let n = self.transport.read_nonblock(&mut c, 100)?;
            if n == 0 || c[0] != S_ACK {
                return Ok(false);
            }

            return Ok(true);
        }

        Ok(false)
    }

    /// Execute a serprog command
    fn do_command(&mut self, cmd: u8, params: &[u8], ret_buf: &mut [u8]) -> Result<()> {
        if self.auto_check && !self.info.supports_cmd(cmd) {
            log::debug!("serprog: Command 0x{:02X} not supported", cmd);
            return Err(HostError::CommandNotSupported(cmd));
        }

        let mut frame = Vec::with_capacity(1 + params.len());
        frame.push(cmd);
        frame.extend_from_slice(params);
        self.transport.write(&frame)?;
        self.transport.flush()?;

        let mut response = [0u8];
        self.transport.read(&mut response)?;

        if response[0] == S_NAK {
            return Err(HostError::Nak(cmd));
        }
        if response[0] != S_ACK {
            return Err(HostError::InvalidResponse {
                command: cmd,
                response: response[0],
            });
        }

        if !ret_buf.is_empty() {
            self.transport.read(ret_buf)?;
        }

        Ok(())
    }

    fn do_command_ret<const N: usize>(&mut self, cmd: u8) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.do_command(cmd, &[], &mut buf)?;
        Ok(buf)
    }

    /// Query interface version
    pub fn query_iface(&mut self) -> Result<u16> {
        let saved = self.auto_check;
        self.auto_check = false;
        let result = self.do_command_ret::<2>(S_CMD_Q_IFACE);
        self.auto_check = saved;
        Ok(u16::from_le_bytes(result?))
    }

    /// Query command map
    pub fn query_cmdmap(&mut self) -> Result<CommandMap> {
        let saved = self.auto_check;
        self.auto_check = false;
        let result = self.do_command_ret::<CMDMAP_SIZE>(S_CMD_Q_CMDMAP);
        self.auto_check = saved;
        Ok(CommandMap { bitmap: result? })
    }

    /// Query bus types
    pub fn query_bustype(&mut self) -> Result<BusType> {
        let buf = self.do_command_ret::<1>(S_CMD_Q_BUSTYPE)?;
        Ok(BusType::from_bits_retain(buf[0]))
    }
}
