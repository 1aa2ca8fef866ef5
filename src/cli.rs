//! CLI argument parsing

use clap::{Parser, Subcommand};
use serbridge_core::protocol::{MAX_U24, PGMNAME_SIZE};
use serbridge_host::SerprogConnection;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a size string like "16MiB", "4 KiB" or "0x1000000"
pub fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = parse_hex_u32(s) {
        return Ok(n);
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix('b') {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u32 = num_str
        .parse()
        .map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

/// Parse a flash size: non-zero and reachable with 3-byte addresses
fn parse_flash_size(s: &str) -> Result<u32, String> {
    let size = parse_size(s)?;
    if size == 0 || size > MAX_U24 + 1 {
        return Err(format!("flash size must be between 1 B and 16 MiB, got {}", s));
    }
    Ok(size)
}

/// Parse a 24-bit JEDEC ID such as `0xEF4018`
fn parse_jedec_id(s: &str) -> Result<u32, String> {
    let id = parse_hex_u32(s)?;
    if id > MAX_U24 {
        return Err(format!("JEDEC ID must fit in 3 bytes: {}", s));
    }
    Ok(id)
}

/// Parse an O_SPIOP read length, which travels as 3 bytes
fn parse_read_len(s: &str) -> Result<u32, String> {
    let len = parse_hex_u32(s)?;
    if len > MAX_U24 {
        return Err(format!("read length must fit in 3 bytes: {}", s));
    }
    Ok(len)
}

/// Parse a programmer name that fits the 16-byte name field
fn parse_name(s: &str) -> Result<String, String> {
    if !s.is_ascii() {
        return Err("programmer name must be ASCII".to_string());
    }
    if s.len() > PGMNAME_SIZE {
        return Err(format!(
            "programmer name is {} bytes, at most {} fit",
            s.len(),
            PGMNAME_SIZE
        ));
    }
    Ok(s.to_string())
}

/// Parse hex bytes: "9f", "9F 00 10 00", "0x02,0x00" or "02001000"
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let mut digits = String::new();
    for token in s.split(|c: char| c.is_whitespace() || c == ',' || c == ':') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if token.len() % 2 == 1 {
            digits.push('0');
        }
        digits.push_str(token);
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            let pair = digits.get(i..i + 2).ok_or("invalid hex string")?;
            u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte: {}", pair))
        })
        .collect()
}

#[derive(Parser)]
#[command(name = "serbridge")]
#[command(author, version, about = "serprog SPI bridge and client", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bridge against an emulated flash chip
    Serve {
        /// Where to listen: ip=<host>:<port> or dev=<path>[:<baud>]
        #[arg(short, long, value_parser = SerprogConnection::parse)]
        connection: SerprogConnection,

        /// Initial flash contents
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Flash size (e.g. 16MiB, 0x100000)
        #[arg(short, long, default_value = "16MiB", value_parser = parse_flash_size)]
        size: u32,

        /// JEDEC ID answered to RDID (hex, e.g. 0xEF4018)
        #[arg(long, default_value = "0xEF4018", value_parser = parse_jedec_id)]
        jedec_id: u32,

        /// Programmer name reported to clients
        #[arg(long, default_value = "serbridge", value_parser = parse_name)]
        name: String,
    },

    /// Connect to a bridge and show its capabilities
    Probe {
        /// Bridge to connect to: ip=<host>:<port> or dev=<path>[:<baud>]
        #[arg(short, long, value_parser = SerprogConnection::parse)]
        connection: SerprogConnection,
    },

    /// Run one SPI transaction through a bridge
    Spi {
        /// Bridge to connect to: ip=<host>:<port> or dev=<path>[:<baud>]
        #[arg(short, long, value_parser = SerprogConnection::parse)]
        connection: SerprogConnection,

        /// Bytes to clock out, in hex (e.g. "9f" or "03 00 10 00")
        #[arg(short, long, default_value = "")]
        write: String,

        /// Number of bytes to clock in afterwards
        #[arg(short, long, default_value = "0", value_parser = parse_read_len)]
        read: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x10"), Ok(16));
        assert_eq!(parse_hex_u32("10"), Ok(10));
        assert!(parse_hex_u32("0xZZ").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16MiB"), Ok(16 * 1024 * 1024));
        assert_eq!(parse_size("4 KiB"), Ok(4096));
        assert_eq!(parse_size("0x1000"), Ok(4096));
        assert_eq!(parse_size("512"), Ok(512));
        assert!(parse_size("lots").is_err());
        assert!(parse_flash_size("0").is_err());
        assert!(parse_flash_size("32MiB").is_err());
        assert_eq!(parse_flash_size("16MiB"), Ok(0x100_0000));
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("9f"), Ok(vec![0x9F]));
        assert_eq!(parse_hex_bytes("03 00 10 00"), Ok(vec![0x03, 0x00, 0x10, 0x00]));
        assert_eq!(parse_hex_bytes("0x02,0x00"), Ok(vec![0x02, 0x00]));
        assert_eq!(parse_hex_bytes("02001000"), Ok(vec![0x02, 0x00, 0x10, 0x00]));
        assert_eq!(parse_hex_bytes("0x6"), Ok(vec![0x06]));
        assert_eq!(parse_hex_bytes(""), Ok(vec![]));
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_parse_read_len() {
        assert_eq!(parse_read_len("0xFFFFFF"), Ok(0xFF_FFFF));
        assert!(parse_read_len("0x1000000").is_err());
        assert!(parse_read_len("4294967295").is_err());
        assert!(Cli::try_parse_from([
            "serbridge",
            "spi",
            "-c",
            "ip=127.0.0.1:5555",
            "--read",
            "0x1000000",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_name() {
        assert!(parse_name("pico-serprog").is_ok());
        assert!(parse_name("0123456789abcdefg").is_err());
        assert!(parse_name("flåsh").is_err());
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "serbridge",
            "-vv",
            "serve",
            "-c",
            "ip=127.0.0.1:5555",
            "--jedec-id",
            "0xC22017",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Serve {
                connection,
                size,
                jedec_id,
                name,
                image,
            } => {
                assert_eq!(connection.to_string(), "ip=127.0.0.1:5555");
                assert_eq!(size, 16 * 1024 * 1024);
                assert_eq!(jedec_id, 0xC22017);
                assert_eq!(name, "serbridge");
                assert!(image.is_none());
            }
            _ => panic!("expected serve"),
        }

        assert!(Cli::try_parse_from(["serbridge", "probe", "-c", "tcp://x"]).is_err());
    }
}
