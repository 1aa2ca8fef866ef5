//! SPI command implementation

use serbridge_host::SerprogConnection;

/// Run one `O_SPIOP` and print what was clocked in
pub fn run(
    connection: &SerprogConnection,
    write: &[u8],
    read_len: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut serprog = connection.open_client()?;

    let mut buf = vec![0u8; read_len];
    serprog.spi_op(write, &mut buf)?;

    log::info!(
        "Sent {} bytes, received {}",
        write.len(),
        super::format_size(buf.len())
    );
    for line in hex_lines(&buf) {
        println!("{}", line);
    }

    Ok(())
}

/// Hex dump with a 16-byte row width
fn hex_lines(data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(i, row)| {
            let bytes: Vec<String> = row.iter().map(|b| format!("{:02X}", b)).collect();
            format!("{:08X}: {}", i * 16, bytes.join(" "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_lines() {
        assert!(hex_lines(&[]).is_empty());
        assert_eq!(hex_lines(&[0xEF, 0x40, 0x18]), vec!["00000000: EF 40 18"]);

        let lines = hex_lines(&[0u8; 17]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "00000010: 00");
    }
}
