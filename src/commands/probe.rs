//! Probe command implementation

use serbridge_core::protocol::*;
use serbridge_host::SerprogConnection;

/// Connect to a bridge and print what it reports
pub fn run(connection: &SerprogConnection) -> Result<(), Box<dyn std::error::Error>> {
    let mut serprog = connection.open_client()?;
    let info = serprog.info().clone();

    println!("serprog bridge at {}", connection);
    println!("  Name:              {}", info.name_str());
    println!("  Interface version: {}", info.iface_version);
    println!("  Bus types:         {:?}", info.bustypes);
    println!(
        "  Serial buffer:     {}",
        if info.serbuf_size == SERBUF_UNBOUNDED {
            "unbounded".to_string()
        } else {
            format!("{} bytes", info.serbuf_size)
        }
    );
    println!("  Commands:");
    for op in info.cmdmap.opcodes() {
        println!("    0x{:02X} {}", op, opcode_name(op));
    }

    // RDID through O_SPIOP; a missing chip reads back as all ones
    let mut id = [0u8; 3];
    serprog.spi_op(&[0x9F], &mut id)?;
    if id == [0xFF; 3] || id == [0x00; 3] {
        println!("  JEDEC ID:          no chip responded");
    } else {
        println!(
            "  JEDEC ID:          {:02X} {:02X}{:02X}",
            id[0], id[1], id[2]
        );
    }

    Ok(())
}

/// Protocol name of a serprog opcode
fn opcode_name(op: u8) -> &'static str {
    match op {
        S_CMD_NOP => "NOP",
        S_CMD_Q_IFACE => "Q_IFACE",
        S_CMD_Q_CMDMAP => "Q_CMDMAP",
        S_CMD_Q_PGMNAME => "Q_PGMNAME",
        S_CMD_Q_SERBUF => "Q_SERBUF",
        S_CMD_Q_BUSTYPE => "Q_BUSTYPE",
        S_CMD_Q_CHIPSIZE => "Q_CHIPSIZE",
        S_CMD_Q_OPBUF => "Q_OPBUF",
        S_CMD_Q_WRNMAXLEN => "Q_WRNMAXLEN",
        S_CMD_R_BYTE => "R_BYTE",
        S_CMD_R_NBYTES => "R_NBYTES",
        S_CMD_O_INIT => "O_INIT",
        S_CMD_O_WRITEB => "O_WRITEB",
        S_CMD_O_WRITEN => "O_WRITEN",
        S_CMD_O_DELAY => "O_DELAY",
        S_CMD_O_EXEC => "O_EXEC",
        S_CMD_SYNCNOP => "SYNCNOP",
        S_CMD_Q_RDNMAXLEN => "Q_RDNMAXLEN",
        S_CMD_S_BUSTYPE => "S_BUSTYPE",
        S_CMD_O_SPIOP => "O_SPIOP",
        S_CMD_S_SPI_FREQ => "S_SPI_FREQ",
        S_CMD_S_PIN_STATE => "S_PIN_STATE",
        S_CMD_S_SPI_CS => "S_SPI_CS",
        S_CMD_S_SPI_MODE => "S_SPI_MODE",
        S_CMD_S_CS_MODE => "S_CS_MODE",
        _ => "(unknown)",
    }
}
