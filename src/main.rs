//! serbridge - serprog SPI bridge
//!
//! Runs the bridge core on a host and talks to bridges as a client.
//!
//! # Architecture
//!
//! The bridge itself is `serbridge-core`, the same dispatcher the firmware
//! runs. On a host it is wired to:
//! - a TCP or serial link from `serbridge-host` on the protocol side
//! - an emulated SPI NOR flash from `serbridge-emu` on the bus side
//!
//! The `probe` and `spi` commands use the host-side serprog client, so they
//! work against the firmware as well as against `serve`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::serve::ServeOptions;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Serve {
            connection,
            image,
            size,
            jedec_id,
            name,
        } => commands::serve::run(&ServeOptions {
            connection,
            image,
            size,
            jedec_id,
            name,
        }),
        Commands::Probe { connection } => commands::probe::run(&connection),
        Commands::Spi {
            connection,
            write,
            read,
        } => {
            let write = cli::parse_hex_bytes(&write)?;
            commands::spi::run(&connection, &write, read as usize)
        }
    }
}
