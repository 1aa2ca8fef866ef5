//! serprog SPI bridge firmware for Raspberry Pi Pico
//!
//! The host talks serprog over UART0; every SPI transaction it asks for is
//! run on SPI0 with a GPIO chip select. See [`config`] for pins and link
//! settings.
//!
//! Everything is blocking and single threaded. The dispatcher loop waits
//! for an opcode, handles it to completion and goes back to waiting, so
//! reception is naturally held for the whole of an `O_SPIOP`.

#![no_std]
#![no_main]

mod config;

use defmt::{info, trace, warn};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::spi::{self, Spi};
use embassy_rp::uart::{self, Uart};
use serbridge_core::{
    Dispatcher, HalBus, IoTransport, LinkConfig, Outcome, Parity, StopBits,
};
use {defmt_rtt as _, panic_probe as _};

fn uart_config(link: &LinkConfig) -> uart::Config {
    let mut config = uart::Config::default();
    config.baudrate = link.baud_rate;
    config.data_bits = match link.data_bits {
        5 => uart::DataBits::DataBits5,
        6 => uart::DataBits::DataBits6,
        7 => uart::DataBits::DataBits7,
        8 => uart::DataBits::DataBits8,
        n => defmt::panic!("unsupported data bits: {}", n),
    };
    config.parity = match link.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    config.stop_bits = match link.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    config
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("pico-serbridge starting...");

    let p = embassy_rp::init(Default::default());

    // Host link
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config(&config::LINK));
    let link = IoTransport::new(uart);

    // Target chip, deselected until the first O_SPIOP
    let mut spi_config = spi::Config::default();
    spi_config.frequency = config::SPI_FREQUENCY;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);
    let cs = Output::new(p.PIN_17, Level::High);
    let Ok(bus) = HalBus::new(spi, cs) else {
        defmt::panic!("failed to release chip select");
    };

    info!(
        "pico-serbridge ready: {} baud, SPI at {} Hz",
        config::LINK.baud_rate,
        config::SPI_FREQUENCY
    );

    let mut dispatcher = Dispatcher::new(link, bus, config::IDENTITY);
    loop {
        match dispatcher.poll() {
            Ok(Outcome::Handled(cmd)) => trace!("{}", cmd.name()),
            Ok(Outcome::Ignored(op)) => trace!("ignored opcode 0x{:02x}", op),
            // Framing or overrun on the UART; the host resyncs with SYNCNOP
            Err(_) => warn!("link error, waiting for next opcode"),
        }
    }
}
