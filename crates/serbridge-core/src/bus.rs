//! SPI bus driver abstraction
//!
//! The bridge only ever needs three things from the bus: drive chip select
//! active, drive it inactive, and clock one byte out while capturing one
//! byte in. Exchanges block until the peripheral reports completion, with
//! no timeout.

use crate::error::HalBusError;
use embedded_hal::digital::OutputPin;

/// Byte-level SPI master with a single chip select
pub trait SpiBus {
    /// Error reported by the bus
    type Error: core::fmt::Debug;

    /// Assert chip select
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Deassert chip select
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Clock `out` onto the bus and return the byte captured at the same time
    fn exchange(&mut self, out: u8) -> Result<u8, Self::Error>;
}

impl<B: SpiBus + ?Sized> SpiBus for &mut B {
    type Error = B::Error;

    fn select(&mut self) -> Result<(), Self::Error> {
        (**self).select()
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        (**self).deselect()
    }

    fn exchange(&mut self, out: u8) -> Result<u8, Self::Error> {
        (**self).exchange(out)
    }
}

/// [`SpiBus`] over an `embedded-hal` SPI bus and an active-low CS pin
pub struct HalBus<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> HalBus<SPI, CS>
where
    SPI: embedded_hal::spi::SpiBus<u8>,
    CS: OutputPin,
{
    /// Take ownership of the peripheral and pin, leaving the chip deselected
    pub fn new(spi: SPI, mut cs: CS) -> Result<Self, HalBusError<SPI::Error, CS::Error>> {
        cs.set_high().map_err(HalBusError::ChipSelect)?;
        Ok(Self { spi, cs })
    }

    /// Release the peripheral and pin
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> SpiBus for HalBus<SPI, CS>
where
    SPI: embedded_hal::spi::SpiBus<u8>,
    CS: OutputPin,
{
    type Error = HalBusError<SPI::Error, CS::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(HalBusError::ChipSelect)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        // Don't let CS rise while the last byte is still shifting out
        self.spi.flush().map_err(HalBusError::Spi)?;
        self.cs.set_high().map_err(HalBusError::ChipSelect)
    }

    fn exchange(&mut self, out: u8) -> Result<u8, Self::Error> {
        let mut word = [out];
        self.spi
            .transfer_in_place(&mut word)
            .map_err(HalBusError::Spi)?;
        self.spi.flush().map_err(HalBusError::Spi)?;
        Ok(word[0])
    }
}
