//! Recording test doubles for links and buses

use crate::bus::SpiBus;
use crate::transport::ByteTransport;

use core::convert::Infallible;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

/// Something observable the dispatcher did to the link or the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Recv(u8),
    Send(u8),
    Hold,
    Release,
    Select,
    Deselect,
    Exchange { out: u8, inp: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// Host ran out of bytes
    Eof,
    /// Injected bus failure
    Bus,
}

/// Shared, ordered record of link and bus activity
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<Event>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    /// Bytes sent to the host, in order
    pub fn output(&self) -> Vec<u8> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Send(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: Event) -> usize {
        self.0.borrow().iter().filter(|&&e| e == wanted).count()
    }

    pub fn exchanges(&self) -> Vec<u8> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Exchange { out, .. } => Some(*out),
                _ => None,
            })
            .collect()
    }
}

/// Host side of the link: scripted input, recorded output
pub struct MockLink {
    input: VecDeque<u8>,
    log: Log,
}

impl MockLink {
    pub fn new(input: &[u8], log: &Log) -> Self {
        Self {
            input: input.iter().copied().collect(),
            log: log.clone(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl ByteTransport for MockLink {
    type Error = MockError;

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.log.push(Event::Send(byte));
        Ok(())
    }

    fn receive_byte(&mut self) -> Result<u8, Self::Error> {
        let b = self.input.pop_front().ok_or(MockError::Eof)?;
        self.log.push(Event::Recv(b));
        Ok(b)
    }

    fn hold_reception(&mut self) {
        self.log.push(Event::Hold);
    }

    fn release_reception(&mut self) {
        self.log.push(Event::Release);
    }
}

/// Target side of the bus: scripted MISO bytes, 0xFF once exhausted
pub struct MockBus {
    miso: VecDeque<u8>,
    fail_at: Option<usize>,
    exchanged: usize,
    log: Log,
}

impl MockBus {
    pub fn new(log: &Log) -> Self {
        Self {
            miso: VecDeque::new(),
            fail_at: None,
            exchanged: 0,
            log: log.clone(),
        }
    }

    pub fn with_miso(mut self, miso: &[u8]) -> Self {
        self.miso = miso.iter().copied().collect();
        self
    }

    /// Make exchange number `n` (zero based) fail
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }
}

impl SpiBus for MockBus {
    type Error = MockError;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.log.push(Event::Select);
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.log.push(Event::Deselect);
        Ok(())
    }

    fn exchange(&mut self, out: u8) -> Result<u8, Self::Error> {
        if self.fail_at == Some(self.exchanged) {
            return Err(MockError::Bus);
        }
        self.exchanged += 1;
        let inp = self.miso.pop_front().unwrap_or(0xFF);
        self.log.push(Event::Exchange { out, inp });
        Ok(inp)
    }
}

/// In-memory `embedded-io` stream that only publishes writes on flush
pub struct Pipe {
    input: VecDeque<u8>,
    pending: Vec<u8>,
    flushed: Vec<u8>,
}

impl Pipe {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            pending: Vec::new(),
            flushed: Vec::new(),
        }
    }

    pub fn flushed(&self) -> &[u8] {
        &self.flushed
    }
}

impl embedded_io::ErrorType for Pipe {
    type Error = Infallible;
}

impl embedded_io::Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.input.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl embedded_io::Write for Pipe {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushed.append(&mut self.pending);
        Ok(())
    }
}

/// `embedded-hal` SPI bus whose MISO is the complement of MOSI
#[derive(Default)]
pub struct HalSpi {
    sent: Vec<u8>,
}

impl HalSpi {
    pub fn echo_inverted() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[u8] {
        &self.sent
    }
}

impl embedded_hal::spi::ErrorType for HalSpi {
    type Error = Infallible;
}

impl embedded_hal::spi::SpiBus<u8> for HalSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for w in words.iter_mut() {
            self.sent.push(0x00);
            *w = 0xFF;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.sent.extend_from_slice(words);
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        for (i, &w) in write.iter().enumerate() {
            self.sent.push(w);
            if let Some(r) = read.get_mut(i) {
                *r = !w;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for w in words.iter_mut() {
            self.sent.push(*w);
            *w = !*w;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    High,
    Low,
}

/// `embedded-hal` output pin recording every level it was driven to
#[derive(Default)]
pub struct HalPin {
    history: Vec<PinLevel>,
}

impl HalPin {
    pub fn history(&self) -> &[PinLevel] {
        &self.history
    }
}

impl embedded_hal::digital::ErrorType for HalPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for HalPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.history.push(PinLevel::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.history.push(PinLevel::High);
        Ok(())
    }
}
