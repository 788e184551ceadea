//! I2C transport shim.
//!
//! Maps the register-level [`Transport`] port onto any `embedded-hal` 1.0
//! I2C bus and delay provider.  Reads are a single write-read; writes are
//! sent as `(register, value)` pairs, which is how the BME68x expects
//! multi-register writes on I2C.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::debug;

use crate::app::ports::Transport;
use crate::error::IoError;

/// Register pairs per bus transaction.
const PAIRS_PER_WRITE: usize = 8;

pub struct I2cTransport<I, D> {
    i2c: I,
    delay: D,
    addr: u8,
}

impl<I: I2c, D: DelayNs> I2cTransport<I, D> {
    pub fn new(i2c: I, delay: D, addr: u8) -> Self {
        Self { i2c, delay, addr }
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c, D: DelayNs> Transport for I2cTransport<I, D> {
    fn read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), IoError> {
        self.i2c.write_read(self.addr, &[reg], buf).map_err(|e| {
            debug!("I2C 0x{:02x}: read 0x{reg:02x} failed: {e:?}", self.addr);
            IoError::Bus
        })
    }

    fn write(&mut self, reg: u8, data: &[u8]) -> Result<(), IoError> {
        let mut next = reg;
        for chunk in data.chunks(PAIRS_PER_WRITE) {
            let mut frame = [0u8; PAIRS_PER_WRITE * 2];
            for (i, b) in chunk.iter().enumerate() {
                frame[2 * i] = next;
                frame[2 * i + 1] = *b;
                next = next.wrapping_add(1);
            }
            self.i2c
                .write(self.addr, &frame[..chunk.len() * 2])
                .map_err(|e| {
                    debug!("I2C 0x{:02x}: write 0x{reg:02x} failed: {e:?}", self.addr);
                    IoError::Bus
                })?;
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}
