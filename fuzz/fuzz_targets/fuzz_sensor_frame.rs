//! Fuzz target: BME68x calibration + field decoding
//!
//! The fuzz input becomes the chip's register file (chip id forced valid),
//! so calibration coefficients and raw ADC fields are both arbitrary.
//! Compensation must never panic (overflow, division by zero) and
//! humidity must stay in range.
//!
//! cargo fuzz run fuzz_sensor_frame

#![no_main]

use bme68x_bsec::app::ports::{SensorDriver, Transport};
use bme68x_bsec::error::IoError;
use bme68x_bsec::sensors::OpMode;
use bme68x_bsec::sensors::bme68x::Bme68x;
use libfuzzer_sys::fuzz_target;

struct Regs([u8; 256]);

impl Transport for Regs {
    fn read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), IoError> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.0[(reg as usize + i) & 0xFF];
        }
        Ok(())
    }

    fn write(&mut self, _reg: u8, _data: &[u8]) -> Result<(), IoError> {
        Ok(())
    }

    fn delay_us(&mut self, _us: u32) {}
}

fuzz_target!(|data: &[u8]| {
    let mut regs = [0u8; 256];
    for (dst, src) in regs.iter_mut().zip(data) {
        *dst = *src;
    }
    regs[0xD0] = 0x61;

    let mut dev = Bme68x::new(Regs(regs));
    if dev.init().is_err() {
        return;
    }
    if let Ok(field) = dev.get_data(OpMode::Forced) {
        assert!((0.0..=100.0).contains(&field.humidity));
    }
    let _ = dev.heater_duration_ms();
});
