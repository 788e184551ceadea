//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each published event as one
//! structured line to the logger (UART / USB-CDC on the device, stderr in
//! host simulation).

use log::info;

use crate::app::events::{AppEvent, CalibrationStatus};
use crate::app::ports::EventSink;
use crate::bsec::Output;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// `-` for an absent channel, else `value/accuracy`.
struct Channel<'a>(&'a Output);

impl core::fmt::Display for Channel<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0.is_present() {
            write!(f, "{:.2}/{}", self.0.signal, self.0.accuracy)
        } else {
            write!(f, "-")
        }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::BsecOutput(o) => {
                info!(
                    "BSEC | IAQ={} | CO2={}ppm | VOC={}ppm | T={}\u{00b0}C | RH={}% | P={}Pa | n={}",
                    Channel(&o.iaq),
                    Channel(&o.co2),
                    Channel(&o.voc),
                    Channel(&o.temp),
                    Channel(&o.rh),
                    Channel(&o.ps),
                    o.outputs.len(),
                );
            }
            AppEvent::Calibration(status) => {
                let what = match status {
                    CalibrationStatus::Calibrating => "calibrating",
                    CalibrationStatus::NeedsCalibration => "needs calibration",
                    CalibrationStatus::Complete => "complete",
                };
                info!("CAL  | IAQ {what}");
            }
        }
    }
}
