//! Outbound application events.
//!
//! The [`Bme68xService`](super::service::Bme68xService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, forward over a
//! network link, feed a display, etc.

use serde::Serialize;

use crate::bsec::{Output, OutputSensor, Outputs};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// One completed measurement cycle.
    BsecOutput(BsecOutput),

    /// The IAQ auto-calibration state changed.
    Calibration(CalibrationStatus),
}

/// Fused outputs of one cycle: the full list plus the six channels most
/// consumers want.  Named fields keep a zero `time_stamp` when the engine
/// did not produce that channel this cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BsecOutput {
    pub outputs: Outputs,
    pub iaq: Output,
    pub co2: Output,
    pub voc: Output,
    pub temp: Output,
    pub rh: Output,
    pub ps: Output,
}

impl BsecOutput {
    /// Build the snapshot from the engine's output list.
    pub fn from_outputs(outputs: Outputs) -> Self {
        let mut ev = Self::default();
        for out in &outputs {
            let slot = match out.sensor() {
                Some(OutputSensor::Iaq) => &mut ev.iaq,
                Some(OutputSensor::Co2Equivalent) => &mut ev.co2,
                Some(OutputSensor::BreathVocEquivalent) => &mut ev.voc,
                Some(OutputSensor::HeatCompensatedTemperature) => &mut ev.temp,
                Some(OutputSensor::HeatCompensatedHumidity) => &mut ev.rh,
                Some(OutputSensor::RawPressure) => &mut ev.ps,
                _ => continue,
            };
            *slot = *out;
        }
        ev.outputs = outputs;
        ev
    }
}

/// IAQ calibration transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalibrationStatus {
    /// Accuracy 2: the engine is converging.
    Calibrating,
    /// Accuracy 0 or 1.
    NeedsCalibration,
    /// Enough consecutive accuracy-3 cycles; rate restored.
    Complete,
}
