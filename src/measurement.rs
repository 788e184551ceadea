//! Measurement phase of a control iteration.
//!
//! Runs once the heater delay has elapsed (or inline when the engine asks
//! for processing without a trigger): waits for the sensor to return to
//! sleep, fetches the forced-mode reading, feeds the requested physical
//! inputs to the engine and folds the result into a [`BsecOutput`].
//! Calibration hysteresis is applied before the caller publishes.

use log::{debug, error, trace, warn};

use crate::app::events::{BsecOutput, CalibrationStatus};
use crate::app::ports::{FusionEngine, SensorDriver};
use crate::bsec::adapter::BsecAdapter;
use crate::bsec::{ChannelGroup, CycleSettings, Input, InputSensor, Inputs, ProcessFlags, SampleRate};
use crate::calibration::{Calibration, CalibrationAction};
use crate::error::{Error, IoError, Result};
use crate::sensors::{FieldData, OpMode};

/// Upper bound on op-mode reads while waiting for the sensor to sleep.
pub const MAX_SLEEP_POLLS: u32 = 1000;

/// Result of a completed measurement phase.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The engine requested no processing this cycle.
    NothingToProcess,
    /// Outputs ready to publish.
    Completed {
        output: BsecOutput,
        calibration: Option<CalibrationStatus>,
    },
}

pub struct MeasurementCycle {
    heat_source: f32,
    max_polls: u32,
    calibration: Calibration,
}

impl MeasurementCycle {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            heat_source: 0.0,
            max_polls: MAX_SLEEP_POLLS,
            calibration,
        }
    }

    #[must_use]
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn set_heat_source(&mut self, value: f32) {
        self.heat_source = value;
    }

    pub fn heat_source(&self) -> f32 {
        self.heat_source
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut Calibration {
        &mut self.calibration
    }

    /// Execute the phase for `settings`, whose `next_call` holds the
    /// control-phase timestamp the inputs are tagged with.
    pub fn run<D, E>(
        &mut self,
        sensor: &mut D,
        bsec: &mut BsecAdapter<E>,
        settings: &CycleSettings,
    ) -> Result<CycleOutcome>
    where
        D: SensorDriver,
        E: FusionEngine,
    {
        let ts = settings.next_call;
        if settings.trigger_measurement {
            self.wait_for_sleep(sensor).inspect_err(|e| {
                warn!("BME68x did not return to sleep: {e}");
            })?;
        }
        if settings.process_data.is_empty() {
            return Ok(CycleOutcome::NothingToProcess);
        }

        let data = sensor.get_data(OpMode::Forced).map_err(|e| {
            error!("Failed to read sensor data: {}", e.code());
            Error::Driver(e)
        })?;
        let inputs = build_inputs(settings.process_data, &data, self.heat_source, ts);
        for i in &inputs {
            trace!("in : {} {:.2}", i.sensor.id(), i.signal);
        }

        let outputs = bsec.run_fusion_step(&inputs).map_err(|e| {
            error!("BSEC {ts} run failed: {e}");
            Error::Engine(e)
        })?;
        debug!(
            "BSEC {ts} run: {} inputs, {} outputs",
            inputs.len(),
            outputs.len()
        );
        for o in &outputs {
            trace!("out: {} {:.2} {}", o.sensor_id, o.signal, o.accuracy);
        }

        let output = BsecOutput::from_outputs(outputs);
        let calibration = match self.calibration.update(&output.iaq) {
            Some(CalibrationAction::ForceLowPower(status)) => {
                if let Err(e) = bsec.set_sample_rate(ChannelGroup::Iaq, SampleRate::LowPower) {
                    warn!("Failed to force IAQ sample rate: {e}");
                }
                Some(status)
            }
            Some(CalibrationAction::Restore(rate)) => {
                match bsec.set_sample_rate(ChannelGroup::Iaq, rate) {
                    Ok(()) => self.calibration.record_iaq_rate(rate),
                    Err(e) => warn!("Failed to restore IAQ sample rate: {e}"),
                }
                Some(CalibrationStatus::Complete)
            }
            None => None,
        };
        Ok(CycleOutcome::Completed {
            output,
            calibration,
        })
    }

    fn wait_for_sleep<D: SensorDriver>(&self, sensor: &mut D) -> Result<()> {
        for _ in 0..self.max_polls {
            if sensor.op_mode()? == OpMode::Sleep {
                return Ok(());
            }
        }
        Err(IoError::PollExhausted {
            polls: self.max_polls,
        }
        .into())
    }
}

/// Physical inputs for one fusion step.  Nothing is produced unless the
/// reading carries the new-data bit; gas is skipped unless marked valid.
pub fn build_inputs(process: ProcessFlags, data: &FieldData, heat_source: f32, ts: i64) -> Inputs {
    let mut inputs = Inputs::new();
    if !data.has_new_data() {
        return inputs;
    }
    let mut push = |sensor, signal| {
        // at most five inputs, capacity is eight
        let _ = inputs.push(Input {
            sensor,
            signal,
            time_stamp: ts,
        });
    };
    if process.contains(ProcessFlags::PRESSURE) {
        push(InputSensor::Pressure, data.pressure);
    }
    if process.contains(ProcessFlags::TEMPERATURE) {
        push(InputSensor::Temperature, data.temperature);
        push(InputSensor::HeatSource, heat_source);
    }
    if process.contains(ProcessFlags::HUMIDITY) {
        push(InputSensor::Humidity, data.humidity);
    }
    if process.contains(ProcessFlags::GAS) && data.gas_valid() {
        push(InputSensor::GasResistor, data.gas_resistance);
    }
    inputs
}
