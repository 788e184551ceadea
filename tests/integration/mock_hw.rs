//! Mock adapters for integration tests.
//!
//! Every mock records the calls it receives so tests can assert on the
//! full history without touching a bus or the vendor library.

#![allow(dead_code)]

use std::collections::VecDeque;

use bme68x_bsec::app::events::{AppEvent, BsecOutput, CalibrationStatus};
use bme68x_bsec::app::ports::{EventSink, FusionEngine, SensorDriver, Transport};
use bme68x_bsec::bsec::{
    CycleSettings, Input, Output, OutputSensor, Outputs, ProcessFlags, SensorConfiguration,
    Version,
};
use bme68x_bsec::error::{DriverError, EngineError, IoError};
use bme68x_bsec::sensors::{FieldData, OpMode, SensorSettings};

pub const NS_PER_MS: i64 = 1_000_000;

pub const ALL_INPUTS: u32 =
    ProcessFlags::PRESSURE | ProcessFlags::TEMPERATURE | ProcessFlags::HUMIDITY | ProcessFlags::GAS;

// ── FakeSensor ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SensorCall {
    SetOpMode(OpMode),
    OpMode,
    Apply(SensorSettings),
    HeaterDuration,
    GetData(OpMode),
}

/// Sensor driver double.  Reports sleep after `busy_polls` op-mode reads.
pub struct FakeSensor {
    pub calls: Vec<SensorCall>,
    pub busy_polls: u32,
    pub never_sleeps: bool,
    pub heater_ms: u32,
    pub data: FieldData,
    pub fail_apply: Option<DriverError>,
    pub fail_heater_read: Option<DriverError>,
    /// Fail the n-th (0-based) `set_op_mode` call.
    pub fail_set_op_mode_at: Option<usize>,
    pub fail_get_data: Option<DriverError>,
    set_op_mode_calls: usize,
}

impl FakeSensor {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            busy_polls: 0,
            never_sleeps: false,
            heater_ms: 100,
            data: FieldData {
                status: FieldData::NEW_DATA_MSK | FieldData::GASM_VALID_MSK | FieldData::HEAT_STAB_MSK,
                temperature: 23.5,
                pressure: 100_800.0,
                humidity: 41.0,
                gas_resistance: 150_000.0,
                ..FieldData::default()
            },
            fail_apply: None,
            fail_heater_read: None,
            fail_set_op_mode_at: None,
            fail_get_data: None,
            set_op_mode_calls: 0,
        }
    }

    pub fn count(&self, pred: impl Fn(&SensorCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl Default for FakeSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for FakeSensor {
    fn set_op_mode(&mut self, mode: OpMode) -> Result<(), DriverError> {
        self.calls.push(SensorCall::SetOpMode(mode));
        let n = self.set_op_mode_calls;
        self.set_op_mode_calls += 1;
        if self.fail_set_op_mode_at == Some(n) {
            return Err(DriverError::Comm(IoError::Bus));
        }
        Ok(())
    }

    fn op_mode(&mut self) -> Result<OpMode, DriverError> {
        self.calls.push(SensorCall::OpMode);
        if self.never_sleeps {
            return Ok(OpMode::Forced);
        }
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            return Ok(OpMode::Forced);
        }
        Ok(OpMode::Sleep)
    }

    fn apply_settings(&mut self, settings: &SensorSettings) -> Result<(), DriverError> {
        self.calls.push(SensorCall::Apply(*settings));
        self.fail_apply.map_or(Ok(()), Err)
    }

    fn heater_duration_ms(&mut self) -> Result<u32, DriverError> {
        self.calls.push(SensorCall::HeaterDuration);
        self.fail_heater_read.map_or(Ok(self.heater_ms), Err)
    }

    fn get_data(&mut self, mode: OpMode) -> Result<FieldData, DriverError> {
        self.calls.push(SensorCall::GetData(mode));
        self.fail_get_data.map_or(Ok(self.data), Err)
    }
}

// ── ScriptedEngine ────────────────────────────────────────────

/// Fusion engine double.
///
/// `sensor_control` answers from `script` first, then falls back to
/// `template` with `next_call = ts + period_ns`.  `do_steps` answers from
/// `step_outputs` first, then `default_outputs`; every output is stamped
/// with the inputs' timestamp.
pub struct ScriptedEngine {
    pub script: VecDeque<Result<CycleSettings, EngineError>>,
    pub template: CycleSettings,
    pub period_ns: i64,
    pub step_outputs: VecDeque<Vec<Output>>,
    pub default_outputs: Vec<Output>,
    pub fail_init: Option<i32>,
    pub fail_subscription: Option<i32>,
    pub fail_do_steps: Option<i32>,
    pub fail_set_state: Option<i32>,
    pub state: Vec<u8>,
    pub config: Option<Vec<u8>>,
    pub loaded_state: Option<Vec<u8>>,
    pub control_calls: Vec<i64>,
    pub step_inputs: Vec<Vec<Input>>,
    pub subscriptions: Vec<SensorConfiguration>,
}

impl ScriptedEngine {
    /// Triggers a forced measurement of every input every `period_ms`.
    pub fn periodic(period_ms: i64) -> Self {
        Self {
            script: VecDeque::new(),
            template: CycleSettings {
                next_call: 0,
                process_data: ProcessFlags(ALL_INPUTS),
                heater_temperature: 320,
                heater_duration: 197,
                run_gas: true,
                pressure_oversampling: 1,
                temperature_oversampling: 2,
                humidity_oversampling: 1,
                trigger_measurement: true,
            },
            period_ns: period_ms * NS_PER_MS,
            step_outputs: VecDeque::new(),
            default_outputs: vec![output(OutputSensor::Iaq, 25.0, 3)],
            fail_init: None,
            fail_subscription: None,
            fail_do_steps: None,
            fail_set_state: None,
            state: vec![0xA5; 16],
            config: None,
            loaded_state: None,
            control_calls: Vec::new(),
            step_inputs: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Rate of the most recent subscription of `sensor`.
    pub fn last_rate(&self, sensor: OutputSensor) -> Option<f32> {
        self.subscriptions
            .iter()
            .rev()
            .find(|c| c.sensor == sensor)
            .map(|c| c.sample_rate)
    }
}

impl FusionEngine for ScriptedEngine {
    fn init(&mut self) -> Result<(), EngineError> {
        self.fail_init.map_or(Ok(()), |c| Err(EngineError(c)))
    }

    fn version(&mut self) -> Result<Version, EngineError> {
        Ok(Version {
            major: 1,
            minor: 4,
            major_bugfix: 9,
            minor_bugfix: 2,
        })
    }

    fn set_configuration(&mut self, blob: &[u8]) -> Result<(), EngineError> {
        self.config = Some(blob.to_vec());
        Ok(())
    }

    fn set_state(&mut self, blob: &[u8]) -> Result<(), EngineError> {
        if let Some(c) = self.fail_set_state {
            return Err(EngineError(c));
        }
        self.loaded_state = Some(blob.to_vec());
        Ok(())
    }

    fn get_state(&mut self, buf: &mut [u8]) -> Result<usize, EngineError> {
        buf[..self.state.len()].copy_from_slice(&self.state);
        Ok(self.state.len())
    }

    fn update_subscription(&mut self, requested: &[SensorConfiguration]) -> Result<(), EngineError> {
        if let Some(c) = self.fail_subscription {
            return Err(EngineError(c));
        }
        self.subscriptions.extend_from_slice(requested);
        Ok(())
    }

    fn sensor_control(&mut self, timestamp_ns: i64) -> Result<CycleSettings, EngineError> {
        self.control_calls.push(timestamp_ns);
        if let Some(next) = self.script.pop_front() {
            return next;
        }
        Ok(CycleSettings {
            next_call: timestamp_ns + self.period_ns,
            ..self.template
        })
    }

    fn do_steps(&mut self, inputs: &[Input], outputs: &mut Outputs) -> Result<(), EngineError> {
        self.step_inputs.push(inputs.to_vec());
        if let Some(c) = self.fail_do_steps {
            return Err(EngineError(c));
        }
        let ts = inputs.first().map_or(1, |i| i.time_stamp.max(1));
        let produced = self
            .step_outputs
            .pop_front()
            .unwrap_or_else(|| self.default_outputs.clone());
        for mut o in produced {
            o.time_stamp = ts;
            let _ = outputs.push(o);
        }
        Ok(())
    }
}

pub fn output(sensor: OutputSensor, signal: f32, accuracy: u8) -> Output {
    Output {
        sensor_id: sensor.id(),
        signal,
        accuracy,
        time_stamp: 1,
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<&BsecOutput> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::BsecOutput(o) => Some(o),
                AppEvent::Calibration(_) => None,
            })
            .collect()
    }

    pub fn calibration(&self) -> Vec<CalibrationStatus> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Calibration(s) => Some(*s),
                AppEvent::BsecOutput(_) => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── RegisterFile ──────────────────────────────────────────────

/// 256-byte register file standing in for a BME680 on the bus.
///
/// A forced-mode write to `CTRL_MEAS` completes immediately: the mode bits
/// read back as sleep and the field register gains the new-data bit.
pub struct RegisterFile {
    pub regs: [u8; 256],
    pub measurements: u32,
}

const CTRL_MEAS: u8 = 0x74;
const FIELD0: u8 = 0x1D;

impl RegisterFile {
    pub fn bme680() -> Self {
        let mut regs = [0u8; 256];
        regs[0xD0] = 0x61;
        // par_t1 = 26000, par_t2 = 26000, par_t3 = 3
        regs[0xE9] = (26_000u16 & 0xFF) as u8;
        regs[0xEA] = (26_000u16 >> 8) as u8;
        regs[0x8A] = (26_000u16 & 0xFF) as u8;
        regs[0x8B] = (26_000u16 >> 8) as u8;
        regs[0x8C] = 3;
        // temperature adc = 500000
        let adc = 500_000u32;
        regs[0x22] = (adc >> 12) as u8;
        regs[0x23] = (adc >> 4) as u8;
        regs[0x24] = ((adc & 0x0F) << 4) as u8;
        // gas: valid and heater stable
        regs[0x2B] = 0x30;
        Self {
            regs,
            measurements: 0,
        }
    }
}

impl Transport for RegisterFile {
    fn read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), IoError> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.regs[(reg as usize + i) & 0xFF];
        }
        Ok(())
    }

    fn write(&mut self, reg: u8, data: &[u8]) -> Result<(), IoError> {
        for (i, b) in data.iter().enumerate() {
            let r = reg.wrapping_add(i as u8);
            if r == CTRL_MEAS && b & 0x03 == 0x01 {
                self.regs[r as usize] = b & !0x03;
                self.regs[FIELD0 as usize] |= 0x80;
                self.measurements += 1;
            } else {
                self.regs[r as usize] = *b;
            }
        }
        Ok(())
    }

    fn delay_us(&mut self, _us: u32) {}
}
