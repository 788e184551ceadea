//! Binding to the vendor's static BSEC library (`libalgobsec.a`).
//!
//! The library keeps all of its state in globals, so at most one
//! [`BsecLibrary`] handle exists at a time; [`BsecLibrary::take`] hands it
//! out and dropping it gives it back.  The build script links the archive
//! from `BSEC_LIB_DIR`.

use core::sync::atomic::{AtomicBool, Ordering};

use log::trace;

use crate::app::ports::FusionEngine;
use crate::bsec::{
    CycleSettings, Input, MAX_PHYSICAL_SENSOR, MAX_PROPERTY_BLOB_SIZE, NUMBER_OUTPUTS, Output,
    Outputs, ProcessFlags, SensorConfiguration, Version,
};
use crate::error::EngineError;

// ───────────────────────────────────────────────────────────────
// C ABI
// ───────────────────────────────────────────────────────────────

type ReturnCode = i32;

const BSEC_OK: ReturnCode = 0;

#[repr(C)]
#[derive(Default)]
struct RawVersion {
    major: u8,
    minor: u8,
    major_bugfix: u8,
    minor_bugfix: u8,
}

#[repr(C)]
#[derive(Default)]
struct RawBmeSettings {
    next_call: i64,
    process_data: u32,
    heater_temperature: u16,
    heating_duration: u16,
    run_gas: u8,
    pressure_oversampling: u8,
    temperature_oversampling: u8,
    humidity_oversampling: u8,
    trigger_measurement: u8,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawInput {
    time_stamp: i64,
    signal: f32,
    signal_dimensions: u8,
    sensor_id: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct RawOutput {
    time_stamp: i64,
    signal: f32,
    signal_dimensions: u8,
    sensor_id: u8,
    accuracy: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct RawSensorConfiguration {
    sample_rate: f32,
    sensor_id: u8,
}

unsafe extern "C" {
    fn bsec_init() -> ReturnCode;
    fn bsec_get_version(version: *mut RawVersion) -> ReturnCode;
    fn bsec_set_configuration(
        serialized_settings: *const u8,
        n_serialized_settings: u32,
        work_buffer: *mut u8,
        n_work_buffer_size: u32,
    ) -> ReturnCode;
    fn bsec_set_state(
        serialized_state: *const u8,
        n_serialized_state: u32,
        work_buffer: *mut u8,
        n_work_buffer_size: u32,
    ) -> ReturnCode;
    fn bsec_get_state(
        state_set_id: u8,
        serialized_state: *mut u8,
        n_serialized_state_max: u32,
        work_buffer: *mut u8,
        n_work_buffer: u32,
        n_serialized_state: *mut u32,
    ) -> ReturnCode;
    fn bsec_update_subscription(
        requested_virtual_sensors: *const RawSensorConfiguration,
        n_requested_virtual_sensors: u8,
        required_sensor_settings: *mut RawSensorConfiguration,
        n_required_sensor_settings: *mut u8,
    ) -> ReturnCode;
    fn bsec_sensor_control(time_stamp: i64, sensor_settings: *mut RawBmeSettings) -> ReturnCode;
    fn bsec_do_steps(
        inputs: *const RawInput,
        n_inputs: u8,
        outputs: *mut RawOutput,
        n_outputs: *mut u8,
    ) -> ReturnCode;
}

fn check(ret: ReturnCode) -> Result<(), EngineError> {
    if ret == BSEC_OK {
        Ok(())
    } else {
        Err(EngineError(ret))
    }
}

/// Largest number of virtual sensors one subscription call carries.
const MAX_SUBSCRIPTION: usize = 16;

// ───────────────────────────────────────────────────────────────
// Handle
// ───────────────────────────────────────────────────────────────

static TAKEN: AtomicBool = AtomicBool::new(false);

pub struct BsecLibrary {
    work_buffer: [u8; MAX_PROPERTY_BLOB_SIZE],
}

impl BsecLibrary {
    /// Claim the library.  `None` if a handle is already live.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Self {
            work_buffer: [0; MAX_PROPERTY_BLOB_SIZE],
        })
    }
}

impl Drop for BsecLibrary {
    fn drop(&mut self) {
        TAKEN.store(false, Ordering::Release);
    }
}

impl FusionEngine for BsecLibrary {
    fn init(&mut self) -> Result<(), EngineError> {
        check(unsafe { bsec_init() })
    }

    fn version(&mut self) -> Result<Version, EngineError> {
        let mut raw = RawVersion::default();
        check(unsafe { bsec_get_version(&mut raw) })?;
        Ok(Version {
            major: raw.major,
            minor: raw.minor,
            major_bugfix: raw.major_bugfix,
            minor_bugfix: raw.minor_bugfix,
        })
    }

    fn set_configuration(&mut self, blob: &[u8]) -> Result<(), EngineError> {
        self.work_buffer.fill(0);
        check(unsafe {
            bsec_set_configuration(
                blob.as_ptr(),
                blob.len() as u32,
                self.work_buffer.as_mut_ptr(),
                self.work_buffer.len() as u32,
            )
        })
    }

    fn set_state(&mut self, blob: &[u8]) -> Result<(), EngineError> {
        self.work_buffer.fill(0);
        check(unsafe {
            bsec_set_state(
                blob.as_ptr(),
                blob.len() as u32,
                self.work_buffer.as_mut_ptr(),
                self.work_buffer.len() as u32,
            )
        })
    }

    fn get_state(&mut self, buf: &mut [u8]) -> Result<usize, EngineError> {
        self.work_buffer.fill(0);
        let mut len = 0u32;
        check(unsafe {
            bsec_get_state(
                0,
                buf.as_mut_ptr(),
                buf.len() as u32,
                self.work_buffer.as_mut_ptr(),
                self.work_buffer.len() as u32,
                &mut len,
            )
        })?;
        Ok((len as usize).min(buf.len()))
    }

    fn update_subscription(
        &mut self,
        requested: &[SensorConfiguration],
    ) -> Result<(), EngineError> {
        let mut raw = [RawSensorConfiguration::default(); MAX_SUBSCRIPTION];
        let n = requested.len().min(MAX_SUBSCRIPTION);
        for (dst, src) in raw.iter_mut().zip(&requested[..n]) {
            *dst = RawSensorConfiguration {
                sample_rate: src.sample_rate,
                sensor_id: src.sensor.id(),
            };
        }
        let mut required = [RawSensorConfiguration::default(); MAX_PHYSICAL_SENSOR];
        let mut n_required = MAX_PHYSICAL_SENSOR as u8;
        check(unsafe {
            bsec_update_subscription(raw.as_ptr(), n as u8, required.as_mut_ptr(), &mut n_required)
        })
    }

    fn sensor_control(&mut self, timestamp_ns: i64) -> Result<CycleSettings, EngineError> {
        let mut raw = RawBmeSettings::default();
        check(unsafe { bsec_sensor_control(timestamp_ns, &mut raw) })?;
        Ok(CycleSettings {
            next_call: raw.next_call,
            process_data: ProcessFlags(raw.process_data),
            heater_temperature: raw.heater_temperature,
            heater_duration: raw.heating_duration,
            run_gas: raw.run_gas != 0,
            pressure_oversampling: raw.pressure_oversampling,
            temperature_oversampling: raw.temperature_oversampling,
            humidity_oversampling: raw.humidity_oversampling,
            trigger_measurement: raw.trigger_measurement != 0,
        })
    }

    fn do_steps(&mut self, inputs: &[Input], outputs: &mut Outputs) -> Result<(), EngineError> {
        let mut raw_in = [RawInput {
            time_stamp: 0,
            signal: 0.0,
            signal_dimensions: 1,
            sensor_id: 0,
        }; MAX_PHYSICAL_SENSOR];
        let n_in = inputs.len().min(MAX_PHYSICAL_SENSOR);
        for (dst, src) in raw_in.iter_mut().zip(&inputs[..n_in]) {
            dst.time_stamp = src.time_stamp;
            dst.signal = src.signal;
            dst.sensor_id = src.sensor.id();
        }

        let mut raw_out = [RawOutput::default(); NUMBER_OUTPUTS];
        let mut n_out = NUMBER_OUTPUTS as u8;
        check(unsafe {
            bsec_do_steps(raw_in.as_ptr(), n_in as u8, raw_out.as_mut_ptr(), &mut n_out)
        })?;

        for o in raw_out.iter().take(usize::from(n_out)) {
            trace!("BSEC out: id={} sig={} acc={}", o.sensor_id, o.signal, o.accuracy);
            let _ = outputs.push(Output {
                sensor_id: o.sensor_id,
                signal: o.signal,
                accuracy: o.accuracy,
                time_stamp: o.time_stamp,
            });
        }
        Ok(())
    }
}
