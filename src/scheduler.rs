//! Control loop scheduler.
//!
//! Each iteration asks the engine what to do at the scheduled timestamp,
//! prepares the sensor when a measurement is due, and decides when the
//! next phase runs.  Callback-driven timers are replaced by a single
//! pending [`Timer`] that the owner polls.
//!
//! ```text
//!          start()
//!             │
//!             ▼
//!   ┌───────────────────┐  trigger   ┌────────────────────────┐
//!   │ Timer::Control    │──────────▶│ Timer::Measurement     │
//!   │ (query engine,    │            │ (heater delay, then    │
//!   │  configure sensor)│◀──────────│  fetch + fuse + emit)  │
//!   └───────────────────┘  re-arm    └────────────────────────┘
//!         │   ▲             control
//!         └───┘ no trigger: measurement runs inline,
//!               control re-armed after the engine delay
//! ```
//!
//! At most one timer is pending at any time: a measurement timer carries
//! the due time of the control timer that follows it.

use log::{debug, error};

use crate::app::ports::{FusionEngine, SensorDriver};
use crate::bsec::CycleSettings;
use crate::bsec::adapter::BsecAdapter;
use crate::error::{DriverError, Error, Result, SetupStep};
use crate::sensors::{HeaterConfig, OpMode, SensorSettings};

/// Delay before retrying after a failed control phase.
pub const FALLBACK_DELAY_MS: u64 = 10_000;

const NS_PER_MS: i64 = 1_000_000;

// ═══════════════════════════════════════════════════════════════
//  Timer state
// ═══════════════════════════════════════════════════════════════

/// The one pending timer.
#[derive(Debug, Clone, PartialEq)]
pub enum Timer {
    /// Next control phase.
    Control { due_ms: u64 },
    /// Measurement phase after the heater delay.  `settings.next_call` holds
    /// the control-phase timestamp.
    Measurement {
        due_ms: u64,
        settings: CycleSettings,
        control_due_ms: u64,
    },
}

impl Timer {
    pub fn due_ms(&self) -> u64 {
        match self {
            Self::Control { due_ms } | Self::Measurement { due_ms, .. } => *due_ms,
        }
    }
}

/// What a successful control phase decided.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPlan {
    /// Sensor configured and triggered; measure after `heater_ms`.
    Measure {
        settings: CycleSettings,
        heater_ms: u32,
        delay_ms: u64,
    },
    /// No trigger needed; run the measurement phase now.
    Inline {
        settings: CycleSettings,
        delay_ms: u64,
    },
}

impl ControlPlan {
    pub fn delay_ms(&self) -> u64 {
        match self {
            Self::Measure { delay_ms, .. } | Self::Inline { delay_ms, .. } => *delay_ms,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Control loop
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct ControlLoop {
    /// Engine timeline, ns.  Starts at 0 and follows `next_call`.
    next_ts: i64,
    pending: Option<Timer>,
    state_save_delay_ms: u64,
    sensor_settings: SensorSettings,
}

impl ControlLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_ts(&self) -> i64 {
        self.next_ts
    }

    pub fn pending(&self) -> Option<&Timer> {
        self.pending.as_ref()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.as_ref().map(Timer::due_ms)
    }

    pub fn state_save_delay_ms(&self) -> u64 {
        self.state_save_delay_ms
    }

    /// Replace whatever is pending.
    pub fn arm(&mut self, timer: Timer) {
        debug!("ControlLoop: armed {timer:?}");
        self.pending = Some(timer);
    }

    /// Remove and return the pending timer if it is due at `now_ms`.
    pub fn take_due(&mut self, now_ms: u64) -> Option<Timer> {
        if self.pending.as_ref()?.due_ms() <= now_ms {
            self.pending.take()
        } else {
            None
        }
    }

    /// Query the engine and prepare the sensor.  On success the engine
    /// timeline has advanced to the engine's `next_call`.
    pub fn control_phase<D, E>(&mut self, sensor: &mut D, bsec: &mut BsecAdapter<E>) -> Result<ControlPlan>
    where
        D: SensorDriver,
        E: FusionEngine,
    {
        let ts = self.next_ts;
        let mut ss = bsec.query_next_action(ts)?;
        debug!(
            "BSEC {ts} ctl: process {:#x}, ht {} dur {} ms, gas {}, po {}, to {}, ho {}, tm {}, next {}",
            ss.process_data.0,
            ss.heater_temperature,
            ss.heater_duration,
            ss.run_gas,
            ss.pressure_oversampling,
            ss.temperature_oversampling,
            ss.humidity_oversampling,
            ss.trigger_measurement,
            ss.next_call
        );
        self.next_ts = ss.next_call;
        let delay_ms = delay_ms_between(ts, ss.next_call);
        ss.next_call = ts;

        if !ss.trigger_measurement {
            return Ok(ControlPlan::Inline {
                settings: ss,
                delay_ms,
            });
        }

        self.sensor_settings.os_hum = ss.humidity_oversampling;
        self.sensor_settings.os_pres = ss.pressure_oversampling;
        self.sensor_settings.os_temp = ss.temperature_oversampling;
        self.sensor_settings.heater = HeaterConfig {
            enable: ss.run_gas,
            temperature_c: ss.heater_temperature,
            duration_ms: ss.heater_duration,
        };

        sensor
            .set_op_mode(OpMode::Forced)
            .map_err(|e| setup_failed(SetupStep::OpModeSet, e))?;
        sensor
            .apply_settings(&self.sensor_settings)
            .map_err(|e| setup_failed(SetupStep::SettingsApply, e))?;
        sensor
            .set_op_mode(OpMode::Forced)
            .map_err(|e| setup_failed(SetupStep::OpModeReset, e))?;
        let heater_ms = sensor
            .heater_duration_ms()
            .map_err(|e| setup_failed(SetupStep::HeaterDurationRead, e))?;

        Ok(ControlPlan::Measure {
            settings: ss,
            heater_ms,
            delay_ms,
        })
    }

    /// Add `delay_ms` to the time since the last save and report whether a
    /// save is due.  A negative interval disables saving.  The accumulator
    /// resets whenever this returns `true`.
    pub fn state_save_due(&mut self, delay_ms: u64, interval_s: i32) -> bool {
        let Ok(interval_s) = u64::try_from(interval_s) else {
            return false;
        };
        self.state_save_delay_ms = self.state_save_delay_ms.saturating_add(delay_ms);
        if self.state_save_delay_ms / 1000 >= interval_s {
            self.state_save_delay_ms = 0;
            true
        } else {
            false
        }
    }
}

/// Milliseconds from `ts` to `next_call` (both ns), truncated; a
/// `next_call` in the past gives 0.
pub fn delay_ms_between(ts: i64, next_call: i64) -> u64 {
    u64::try_from(next_call.saturating_sub(ts) / NS_PER_MS).unwrap_or(0)
}

fn setup_failed(step: SetupStep, source: DriverError) -> Error {
    error!("Failed to set BME68x {step}: {}", source.code());
    Error::SensorSetup { step, source }
}
