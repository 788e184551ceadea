//! Application service: the hexagonal core.
//!
//! [`Bme68xService`] owns the sensor driver, the fusion adapter, the
//! control loop and the calibration tracker.  It exposes a
//! hardware-agnostic API: the owner calls [`poll`](Bme68xService::poll)
//! whenever [`next_deadline`](Bme68xService::next_deadline) has passed,
//! and every phase runs to completion inside that call.
//!
//! ```text
//!  SensorDriver ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                   │        Bme68xService          │
//!  FusionEngine ◀──▶│ ControlLoop · Measurement     │
//!                   │ Calibration                   │
//!     BlobStore ◀──▶└──────────────────────────────┘
//! ```

use log::{debug, error, info, warn};

use crate::bsec::adapter::BsecAdapter;
use crate::bsec::{ChannelGroup, CycleSettings, SampleRate, Version};
use crate::calibration::Calibration;
use crate::config::BsecConfig;
use crate::error::{ConfigError, EngineError, Error, Result};
use crate::measurement::{CycleOutcome, MeasurementCycle};
use crate::scheduler::{ControlLoop, ControlPlan, FALLBACK_DELAY_MS, Timer};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{BlobStore, EventSink, FusionEngine, SensorDriver};

// ───────────────────────────────────────────────────────────────
// Bme68xService
// ───────────────────────────────────────────────────────────────

pub struct Bme68xService<D, E, S>
where
    D: SensorDriver,
    E: FusionEngine,
    S: BlobStore,
{
    sensor: D,
    bsec: BsecAdapter<E>,
    store: S,
    config: BsecConfig,
    control: ControlLoop,
    measurement: MeasurementCycle,
    started: bool,
}

impl<D, E, S> Bme68xService<D, E, S>
where
    D: SensorDriver,
    E: FusionEngine,
    S: BlobStore,
{
    /// Construct the service.  Nothing touches the engine until
    /// [`init`](Self::init).
    pub fn new(sensor: D, engine: E, store: S, config: BsecConfig) -> Self {
        let calibration = Calibration::new(config.iaq_auto_cal);
        Self {
            sensor,
            bsec: BsecAdapter::new(engine),
            store,
            config,
            control: ControlLoop::new(),
            measurement: MeasurementCycle::new(calibration),
            started: false,
        }
    }

    /// Replace the measurement phase settings (poll budget, calibration
    /// threshold).  Only meaningful before [`init`](Self::init).
    #[must_use]
    pub fn with_measurement(mut self, measurement: MeasurementCycle) -> Self {
        self.measurement = measurement;
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the engine: version report, optional config and state
    /// blobs (failures only warn), the four group sample rates (failures
    /// are fatal), then start the loop if any group is enabled.
    pub fn init(&mut self, now_ms: u64) -> Result<Version> {
        let version = self.bsec.init().map_err(|e| {
            error!("BSEC init failed: {e}");
            Error::Engine(e)
        })?;
        info!("BSEC {version} initialized");

        if let Some(cf) = self.config.config_path() {
            match self.bsec.load_configuration_from(&self.store, cf) {
                Ok(()) => info!("BSEC config loaded ({cf})"),
                Err(e) => warn!("Failed to load BSEC config from {cf}: {e}, will use defaults"),
            }
        }
        if let Some(sf) = self.config.state_path() {
            match self.bsec.load_state_from(&self.store, sf) {
                Ok(()) => info!("BSEC state loaded ({sf})"),
                Err(e) => warn!("Failed to load BSEC state from {sf}: {e}, will use defaults"),
            }
        }

        let rates = [
            (ChannelGroup::Iaq, self.config.iaq_rate()),
            (ChannelGroup::Temperature, self.config.temp_rate()),
            (ChannelGroup::Humidity, self.config.rh_rate()),
            (ChannelGroup::Pressure, self.config.ps_rate()),
        ];
        for (group, rate) in rates {
            self.set_sample_rate(group, rate).map_err(|e| {
                error!("Failed to set {} sample rate: {e}", group.name());
                Error::Engine(e)
            })?;
        }

        if rates.iter().any(|(_, rate)| *rate != SampleRate::Disabled) {
            self.start(now_ms);
        }
        Ok(version)
    }

    /// Arm the first control phase, due immediately.  Returns `false` if
    /// the loop was already running.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        self.control.arm(Timer::Control { due_ms: now_ms });
        info!("Bme68xService started");
        true
    }

    pub fn is_running(&self) -> bool {
        self.started
    }

    /// Absolute time (ms) at which [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        self.control.next_deadline()
    }

    // ── Run loop ──────────────────────────────────────────────

    /// Run the pending phase if it is due.  Returns `true` if a phase ran.
    pub fn poll(&mut self, now_ms: u64, sink: &mut impl EventSink) -> bool {
        let Some(timer) = self.control.take_due(now_ms) else {
            return false;
        };
        match timer {
            Timer::Control { .. } => self.run_control(now_ms, sink),
            Timer::Measurement {
                settings,
                control_due_ms,
                ..
            } => {
                self.run_measurement(&settings, sink);
                self.control.arm(Timer::Control {
                    due_ms: control_due_ms.max(now_ms),
                });
            }
        }
        true
    }

    fn run_control(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let (delay_ms, measure) = match self.control.control_phase(&mut self.sensor, &mut self.bsec) {
            Ok(ControlPlan::Measure {
                settings,
                heater_ms,
                delay_ms,
            }) => (delay_ms, Some((settings, heater_ms))),
            Ok(ControlPlan::Inline { settings, delay_ms }) => {
                self.run_measurement(&settings, sink);
                (delay_ms, None)
            }
            Err(e) => {
                error!("BSEC run failed: {}", e.code());
                (FALLBACK_DELAY_MS, None)
            }
        };

        self.maybe_save_state(delay_ms);

        let control_due_ms = now_ms.saturating_add(delay_ms);
        let timer = match measure {
            Some((settings, heater_ms)) => Timer::Measurement {
                due_ms: now_ms.saturating_add(u64::from(heater_ms)),
                settings,
                control_due_ms,
            },
            None => Timer::Control {
                due_ms: control_due_ms,
            },
        };
        self.control.arm(timer);
    }

    fn run_measurement(&mut self, settings: &CycleSettings, sink: &mut impl EventSink) {
        match self
            .measurement
            .run(&mut self.sensor, &mut self.bsec, settings)
        {
            Ok(CycleOutcome::Completed {
                output,
                calibration,
            }) => {
                if let Some(status) = calibration {
                    sink.emit(&AppEvent::Calibration(status));
                }
                sink.emit(&AppEvent::BsecOutput(output));
            }
            Ok(CycleOutcome::NothingToProcess) => {}
            Err(e) => debug!("Measurement phase aborted: {e}"),
        }
    }

    fn maybe_save_state(&mut self, delay_ms: u64) {
        let Some(sf) = self.config.state_path() else {
            return;
        };
        if !self
            .control
            .state_save_due(delay_ms, self.config.state_save_interval)
        {
            return;
        }
        if let Err(e) = self.bsec.save_state_to(&mut self.store, sf) {
            warn!("Failed to save BSEC state ({sf}): {e}");
        }
    }

    // ── Public setters ────────────────────────────────────────

    /// Applied to the temperature input of the next measurements.
    pub fn set_heat_source(&mut self, value: f32) {
        self.measurement.set_heat_source(value);
    }

    /// Set the IAQ group rate and remember it as the rate restored after
    /// auto-calibration.
    pub fn set_iaq_sample_rate(&mut self, rate: SampleRate) -> core::result::Result<(), EngineError> {
        self.bsec.set_sample_rate(ChannelGroup::Iaq, rate)?;
        self.measurement.calibration_mut().record_iaq_rate(rate);
        Ok(())
    }

    pub fn set_temp_sample_rate(&mut self, rate: SampleRate) -> core::result::Result<(), EngineError> {
        self.bsec.set_sample_rate(ChannelGroup::Temperature, rate)
    }

    pub fn set_rh_sample_rate(&mut self, rate: SampleRate) -> core::result::Result<(), EngineError> {
        self.bsec.set_sample_rate(ChannelGroup::Humidity, rate)
    }

    pub fn set_ps_sample_rate(&mut self, rate: SampleRate) -> core::result::Result<(), EngineError> {
        self.bsec.set_sample_rate(ChannelGroup::Pressure, rate)
    }

    pub fn set_sample_rate(
        &mut self,
        group: ChannelGroup,
        rate: SampleRate,
    ) -> core::result::Result<(), EngineError> {
        match group {
            ChannelGroup::Iaq => self.set_iaq_sample_rate(rate),
            ChannelGroup::Temperature => self.set_temp_sample_rate(rate),
            ChannelGroup::Humidity => self.set_rh_sample_rate(rate),
            ChannelGroup::Pressure => self.set_ps_sample_rate(rate),
        }
    }

    // ── Blob operations ───────────────────────────────────────

    pub fn load_configuration_from(&mut self, path: &str) -> core::result::Result<(), ConfigError> {
        self.bsec.load_configuration_from(&self.store, path)
    }

    pub fn load_state_from(&mut self, path: &str) -> core::result::Result<(), ConfigError> {
        self.bsec.load_state_from(&self.store, path)
    }

    pub fn save_state_to(&mut self, path: &str) -> core::result::Result<(), ConfigError> {
        self.bsec.save_state_to(&mut self.store, path)
    }

    // ── Commands ──────────────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(&mut self, cmd: AppCommand, now_ms: u64) -> Result<()> {
        match cmd {
            AppCommand::Start => {
                self.start(now_ms);
            }
            AppCommand::SetHeatSource(value) => self.set_heat_source(value),
            AppCommand::SetSampleRate(group, rate) => {
                self.set_sample_rate(group, rate)?;
                info!("{} sample rate set to {}", group.name(), rate.as_str());
            }
            AppCommand::LoadConfiguration(path) => self.load_configuration_from(&path)?,
            AppCommand::LoadState(path) => self.load_state_from(&path)?,
            AppCommand::SaveState(path) => self.save_state_to(&path)?,
        }
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn sensor(&self) -> &D {
        &self.sensor
    }

    pub fn engine(&self) -> &E {
        self.bsec.engine()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    pub fn calibration(&self) -> &Calibration {
        self.measurement.calibration()
    }

    pub fn heat_source(&self) -> f32 {
        self.measurement.heat_source()
    }
}
