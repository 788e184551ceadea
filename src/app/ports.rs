//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Bme68xService (domain)
//! ```
//!
//! Driven adapters (bus, sensor driver, fusion engine, blob storage, event
//! sinks) implement these traits.  The
//! [`Bme68xService`](super::service::Bme68xService) consumes them via
//! generics, so the scheduling core never touches hardware or the vendor
//! library directly and can be driven by test doubles on the host.
//!
//! ## Error policy
//!
//! - Port errors are typed; no port retries internally.
//! - Callers decide whether a failure is fatal (init) or logged and
//!   skipped (runtime cycle).

use crate::bsec::{CycleSettings, Input, Outputs, SensorConfiguration, Version};
use crate::config::Bme68xConfig;
use crate::error::{ConfigError, DriverError, EngineError, IoError};
use crate::sensors::{FieldData, OpMode, SensorSettings};

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain → bus)
// ───────────────────────────────────────────────────────────────

/// Register-level access to one device on a bus.
///
/// A single failed transfer is reported as [`IoError::Bus`]; there are no
/// retries at this level.
pub trait Transport {
    /// Read `buf.len()` bytes starting at register `reg`.
    fn read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), IoError>;

    /// Write `data` starting at register `reg`.
    fn write(&mut self, reg: u8, data: &[u8]) -> Result<(), IoError>;

    /// Blocking sleep.
    fn delay_us(&mut self, us: u32);
}

// ───────────────────────────────────────────────────────────────
// Sensor driver port
// ───────────────────────────────────────────────────────────────

/// The gas/environmental sensor as the control loop sees it.
pub trait SensorDriver {
    fn set_op_mode(&mut self, mode: OpMode) -> Result<(), DriverError>;

    fn op_mode(&mut self) -> Result<OpMode, DriverError>;

    /// Program oversampling, filter and heater profile.
    fn apply_settings(&mut self, settings: &SensorSettings) -> Result<(), DriverError>;

    /// Heater duration actually programmed, in ms.  May differ from the
    /// requested value because of the register encoding.
    fn heater_duration_ms(&mut self) -> Result<u32, DriverError>;

    /// Fetch one field of data.  A reading without the new-data bit is not
    /// an error.
    fn get_data(&mut self, mode: OpMode) -> Result<FieldData, DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Fusion engine port (the opaque vendor library)
// ───────────────────────────────────────────────────────────────

/// Contract of the closed-source fusion engine.
///
/// Status codes are carried verbatim in [`EngineError`].  Every call is
/// synchronous and runs to completion on the caller's context.
pub trait FusionEngine {
    fn init(&mut self) -> Result<(), EngineError>;

    fn version(&mut self) -> Result<Version, EngineError>;

    /// Apply a configuration blob (header already stripped).
    fn set_configuration(&mut self, blob: &[u8]) -> Result<(), EngineError>;

    /// Restore a previously serialised state blob.
    fn set_state(&mut self, blob: &[u8]) -> Result<(), EngineError>;

    /// Serialise the current state into `buf`, returning the length used.
    fn get_state(&mut self, buf: &mut [u8]) -> Result<usize, EngineError>;

    /// Subscribe the given virtual sensors.
    fn update_subscription(
        &mut self,
        requested: &[SensorConfiguration],
    ) -> Result<(), EngineError>;

    /// Ask what the sensor should do at `timestamp_ns`.
    fn sensor_control(&mut self, timestamp_ns: i64) -> Result<CycleSettings, EngineError>;

    /// Run one fusion step, appending results to `outputs`.
    fn do_steps(&mut self, inputs: &[Input], outputs: &mut Outputs) -> Result<(), EngineError>;
}

// ───────────────────────────────────────────────────────────────
// Blob storage port (driven adapter: domain ↔ filesystem)
// ───────────────────────────────────────────────────────────────

/// Whole-blob persistence for configuration and state files.
pub trait BlobStore {
    /// Read the full blob at `path`.
    fn load(&self, path: &str) -> Result<Vec<u8>, ConfigError>;

    /// Replace the blob at `path`.  A short write is
    /// [`ConfigError::PartialWrite`].
    fn save(&mut self, path: &str, data: &[u8]) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → listeners)
// ───────────────────────────────────────────────────────────────

/// The domain emits [`AppEvent`](super::events::AppEvent)s through this
/// port.  Delivery is synchronous: `emit` returns after the listener has
/// seen the event.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and persists the sensor configuration record.
///
/// Implementations validate before persisting and reject out-of-range
/// values with [`ConfigError::Invalid`] rather than clamping them.
pub trait ConfigPort {
    /// Returns [`Bme68xConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<Bme68xConfig, ConfigError>;

    fn save(&self, config: &Bme68xConfig) -> Result<(), ConfigError>;
}
