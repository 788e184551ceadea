//! Unified error types for the BME68x/BSEC bridge.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be logged and stashed without allocation.
//!
//! | Kind          | Raised by                 | Policy at call site                  |
//! |---------------|---------------------------|--------------------------------------|
//! | `Io`          | transport / poll loop     | logged, aborts the current sub-step  |
//! | `Driver`      | BME68x register driver    | logged, aborts the current sub-step  |
//! | `Engine`      | BSEC library status       | aborts the cycle, fallback delay     |
//! | `Config`      | blob / config load & save | fatal at init, logged at runtime     |
//! | `SensorSetup` | control-phase sensor prep | aborts the iteration, loop survives  |

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Bus transport failed or a bounded wait ran out.
    Io(IoError),
    /// The sensor driver reported a non-OK status.
    Driver(DriverError),
    /// The fusion engine returned a non-OK status.
    Engine(EngineError),
    /// A configuration or state blob could not be used.
    Config(ConfigError),
    /// One of the control-phase sensor configuration steps failed.
    SensorSetup { step: SetupStep, source: DriverError },
    /// Startup wiring failed.
    Init(&'static str),
}

impl Error {
    /// Numeric diagnostic code, compatible with the vendor status codes.
    pub fn code(&self) -> i32 {
        match self {
            Self::Io(_) => DriverError::COMM_FAIL as i32,
            Self::Driver(e) => e.code() as i32,
            Self::Engine(e) => e.0,
            Self::Config(_) => ConfigError::CODE,
            Self::SensorSetup { step, .. } => step.code(),
            Self::Init(_) => -1,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::Engine(e) => write!(f, "engine: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::SensorSetup { step, source } => {
                write!(f, "failed to set BME68x {step}: {source}")
            }
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// A register read or write did not complete on the bus.
    Bus,
    /// The sensor never reported sleep mode within the poll budget.
    PollExhausted { polls: u32 },
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus transfer failed"),
            Self::PollExhausted { polls } => {
                write!(f, "sensor still measuring after {polls} polls")
            }
        }
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// Communication with the sensor failed.
    Comm(IoError),
    /// Chip-id register did not match a BME68x.
    DeviceNotFound { chip_id: u8 },
    /// A register burst had an unusable length.
    InvalidLength,
}

impl DriverError {
    const COMM_FAIL: i8 = -2;
    const DEV_NOT_FOUND: i8 = -3;
    const INVALID_LENGTH: i8 = -4;

    /// Status code in the numbering used by the Bosch reference driver.
    pub fn code(&self) -> i8 {
        match self {
            Self::Comm(_) => Self::COMM_FAIL,
            Self::DeviceNotFound { .. } => Self::DEV_NOT_FOUND,
            Self::InvalidLength => Self::INVALID_LENGTH,
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comm(e) => write!(f, "communication failed ({e}), status {}", self.code()),
            Self::DeviceNotFound { chip_id } => {
                write!(f, "device not found (chip id 0x{chip_id:02x}), status {}", self.code())
            }
            Self::InvalidLength => write!(f, "invalid length, status {}", self.code()),
        }
    }
}

impl From<IoError> for DriverError {
    fn from(e: IoError) -> Self {
        Self::Comm(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Fusion engine errors
// ---------------------------------------------------------------------------

/// Non-OK status returned by the fusion engine.  Negative values are
/// errors in the vendor numbering; the value is carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineError(pub i32);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BSEC status {}", self.0)
    }
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration / blob errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No blob or config file at the given location.
    NotFound,
    /// The blob exists but could not be read.
    Unreadable,
    /// The blob is too short to carry its header.
    Truncated { len: usize },
    /// Fewer bytes were written than requested.
    PartialWrite,
    /// The blob exceeds the engine's buffer size.
    TooLarge { len: usize, max: usize },
    /// The engine refused the blob contents.
    Rejected(EngineError),
    /// A config field failed range validation.
    Invalid(&'static str),
    /// The config record could not be deserialised.
    Parse,
}

impl ConfigError {
    /// Diagnostic code used for every blob/config failure (vendor
    /// `BSEC_E_CONFIG_FAIL`).
    pub const CODE: i32 = -34;
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Unreadable => write!(f, "unreadable"),
            Self::Truncated { len } => write!(f, "truncated ({len} bytes)"),
            Self::PartialWrite => write!(f, "partial write"),
            Self::TooLarge { len, max } => write!(f, "too large ({len} > {max} bytes)"),
            Self::Rejected(e) => write!(f, "rejected by engine ({e})"),
            Self::Invalid(msg) => write!(f, "validation failed: {msg}"),
            Self::Parse => write!(f, "malformed record"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Control-phase sensor setup steps
// ---------------------------------------------------------------------------

/// The sensor configuration steps of a control iteration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    OpModeSet,
    SettingsApply,
    OpModeReset,
    HeaterDurationRead,
}

impl SetupStep {
    /// Distinct diagnostic code per step.
    pub const fn code(self) -> i32 {
        match self {
            Self::SettingsApply => -1000,
            Self::OpModeReset => -1001,
            Self::OpModeSet => -1002,
            Self::HeaterDurationRead => -1003,
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpModeSet => write!(f, "op mode"),
            Self::SettingsApply => write!(f, "settings"),
            Self::OpModeReset => write!(f, "mode"),
            Self::HeaterDurationRead => write!(f, "heater duration"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
