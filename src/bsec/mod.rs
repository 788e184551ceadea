//! BSEC data model.
//!
//! Identifiers, sample rates and the value types exchanged with the
//! fusion engine.  The numeric identifiers are the vendor's; the engine
//! itself stays behind [`FusionEngine`](crate::app::ports::FusionEngine).

pub mod adapter;

use serde::Serialize;

/// Maximum number of physical inputs handed to one fusion step.
pub const MAX_PHYSICAL_SENSOR: usize = 8;

/// Maximum number of virtual outputs one fusion step can produce.
pub const NUMBER_OUTPUTS: usize = 14;

/// Largest state blob the engine serialises.
pub const MAX_STATE_BLOB_SIZE: usize = 221;

/// Largest configuration blob the engine accepts (after header strip).
pub const MAX_PROPERTY_BLOB_SIZE: usize = 2277;

/// Length of the header the vendor's binary config tool prepends.
pub const CONFIG_BLOB_HEADER_LEN: usize = 4;

// ---------------------------------------------------------------------------
// Sample rates
// ---------------------------------------------------------------------------

/// Subscription rate for a channel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleRate {
    #[default]
    Disabled,
    /// One sample every 3 s.
    LowPower,
    /// One sample every 300 s.
    UltraLowPower,
}

impl SampleRate {
    /// Rate in Hz as the engine expects it.
    pub const fn hz(self) -> f32 {
        match self {
            Self::Disabled => 65535.0,
            Self::LowPower => 0.333_333_3,
            Self::UltraLowPower => 0.003_333_333,
        }
    }

    /// Parse a configuration string.  Empty and unrecognised values
    /// resolve to [`SampleRate::Disabled`].
    pub fn from_config(s: &str) -> Self {
        match s {
            "LP" => Self::LowPower,
            "ULP" => Self::UltraLowPower,
            _ => Self::Disabled,
        }
    }

    /// True for strings [`from_config`](Self::from_config) understands.
    pub fn is_known(s: &str) -> bool {
        matches!(s, "" | "DIS" | "LP" | "ULP")
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "DIS",
            Self::LowPower => "LP",
            Self::UltraLowPower => "ULP",
        }
    }
}

// ---------------------------------------------------------------------------
// Virtual (output) and physical (input) sensor identifiers
// ---------------------------------------------------------------------------

/// Engine output channels this crate subscribes to or parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum OutputSensor {
    Iaq = 1,
    StaticIaq = 2,
    Co2Equivalent = 3,
    BreathVocEquivalent = 4,
    RawTemperature = 6,
    RawPressure = 7,
    RawHumidity = 8,
    RawGas = 9,
    StabilizationStatus = 12,
    RunInStatus = 13,
    HeatCompensatedTemperature = 14,
    HeatCompensatedHumidity = 15,
}

impl OutputSensor {
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            1 => Self::Iaq,
            2 => Self::StaticIaq,
            3 => Self::Co2Equivalent,
            4 => Self::BreathVocEquivalent,
            6 => Self::RawTemperature,
            7 => Self::RawPressure,
            8 => Self::RawHumidity,
            9 => Self::RawGas,
            12 => Self::StabilizationStatus,
            13 => Self::RunInStatus,
            14 => Self::HeatCompensatedTemperature,
            15 => Self::HeatCompensatedHumidity,
            _ => return None,
        })
    }
}

/// Physical inputs fed to a fusion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InputSensor {
    Pressure = 1,
    Humidity = 4,
    GasResistor = 5,
    Temperature = 6,
    HeatSource = 14,
}

impl InputSensor {
    pub const fn id(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Channel groups
// ---------------------------------------------------------------------------

/// Clusters of virtual sensors subscribed together at one rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelGroup {
    Iaq,
    Temperature,
    Humidity,
    Pressure,
}

impl ChannelGroup {
    pub const ALL: [ChannelGroup; 4] = [
        ChannelGroup::Iaq,
        ChannelGroup::Temperature,
        ChannelGroup::Humidity,
        ChannelGroup::Pressure,
    ];

    /// The virtual sensors making up this group.
    pub const fn sensors(self) -> &'static [OutputSensor] {
        match self {
            Self::Iaq => &[
                OutputSensor::Iaq,
                OutputSensor::StaticIaq,
                OutputSensor::Co2Equivalent,
                OutputSensor::BreathVocEquivalent,
                OutputSensor::StabilizationStatus,
                OutputSensor::RunInStatus,
                OutputSensor::RawGas,
            ],
            Self::Temperature => &[
                OutputSensor::HeatCompensatedTemperature,
                OutputSensor::RawTemperature,
            ],
            Self::Humidity => &[
                OutputSensor::HeatCompensatedHumidity,
                OutputSensor::RawHumidity,
            ],
            Self::Pressure => &[OutputSensor::RawPressure],
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Iaq => "IAQ",
            Self::Temperature => "temp",
            Self::Humidity => "RH",
            Self::Pressure => "pressure",
        }
    }
}

// ---------------------------------------------------------------------------
// Engine value types
// ---------------------------------------------------------------------------

/// Which physical channels the engine wants processed this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessFlags(pub u32);

impl ProcessFlags {
    pub const PRESSURE: u32 = 1 << (InputSensor::Pressure as u32 - 1);
    pub const HUMIDITY: u32 = 1 << (InputSensor::Humidity as u32 - 1);
    pub const TEMPERATURE: u32 = 1 << (InputSensor::Temperature as u32 - 1);
    pub const GAS: u32 = 1 << (InputSensor::GasResistor as u32 - 1);

    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// What the engine wants done next (`bsec_bme_settings_t`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CycleSettings {
    /// Timestamp (ns) at which the engine must be called again.
    pub next_call: i64,
    pub process_data: ProcessFlags,
    /// Heater target in °C.
    pub heater_temperature: u16,
    /// Heater on-time in ms as requested by the engine.
    pub heater_duration: u16,
    pub run_gas: bool,
    pub pressure_oversampling: u8,
    pub temperature_oversampling: u8,
    pub humidity_oversampling: u8,
    pub trigger_measurement: bool,
}

/// One physical input sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Input {
    pub sensor: InputSensor,
    pub signal: f32,
    pub time_stamp: i64,
}

/// One virtual output.  A zero `time_stamp` marks an absent value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Output {
    pub sensor_id: u8,
    pub signal: f32,
    /// 0 (unreliable) to 3 (high accuracy).
    pub accuracy: u8,
    pub time_stamp: i64,
}

impl Output {
    pub fn sensor(&self) -> Option<OutputSensor> {
        OutputSensor::from_id(self.sensor_id)
    }

    pub fn is_present(&self) -> bool {
        self.time_stamp != 0
    }
}

/// Request to subscribe one virtual sensor at a rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfiguration {
    pub sensor: OutputSensor,
    pub sample_rate: f32,
}

/// Engine library version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub major_bugfix: u8,
    pub minor_bugfix: u8,
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.major_bugfix, self.minor_bugfix
        )
    }
}

pub type Inputs = heapless::Vec<Input, MAX_PHYSICAL_SENSOR>;
pub type Outputs = heapless::Vec<Output, NUMBER_OUTPUTS>;
