//! Sensor drivers and the value types they exchange with the domain.
//!
//! Each driver implements [`SensorDriver`](crate::app::ports::SensorDriver)
//! over a [`Transport`](crate::app::ports::Transport), so the control loop
//! never sees registers or bus handles.

pub mod bme68x;

/// Sensor operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpMode {
    #[default]
    Sleep,
    /// One measurement, then back to sleep.
    Forced,
}

/// Oversampling setting as encoded in the control registers (0 = skipped,
/// 1..=5 = x1..x16).
pub type Oversampling = u8;

/// Gas heater profile for the next forced measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaterConfig {
    pub enable: bool,
    /// Target plate temperature in °C.
    pub temperature_c: u16,
    /// Heating time in ms.
    pub duration_ms: u16,
}

/// Oversampling, filter and heater configuration pushed to the sensor
/// before each triggered measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorSettings {
    pub os_hum: Oversampling,
    pub os_temp: Oversampling,
    pub os_pres: Oversampling,
    /// IIR filter coefficient code (0 = off).
    pub filter: u8,
    pub heater: HeaterConfig,
}

/// One compensated reading bundle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldData {
    /// Raw status byte: see the `*_MSK` constants.
    pub status: u8,
    pub gas_index: u8,
    pub meas_index: u8,
    /// °C
    pub temperature: f32,
    /// Pa
    pub pressure: f32,
    /// %RH
    pub humidity: f32,
    /// Ω
    pub gas_resistance: f32,
}

impl FieldData {
    pub const NEW_DATA_MSK: u8 = 0x80;
    pub const GASM_VALID_MSK: u8 = 0x20;
    pub const HEAT_STAB_MSK: u8 = 0x10;

    pub fn has_new_data(&self) -> bool {
        self.status & Self::NEW_DATA_MSK != 0
    }

    pub fn gas_valid(&self) -> bool {
        self.status & Self::GASM_VALID_MSK != 0
    }

    pub fn heater_stable(&self) -> bool {
        self.status & Self::HEAT_STAB_MSK != 0
    }
}
