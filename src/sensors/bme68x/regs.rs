//! BME680/BME688 register map (I2C interface).

pub const CHIP_ID_VALUE: u8 = 0x61;
pub const SOFT_RESET_CMD: u8 = 0xB6;

pub const REG_CHIP_ID: u8 = 0xD0;
pub const REG_VARIANT_ID: u8 = 0xF0;
pub const REG_SOFT_RESET: u8 = 0xE0;

/// First factory calibration block.
pub const REG_COEFF1: u8 = 0x89;
pub const LEN_COEFF1: usize = 25;
/// Second factory calibration block.
pub const REG_COEFF2: u8 = 0xE1;
pub const LEN_COEFF2: usize = 16;
/// Heater calibration: res_heat_val, res_heat_range (0x02), range_sw_err (0x04).
pub const REG_COEFF3: u8 = 0x00;
pub const LEN_COEFF3: usize = 5;

pub const REG_FIELD0: u8 = 0x1D;
pub const LEN_FIELD: usize = 17;

pub const REG_RES_HEAT0: u8 = 0x5A;
pub const REG_GAS_WAIT0: u8 = 0x64;
pub const REG_CTRL_GAS_0: u8 = 0x70;
pub const REG_CTRL_GAS_1: u8 = 0x71;
pub const REG_CTRL_HUM: u8 = 0x72;
pub const REG_CTRL_MEAS: u8 = 0x74;
pub const REG_CONFIG: u8 = 0x75;

pub const MODE_MSK: u8 = 0x03;
pub const OSH_MSK: u8 = 0x07;
pub const OST_POS: u8 = 5;
pub const OSP_POS: u8 = 2;
pub const FILTER_MSK: u8 = 0x1C;
pub const FILTER_POS: u8 = 2;
pub const HEATR_OFF_MSK: u8 = 0x08;
pub const NBCONV_MSK: u8 = 0x0F;
pub const RUN_GAS_MSK: u8 = 0x30;
/// run_gas for the BME680 (low gas variant).
pub const RUN_GAS_LOW: u8 = 0x10;
/// run_gas for the BME688 (high gas variant).
pub const RUN_GAS_HIGH: u8 = 0x20;

pub const RHRANGE_MSK: u8 = 0x30;
pub const RSERROR_MSK: u8 = 0xF0;
pub const GAS_RANGE_MSK: u8 = 0x0F;
pub const GAS_INDEX_MSK: u8 = 0x0F;

pub const VARIANT_GAS_HIGH: u8 = 0x01;

/// Wait after soft reset, µs.
pub const PERIOD_RESET_US: u32 = 10_000;
/// Wait between op-mode and field polls, µs.
pub const PERIOD_POLL_US: u32 = 10_000;
