//! BME680 / BME688 register-level driver.
//!
//! Implements [`SensorDriver`] over any [`Transport`].  Only forced mode is
//! supported: one TPHG measurement per trigger, then the chip returns to
//! sleep on its own.
//!
//! ```text
//!  init():  soft reset ─▶ chip id (0x61) ─▶ variant ─▶ calibration
//!  cycle:   set_op_mode(Forced) ─▶ apply_settings ─▶ set_op_mode(Forced)
//!           ─▶ heater delay ─▶ op_mode()==Sleep ─▶ get_data(Forced)
//! ```

pub mod calc;
pub mod regs;

use log::{debug, info};

use crate::app::ports::{SensorDriver, Transport};
use crate::error::{DriverError, IoError};
use crate::sensors::{FieldData, OpMode, SensorSettings};

use calc::CalibData;

/// Op-mode reads before giving up on the sensor reaching sleep.
const MAX_MODE_POLLS: u32 = 10;
/// Field reads before reporting "no new data".
const MAX_FIELD_POLLS: u32 = 5;
/// Ambient temperature assumed for heater resistance, °C.
const DEFAULT_AMBIENT_C: i8 = 25;

/// Gas sensing die variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// BME680.
    #[default]
    GasLow,
    /// BME688.
    GasHigh,
}

pub struct Bme68x<T: Transport> {
    transport: T,
    calib: CalibData,
    variant: Variant,
    ambient_c: i8,
    settings: SensorSettings,
}

impl<T: Transport> Bme68x<T> {
    /// Wrap a transport.  Call [`init`](Self::init) before use.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            calib: CalibData::default(),
            variant: Variant::GasLow,
            ambient_c: DEFAULT_AMBIENT_C,
            settings: SensorSettings::default(),
        }
    }

    /// Soft reset, identify the chip and read its calibration.
    pub fn init(&mut self) -> Result<(), DriverError> {
        self.transport
            .write(regs::REG_SOFT_RESET, &[regs::SOFT_RESET_CMD])?;
        self.transport.delay_us(regs::PERIOD_RESET_US);

        let chip_id = self.read_byte(regs::REG_CHIP_ID)?;
        if chip_id != regs::CHIP_ID_VALUE {
            return Err(DriverError::DeviceNotFound { chip_id });
        }
        self.variant = if self.read_byte(regs::REG_VARIANT_ID)? == regs::VARIANT_GAS_HIGH {
            Variant::GasHigh
        } else {
            Variant::GasLow
        };

        let mut c1 = [0u8; regs::LEN_COEFF1];
        let mut c2 = [0u8; regs::LEN_COEFF2];
        let mut c3 = [0u8; regs::LEN_COEFF3];
        self.transport.read(regs::REG_COEFF1, &mut c1)?;
        self.transport.read(regs::REG_COEFF2, &mut c2)?;
        self.transport.read(regs::REG_COEFF3, &mut c3)?;
        self.calib = CalibData::from_regs(&c1, &c2, &c3);

        info!("BME68x: chip 0x{chip_id:02x}, variant {:?}", self.variant);
        Ok(())
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn calib(&self) -> &CalibData {
        &self.calib
    }

    /// Last settings pushed by [`apply_settings`](SensorDriver::apply_settings).
    pub fn settings(&self) -> &SensorSettings {
        &self.settings
    }

    /// Ambient temperature used when computing the heater resistance.
    pub fn set_ambient_temperature(&mut self, celsius: i8) {
        self.ambient_c = celsius;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn read_byte(&mut self, reg: u8) -> Result<u8, IoError> {
        let mut b = [0u8];
        self.transport.read(reg, &mut b)?;
        Ok(b[0])
    }

    fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), IoError> {
        self.transport.write(reg, &[value])
    }

    fn update_byte(&mut self, reg: u8, mask: u8, bits: u8) -> Result<(), IoError> {
        let cur = self.read_byte(reg)?;
        self.write_byte(reg, (cur & !mask) | (bits & mask))
    }

    fn apply_heater(&mut self, settings: &SensorSettings) -> Result<(), IoError> {
        let h = settings.heater;
        if !h.enable {
            self.update_byte(regs::REG_CTRL_GAS_0, regs::HEATR_OFF_MSK, regs::HEATR_OFF_MSK)?;
            return self.update_byte(regs::REG_CTRL_GAS_1, regs::RUN_GAS_MSK, 0);
        }
        let res_heat = calc::calc_res_heat(&self.calib, h.temperature_c, self.ambient_c);
        let gas_wait = calc::encode_gas_wait(h.duration_ms);
        self.write_byte(regs::REG_RES_HEAT0, res_heat)?;
        self.write_byte(regs::REG_GAS_WAIT0, gas_wait)?;
        self.update_byte(regs::REG_CTRL_GAS_0, regs::HEATR_OFF_MSK, 0)?;
        let run_gas = match self.variant {
            Variant::GasLow => regs::RUN_GAS_LOW,
            Variant::GasHigh => regs::RUN_GAS_HIGH,
        };
        // heater profile 0
        self.update_byte(
            regs::REG_CTRL_GAS_1,
            regs::RUN_GAS_MSK | regs::NBCONV_MSK,
            run_gas,
        )
    }

    fn read_field(&mut self) -> Result<FieldData, DriverError> {
        let mut buf = [0u8; regs::LEN_FIELD];
        for attempt in 0..MAX_FIELD_POLLS {
            self.transport.read(regs::REG_FIELD0, &mut buf)?;
            if buf[0] & FieldData::NEW_DATA_MSK != 0 {
                return Ok(self.decode_field(&buf));
            }
            if attempt + 1 < MAX_FIELD_POLLS {
                self.transport.delay_us(regs::PERIOD_POLL_US);
            }
        }
        debug!("BME68x: no new data");
        Ok(FieldData {
            status: buf[0] & !FieldData::NEW_DATA_MSK,
            ..FieldData::default()
        })
    }

    /// Compensate one raw field buffer (17 bytes from `REG_FIELD0`).
    pub fn decode_field(&self, buf: &[u8; regs::LEN_FIELD]) -> FieldData {
        let adc_pres =
            (u32::from(buf[2]) << 12) | (u32::from(buf[3]) << 4) | (u32::from(buf[4]) >> 4);
        let adc_temp =
            (u32::from(buf[5]) << 12) | (u32::from(buf[6]) << 4) | (u32::from(buf[7]) >> 4);
        let adc_hum = (u16::from(buf[8]) << 8) | u16::from(buf[9]);
        let (gas_msb, gas_lsb) = match self.variant {
            Variant::GasLow => (buf[13], buf[14]),
            Variant::GasHigh => (buf[15], buf[16]),
        };
        let adc_gas = (u16::from(gas_msb) << 2) | u16::from(gas_lsb >> 6);
        let gas_range = gas_lsb & regs::GAS_RANGE_MSK;

        let status = (buf[0] & FieldData::NEW_DATA_MSK)
            | (gas_lsb & (FieldData::GASM_VALID_MSK | FieldData::HEAT_STAB_MSK));

        let t = calc::calc_temp(&self.calib, adc_temp);
        let pressure = calc::calc_pres(&self.calib, t.t_fine, adc_pres);
        let humidity = calc::calc_hum(&self.calib, t.t_fine, adc_hum);
        let gas = match self.variant {
            Variant::GasLow => calc::calc_gas_low(&self.calib, adc_gas, gas_range),
            Variant::GasHigh => calc::calc_gas_high(adc_gas, gas_range),
        };

        FieldData {
            status,
            gas_index: buf[0] & regs::GAS_INDEX_MSK,
            meas_index: buf[1],
            temperature: t.centi_c as f32 / 100.0,
            pressure: pressure as f32,
            humidity: humidity as f32 / 1000.0,
            gas_resistance: gas as f32,
        }
    }
}

impl<T: Transport> SensorDriver for Bme68x<T> {
    /// Put the sensor to sleep (waiting for any running measurement),
    /// then switch to `mode`.
    fn set_op_mode(&mut self, mode: OpMode) -> Result<(), DriverError> {
        let mut polls = 0;
        let ctrl = loop {
            let ctrl = self.read_byte(regs::REG_CTRL_MEAS)?;
            if ctrl & regs::MODE_MSK == 0 {
                break ctrl;
            }
            polls += 1;
            if polls >= MAX_MODE_POLLS {
                return Err(IoError::PollExhausted { polls }.into());
            }
            self.write_byte(regs::REG_CTRL_MEAS, ctrl & !regs::MODE_MSK)?;
            self.transport.delay_us(regs::PERIOD_POLL_US);
        };
        if mode == OpMode::Forced {
            self.write_byte(regs::REG_CTRL_MEAS, (ctrl & !regs::MODE_MSK) | 0x01)?;
        }
        Ok(())
    }

    fn op_mode(&mut self) -> Result<OpMode, DriverError> {
        // parallel/sequential modes are never requested; any non-zero
        // mode means a measurement is still running
        Ok(match self.read_byte(regs::REG_CTRL_MEAS)? & regs::MODE_MSK {
            0 => OpMode::Sleep,
            _ => OpMode::Forced,
        })
    }

    fn apply_settings(&mut self, settings: &SensorSettings) -> Result<(), DriverError> {
        self.set_op_mode(OpMode::Sleep)?;
        self.update_byte(
            regs::REG_CONFIG,
            regs::FILTER_MSK,
            settings.filter << regs::FILTER_POS,
        )?;
        self.update_byte(regs::REG_CTRL_HUM, regs::OSH_MSK, settings.os_hum)?;
        let tp = ((settings.os_temp & 0x07) << regs::OST_POS)
            | ((settings.os_pres & 0x07) << regs::OSP_POS);
        self.update_byte(regs::REG_CTRL_MEAS, !regs::MODE_MSK, tp)?;
        self.apply_heater(settings)?;
        self.settings = *settings;
        debug!("BME68x: applied {settings:?}");
        Ok(())
    }

    fn heater_duration_ms(&mut self) -> Result<u32, DriverError> {
        let reg = self.read_byte(regs::REG_GAS_WAIT0)?;
        Ok(calc::decode_gas_wait(reg))
    }

    fn get_data(&mut self, mode: OpMode) -> Result<FieldData, DriverError> {
        match mode {
            OpMode::Forced => self.read_field(),
            OpMode::Sleep => Ok(FieldData::default()),
        }
    }
}
