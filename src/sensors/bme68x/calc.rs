//! Integer compensation and heater register encoding.
//!
//! Formulas follow the Bosch reference driver's fixed-point path.
//! Intermediates are widened to `i64` so arbitrary ADC values cannot
//! overflow; for in-range readings the results match the 32-bit math.

use super::regs;

/// Factory-fused coefficients, unique per chip.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CalibData {
    pub par_h1: u16,
    pub par_h2: u16,
    pub par_h3: i8,
    pub par_h4: i8,
    pub par_h5: i8,
    pub par_h6: u8,
    pub par_h7: i8,
    pub par_g1: i8,
    pub par_g2: i16,
    pub par_g3: i8,
    pub par_t1: u16,
    pub par_t2: i16,
    pub par_t3: i8,
    pub par_p1: u16,
    pub par_p2: i16,
    pub par_p3: i8,
    pub par_p4: i16,
    pub par_p5: i16,
    pub par_p6: i8,
    pub par_p7: i8,
    pub par_p8: i16,
    pub par_p9: i16,
    pub par_p10: u8,
    pub res_heat_range: u8,
    pub res_heat_val: i8,
    pub range_sw_err: i8,
}

fn le_u16(lsb: u8, msb: u8) -> u16 {
    u16::from(lsb) | (u16::from(msb) << 8)
}

impl CalibData {
    /// Map the three calibration register blocks onto coefficients.
    pub fn from_regs(
        c1: &[u8; regs::LEN_COEFF1],
        c2: &[u8; regs::LEN_COEFF2],
        c3: &[u8; regs::LEN_COEFF3],
    ) -> Self {
        // c2 index = absolute offset from 0xE1
        Self {
            par_t1: le_u16(c2[8], c2[9]),
            par_t2: le_u16(c1[1], c1[2]) as i16,
            par_t3: c1[3] as i8,
            par_p1: le_u16(c1[5], c1[6]),
            par_p2: le_u16(c1[7], c1[8]) as i16,
            par_p3: c1[9] as i8,
            par_p4: le_u16(c1[11], c1[12]) as i16,
            par_p5: le_u16(c1[13], c1[14]) as i16,
            par_p6: c1[16] as i8,
            par_p7: c1[15] as i8,
            par_p8: le_u16(c1[19], c1[20]) as i16,
            par_p9: le_u16(c1[21], c1[22]) as i16,
            par_p10: c1[23],
            par_h1: (u16::from(c2[1] & 0x0F)) | (u16::from(c2[2]) << 4),
            par_h2: (u16::from(c2[1] >> 4)) | (u16::from(c2[0]) << 4),
            par_h3: c2[3] as i8,
            par_h4: c2[4] as i8,
            par_h5: c2[5] as i8,
            par_h6: c2[6],
            par_h7: c2[7] as i8,
            par_g1: c2[12] as i8,
            par_g2: le_u16(c2[10], c2[11]) as i16,
            par_g3: c2[13] as i8,
            res_heat_val: c3[0] as i8,
            res_heat_range: (c3[2] & regs::RHRANGE_MSK) >> 4,
            range_sw_err: ((c3[4] & regs::RSERROR_MSK) as i8) >> 4,
        }
    }
}

/// Temperature in centi-°C plus the `t_fine` carried into P and H.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempComp {
    pub t_fine: i64,
    pub centi_c: i64,
}

pub fn calc_temp(c: &CalibData, temp_adc: u32) -> TempComp {
    let var1 = (i64::from(temp_adc) >> 3) - (i64::from(c.par_t1) << 1);
    let var2 = (var1 * i64::from(c.par_t2)) >> 11;
    let var3 = ((((var1 >> 1) * (var1 >> 1)) >> 12) * (i64::from(c.par_t3) << 4)) >> 14;
    let t_fine = var2 + var3;
    TempComp {
        t_fine,
        centi_c: ((t_fine * 5) + 128) >> 8,
    }
}

/// Pressure in Pa.
pub fn calc_pres(c: &CalibData, t_fine: i64, pres_adc: u32) -> u32 {
    const OVF_CHECK: i64 = 1 << 30;

    let mut var1 = (t_fine >> 1) - 64_000;
    let mut var2 = ((((var1 >> 2) * (var1 >> 2)) >> 11) * i64::from(c.par_p6)) >> 2;
    var2 += (var1 * i64::from(c.par_p5)) << 1;
    var2 = (var2 >> 2) + (i64::from(c.par_p4) << 16);
    var1 = (((((var1 >> 2) * (var1 >> 2)) >> 13) * (i64::from(c.par_p3) << 5)) >> 3)
        + ((i64::from(c.par_p2) * var1) >> 1);
    var1 >>= 18;
    var1 = ((32_768 + var1) * i64::from(c.par_p1)) >> 15;

    let mut comp = 1_048_576 - i64::from(pres_adc);
    comp = (comp - (var2 >> 12)) * 3125;
    comp = if comp >= OVF_CHECK {
        comp.checked_div(var1).unwrap_or(0) << 1
    } else {
        (comp << 1).checked_div(var1).unwrap_or(0)
    };

    // out-of-range calibration can overflow here; wrap like the C reference
    let var1 = i64::from(c.par_p9).wrapping_mul((comp >> 3).wrapping_mul(comp >> 3) >> 13) >> 12;
    let var2 = (comp >> 2).wrapping_mul(i64::from(c.par_p8)) >> 13;
    let cube = (comp >> 8).wrapping_mul(comp >> 8).wrapping_mul(comp >> 8);
    let var3 = cube.wrapping_mul(i64::from(c.par_p10)) >> 17;
    comp = comp.wrapping_add(
        var1.wrapping_add(var2)
            .wrapping_add(var3)
            .wrapping_add(i64::from(c.par_p7) << 7)
            >> 4,
    );
    u32::try_from(comp.max(0)).unwrap_or(u32::MAX)
}

/// Relative humidity in milli-%, clamped to 0..=100 000.
pub fn calc_hum(c: &CalibData, t_fine: i64, hum_adc: u16) -> u32 {
    let temp_scaled = ((t_fine * 5) + 128) >> 8;
    let var1 = i64::from(hum_adc)
        - (i64::from(c.par_h1) << 4)
        - (((temp_scaled * i64::from(c.par_h3)) / 100) >> 1);
    let var2 = (i64::from(c.par_h2)
        * (((temp_scaled * i64::from(c.par_h4)) / 100)
            + (((temp_scaled * ((temp_scaled * i64::from(c.par_h5)) / 100)) >> 6) / 100)
            + (1 << 14)))
        >> 10;
    let var3 = var1 * var2;
    let var4 = ((i64::from(c.par_h6) << 7) + ((temp_scaled * i64::from(c.par_h7)) / 100)) >> 4;
    let var5 = ((var3 >> 14) * (var3 >> 14)) >> 10;
    let var6 = (var4 * var5) >> 1;
    let hum = (((var3 + var6) >> 10) * 1000) >> 12;
    hum.clamp(0, 100_000) as u32
}

const GAS_LOOKUP1: [u32; 16] = [
    2147483647, 2147483647, 2147483647, 2147483647, 2147483647, 2126008810, 2147483647,
    2130303777, 2147483647, 2147483647, 2143188679, 2136746228, 2147483647, 2126008810,
    2147483647, 2147483647,
];

const GAS_LOOKUP2: [u32; 16] = [
    4096000000, 2048000000, 1024000000, 512000000, 255744255, 127110228, 64000000, 32258064,
    16016016, 8000000, 4000000, 2000000, 1000000, 500000, 250000, 125000,
];

/// Gas resistance in Ω for the BME680 (low gas variant).
pub fn calc_gas_low(c: &CalibData, gas_adc: u16, gas_range: u8) -> u32 {
    let range = usize::from(gas_range & regs::GAS_RANGE_MSK);
    let var1 = ((1340 + 5 * i64::from(c.range_sw_err)) * i64::from(GAS_LOOKUP1[range])) >> 16;
    let var2 = (i64::from(gas_adc) << 15) - (1 << 24) + var1;
    let var3 = (i64::from(GAS_LOOKUP2[range]) * var1) >> 9;
    let res = (var3 + (var2 >> 1)).checked_div(var2).unwrap_or(0);
    u32::try_from(res.max(0)).unwrap_or(u32::MAX)
}

/// Gas resistance in Ω for the BME688 (high gas variant).
pub fn calc_gas_high(gas_adc: u16, gas_range: u8) -> u32 {
    let var1 = 262_144u64 >> (gas_range & regs::GAS_RANGE_MSK);
    let var2 = (i64::from(gas_adc) - 512) * 3 + 4096;
    let Ok(var2) = u64::try_from(var2) else {
        return 0;
    };
    let res = (10_000 * var1).checked_div(var2).unwrap_or(0) * 100;
    u32::try_from(res).unwrap_or(u32::MAX)
}

/// Heater resistance register value for `target_c` at ambient `amb_c`.
pub fn calc_res_heat(c: &CalibData, target_c: u16, amb_c: i8) -> u8 {
    let temp = i64::from(target_c.min(400));
    let var1 = ((i64::from(amb_c) * i64::from(c.par_g3)) / 1000) * 256;
    let var2 = (i64::from(c.par_g1) + 784)
        * (((((i64::from(c.par_g2) + 154_009) * temp * 5) / 100) + 3_276_800) / 10);
    let var3 = var1 + (var2 / 2);
    let var4 = var3 / (i64::from(c.res_heat_range) + 4);
    let var5 = 131 * i64::from(c.res_heat_val) + 65_536;
    let res_x100 = (var4.checked_div(var5).unwrap_or(0) - 250) * 34;
    ((res_x100 + 50) / 100).clamp(0, 255) as u8
}

/// Longest heater duration the gas_wait register can hold, ms.
pub const MAX_HEATER_MS: u16 = 0xFC0;

/// Encode a heater duration: 6-bit mantissa, 2-bit x1/x4/x16/x64 multiplier.
/// Durations that do not fit the mantissa are truncated to its step.
pub fn encode_gas_wait(duration_ms: u16) -> u8 {
    if duration_ms >= MAX_HEATER_MS {
        return 0xFF;
    }
    let mut dur = duration_ms;
    let mut factor = 0u8;
    while dur > 0x3F {
        dur /= 4;
        factor += 1;
    }
    (dur as u8) | (factor << 6)
}

/// Decode a gas_wait register value to ms.
pub fn decode_gas_wait(reg: u8) -> u32 {
    u32::from(reg & 0x3F) << (2 * u32::from(reg >> 6))
}
