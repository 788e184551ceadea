//! IAQ auto-calibration hysteresis.
//!
//! While IAQ accuracy is below 3 the IAQ group is forced down to the
//! low-power rate.  Once accuracy has held at 3 for `min_cycles`
//! consecutive cycles, the rate last chosen through the public setter is
//! restored.  A drop below 3 during the countdown re-arms it without
//! forcing the rate again.
//!
//! ```text
//!            acc<3, n==0             acc==3, n: k -> k-1
//!   Idle ────────────────▶ Forced ◀───────────────────┐
//!    ▲   (force LP, n=min)   │  acc<3: n=min           │
//!    │                       └─────────────────────────┘
//!    └────── acc==3, n: 1 -> 0 (restore prev rate) ────┘
//! ```

use log::info;

use crate::app::events::CalibrationStatus;
use crate::bsec::{Output, SampleRate};

/// Consecutive accuracy-3 cycles required before restoring the rate.
pub const MIN_CAL_CYCLES: u32 = 50;

/// What the caller must do with the IAQ subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationAction {
    /// Subscribe IAQ at [`SampleRate::LowPower`] without touching the
    /// remembered rate.
    ForceLowPower(CalibrationStatus),
    /// Subscribe IAQ at this rate through the public setter.
    Restore(SampleRate),
}

#[derive(Debug, Clone)]
pub struct Calibration {
    enabled: bool,
    min_cycles: u32,
    cycles_remaining: u32,
    prev_iaq_rate: SampleRate,
}

impl Calibration {
    pub fn new(enabled: bool) -> Self {
        Self::with_min_cycles(enabled, MIN_CAL_CYCLES)
    }

    pub fn with_min_cycles(enabled: bool, min_cycles: u32) -> Self {
        Self {
            enabled,
            min_cycles,
            cycles_remaining: 0,
            prev_iaq_rate: SampleRate::Disabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn cycles_remaining(&self) -> u32 {
        self.cycles_remaining
    }

    pub fn prev_iaq_rate(&self) -> SampleRate {
        self.prev_iaq_rate
    }

    /// Remember a rate accepted through the public IAQ setter.
    pub fn record_iaq_rate(&mut self, rate: SampleRate) {
        self.prev_iaq_rate = rate;
    }

    /// Feed this cycle's IAQ output.  Absent outputs (zero timestamp) are
    /// ignored.
    pub fn update(&mut self, iaq: &Output) -> Option<CalibrationAction> {
        if !self.enabled || !iaq.is_present() {
            return None;
        }
        let mut action = None;
        if iaq.accuracy < 3 && self.cycles_remaining < self.min_cycles {
            if self.cycles_remaining == 0 {
                let status = if iaq.accuracy == 2 {
                    info!("IAQ sensor is calibrating");
                    CalibrationStatus::Calibrating
                } else {
                    info!("IAQ sensor needs calibration");
                    CalibrationStatus::NeedsCalibration
                };
                action = Some(CalibrationAction::ForceLowPower(status));
            }
            self.cycles_remaining = self.min_cycles;
        }
        if iaq.accuracy == 3 && self.cycles_remaining > 0 {
            self.cycles_remaining -= 1;
            if self.cycles_remaining == 0 {
                info!("IAQ sensor calibration complete");
                action = Some(CalibrationAction::Restore(self.prev_iaq_rate));
            }
        }
        action
    }
}
