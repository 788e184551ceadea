//! BME68x + BSEC bridge library.
//!
//! Drives a BME68x gas sensor in forced mode on the schedule dictated by
//! the BSEC fusion engine, feeds raw readings back into the engine and
//! publishes the fused outputs.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module, so everything else
//! builds and tests on the host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bsec;
pub mod calibration;
pub mod config;
pub mod drivers;
pub mod error;
pub mod measurement;
pub mod scheduler;
pub mod sensors;

pub use error::{Error, Result};
