//! Application core: scheduling logic, no direct I/O.
//!
//! This module holds the service that owns the control loop, the
//! calibration tracker and the fusion adapter.  All interaction with the
//! bus, the sensor, the vendor engine and storage happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
