//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (console, RPC,
//! another firmware task) that the
//! [`Bme68xService`](super::service::Bme68xService) interprets and acts upon.

use crate::bsec::{ChannelGroup, SampleRate};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Kick off the control loop (no-op if already running).
    Start,

    /// Heat-source compensation value for the next measurements.
    SetHeatSource(f32),

    /// Change the subscription rate of one channel group.
    SetSampleRate(ChannelGroup, SampleRate),

    /// Apply a vendor configuration blob from storage.
    LoadConfiguration(String),

    /// Restore engine state from storage.
    LoadState(String),

    /// Persist engine state to storage now.
    SaveState(String),
}
