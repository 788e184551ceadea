//! Fusion library adapter.
//!
//! Wraps a [`FusionEngine`] behind byte-blob and sample-rate operations.
//! Nothing here retries: the caller decides whether a failure is fatal
//! (init) or logged and skipped (runtime).

use log::{debug, info};

use super::{
    CONFIG_BLOB_HEADER_LEN, ChannelGroup, CycleSettings, Input, MAX_PROPERTY_BLOB_SIZE,
    MAX_STATE_BLOB_SIZE, Outputs, SampleRate, SensorConfiguration, Version,
};
use crate::app::ports::{BlobStore, FusionEngine};
use crate::error::{ConfigError, EngineError};

/// Serialised engine state, ready to be written verbatim.
pub type StateBlob = heapless::Vec<u8, MAX_STATE_BLOB_SIZE>;

pub struct BsecAdapter<E: FusionEngine> {
    engine: E,
}

impl<E: FusionEngine> BsecAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Initialise the engine and report its version.
    pub fn init(&mut self) -> Result<Version, EngineError> {
        self.engine.init()?;
        self.engine.version()
    }

    /// Apply a vendor configuration blob.  The 4-byte header written by the
    /// vendor's binary tool is stripped before the engine sees it.
    pub fn load_configuration(&mut self, blob: &[u8]) -> Result<(), ConfigError> {
        let body = strip_config_header(blob)?;
        if body.len() > MAX_PROPERTY_BLOB_SIZE {
            return Err(ConfigError::TooLarge {
                len: body.len(),
                max: MAX_PROPERTY_BLOB_SIZE,
            });
        }
        self.engine
            .set_configuration(body)
            .map_err(ConfigError::Rejected)
    }

    /// Restore a state blob exactly as [`save_state`](Self::save_state)
    /// produced it.
    pub fn load_state(&mut self, blob: &[u8]) -> Result<(), ConfigError> {
        if blob.len() > MAX_PROPERTY_BLOB_SIZE {
            return Err(ConfigError::TooLarge {
                len: blob.len(),
                max: MAX_PROPERTY_BLOB_SIZE,
            });
        }
        self.engine.set_state(blob).map_err(ConfigError::Rejected)
    }

    pub fn save_state(&mut self) -> Result<StateBlob, ConfigError> {
        let mut buf = [0u8; MAX_STATE_BLOB_SIZE];
        let len = self
            .engine
            .get_state(&mut buf)
            .map_err(ConfigError::Rejected)?;
        let used = buf.get(..len).ok_or(ConfigError::TooLarge {
            len,
            max: MAX_STATE_BLOB_SIZE,
        })?;
        StateBlob::from_slice(used).map_err(|()| ConfigError::TooLarge {
            len,
            max: MAX_STATE_BLOB_SIZE,
        })
    }

    /// Subscribe every virtual sensor of `group` at `rate`.
    pub fn set_sample_rate(
        &mut self,
        group: ChannelGroup,
        rate: SampleRate,
    ) -> Result<(), EngineError> {
        let hz = rate.hz();
        let requested: heapless::Vec<SensorConfiguration, 8> = group
            .sensors()
            .iter()
            .map(|&sensor| SensorConfiguration {
                sensor,
                sample_rate: hz,
            })
            .collect();
        debug!("BSEC: {} sample rate -> {}", group.name(), rate.as_str());
        self.engine.update_subscription(&requested)
    }

    pub fn query_next_action(&mut self, timestamp_ns: i64) -> Result<CycleSettings, EngineError> {
        self.engine.sensor_control(timestamp_ns)
    }

    pub fn run_fusion_step(&mut self, inputs: &[Input]) -> Result<Outputs, EngineError> {
        let mut outputs = Outputs::new();
        self.engine.do_steps(inputs, &mut outputs)?;
        Ok(outputs)
    }

    // ── Blob-store helpers ────────────────────────────────────────

    pub fn load_configuration_from(
        &mut self,
        store: &impl BlobStore,
        path: &str,
    ) -> Result<(), ConfigError> {
        let blob = store.load(path)?;
        self.load_configuration(&blob)
    }

    pub fn load_state_from(&mut self, store: &impl BlobStore, path: &str) -> Result<(), ConfigError> {
        let blob = store.load(path)?;
        self.load_state(&blob)
    }

    pub fn save_state_to(&mut self, store: &mut impl BlobStore, path: &str) -> Result<(), ConfigError> {
        let blob = self.save_state()?;
        store.save(path, &blob)?;
        info!("BSEC: state saved ({} bytes) to {path}", blob.len());
        Ok(())
    }
}

/// The engine-facing part of a vendor configuration blob.
pub fn strip_config_header(blob: &[u8]) -> Result<&[u8], ConfigError> {
    blob.get(CONFIG_BLOB_HEADER_LEN..)
        .ok_or(ConfigError::Truncated { len: blob.len() })
}
