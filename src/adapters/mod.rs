//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements   | Connects to                     |
//! |-----------------|--------------|---------------------------------|
//! | `blob_store`    | BlobStore    | VFS filesystem / in-memory map  |
//! | `bsec_ffi`      | FusionEngine | vendor `libalgobsec.a` (ESP-IDF)|
//! | `config_file`   | ConfigPort   | JSON file via serde_json        |
//! | `event_bus`     | EventSink    | fan-out to subscribed sinks     |
//! | `i2c_transport` | Transport    | embedded-hal 1.0 I2C bus        |
//! | `log_sink`      | EventSink    | Serial log output               |
//! | `time`          | (clock)      | ESP32 system timer              |

pub mod blob_store;
#[cfg(target_os = "espidf")]
pub mod bsec_ffi;
pub mod config_file;
pub mod event_bus;
pub mod i2c_transport;
pub mod log_sink;
pub mod time;
