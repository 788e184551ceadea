//! BME68x + BSEC firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  I2cTransport → Bme68x    BsecLibrary     FsBlobStore          │
//! │  (SensorDriver)           (FusionEngine)  (BlobStore)          │
//! │  JsonConfigFile           EventBus → LogEventSink              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            Bme68xService (pure logic)                  │    │
//! │  │  ControlLoop · MeasurementCycle · Calibration          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Run loop: poll → sleep until next deadline → feed watchdog    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use bme68x_bsec::Error;
use bme68x_bsec::adapters::blob_store::FsBlobStore;
use bme68x_bsec::adapters::bsec_ffi::BsecLibrary;
use bme68x_bsec::adapters::config_file::JsonConfigFile;
use bme68x_bsec::adapters::event_bus::EventBus;
use bme68x_bsec::adapters::i2c_transport::I2cTransport;
use bme68x_bsec::adapters::log_sink::LogEventSink;
use bme68x_bsec::adapters::time::Esp32TimeAdapter;
use bme68x_bsec::app::ports::ConfigPort;
use bme68x_bsec::app::service::Bme68xService;
use bme68x_bsec::drivers::watchdog::Watchdog;
use bme68x_bsec::sensors::bme68x::Bme68x;

const FS_BASE: &core::ffi::CStr = c"/spiffs";
const FS_ROOT: &str = "/spiffs";
const CONFIG_PATH: &str = "/spiffs/bme68x.json";
const I2C_BAUDRATE_HZ: u32 = 100_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("BME68x/BSEC v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = mount_fs() {
        warn!("SPIFFS mount failed ({e}), config and state will not persist");
    }

    // ── 2. Configuration ──────────────────────────────────────
    let config = match JsonConfigFile::new(CONFIG_PATH).load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load failed ({e}), using defaults");
            Default::default()
        }
    };
    if !config.enable {
        info!("BME68x disabled");
        return Ok(());
    }

    // ── 3. Sensor on the configured bus ───────────────────────
    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let i2c_cfg = I2cConfig::new().baudrate(Hertz(I2C_BAUDRATE_HZ));
    let i2c = match config.i2c_bus {
        0 => I2cDriver::new(peripherals.i2c0, pins.gpio21, pins.gpio22, &i2c_cfg)?,
        1 => I2cDriver::new(peripherals.i2c1, pins.gpio14, pins.gpio15, &i2c_cfg)?,
        n => {
            error!("I2C bus {n} not available");
            return Err(Error::Init("unknown I2C bus").into());
        }
    };

    let transport = I2cTransport::new(i2c, Delay::new_default(), config.i2c_addr);
    let mut sensor = Bme68x::new(transport);
    match sensor.init() {
        Ok(()) => info!(
            "BME68x @ {}/0x{:02x} init ok ({:?})",
            config.i2c_bus,
            config.i2c_addr,
            sensor.variant()
        ),
        Err(e) => {
            error!(
                "BME68x @ {}/0x{:02x} init failed: {e}",
                config.i2c_bus, config.i2c_addr
            );
            return Err(Error::from(e).into());
        }
    }

    if !config.bsec.enable {
        info!("BSEC disabled, sensor left idle");
        return Ok(());
    }

    // ── 4. Fusion engine + service ────────────────────────────
    let engine = BsecLibrary::take().ok_or(Error::Init("BSEC library already in use"))?;
    let clock = Esp32TimeAdapter::new();
    let mut service = Bme68xService::new(sensor, engine, FsBlobStore::new(FS_ROOT), config.bsec);
    service.init(clock.uptime_ms())?;

    let mut bus = EventBus::new();
    bus.subscribe(LogEventSink::new());

    let watchdog = Watchdog::default();
    let slice_ms = watchdog.max_sleep_ms();

    // ── 5. Run loop ───────────────────────────────────────────
    loop {
        service.poll(clock.uptime_ms(), &mut bus);

        let now = clock.uptime_ms();
        let wait_ms = service
            .next_deadline()
            .map_or(slice_ms, |due| due.saturating_sub(now).min(slice_ms));
        if wait_ms > 0 {
            FreeRtos::delay_ms(wait_ms as u32);
        }
        watchdog.feed();
    }
}

/// Register the SPIFFS partition under [`FS_ROOT`].
fn mount_fs() -> core::result::Result<(), esp_idf_svc::sys::EspError> {
    use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

    let conf = esp_vfs_spiffs_conf_t {
        base_path: FS_BASE.as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };
    esp!(unsafe { esp_vfs_spiffs_register(&conf) })
}
