//! Fuzz target: configuration inputs
//!
//! Feeds arbitrary bytes to the JSON configuration parser and to the
//! vendor config-blob header strip.  Neither may panic; an accepted JSON
//! record must pass its own validation.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use bme68x_bsec::adapters::config_file::JsonConfigFile;
use bme68x_bsec::bsec::CONFIG_BLOB_HEADER_LEN;
use bme68x_bsec::bsec::adapter::strip_config_header;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match strip_config_header(data) {
        Ok(body) => assert_eq!(body.len() + CONFIG_BLOB_HEADER_LEN, data.len()),
        Err(_) => assert!(data.len() < CONFIG_BLOB_HEADER_LEN),
    }

    if let Ok(text) = core::str::from_utf8(data) {
        if let Ok(cfg) = JsonConfigFile::parse(text) {
            assert!(cfg.validate().is_ok());
        }
    }
});
