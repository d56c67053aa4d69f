//! Fuzz target for encoder configuration.
//!
//! Feeds arbitrary TOML to the configuration loader. Any configuration
//! that loads must produce an encoder.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_encoder_config
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use wql_query::{EncoderConfig, TagEncoder};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(config) = EncoderConfig::from_toml_str(input) {
            TagEncoder::from_config(&config).expect("validated config builds an encoder");
        }
    }
});
