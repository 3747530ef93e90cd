//! Fuzz target for dossier.toml parsing and validation.

#![no_main]

use dossier_config::{validate_config, DossierConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(config) = DossierConfig::parse_toml(data) {
        let _ = validate_config(&config);
    }
});
