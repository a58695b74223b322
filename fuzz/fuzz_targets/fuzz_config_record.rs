//! Fuzz target: stored config record
//!
//! Loads arbitrary flash images through `ConfigStore` and verifies:
//! - No panics under arbitrary byte inputs
//! - The loaded record always carries the expected salt
//! - Whatever was loaded saves and reloads unchanged
//!
//! cargo fuzz run fuzz_config_record

#![no_main]

use homenode::adapters::nvs::NvsStorage;
use homenode::app::store::ConfigStore;
use homenode::config::{CONFIG_SALT, StoreLayout};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut store) = ConfigStore::open(NvsStorage::from_image(data.to_vec()), StoreLayout::default())
    else {
        return;
    };
    let loaded = store.snapshot().clone();
    assert_eq!(loaded.salt, CONFIG_SALT);

    store.save(&loaded).expect("a loaded record always fits its slot");
    assert_eq!(store.load().expect("RAM image is readable"), loaded);
});
