//! Fuzz target: provisioning portal form
//!
//! Feeds arbitrary bodies through `PortalForm::from_json` and
//! `to_config`, verifying:
//! - No panics on malformed JSON or oversized fields
//! - Every accepted form yields a record that passes validation
//!
//! cargo fuzz run fuzz_portal_form

#![no_main]

use homenode::provisioning::PortalForm;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(form) = PortalForm::from_json(body) else {
        return;
    };
    if let Ok(cfg) = form.to_config() {
        assert!(cfg.validate().is_ok());
        assert!(cfg.broker_port != 0);
    }
});
