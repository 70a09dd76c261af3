//! Configuration documents from disk or from clients are untrusted: parsing
//! and merging arbitrary JSON must fail cleanly, and a bundle that
//! validates must read back unchanged from its own documents.

#![no_main]

use handcursor_core::{ConfigBundle, InteractionConfig, config::parse_document};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(interaction) = parse_document::<InteractionConfig>("InteractionConfig", text) {
        let _ = interaction.validate();
    }

    let Ok(patch) = serde_json::from_str::<serde_json::Value>(text) else {
        return;
    };
    let Ok(bundle) = ConfigBundle::default().merged(Some(&patch), None) else {
        return;
    };
    assert!(bundle.validate().is_ok());
    let (interaction, physical) = bundle.to_json().unwrap();
    // Non-finite numbers serialise as null and cannot be read back.
    if let Ok(again) = ConfigBundle::default().merged(Some(&interaction), Some(&physical)) {
        assert_eq!(again, bundle);
    }
});
