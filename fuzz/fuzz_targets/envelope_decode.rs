//! Arbitrary socket text must never panic the decoder, and anything that
//! decodes must survive an encode/decode cycle unchanged.

#![no_main]

use handcursor_proto::{Envelope, envelope::peek_request_id};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = peek_request_id(text);
    let Ok(envelope) = Envelope::decode(text) else {
        return;
    };

    let encoded = envelope.encode().unwrap();
    let again = Envelope::decode(&encoded).unwrap();
    assert_eq!(again.action, envelope.action);
    assert_eq!(again.request_id(), envelope.request_id());
});
