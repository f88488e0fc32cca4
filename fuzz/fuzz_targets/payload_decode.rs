//! Fuzz target for payload and record deserialization
//!
//! This fuzzer tests the decode surfaces that face untrusted input:
//! - Malformed JSON for the wire payload shape
//! - Malformed CBOR for stored records and bundles
//! - Wrong-length base64 fields (IV, tag)
//! - Type confusion between the record shapes
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an
//! error, and anything that does decode must re-encode and decode back
//! to the same value.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vaultwire_core::{ConversationKeyRecord, KeyBackupBundle, RotationRecord};
use vaultwire_crypto::EncryptedPayload;

fuzz_target!(|data: &[u8]| {
    // Wire shape: JSON with base64 fields
    if let Ok(payload) = serde_json::from_slice::<EncryptedPayload>(data) {
        let encoded = serde_json::to_vec(&payload).expect("re-encoding a decoded payload");
        let decoded: EncryptedPayload =
            serde_json::from_slice(&encoded).expect("decoding a re-encoded payload");
        assert_eq!(decoded, payload);
    }

    // Storage shapes: CBOR
    if let Ok(record) = ciborium::from_reader::<ConversationKeyRecord, _>(data) {
        let mut encoded = Vec::new();
        ciborium::into_writer(&record, &mut encoded).expect("re-encoding a decoded record");
        let decoded: ConversationKeyRecord =
            ciborium::from_reader(encoded.as_slice()).expect("decoding a re-encoded record");
        assert_eq!(decoded, record);
    }

    let _ = ciborium::from_reader::<RotationRecord, _>(data);
    let _ = ciborium::from_reader::<KeyBackupBundle, _>(data);
});
