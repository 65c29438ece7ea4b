//! Fuzz target: arbitrary JSON through record normalization and encoding.
#![no_main]

use harperlink::codec::{serialize, strip_server_timestamps};
use harperlink::{Command, Records};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let Ok(records) = Records::try_from(value) else {
        return;
    };

    let records = strip_server_timestamps(records.into_inner());
    let command = Command::Upsert {
        schema: "fuzz".into(),
        table: "target".into(),
        records,
    };
    assert!(serialize(&command).is_some());
});
