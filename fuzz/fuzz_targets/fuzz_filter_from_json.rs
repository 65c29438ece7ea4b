//! Fuzz target: arbitrary JSON through `Filter::from_json` and the query
//! builders. Must never panic.
#![no_main]

use harperlink::query::{attribute_search, value_search};
use harperlink::{Filter, TablePath};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let Ok(filter) = Filter::from_json(value) else {
        return;
    };
    assert!(filter.validate().is_ok());

    let path = TablePath::parse("fuzz.target", None).unwrap();
    match filter {
        Filter::All => {}
        Filter::Attributes(attributes) => {
            attribute_search(&path, &attributes, None);
        }
        Filter::Values(values) => {
            let attributes = vec!["name".to_string(), "email".to_string()];
            value_search(&path, &attributes, &values, Some(1));
        }
        Filter::Any(filters) => {
            for attributes in &filters {
                attribute_search(&path, attributes, None);
            }
        }
    }
});
