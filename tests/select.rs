//! Integration tests for select/search/uid.
//!
//! These tests verify the end-to-end behavior of:
//! - Exact-match searches built from attribute maps
//! - Value scans across every attribute of the table
//! - Concurrent unions of several attribute maps
//! - Filter validation before any request is sent

mod common;

use common::{connect, record, FakeHarper};
use harperlink::{Filter, Selection};
use serde_json::{json, Value};

fn kennel() -> FakeHarper {
    let server = FakeHarper::new().with_table("dev", "dogs", "id", &["id", "name", "owner"]);
    server.seed(
        "dev",
        "dogs",
        json!([
            {"id": 1, "name": "Rex", "owner": "ana"},
            {"id": 2, "name": "Bo", "owner": "ana"},
            {"id": 3, "name": "Rexford", "owner": "joe"},
        ]),
    );
    server
}

fn names(rows: &[harperlink::Record]) -> Vec<&str> {
    rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
}

// ============================================================================
// Attribute filters
// ============================================================================

#[tokio::test]
async fn test_attribute_filter_builds_equals_conditions() {
    let server = FakeHarper::new().with_table("dev", "dogs", "id", &[]);
    let db = connect(&server);

    db.search(record(json!({"a": 1, "b": "x"})), None).await.unwrap();

    let request = &server.requests()[0];
    assert_eq!(request["operation"], "search_by_conditions");
    assert_eq!(request["schema"], "dev");
    assert_eq!(request["table"], "dogs");
    assert_eq!(request["operator"], "and");
    assert_eq!(request["get_attributes"], json!(["*"]));
    assert_eq!(
        request["conditions"],
        json!([
            {"search_attribute": "a", "search_value": 1, "search_type": "equals"},
            {"search_attribute": "b", "search_value": "x", "search_type": "equals"},
        ])
    );
}

#[tokio::test]
async fn test_attribute_filter_ignores_insertion_order() {
    let server = FakeHarper::new().with_table("dev", "dogs", "id", &[]);
    let db = connect(&server);

    let mut forward = harperlink::Record::new();
    forward.insert("a".into(), json!(1));
    forward.insert("b".into(), json!("x"));
    let mut backward = harperlink::Record::new();
    backward.insert("b".into(), json!("x"));
    backward.insert("a".into(), json!(1));

    db.search(forward, None).await.unwrap();
    db.search(backward, None).await.unwrap();

    let requests = server.requests();
    let conditions = |i: usize| {
        let mut conditions = requests[i]["conditions"].as_array().unwrap().clone();
        conditions.sort_by_key(|c| c["search_attribute"].as_str().unwrap().to_string());
        conditions
    };
    assert_eq!(conditions(0).len(), 2);
    assert_eq!(conditions(0), conditions(1));
    assert!(requests.iter().all(|r| r["operator"] == "and"));
}

#[tokio::test]
async fn test_attribute_filter_matches_all_conditions() {
    let server = kennel();
    let db = connect(&server);

    let rows = db
        .search(record(json!({"owner": "ana", "name": "Bo"})), None)
        .await
        .unwrap();

    assert_eq!(names(&rows), vec!["Bo"]);
}

#[tokio::test]
async fn test_null_attributes_do_not_restrict() {
    let server = kennel();
    let db = connect(&server);

    let rows = db
        .search(record(json!({"owner": "ana", "name": null})), None)
        .await
        .unwrap();

    assert_eq!(names(&rows), vec!["Rex", "Bo"]);
    assert_eq!(server.requests()[0]["conditions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_limit_is_sent_only_when_given() {
    let server = kennel();
    let db = connect(&server);

    let rows = db.search(record(json!({"owner": "ana"})), Some(1)).await.unwrap();
    assert_eq!(rows.len(), 1);

    db.search(record(json!({"owner": "ana"})), None).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0]["limit"], 1);
    assert_eq!(requests[0]["offset"], 0);
    assert!(requests[1].get("limit").is_none());
}

#[tokio::test]
async fn test_all_null_attribute_filter_sends_nothing() {
    let server = kennel();
    let db = connect(&server);

    let rows = db.search(record(json!({"name": null})), None).await.unwrap();
    assert!(rows.is_empty());

    let rows = db.search(record(json!({})), None).await.unwrap();
    assert!(rows.is_empty());

    let filter = Filter::from_json(json!([{}, {"owner": null}])).unwrap();
    let rows = db.search(filter, None).await.unwrap();
    assert!(rows.is_empty());

    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_empty_map_in_union_adds_no_rows() {
    let server = kennel();
    let db = connect(&server);

    let filter = Filter::from_json(json!([{}, {"owner": "joe"}])).unwrap();
    let rows = db.search(filter, None).await.unwrap();

    assert_eq!(names(&rows), vec!["Rexford"]);
    assert_eq!(server.count("search_by_conditions"), 1);
}

// ============================================================================
// Value scans
// ============================================================================

#[tokio::test]
async fn test_value_filter_scans_every_attribute() {
    let server = FakeHarper::new().with_table("dev", "dogs", "id", &["name", "email"]);
    let db = connect(&server);

    db.search(Filter::values(["foo"]), None).await.unwrap();

    assert_eq!(server.operations(), vec!["describe_table", "search_by_conditions"]);
    let request = &server.requests()[1];
    assert_eq!(request["operator"], "or");
    assert_eq!(
        request["conditions"],
        json!([
            {"search_attribute": "name", "search_value": "foo", "search_type": "contains"},
            {"search_attribute": "email", "search_value": "foo", "search_type": "contains"},
        ])
    );
}

#[tokio::test]
async fn test_value_filter_conditions_are_attribute_major() {
    let server = FakeHarper::new().with_table("dev", "dogs", "id", &["name", "email"]);
    let db = connect(&server);

    db.search(Filter::values(vec![json!("foo"), json!(3), Value::Null]), None)
        .await
        .unwrap();

    let pairs: Vec<(String, Value)> = server.requests()[1]["conditions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["search_attribute"].as_str().unwrap().to_string(),
                c["search_value"].clone(),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("name".to_string(), json!("foo")),
            ("name".to_string(), json!(3)),
            ("email".to_string(), json!("foo")),
            ("email".to_string(), json!(3)),
        ]
    );
}

#[tokio::test]
async fn test_value_filter_finds_substrings() {
    let server = kennel();
    let db = connect(&server);

    let rows = db.search(Filter::values(["rex", "Rex"]), None).await.unwrap();

    assert_eq!(names(&rows), vec!["Rex", "Rexford"]);
}

#[tokio::test]
async fn test_all_null_values_send_nothing() {
    let server = kennel();
    let db = connect(&server);

    let rows = db.search(Filter::values(vec![Value::Null]), None).await.unwrap();

    assert!(rows.is_empty());
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_value_scan_adopts_table_hash_attribute() {
    let server = FakeHarper::new().with_table("dev", "dogs", "dog_id", &["dog_id", "name"]);
    server.seed("dev", "dogs", json!([{"dog_id": "d1", "name": "Rex"}]));
    let db = connect(&server);

    let rows = db.search(Filter::values(["Rex"]), None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(db.primary_key().unwrap(), "dog_id");

    let ids = db.uid(record(json!({"name": "Rex"}))).await.unwrap();
    assert_eq!(ids, vec![json!("d1")]);
}

#[tokio::test]
async fn test_value_scan_of_missing_table_is_empty() {
    let server = FakeHarper::new();
    let db = connect(&server);

    let rows = db.search(Filter::values(["foo"]), None).await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(server.operations(), vec!["describe_table"]);
}

// ============================================================================
// Unions
// ============================================================================

#[tokio::test]
async fn test_several_maps_are_searched_and_flattened_in_order() {
    let server = kennel();
    let db = connect(&server);

    let filter = Filter::from_json(json!([{"name": "Rexford"}, {"owner": "ana"}])).unwrap();
    let rows = db.search(filter, None).await.unwrap();

    assert_eq!(names(&rows), vec!["Rexford", "Rex", "Bo"]);
    assert_eq!(server.count("search_by_conditions"), 2);
}

#[tokio::test]
async fn test_empty_union_sends_nothing() {
    let server = kennel();
    let db = connect(&server);

    let rows = db.search(Filter::from_json(json!([])).unwrap(), None).await.unwrap();

    assert!(rows.is_empty());
    assert!(server.requests().is_empty());
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_malformed_filters_send_nothing() {
    let server = kennel();
    let db = connect(&server);

    assert!(Filter::from_json(json!(5)).unwrap_err().is_validation());
    assert!(Filter::from_json(json!([1, {"a": 1}])).unwrap_err().is_validation());

    let err = db
        .search(Filter::Values(vec![json!({"nested": true})]), None)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = db.search(Filter::All, None).await.unwrap_err();
    assert!(err.is_validation());

    assert!(server.requests().is_empty());
}

// ============================================================================
// select / uid
// ============================================================================

#[tokio::test]
async fn test_select_without_filter_describes() {
    let server = kennel();
    let db = connect(&server);

    let selection = db.select(Filter::All, None).await.unwrap();

    assert!(selection.is_schema());
    let Selection::Schema(description) = selection else {
        unreachable!()
    };
    assert_eq!(description["hash_attribute"], "id");
    assert_eq!(description["record_count"], 3);
}

#[tokio::test]
async fn test_describe_adopts_table_hash_attribute() {
    let server = FakeHarper::new().with_table("dev", "dogs", "dog_id", &[]);
    server.seed("dev", "dogs", json!([{"dog_id": "d1", "name": "Rex"}]));
    let db = connect(&server);
    assert_eq!(db.primary_key().unwrap(), "id");

    db.select(Filter::All, None).await.unwrap();

    assert_eq!(db.primary_key().unwrap(), "dog_id");
    let ids = db.uid(record(json!({"name": "Rex"}))).await.unwrap();
    assert_eq!(ids, vec![json!("d1")]);
}

#[tokio::test]
async fn test_select_with_filter_returns_records() {
    let server = kennel();
    let db = connect(&server);

    let selection = db.select(record(json!({"owner": "joe"})), None).await.unwrap();

    assert!(!selection.is_schema());
    assert_eq!(names(selection.records()), vec!["Rexford"]);
}

#[tokio::test]
async fn test_uid_returns_primary_keys() {
    let server = kennel();
    let db = connect(&server);

    let ids = db.uid(record(json!({"owner": "ana"}))).await.unwrap();

    assert_eq!(ids, vec![json!(1), json!(2)]);
}
