//! Shared test double: an in-memory HarperDB speaking the JSON protocol.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use harperlink::transport::{Transport, TransportRequest, TransportResponse};
use harperlink::{Config, Credentials, HarperDB, Record, Result};
use serde_json::{json, Value};

#[derive(Clone, Debug, Default)]
pub struct FakeTable {
    pub hash_attribute: String,
    pub declared: Vec<String>,
    pub rows: Vec<Record>,
}

impl FakeTable {
    fn attributes(&self) -> Vec<String> {
        let mut attributes = self.declared.clone();
        for row in &self.rows {
            for key in row.keys() {
                if !attributes.contains(key) {
                    attributes.push(key.clone());
                }
            }
        }
        attributes
    }

    fn describe(&self, schema: &str, table: &str) -> Value {
        json!({
            "name": table,
            "schema": schema,
            "hash_attribute": self.hash_attribute,
            "attributes": self
                .attributes()
                .into_iter()
                .map(|a| json!({"attribute": a}))
                .collect::<Vec<_>>(),
            "record_count": self.rows.len(),
        })
    }
}

#[derive(Default)]
struct State {
    schemas: BTreeMap<String, BTreeMap<String, FakeTable>>,
    requests: Vec<Value>,
    headers: Vec<Vec<(String, String)>>,
    failures: HashMap<String, Vec<String>>,
    next_id: u64,
}

/// In-memory server. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct FakeHarper {
    state: Arc<Mutex<State>>,
    latency: Duration,
}

impl FakeHarper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a namespace with one table.
    pub fn with_table(self, schema: &str, table: &str, hash_attribute: &str, declared: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.schemas.entry(schema.to_string()).or_default().insert(
                table.to_string(),
                FakeTable {
                    hash_attribute: hash_attribute.to_string(),
                    declared: declared.iter().map(|s| s.to_string()).collect(),
                    rows: Vec::new(),
                },
            );
        }
        self
    }

    /// Delays every response, letting concurrent requests interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Creates an empty namespace.
    pub fn with_schema(self, schema: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .schemas
            .entry(schema.to_string())
            .or_default();
        self
    }

    /// Stores rows directly, bypassing the protocol.
    pub fn seed(&self, schema: &str, table: &str, rows: Value) {
        let mut state = self.state.lock().unwrap();
        let table = state
            .schemas
            .get_mut(schema)
            .and_then(|tables| tables.get_mut(table))
            .expect("seeded table exists");
        for row in rows.as_array().expect("rows array") {
            table.rows.push(row.as_object().cloned().expect("row object"));
        }
    }

    /// Makes the next `operation` request fail with `message`.
    pub fn fail_next(&self, operation: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// Every request body received, in order.
    pub fn requests(&self) -> Vec<Value> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Operation names received, in order.
    pub fn operations(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r["operation"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Number of requests for one operation.
    pub fn count(&self, operation: &str) -> usize {
        self.operations().iter().filter(|op| *op == operation).count()
    }

    /// Headers of the last request.
    pub fn last_headers(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().headers.last().cloned().unwrap_or_default()
    }

    pub fn rows(&self, schema: &str, table: &str) -> Vec<Record> {
        let state = self.state.lock().unwrap();
        state
            .schemas
            .get(schema)
            .and_then(|tables| tables.get(table))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .schemas
            .get(schema)
            .is_some_and(|tables| tables.contains_key(table))
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<FakeTable> {
        let state = self.state.lock().unwrap();
        state.schemas.get(schema).and_then(|t| t.get(table)).cloned()
    }

    fn handle(&self, body: Value) -> (u16, Value) {
        let mut state = self.state.lock().unwrap();
        state.requests.push(body.clone());

        let operation = body["operation"].as_str().unwrap_or_default().to_string();
        if let Some(messages) = state.failures.get_mut(&operation) {
            if !messages.is_empty() {
                let message = messages.remove(0);
                return (400, json!({ "error": message }));
            }
        }

        let schema = body["schema"].as_str().unwrap_or_default().to_string();
        let table = body["table"].as_str().unwrap_or_default().to_string();

        match operation.as_str() {
            "describe_schema" => match state.schemas.get(&schema) {
                Some(tables) => {
                    let description: serde_json::Map<String, Value> = tables
                        .iter()
                        .map(|(name, t)| (name.clone(), t.describe(&schema, name)))
                        .collect();
                    (200, Value::Object(description))
                }
                None => missing_schema(&schema),
            },
            "create_schema" => {
                if state.schemas.contains_key(&schema) {
                    return (400, json!({"error": format!("database '{}' already exists", schema)}));
                }
                state.schemas.insert(schema.clone(), BTreeMap::new());
                (200, json!({"message": format!("database '{}' successfully created", schema)}))
            }
            "describe_table" => match lookup(&state, &schema, &table) {
                Ok(t) => (200, t.describe(&schema, &table)),
                Err(e) => e,
            },
            "create_table" => {
                let Some(tables) = state.schemas.get_mut(&schema) else {
                    return missing_schema(&schema);
                };
                if tables.contains_key(&table) {
                    return (400, json!({"error": format!("Table '{}' already exists", table)}));
                }
                tables.insert(
                    table.clone(),
                    FakeTable {
                        hash_attribute: body["hash_attribute"].as_str().unwrap_or("id").to_string(),
                        ..Default::default()
                    },
                );
                (200, json!({"message": format!("table '{}.{}' successfully created.", schema, table)}))
            }
            "insert" | "upsert" | "update" => write(&mut state, &operation, &schema, &table, &body),
            "delete" => {
                let t = match lookup_mut(&mut state, &schema, &table) {
                    Ok(t) => t,
                    Err(e) => return e,
                };
                let key = t.hash_attribute.clone();
                let mut deleted = Vec::new();
                for value in body["hash_values"].as_array().cloned().unwrap_or_default() {
                    let before = t.rows.len();
                    t.rows.retain(|row| row.get(&key) != Some(&value));
                    if t.rows.len() != before {
                        deleted.push(value);
                    }
                }
                (200, json!({"message": format!("{} of {} records successfully deleted", deleted.len(), body["hash_values"].as_array().map_or(0, Vec::len)), "deleted_hashes": deleted}))
            }
            "search_by_conditions" => {
                let t = match lookup(&state, &schema, &table) {
                    Ok(t) => t,
                    Err(e) => return e,
                };
                let conditions = body["conditions"].as_array().cloned().unwrap_or_default();
                let any = body["operator"] == "or";
                let mut rows: Vec<Value> = t
                    .rows
                    .iter()
                    .filter(|row| {
                        let mut results = conditions.iter().map(|c| matches(row, c));
                        if any {
                            results.any(|m| m)
                        } else {
                            results.all(|m| m)
                        }
                    })
                    .map(|row| Value::Object(row.clone()))
                    .collect();
                if let Some(limit) = body.get("limit").and_then(Value::as_u64) {
                    rows.truncate(limit as usize);
                }
                (200, Value::Array(rows))
            }
            "sql" => (200, json!([])),
            other => (400, json!({"error": format!("Operation '{}' is not supported", other)})),
        }
    }
}

fn missing_schema(schema: &str) -> (u16, Value) {
    (404, json!({"error": format!("database '{}' does not exist", schema)}))
}

fn lookup<'a>(state: &'a State, schema: &str, table: &str) -> std::result::Result<&'a FakeTable, (u16, Value)> {
    let tables = state.schemas.get(schema).ok_or_else(|| missing_schema(schema))?;
    tables.get(table).ok_or_else(|| {
        (404, json!({"error": format!("Table '{}.{}' does not exist", schema, table)}))
    })
}

fn lookup_mut<'a>(
    state: &'a mut State,
    schema: &str,
    table: &str,
) -> std::result::Result<&'a mut FakeTable, (u16, Value)> {
    let tables = state.schemas.get_mut(schema).ok_or_else(|| missing_schema(schema))?;
    tables.get_mut(table).ok_or_else(|| {
        (404, json!({"error": format!("Table '{}.{}' does not exist", schema, table)}))
    })
}

fn write(state: &mut State, operation: &str, schema: &str, table: &str, body: &Value) -> (u16, Value) {
    state.next_id += 1;
    let mut next_id = state.next_id * 1000;
    let t = match lookup_mut(state, schema, table) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let key = t.hash_attribute.clone();
    let mut written = Vec::new();
    let mut skipped = Vec::new();

    for record in body["records"].as_array().cloned().unwrap_or_default() {
        let mut record = record.as_object().cloned().unwrap_or_default();
        if record.keys().any(|k| k.starts_with("__")) {
            return (400, json!({"error": "reserved attribute names cannot be written"}));
        }
        let existing = record
            .get(&key)
            .and_then(|id| t.rows.iter().position(|row| row.get(&key) == Some(id)));

        match (operation, existing) {
            ("insert", Some(_)) => skipped.push(record[&key].clone()),
            ("update", None) => skipped.push(record.get(&key).cloned().unwrap_or(Value::Null)),
            ("update" | "upsert", Some(pos)) => {
                let row = &mut t.rows[pos];
                row.extend(record.clone());
                row.insert("__updatedtime__".into(), json!(2));
                written.push(row[&key].clone());
            }
            _ => {
                if !record.contains_key(&key) {
                    next_id += 1;
                    record.insert(key.clone(), json!(format!("gen-{}", next_id)));
                }
                record.insert("__createdtime__".into(), json!(1));
                record.insert("__updatedtime__".into(), json!(1));
                written.push(record[&key].clone());
                t.rows.push(record);
            }
        }
    }

    let field = match operation {
        "insert" => "inserted_hashes",
        "update" => "update_hashes",
        _ => "upserted_hashes",
    };
    (200, json!({
        "message": format!("{} {} of {} records", operation, written.len(), written.len() + skipped.len()),
        field: written,
        "skipped_hashes": skipped,
    }))
}

fn matches(row: &Record, condition: &Value) -> bool {
    let attribute = condition["search_attribute"].as_str().unwrap_or_default();
    let expected = &condition["search_value"];
    let Some(actual) = row.get(attribute) else {
        return false;
    };
    match condition["search_type"].as_str() {
        Some("equals") => actual == expected,
        Some("contains") => text(actual).contains(&text(expected)),
        _ => false,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Transport for FakeHarper {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let body: Value = serde_json::from_str(&request.body).expect("client sends JSON");
        self.state.lock().unwrap().headers.push(request.headers.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let (status, body) = self.handle(body);
        Ok(TransportResponse::new(status, body))
    }
}

/// Transport that always fails at the network level.
pub struct Offline;

#[async_trait]
impl Transport for Offline {
    async fn send(&self, _request: TransportRequest) -> Result<TransportResponse> {
        Err(harperlink::HarperError::transport("connection refused"))
    }
}

pub fn config() -> Config {
    Config::new("http://localhost:9925", Credentials::token("dG9rZW4="), "dev", "dogs")
}

/// Opens a handle on `dev.dogs` against the fake server.
pub fn connect(server: &FakeHarper) -> HarperDB {
    HarperDB::with_transport(config(), Arc::new(server.clone())).unwrap()
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record literal must be an object")
}
