/*
    memory.rs - In-process DocumentStore backend

    HashMap-backed implementation of the store client. Used as the test
    backend everywhere, and usable as a real embedded store for hosts
    that do not need durability. Field queries are collection scans;
    acceptable at the collection sizes this engine works with.
*/

use super::client::{DocumentStore, QueryOp};
use super::errors::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// In-memory document store
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            fail_reads: Mutex::new(false),
            fail_writes: Mutex::new(false),
        }
    }

    /// Make every read fail with `StoreError::Unavailable`
    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Make every write fail with `StoreError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Number of documents currently in a collection
    pub fn collection_len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    fn check_reads(&self) -> StoreResult<()> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    fn check_writes(&self) -> StoreResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two JSON scalars the way the backing store orders them:
/// numbers numerically, strings lexicographically. Mixed or non-scalar
/// values do not compare.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, collection: &str, key: &str, document: Value) -> StoreResult<()> {
        self.check_writes()?;
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document);
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        self.check_reads()?;
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        self.check_writes()?;
        if let Some(c) = self.collections.lock().unwrap().get_mut(collection) {
            c.remove(key);
        }
        Ok(())
    }

    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> StoreResult<Vec<Value>> {
        self.check_reads()?;
        let collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let matches = docs
            .values()
            .filter(|doc| {
                let Some(actual) = doc.get(field) else {
                    return false;
                };
                match op {
                    QueryOp::Eq => actual == value,
                    QueryOp::Gt => {
                        compare_values(actual, value) == Some(Ordering::Greater)
                    }
                    QueryOp::Lt => compare_values(actual, value) == Some(Ordering::Less),
                }
            })
            .cloned()
            .collect();
        Ok(matches)
    }
}
