/*
    client.rs - Document store client interface

    The Grant Store collaborator is a document key-value store: named
    collections of JSON documents with get/set/delete plus a single-field
    query. Snapshots and delegation grants both live behind this trait;
    the engine does not assume anything else about the backend.
*/

use super::errors::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Field comparison supported by `query_by_field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    Eq,
    Gt,
    Lt,
}

/// Async client for a document key-value store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Upsert a document under `collection/key`, replacing any prior value
    async fn put(&self, collection: &str, key: &str, document: Value) -> StoreResult<()>;

    /// Fetch the document under `collection/key`, if any
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Value>>;

    /// Remove the document under `collection/key`; absent keys are not an error
    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()>;

    /// All documents in `collection` whose top-level `field` compares to
    /// `value` under `op`
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> StoreResult<Vec<Value>>;
}

/// Encode a typed record into a storable document
pub fn to_document<T: Serialize>(record: &T) -> StoreResult<Value> {
    serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode a stored document back into a typed record
pub fn from_document<T: DeserializeOwned>(document: Value) -> StoreResult<T> {
    serde_json::from_value(document).map_err(|e| StoreError::Serialization(e.to_string()))
}
