//! Document store collaborator.
//!
//! The mapper drives an external document store exclusively through
//! [`DocumentStore`], which keeps the wire transport (HTTP client,
//! retries, index naming) pluggable and lets tests substitute an
//! in-memory backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Receipt for a single-document write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteReceipt {
    /// Backend-assigned or echoed document id.
    pub id: String,
    /// Document version after the write.
    pub version: i64,
}

/// Summary of a delete operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub deleted: u64,
}

/// One command inside a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum BulkCommand {
    Create {
        id: Option<String>,
        document: Value,
    },
    Update {
        id: String,
        document: Value,
        /// Treat the document as an upsert body.
        upsert: bool,
    },
    Delete {
        id: String,
    },
}

/// Per-item outcome inside a bulk response, in command order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    pub id: Option<String>,
    pub version: Option<i64>,
    /// Operation-level error detail, when the item failed.
    pub error: Option<String>,
    pub status: Option<u16>,
}

impl BulkItem {
    pub fn ok(id: impl Into<String>, version: i64) -> Self {
        Self {
            id: Some(id.into()),
            version: Some(version),
            error: None,
            status: None,
        }
    }

    pub fn failed(error: impl Into<String>, status: u16) -> Self {
        Self {
            id: None,
            version: None,
            error: Some(error.into()),
            status: Some(status),
        }
    }
}

/// Response to a bulk request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub items: Vec<BulkItem>,
}

/// One slot of a multi-get response, in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiGetDoc {
    pub found: bool,
    pub source: Option<Value>,
}

/// Response to a multi-get request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiGetResponse {
    pub docs: Vec<MultiGetDoc>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Stored document, absent when the query selected fields.
    pub source: Option<Value>,
    /// Selected fields, when the query asked for them.
    pub fields: Option<Value>,
}

/// Response to a search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

/// Asynchronous document store interface.
///
/// Every method is one round trip; a `get` miss resolves to
/// `Ok(None)` rather than an error. Implementations are expected to
/// make `create_index` and `put_mapping` idempotent, since racing
/// first calls may issue them twice.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point lookup by id; `None` when the document does not exist.
    async fn get(&self, id: &str) -> Result<Option<Value>, StoreError>;

    /// Index a document. `create_only` fails if the id already exists.
    async fn index(
        &self,
        id: Option<&str>,
        document: &Value,
        create_only: bool,
    ) -> Result<WriteReceipt, StoreError>;

    /// Apply a partial document; `upsert` inserts when absent.
    async fn update(
        &self,
        id: &str,
        document: &Value,
        upsert: bool,
    ) -> Result<WriteReceipt, StoreError>;

    /// Delete one document by id.
    async fn delete(&self, id: &str) -> Result<DeleteSummary, StoreError>;

    /// Delete every document matching a query.
    async fn delete_by_query(&self, query: &Value) -> Result<DeleteSummary, StoreError>;

    /// Execute a batched command list in one round trip.
    async fn bulk(&self, commands: &[BulkCommand]) -> Result<BulkResponse, StoreError>;

    /// Fetch many documents by id in one round trip.
    async fn multi_get(&self, ids: &[String]) -> Result<MultiGetResponse, StoreError>;

    /// Run a query.
    async fn search(&self, query: &Value) -> Result<SearchResponse, StoreError>;

    /// Whether the backing index exists.
    async fn exists(&self) -> Result<bool, StoreError>;

    /// Create the backing index with the given mapping.
    async fn create_index(&self, mapping: &Value) -> Result<(), StoreError>;

    /// Install the mapping on an existing index.
    async fn put_mapping(&self, mapping: &Value) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bulk_command_serializes_tagged() {
        let command = BulkCommand::Create {
            id: Some("abc".into()),
            document: json!({ "name": "Hamish" }),
        };
        let wire = serde_json::to_value(&command).unwrap();
        assert_eq!(wire["op"], "create");
        assert_eq!(wire["id"], "abc");
    }

    #[test]
    fn bulk_item_constructors() {
        let ok = BulkItem::ok("abc", 2);
        assert_eq!(ok.version, Some(2));
        assert!(ok.error.is_none());

        let failed = BulkItem::failed("version conflict", 409);
        assert_eq!(failed.status, Some(409));
        assert!(failed.error.is_some());
    }
}
