//! Schema-aware operations against a document store.
//!
//! A [`Mapper`] owns a compiled [`Mapping`] and a [`DocumentStore`]
//! collaborator. Every write validates (and sanitizes) the document
//! before any I/O; every read coerces what the store returned into
//! canonical form. Batch writes are all-or-nothing: the first invalid
//! document, and the first failing per-item store outcome, fail the
//! whole batch.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{debug, warn};

use crate::analyzer::Mapping;
use crate::coercer::coerce_model;
use crate::error::{MapperError, MappingError, ModelError, ParameterError, StoreError};
use crate::store::{BulkCommand, BulkItem, DeleteSummary, DocumentStore};
use crate::validator::{validate_model, Validation};

/// Page size for bulk deletes; pages are issued strictly sequentially.
const BULK_DELETE_PAGE: usize = 500;

/// Outcome of a single-document write.
#[derive(Debug, Clone, PartialEq)]
pub struct Written {
    /// Sanitized, coerced form of the document that was written.
    pub document: Value,
    /// Caller-supplied, schema-extracted or backend-assigned id.
    pub id: String,
    /// Document version after the write.
    pub version: i64,
}

/// Outcome of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkWritten {
    /// Sanitized, coerced documents in submission order.
    pub documents: Vec<Value>,
    /// Ids reported by the store, in submission order.
    pub ids: Vec<String>,
    /// Per-item versions, in submission order.
    pub versions: Vec<Option<i64>>,
}

/// Search result metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSummary {
    /// Total hit count reported by the store.
    pub total: u64,
    /// The query that produced the result, echoed back.
    pub query: Value,
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    pub documents: Vec<Value>,
    pub summary: SearchSummary,
}

/// Schema-driven mapper over a document store.
///
/// The compiled mapping is read-only; the only interior state is the
/// initialization flag, so a `Mapper` can be shared across tasks.
pub struct Mapper<S> {
    store: S,
    mapping: Mapping,
    raw_mapping: Value,
    initialized: AtomicBool,
}

impl<S: DocumentStore> Mapper<S> {
    /// Analyze the mapping and bind the store collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] when the mapping definition is
    /// malformed; nothing is sent to the store.
    pub fn new(store: S, mapping: &Value) -> Result<Self, MappingError> {
        Ok(Self {
            store,
            mapping: Mapping::analyze(mapping)?,
            raw_mapping: mapping.clone(),
            initialized: AtomicBool::new(false),
        })
    }

    /// The compiled mapping.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// The store collaborator.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a leaf field is registered at the dotted path.
    pub fn field_exists(&self, path: &str) -> bool {
        self.mapping.field_exists(path)
    }

    /// String fields the backend analyzes (no `index` opt-out).
    pub fn analyzed_fields(&self) -> Vec<&str> {
        self.mapping.analyzed_fields()
    }

    /// Validate a document, returning its sanitized clone and the
    /// extracted identity.
    ///
    /// # Errors
    ///
    /// [`ModelError::Invalid`] carrying the first validation message.
    pub fn validate(&self, model: &Value) -> Result<Validation, ModelError> {
        let validation = validate_model(&self.mapping, model, false);
        match validation.errors.first() {
            Some(message) => Err(ModelError::Invalid {
                message: message.clone(),
            }),
            None => Ok(validation),
        }
    }

    /// Parse a JSON string and coerce it against the mapping.
    pub fn parse_str(&self, raw: &str) -> Result<Value, ModelError> {
        let json: Value =
            serde_json::from_str(raw).map_err(|source| ModelError::Parse { source })?;
        self.parse(&json)
    }

    /// Coerce a decoded document (or array of documents) against the
    /// mapping. The input is cloned, never mutated.
    pub fn parse(&self, json: &Value) -> Result<Value, ModelError> {
        let acceptable = match json {
            Value::Object(map) => !map.is_empty(),
            Value::Array(_) => true,
            _ => false,
        };
        if !acceptable {
            return Err(ModelError::Invalid {
                message: "supplied model is not an object".to_string(),
            });
        }

        let mut model = json.clone();
        coerce_model(&self.mapping, &mut model);
        Ok(model)
    }

    /// Point lookup; `Ok(None)` when the document does not exist.
    pub async fn get(&self, id: &str) -> Result<Option<Value>, MapperError> {
        if id.is_empty() {
            return Err(ParameterError::new("_id", "_id parameter is not supplied").into());
        }

        self.ensure_initialized().await?;
        debug!(id, "get document");

        match self.store.get(id).await {
            Ok(Some(mut document)) => {
                coerce_model(&self.mapping, &mut document);
                Ok(Some(document))
            }
            Ok(None) => Ok(None),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err
                .with_desc("unable to get document")
                .with_id(id)
                .into()),
        }
    }

    /// Validate and index a new document. Without an explicit id the
    /// schema identity path, then the backend, assigns one.
    pub async fn create(&self, id: Option<&str>, doc: &Value) -> Result<Written, MapperError> {
        let (mut model, identity) = self.validated(doc, false)?;
        let id_value = id
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .or_else(|| identity_string(identity.as_ref()));

        self.ensure_initialized().await?;
        debug!(id = id_value.as_deref(), "create document");

        let receipt = self
            .store
            .index(id_value.as_deref(), &model, true)
            .await
            .map_err(|err| {
                let err = err.with_desc("unable to index new document");
                match &id_value {
                    Some(id) => err.with_id(id),
                    None => err,
                }
            })?;

        coerce_model(&self.mapping, &mut model);
        Ok(Written {
            document: model,
            id: receipt.id,
            version: receipt.version,
        })
    }

    /// Partial update of an existing document. Required-field checks
    /// are suppressed so sparse payloads validate.
    pub async fn update(&self, id: Option<&str>, doc: &Value) -> Result<Written, MapperError> {
        self.write_update(id, doc, false).await
    }

    /// Update-or-insert. The full document validates, required fields
    /// included.
    pub async fn upsert(&self, id: Option<&str>, doc: &Value) -> Result<Written, MapperError> {
        self.write_update(id, doc, true).await
    }

    /// Delete one document by id.
    pub async fn delete(&self, id: &str) -> Result<DeleteSummary, MapperError> {
        if id.is_empty() {
            return Err(ParameterError::new("_id", "_id parameter is not supplied").into());
        }

        self.ensure_initialized().await?;
        debug!(id, "delete document");

        Ok(self.store.delete(id).await.map_err(|err| {
            err.with_desc("unable to delete specified document").with_id(id)
        })?)
    }

    /// Delete every document matching a query.
    pub async fn delete_by_query(&self, query: &Value) -> Result<DeleteSummary, MapperError> {
        self.ensure_initialized().await?;
        debug!("delete documents by query");

        Ok(self
            .store
            .delete_by_query(query)
            .await
            .map_err(|err| err.with_desc("unable to delete documents by query"))?)
    }

    /// Run a query; found sources are coerced, field-selection hits
    /// pass through as the store returned them.
    pub async fn search(&self, query: &Value) -> Result<Found, MapperError> {
        self.ensure_initialized().await?;
        debug!("search");

        let response = self
            .store
            .search(query)
            .await
            .map_err(|err| err.with_desc("unable to search"))?;

        let mut documents = Vec::with_capacity(response.hits.len());
        for hit in response.hits {
            if let Some(fields) = hit.fields {
                documents.push(fields);
            } else if let Some(mut source) = hit.source {
                coerce_model(&self.mapping, &mut source);
                documents.push(source);
            }
        }

        Ok(Found {
            documents,
            summary: SearchSummary {
                total: response.total,
                query: query.clone(),
            },
        })
    }

    /// Validate and create many documents in one store round trip.
    ///
    /// All-or-nothing: the first invalid document aborts the batch
    /// before any I/O, and the first failing per-item outcome fails
    /// the whole batch.
    pub async fn bulk_create(
        &self,
        id_list: &[String],
        doc_list: &[Value],
    ) -> Result<BulkWritten, MapperError> {
        check_bulk_lists(id_list, doc_list)?;

        let mut commands = Vec::with_capacity(doc_list.len());
        let mut documents = Vec::with_capacity(doc_list.len());
        for (index, doc) in doc_list.iter().enumerate() {
            let (mut model, identity) = self.validated(doc, false)?;
            let id = id_list
                .get(index)
                .filter(|s| !s.is_empty())
                .cloned()
                .or_else(|| identity_string(identity.as_ref()));

            coerce_model(&self.mapping, &mut model);
            commands.push(BulkCommand::Create {
                id,
                document: model.clone(),
            });
            documents.push(model);
        }

        self.ensure_initialized().await?;
        debug!(count = commands.len(), "bulk create");

        let response = self.store.bulk(&commands).await?;
        scan_bulk_items(&response.items, "create")?;
        Ok(bulk_written(documents, &response.items))
    }

    /// Bulk partial updates; see [`Mapper::update`] for the
    /// per-document validation rules.
    pub async fn bulk_update(
        &self,
        id_list: &[String],
        doc_list: &[Value],
    ) -> Result<BulkWritten, MapperError> {
        self.bulk_write(id_list, doc_list, false).await
    }

    /// Bulk update-or-insert.
    pub async fn bulk_upsert(
        &self,
        id_list: &[String],
        doc_list: &[Value],
    ) -> Result<BulkWritten, MapperError> {
        self.bulk_write(id_list, doc_list, true).await
    }

    /// Delete many documents by id, paging the command list in
    /// strictly sequential round trips.
    pub async fn bulk_delete(&self, id_list: &[String]) -> Result<DeleteSummary, MapperError> {
        if id_list.is_empty() {
            return Err(ParameterError::new(
                "idList",
                "the supplied idList is either not an array or is empty",
            )
            .into());
        }
        for (index, id) in id_list.iter().enumerate() {
            if id.is_empty() {
                return Err(ParameterError::new(
                    "idList",
                    format!("_id at index {index} is empty"),
                )
                .into());
            }
        }

        self.ensure_initialized().await?;
        debug!(count = id_list.len(), "bulk delete");

        let mut summary = DeleteSummary::default();
        for page in id_list.chunks(BULK_DELETE_PAGE) {
            let commands: Vec<BulkCommand> = page
                .iter()
                .map(|id| BulkCommand::Delete { id: id.clone() })
                .collect();
            let response = self.store.bulk(&commands).await?;
            scan_bulk_items(&response.items, "delete")?;
            summary.deleted += response.items.len() as u64;
        }
        Ok(summary)
    }

    /// Fetch many documents by id; misses are skipped, found sources
    /// are coerced.
    pub async fn bulk_get(&self, id_list: &[String]) -> Result<Vec<Value>, MapperError> {
        if id_list.is_empty() {
            return Err(ParameterError::new(
                "idList",
                "the supplied idList is either not an array or is empty",
            )
            .into());
        }
        for (index, id) in id_list.iter().enumerate() {
            if id.is_empty() {
                return Err(ParameterError::new(
                    "idList",
                    format!("_id at index {index} is empty"),
                )
                .into());
            }
        }

        self.ensure_initialized().await?;
        debug!(count = id_list.len(), "bulk get");

        let response = self
            .store
            .multi_get(id_list)
            .await
            .map_err(|err| err.with_desc("unable to multi-get documents"))?;

        let mut documents = Vec::new();
        for doc in response.docs {
            if !doc.found {
                continue;
            }
            if let Some(mut source) = doc.source {
                coerce_model(&self.mapping, &mut source);
                documents.push(source);
            }
        }
        Ok(documents)
    }

    /// Run the ensure-initialized round trip without any other work.
    pub async fn verify_connection(&self) -> Result<(), MapperError> {
        self.ensure_initialized().await
    }

    async fn write_update(
        &self,
        id: Option<&str>,
        doc: &Value,
        upsert: bool,
    ) -> Result<Written, MapperError> {
        let (mut model, identity) = self.validated(doc, !upsert)?;
        let id_value = id
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .or_else(|| identity_string(identity.as_ref()))
            .ok_or_else(|| ParameterError::new("_id", "_id parameter is not supplied"))?;

        self.ensure_initialized().await?;
        debug!(id = id_value.as_str(), upsert, "update document");

        let receipt = self
            .store
            .update(&id_value, &model, upsert)
            .await
            .map_err(|err| {
                let desc = if upsert {
                    "unable to upsert document"
                } else {
                    "unable to update document"
                };
                err.with_desc(desc).with_id(&id_value)
            })?;

        coerce_model(&self.mapping, &mut model);
        Ok(Written {
            document: model,
            id: receipt.id,
            version: receipt.version,
        })
    }

    async fn bulk_write(
        &self,
        id_list: &[String],
        doc_list: &[Value],
        upsert: bool,
    ) -> Result<BulkWritten, MapperError> {
        check_bulk_lists(id_list, doc_list)?;

        let mut commands = Vec::with_capacity(doc_list.len());
        let mut documents = Vec::with_capacity(doc_list.len());
        for (index, doc) in doc_list.iter().enumerate() {
            let (mut model, identity) = self.validated(doc, !upsert)?;
            let id = id_list
                .get(index)
                .filter(|s| !s.is_empty())
                .cloned()
                .or_else(|| identity_string(identity.as_ref()))
                .ok_or_else(|| {
                    ParameterError::new("_id", format!("no _id exists for document at index {index}"))
                })?;

            coerce_model(&self.mapping, &mut model);
            commands.push(BulkCommand::Update {
                id,
                document: model.clone(),
                upsert,
            });
            documents.push(model);
        }

        self.ensure_initialized().await?;
        debug!(count = commands.len(), upsert, "bulk update");

        let response = self.store.bulk(&commands).await?;
        scan_bulk_items(&response.items, if upsert { "upsert" } else { "update" })?;
        Ok(bulk_written(documents, &response.items))
    }

    fn validated(&self, doc: &Value, suppress_required: bool) -> Result<(Value, Option<Value>), ModelError> {
        let validation = validate_model(&self.mapping, doc, suppress_required);
        if let Some(message) = validation.errors.first() {
            return Err(ModelError::Invalid {
                message: message.clone(),
            });
        }
        match validation.sanitized {
            Some(clone) => Ok((clone, validation.identity)),
            // unreachable for a passing validation, but no panic
            None => Err(ModelError::Invalid {
                message: "model is not an object or is empty".to_string(),
            }),
        }
    }

    /// Racing first calls may both reach the store; the index and
    /// mapping operations are expected to be idempotent, so the race
    /// is tolerated rather than serialized.
    async fn ensure_initialized(&self) -> Result<(), MapperError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        let exists = self
            .store
            .exists()
            .await
            .map_err(|err| err.with_desc("unable to check index existence"))?;

        if exists {
            self.store
                .put_mapping(&self.raw_mapping)
                .await
                .map_err(|err| err.with_desc("unable to put mapping"))?;
        } else {
            self.store
                .create_index(&self.raw_mapping)
                .await
                .map_err(|err| err.with_desc("unable to create index"))?;
        }

        self.initialized.store(true, Ordering::Release);
        Ok(())
    }
}

/// Shared bulk-write preconditions; violations are reported before
/// any I/O is attempted.
fn check_bulk_lists(id_list: &[String], doc_list: &[Value]) -> Result<(), ParameterError> {
    if doc_list.is_empty() {
        return Err(ParameterError::new(
            "docList",
            "the supplied docList is either not an array or is empty",
        ));
    }
    if !id_list.is_empty() && id_list.len() != doc_list.len() {
        return Err(ParameterError::new(
            "idList",
            "the supplied idList and docList arrays are not of the same length",
        ));
    }
    Ok(())
}

/// Fail the whole batch on the first per-item error, carrying the
/// failing index, backend detail and status code.
fn scan_bulk_items(items: &[BulkItem], operation: &str) -> Result<(), StoreError> {
    for (index, item) in items.iter().enumerate() {
        if let Some(detail) = &item.error {
            warn!(index, detail = %detail, "bulk item failed");
            let mut err = StoreError::new(format!(
                "unable to perform bulk {operation} operation with document {index}"
            ))
            .with_desc(detail.clone());
            if let Some(status) = item.status {
                err = err.with_status(status);
            }
            return Err(err);
        }
    }
    Ok(())
}

fn bulk_written(documents: Vec<Value>, items: &[BulkItem]) -> BulkWritten {
    BulkWritten {
        ids: items.iter().filter_map(|item| item.id.clone()).collect(),
        versions: items.iter().map(|item| item.version).collect(),
        documents,
    }
}

/// A usable identity is a non-empty string or a number.
fn identity_string(identity: Option<&Value>) -> Option<String> {
    match identity {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
