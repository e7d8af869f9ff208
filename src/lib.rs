//! docmap
//!
//! Schema-driven document mapping: compile a type mapping, validate
//! and sanitize documents against it, coerce stored values back into
//! canonical form, and orchestrate single and bulk operations against
//! a pluggable document store.
//!
//! # Example
//!
//! ```
//! use docmap::{validate_model, Mapping};
//! use serde_json::json;
//!
//! let mapping = Mapping::analyze(&json!({
//!     "properties": {
//!         "name": { "type": "string", "required": true },
//!         "age": { "type": "byte" }
//!     }
//! })).unwrap();
//!
//! let validation = validate_model(&mapping, &json!({ "name": "Hamish", "age": 7 }), false);
//! assert!(validation.is_valid());
//!
//! let validation = validate_model(&mapping, &json!({ "age": 900 }), false);
//! assert_eq!(validation.errors, vec![
//!     "age contains an invalid value (900) for type byte".to_string(),
//!     "field name is required".to_string(),
//! ]);
//! ```
//!
//! # Mapping Format
//!
//! A mapping is a JSON object with a `properties` map. Each entry is
//! either a leaf field (`{ "type": "...", "required": true }`) or a
//! sub-document with its own `properties`. Containers may carry a
//! `dynamic` policy (`true`, `false`, or `"strict"`) controlling how
//! unregistered fields are treated, and an `_id.path` entry names the
//! field whose value identifies the document.

mod analyzer;
mod coercer;
mod error;
mod loader;
mod mapper;
mod matrix;
mod store;
mod types;
mod validator;

pub use analyzer::Mapping;
pub use coercer::coerce_model;
pub use error::{LoadError, MapperError, MappingError, ModelError, ParameterError, StoreError};
pub use loader::{load_document, load_mapping, load_mapping_str};
pub use mapper::{BulkWritten, Found, Mapper, SearchSummary, Written};
pub use store::{
    BulkCommand, BulkItem, BulkResponse, DeleteSummary, DocumentStore, MultiGetDoc,
    MultiGetResponse, SearchHit, SearchResponse, WriteReceipt,
};
pub use types::{DynamicPolicy, FieldSpec, FieldType, ROOT_PATH};
pub use validator::{validate_model, Validation};
