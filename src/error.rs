//! Error types for mapping analysis, validation and store operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while analyzing a mapping definition.
///
/// These are construction-time failures: the mapping is unusable and
/// no `Mapping` is produced.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mapping is not an object or is missing properties")]
    NotAnObject,

    #[error("field {path} missing type")]
    MissingType { path: String },

    #[error("field {path} type is invalid: {type_name}")]
    UnknownType { path: String, type_name: String },

    #[error("field {path} dynamic policy is invalid: {value}")]
    UnknownDynamicPolicy { path: String, value: String },
}

/// Errors for documents that fail structural or type validation.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Carries the first validation error message.
    #[error("{message}")]
    Invalid { message: String },

    #[error("unable to parse JSON: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

/// A caller-supplied argument violated a precondition.
///
/// Detected before any I/O is attempted.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParameterError {
    /// Name of the offending parameter.
    pub parameter: String,
    pub message: String,
}

impl ParameterError {
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

/// A failure reported by the document store, passed through with
/// added context for diagnosis.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    /// Backend status code, when the store reported one.
    pub status: Option<u16>,
    /// Human-readable description of the failing operation.
    pub desc: Option<String>,
    /// Document id involved, when applicable.
    pub id: Option<String>,
    /// Index involved, when applicable.
    pub index: Option<String>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            desc: None,
            id: None,
            index: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// A point-lookup miss is an expected outcome, not an error.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Umbrella error for mapper operations.
#[derive(Debug, Error)]
pub enum MapperError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors while loading a mapping or document file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl MappingError {
    /// Exit code for the CLI: mapping problems are schema errors.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl ModelError {
    /// Exit code for the CLI: validation failure is 1, parse is 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            ModelError::Invalid { .. } => 1,
            ModelError::Parse { .. } => 2,
        }
    }
}

impl LoadError {
    /// Exit code for the CLI: IO is 3, bad JSON is 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::Read { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_error_messages() {
        let err = MappingError::MissingType {
            path: "pet.name".into(),
        };
        assert_eq!(err.to_string(), "field pet.name missing type");

        let err = MappingError::UnknownType {
            path: "pet.tag".into(),
            type_name: "uuid".into(),
        };
        assert_eq!(err.to_string(), "field pet.tag type is invalid: uuid");
    }

    #[test]
    fn parameter_error_carries_name() {
        let err = ParameterError::new("idList", "the supplied idList is not an array");
        assert_eq!(err.parameter, "idList");
        assert_eq!(err.to_string(), "the supplied idList is not an array");
    }

    #[test]
    fn store_error_context() {
        let err = StoreError::new("conflict")
            .with_status(409)
            .with_desc("unable to index new document")
            .with_id("abc")
            .with_index("cats");
        assert_eq!(err.status, Some(409));
        assert_eq!(err.id.as_deref(), Some("abc"));
        assert_eq!(err.index.as_deref(), Some("cats"));
        assert!(!err.is_not_found());
        assert!(StoreError::new("missing").with_status(404).is_not_found());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(MappingError::NotAnObject.exit_code(), 2);
        assert_eq!(
            ModelError::Invalid {
                message: "field name is required".into()
            }
            .exit_code(),
            1
        );
        assert_eq!(
            LoadError::FileNotFound {
                path: PathBuf::from("m.json")
            }
            .exit_code(),
            3
        );
    }
}
