//! Loading mapping definitions and documents from disk.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

/// Load a JSON mapping definition from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file does not exist,
/// `LoadError::Read` on I/O failure, or `LoadError::InvalidJson` if
/// the file is not valid JSON.
pub fn load_mapping(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a mapping definition from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string is not valid JSON.
pub fn load_mapping_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a document from a file path, or from stdin when the path
/// is `-`.
pub fn load_document(path: &str) -> Result<Value, LoadError> {
    if path == "-" {
        use std::io::Read;
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|source| LoadError::Read {
                path: "-".into(),
                source,
            })?;
        return load_mapping_str(&content);
    }
    load_mapping(Path::new(path))
}
