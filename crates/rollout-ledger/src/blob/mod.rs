//! Object store de blobs: contenedores planos con blobs por nombre.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BlobError;

pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub name: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Semántica mínima del object store. `put` es last-writer-wins;
/// `put_if_not_exists` falla con `AlreadyExists` si el blob ya está.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<(), BlobError>;
    async fn get(&self, container: &str, name: &str) -> Result<Vec<u8>, BlobError>;
    async fn put(&self, container: &str, name: &str, data: &[u8]) -> Result<(), BlobError>;
    async fn put_if_not_exists(&self, container: &str, name: &str, data: &[u8]) -> Result<(), BlobError>;
    /// Blobs del contenedor ordenados por nombre.
    async fn list(&self, container: &str) -> Result<Vec<BlobInfo>, BlobError>;
    async fn delete(&self, container: &str, name: &str) -> Result<(), BlobError>;
}

/// Nombres planos: sin separadores, sin `..`, sin prefijo `.`.
pub(crate) fn validate_name(name: &str) -> Result<(), BlobError> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) || name.contains("..") {
        return Err(BlobError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_name;

    #[test]
    fn rejects_path_like_names() {
        assert!(validate_name("update").is_ok());
        assert!(validate_name("backup-2024-01-01T00-00-00").is_ok());
        for bad in ["", ".hidden", "a/b", "..", "a\\b"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
