use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use super::{validate_name, BlobInfo, BlobStore};
use crate::error::BlobError;

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// Backend en memoria, usado en tests y en la demo. Cuenta las escrituras
/// para poder verificar que el ledger se persiste una vez por transición.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    containers: DashSet<String>,
    blobs: DashMap<(String, String), StoredBlob>,
    writes: AtomicU64,
}

impl InMemoryBlobStore {
    pub fn new() -> Self { Self::default() }

    /// Escrituras exitosas (`put` y `put_if_not_exists`) desde la creación.
    pub fn write_count(&self) -> u64 { self.writes.load(Ordering::SeqCst) }

    fn ensure_container(&self, container: &str) -> Result<(), BlobError> {
        if self.containers.contains(container) {
            Ok(())
        } else {
            Err(BlobError::ContainerNotFound(container.to_string()))
        }
    }

    fn key(container: &str, name: &str) -> (String, String) { (container.to_string(), name.to_string()) }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<(), BlobError> {
        validate_name(container)?;
        self.containers.insert(container.to_string());
        Ok(())
    }

    async fn get(&self, container: &str, name: &str) -> Result<Vec<u8>, BlobError> {
        self.ensure_container(container)?;
        self.blobs
            .get(&Self::key(container, name))
            .map(|b| b.data.clone())
            .ok_or_else(|| BlobError::NotFound { container: container.to_string(), name: name.to_string() })
    }

    async fn put(&self, container: &str, name: &str, data: &[u8]) -> Result<(), BlobError> {
        self.ensure_container(container)?;
        validate_name(name)?;
        self.blobs.insert(Self::key(container, name), StoredBlob { data: data.to_vec(), last_modified: Utc::now() });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn put_if_not_exists(&self, container: &str, name: &str, data: &[u8]) -> Result<(), BlobError> {
        self.ensure_container(container)?;
        validate_name(name)?;
        match self.blobs.entry(Self::key(container, name)) {
            Entry::Occupied(_) => Err(BlobError::AlreadyExists { container: container.to_string(), name: name.to_string() }),
            Entry::Vacant(slot) => {
                slot.insert(StoredBlob { data: data.to_vec(), last_modified: Utc::now() });
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn list(&self, container: &str) -> Result<Vec<BlobInfo>, BlobError> {
        self.ensure_container(container)?;
        let mut out: Vec<BlobInfo> = self.blobs
                                         .iter()
                                         .filter(|e| e.key().0 == container)
                                         .map(|e| BlobInfo { name: e.key().1.clone(),
                                                             size: e.value().data.len() as u64,
                                                             last_modified: e.value().last_modified })
                                         .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn delete(&self, container: &str, name: &str) -> Result<(), BlobError> {
        self.ensure_container(container)?;
        self.blobs
            .remove(&Self::key(container, name))
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound { container: container.to_string(), name: name.to_string() })
    }
}
