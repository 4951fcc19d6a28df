use std::sync::Arc;

use crate::blob::{BlobInfo, BlobStore};
use crate::error::BlobError;

/// Backups de etcd disponibles en el contenedor de backups.
#[derive(Clone)]
pub struct BackupCatalog {
    store: Arc<dyn BlobStore>,
    container: String,
}

impl BackupCatalog {
    pub fn new(store: Arc<dyn BlobStore>, container: impl Into<String>) -> Self {
        Self { store, container: container.into() }
    }

    /// Backups del más reciente al más antiguo. Sin contenedor no hay
    /// backups.
    pub async fn list(&self) -> Result<Vec<BlobInfo>, BlobError> {
        let mut backups = match self.store.list(&self.container).await {
            Ok(b) => b,
            Err(BlobError::ContainerNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        backups.sort_by(|a, b| b.last_modified.cmp(&a.last_modified).then_with(|| a.name.cmp(&b.name)));
        Ok(backups)
    }

    pub async fn exists(&self, backup: &str) -> Result<bool, BlobError> {
        Ok(self.list().await?.iter().any(|b| b.name == backup))
    }
}
