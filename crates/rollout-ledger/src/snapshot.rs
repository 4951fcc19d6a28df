use std::sync::Arc;

use rollout_core::DesiredState;

use crate::blob::BlobStore;
use crate::error::{BlobError, LedgerError};

/// Copia del último estado deseado aplicado, en el blob `config/config`.
#[derive(Clone)]
pub struct ConfigSnapshot {
    store: Arc<dyn BlobStore>,
    container: String,
    name: String,
}

impl ConfigSnapshot {
    pub fn new(store: Arc<dyn BlobStore>, container: impl Into<String>, name: impl Into<String>) -> Self {
        Self { store, container: container.into(), name: name.into() }
    }

    pub async fn write(&self, desired: &DesiredState) -> Result<(), LedgerError> {
        self.store.create_container_if_not_exists(&self.container).await?;
        let bytes = serde_json::to_vec_pretty(desired).map_err(|e| LedgerError::Encode(e.to_string()))?;
        self.store.put(&self.container, &self.name, &bytes).await?;
        Ok(())
    }

    /// `None` si todavía no se escribió nunca.
    pub async fn read(&self) -> Result<Option<DesiredState>, LedgerError> {
        match self.store.get(&self.container, &self.name).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| LedgerError::Corrupt(e.to_string())),
            Err(BlobError::NotFound { .. }) | Err(BlobError::ContainerNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
