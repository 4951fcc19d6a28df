//! Acceso al ledger persistido.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};

use crate::blob::BlobStore;
use crate::codec;
use crate::error::{BlobError, LedgerError};
use crate::ledger::RolloutLedger;

/// Lectura y escritura del ledger. Last-writer-wins: los llamadores
/// serializan el acceso (un rollout por cluster).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Un blob ausente o corrupto es un error, nunca un ledger vacío.
    async fn read(&self) -> Result<RolloutLedger, LedgerError>;
    async fn write(&self, ledger: &RolloutLedger) -> Result<(), LedgerError>;
    /// Crea el contenedor y escribe un ledger vacío si no existe;
    /// `AlreadyInitialized` si ya había uno.
    async fn initialize(&self) -> Result<(), LedgerError>;
}

/// Ledger guardado en un único blob.
#[derive(Clone)]
pub struct BlobLedger {
    store: Arc<dyn BlobStore>,
    container: String,
    name: String,
}

impl BlobLedger {
    pub fn new(store: Arc<dyn BlobStore>, container: impl Into<String>, name: impl Into<String>) -> Self {
        Self { store, container: container.into(), name: name.into() }
    }

    fn missing(&self) -> LedgerError { LedgerError::Missing { container: self.container.clone(), name: self.name.clone() } }
}

#[async_trait]
impl LedgerStore for BlobLedger {
    async fn read(&self) -> Result<RolloutLedger, LedgerError> {
        let bytes = match self.store.get(&self.container, &self.name).await {
            Ok(b) => b,
            Err(BlobError::NotFound { .. }) | Err(BlobError::ContainerNotFound(_)) => return Err(self.missing()),
            Err(e) => return Err(e.into()),
        };
        let ledger = codec::decode(&bytes)?;
        debug!("read ledger {}/{}: {} instance entries", self.container, self.name, ledger.instance_hashes.len());
        Ok(ledger)
    }

    async fn write(&self, ledger: &RolloutLedger) -> Result<(), LedgerError> {
        let bytes = codec::encode(ledger)?;
        self.store.put(&self.container, &self.name, &bytes).await?;
        Ok(())
    }

    async fn initialize(&self) -> Result<(), LedgerError> {
        self.store.create_container_if_not_exists(&self.container).await?;
        let empty = codec::encode(&RolloutLedger::new())?;
        match self.store.put_if_not_exists(&self.container, &self.name, &empty).await {
            Ok(()) => {
                info!("initialized empty ledger {}/{}", self.container, self.name);
                Ok(())
            }
            Err(BlobError::AlreadyExists { .. }) => Err(LedgerError::AlreadyInitialized),
            Err(e) => Err(e.into()),
        }
    }
}
