//! rollout-ledger
//!
//! Persistencia del progreso de rollout sobre un object store de blobs.
//!
//! Módulos:
//! - `blob`: trait `BlobStore` con backends en memoria y sobre filesystem.
//! - `ledger`: modelo en memoria del ledger (instancia/scale set → fingerprint).
//! - `codec`: formato JSON persistido (arrays de pares ordenados).
//! - `store`: `LedgerStore` y su implementación sobre un blob.
//! - `snapshot`: copia del estado deseado aplicado (blob `config`).
//! - `backups`: catálogo de backups de etcd.

pub mod backups;
pub mod blob;
pub mod codec;
pub mod error;
pub mod ledger;
pub mod snapshot;
pub mod store;

pub use backups::BackupCatalog;
pub use blob::{BlobInfo, BlobStore, FsBlobStore, InMemoryBlobStore};
pub use error::{BlobError, LedgerError};
pub use ledger::RolloutLedger;
pub use snapshot::ConfigSnapshot;
pub use store::{BlobLedger, LedgerStore};
