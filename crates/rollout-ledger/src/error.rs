//! Errores de almacenamiento.
//! `BlobError` cubre el object store; `LedgerError` agrega la semántica del
//! ledger (ausente, corrupto, ya inicializado).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("blob not found: {container}/{name}")]
    NotFound { container: String, name: String },
    #[error("blob already exists: {container}/{name}")]
    AlreadyExists { container: String, name: String },
    #[error("invalid blob or container name: {0:?}")]
    InvalidName(String),
    #[error("transient IO error: {0}")]
    Io(String),
}

impl BlobError {
    pub fn is_retryable(&self) -> bool { matches!(self, BlobError::Io(_) | BlobError::AlreadyExists { .. }) }
}

impl From<std::io::Error> for BlobError {
    fn from(err: std::io::Error) -> Self { BlobError::Io(err.to_string()) }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// El ledger no existe: el cluster nunca se inicializó o el blob se borró.
    #[error("ledger blob {container}/{name} is missing")]
    Missing { container: String, name: String },
    #[error("ledger blob is corrupt: {0}")]
    Corrupt(String),
    #[error("ledger already initialized")]
    AlreadyInitialized,
    #[error("ledger encode: {0}")]
    Encode(String),
    #[error(transparent)]
    Storage(#[from] BlobError),
}

impl LedgerError {
    /// Ledger ausente o corrupto es fatal para el paso que lo leyó.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Storage(e) => e.is_retryable(),
            LedgerError::AlreadyInitialized => true,
            LedgerError::Missing { .. } | LedgerError::Corrupt(_) | LedgerError::Encode(_) => false,
        }
    }
}
