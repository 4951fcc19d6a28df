use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rollout_core::InstanceRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("not found: {0}")] NotFound(String),
    #[error("conflict: {0}")] Conflict(String),
    /// Fallo interno del proveedor al aplicar un cambio de capacidad; suele
    /// resolverse reintentando.
    #[error("internal execution error: {0}")] InternalExecution(String),
    #[error("throttled: {0}")] Throttled(String),
    #[error("request failed: {0}")] Request(String),
}

/// Handle de una operación larga del proveedor; se sondea con
/// [`ComputeClient::operation_status`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle {
    pub id: String,
    /// Descripción corta para logs, p.ej. `deallocate ss-master/0`.
    pub description: String,
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} ({})", self.description, self.id) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleSetInfo {
    pub name: String,
    pub capacity: u32,
    pub vm_size: String,
}

/// API de cómputo. Toda mutación es asíncrona del lado del proveedor y
/// devuelve un handle; el orquestador espera cada una antes de emitir la
/// siguiente.
#[async_trait]
pub trait ComputeClient: Send + Sync {
    async fn list_scale_sets(&self) -> Result<Vec<ScaleSetInfo>, ProviderError>;
    async fn list_instances(&self, scale_set: &str) -> Result<Vec<InstanceRecord>, ProviderError>;

    async fn begin_set_capacity(&self, scale_set: &str, capacity: u32) -> Result<OperationHandle, ProviderError>;
    async fn begin_deallocate(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError>;
    /// Aplica el modelo actual del scale set a la instancia.
    async fn begin_update_instance(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError>;
    async fn begin_reimage(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError>;
    async fn begin_start(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError>;
    async fn begin_delete_instance(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError>;
    async fn begin_delete_scale_set(&self, scale_set: &str) -> Result<OperationHandle, ProviderError>;
    async fn begin_run_command(&self, scale_set: &str, instance_id: &str, script: &str)
                               -> Result<OperationHandle, ProviderError>;

    async fn operation_status(&self, handle: &OperationHandle) -> Result<OperationStatus, ProviderError>;
}
