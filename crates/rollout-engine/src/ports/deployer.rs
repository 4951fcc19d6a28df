use async_trait::async_trait;
use serde_json::Value;

use super::compute::ProviderError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOutput {
    /// Dirección (`ip:puerto`) por la que se alcanza la API del cluster. Puede
    /// diferir del hostname público (endpoint privado).
    pub endpoint: Option<String>,
}

/// API de despliegue del proveedor: recibe el documento compilado y lo aplica
/// en el resource group indicado.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, resource_group: &str, document: &Value) -> Result<DeployOutput, ProviderError>;
}
