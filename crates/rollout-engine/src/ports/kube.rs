use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KubeError {
    #[error("not found: {0}")] NotFound(String),
    #[error("conflict: {0}")] Conflict(String),
    #[error("already exists: {0}")] AlreadyExists(String),
    #[error("api error: {0}")] Api(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub name: String,
    /// Condición `Ready` del nodo.
    pub ready: bool,
    pub unschedulable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInfo {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub node_name: String,
    pub ready: bool,
    /// Pod estático reflejado por el kubelet; no se puede desalojar.
    pub mirror: bool,
    /// Kind del controlador dueño (`DaemonSet`, `ReplicaSet`, ...).
    pub owner_kind: Option<String>,
    pub grace_period_seconds: Option<u64>,
}

impl PodInfo {
    /// Los pods espejo y los de DaemonSet se quedan en el nodo durante el drain.
    pub fn is_evictable(&self) -> bool { !self.mirror && self.owner_kind.as_deref() != Some("DaemonSet") }
}

#[async_trait]
pub trait KubeClient: Send + Sync {
    async fn get_node(&self, name: &str) -> Result<NodeStatus, KubeError>;
    /// Puede devolver `Conflict` si el nodo cambió entre lectura y escritura.
    async fn set_unschedulable(&self, name: &str, unschedulable: bool) -> Result<(), KubeError>;
    async fn delete_node(&self, name: &str) -> Result<(), KubeError>;
    async fn list_pods_on_node(&self, node: &str) -> Result<Vec<PodInfo>, KubeError>;
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo, KubeError>;
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), KubeError>;
}
