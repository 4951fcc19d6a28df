use serde::{Deserialize, Serialize};

/// Instancia viva dentro de un scale set, tal como la reporta el proveedor.
/// Se obtiene bajo demanda; sólo se cachea dentro de una pasada de escalado.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance_id: String,
    /// Nombre de la VM (`ss-<pool>_<id>`), clave del ledger.
    pub name: String,
    pub computer_name: String,
}

impl InstanceRecord {
    /// Nombre del nodo en Kubernetes (el hostname en minúsculas).
    pub fn node_name(&self) -> String { self.computer_name.to_lowercase() }
}
