use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::names;

/// Rol de un pool. El orden de las variantes es el orden de actualización.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoolRole {
    #[serde(rename = "master")]
    ControlPlane,
    #[serde(rename = "infra")]
    Infra,
    #[serde(rename = "compute")]
    Compute,
}

impl PoolRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolRole::ControlPlane => "master",
            PoolRole::Infra => "infra",
            PoolRole::Compute => "compute",
        }
    }

    pub fn is_control_plane(&self) -> bool { matches!(self, PoolRole::ControlPlane) }
}

impl fmt::Display for PoolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PoolRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(PoolRole::ControlPlane),
            "infra" => Ok(PoolRole::Infra),
            "compute" => Ok(PoolRole::Compute),
            other => Err(CoreError::UnrecognisedRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

/// Cableado de red de las instancias: subnet y backend pools de load balancer,
/// ambos como resource ids completos.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub subnet_id: String,
    #[serde(default)]
    pub load_balancer_backend_pools: Vec<String>,
}

/// Configuración deseada de un scale group. Inmutable durante una pasada de
/// rollout.
///
/// `count` y `tags` no participan del fingerprint (ver
/// [`crate::hashing::fingerprint`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleGroupDescriptor {
    pub name: String,
    pub role: PoolRole,
    pub count: u32,
    pub vm_size: String,
    pub image: ImageReference,
    pub startup_payload: String,
    pub network: NetworkAttachment,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ScaleGroupDescriptor {
    pub fn scale_set_name(&self) -> String { names::scale_set_name(&self.name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_and_orders() {
        assert_eq!("master".parse::<PoolRole>().unwrap(), PoolRole::ControlPlane);
        assert_eq!("compute".parse::<PoolRole>().unwrap(), PoolRole::Compute);
        assert!(matches!("etcd".parse::<PoolRole>(), Err(CoreError::UnrecognisedRole(r)) if r == "etcd"));
        assert!(PoolRole::ControlPlane < PoolRole::Infra && PoolRole::Infra < PoolRole::Compute);
    }

    #[test]
    fn role_serializes_with_short_names() {
        assert_eq!(serde_json::to_string(&PoolRole::ControlPlane).unwrap(), "\"master\"");
        let r: PoolRole = serde_json::from_str("\"infra\"").unwrap();
        assert_eq!(r, PoolRole::Infra);
    }
}
