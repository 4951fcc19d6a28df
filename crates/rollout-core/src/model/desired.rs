use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::graph::ProviderContext;
use crate::names;

use super::pool::{PoolRole, ScaleGroupDescriptor};
use super::resource::ResourceDeclaration;

/// Estado deseado de un cluster: contexto del proveedor, pools y el resto de
/// recursos de infraestructura (red, balanceadores, storage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    /// Hostname público de la API; es el server name TLS del health check.
    pub public_hostname: String,
    /// CA (PEM) con la que se valida el certificado de la API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
    pub pools: Vec<ScaleGroupDescriptor>,
    #[serde(default)]
    pub resources: Vec<ResourceDeclaration>,
}

impl DesiredState {
    pub fn provider_context(&self) -> ProviderContext {
        ProviderContext::new(&self.subscription_id, &self.resource_group)
    }

    /// Reglas mínimas: exactamente un pool de control-plane con al menos una
    /// instancia, nombres de pool únicos y hostname público definido.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.public_hostname.is_empty() {
            return Err(CoreError::InvalidDesiredState("public hostname is empty".into()));
        }
        let mut seen = BTreeSet::new();
        for pool in &self.pools {
            if pool.name.is_empty() {
                return Err(CoreError::InvalidDesiredState("pool with empty name".into()));
            }
            if !seen.insert(pool.name.as_str()) {
                return Err(CoreError::InvalidDesiredState(format!("duplicate pool {}", pool.name)));
            }
        }
        let masters: Vec<_> = self.pools.iter().filter(|p| p.role.is_control_plane()).collect();
        match masters.as_slice() {
            [m] if m.count > 0 => Ok(()),
            [m] => Err(CoreError::InvalidDesiredState(format!("control-plane pool {} has no instances", m.name))),
            [] => Err(CoreError::InvalidDesiredState("no control-plane pool".into())),
            _ => Err(CoreError::InvalidDesiredState("more than one control-plane pool".into())),
        }
    }

    pub fn pool(&self, name: &str) -> Result<&ScaleGroupDescriptor, CoreError> {
        self.pools.iter().find(|p| p.name == name).ok_or_else(|| CoreError::UnknownPool(name.to_string()))
    }

    pub fn control_plane(&self) -> Result<&ScaleGroupDescriptor, CoreError> {
        self.pools
            .iter()
            .find(|p| p.role.is_control_plane())
            .ok_or_else(|| CoreError::InvalidDesiredState("no control-plane pool".into()))
    }

    /// Pool dueño de un scale set, si lo hay.
    pub fn pool_for_scale_set(&self, scale_set: &str) -> Option<&ScaleGroupDescriptor> {
        let pool = names::pool_from_scale_set(scale_set)?;
        self.pools.iter().find(|p| p.name == pool)
    }

    /// Pools de un rol ordenados por nombre.
    pub fn pools_for_role(&self, role: PoolRole) -> Vec<&ScaleGroupDescriptor> {
        let mut pools: Vec<_> = self.pools.iter().filter(|p| p.role == role).collect();
        pools.sort_by(|a, b| a.name.cmp(&b.name));
        pools
    }

    /// Orden de actualización: control-plane, infra, compute; por nombre dentro
    /// de cada rol.
    pub fn pools_in_update_order(&self) -> Vec<&ScaleGroupDescriptor> {
        [PoolRole::ControlPlane, PoolRole::Infra, PoolRole::Compute].into_iter()
                                                                     .flat_map(|r| self.pools_for_role(r))
                                                                     .collect()
    }
}
