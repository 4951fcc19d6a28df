//! Controladores de rollout por pool.
//!
//! - `control_plane`: reemplazo en sitio, una instancia por vez.
//! - `worker`: reemplazo grow-then-shrink y reconciliación de capacidad.
pub mod control_plane;
pub mod worker;

pub use control_plane::{ControlPlaneRollout, MasterState};
pub use worker::{WorkerReplacer, WorkerScaler};

use serde::Serialize;

use rollout_core::{InstanceRecord, PoolRole};

use crate::context::RolloutContext;
use crate::errors::{Phase, StepContext, StepError};
use crate::ports::ProviderError;
use crate::prober::ReadyTarget;

/// Resultado de una pasada sobre un pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    pub pool: String,
    pub scale_set: String,
    /// Instancias que pasaron al fingerprint deseado.
    pub updated: Vec<String>,
    /// Instancias nuevas registradas (escalado o reemplazo).
    pub added: Vec<String>,
    /// Instancias drenadas y borradas.
    pub removed: Vec<String>,
}

impl PoolReport {
    pub fn new(pool: &str, scale_set: &str) -> Self {
        Self { pool: pool.to_string(), scale_set: scale_set.to_string(), ..Self::default() }
    }

    pub fn is_noop(&self) -> bool { self.updated.is_empty() && self.added.is_empty() && self.removed.is_empty() }
}

/// Instancias vivas del scale set ordenadas por hostname. Un scale set que
/// todavía no existe no tiene instancias.
pub async fn list_instances(ctx: &RolloutContext, scale_set: &str) -> Result<Vec<InstanceRecord>, StepError> {
    let mut instances = match ctx.compute.list_instances(scale_set).await {
        Ok(instances) => instances,
        Err(ProviderError::NotFound(_)) => Vec::new(),
        Err(e) => return Err(StepError::new(Phase::ListInstances, e)),
    };
    instances.sort_by(|a, b| a.computer_name.cmp(&b.computer_name));
    Ok(instances)
}

/// Espera a que la instancia esté lista según su rol: nodo `Ready` para
/// workers; nodo y pods estáticos para el control-plane.
pub async fn wait_instance_ready(ctx: &RolloutContext, role: PoolRole, instance: &InstanceRecord)
                                 -> Result<(), StepError> {
    let node = instance.node_name();
    let target = match role {
        PoolRole::ControlPlane => ReadyTarget::ControlPlane(&node),
        PoolRole::Infra | PoolRole::Compute => ReadyTarget::Node(&node),
    };
    ctx.prober.wait(target).await.step(Phase::WaitReady)
}
