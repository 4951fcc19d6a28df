//! Drain de nodos antes de sacarlos de servicio.
//!
//! Workers: cordon, desalojo de pods (salvo espejo y DaemonSet), espera
//! acotada a que desaparezcan y borrado del nodo. Control-plane: sólo se
//! borra el objeto nodo. Un nodo que ya no existe cuenta como drenado.

use std::time::Duration;

use log::{debug, info};

use rollout_core::{DesiredState, InstanceRecord, PoolRole};

use crate::context::RolloutContext;
use crate::errors::{Phase, RolloutError, StepContext, StepError};
use crate::ports::{KubeError, PodInfo};

const MIN_EVICTION_WAIT: Duration = Duration::from_secs(30);
const EVICTION_SLACK: Duration = Duration::from_secs(2);

pub struct Drainer<'a> {
    ctx: &'a RolloutContext,
}

impl<'a> Drainer<'a> {
    pub fn new(ctx: &'a RolloutContext) -> Self { Self { ctx } }

    /// Drena la instancia según el rol del pool dueño del scale set.
    pub async fn drain_instance(&self, desired: &DesiredState, scale_set: &str, instance: &InstanceRecord)
                                -> Result<(), StepError> {
        let pool = desired.pool_for_scale_set(scale_set)
                          .ok_or_else(|| StepError::new(Phase::Drain, RolloutError::UnrecognisedRole(scale_set.to_string())))?;
        self.drain(&instance.node_name(), pool.role).await
    }

    pub async fn drain(&self, node: &str, role: PoolRole) -> Result<(), StepError> {
        info!("draining {role} node {node}");
        let drained = match role {
            PoolRole::ControlPlane => self.delete_node(node).await,
            PoolRole::Infra | PoolRole::Compute => self.drain_worker(node).await,
        };
        drained.step(Phase::Drain)
    }

    async fn drain_worker(&self, node: &str) -> Result<(), RolloutError> {
        let kube = &self.ctx.kube;
        let cordon = self.ctx
                         .retry
                         .retry_on_conflict(&format!("cordon {node}"), move || async move {
                             kube.set_unschedulable(node, true).await.map_err(RolloutError::from)
                         })
                         .await;
        match cordon {
            Ok(()) => {}
            Err(RolloutError::Kube(KubeError::NotFound(_))) => {
                debug!("node {node} already gone");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let evictable: Vec<PodInfo> = kube.list_pods_on_node(node).await?.into_iter().filter(PodInfo::is_evictable).collect();
        for pod in &evictable {
            match kube.delete_pod(&pod.namespace, &pod.name).await {
                Ok(()) | Err(KubeError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if !evictable.is_empty() {
            let timeout = self.eviction_timeout(&evictable);
            debug!("waiting up to {timeout:?} for {} pods to leave {node}", evictable.len());
            self.ctx
                .prober
                .poller()
                .until(&format!("eviction from {node}"), timeout, || self.all_gone(&evictable))
                .await?;
        }

        self.delete_node(node).await
    }

    /// `max(30s, 3 × (gracia + 2s))` sobre la mayor gracia de los pods.
    fn eviction_timeout(&self, pods: &[PodInfo]) -> Duration {
        let grace = pods.iter()
                        .map(|p| p.grace_period_seconds.map(Duration::from_secs).unwrap_or(self.ctx.config.drain_grace))
                        .max()
                        .unwrap_or(self.ctx.config.drain_grace);
        MIN_EVICTION_WAIT.max((grace + EVICTION_SLACK) * 3)
    }

    /// Un pod se considera desalojado si ya no existe o si su UID cambió
    /// (lo recreó su controlador en otro nodo).
    async fn all_gone(&self, pods: &[PodInfo]) -> Result<bool, RolloutError> {
        for pod in pods {
            match self.ctx.kube.get_pod(&pod.namespace, &pod.name).await {
                Err(KubeError::NotFound(_)) => {}
                Ok(current) if current.uid != pod.uid => {}
                Ok(_) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }

    async fn delete_node(&self, node: &str) -> Result<(), RolloutError> {
        match self.ctx.kube.delete_node(node).await {
            Ok(()) | Err(KubeError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
