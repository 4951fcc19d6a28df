//! Puntos de entrada: `deploy`, `update` y `etcd_restore`.
//!
//! Construcción típica:
//!
//! ```ignore
//! let orchestrator = Orchestrator::builder(compute, deployer, kube, blobs)
//!     .config(OrchestratorConfig::from_env())
//!     .health(Arc::new(HttpsHealthCheck::default()))
//!     .build();
//! orchestrator.update(&desired).await?;
//! ```
//!
//! Todo error que sale de aquí es un [`StepError`] con la fase que falló.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::info;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use rollout_core::{fingerprint, DesiredState, OrchestratorConfig, PoolRole, RenderOptions};
use rollout_ledger::{BackupCatalog, BlobInfo, BlobLedger, BlobStore, ConfigSnapshot, LedgerError, LedgerStore};

use crate::admin::AdminActions;
use crate::apply::{compile_document, deploy_document, wait_healthy, wait_infra_services};
use crate::context::RolloutContext;
use crate::controller::{list_instances, wait_instance_ready, ControlPlaneRollout, PoolReport, WorkerReplacer,
                        WorkerScaler};
use crate::errors::{Phase, StepContext, StepError};
use crate::health::{HealthCheck, HttpsHealthCheck};
use crate::ports::{ComputeClient, Deployer, KubeClient};
use crate::recovery::{EtcdRecovery, RestoreReport};

/// Resultado de `deploy`/`update`, pools en orden de actualización.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RolloutReport {
    pub pools: Vec<PoolReport>,
    /// Entradas del ledger de instancias que ya no existen.
    pub pruned: Vec<String>,
}

impl RolloutReport {
    pub fn pool(&self, name: &str) -> Option<&PoolReport> { self.pools.iter().find(|p| p.pool == name) }
}

pub struct OrchestratorBuilder {
    compute: Arc<dyn ComputeClient>,
    deployer: Arc<dyn Deployer>,
    kube: Arc<dyn KubeClient>,
    blobs: Arc<dyn BlobStore>,
    health: Option<Arc<dyn HealthCheck>>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn health(mut self, health: Arc<dyn HealthCheck>) -> Self {
        self.health = Some(health);
        self
    }

    /// Token del llamador; cancelarlo corta cualquier espera en curso.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Orchestrator {
        let config = Arc::new(self.config);
        let ledger: Arc<dyn LedgerStore> =
            Arc::new(BlobLedger::new(self.blobs.clone(), config.ledger_container.clone(), config.ledger_blob.clone()));
        let snapshot = ConfigSnapshot::new(self.blobs.clone(), config.config_container.clone(), config.config_blob.clone());
        let backups = BackupCatalog::new(self.blobs, config.backup_container.clone());
        let health = self.health.unwrap_or_else(|| Arc::new(HttpsHealthCheck::default()) as Arc<dyn HealthCheck>);
        let ctx = RolloutContext::new(self.compute, self.kube, health, ledger, config, self.cancel);
        Orchestrator { ctx, deployer: self.deployer, snapshot, backups }
    }
}

pub struct Orchestrator {
    ctx: RolloutContext,
    deployer: Arc<dyn Deployer>,
    snapshot: ConfigSnapshot,
    backups: BackupCatalog,
}

impl Orchestrator {
    pub fn builder(compute: Arc<dyn ComputeClient>, deployer: Arc<dyn Deployer>, kube: Arc<dyn KubeClient>,
                   blobs: Arc<dyn BlobStore>)
                   -> OrchestratorBuilder {
        OrchestratorBuilder { compute,
                              deployer,
                              kube,
                              blobs,
                              health: None,
                              config: OrchestratorConfig::default(),
                              cancel: CancellationToken::new() }
    }

    pub fn context(&self) -> &RolloutContext { &self.ctx }

    pub fn cancellation_token(&self) -> CancellationToken { self.ctx.cancel.clone() }

    pub fn admin(&self) -> AdminActions<'_> { AdminActions::new(&self.ctx) }

    /// Puesta en marcha inicial del cluster.
    pub async fn deploy(&self, desired: &DesiredState) -> Result<RolloutReport, StepError> {
        desired.validate().step(Phase::Validate)?;
        let document = compile_document(desired, &RenderOptions::default())?;
        let endpoint = deploy_document(self.deployer.as_ref(), desired, &document).await?;

        match self.ctx.ledger.initialize().await {
            Ok(()) => {}
            Err(LedgerError::AlreadyInitialized) => info!("ledger already initialized, keeping recorded progress"),
            Err(e) => return Err(StepError::new(Phase::InitializeLedger, e)),
        }
        self.snapshot.write(desired).await.step(Phase::WriteConfig)?;
        wait_healthy(&self.ctx, &endpoint).await?;

        let mut ledger = self.ctx.read_ledger().await?;
        let mut report = RolloutReport::default();
        for pool in desired.pools_in_update_order() {
            let scale_set = pool.scale_set_name();
            let fp = fingerprint(pool);
            let mut pool_report = PoolReport::new(&pool.name, &scale_set);
            for instance in list_instances(&self.ctx, &scale_set).await? {
                wait_instance_ready(&self.ctx, pool.role, &instance).await?;
                ledger.record_instance(instance.name.clone(), fp);
                pool_report.added.push(instance.name);
            }
            ledger.record_scale_set(scale_set, fp);
            self.ctx.write_ledger(&ledger).await?;
            info!("{} pool {} ready with {} instance(s)", pool.role, pool.name, pool_report.added.len());
            report.pools.push(pool_report);
        }
        Ok(report)
    }

    /// Rolling update: control-plane, luego infra, luego compute.
    pub async fn update(&self, desired: &DesiredState) -> Result<RolloutReport, StepError> {
        desired.validate().step(Phase::Validate)?;
        let pools = desired.pools_in_update_order();
        let mut reports: BTreeMap<String, PoolReport> =
            pools.iter().map(|p| (p.name.clone(), PoolReport::new(&p.name, &p.scale_set_name()))).collect();
        let mut ledger = self.ctx.read_ledger().await?;

        // Sobrantes fuera antes del deploy para que el proveedor no borre
        // nodos sin drenar al bajar la capacidad.
        let mut seen_before = BTreeSet::new();
        for pool in &pools {
            let mut scaler = WorkerScaler::new(&self.ctx, desired, pool);
            if pool.role != PoolRole::ControlPlane {
                if let Some(report) = reports.get_mut(&pool.name) {
                    scaler.scale_down_excess(&mut ledger, report).await?;
                }
            }
            seen_before.extend(scaler.instances().await?.iter().map(|i| i.name.clone()));
        }

        let document = compile_document(desired, &RenderOptions::default())?;
        let endpoint = deploy_document(self.deployer.as_ref(), desired, &document).await?;
        self.snapshot.write(desired).await.step(Phase::WriteConfig)?;
        wait_healthy(&self.ctx, &endpoint).await?;

        // Instancias creadas por el deploy: nacen con el modelo actual.
        let mut live = BTreeSet::new();
        for pool in &pools {
            let fp = fingerprint(pool);
            for instance in list_instances(&self.ctx, &pool.scale_set_name()).await? {
                live.insert(instance.name.clone());
                if seen_before.contains(&instance.name) {
                    continue;
                }
                wait_instance_ready(&self.ctx, pool.role, &instance).await?;
                ledger.record_instance(instance.name.clone(), fp);
                self.ctx.write_ledger(&ledger).await?;
                if let Some(report) = reports.get_mut(&pool.name) {
                    report.added.push(instance.name);
                }
            }
        }
        let pruned = ledger.retain_instances(|name| live.contains(name));
        if !pruned.is_empty() {
            info!("pruned {} ledger entries of vanished instances", pruned.len());
            self.ctx.write_ledger(&ledger).await?;
        }

        let mut infra_ready = false;
        for pool in &pools {
            if pool.role == PoolRole::Compute && !infra_ready {
                wait_infra_services(&self.ctx).await?;
                infra_ready = true;
            }
            let pass = match pool.role {
                PoolRole::ControlPlane => ControlPlaneRollout::new(&self.ctx, pool).run().await?,
                PoolRole::Infra | PoolRole::Compute => WorkerReplacer::new(&self.ctx, desired, pool).run().await?,
            };
            if let Some(report) = reports.get_mut(&pool.name) {
                report.updated.extend(pass.updated);
                report.added.extend(pass.added);
                report.removed.extend(pass.removed);
            }
        }
        if !infra_ready {
            wait_infra_services(&self.ctx).await?;
        }

        let pools: Vec<PoolReport> = pools.iter().filter_map(|p| reports.remove(&p.name)).collect();
        Ok(RolloutReport { pools, pruned })
    }

    /// Restaura etcd desde `backup`. Destructivo: nunca forma parte de un
    /// rollout normal.
    pub async fn etcd_restore(&self, desired: &DesiredState, backup: &str) -> Result<RestoreReport, StepError> {
        desired.validate().step(Phase::Validate)?;
        EtcdRecovery::new(&self.ctx, self.deployer.as_ref(), &self.backups).run(desired, backup).await
    }

    /// Backups disponibles, del más reciente al más antiguo.
    pub async fn list_backups(&self) -> Result<Vec<BlobInfo>, StepError> {
        self.backups.list().await.step(Phase::ListBackups)
    }

    /// Último estado deseado aplicado.
    pub async fn applied_state(&self) -> Result<Option<DesiredState>, StepError> {
        self.snapshot.read().await.step(Phase::ReadConfig)
    }
}
