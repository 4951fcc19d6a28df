//! Recuperación de etcd desde un backup.
//!
//! Transición destructiva y explícita: borra el scale set del control-plane,
//! lo vuelve a desplegar arrancando desde el backup y olvida en el ledger sólo
//! las entradas del control-plane. Las de workers quedan intactas.

use log::{info, warn};
use serde::Serialize;

use rollout_core::{DesiredState, RenderOptions};
use rollout_ledger::BackupCatalog;

use crate::apply::{compile_document, deploy_document, wait_healthy};
use crate::context::RolloutContext;
use crate::controller::{list_instances, wait_instance_ready};
use crate::errors::{Phase, RolloutError, StepContext, StepError};
use crate::ports::{Deployer, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub backup: String,
    pub scale_set: String,
    /// Entradas de instancias borradas del ledger.
    pub cleared: usize,
    /// Instancias del control-plane listas tras la restauración.
    pub instances: Vec<String>,
}

pub struct EtcdRecovery<'a> {
    ctx: &'a RolloutContext,
    deployer: &'a dyn Deployer,
    backups: &'a BackupCatalog,
}

impl<'a> EtcdRecovery<'a> {
    pub fn new(ctx: &'a RolloutContext, deployer: &'a dyn Deployer, backups: &'a BackupCatalog) -> Self {
        Self { ctx, deployer, backups }
    }

    pub async fn run(&self, desired: &DesiredState, backup: &str) -> Result<RestoreReport, StepError> {
        if !self.backups.exists(backup).await.step(Phase::ListBackups)? {
            return Err(StepError::new(Phase::ListBackups, RolloutError::BackupNotFound(backup.to_string())));
        }
        let control_plane = desired.control_plane().step(Phase::Validate)?;
        let scale_set = control_plane.scale_set_name();

        // se compila antes de borrar nada
        let document = compile_document(desired, &RenderOptions { restore_backup: Some(backup) })?;

        warn!("restoring etcd from {backup}: deleting control-plane scale set {scale_set}");
        match self.ctx.compute.begin_delete_scale_set(&scale_set).await {
            Ok(handle) => self.ctx.await_operation(Phase::DeleteScaleSet, &handle).await?,
            Err(ProviderError::NotFound(_)) => info!("{scale_set} already absent"),
            Err(e) => return Err(StepError::new(Phase::DeleteScaleSet, e)),
        }

        let endpoint = deploy_document(self.deployer, desired, &document).await?;

        let mut ledger = self.ctx.read_ledger().await?;
        let cleared = ledger.clear_scale_set_instances(&scale_set);
        ledger.remove_scale_set(&scale_set);
        self.ctx.write_ledger(&ledger).await?;
        info!("cleared {cleared} control-plane ledger entries");

        wait_healthy(self.ctx, &endpoint).await?;
        let instances = list_instances(self.ctx, &scale_set).await?;
        for instance in &instances {
            wait_instance_ready(self.ctx, control_plane.role, instance).await?;
        }
        info!("control plane restored from {backup}: {} instance(s) ready", instances.len());
        Ok(RestoreReport { backup: backup.to_string(),
                           scale_set,
                           cleared,
                           instances: instances.into_iter().map(|i| i.name).collect() })
    }
}
