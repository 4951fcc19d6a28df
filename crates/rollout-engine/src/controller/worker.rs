//! Pools de workers (infra y compute).
//!
//! [`WorkerReplacer`] reemplaza instancias desactualizadas creciendo primero
//! y encogiendo después: la capacidad viva nunca baja de la que había al
//! empezar. [`WorkerScaler`] sólo reconcilia la cantidad de instancias con la
//! declarada, sin lógica de upgrade.

use std::collections::BTreeSet;

use log::{info, warn};

use rollout_core::{fingerprint, DesiredState, Fingerprint, InstanceRecord, ScaleGroupDescriptor};
use rollout_ledger::RolloutLedger;

use crate::context::RolloutContext;
use crate::drain::Drainer;
use crate::errors::{Phase, RolloutError, StepContext, StepError};

use super::{list_instances, wait_instance_ready, PoolReport};

/// Capacidad de un scale set. Cachea la lista de instancias sólo durante una
/// pasada; cada operación que cambia la capacidad invalida la caché.
pub struct WorkerScaler<'a> {
    ctx: &'a RolloutContext,
    desired: &'a DesiredState,
    pool: &'a ScaleGroupDescriptor,
    scale_set: String,
    cached: Option<Vec<InstanceRecord>>,
}

impl<'a> WorkerScaler<'a> {
    pub fn new(ctx: &'a RolloutContext, desired: &'a DesiredState, pool: &'a ScaleGroupDescriptor) -> Self {
        Self { ctx, desired, pool, scale_set: pool.scale_set_name(), cached: None }
    }

    pub async fn instances(&mut self) -> Result<&[InstanceRecord], StepError> {
        if self.cached.is_none() {
            self.cached = Some(list_instances(self.ctx, &self.scale_set).await?);
        }
        Ok(self.cached.as_deref().unwrap_or_default())
    }

    pub fn invalidate(&mut self) { self.cached = None; }

    /// Fija la capacidad y espera a que el proveedor termine. Los errores
    /// internos del proveedor se reintentan con la política acotada.
    pub async fn set_capacity(&mut self, capacity: u32, phase: Phase) -> Result<(), StepError> {
        self.invalidate();
        let compute = &self.ctx.compute;
        let scale_set = self.scale_set.as_str();
        info!("{scale_set}: setting capacity to {capacity}");
        let handle = self.ctx
                         .retry
                         .retry_on_conflict(&format!("set capacity {scale_set}"), move || async move {
                             compute.begin_set_capacity(scale_set, capacity).await.map_err(RolloutError::from)
                         })
                         .await
                         .step(phase)?;
        self.ctx.await_operation(phase, &handle).await
    }

    /// Lleva el pool a la cantidad declarada. Las instancias nuevas se
    /// esperan y registran con `fp`; las sobrantes se drenan y borran.
    pub async fn reconcile(&mut self, ledger: &mut RolloutLedger, fp: Fingerprint, report: &mut PoolReport)
                           -> Result<(), StepError> {
        let count = self.pool.count as usize;
        let before: BTreeSet<String> = self.instances().await?.iter().map(|i| i.instance_id.clone()).collect();
        if before.len() < count {
            self.set_capacity(self.pool.count, Phase::ScaleUp).await?;
            let fresh: Vec<InstanceRecord> =
                self.instances().await?.iter().filter(|i| !before.contains(&i.instance_id)).cloned().collect();
            self.record_new(&fresh, ledger, fp, report).await?;
        } else if before.len() > count {
            self.scale_down_excess(ledger, report).await?;
        }
        Ok(())
    }

    /// Drena y borra las instancias que exceden la cantidad declarada.
    /// Se van primero las que el ledger no tiene con el fingerprint actual,
    /// después por hostname; así un reinicio a mitad de reemplazo conserva
    /// la instancia nueva.
    pub async fn scale_down_excess(&mut self, ledger: &mut RolloutLedger, report: &mut PoolReport)
                                   -> Result<(), StepError> {
        let count = self.pool.count as usize;
        let fp = fingerprint(self.pool);
        let mut live = self.instances().await?.to_vec();
        let surplus = live.len().saturating_sub(count);
        live.sort_by_key(|i| (ledger.is_current(&i.name, &fp), i.computer_name.clone()));
        let excess: Vec<InstanceRecord> = live.into_iter().take(surplus).collect();
        if excess.is_empty() {
            return Ok(());
        }
        info!("{}: removing {} instance(s) above declared count {count}", self.scale_set, excess.len());
        for instance in &excess {
            self.remove(instance, ledger).await?;
            report.removed.push(instance.name.clone());
        }
        self.invalidate();
        Ok(())
    }

    /// Espera cada instancia nueva y la registra en el ledger.
    pub async fn record_new(&self, fresh: &[InstanceRecord], ledger: &mut RolloutLedger, fp: Fingerprint,
                            report: &mut PoolReport)
                            -> Result<(), StepError> {
        for instance in fresh {
            wait_instance_ready(self.ctx, self.pool.role, instance).await?;
            ledger.record_instance(instance.name.clone(), fp);
            self.ctx.write_ledger(ledger).await?;
            info!("{}: new instance {} ready ({})", self.scale_set, instance.name, fp.short());
            report.added.push(instance.name.clone());
        }
        Ok(())
    }

    /// Drain + borrado de una instancia y de su entrada en el ledger.
    async fn remove(&self, instance: &InstanceRecord, ledger: &mut RolloutLedger) -> Result<(), StepError> {
        Drainer::new(self.ctx).drain_instance(self.desired, &self.scale_set, instance).await?;
        let compute = &self.ctx.compute;
        self.ctx
            .run_operation(Phase::DeleteInstance, compute.begin_delete_instance(&self.scale_set, &instance.instance_id))
            .await?;
        if ledger.remove_instance(&instance.name).is_some() {
            self.ctx.write_ledger(ledger).await?;
        }
        Ok(())
    }
}

/// Reemplazo grow-then-shrink de las instancias con fingerprint viejo.
pub struct WorkerReplacer<'a> {
    ctx: &'a RolloutContext,
    desired: &'a DesiredState,
    pool: &'a ScaleGroupDescriptor,
}

impl<'a> WorkerReplacer<'a> {
    pub fn new(ctx: &'a RolloutContext, desired: &'a DesiredState, pool: &'a ScaleGroupDescriptor) -> Self {
        Self { ctx, desired, pool }
    }

    pub async fn run(&self) -> Result<PoolReport, StepError> {
        let mut scaler = WorkerScaler::new(self.ctx, self.desired, self.pool);
        let scale_set = self.pool.scale_set_name();
        let desired_fp = fingerprint(self.pool);
        let mut report = PoolReport::new(&self.pool.name, &scale_set);

        let mut ledger = self.ctx.read_ledger().await?;
        let live = scaler.instances().await?.to_vec();
        let mut known: BTreeSet<String> = live.iter().map(|i| i.instance_id.clone()).collect();
        let stale: Vec<InstanceRecord> = live.into_iter().filter(|i| !ledger.is_current(&i.name, &desired_fp)).collect();
        info!("{} {scale_set}: {} stale instance(s) for fingerprint {}",
              self.pool.role,
              stale.len(),
              desired_fp.short());

        for old in &stale {
            scaler.set_capacity(self.pool.count + 1, Phase::ScaleUp).await?;
            let now = scaler.instances().await?.to_vec();
            let fresh: Vec<InstanceRecord> = now.iter().filter(|i| !known.contains(&i.instance_id)).cloned().collect();
            if fresh.is_empty() && now.len() <= self.pool.count as usize {
                return Err(StepError::new(Phase::ScaleUp,
                                          RolloutError::OperationFailed { operation: format!("scale up {scale_set}"),
                                                                          message: "no replacement instance appeared"
                                                                              .to_string() }));
            }
            if fresh.is_empty() {
                warn!("{scale_set}: no new instance after scale up, capacity already above declared count");
            }
            known.extend(fresh.iter().map(|i| i.instance_id.clone()));
            scaler.record_new(&fresh, &mut ledger, desired_fp, &mut report).await?;

            info!("{scale_set}: replacing {}", old.name);
            scaler.remove(old, &mut ledger).await?;
            scaler.invalidate();
            report.updated.push(old.name.clone());
        }

        scaler.reconcile(&mut ledger, desired_fp, &mut report).await?;

        if ledger.scale_set(&scale_set) != Some(&desired_fp) {
            ledger.record_scale_set(scale_set.clone(), desired_fp);
            self.ctx.write_ledger(&ledger).await?;
        }
        Ok(report)
    }
}
