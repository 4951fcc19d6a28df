//! Rolling update del control-plane.
//!
//! Cada instancia desactualizada recorre
//! `Stale → Draining → Deallocating → ApplyingImage → Reimaging → Starting →
//! WaitingReady → Recorded` antes de tocar la siguiente. El fingerprint se
//! escribe en el ledger al llegar a `Recorded`, así que tras un fallo la
//! instancia en curso sigue desactualizada y la próxima pasada la retoma.
//! Nunca hay dos instancias del control-plane fuera de servicio a la vez.

use std::fmt;

use log::info;

use rollout_core::{fingerprint, InstanceRecord, PoolRole, ScaleGroupDescriptor};

use crate::context::RolloutContext;
use crate::drain::Drainer;
use crate::errors::{Phase, StepError};

use super::{list_instances, wait_instance_ready, PoolReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MasterState {
    Stale,
    Draining,
    Deallocating,
    ApplyingImage,
    Reimaging,
    Starting,
    WaitingReady,
    Recorded,
}

impl MasterState {
    pub fn next(self) -> Option<MasterState> {
        use MasterState::*;
        match self {
            Stale => Some(Draining),
            Draining => Some(Deallocating),
            Deallocating => Some(ApplyingImage),
            ApplyingImage => Some(Reimaging),
            Reimaging => Some(Starting),
            Starting => Some(WaitingReady),
            WaitingReady => Some(Recorded),
            Recorded => None,
        }
    }

    /// Fase con la que se etiqueta un fallo al entrar en este estado.
    pub fn phase(self) -> Option<Phase> {
        match self {
            MasterState::Stale => None,
            MasterState::Draining => Some(Phase::Drain),
            MasterState::Deallocating => Some(Phase::Deallocate),
            MasterState::ApplyingImage => Some(Phase::UpdateModel),
            MasterState::Reimaging => Some(Phase::Reimage),
            MasterState::Starting => Some(Phase::Start),
            MasterState::WaitingReady => Some(Phase::WaitReady),
            MasterState::Recorded => Some(Phase::WriteLedger),
        }
    }
}

impl fmt::Display for MasterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(self, f) }
}

pub struct ControlPlaneRollout<'a> {
    ctx: &'a RolloutContext,
    pool: &'a ScaleGroupDescriptor,
}

impl<'a> ControlPlaneRollout<'a> {
    pub fn new(ctx: &'a RolloutContext, pool: &'a ScaleGroupDescriptor) -> Self { Self { ctx, pool } }

    pub async fn run(&self) -> Result<PoolReport, StepError> {
        let scale_set = self.pool.scale_set_name();
        let desired_fp = fingerprint(self.pool);
        let mut report = PoolReport::new(&self.pool.name, &scale_set);

        let mut ledger = self.ctx.read_ledger().await?;
        let stale: Vec<InstanceRecord> = list_instances(self.ctx, &scale_set).await?
                                                                            .into_iter()
                                                                            .filter(|i| !ledger.is_current(&i.name, &desired_fp))
                                                                            .collect();
        info!("control-plane {scale_set}: {} stale instance(s) for fingerprint {}", stale.len(), desired_fp.short());

        for instance in &stale {
            self.roll(&scale_set, instance).await?;
            ledger.record_instance(instance.name.clone(), desired_fp);
            self.ctx.write_ledger(&ledger).await?;
            info!("{} -> {:?} ({})", instance.name, MasterState::Recorded, desired_fp.short());
            report.updated.push(instance.name.clone());
        }

        if ledger.scale_set(&scale_set) != Some(&desired_fp) {
            ledger.record_scale_set(scale_set.clone(), desired_fp);
            self.ctx.write_ledger(&ledger).await?;
        }
        Ok(report)
    }

    /// Lleva una instancia desde `Stale` hasta `WaitingReady` completado.
    async fn roll(&self, scale_set: &str, instance: &InstanceRecord) -> Result<(), StepError> {
        let mut state = MasterState::Stale;
        while let Some(next) = state.next() {
            if next == MasterState::Recorded {
                break;
            }
            info!("{} -> {next}", instance.name);
            self.enter(next, scale_set, instance).await?;
            state = next;
        }
        Ok(())
    }

    /// Ejecuta la acción de `state`; los errores salen con `state.phase()`.
    async fn enter(&self, state: MasterState, scale_set: &str, instance: &InstanceRecord) -> Result<(), StepError> {
        let Some(phase) = state.phase() else { return Ok(()) };
        let compute = &self.ctx.compute;
        let id = instance.instance_id.as_str();
        let begin = match state {
            MasterState::Draining => {
                return Drainer::new(self.ctx).drain(&instance.node_name(), PoolRole::ControlPlane).await;
            }
            MasterState::Deallocating => compute.begin_deallocate(scale_set, id),
            MasterState::ApplyingImage => compute.begin_update_instance(scale_set, id),
            MasterState::Reimaging => compute.begin_reimage(scale_set, id),
            MasterState::Starting => compute.begin_start(scale_set, id),
            MasterState::WaitingReady => return wait_instance_ready(self.ctx, PoolRole::ControlPlane, instance).await,
            MasterState::Stale | MasterState::Recorded => return Ok(()),
        };
        self.ctx.run_operation(phase, begin).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_walk_in_order_and_end_recorded() {
        let mut walked = vec![MasterState::Stale];
        while let Some(next) = walked[walked.len() - 1].next() {
            walked.push(next);
        }
        assert_eq!(walked.len(), 8);
        assert_eq!(walked.last(), Some(&MasterState::Recorded));
        let phases: Vec<_> = walked.iter().filter_map(|s| s.phase()).map(|p| p.as_str()).collect();
        assert_eq!(phases,
                   vec!["drain", "deallocate", "update-model", "reimage", "start", "wait-ready", "write-ledger"]);
    }
}
