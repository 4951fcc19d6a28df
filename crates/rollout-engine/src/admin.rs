//! Acciones administrativas sobre instancias individuales.

use std::fmt;
use std::str::FromStr;

use log::{info, warn};
use serde::Serialize;

use rollout_core::{DesiredState, InstanceRecord};
use rollout_ledger::RolloutLedger;

use crate::context::RolloutContext;
use crate::controller::{list_instances, wait_instance_ready};
use crate::errors::{Phase, RolloutError, StepContext, StepError};

/// Instancia identificada por hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceIdentity {
    pub scale_set: String,
    pub instance_id: String,
    pub name: String,
    pub computer_name: String,
}

/// Servicios que se pueden reiniciar con run-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartService {
    Docker,
    Kubelet,
    NetworkManager,
}

impl RestartService {
    pub fn script(&self) -> &'static str {
        match self {
            RestartService::Docker => "systemctl restart docker.service",
            RestartService::Kubelet => "systemctl restart atomic-openshift-node.service",
            RestartService::NetworkManager => "systemctl restart NetworkManager.service",
        }
    }
}

impl fmt::Display for RestartService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
                        RestartService::Docker => "docker",
                        RestartService::Kubelet => "kubelet",
                        RestartService::NetworkManager => "NetworkManager",
                    })
    }
}

impl FromStr for RestartService {
    type Err = RolloutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" => Ok(RestartService::Docker),
            "kubelet" => Ok(RestartService::Kubelet),
            "NetworkManager" | "networkmanager" => Ok(RestartService::NetworkManager),
            other => Err(RolloutError::UnsupportedVariant(format!("restart service {other}"))),
        }
    }
}

pub struct AdminActions<'a> {
    ctx: &'a RolloutContext,
}

impl<'a> AdminActions<'a> {
    pub fn new(ctx: &'a RolloutContext) -> Self { Self { ctx } }

    /// Todas las instancias de todos los scale sets, por hostname.
    pub async fn list_hostnames(&self) -> Result<Vec<InstanceIdentity>, StepError> {
        let scale_sets = self.ctx.compute.list_scale_sets().await.step(Phase::ListScaleSets)?;
        let mut out = Vec::new();
        for ss in scale_sets {
            out.extend(list_instances(self.ctx, &ss.name).await?.into_iter().map(|i| InstanceIdentity {
                                                                     scale_set: ss.name.clone(),
                                                                     instance_id: i.instance_id,
                                                                     name: i.name,
                                                                     computer_name: i.computer_name,
                                                                 }));
        }
        out.sort_by(|a, b| a.computer_name.cmp(&b.computer_name));
        Ok(out)
    }

    /// Búsqueda sin distinguir mayúsculas (el nodo usa el hostname en
    /// minúsculas).
    pub async fn instance_by_hostname(&self, hostname: &str) -> Result<InstanceIdentity, StepError> {
        self.list_hostnames()
            .await?
            .into_iter()
            .find(|i| i.computer_name.eq_ignore_ascii_case(hostname))
            .ok_or_else(|| StepError::new(Phase::LookupInstance, RolloutError::UnknownHostname(hostname.to_string())))
    }

    /// Reimagen de una instancia y espera a que vuelva lista según su rol.
    pub async fn reimage(&self, desired: &DesiredState, hostname: &str) -> Result<InstanceIdentity, StepError> {
        let target = self.instance_by_hostname(hostname).await?;
        let role = desired.pool_for_scale_set(&target.scale_set)
                          .map(|p| p.role)
                          .ok_or_else(|| {
                              StepError::new(Phase::LookupInstance, RolloutError::UnrecognisedRole(target.scale_set.clone()))
                          })?;
        warn!("reimaging {} ({}/{})", target.computer_name, target.scale_set, target.instance_id);
        let compute = &self.ctx.compute;
        self.ctx.run_operation(Phase::Reimage, compute.begin_reimage(&target.scale_set, &target.instance_id)).await?;
        self.ctx.run_operation(Phase::Start, compute.begin_start(&target.scale_set, &target.instance_id)).await?;
        let record = InstanceRecord { instance_id: target.instance_id.clone(),
                                     name: target.name.clone(),
                                     computer_name: target.computer_name.clone() };
        wait_instance_ready(self.ctx, role, &record).await?;
        Ok(target)
    }

    pub async fn restart_service(&self, hostname: &str, service: RestartService) -> Result<InstanceIdentity, StepError> {
        let target = self.instance_by_hostname(hostname).await?;
        info!("restarting {service} on {}", target.computer_name);
        self.ctx
            .run_operation(Phase::RunCommand,
                           self.ctx.compute.begin_run_command(&target.scale_set, &target.instance_id, service.script()))
            .await?;
        Ok(target)
    }

    /// Vacía el ledger: la próxima actualización vuelve a desplegar todas las
    /// instancias.
    pub async fn force_update(&self) -> Result<(), StepError> {
        warn!("clearing rollout ledger, next update rolls every instance");
        self.ctx.write_ledger(&RolloutLedger::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_services_parse_and_reject_unknown() {
        assert_eq!("docker".parse::<RestartService>(), Ok(RestartService::Docker));
        assert_eq!("kubelet".parse::<RestartService>().map(|s| s.script()),
                   Ok("systemctl restart atomic-openshift-node.service"));
        assert!(matches!("sshd".parse::<RestartService>(), Err(RolloutError::UnsupportedVariant(_))));
    }
}
