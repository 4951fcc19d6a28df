//! Compilación y envío del grafo de despliegue.

use log::info;
use serde_json::Value;

use rollout_core::{compile_desired_state, DesiredState, RenderOptions};

use crate::context::RolloutContext;
use crate::errors::{Phase, StepContext, StepError};
use crate::health::HealthEndpoint;
use crate::ports::Deployer;
use crate::prober::ReadyTarget;

/// Documento listo para la API de despliegue.
pub fn compile_document(desired: &DesiredState, options: &RenderOptions<'_>) -> Result<Value, StepError> {
    let graph = compile_desired_state(desired, options).step(Phase::GenerateGraph)?;
    info!("compiled deployment graph: {} resources", graph.len());
    Ok(graph.to_document())
}

/// Aplica el documento y devuelve el endpoint con el que se sondea la API.
pub async fn deploy_document(deployer: &dyn Deployer, desired: &DesiredState, document: &Value)
                             -> Result<HealthEndpoint, StepError> {
    info!("deploying to resource group {}", desired.resource_group);
    let output = deployer.deploy(&desired.resource_group, document).await.step(Phase::Deploy)?;
    Ok(HealthEndpoint::new(desired, output.endpoint.as_deref()))
}

/// Espera los servicios de infraestructura configurados; ningún pool de
/// compute se toca mientras no estén listos.
pub async fn wait_infra_services(ctx: &RolloutContext) -> Result<(), StepError> {
    for set in &ctx.config.infra_pods {
        info!("waiting for infra services {:?} in {}", set.names, set.namespace);
        ctx.prober
           .wait(ReadyTarget::Pods { namespace: &set.namespace, names: &set.names })
           .await
           .step(Phase::WaitInfra)?;
    }
    Ok(())
}

pub async fn wait_healthy(ctx: &RolloutContext, endpoint: &HealthEndpoint) -> Result<(), StepError> {
    info!("waiting for {}", endpoint.url());
    ctx.prober.wait(ReadyTarget::Health(endpoint)).await.step(Phase::WaitHealth)
}
