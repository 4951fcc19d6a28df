use std::future::Future;
use std::sync::Arc;

use log::debug;
use tokio_util::sync::CancellationToken;

use rollout_core::OrchestratorConfig;
use rollout_ledger::{LedgerStore, RolloutLedger};

use crate::errors::{Phase, RolloutError, StepContext, StepError};
use crate::health::HealthCheck;
use crate::ports::{ComputeClient, KubeClient, OperationHandle, ProviderError};
use crate::prober::{Prober, ReadyTarget};
use crate::retry::RetryPolicy;

/// Colaboradores compartidos por controladores, drain y recuperación durante
/// una pasada de rollout.
#[derive(Clone)]
pub struct RolloutContext {
    pub compute: Arc<dyn ComputeClient>,
    pub kube: Arc<dyn KubeClient>,
    pub ledger: Arc<dyn LedgerStore>,
    pub config: Arc<OrchestratorConfig>,
    pub prober: Prober,
    pub retry: RetryPolicy,
    pub cancel: CancellationToken,
}

impl RolloutContext {
    pub fn new(compute: Arc<dyn ComputeClient>, kube: Arc<dyn KubeClient>, health: Arc<dyn HealthCheck>,
               ledger: Arc<dyn LedgerStore>, config: Arc<OrchestratorConfig>, cancel: CancellationToken)
               -> Self {
        let prober = Prober::new(compute.clone(), kube.clone(), health, config.clone(), cancel.clone());
        let retry = RetryPolicy::from_config(&config);
        Self { compute, kube, ledger, config, prober, retry, cancel }
    }

    /// Emite una operación larga y bloquea hasta que termina.
    pub async fn run_operation<F>(&self, phase: Phase, begin: F) -> Result<OperationHandle, StepError>
        where F: Future<Output = Result<OperationHandle, ProviderError>>
    {
        let handle = self.prober
                         .poller()
                         .call(phase.as_str(), self.config.operation_timeout, async { begin.await.map_err(RolloutError::from) })
                         .await
                         .step(phase)?;
        self.await_operation(phase, &handle).await?;
        Ok(handle)
    }

    pub async fn await_operation(&self, phase: Phase, handle: &OperationHandle) -> Result<(), StepError> {
        debug!("[{phase}] waiting for {handle}");
        self.prober.wait(ReadyTarget::Operation(handle)).await.step(phase)
    }

    pub async fn read_ledger(&self) -> Result<RolloutLedger, StepError> { self.ledger.read().await.step(Phase::ReadLedger) }

    pub async fn write_ledger(&self, ledger: &RolloutLedger) -> Result<(), StepError> {
        self.ledger.write(ledger).await.step(Phase::WriteLedger)
    }
}
