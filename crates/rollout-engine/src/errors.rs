//! Errores del motor.
//!
//! Todo fallo que sale de un punto de entrada es un [`StepError`]: la fase en
//! la que ocurrió más la causa. La fase aparece literal en `Display`
//! (`[deallocate] provider: ...`) para poder mapear fallos a runbooks.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use rollout_core::{CoreError, GraphError};
use rollout_ledger::{BlobError, LedgerError};

use crate::ports::{KubeError, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Validate,
    GenerateGraph,
    Deploy,
    InitializeLedger,
    WriteConfig,
    ReadConfig,
    WaitHealth,
    ReadLedger,
    WriteLedger,
    ListScaleSets,
    ListInstances,
    LookupInstance,
    Drain,
    Deallocate,
    UpdateModel,
    Reimage,
    Start,
    WaitReady,
    WaitInfra,
    ScaleUp,
    ScaleDown,
    DeleteInstance,
    DeleteScaleSet,
    ListBackups,
    RunCommand,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validate => "validate",
            Phase::GenerateGraph => "generate-graph",
            Phase::Deploy => "deploy",
            Phase::InitializeLedger => "initialize-ledger",
            Phase::WriteConfig => "write-config",
            Phase::ReadConfig => "read-config",
            Phase::WaitHealth => "wait-health",
            Phase::ReadLedger => "read-ledger",
            Phase::WriteLedger => "write-ledger",
            Phase::ListScaleSets => "list-scale-sets",
            Phase::ListInstances => "list-instances",
            Phase::LookupInstance => "lookup-instance",
            Phase::Drain => "drain",
            Phase::Deallocate => "deallocate",
            Phase::UpdateModel => "update-model",
            Phase::Reimage => "reimage",
            Phase::Start => "start",
            Phase::WaitReady => "wait-ready",
            Phase::WaitInfra => "wait-infra",
            Phase::ScaleUp => "scale-up",
            Phase::ScaleDown => "scale-down",
            Phase::DeleteInstance => "delete-instance",
            Phase::DeleteScaleSet => "delete-scale-set",
            Phase::ListBackups => "list-backups",
            Phase::RunCommand => "run-command",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RolloutError {
    #[error("provider: {0}")] Provider(#[from] ProviderError),
    #[error("kubernetes: {0}")] Kube(KubeError),
    #[error("ledger: {0}")] Ledger(#[from] LedgerError),
    #[error("blob storage: {0}")] Blob(BlobError),
    #[error(transparent)] Core(#[from] CoreError),
    #[error("graph: {0}")] Graph(#[from] GraphError),
    #[error("operation {operation} failed: {message}")] OperationFailed { operation: String, message: String },
    #[error("timed out after {0:?} waiting for {1}")] Timeout(Duration, String),
    #[error("cancelled while waiting for {0}")] Cancelled(String),
    /// "Ya existe" u otra escritura concurrente: se puede reintentar.
    #[error("conflict: {0}")] Conflict(String),
    #[error("unsupported variant: {0}")] UnsupportedVariant(String),
    #[error("unrecognised instance role for {0}")] UnrecognisedRole(String),
    #[error("backup {0} does not exist")] BackupNotFound(String),
    #[error("no instance with hostname {0}")] UnknownHostname(String),
    #[error("health check returned status {0}")] UnexpectedStatus(u16),
    #[error("health check: {0}")] Health(String),
}

impl From<KubeError> for RolloutError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::AlreadyExists(what) => RolloutError::Conflict(what),
            other => RolloutError::Kube(other),
        }
    }
}

impl From<BlobError> for RolloutError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::AlreadyExists { container, name } => RolloutError::Conflict(format!("{container}/{name}")),
            other => RolloutError::Blob(other),
        }
    }
}

impl RolloutError {
    /// Conflictos que la política acotada de reintentos vuelve a intentar.
    pub fn is_conflict(&self) -> bool {
        matches!(self,
                 RolloutError::Conflict(_)
                 | RolloutError::Kube(KubeError::Conflict(_))
                 | RolloutError::Provider(ProviderError::Conflict(_))
                 | RolloutError::Provider(ProviderError::InternalExecution(_)))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RolloutError::Provider(e) => !matches!(e, ProviderError::NotFound(_)),
            RolloutError::Kube(e) => matches!(e, KubeError::Conflict(_) | KubeError::Api(_)),
            RolloutError::Ledger(e) => e.is_retryable(),
            RolloutError::Blob(e) => e.is_retryable(),
            RolloutError::Timeout(..) | RolloutError::Conflict(_) | RolloutError::Health(_) => true,
            RolloutError::Core(_)
            | RolloutError::Graph(_)
            | RolloutError::OperationFailed { .. }
            | RolloutError::Cancelled(_)
            | RolloutError::UnsupportedVariant(_)
            | RolloutError::UnrecognisedRole(_)
            | RolloutError::BackupNotFound(_)
            | RolloutError::UnknownHostname(_)
            | RolloutError::UnexpectedStatus(_) => false,
        }
    }
}

/// Error visible para quien invoca un punto de entrada.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("[{phase}] {source}")]
pub struct StepError {
    pub phase: Phase,
    #[source]
    pub source: RolloutError,
}

impl StepError {
    pub fn new(phase: Phase, source: impl Into<RolloutError>) -> Self { Self { phase, source: source.into() } }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn is_retryable(&self) -> bool { self.source.is_retryable() }
}

/// Etiqueta un `Result` con la fase en curso.
pub trait StepContext<T> {
    fn step(self, phase: Phase) -> Result<T, StepError>;
}

impl<T, E: Into<RolloutError>> StepContext<T> for Result<T, E> {
    fn step(self, phase: Phase) -> Result<T, StepError> { self.map_err(|e| StepError::new(phase, e)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_tag_is_verbatim_in_display() {
        let err = StepError::new(Phase::Deallocate, ProviderError::Throttled("slow down".into()));
        assert_eq!(err.to_string(), "[deallocate] provider: throttled: slow down");
        assert!(err.is_retryable());
        assert_eq!(serde_json::to_string(&Phase::WaitReady).unwrap(), "\"wait-ready\"");
    }

    #[test]
    fn already_exists_becomes_a_retryable_conflict() {
        let err: RolloutError = KubeError::AlreadyExists("node/master-000000".into()).into();
        assert_eq!(err, RolloutError::Conflict("node/master-000000".into()));
        assert!(err.is_conflict() && err.is_retryable());
    }

    #[test]
    fn fatal_conditions_are_not_retryable() {
        let corrupt = StepError::new(Phase::ReadLedger, LedgerError::Corrupt("eof".into()));
        let unknown = StepError::new(Phase::GenerateGraph, GraphError::UnknownResourceType("x".into()));
        let role = StepError::new(Phase::Drain, RolloutError::UnrecognisedRole("ss-legacy".into()));
        for err in [corrupt, unknown, role] {
            assert!(!err.is_retryable(), "{err} should be fatal");
        }
    }
}
