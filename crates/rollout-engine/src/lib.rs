//! rollout-engine
//!
//! Motor del orquestador de rollouts: conduce cada scale group por las
//! operaciones del proveedor y las esperas de readiness hasta que su estado
//! vivo coincide con su fingerprint.
//!
//! Módulos:
//! - `ports`: contratos con el proveedor cloud, la API de despliegue y
//!   Kubernetes.
//! - `errors`: `StepError` etiquetado por fase.
//! - `prober` y `health`: esperas acotadas y health check HTTPS.
//! - `drain`: desalojo de nodos.
//! - `controller`: control-plane (en sitio) y workers (grow-then-shrink).
//! - `recovery`: restauración de etcd.
//! - `orchestrator`: `deploy`, `update`, `etcd_restore`.
//! - `admin`: acciones sobre instancias individuales.

pub mod admin;
pub mod apply;
pub mod context;
pub mod controller;
pub mod drain;
pub mod errors;
pub mod health;
pub mod orchestrator;
pub mod ports;
pub mod prober;
pub mod recovery;
pub mod retry;

pub use admin::{AdminActions, InstanceIdentity, RestartService};
pub use context::RolloutContext;
pub use controller::{ControlPlaneRollout, MasterState, PoolReport, WorkerReplacer, WorkerScaler};
pub use drain::Drainer;
pub use errors::{Phase, RolloutError, StepContext, StepError};
pub use health::{HealthCheck, HealthEndpoint, HttpsHealthCheck};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RolloutReport};
pub use ports::{ComputeClient, DeployOutput, Deployer, KubeClient, KubeError, NodeStatus, OperationHandle,
                OperationStatus, PodInfo, ProviderError, ScaleSetInfo};
pub use prober::{Backoff, Poller, Prober, ReadyTarget};
pub use recovery::{EtcdRecovery, RestoreReport};
pub use retry::RetryPolicy;
