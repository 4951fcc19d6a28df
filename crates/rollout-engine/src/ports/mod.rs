//! Contratos con los colaboradores externos: API de cómputo del proveedor,
//! API de despliegue y API de Kubernetes.
pub mod compute;
pub mod deployer;
pub mod kube;

pub use compute::{ComputeClient, OperationHandle, OperationStatus, ProviderError, ScaleSetInfo};
pub use deployer::{DeployOutput, Deployer};
pub use kube::{KubeClient, KubeError, NodeStatus, PodInfo};
