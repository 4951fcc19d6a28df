//! rollout-core: modelo del estado deseado, fingerprints de scale groups y
//! compilador del grafo de despliegue.
//!
//! No conoce al proveedor cloud ni a Kubernetes; todo lo que hay aquí es puro
//! y determinista para que pueda probarse sin I/O.
pub mod config;
pub mod constants;
pub mod errors;
pub mod graph;
pub mod hashing;
pub mod model;
pub mod names;

pub use config::{OrchestratorConfig, PodSet};
pub use errors::{CoreError, GraphError};
pub use graph::{compile, compile_desired_state, DeploymentGraph, GraphNode, ProviderContext, RenderOptions};
pub use hashing::fingerprint;
pub use model::{DesiredState, Fingerprint, ImageReference, InstanceRecord, NetworkAttachment, PoolRole, ResourceDeclaration,
                ResourceRef, ScaleGroupDescriptor};
