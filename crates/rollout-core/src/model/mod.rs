//! Modelo del estado deseado y de las instancias vivas.
pub mod desired;
pub mod fingerprint;
pub mod instance;
pub mod pool;
pub mod resource;

pub use desired::DesiredState;
pub use fingerprint::Fingerprint;
pub use instance::InstanceRecord;
pub use pool::{ImageReference, NetworkAttachment, PoolRole, ScaleGroupDescriptor};
pub use resource::{ResourceDeclaration, ResourceRef};
