//! rollout-adapters: implementaciones simuladas de los puertos del motor.
//!
//! - `cloud`: proveedor de cómputo + API de despliegue en memoria, con
//!   registro de llamadas e inyección de fallos.
//! - `kube`: API de Kubernetes en memoria (nodos y pods).
//! - `health`: health check con respuestas guionadas.
//! - `fixtures`: estado deseado de ejemplo y arnés [`Simulation`].

pub mod cloud;
pub mod fixtures;
pub mod health;
pub mod kube;

pub use cloud::{CallKind, Failure, ProviderCall, SimulatedCloud, SIMULATED_API_ENDPOINT};
pub use fixtures::{pool, sample_desired_state, with_image_version, Simulation};
pub use health::SimulatedHealth;
pub use kube::{KubeCall, SimulatedKube};
