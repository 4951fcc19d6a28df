//! Errores del core.

use thiserror::Error;

/// Fallos de compilación del grafo de despliegue. Todos son de configuración:
/// ninguno se reintenta.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum GraphError {
    #[error("unknown resource type: {0}")] UnknownResourceType(String),
    #[error("duplicate resource: {0}")] DuplicateResource(String),
    #[error("malformed name {name:?} for resource type {resource_type}")] MalformedName { resource_type: String, name: String },
    #[error("resource {resource} depends on {dependency}, which is not in the document")] UnknownDependency { resource: String, dependency: String },
    #[error("dependency cycle involving {0}")] DependencyCycle(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreError {
    #[error(transparent)] Graph(#[from] GraphError),
    #[error("invalid fingerprint: {0}")] InvalidFingerprint(String),
    #[error("unrecognised pool role: {0}")] UnrecognisedRole(String),
    #[error("unknown pool: {0}")] UnknownPool(String),
    #[error("invalid desired state: {0}")] InvalidDesiredState(String),
}
