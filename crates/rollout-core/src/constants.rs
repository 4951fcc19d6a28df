//! Constantes del orquestador.
//!
//! `FINGERPRINT_VERSION` forma parte del input del hashing: cambiarla invalida
//! todos los fingerprints registrados y fuerza un rollout completo.

/// Versión lógica del formato de fingerprint. Mantener estable mientras la
/// forma canónica del descriptor no cambie de manera incompatible.
pub const FINGERPRINT_VERSION: &str = "R1.0";

pub const TEMPLATE_SCHEMA: &str = "https://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#";
pub const TEMPLATE_CONTENT_VERSION: &str = "1.0.0.0";

pub const SCALE_SET_TYPE: &str = "Microsoft.Compute/virtualMachineScaleSets";

/// Contenedor/blob del ledger de rollout.
pub const LEDGER_CONTAINER: &str = "update";
pub const LEDGER_BLOB: &str = "update";
/// Contenedor/blob con la copia del estado deseado aplicado.
pub const CONFIG_CONTAINER: &str = "config";
pub const CONFIG_BLOB: &str = "config";
/// Contenedor donde se guardan los backups de etcd.
pub const BACKUP_CONTAINER: &str = "etcd";

pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";
/// Prefijos de los pods estáticos del control-plane; el nombre real es
/// `<prefijo>-<nodo>`.
pub const CONTROL_PLANE_PODS: [&str; 3] = ["master-etcd", "master-api", "controllers"];
/// Servicios de infraestructura que deben quedar listos tras pasar por los
/// pools de infra.
pub const INFRA_NAMESPACE: &str = "default";
pub const INFRA_PODS: [&str; 2] = ["router", "docker-registry"];

/// Tag que el renderer agrega a cada scale set con el rol del pool.
pub const ROLE_TAG: &str = "role";
