//! Configuración del orquestador.
//!
//! Se pasa explícitamente a cada punto de entrada; no hay estado global más
//! allá de la carga única del `.env`. Las variables usan el prefijo
//! `ROLLOUT_` y los tiempos se expresan en milisegundos.

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use log::warn;
use once_cell::sync::Lazy;

use crate::constants::{BACKUP_CONTAINER, CONFIG_BLOB, CONFIG_CONTAINER, CONTROL_PLANE_PODS, INFRA_NAMESPACE, INFRA_PODS,
                       KUBE_SYSTEM_NAMESPACE, LEDGER_BLOB, LEDGER_CONTAINER};

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Pods con nombre fijo dentro de un namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSet {
    pub namespace: String,
    pub names: Vec<String>,
}

impl PodSet {
    pub fn new(namespace: &str, names: &[&str]) -> Self {
        Self { namespace: namespace.to_string(), names: names.iter().map(|n| n.to_string()).collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Intervalo inicial entre sondeos de readiness.
    pub poll_interval: Duration,
    /// Tope del backoff exponencial. Igual a `poll_interval` => intervalo fijo.
    pub max_poll_interval: Duration,
    /// Espera máxima de una operación larga del proveedor.
    pub operation_timeout: Duration,
    /// Espera máxima de nodos/pods listos.
    pub ready_timeout: Duration,
    /// Espera máxima del health check de la API.
    pub health_timeout: Duration,
    /// Gracia por defecto de los pods desalojados durante el drain.
    pub drain_grace: Duration,
    /// Reintentos ante conflictos antes de devolver el error.
    pub conflict_retries: u32,
    pub conflict_backoff: Duration,
    pub ledger_container: String,
    pub ledger_blob: String,
    pub config_container: String,
    pub config_blob: String,
    pub backup_container: String,
    pub kube_system_namespace: String,
    pub control_plane_pods: Vec<String>,
    /// Servicios que se esperan listos antes de tocar los pools de compute.
    pub infra_pods: Vec<PodSet>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(1),
               max_poll_interval: Duration::from_secs(10),
               operation_timeout: Duration::from_secs(30 * 60),
               ready_timeout: Duration::from_secs(20 * 60),
               health_timeout: Duration::from_secs(10 * 60),
               drain_grace: Duration::from_secs(30),
               conflict_retries: 5,
               conflict_backoff: Duration::from_millis(500),
               ledger_container: LEDGER_CONTAINER.to_string(),
               ledger_blob: LEDGER_BLOB.to_string(),
               config_container: CONFIG_CONTAINER.to_string(),
               config_blob: CONFIG_BLOB.to_string(),
               backup_container: BACKUP_CONTAINER.to_string(),
               kube_system_namespace: KUBE_SYSTEM_NAMESPACE.to_string(),
               control_plane_pods: CONTROL_PLANE_PODS.iter().map(|p| p.to_string()).collect(),
               infra_pods: vec![PodSet::new(INFRA_NAMESPACE, &INFRA_PODS)] }
    }
}

impl OrchestratorConfig {
    /// Valores por defecto sobrescritos por las variables `ROLLOUT_*`. Un
    /// valor que no parsea se ignora con un `warn!`.
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let d = Self::default();
        Self { poll_interval: env_millis("ROLLOUT_POLL_INTERVAL_MS", d.poll_interval),
               max_poll_interval: env_millis("ROLLOUT_MAX_POLL_INTERVAL_MS", d.max_poll_interval),
               operation_timeout: env_millis("ROLLOUT_OPERATION_TIMEOUT_MS", d.operation_timeout),
               ready_timeout: env_millis("ROLLOUT_READY_TIMEOUT_MS", d.ready_timeout),
               health_timeout: env_millis("ROLLOUT_HEALTH_TIMEOUT_MS", d.health_timeout),
               drain_grace: env_millis("ROLLOUT_DRAIN_GRACE_MS", d.drain_grace),
               conflict_retries: env_parse("ROLLOUT_CONFLICT_RETRIES", d.conflict_retries),
               conflict_backoff: env_millis("ROLLOUT_CONFLICT_BACKOFF_MS", d.conflict_backoff),
               ledger_container: env::var("ROLLOUT_LEDGER_CONTAINER").unwrap_or(d.ledger_container),
               ledger_blob: env::var("ROLLOUT_LEDGER_BLOB").unwrap_or(d.ledger_blob),
               config_container: env::var("ROLLOUT_CONFIG_CONTAINER").unwrap_or(d.config_container),
               config_blob: env::var("ROLLOUT_CONFIG_BLOB").unwrap_or(d.config_blob),
               backup_container: env::var("ROLLOUT_BACKUP_CONTAINER").unwrap_or(d.backup_container),
               kube_system_namespace: d.kube_system_namespace,
               control_plane_pods: d.control_plane_pods,
               infra_pods: d.infra_pods }
    }

    /// Misma configuración con todos los tiempos de espera escalados a
    /// milisegundos; pensada para simuladores y tests.
    pub fn fast() -> Self {
        Self { poll_interval: Duration::from_millis(1),
               max_poll_interval: Duration::from_millis(4),
               operation_timeout: Duration::from_secs(2),
               ready_timeout: Duration::from_secs(2),
               health_timeout: Duration::from_secs(2),
               drain_grace: Duration::from_millis(10),
               conflict_backoff: Duration::from_millis(1),
               ..Self::default() }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
                                  warn!("ignoring invalid {key}={raw}");
                                  default
                              }),
        Err(_) => default,
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    Duration::from_millis(env_parse(key, default.as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_storage_layout() {
        let c = OrchestratorConfig::default();
        assert_eq!((c.ledger_container.as_str(), c.ledger_blob.as_str()), ("update", "update"));
        assert_eq!(c.backup_container, "etcd");
        assert_eq!(c.control_plane_pods, vec!["master-etcd", "master-api", "controllers"]);
        assert_eq!(c.conflict_retries, 5);
        assert_eq!(c.infra_pods, vec![PodSet::new("default", &["router", "docker-registry"])]);
    }

    #[test]
    fn env_overrides_and_ignores_garbage() {
        env::set_var("ROLLOUT_CONFLICT_RETRIES", "2");
        env::set_var("ROLLOUT_POLL_INTERVAL_MS", "not-a-number");
        let c = OrchestratorConfig::from_env();
        env::remove_var("ROLLOUT_CONFLICT_RETRIES");
        env::remove_var("ROLLOUT_POLL_INTERVAL_MS");
        assert_eq!(c.conflict_retries, 2);
        assert_eq!(c.poll_interval, Duration::from_secs(1));
    }
}
