//! Rollout Orchestrator
//!
//! Librería de fachada del workspace:
//! - Reexporta el modelo (`rollout-core`), el ledger (`rollout-ledger`) y
//!   el motor (`rollout-engine`).
//! - Expone `config` con la configuración de la aplicación.
//! - `simulated_orchestrator` arma un orquestador sobre el proveedor simulado
//!   persistiendo en disco; lo usa el binario de demostración.

pub mod config;

use std::sync::Arc;

pub use config::AppConfig;
pub use rollout_core::{compile_desired_state, fingerprint, DesiredState, OrchestratorConfig, PoolRole,
                       ScaleGroupDescriptor};
pub use rollout_engine::{Orchestrator, Phase, RestoreReport, RolloutError, RolloutReport, StepError};
pub use rollout_ledger::{BlobStore, FsBlobStore, RolloutLedger};

use rollout_adapters::Simulation;

/// Simulación cuyo blob store vive en `config.data_dir`, más el orquestador
/// configurado sobre ella.
pub fn simulated_orchestrator(config: &AppConfig) -> (Simulation, Orchestrator) {
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.data_dir.clone()));
    let sim = Simulation::with_blobs(blobs);
    let orchestrator = sim.orchestrator(config.orchestrator.clone());
    (sim, orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_errors_name_their_phase() {
        let e = StepError::new(Phase::ListBackups, RolloutError::BackupNotFound("b1".into())).to_string();
        assert_eq!(e, "[list-backups] backup b1 does not exist");
    }

    #[test]
    fn simulated_config_keeps_the_data_dir() {
        let c = AppConfig::simulated("/tmp/rollout");
        assert_eq!(c.data_dir, std::path::PathBuf::from("/tmp/rollout"));
        assert_eq!(c.orchestrator, OrchestratorConfig::fast());
    }

    #[test]
    fn env_config_reads_the_data_dir() {
        std::env::set_var("ROLLOUT_DATA_DIR", "/var/lib/rollout");
        let c = AppConfig::from_env();
        std::env::remove_var("ROLLOUT_DATA_DIR");
        assert_eq!(c.data_dir, std::path::PathBuf::from("/var/lib/rollout"));
        assert_eq!(c.orchestrator.ledger_container, "update");
    }
}
