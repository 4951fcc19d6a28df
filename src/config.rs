//! Configuración de la aplicación.
//! Agrupa la configuración del orquestador (que carga el `.env`) con el
//! directorio del blob store en disco.
use std::env;
use std::path::PathBuf;

use rollout_core::OrchestratorConfig;

/// Directorio por defecto del blob store si no hay `ROLLOUT_DATA_DIR`.
pub const DEFAULT_DATA_DIR: &str = "./rollout-data";

/// Configuración de la aplicación.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Tiempos, reintentos y nombres de contenedores.
    pub orchestrator: OrchestratorConfig,
    /// Raíz del `FsBlobStore` (ledger, config aplicada y backups).
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // primero: OrchestratorConfig::from_env deja cargado el .env
        let orchestrator = OrchestratorConfig::from_env();
        let data_dir = env::var("ROLLOUT_DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        AppConfig { orchestrator, data_dir }
    }

    /// Tiempos acortados para correr contra el proveedor simulado.
    pub fn simulated(data_dir: impl Into<PathBuf>) -> Self {
        AppConfig { orchestrator: OrchestratorConfig::fast(), data_dir: data_dir.into() }
    }
}
