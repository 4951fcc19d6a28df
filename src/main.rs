//! Demostración de punta a punta contra el proveedor simulado: despliegue
//! inicial, rolling update con una imagen nueva y restauración de etcd.
//! El ledger, la config aplicada y los backups quedan en `ROLLOUT_DATA_DIR`.

use log::{error, info};

use rollout_adapters::{sample_desired_state, with_image_version};
use rollout_orchestrator::{simulated_orchestrator, AppConfig, OrchestratorConfig, StepError};

const DEMO_BACKUP: &str = "backup-demo";

async fn run(config: AppConfig) -> Result<(), StepError> {
    let (sim, orchestrator) = simulated_orchestrator(&config);

    let desired = sample_desired_state();
    let report = orchestrator.deploy(&desired).await?;
    info!("deploy: {}", serde_json::to_string(&report).unwrap_or_default());

    let desired = with_image_version(desired, "311.44.20181101");
    let report = orchestrator.update(&desired).await?;
    for pool in &report.pools {
        info!("{}: updated {:?}, added {:?}, removed {:?}", pool.pool, pool.updated, pool.added, pool.removed);
    }

    // backup de ejemplo para poder restaurar
    let backups = &config.orchestrator.backup_container;
    if let Err(e) = sim.blobs.create_container_if_not_exists(backups).await {
        error!("cannot create {backups}: {e}");
    }
    if let Err(e) = sim.blobs.put(backups, DEMO_BACKUP, b"etcd snapshot").await {
        error!("cannot store {DEMO_BACKUP}: {e}");
    }
    let restored = orchestrator.etcd_restore(&desired, DEMO_BACKUP).await?;
    info!("restored {} from {}: {:?}", restored.scale_set, restored.backup, restored.instances);

    // los masters restaurados vuelven a pasar por el rollout
    let report = orchestrator.update(&desired).await?;
    info!("post-restore update: {} pool(s) processed", report.pools.len());
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("ROLLOUT_LOG", "info")).init();

    let config = AppConfig { orchestrator: OrchestratorConfig::fast(), ..AppConfig::from_env() };
    info!("data directory: {}", config.data_dir.display());

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}
