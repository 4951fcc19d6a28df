use rollout_adapters::{sample_desired_state, with_image_version, CallKind};
use rollout_orchestrator::{fingerprint, simulated_orchestrator, AppConfig, BlobStore, Phase};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn temp_config() -> AppConfig { AppConfig::simulated(std::env::temp_dir().join(format!("rollout-e2e-{}", Uuid::new_v4()))) }

#[tokio::test]
async fn deploy_update_restore_on_disk() {
    let config = temp_config();
    let (sim, orchestrator) = simulated_orchestrator(&config);

    let desired = sample_desired_state();
    assert_ok!(orchestrator.deploy(&desired).await);
    assert!(config.data_dir.join("update").join("update").exists());

    let desired = with_image_version(desired, "311.44.20181101");
    let report = assert_ok!(orchestrator.update(&desired).await);
    assert_eq!(report.pools.iter().map(|p| p.pool.as_str()).collect::<Vec<_>>(), vec!["master", "infra", "compute"]);
    assert_eq!(sim.cloud.calls_of(CallKind::Reimage).len(), 3);

    // un proceso nuevo sobre el mismo directorio ve el progreso persistido
    let (_, reopened) = simulated_orchestrator(&config);
    let ledger = assert_ok!(reopened.context().read_ledger().await);
    let fp = fingerprint(desired.pool("compute").unwrap());
    assert_eq!(ledger.instances().filter(|(_, f)| **f == fp).count(), 2);
    assert_eq!(assert_ok!(reopened.applied_state().await), Some(desired.clone()));

    let backups = &config.orchestrator.backup_container;
    assert_ok!(sim.blobs.create_container_if_not_exists(backups).await);
    assert_ok!(sim.blobs.put(backups, "backup-1", b"snapshot").await);
    let restored = assert_ok!(orchestrator.etcd_restore(&desired, "backup-1").await);
    assert_eq!(restored.cleared, 3);

    let err = assert_err!(orchestrator.etcd_restore(&desired, "backup-2").await);
    assert_eq!(err.phase(), Phase::ListBackups);

    let _ = std::fs::remove_dir_all(&config.data_dir);
}
