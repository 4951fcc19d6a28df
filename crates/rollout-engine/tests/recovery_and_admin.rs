use std::time::Duration;

use rollout_adapters::{sample_desired_state, CallKind, Simulation, SIMULATED_API_ENDPOINT};
use rollout_core::{fingerprint, OrchestratorConfig};
use rollout_engine::{Orchestrator, Phase, RestartService, RolloutError};
use tokio_test::{assert_err, assert_ok};

const BACKUP: &str = "backup-2018-10-02T10-00-00";

async fn deployed(sim: &Simulation, config: OrchestratorConfig) -> Orchestrator {
    let orchestrator = sim.orchestrator(config);
    assert_ok!(orchestrator.deploy(&sample_desired_state()).await);
    orchestrator
}

async fn store_backup(sim: &Simulation, name: &str) {
    let container = OrchestratorConfig::default().backup_container;
    assert_ok!(sim.blobs.create_container_if_not_exists(&container).await);
    assert_ok!(sim.blobs.put(&container, name, b"etcd snapshot").await);
}

fn master_custom_data(sim: &Simulation) -> String {
    let document = sim.cloud.last_document().unwrap();
    document["resources"].as_array()
                         .unwrap()
                         .iter()
                         .find(|r| r["name"] == "ss-master")
                         .and_then(|r| r.pointer("/properties/virtualMachineProfile/osProfile/customData"))
                         .and_then(|v| v.as_str())
                         .unwrap()
                         .to_string()
}

#[tokio::test]
async fn restore_rebuilds_control_plane_and_clears_only_its_entries() {
    let sim = Simulation::new();
    let orchestrator = deployed(&sim, OrchestratorConfig::fast()).await;
    store_backup(&sim, BACKUP).await;
    let desired = sample_desired_state();

    let report = assert_ok!(orchestrator.etcd_restore(&desired, BACKUP).await);
    assert_eq!(report.scale_set, "ss-master");
    assert_eq!(report.cleared, 3);
    assert_eq!(report.instances, vec!["ss-master_0", "ss-master_1", "ss-master_2"]);
    assert_eq!(sim.cloud.calls_of(CallKind::DeleteScaleSet).len(), 1);
    assert!(master_custom_data(&sim).contains(&format!("RESTORE_FROM_BACKUP={BACKUP}")));

    let ledger = orchestrator.context().read_ledger().await.unwrap();
    assert_eq!(ledger.instances().filter(|(n, _)| n.starts_with("ss-master_")).count(), 0);
    assert_eq!(ledger.scale_set("ss-master"), None);
    let infra = fingerprint(desired.pool("infra").unwrap());
    assert!(ledger.is_current("ss-infra_0", &infra));
    assert_eq!(ledger.instances().count(), 4);

    // la próxima actualización vuelve a desplegar los masters restaurados
    let report = assert_ok!(orchestrator.update(&desired).await);
    assert_eq!(report.pool("master").unwrap().updated.len(), 3);
    assert!(report.pool("compute").unwrap().is_noop());
    assert!(!master_custom_data(&sim).contains("RESTORE_FROM_BACKUP"));
}

#[tokio::test]
async fn restore_from_missing_backup_touches_nothing() {
    let sim = Simulation::new();
    let orchestrator = deployed(&sim, OrchestratorConfig::fast()).await;
    store_backup(&sim, BACKUP).await;
    let before = sim.cloud.calls().len();

    let err = assert_err!(orchestrator.etcd_restore(&sample_desired_state(), "backup-does-not-exist").await);
    assert_eq!(err.phase(), Phase::ListBackups);
    assert_eq!(err.source, RolloutError::BackupNotFound("backup-does-not-exist".into()));
    assert_eq!(sim.cloud.calls().len(), before);
    assert_eq!(orchestrator.context().read_ledger().await.unwrap().instances().count(), 7);
}

#[tokio::test]
async fn backups_are_listed() {
    let sim = Simulation::new();
    let orchestrator = deployed(&sim, OrchestratorConfig::fast()).await;
    store_backup(&sim, BACKUP).await;

    let backups = assert_ok!(orchestrator.list_backups().await);
    assert_eq!(backups.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(), vec![BACKUP]);
}

#[tokio::test]
async fn health_is_polled_against_the_deployed_endpoint() {
    let sim = Simulation::new();
    sim.health.push_response(Ok(false));
    sim.health.push_response(Ok(false));
    let _orchestrator = deployed(&sim, OrchestratorConfig::fast()).await;

    let probed = sim.health.probed();
    assert_eq!(probed.len(), 3);
    assert_eq!(probed[0].hostname, "openshift.demo-cluster.example.com");
    assert_eq!(probed[0].dial, Some(SIMULATED_API_ENDPOINT.parse().unwrap()));
}

#[tokio::test]
async fn unexpected_health_status_fails_the_wait() {
    let sim = Simulation::new();
    sim.health.push_response(Err(RolloutError::UnexpectedStatus(403)));
    let orchestrator = sim.orchestrator(OrchestratorConfig::fast());

    let err = assert_err!(orchestrator.deploy(&sample_desired_state()).await);
    assert_eq!(err.phase(), Phase::WaitHealth);
    assert_eq!(err.source, RolloutError::UnexpectedStatus(403));
}

#[tokio::test]
async fn unhealthy_api_times_out() {
    let sim = Simulation::new();
    for _ in 0..1000 {
        sim.health.push_response(Ok(false));
    }
    let config = OrchestratorConfig { health_timeout: Duration::from_millis(30), ..OrchestratorConfig::fast() };
    let orchestrator = sim.orchestrator(config);

    let err = assert_err!(orchestrator.deploy(&sample_desired_state()).await);
    assert_eq!(err.phase(), Phase::WaitHealth);
    assert!(matches!(err.source, RolloutError::Timeout(..)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn cancelled_update_stops_at_the_first_wait() {
    let sim = Simulation::new();
    let orchestrator = deployed(&sim, OrchestratorConfig::fast()).await;
    let before = orchestrator.context().read_ledger().await.unwrap();

    orchestrator.cancellation_token().cancel();
    let desired = rollout_adapters::with_image_version(sample_desired_state(), "311.44.20181101");
    let err = assert_err!(orchestrator.update(&desired).await);
    assert_eq!(err.phase(), Phase::WaitHealth);
    assert!(matches!(err.source, RolloutError::Cancelled(_)));
    assert!(sim.cloud.calls_of(CallKind::Deallocate).is_empty());
    assert_eq!(orchestrator.context().read_ledger().await.unwrap(), before);
}

#[tokio::test]
async fn hostnames_resolve_case_insensitively() {
    let sim = Simulation::new();
    let orchestrator = deployed(&sim, OrchestratorConfig::fast()).await;
    let admin = orchestrator.admin();

    let all = assert_ok!(admin.list_hostnames().await);
    assert_eq!(all.len(), 7);
    assert_eq!(all[0].computer_name, "compute-000000");

    let master = assert_ok!(admin.instance_by_hostname("MASTER-000001").await);
    assert_eq!((master.scale_set.as_str(), master.instance_id.as_str()), ("ss-master", "1"));

    let err = assert_err!(admin.instance_by_hostname("nope-000000").await);
    assert_eq!(err.phase(), Phase::LookupInstance);
    assert!(matches!(err.source, RolloutError::UnknownHostname(_)));
}

#[tokio::test]
async fn admin_reimage_and_restart_target_one_instance() {
    let sim = Simulation::new();
    let orchestrator = deployed(&sim, OrchestratorConfig::fast()).await;
    let admin = orchestrator.admin();

    assert_ok!(admin.reimage(&sample_desired_state(), "infra-000001").await);
    let reimaged = sim.cloud.calls_of(CallKind::Reimage);
    assert_eq!(reimaged.len(), 1);
    assert_eq!((reimaged[0].scale_set.as_str(), reimaged[0].instance_id.as_deref()), ("ss-infra", Some("1")));
    assert_eq!(sim.cloud.calls_of(CallKind::Start).len(), 1);

    assert_ok!(admin.restart_service("compute-000000", RestartService::Kubelet).await);
    let commands = sim.cloud.calls_of(CallKind::RunCommand);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].scale_set, "ss-compute");
}

#[tokio::test]
async fn force_update_rolls_everything_again() {
    let sim = Simulation::new();
    let orchestrator = deployed(&sim, OrchestratorConfig::fast()).await;

    assert_ok!(orchestrator.admin().force_update().await);
    assert!(orchestrator.context().read_ledger().await.unwrap().is_empty());

    let report = assert_ok!(orchestrator.update(&sample_desired_state()).await);
    assert_eq!(report.pool("master").unwrap().updated.len(), 3);
    assert_eq!(report.pool("infra").unwrap().updated.len(), 2);
    assert_eq!(report.pool("compute").unwrap().updated.len(), 2);
}
