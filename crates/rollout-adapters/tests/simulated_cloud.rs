use rollout_adapters::{sample_desired_state, CallKind, Failure, SimulatedCloud, SimulatedKube};
use rollout_core::compile_desired_state;
use rollout_engine::{ComputeClient, Deployer, OperationStatus, ProviderError};
use tokio_test::{assert_err, assert_ok};

fn document() -> serde_json::Value {
    compile_desired_state(&sample_desired_state(), &Default::default()).unwrap().to_document()
}

#[tokio::test]
async fn deploy_creates_scale_sets_and_registers_nodes() {
    let kube = SimulatedKube::new();
    let cloud = SimulatedCloud::new(kube.clone());

    let out = assert_ok!(cloud.deploy("demo-cluster", &document()).await);
    assert_eq!(out.endpoint.as_deref(), Some("10.0.0.1:443"));
    assert_eq!(cloud.instance_count("ss-master"), 3);
    assert_eq!(kube.node_names().len(), 7);

    let instances = assert_ok!(cloud.list_instances("ss-infra").await);
    assert_eq!(instances.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(), vec!["ss-infra_0", "ss-infra_1"]);
    assert_eq!(instances[1].computer_name, "infra-000001");
}

#[tokio::test]
async fn operations_finish_after_the_configured_polls() {
    let cloud = SimulatedCloud::new(SimulatedKube::new()).with_polls_per_operation(2);
    assert_ok!(cloud.deploy("demo-cluster", &document()).await);

    let handle = assert_ok!(cloud.begin_deallocate("ss-master", "0").await);
    assert_eq!(cloud.operation_status(&handle).await, Ok(OperationStatus::InProgress));
    assert_eq!(cloud.operation_status(&handle).await, Ok(OperationStatus::InProgress));
    assert_eq!(cloud.operation_status(&handle).await, Ok(OperationStatus::Succeeded));
    assert_eq!(cloud.max_control_plane_down(), 1);
}

#[tokio::test]
async fn injected_failures_skip_then_fire_once() {
    let cloud = SimulatedCloud::new(SimulatedKube::new()).with_polls_per_operation(0);
    assert_ok!(cloud.deploy("demo-cluster", &document()).await);
    cloud.fail_nth(CallKind::Start, 1, Failure::Reject(ProviderError::Throttled("busy".into())));

    assert_ok!(cloud.begin_start("ss-compute", "0").await);
    assert_eq!(assert_err!(cloud.begin_start("ss-compute", "1").await), ProviderError::Throttled("busy".into()));
    assert_ok!(cloud.begin_start("ss-compute", "1").await);
    assert_eq!(cloud.calls_of(CallKind::Start).len(), 3);
}

#[tokio::test]
async fn unknown_instances_are_not_found() {
    let cloud = SimulatedCloud::new(SimulatedKube::new());
    assert_ok!(cloud.deploy("demo-cluster", &document()).await);

    assert!(matches!(cloud.begin_reimage("ss-master", "9").await, Err(ProviderError::NotFound(_))));
    assert!(matches!(cloud.list_instances("ss-missing").await, Err(ProviderError::NotFound(_))));
}
