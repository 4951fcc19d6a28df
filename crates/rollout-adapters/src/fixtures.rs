//! Estado deseado de ejemplo y arnés de simulación para tests y demo.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use rollout_core::{DesiredState, ImageReference, NetworkAttachment, OrchestratorConfig, PoolRole, ResourceDeclaration,
                   ScaleGroupDescriptor};
use rollout_engine::Orchestrator;
use rollout_ledger::{BlobStore, InMemoryBlobStore};

use crate::cloud::SimulatedCloud;
use crate::health::SimulatedHealth;
use crate::kube::SimulatedKube;

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
const RESOURCE_GROUP: &str = "demo-cluster";

fn network_id(path: &str) -> String {
    format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/{RESOURCE_GROUP}/providers/Microsoft.Network/{path}")
}

pub fn pool(name: &str, role: PoolRole, count: u32) -> ScaleGroupDescriptor {
    let backend = match role {
        PoolRole::ControlPlane => vec![network_id("loadBalancers/master-lb/backendAddressPools/masters")],
        PoolRole::Infra => vec![network_id("loadBalancers/router-lb/backendAddressPools/routers")],
        PoolRole::Compute => Vec::new(),
    };
    ScaleGroupDescriptor { name: name.to_string(),
                           role,
                           count,
                           vm_size: "Standard_D2s_v3".to_string(),
                           image: ImageReference { publisher: "RedHat".into(),
                                                   offer: "osa".into(),
                                                   sku: "osa_311".into(),
                                                   version: "311.43.20181002".into() },
                           startup_payload: format!("#cloud-config\nrole: {role}\n"),
                           network: NetworkAttachment { subnet_id: network_id("virtualNetworks/vnet/subnets/default"),
                                                        load_balancer_backend_pools: backend },
                           tags: BTreeMap::new() }
}

/// Cluster con 3 masters, 2 infra y 2 compute más su red.
pub fn sample_desired_state() -> DesiredState {
    let resources = vec![
        ResourceDeclaration::new("Microsoft.Network/virtualNetworks",
                                 "vnet",
                                 json!({ "addressSpace": { "addressPrefixes": ["10.0.0.0/8"] } })),
        ResourceDeclaration::new("Microsoft.Network/virtualNetworks/subnets",
                                 "vnet/default",
                                 json!({ "addressPrefix": "10.0.0.0/24" })),
        ResourceDeclaration::new("Microsoft.Network/publicIPAddresses",
                                 "master-ip",
                                 json!({ "publicIPAllocationMethod": "Static" })),
        ResourceDeclaration::new("Microsoft.Network/loadBalancers",
                                 "master-lb",
                                 json!({
                                     "frontendIPConfigurations": [{
                                         "name": "frontend",
                                         "properties": { "publicIPAddress": { "id": network_id("publicIPAddresses/master-ip") } },
                                     }],
                                     "backendAddressPools": [{ "name": "masters" }],
                                 })),
        ResourceDeclaration::new("Microsoft.Network/loadBalancers",
                                 "router-lb",
                                 json!({ "backendAddressPools": [{ "name": "routers" }] })),
    ];
    let resources = resources.into_iter().map(|r| r.with_location("eastus")).collect();
    DesiredState { subscription_id: SUBSCRIPTION.to_string(),
                   resource_group: RESOURCE_GROUP.to_string(),
                   location: "eastus".to_string(),
                   public_hostname: "openshift.demo-cluster.example.com".to_string(),
                   ca_bundle: None,
                   pools: vec![pool("master", PoolRole::ControlPlane, 3),
                               pool("infra", PoolRole::Infra, 2),
                               pool("compute", PoolRole::Compute, 2)],
                   resources }
}

/// Cambia la imagen de todos los pools (fuerza un rollout completo).
pub fn with_image_version(mut desired: DesiredState, version: &str) -> DesiredState {
    for pool in &mut desired.pools {
        pool.image.version = version.to_string();
    }
    desired
}

/// Proveedor, Kubernetes, health check y blob store simulados, listos para
/// armar un [`Orchestrator`].
#[derive(Clone)]
pub struct Simulation {
    pub kube: SimulatedKube,
    pub cloud: Arc<SimulatedCloud>,
    pub health: Arc<SimulatedHealth>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Default for Simulation {
    fn default() -> Self { Self::with_blobs(Arc::new(InMemoryBlobStore::new())) }
}

impl Simulation {
    pub fn new() -> Self { Self::default() }

    pub fn with_blobs(blobs: Arc<dyn BlobStore>) -> Self {
        let kube = SimulatedKube::new();
        kube.add_infra_services();
        let cloud = Arc::new(SimulatedCloud::new(kube.clone()));
        Self { kube, cloud, health: Arc::new(SimulatedHealth::new()), blobs }
    }

    pub fn orchestrator(&self, config: OrchestratorConfig) -> Orchestrator {
        Orchestrator::builder(self.cloud.clone(), self.cloud.clone(), Arc::new(self.kube.clone()), self.blobs.clone())
            .config(config)
            .health(self.health.clone())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_state_is_valid_and_compiles() {
        let desired = sample_desired_state();
        assert!(desired.validate().is_ok());
        let graph = rollout_core::compile_desired_state(&desired, &Default::default()).unwrap();
        // 5 recursos de red + 3 scale sets
        assert_eq!(graph.len(), 8);
        let master = graph.find(rollout_core::constants::SCALE_SET_TYPE, "ss-master").unwrap();
        assert!(master.depends_on.iter().any(|d| d.ends_with("loadBalancers/master-lb")));
        assert!(master.depends_on.iter().any(|d| d.ends_with("virtualNetworks/vnet")));
    }
}
