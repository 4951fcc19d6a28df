//! Kubernetes simulado en memoria.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use rollout_core::constants::{CONTROL_PLANE_PODS, INFRA_NAMESPACE, INFRA_PODS, KUBE_SYSTEM_NAMESPACE};
use rollout_core::PoolRole;
use rollout_engine::{KubeClient, KubeError, NodeStatus, PodInfo};

/// Escrituras recibidas por la API simulada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KubeCall {
    SetUnschedulable { node: String, unschedulable: bool },
    DeleteNode(String),
    DeletePod { namespace: String, name: String },
}

#[derive(Default)]
struct KubeState {
    nodes: BTreeMap<String, NodeStatus>,
    pods: BTreeMap<(String, String), PodInfo>,
    calls: Vec<KubeCall>,
    pending_conflicts: u32,
}

#[derive(Clone, Default)]
pub struct SimulatedKube {
    state: Arc<Mutex<KubeState>>,
}

impl SimulatedKube {
    pub fn new() -> Self { Self::default() }

    fn state(&self) -> MutexGuard<'_, KubeState> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    /// Registra un nodo `Ready` con los pods que tendría según su rol:
    /// pods estáticos del control-plane, o un DaemonSet y una carga normal.
    pub fn register_node(&self, node: &str, role: PoolRole) {
        let mut st = self.state();
        st.nodes.insert(node.to_string(), NodeStatus { name: node.to_string(), ready: true, unschedulable: false });
        let pods: Vec<PodInfo> = match role {
            PoolRole::ControlPlane => CONTROL_PLANE_PODS.iter()
                                                        .map(|prefix| pod(KUBE_SYSTEM_NAMESPACE, &format!("{prefix}-{node}"), node, true, None))
                                                        .collect(),
            PoolRole::Infra | PoolRole::Compute => {
                vec![pod(KUBE_SYSTEM_NAMESPACE, &format!("sdn-{node}"), node, false, Some("DaemonSet")),
                     pod("default", &format!("app-{node}"), node, false, Some("ReplicaSet"))]
            }
        };
        for p in pods {
            st.pods.insert((p.namespace.clone(), p.name.clone()), p);
        }
    }

    /// Pod de un servicio sin nodo fijo; ningún drain lo desaloja.
    pub fn add_pod(&self, namespace: &str, name: &str, ready: bool) {
        let p = PodInfo { ready, ..pod(namespace, name, "", false, Some("Deployment")) };
        self.state().pods.insert((p.namespace.clone(), p.name.clone()), p);
    }

    /// Router y registry listos, como los deja un cluster sano.
    pub fn add_infra_services(&self) {
        for name in INFRA_PODS {
            self.add_pod(INFRA_NAMESPACE, name, true);
        }
    }

    pub fn set_pod_ready(&self, namespace: &str, name: &str, ready: bool) {
        if let Some(p) = self.state().pods.get_mut(&(namespace.to_string(), name.to_string())) {
            p.ready = ready;
        }
    }

    pub fn set_ready(&self, node: &str, ready: bool) {
        if let Some(n) = self.state().nodes.get_mut(node) {
            n.ready = ready;
        }
    }

    /// La máquina desapareció: se van el nodo y sus pods.
    pub fn remove_node(&self, node: &str) {
        let mut st = self.state();
        st.nodes.remove(node);
        st.pods.retain(|_, p| p.node_name != node);
    }

    /// Los próximos `n` cordons fallan con `Conflict`.
    pub fn inject_conflicts(&self, n: u32) { self.state().pending_conflicts = n; }

    pub fn node(&self, name: &str) -> Option<NodeStatus> { self.state().nodes.get(name).cloned() }

    pub fn node_names(&self) -> Vec<String> { self.state().nodes.keys().cloned().collect() }

    pub fn calls(&self) -> Vec<KubeCall> { self.state().calls.clone() }

    pub fn deleted_nodes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                KubeCall::DeleteNode(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

fn pod(namespace: &str, name: &str, node: &str, mirror: bool, owner_kind: Option<&str>) -> PodInfo {
    PodInfo { namespace: namespace.to_string(),
              name: name.to_string(),
              uid: Uuid::new_v4().to_string(),
              node_name: node.to_string(),
              ready: true,
              mirror,
              owner_kind: owner_kind.map(str::to_string),
              grace_period_seconds: Some(0) }
}

#[async_trait]
impl KubeClient for SimulatedKube {
    async fn get_node(&self, name: &str) -> Result<NodeStatus, KubeError> {
        self.state().nodes.get(name).cloned().ok_or_else(|| KubeError::NotFound(format!("node {name}")))
    }

    async fn set_unschedulable(&self, name: &str, unschedulable: bool) -> Result<(), KubeError> {
        let mut st = self.state();
        st.calls.push(KubeCall::SetUnschedulable { node: name.to_string(), unschedulable });
        if st.pending_conflicts > 0 {
            st.pending_conflicts -= 1;
            return Err(KubeError::Conflict(format!("node {name} was modified")));
        }
        match st.nodes.get_mut(name) {
            Some(n) => {
                n.unschedulable = unschedulable;
                Ok(())
            }
            None => Err(KubeError::NotFound(format!("node {name}"))),
        }
    }

    async fn delete_node(&self, name: &str) -> Result<(), KubeError> {
        let mut st = self.state();
        st.calls.push(KubeCall::DeleteNode(name.to_string()));
        st.nodes.remove(name).map(drop).ok_or_else(|| KubeError::NotFound(format!("node {name}")))
    }

    async fn list_pods_on_node(&self, node: &str) -> Result<Vec<PodInfo>, KubeError> {
        Ok(self.state().pods.values().filter(|p| p.node_name == node).cloned().collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo, KubeError> {
        self.state()
            .pods
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| KubeError::NotFound(format!("pod {namespace}/{name}")))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), KubeError> {
        let mut st = self.state();
        st.calls.push(KubeCall::DeletePod { namespace: namespace.to_string(), name: name.to_string() });
        st.pods
          .remove(&(namespace.to_string(), name.to_string()))
          .map(drop)
          .ok_or_else(|| KubeError::NotFound(format!("pod {namespace}/{name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cordon_conflicts_are_injected_then_cleared() {
        let kube = SimulatedKube::new();
        kube.register_node("compute-000000", PoolRole::Compute);
        kube.inject_conflicts(1);
        assert!(matches!(kube.set_unschedulable("compute-000000", true).await, Err(KubeError::Conflict(_))));
        assert!(kube.set_unschedulable("compute-000000", true).await.is_ok());
        assert_eq!(kube.node("compute-000000").map(|n| n.unschedulable), Some(true));
    }

    #[tokio::test]
    async fn control_plane_nodes_carry_static_pods() {
        let kube = SimulatedKube::new();
        kube.register_node("master-000000", PoolRole::ControlPlane);
        let pods = kube.list_pods_on_node("master-000000").await.unwrap();
        assert_eq!(pods.len(), 3);
        assert!(pods.iter().all(|p| p.mirror && !p.is_evictable()));
    }

    #[tokio::test]
    async fn service_pods_survive_node_removal() {
        let kube = SimulatedKube::new();
        kube.register_node("infra-000000", PoolRole::Infra);
        kube.add_infra_services();
        kube.set_pod_ready("default", "router", false);
        kube.remove_node("infra-000000");

        let router = kube.get_pod("default", "router").await.unwrap();
        assert!(!router.ready);
        assert!(router.node_name.is_empty());
        assert!(kube.get_pod("default", "docker-registry").await.unwrap().ready);
        assert!(matches!(kube.get_pod("default", "app-infra-000000").await, Err(KubeError::NotFound(_))));
    }
}
