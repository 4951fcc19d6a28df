//! Proveedor cloud simulado: API de cómputo + API de despliegue.
//!
//! Cada scale set guarda un "modelo" (hash del perfil de VM renderizado) y
//! cada instancia el modelo que tiene aplicado. Las mutaciones surten efecto
//! al emitirse y la operación termina tras `polls_per_operation` sondeos.
//! Todas las mutaciones quedan registradas en orden para las aserciones.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use uuid::Uuid;

use rollout_core::constants::{ROLE_TAG, SCALE_SET_TYPE};
use rollout_core::hashing::hash_value;
use rollout_core::{names, InstanceRecord, PoolRole};
use rollout_engine::{ComputeClient, DeployOutput, Deployer, OperationHandle, OperationStatus, ProviderError,
                     ScaleSetInfo};

use crate::kube::SimulatedKube;

pub const SIMULATED_API_ENDPOINT: &str = "10.0.0.1:443";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Deploy,
    SetCapacity,
    Deallocate,
    UpdateInstance,
    Reimage,
    Start,
    DeleteInstance,
    DeleteScaleSet,
    RunCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub kind: CallKind,
    pub scale_set: String,
    pub instance_id: Option<String>,
}

/// Fallo a inyectar en la próxima llamada de un tipo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// La llamada falla al emitirse.
    Reject(ProviderError),
    /// La llamada se acepta pero la operación termina en `Failed`.
    Operation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Power {
    Running,
    Deallocated,
}

#[derive(Debug, Clone)]
struct SimInstance {
    computer_name: String,
    power: Power,
    model: String,
}

#[derive(Debug, Clone)]
struct SimScaleSet {
    role: PoolRole,
    pool: String,
    vm_size: String,
    model: String,
    next_id: u64,
    instances: BTreeMap<u64, SimInstance>,
}

#[derive(Debug)]
struct SimOperation {
    remaining: u32,
    outcome: Result<(), String>,
}

#[derive(Default)]
struct CloudState {
    scale_sets: BTreeMap<String, SimScaleSet>,
    operations: HashMap<String, SimOperation>,
    calls: Vec<ProviderCall>,
    /// (tipo, llamadas a dejar pasar antes de fallar, fallo)
    failures: Vec<(CallKind, u32, Failure)>,
    last_document: Option<Value>,
    max_control_plane_down: usize,
    min_running: BTreeMap<String, usize>,
}

pub struct SimulatedCloud {
    state: Mutex<CloudState>,
    kube: SimulatedKube,
    polls_per_operation: u32,
}

impl SimulatedCloud {
    pub fn new(kube: SimulatedKube) -> Self {
        Self { state: Mutex::new(CloudState::default()), kube, polls_per_operation: 1 }
    }

    pub fn with_polls_per_operation(mut self, polls: u32) -> Self {
        self.polls_per_operation = polls;
        self
    }

    fn state(&self) -> MutexGuard<'_, CloudState> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    /// La próxima llamada de tipo `kind` falla como indica `failure`.
    pub fn fail_next(&self, kind: CallKind, failure: Failure) { self.fail_nth(kind, 0, failure) }

    /// Deja pasar `skip` llamadas de tipo `kind` y hace fallar la siguiente.
    pub fn fail_nth(&self, kind: CallKind, skip: u32, failure: Failure) {
        self.state().failures.push((kind, skip, failure));
    }

    pub fn calls(&self) -> Vec<ProviderCall> { self.state().calls.clone() }

    pub fn calls_of(&self, kind: CallKind) -> Vec<ProviderCall> {
        self.state().calls.iter().filter(|c| c.kind == kind).cloned().collect()
    }

    /// Mutaciones emitidas hasta ahora (incluye deploys).
    pub fn mutation_count(&self) -> usize { self.state().calls.len() }

    pub fn last_document(&self) -> Option<Value> { self.state().last_document.clone() }

    pub fn scale_set_model(&self, scale_set: &str) -> Option<String> {
        self.state().scale_sets.get(scale_set).map(|ss| ss.model.clone())
    }

    /// Modelo aplicado a cada instancia del scale set, por computer name.
    pub fn instance_models(&self, scale_set: &str) -> BTreeMap<String, String> {
        self.state()
            .scale_sets
            .get(scale_set)
            .map(|ss| ss.instances.values().map(|i| (i.computer_name.clone(), i.model.clone())).collect())
            .unwrap_or_default()
    }

    pub fn instance_count(&self, scale_set: &str) -> usize {
        self.state().scale_sets.get(scale_set).map(|ss| ss.instances.len()).unwrap_or(0)
    }

    /// Máximo de instancias del control-plane desasignadas a la vez.
    pub fn max_control_plane_down(&self) -> usize { self.state().max_control_plane_down }

    /// Mínimo de instancias encendidas observado por scale set desde el
    /// último [`reset_observations`](Self::reset_observations).
    pub fn min_running(&self, scale_set: &str) -> Option<usize> { self.state().min_running.get(scale_set).copied() }

    pub fn reset_observations(&self) {
        let mut st = self.state();
        st.max_control_plane_down = 0;
        st.min_running = running_counts(&st);
    }

    /// Inicio de una mutación: registra la llamada y consume un fallo
    /// inyectado si lo hay.
    fn record(&self, st: &mut CloudState, kind: CallKind, scale_set: &str, instance_id: Option<&str>)
              -> Result<Result<(), String>, ProviderError> {
        st.calls.push(ProviderCall { kind, scale_set: scale_set.to_string(), instance_id: instance_id.map(str::to_string) });
        let Some(idx) = st.failures.iter().position(|(k, _, _)| *k == kind) else {
            return Ok(Ok(()));
        };
        if st.failures[idx].1 > 0 {
            st.failures[idx].1 -= 1;
            return Ok(Ok(()));
        }
        match st.failures.remove(idx).2 {
            Failure::Reject(e) => Err(e),
            Failure::Operation(msg) => Ok(Err(msg)),
        }
    }

    fn operation(&self, st: &mut CloudState, description: String, outcome: Result<(), String>) -> OperationHandle {
        let id = Uuid::new_v4().to_string();
        st.operations.insert(id.clone(), SimOperation { remaining: self.polls_per_operation, outcome });
        OperationHandle { id, description }
    }

    /// Mutación sobre una instancia existente.
    fn mutate_instance(&self, kind: CallKind, scale_set: &str, instance_id: &str,
                       effect: impl FnOnce(&mut SimScaleSet, u64, &SimulatedKube))
                       -> Result<OperationHandle, ProviderError> {
        let mut st = self.state();
        let outcome = self.record(&mut st, kind, scale_set, Some(instance_id))?;
        let id: u64 = instance_id.parse().map_err(|_| ProviderError::NotFound(format!("{scale_set}/{instance_id}")))?;
        let ss = st.scale_sets
                   .get_mut(scale_set)
                   .filter(|ss| ss.instances.contains_key(&id))
                   .ok_or_else(|| ProviderError::NotFound(format!("{scale_set}/{instance_id}")))?;
        if outcome.is_ok() {
            effect(ss, id, &self.kube);
        }
        observe(&mut st);
        Ok(self.operation(&mut st, format!("{kind:?} {scale_set}/{instance_id}"), outcome))
    }
}

impl SimScaleSet {
    fn add_instance(&mut self, kube: &SimulatedKube) {
        let id = self.next_id;
        self.next_id += 1;
        let computer_name = names::computer_name(&self.pool, id);
        kube.register_node(&computer_name.to_lowercase(), self.role);
        self.instances.insert(id, SimInstance { computer_name, power: Power::Running, model: self.model.clone() });
    }

    fn remove_instance(&mut self, id: u64, kube: &SimulatedKube) {
        if let Some(instance) = self.instances.remove(&id) {
            kube.remove_node(&instance.computer_name.to_lowercase());
        }
    }

    /// Ajusta a `capacity`: crece con ids nuevos, encoge quitando los más
    /// altos.
    fn resize(&mut self, capacity: usize, kube: &SimulatedKube) {
        while self.instances.len() < capacity {
            self.add_instance(kube);
        }
        while self.instances.len() > capacity {
            if let Some(&id) = self.instances.keys().next_back() {
                self.remove_instance(id, kube);
            }
        }
    }
}

fn running_counts(st: &CloudState) -> BTreeMap<String, usize> {
    st.scale_sets
      .iter()
      .map(|(name, ss)| (name.clone(), ss.instances.values().filter(|i| i.power == Power::Running).count()))
      .collect()
}

fn observe(st: &mut CloudState) {
    let down = st.scale_sets
                 .values()
                 .filter(|ss| ss.role.is_control_plane())
                 .flat_map(|ss| ss.instances.values())
                 .filter(|i| i.power != Power::Running)
                 .count();
    st.max_control_plane_down = st.max_control_plane_down.max(down);
    for (name, running) in running_counts(st) {
        let min = st.min_running.entry(name).or_insert(running);
        *min = (*min).min(running);
    }
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter().try_fold(value, |v, key| v.get(*key)).and_then(Value::as_str)
}

#[async_trait]
impl Deployer for SimulatedCloud {
    async fn deploy(&self, resource_group: &str, document: &Value) -> Result<DeployOutput, ProviderError> {
        let mut st = self.state();
        if let Err(msg) = self.record(&mut st, CallKind::Deploy, resource_group, None)? {
            return Err(ProviderError::Request(msg));
        }
        let resources = document.get("resources").and_then(Value::as_array).cloned().unwrap_or_default();
        for resource in resources.iter().filter(|r| str_at(r, &["type"]) == Some(SCALE_SET_TYPE)) {
            let name = str_at(resource, &["name"]).ok_or_else(|| ProviderError::Request("scale set without name".into()))?;
            let role: PoolRole = str_at(resource, &["tags", ROLE_TAG]).unwrap_or_default()
                                                                    .parse()
                                                                    .map_err(|e| ProviderError::Request(format!("{name}: {e}")))?;
            let vm_size = str_at(resource, &["sku", "name"]).unwrap_or_default().to_string();
            let capacity = resource.pointer("/sku/capacity").and_then(Value::as_u64).unwrap_or(0) as usize;
            let profile = resource.pointer("/properties/virtualMachineProfile").cloned().unwrap_or(Value::Null);
            let model = hash_value(&serde_json::json!({ "profile": profile, "vmSize": vm_size }));
            let pool = names::pool_from_scale_set(name).unwrap_or(name).to_string();

            let ss = st.scale_sets.entry(name.to_string()).or_insert_with(|| SimScaleSet { role,
                                                                                       pool,
                                                                                       vm_size: vm_size.clone(),
                                                                                       model: model.clone(),
                                                                                       next_id: 0,
                                                                                       instances: BTreeMap::new() });
            ss.role = role;
            ss.vm_size = vm_size;
            ss.model = model;
            ss.resize(capacity, &self.kube);
            debug!("deployed {name}: capacity {capacity}");
        }
        st.last_document = Some(document.clone());
        observe(&mut st);
        Ok(DeployOutput { endpoint: Some(SIMULATED_API_ENDPOINT.to_string()) })
    }
}

#[async_trait]
impl ComputeClient for SimulatedCloud {
    async fn list_scale_sets(&self) -> Result<Vec<ScaleSetInfo>, ProviderError> {
        Ok(self.state()
               .scale_sets
               .iter()
               .map(|(name, ss)| ScaleSetInfo { name: name.clone(),
                                                capacity: ss.instances.len() as u32,
                                                vm_size: ss.vm_size.clone() })
               .collect())
    }

    async fn list_instances(&self, scale_set: &str) -> Result<Vec<InstanceRecord>, ProviderError> {
        let st = self.state();
        let ss = st.scale_sets.get(scale_set).ok_or_else(|| ProviderError::NotFound(scale_set.to_string()))?;
        Ok(ss.instances
             .iter()
             .map(|(id, i)| InstanceRecord { instance_id: id.to_string(),
                                             name: names::instance_name(scale_set, &id.to_string()),
                                             computer_name: i.computer_name.clone() })
             .collect())
    }

    async fn begin_set_capacity(&self, scale_set: &str, capacity: u32) -> Result<OperationHandle, ProviderError> {
        let mut st = self.state();
        let outcome = self.record(&mut st, CallKind::SetCapacity, scale_set, None)?;
        let ss = st.scale_sets.get_mut(scale_set).ok_or_else(|| ProviderError::NotFound(scale_set.to_string()))?;
        if outcome.is_ok() {
            ss.resize(capacity as usize, &self.kube);
        }
        observe(&mut st);
        Ok(self.operation(&mut st, format!("set capacity {scale_set}={capacity}"), outcome))
    }

    async fn begin_deallocate(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError> {
        self.mutate_instance(CallKind::Deallocate, scale_set, instance_id, |ss, id, kube| {
                if let Some(i) = ss.instances.get_mut(&id) {
                    i.power = Power::Deallocated;
                    kube.set_ready(&i.computer_name.to_lowercase(), false);
                }
            })
    }

    async fn begin_update_instance(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError> {
        self.mutate_instance(CallKind::UpdateInstance, scale_set, instance_id, |ss, id, _| {
                let model = ss.model.clone();
                if let Some(i) = ss.instances.get_mut(&id) {
                    i.model = model;
                }
            })
    }

    async fn begin_reimage(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError> {
        self.mutate_instance(CallKind::Reimage, scale_set, instance_id, |ss, id, kube| {
                if let Some(i) = ss.instances.get(&id) {
                    kube.set_ready(&i.computer_name.to_lowercase(), false);
                }
            })
    }

    async fn begin_start(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError> {
        self.mutate_instance(CallKind::Start, scale_set, instance_id, |ss, id, kube| {
                let role = ss.role;
                if let Some(i) = ss.instances.get_mut(&id) {
                    i.power = Power::Running;
                    kube.register_node(&i.computer_name.to_lowercase(), role);
                }
            })
    }

    async fn begin_delete_instance(&self, scale_set: &str, instance_id: &str) -> Result<OperationHandle, ProviderError> {
        self.mutate_instance(CallKind::DeleteInstance, scale_set, instance_id, |ss, id, kube| {
                ss.remove_instance(id, kube)
            })
    }

    async fn begin_delete_scale_set(&self, scale_set: &str) -> Result<OperationHandle, ProviderError> {
        let mut st = self.state();
        let outcome = self.record(&mut st, CallKind::DeleteScaleSet, scale_set, None)?;
        if outcome.is_ok() {
            let mut ss = st.scale_sets.remove(scale_set).ok_or_else(|| ProviderError::NotFound(scale_set.to_string()))?;
            let ids: Vec<u64> = ss.instances.keys().copied().collect();
            for id in ids {
                ss.remove_instance(id, &self.kube);
            }
            st.min_running.remove(scale_set);
        }
        Ok(self.operation(&mut st, format!("delete {scale_set}"), outcome))
    }

    async fn begin_run_command(&self, scale_set: &str, instance_id: &str, script: &str)
                               -> Result<OperationHandle, ProviderError> {
        debug!("run-command on {scale_set}/{instance_id}: {script}");
        self.mutate_instance(CallKind::RunCommand, scale_set, instance_id, |_, _, _| {})
    }

    async fn operation_status(&self, handle: &OperationHandle) -> Result<OperationStatus, ProviderError> {
        let mut st = self.state();
        let op = st.operations.get_mut(&handle.id).ok_or_else(|| ProviderError::NotFound(handle.id.clone()))?;
        if op.remaining > 0 {
            op.remaining -= 1;
            return Ok(OperationStatus::InProgress);
        }
        Ok(match &op.outcome {
            Ok(()) => OperationStatus::Succeeded,
            Err(msg) => OperationStatus::Failed(msg.clone()),
        })
    }
}
