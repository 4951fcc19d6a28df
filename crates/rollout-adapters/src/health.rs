use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use rollout_engine::{HealthCheck, HealthEndpoint, RolloutError};

#[derive(Default)]
struct HealthState {
    scripted: VecDeque<Result<bool, RolloutError>>,
    probed: Vec<HealthEndpoint>,
}

/// Health check simulado: devuelve las respuestas encoladas y, cuando se
/// acaban, "sano".
#[derive(Default)]
pub struct SimulatedHealth {
    state: Mutex<HealthState>,
}

impl SimulatedHealth {
    pub fn new() -> Self { Self::default() }

    fn state(&self) -> MutexGuard<'_, HealthState> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    pub fn push_response(&self, response: Result<bool, RolloutError>) { self.state().scripted.push_back(response); }

    /// Endpoints sondeados, en orden.
    pub fn probed(&self) -> Vec<HealthEndpoint> { self.state().probed.clone() }
}

#[async_trait]
impl HealthCheck for SimulatedHealth {
    async fn probe(&self, endpoint: &HealthEndpoint) -> Result<bool, RolloutError> {
        let mut st = self.state();
        st.probed.push(endpoint.clone());
        st.scripted.pop_front().unwrap_or(Ok(true))
    }
}
