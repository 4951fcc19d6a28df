//! Readiness prober.
//!
//! Toda espera larga del orquestador pasa por aquí: operaciones del
//! proveedor, nodos `Ready`, pods del control-plane y el health check de la
//! API. Cada espera respeta el timeout y el token de cancelación del
//! llamador; son los únicos puntos donde el flujo puede bloquearse.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use rollout_core::OrchestratorConfig;

use crate::errors::RolloutError;
use crate::health::{HealthCheck, HealthEndpoint};
use crate::ports::{ComputeClient, KubeClient, KubeError, OperationHandle, OperationStatus};

/// Intervalo entre sondeos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Se duplica en cada sondeo hasta `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        if config.max_poll_interval <= config.poll_interval {
            Backoff::Fixed(config.poll_interval)
        } else {
            Backoff::Exponential { initial: config.poll_interval, max: config.max_poll_interval }
        }
    }

    fn initial(&self) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { initial, .. } => initial,
        }
    }

    fn next(&self, current: Duration) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { max, .. } => (current * 2).min(max),
        }
    }
}

/// Bucle de sondeo con timeout y cancelación.
#[derive(Debug, Clone)]
pub struct Poller {
    backoff: Backoff,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(backoff: Backoff, cancel: CancellationToken) -> Self { Self { backoff, cancel } }

    /// Evalúa `check` de inmediato y luego tras cada intervalo hasta que
    /// devuelva `true`. Un `Err` de `check` corta la espera.
    pub async fn until<F, Fut>(&self, what: &str, timeout: Duration, mut check: F) -> Result<(), RolloutError>
        where F: FnMut() -> Fut,
              Fut: Future<Output = Result<bool, RolloutError>>
    {
        let deadline = Instant::now() + timeout;
        let mut delay = self.backoff.initial();
        loop {
            if self.cancel.is_cancelled() {
                return Err(RolloutError::Cancelled(what.to_string()));
            }
            if self.bounded(what, timeout, deadline, check()).await? {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(RolloutError::Timeout(timeout, what.to_string()));
            }
            debug!("{what}: not ready, next poll in {delay:?}");
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(RolloutError::Cancelled(what.to_string())),
                _ = tokio::time::sleep(delay.min(deadline - now)) => {}
            }
            delay = self.backoff.next(delay);
        }
    }

    /// Ejecuta una sola llamada con el mismo límite que una espera: corta
    /// con `Cancelled` o `Timeout` aunque la llamada nunca responda.
    pub async fn call<T, Fut>(&self, what: &str, timeout: Duration, call: Fut) -> Result<T, RolloutError>
        where Fut: Future<Output = Result<T, RolloutError>>
    {
        if self.cancel.is_cancelled() {
            return Err(RolloutError::Cancelled(what.to_string()));
        }
        self.bounded(what, timeout, Instant::now() + timeout, call).await
    }

    async fn bounded<T, Fut>(&self, what: &str, timeout: Duration, deadline: Instant, call: Fut)
                             -> Result<T, RolloutError>
        where Fut: Future<Output = Result<T, RolloutError>>
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(RolloutError::Cancelled(what.to_string())),
            out = tokio::time::timeout_at(deadline, call) => {
                out.map_err(|_| RolloutError::Timeout(timeout, what.to_string()))?
            }
        }
    }
}

/// Condición por la que se espera.
#[derive(Debug, Clone, Copy)]
pub enum ReadyTarget<'a> {
    /// Operación larga del proveedor terminada con éxito.
    Operation(&'a OperationHandle),
    /// Nodo con condición `Ready`.
    Node(&'a str),
    /// Nodo `Ready` y además los pods estáticos del control-plane
    /// (`<prefijo>-<nodo>` en kube-system) listos.
    ControlPlane(&'a str),
    Pods { namespace: &'a str, names: &'a [String] },
    Health(&'a HealthEndpoint),
}

impl ReadyTarget<'_> {
    fn describe(&self) -> String {
        match self {
            ReadyTarget::Operation(h) => format!("operation {h}"),
            ReadyTarget::Node(n) => format!("node {n}"),
            ReadyTarget::ControlPlane(n) => format!("control-plane node {n}"),
            ReadyTarget::Pods { namespace, names } => format!("pods {namespace}/{}", names.join(",")),
            ReadyTarget::Health(ep) => ep.url(),
        }
    }
}

#[derive(Clone)]
pub struct Prober {
    compute: Arc<dyn ComputeClient>,
    kube: Arc<dyn KubeClient>,
    health: Arc<dyn HealthCheck>,
    config: Arc<OrchestratorConfig>,
    poller: Poller,
}

impl Prober {
    pub fn new(compute: Arc<dyn ComputeClient>, kube: Arc<dyn KubeClient>, health: Arc<dyn HealthCheck>,
               config: Arc<OrchestratorConfig>, cancel: CancellationToken)
               -> Self {
        let poller = Poller::new(Backoff::from_config(&config), cancel);
        Self { compute, kube, health, config, poller }
    }

    pub fn poller(&self) -> &Poller { &self.poller }

    /// Timeout por defecto según el tipo de espera.
    pub fn default_timeout(&self, target: &ReadyTarget<'_>) -> Duration {
        match target {
            ReadyTarget::Operation(_) => self.config.operation_timeout,
            ReadyTarget::Health(_) => self.config.health_timeout,
            _ => self.config.ready_timeout,
        }
    }

    pub async fn wait(&self, target: ReadyTarget<'_>) -> Result<(), RolloutError> {
        let timeout = self.default_timeout(&target);
        self.wait_ready(target, timeout).await
    }

    pub async fn wait_ready(&self, target: ReadyTarget<'_>, timeout: Duration) -> Result<(), RolloutError> {
        let what = target.describe();
        self.poller.until(&what, timeout, || self.check(target)).await
    }

    async fn check(&self, target: ReadyTarget<'_>) -> Result<bool, RolloutError> {
        match target {
            ReadyTarget::Operation(handle) => match self.compute.operation_status(handle).await? {
                OperationStatus::InProgress => Ok(false),
                OperationStatus::Succeeded => Ok(true),
                OperationStatus::Failed(message) => {
                    Err(RolloutError::OperationFailed { operation: handle.to_string(), message })
                }
            },
            ReadyTarget::Node(node) => self.node_ready(node).await,
            ReadyTarget::ControlPlane(node) => {
                if !self.node_ready(node).await? {
                    return Ok(false);
                }
                let names: Vec<String> =
                    self.config.control_plane_pods.iter().map(|prefix| format!("{prefix}-{node}")).collect();
                self.pods_ready(&self.config.kube_system_namespace, &names).await
            }
            ReadyTarget::Pods { namespace, names } => self.pods_ready(namespace, names).await,
            ReadyTarget::Health(endpoint) => self.health.probe(endpoint).await,
        }
    }

    async fn node_ready(&self, node: &str) -> Result<bool, RolloutError> {
        match self.kube.get_node(node).await {
            Ok(status) => Ok(status.ready),
            // el nodo aparece cuando el kubelet se registra
            Err(KubeError::NotFound(_)) => Ok(false),
            Err(KubeError::Api(e)) => {
                debug!("node {node}: transient api error {e}");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn pods_ready(&self, namespace: &str, names: &[String]) -> Result<bool, RolloutError> {
        for name in names {
            match self.kube.get_pod(namespace, name).await {
                Ok(pod) if pod.ready => {}
                Ok(_) | Err(KubeError::NotFound(_)) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn exponential_backoff_is_capped() {
        let b = Backoff::Exponential { initial: Duration::from_millis(10), max: Duration::from_millis(25) };
        assert_eq!(b.next(b.initial()), Duration::from_millis(20));
        assert_eq!(b.next(Duration::from_millis(20)), Duration::from_millis(25));
        let fixed = Backoff::from_config(&OrchestratorConfig { max_poll_interval: Duration::from_secs(1),
                                                               ..OrchestratorConfig::default() });
        assert_eq!(fixed, Backoff::Fixed(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn poller_times_out() {
        let poller = Poller::new(Backoff::Fixed(Duration::from_secs(1)), CancellationToken::new());
        let calls = AtomicU32::new(0);
        let out = poller.until("never", Duration::from_secs(5), || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(false)
                        })
                        .await;
        assert!(matches!(out, Err(RolloutError::Timeout(d, _)) if d == Duration::from_secs(5)));
        assert!(calls.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_stops_on_cancellation() {
        let cancel = CancellationToken::new();
        let poller = Poller::new(Backoff::Fixed(Duration::from_secs(1)), cancel.clone());
        let calls = AtomicU32::new(0);
        let out = poller.until("slow", Duration::from_secs(60), || {
                            if calls.fetch_add(1, Ordering::SeqCst) == 2 {
                                cancel.cancel();
                            }
                            async { Ok(false) }
                        })
                        .await;
        assert_eq!(out, Err(RolloutError::Cancelled("slow".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_check_still_honours_cancellation() {
        let cancel = CancellationToken::new();
        let poller = Poller::new(Backoff::Fixed(Duration::from_secs(1)), cancel.clone());
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let out = tokio::time::timeout(Duration::from_secs(3600),
                                       poller.until("node", Duration::from_secs(5), || async {
                                                 std::future::pending::<()>().await;
                                                 Ok(true)
                                             }))
                  .await;
        assert!(matches!(out, Ok(Err(RolloutError::Cancelled(ref w))) if w == "node"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_check_times_out_at_the_deadline() {
        let poller = Poller::new(Backoff::Fixed(Duration::from_secs(1)), CancellationToken::new());
        let started = Instant::now();
        let out = poller.until("node", Duration::from_secs(5), || async {
                            std::future::pending::<()>().await;
                            Ok(true)
                        })
                        .await;
        assert!(matches!(out, Err(RolloutError::Timeout(d, _)) if d == Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_is_bounded() {
        let poller = Poller::new(Backoff::Fixed(Duration::from_secs(1)), CancellationToken::new());
        let out: Result<(), _> = poller.call("begin deallocate", Duration::from_secs(30), std::future::pending()).await;
        assert!(matches!(out, Err(RolloutError::Timeout(..))));
    }

    #[tokio::test]
    async fn check_errors_abort_the_wait() {
        let poller = Poller::new(Backoff::Fixed(Duration::from_millis(1)), CancellationToken::new());
        let out = poller.until("op", Duration::from_secs(1), || async { Err(RolloutError::UnexpectedStatus(500)) })
                        .await;
        assert_eq!(out, Err(RolloutError::UnexpectedStatus(500)));
    }
}
