//! Reintento acotado ante conflictos de escritura.

use std::future::Future;
use std::time::Duration;

use log::warn;

use rollout_core::OrchestratorConfig;

use crate::errors::RolloutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Reintentos después del primer intento.
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self { retries: config.conflict_retries, backoff: config.conflict_backoff }
    }

    /// Ejecuta `op` y la repite mientras falle con un conflicto, hasta
    /// `retries` veces. Cualquier otro error se devuelve sin reintentar.
    pub async fn retry_on_conflict<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RolloutError>
        where F: FnMut() -> Fut,
              Fut: Future<Output = Result<T, RolloutError>>
    {
        let mut attempts = 0;
        loop {
            match op().await {
                Err(e) if e.is_conflict() && attempts < self.retries => {
                    attempts += 1;
                    warn!("{what}: conflict (attempt {attempts}/{}): {e} -> sleeping {:?}",
                          self.retries,
                          self.backoff);
                    tokio::time::sleep(self.backoff).await;
                }
                r => return r,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::ports::{KubeError, ProviderError};

    fn policy(retries: u32) -> RetryPolicy { RetryPolicy { retries, backoff: Duration::from_millis(1) } }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let out = policy(5).retry_on_conflict("cordon", || async {
                               match calls.fetch_add(1, Ordering::SeqCst) {
                                   0 | 1 => Err(KubeError::Conflict("node".into()).into()),
                                   _ => Ok(7),
                               }
                           })
                           .await;
        assert_eq!(out, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let out: Result<(), _> = policy(2).retry_on_conflict("capacity", || async {
                                              calls.fetch_add(1, Ordering::SeqCst);
                                              Err(ProviderError::InternalExecution("boom".into()).into())
                                          })
                                          .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let out: Result<(), _> = policy(5).retry_on_conflict("delete", || async {
                                              calls.fetch_add(1, Ordering::SeqCst);
                                              Err(ProviderError::NotFound("ss-x".into()).into())
                                          })
                                          .await;
        assert!(matches!(out, Err(RolloutError::Provider(ProviderError::NotFound(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
