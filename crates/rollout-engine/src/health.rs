//! Health check HTTPS de la API del cluster.
//!
//! El certificado se valida contra la CA del cluster (sin raíces del
//! sistema) usando el hostname público como server name, aunque la conexión
//! se abra contra otra dirección (endpoint privado devuelto por el deploy).

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Certificate, StatusCode};

use rollout_core::DesiredState;

use crate::errors::RolloutError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEndpoint {
    pub hostname: String,
    /// Dirección a la que se conecta realmente; `None` => DNS del hostname.
    pub dial: Option<SocketAddr>,
    pub ca_pem: Option<String>,
}

impl HealthEndpoint {
    pub fn new(desired: &DesiredState, dial: Option<&str>) -> Self {
        let dial = dial.and_then(|raw| match raw.parse() {
                           Ok(addr) => Some(addr),
                           Err(_) => {
                               warn!("ignoring unparseable API endpoint {raw}; dialing {} directly",
                                     desired.public_hostname);
                               None
                           }
                       });
        Self { hostname: desired.public_hostname.clone(), dial, ca_pem: desired.ca_bundle.clone() }
    }

    pub fn url(&self) -> String { format!("https://{}/healthz", self.hostname) }
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// `Ok(true)` sano, `Ok(false)` todavía no (se reintenta), `Err` fallo
    /// definitivo.
    async fn probe(&self, endpoint: &HealthEndpoint) -> Result<bool, RolloutError>;
}

/// Implementación real sobre reqwest + rustls.
#[derive(Debug, Clone)]
pub struct HttpsHealthCheck {
    request_timeout: Duration,
}

impl Default for HttpsHealthCheck {
    fn default() -> Self { Self { request_timeout: Duration::from_secs(10) } }
}

impl HttpsHealthCheck {
    pub fn new(request_timeout: Duration) -> Self { Self { request_timeout } }

    fn client(&self, endpoint: &HealthEndpoint) -> Result<reqwest::Client, RolloutError> {
        let mut builder = reqwest::Client::builder().use_rustls_tls().timeout(self.request_timeout);
        if let Some(pem) = &endpoint.ca_pem {
            let ca = Certificate::from_pem(pem.as_bytes()).map_err(|e| RolloutError::Health(e.to_string()))?;
            builder = builder.tls_built_in_root_certs(false).add_root_certificate(ca);
        }
        if let Some(addr) = endpoint.dial {
            builder = builder.resolve(&endpoint.hostname, addr);
        }
        builder.build().map_err(|e| RolloutError::Health(e.to_string()))
    }
}

#[async_trait]
impl HealthCheck for HttpsHealthCheck {
    async fn probe(&self, endpoint: &HealthEndpoint) -> Result<bool, RolloutError> {
        let client = self.client(endpoint)?;
        match client.get(endpoint.url()).send().await {
            Ok(resp) => classify(resp.status()),
            Err(e) if e.is_timeout() || e.is_connect() => {
                debug!("health check {} not reachable yet: {e}", endpoint.url());
                Ok(false)
            }
            Err(e) => Err(RolloutError::Health(e.to_string())),
        }
    }
}

fn classify(status: StatusCode) -> Result<bool, RolloutError> {
    match status {
        StatusCode::OK => Ok(true),
        StatusCode::BAD_GATEWAY => Ok(false),
        other => Err(RolloutError::UnexpectedStatus(other.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ok_and_bad_gateway_are_expected() {
        assert_eq!(classify(StatusCode::OK), Ok(true));
        assert_eq!(classify(StatusCode::BAD_GATEWAY), Ok(false));
        assert_eq!(classify(StatusCode::FORBIDDEN), Err(RolloutError::UnexpectedStatus(403)));
    }

    #[test]
    fn endpoint_keeps_hostname_and_dials_private_address() {
        let ep = HealthEndpoint { hostname: "api.example.com".into(), dial: "10.0.0.1:443".parse().ok(), ca_pem: None };
        assert_eq!(ep.url(), "https://api.example.com/healthz");
        assert_eq!(ep.dial.map(|a| a.port()), Some(443));
    }
}
