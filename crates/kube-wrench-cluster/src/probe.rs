//! HTTP reachability probes for ingress paths.

use async_trait::async_trait;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::types::ClusterConfig;
use crate::Result;

/// Result of a single HTTP probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered with this status code.
    Status(u16),
    /// The request failed before any status was received.
    Failed(String),
}

/// Issues a single GET against a URI.
#[async_trait]
pub trait IngressProber: Send + Sync {
    /// Probe a URI. Redirects are not followed.
    async fn probe(&self, uri: &str) -> ProbeOutcome;
}

/// [`IngressProber`] backed by a `reqwest` client.
pub struct HttpProber {
    http_client: reqwest::Client,
}

impl HttpProber {
    /// Create a prober using the probe timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClusterConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify)
            .build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl IngressProber for HttpProber {
    async fn probe(&self, uri: &str) -> ProbeOutcome {
        match self.http_client.get(uri).send().await {
            Ok(resp) => {
                debug!(uri, status = %resp.status(), "Probe answered");
                ProbeOutcome::Status(resp.status().as_u16())
            }
            Err(e) => {
                debug!(uri, error = %e, "Probe failed");
                ProbeOutcome::Failed(e.to_string())
            }
        }
    }
}
