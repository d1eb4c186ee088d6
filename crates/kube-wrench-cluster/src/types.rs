//! Types for the cluster crate.

use std::path::PathBuf;
use std::time::Duration;

/// Default timeout applied to every cluster query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for ingress HTTP probes.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for cluster access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Explicit kubeconfig path. When unset, `KUBECONFIG`, `~/.kube/config`
    /// and in-cluster configuration are tried in that order.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one.
    pub context: Option<String>,
    /// Timeout applied to every query.
    pub query_timeout: Duration,
    /// Timeout for ingress HTTP probes.
    pub probe_timeout: Duration,
    /// Skip TLS verification of the API server certificate.
    pub insecure_skip_tls_verify: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            insecure_skip_tls_verify: false,
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `KUBE_WRENCH_KUBECONFIG`: kubeconfig path
    /// - `KUBE_WRENCH_CONTEXT`: kubeconfig context
    /// - `KUBE_WRENCH_QUERY_TIMEOUT_SECS`: per-query timeout
    /// - `KUBE_WRENCH_PROBE_TIMEOUT_SECS`: ingress probe timeout
    /// - `KUBE_WRENCH_INSECURE`: `true` to skip TLS verification
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("KUBE_WRENCH_KUBECONFIG") {
            config.kubeconfig = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_CONTEXT") {
            config.context = Some(val);
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_QUERY_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                config.query_timeout = Duration::from_secs(n);
            }
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_PROBE_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                config.probe_timeout = Duration::from_secs(n);
            }
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_INSECURE") {
            config.insecure_skip_tls_verify = matches!(val.to_lowercase().as_str(), "1" | "true");
        }

        config
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is zero.
    pub fn validate(&self) -> crate::Result<()> {
        if self.query_timeout.is_zero() {
            return Err(crate::ClusterError::Config(
                "query timeout must be greater than zero".to_string(),
            ));
        }
        if self.probe_timeout.is_zero() {
            return Err(crate::ClusterError::Config(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
