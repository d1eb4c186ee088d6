//! Scan configuration.

use crate::error::{DiagnoseError, Result};

/// Restart count above which a crash-looping container gets its logs tailed.
pub const DEFAULT_CRASH_LOOP_RESTARTS: u32 = 2;

/// Number of log lines attached to a crash-loop finding.
pub const DEFAULT_LOG_TAIL_LINES: i64 = 10;

/// Configuration for a diagnosis pass.
///
/// Per-query timeouts belong to the cluster layer, see
/// [`ClusterConfig`](kube_wrench_cluster::ClusterConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Namespaces diagnosed at the same time.
    pub namespace_concurrency: usize,
    /// Pods diagnosed at the same time within one namespace.
    pub pod_concurrency: usize,
    /// Log lines fetched for crash-looping containers.
    pub log_tail_lines: i64,
    /// Restart count a crash-looping container must exceed before its logs
    /// are fetched.
    pub crash_loop_restarts: u32,
    /// Attach warning events to non-running pods.
    pub events: bool,
    /// Correlate running pods with services and probe their ingresses.
    pub network: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            namespace_concurrency: 4,
            pod_concurrency: 8,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            crash_loop_restarts: DEFAULT_CRASH_LOOP_RESTARTS,
            events: true,
            network: false,
        }
    }
}

impl ScanConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `KUBE_WRENCH_NAMESPACE_CONCURRENCY`
    /// - `KUBE_WRENCH_POD_CONCURRENCY`
    /// - `KUBE_WRENCH_LOG_TAIL_LINES`
    /// - `KUBE_WRENCH_CRASH_LOOP_RESTARTS`
    /// - `KUBE_WRENCH_NO_EVENTS`: `true` to skip event correlation
    /// - `KUBE_WRENCH_NETWORK`: `true` to enable service and ingress checks
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("KUBE_WRENCH_NAMESPACE_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.namespace_concurrency = n;
            }
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_POD_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.pod_concurrency = n;
            }
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_LOG_TAIL_LINES") {
            if let Ok(n) = val.parse() {
                config.log_tail_lines = n;
            }
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_CRASH_LOOP_RESTARTS") {
            if let Ok(n) = val.parse() {
                config.crash_loop_restarts = n;
            }
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_NO_EVENTS") {
            config.events = !is_truthy(&val);
        }
        if let Ok(val) = std::env::var("KUBE_WRENCH_NETWORK") {
            config.network = is_truthy(&val);
        }

        config
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a concurrency limit or the log tail is zero.
    pub fn validate(&self) -> Result<()> {
        if self.namespace_concurrency == 0 || self.pod_concurrency == 0 {
            return Err(DiagnoseError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.log_tail_lines <= 0 {
            return Err(DiagnoseError::Config(
                "log tail lines must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_config_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.log_tail_lines, 10);
        assert_eq!(config.crash_loop_restarts, 2);
        assert!(config.events);
        assert!(!config.network);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn scan_config_rejects_zero_concurrency() {
        let config = ScanConfig {
            pod_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DiagnoseError::Config(_))));
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("no"));
    }
}
