//! Error types for the cluster crate.

use thiserror::Error;

/// Errors that can occur while setting up cluster access.
///
/// Per-query failures are reported as
/// [`QueryError`](kube_wrench_core::QueryError) instead.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Kubernetes client error.
    #[error("Kubernetes client error: {0}")]
    KubeClient(#[from] kube::Error),

    /// The kubeconfig file could not be read or applied.
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Neither a kubeconfig nor in-cluster configuration was found.
    #[error("Could not infer cluster configuration: {0}")]
    Infer(#[from] kube::config::InferConfigError),

    /// The HTTP client for ingress probes could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A specialized Result type for cluster setup.
pub type Result<T> = std::result::Result<T, ClusterError>;
