//! Namespace scanning.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use kube_wrench_cluster::{ClusterQuery, IngressProber};
use kube_wrench_core::{Category, EventSnapshot, Finding, NamespaceInfo, NamespaceReport, Report};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::error::{DiagnoseError, Result};
use crate::network::NetworkView;
use crate::pod::{NamespaceContext, PodDiagnoser};
use crate::quota::check_namespace_quotas;

/// Namespace scanned when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Which namespaces a scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceSelector {
    /// A single namespace.
    Named(String),
    /// Every namespace in the cluster.
    All,
}

impl NamespaceSelector {
    /// Parse a selector. `None` selects [`DEFAULT_NAMESPACE`]; `all` in any
    /// case selects every namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None => Ok(Self::Named(DEFAULT_NAMESPACE.to_string())),
            Some("") => Err(DiagnoseError::InvalidSelector(String::new())),
            Some(name) if name.eq_ignore_ascii_case("all") => Ok(Self::All),
            Some(name) => Ok(Self::Named(name.to_string())),
        }
    }
}

impl fmt::Display for NamespaceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::All => f.write_str("all"),
        }
    }
}

/// Drives pod diagnosis over one or all namespaces.
pub struct NamespaceScanner<C: ?Sized, P: ?Sized> {
    cluster: Arc<C>,
    prober: Arc<P>,
    config: ScanConfig,
}

impl<C, P> NamespaceScanner<C, P>
where
    C: ClusterQuery + ?Sized,
    P: IngressProber + ?Sized,
{
    /// Create a scanner.
    #[must_use]
    pub fn new(cluster: Arc<C>, prober: Arc<P>, config: ScanConfig) -> Self {
        Self {
            cluster,
            prober,
            config,
        }
    }

    /// Scan the selected namespaces.
    ///
    /// Namespaces are diagnosed concurrently and reported in listing order.
    /// A namespace that fails is marked and never aborts the others.
    pub async fn scan(&self, selector: &NamespaceSelector) -> Report {
        let mut report = Report::new(selector.to_string());

        let namespaces = match selector {
            NamespaceSelector::Named(name) => {
                info!(namespace = %name, "Running on namespace");
                vec![NamespaceInfo::named(name.clone())]
            }
            NamespaceSelector::All => match self.cluster.list_namespaces().await {
                Ok(namespaces) => {
                    info!(count = namespaces.len(), "Running on all namespaces");
                    namespaces
                }
                Err(e) => {
                    warn!(error = %e, "Failed to list namespaces");
                    report.error = Some(format!("could not list namespaces: {e}"));
                    return report;
                }
            },
        };

        report.namespaces = stream::iter(namespaces)
            .map(|ns| self.scan_namespace(ns))
            .buffered(self.config.namespace_concurrency.max(1))
            .collect()
            .await;

        report
    }

    /// Scan one namespace: pods first, then quotas.
    pub async fn scan_namespace(&self, namespace: NamespaceInfo) -> NamespaceReport {
        let name = namespace.name.as_str();
        let mut report = NamespaceReport::new(name);
        report.phase = namespace.phase.clone();
        debug!(namespace = %name, phase = ?namespace.phase, "Scanning namespace");

        match self.cluster.list_pods(name).await {
            Ok(pods) if pods.is_empty() => {
                info!(namespace = %name, "No pods found");
                report.findings.push(Finding::info(
                    Category::NoPodsFound,
                    format!("namespace/{name}"),
                    "no pods found",
                ));
            }
            Ok(pods) => {
                let (events, network) =
                    tokio::join!(self.load_events(name), self.load_network(name));
                let ctx = NamespaceContext {
                    events: events.unwrap_or_else(|finding| {
                        report.findings.push(finding);
                        None
                    }),
                    network: network.unwrap_or_else(|finding| {
                        report.findings.push(finding);
                        None
                    }),
                };

                let diagnoser =
                    PodDiagnoser::new(self.cluster.as_ref(), self.prober.as_ref(), &self.config);
                report.pods = stream::iter(pods.iter())
                    .map(|pod| diagnoser.diagnose(pod, &ctx))
                    .buffered(self.config.pod_concurrency.max(1))
                    .collect()
                    .await;
            }
            Err(e) => {
                warn!(namespace = %name, error = %e, "Failed to list pods");
                report.mark_failed(format!("could not list pods: {e}"));
                report.findings.push(Finding::warning(
                    Category::QueryFailed,
                    format!("namespace/{name}"),
                    format!("could not list pods: {e}"),
                ));
            }
        }

        report
            .findings
            .extend(check_namespace_quotas(self.cluster.as_ref(), name).await);
        report
    }

    async fn load_events(
        &self,
        namespace: &str,
    ) -> std::result::Result<Option<Vec<EventSnapshot>>, Finding> {
        if !self.config.events {
            return Ok(None);
        }
        match self.cluster.list_namespace_events(namespace).await {
            Ok(events) => {
                debug!(namespace, count = events.len(), "Loaded events");
                Ok(Some(events))
            }
            Err(e) => {
                warn!(namespace, error = %e, "Failed to list events");
                Err(Finding::warning(
                    Category::QueryFailed,
                    format!("namespace/{namespace}"),
                    format!("could not list events: {e}"),
                ))
            }
        }
    }

    async fn load_network(
        &self,
        namespace: &str,
    ) -> std::result::Result<Option<NetworkView>, Finding> {
        if !self.config.network {
            return Ok(None);
        }
        let (services, ingresses) = tokio::join!(
            self.cluster.list_services(namespace),
            self.cluster.list_ingresses(namespace)
        );
        match (services, ingresses) {
            (Ok(services), Ok(ingresses)) => Ok(Some(NetworkView {
                services,
                ingresses,
            })),
            (Err(e), _) | (_, Err(e)) => {
                warn!(namespace, error = %e, "Failed to load services or ingresses");
                Err(Finding::warning(
                    Category::QueryFailed,
                    format!("namespace/{namespace}"),
                    format!("could not load services and ingresses: {e}"),
                ))
            }
        }
    }
}
