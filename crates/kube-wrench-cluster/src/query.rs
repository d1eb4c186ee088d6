//! The read-only cluster query interface.

use async_trait::async_trait;
use kube_wrench_core::{
    DataObjectSnapshot, EventSnapshot, IngressSnapshot, NamespaceInfo, PodSnapshot, PvcSnapshot,
    QueryResult, ResourceQuotaSnapshot, ServiceSnapshot,
};

/// Read-only access to cluster state.
///
/// Lookups of a single object return `Ok(None)` when the object does not
/// exist. Every other failure is a [`QueryError`](kube_wrench_core::QueryError).
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// List every namespace in the cluster.
    async fn list_namespaces(&self) -> QueryResult<Vec<NamespaceInfo>>;

    /// List pods in a namespace.
    async fn list_pods(&self, namespace: &str) -> QueryResult<Vec<PodSnapshot>>;

    /// List resource quotas in a namespace.
    async fn list_resource_quotas(&self, namespace: &str)
        -> QueryResult<Vec<ResourceQuotaSnapshot>>;

    /// Read the current status of one resource quota.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NotFound` if the quota does not exist.
    async fn get_resource_quota_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> QueryResult<ResourceQuotaSnapshot>;

    /// Look up a secret.
    async fn get_secret(&self, namespace: &str, name: &str)
        -> QueryResult<Option<DataObjectSnapshot>>;

    /// Look up a config map.
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> QueryResult<Option<DataObjectSnapshot>>;

    /// Look up a persistent volume claim.
    async fn get_pvc(&self, namespace: &str, name: &str) -> QueryResult<Option<PvcSnapshot>>;

    /// List events in a namespace.
    async fn list_namespace_events(&self, namespace: &str) -> QueryResult<Vec<EventSnapshot>>;

    /// Fetch the last `tail_lines` log lines of a container.
    ///
    /// With `previous` set, the logs of the previous container instance are
    /// returned. `Ok(None)` means the pod or container is gone.
    async fn get_pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        tail_lines: i64,
        previous: bool,
    ) -> QueryResult<Option<String>>;

    /// List services in a namespace.
    async fn list_services(&self, namespace: &str) -> QueryResult<Vec<ServiceSnapshot>>;

    /// List ingresses in a namespace.
    async fn list_ingresses(&self, namespace: &str) -> QueryResult<Vec<IngressSnapshot>>;
}
