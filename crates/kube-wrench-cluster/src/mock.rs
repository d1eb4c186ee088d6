//! In-memory cluster for testing without a real Kubernetes API server.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use kube_wrench_core::{
    DataObjectSnapshot, EventSnapshot, IngressSnapshot, NamespaceInfo, PodSnapshot, PvcSnapshot,
    QueryError, QueryResult, ResourceQuotaSnapshot, ServiceSnapshot,
};

use crate::probe::{IngressProber, ProbeOutcome};
use crate::query::ClusterQuery;

/// Identifies a [`ClusterQuery`] operation, for failure injection and call
/// recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOp {
    /// `list_namespaces`
    ListNamespaces,
    /// `list_pods`
    ListPods,
    /// `list_resource_quotas`
    ListResourceQuotas,
    /// `get_resource_quota_status`
    GetResourceQuotaStatus,
    /// `get_secret`
    GetSecret,
    /// `get_config_map`
    GetConfigMap,
    /// `get_pvc`
    GetPvc,
    /// `list_namespace_events`
    ListEvents,
    /// `get_pod_logs`
    GetPodLogs,
    /// `list_services`
    ListServices,
    /// `list_ingresses`
    ListIngresses,
}

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Default)]
struct MockState {
    namespaces: Vec<NamespaceInfo>,
    pods: Vec<PodSnapshot>,
    quotas: Vec<ResourceQuotaSnapshot>,
    quota_status: HashMap<Key, ResourceQuotaSnapshot>,
    secrets: HashMap<Key, DataObjectSnapshot>,
    config_maps: HashMap<Key, DataObjectSnapshot>,
    pvcs: HashMap<Key, PvcSnapshot>,
    events: HashMap<String, Vec<EventSnapshot>>,
    logs: HashMap<(String, String, String, bool), String>,
    services: HashMap<String, Vec<ServiceSnapshot>>,
    ingresses: HashMap<String, Vec<IngressSnapshot>>,
    failures: HashMap<(QueryOp, String), QueryError>,
    calls: Vec<(QueryOp, String)>,
}

impl MockState {
    fn ensure_namespace(&mut self, namespace: &str) {
        if !self.namespaces.iter().any(|n| n.name == namespace) {
            self.namespaces.push(NamespaceInfo::named(namespace));
        }
    }
}

/// A fake cluster holding snapshots in memory.
///
/// Objects are returned in insertion order. Failures can be injected per
/// operation and namespace with [`MockCluster::fail`].
#[derive(Default)]
pub struct MockCluster {
    state: Mutex<MockState>,
}

impl MockCluster {
    /// Create an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace.
    pub fn add_namespace(&self, namespace: &str) {
        self.state.lock().ensure_namespace(namespace);
    }

    /// Register a namespace with a lifecycle phase, replacing the phase of
    /// an already registered one.
    pub fn add_namespace_in_phase(&self, namespace: &str, phase: &str) {
        let mut state = self.state.lock();
        state.ensure_namespace(namespace);
        if let Some(ns) = state.namespaces.iter_mut().find(|n| n.name == namespace) {
            ns.phase = Some(phase.to_string());
        }
    }

    /// Add a pod. Its namespace is registered if needed.
    pub fn add_pod(&self, pod: PodSnapshot) {
        let mut state = self.state.lock();
        state.ensure_namespace(&pod.namespace);
        state.pods.push(pod);
    }

    /// Add a resource quota. Its status reads return the same snapshot
    /// unless overridden with [`MockCluster::set_quota_status`].
    pub fn add_quota(&self, quota: ResourceQuotaSnapshot) {
        let mut state = self.state.lock();
        state.ensure_namespace(&quota.namespace);
        state.quotas.push(quota);
    }

    /// Override what a quota status read returns.
    pub fn set_quota_status(&self, quota: ResourceQuotaSnapshot) {
        let k = key(&quota.namespace, &quota.name);
        self.state.lock().quota_status.insert(k, quota);
    }

    /// Add a secret with the given keys.
    pub fn add_secret(&self, namespace: &str, name: &str, keys: &[&str]) {
        self.state
            .lock()
            .secrets
            .insert(key(namespace, name), data_object(name, keys));
    }

    /// Add a config map with the given keys.
    pub fn add_config_map(&self, namespace: &str, name: &str, keys: &[&str]) {
        self.state
            .lock()
            .config_maps
            .insert(key(namespace, name), data_object(name, keys));
    }

    /// Add a persistent volume claim in the given phase.
    pub fn add_pvc(&self, namespace: &str, name: &str, phase: Option<&str>) {
        self.state.lock().pvcs.insert(
            key(namespace, name),
            PvcSnapshot {
                name: name.to_string(),
                phase: phase.map(str::to_string),
            },
        );
    }

    /// Add an event to a namespace.
    pub fn add_event(&self, namespace: &str, event: EventSnapshot) {
        self.state
            .lock()
            .events
            .entry(namespace.to_string())
            .or_default()
            .push(event);
    }

    /// Set the log output of a container.
    pub fn set_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        previous: bool,
        logs: &str,
    ) {
        self.state.lock().logs.insert(
            (
                namespace.to_string(),
                pod.to_string(),
                container.to_string(),
                previous,
            ),
            logs.to_string(),
        );
    }

    /// Add a service to a namespace.
    pub fn add_service(&self, namespace: &str, service: ServiceSnapshot) {
        self.state
            .lock()
            .services
            .entry(namespace.to_string())
            .or_default()
            .push(service);
    }

    /// Add an ingress to a namespace.
    pub fn add_ingress(&self, namespace: &str, ingress: IngressSnapshot) {
        self.state
            .lock()
            .ingresses
            .entry(namespace.to_string())
            .or_default()
            .push(ingress);
    }

    /// Make `op` fail with `error` in `namespace`.
    ///
    /// Use an empty namespace for [`QueryOp::ListNamespaces`].
    pub fn fail(&self, op: QueryOp, namespace: &str, error: QueryError) {
        self.state
            .lock()
            .failures
            .insert((op, namespace.to_string()), error);
    }

    /// Count how often `op` was called for `namespace`.
    #[must_use]
    pub fn call_count(&self, op: QueryOp, namespace: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(o, ns)| *o == op && ns == namespace)
            .count()
    }

    /// Count how often `op` was called in any namespace.
    #[must_use]
    pub fn total_calls(&self, op: QueryOp) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(o, _)| *o == op)
            .count()
    }

    /// Record a call and return the injected failure, if any.
    fn enter(&self, op: QueryOp, namespace: &str) -> QueryResult<()> {
        let mut state = self.state.lock();
        state.calls.push((op, namespace.to_string()));
        match state.failures.get(&(op, namespace.to_string())) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn data_object(name: &str, keys: &[&str]) -> DataObjectSnapshot {
    DataObjectSnapshot {
        name: name.to_string(),
        keys: keys.iter().map(|k| (*k).to_string()).collect(),
    }
}

#[async_trait]
impl ClusterQuery for MockCluster {
    async fn list_namespaces(&self) -> QueryResult<Vec<NamespaceInfo>> {
        self.enter(QueryOp::ListNamespaces, "")?;
        Ok(self.state.lock().namespaces.clone())
    }

    async fn list_pods(&self, namespace: &str) -> QueryResult<Vec<PodSnapshot>> {
        self.enter(QueryOp::ListPods, namespace)?;
        Ok(self
            .state
            .lock()
            .pods
            .iter()
            .filter(|p| p.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn list_resource_quotas(
        &self,
        namespace: &str,
    ) -> QueryResult<Vec<ResourceQuotaSnapshot>> {
        self.enter(QueryOp::ListResourceQuotas, namespace)?;
        Ok(self
            .state
            .lock()
            .quotas
            .iter()
            .filter(|q| q.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get_resource_quota_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> QueryResult<ResourceQuotaSnapshot> {
        self.enter(QueryOp::GetResourceQuotaStatus, namespace)?;
        let state = self.state.lock();
        if let Some(status) = state.quota_status.get(&key(namespace, name)) {
            return Ok(status.clone());
        }
        state
            .quotas
            .iter()
            .find(|q| q.namespace == namespace && q.name == name)
            .cloned()
            .ok_or_else(|| QueryError::not_found("ResourceQuota", name))
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> QueryResult<Option<DataObjectSnapshot>> {
        self.enter(QueryOp::GetSecret, namespace)?;
        Ok(self.state.lock().secrets.get(&key(namespace, name)).cloned())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> QueryResult<Option<DataObjectSnapshot>> {
        self.enter(QueryOp::GetConfigMap, namespace)?;
        Ok(self
            .state
            .lock()
            .config_maps
            .get(&key(namespace, name))
            .cloned())
    }

    async fn get_pvc(&self, namespace: &str, name: &str) -> QueryResult<Option<PvcSnapshot>> {
        self.enter(QueryOp::GetPvc, namespace)?;
        Ok(self.state.lock().pvcs.get(&key(namespace, name)).cloned())
    }

    async fn list_namespace_events(&self, namespace: &str) -> QueryResult<Vec<EventSnapshot>> {
        self.enter(QueryOp::ListEvents, namespace)?;
        Ok(self
            .state
            .lock()
            .events
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        _tail_lines: i64,
        previous: bool,
    ) -> QueryResult<Option<String>> {
        self.enter(QueryOp::GetPodLogs, namespace)?;
        Ok(self
            .state
            .lock()
            .logs
            .get(&(
                namespace.to_string(),
                pod.to_string(),
                container.to_string(),
                previous,
            ))
            .cloned())
    }

    async fn list_services(&self, namespace: &str) -> QueryResult<Vec<ServiceSnapshot>> {
        self.enter(QueryOp::ListServices, namespace)?;
        Ok(self
            .state
            .lock()
            .services
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_ingresses(&self, namespace: &str) -> QueryResult<Vec<IngressSnapshot>> {
        self.enter(QueryOp::ListIngresses, namespace)?;
        Ok(self
            .state
            .lock()
            .ingresses
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }
}

/// A fake prober answering from a fixed table.
///
/// Unknown URIs fail as if the connection was refused.
#[derive(Default)]
pub struct MockProber {
    responses: Mutex<HashMap<String, ProbeOutcome>>,
    probed: Mutex<Vec<String>>,
}

impl MockProber {
    /// Create a prober with no known URIs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `uri` with `status`.
    pub fn respond(&self, uri: &str, status: u16) {
        self.responses
            .lock()
            .insert(uri.to_string(), ProbeOutcome::Status(status));
    }

    /// URIs probed so far, in order.
    #[must_use]
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().clone()
    }
}

#[async_trait]
impl IngressProber for MockProber {
    async fn probe(&self, uri: &str) -> ProbeOutcome {
        self.probed.lock().push(uri.to_string());
        self.responses
            .lock()
            .get(uri)
            .cloned()
            .unwrap_or_else(|| ProbeOutcome::Failed("connection refused".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_cluster_filters_by_namespace() {
        let cluster = MockCluster::new();
        cluster.add_pod(PodSnapshot::new("shop", "web-0", "Running"));
        cluster.add_pod(PodSnapshot::new("shop", "web-1", "Pending"));
        cluster.add_pod(PodSnapshot::new("billing", "api-0", "Running"));

        let pods = cluster.list_pods("shop").await.unwrap();
        let names: Vec<_> = pods.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["web-0", "web-1"]);

        let namespaces = cluster.list_namespaces().await.unwrap();
        assert_eq!(namespaces.len(), 2);
        assert_eq!(namespaces[0].name, "shop");
        assert_eq!(namespaces[0].phase, None);
    }

    #[tokio::test]
    async fn mock_cluster_namespace_phase() {
        let cluster = MockCluster::new();
        cluster.add_pod(PodSnapshot::new("shop", "web-0", "Running"));
        cluster.add_namespace_in_phase("shop", "Terminating");
        cluster.add_namespace_in_phase("billing", "Active");

        let namespaces = cluster.list_namespaces().await.unwrap();
        assert_eq!(namespaces.len(), 2);
        assert_eq!(namespaces[0].phase.as_deref(), Some("Terminating"));
        assert_eq!(namespaces[1].name, "billing");
        assert_eq!(namespaces[1].phase.as_deref(), Some("Active"));
    }

    #[tokio::test]
    async fn mock_cluster_injects_failures() {
        let cluster = MockCluster::new();
        cluster.add_pod(PodSnapshot::new("shop", "web-0", "Running"));
        cluster.fail(
            QueryOp::ListPods,
            "shop",
            QueryError::Forbidden("pods is forbidden".to_string()),
        );

        let err = cluster.list_pods("shop").await.unwrap_err();
        assert!(matches!(err, QueryError::Forbidden(_)));
        assert!(cluster.list_pods("billing").await.unwrap().is_empty());
        assert_eq!(cluster.call_count(QueryOp::ListPods, "shop"), 1);
        assert_eq!(cluster.total_calls(QueryOp::ListPods), 2);
    }

    #[tokio::test]
    async fn mock_cluster_lookups() {
        let cluster = MockCluster::new();
        cluster.add_secret("shop", "db-creds", &["password"]);
        cluster.add_pvc("shop", "data", Some("Bound"));

        let secret = cluster.get_secret("shop", "db-creds").await.unwrap();
        assert_eq!(secret.unwrap().keys, vec!["password".to_string()]);
        assert!(cluster.get_secret("shop", "other").await.unwrap().is_none());
        assert!(cluster.get_config_map("shop", "db-creds").await.unwrap().is_none());

        let pvc = cluster.get_pvc("shop", "data").await.unwrap().unwrap();
        assert_eq!(pvc.phase.as_deref(), Some("Bound"));
    }

    #[tokio::test]
    async fn mock_cluster_quota_status_override() {
        let cluster = MockCluster::new();
        cluster.add_quota(
            ResourceQuotaSnapshot::new("shop", "compute").with_resource("cpu", "1", "4"),
        );
        cluster.set_quota_status(
            ResourceQuotaSnapshot::new("shop", "compute").with_resource("cpu", "2", "4"),
        );

        let status = cluster
            .get_resource_quota_status("shop", "compute")
            .await
            .unwrap();
        assert_eq!(status.resources["cpu"].used, "2");

        let missing = cluster.get_resource_quota_status("shop", "other").await;
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn mock_cluster_logs_keyed_by_instance() {
        let cluster = MockCluster::new();
        cluster.set_logs("shop", "web-0", "web", true, "panic: boom");

        let current = cluster.get_pod_logs("shop", "web-0", "web", 10, false).await;
        assert_eq!(current.unwrap(), None);
        let previous = cluster.get_pod_logs("shop", "web-0", "web", 10, true).await;
        assert_eq!(previous.unwrap().as_deref(), Some("panic: boom"));
    }

    #[tokio::test]
    async fn mock_prober_defaults_to_failure() {
        let prober = MockProber::new();
        prober.respond("https://shop.example.com/", 200);

        assert_eq!(
            prober.probe("https://shop.example.com/").await,
            ProbeOutcome::Status(200)
        );
        assert!(matches!(
            prober.probe("http://other/").await,
            ProbeOutcome::Failed(_)
        ));
        assert_eq!(prober.probed().len(), 2);
    }
}
