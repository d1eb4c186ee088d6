//! Kubernetes-backed implementation of [`ClusterQuery`].

use std::future::Future;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    ConfigMap, Event, Namespace, PersistentVolumeClaim, Pod, ResourceQuota, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info, warn};

use kube_wrench_core::{
    DataObjectSnapshot, EventSnapshot, IngressSnapshot, NamespaceInfo, PodSnapshot, PvcSnapshot,
    QueryError, QueryResult, ResourceQuotaSnapshot, ServiceSnapshot,
};

use crate::convert;
use crate::query::ClusterQuery;
use crate::types::ClusterConfig;
use crate::Result;

/// Read-only view of a Kubernetes cluster.
///
/// Every request is bounded by [`ClusterConfig::query_timeout`].
pub struct K8sCluster {
    client: Client,
    config: ClusterConfig,
}

impl K8sCluster {
    /// Connect to a cluster.
    ///
    /// Uses the explicit kubeconfig path when set, otherwise infers the
    /// configuration from `KUBECONFIG`, `~/.kube/config` or the in-cluster
    /// service account.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no kubeconfig can
    /// be loaded, or the client cannot be created.
    pub async fn new(config: ClusterConfig) -> Result<Self> {
        config.validate()?;

        let options = KubeConfigOptions {
            context: config.context.clone(),
            ..Default::default()
        };

        let mut kube_config = match (&config.kubeconfig, &config.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options).await?,
            (None, None) => Config::infer().await?,
        };

        if config.insecure_skip_tls_verify {
            warn!("TLS verification of the API server is disabled");
            kube_config.accept_invalid_certs = true;
        }
        kube_config.read_timeout = Some(config.query_timeout);

        info!(
            cluster_url = %kube_config.cluster_url,
            namespace = %kube_config.default_namespace,
            "Connecting to cluster"
        );

        let client = Client::try_from(kube_config)?;
        Ok(Self { client, config })
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Run a request under the query timeout and map its error. `target`
    /// names the object a 404 refers to.
    async fn bounded<T, F>(&self, operation: &str, target: Target<'_>, fut: F) -> QueryResult<T>
    where
        F: Future<Output = kube::Result<T>> + Send,
    {
        match tokio::time::timeout(self.config.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                debug!(operation, error = %e, "Cluster query failed");
                Err(map_kube_error(target, e))
            }
            Err(_) => {
                warn!(
                    operation,
                    seconds = self.config.query_timeout.as_secs(),
                    "Cluster query timed out"
                );
                Err(QueryError::Timeout {
                    operation: operation.to_string(),
                    seconds: self.config.query_timeout.as_secs(),
                })
            }
        }
    }
}

/// Kind and name of the object a request addresses.
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    kind: &'a str,
    name: &'a str,
}

impl<'a> Target<'a> {
    const fn new(kind: &'a str, name: &'a str) -> Self {
        Self { kind, name }
    }

    /// A namespaced list; a 404 there means the namespace is gone.
    const fn namespace(name: &'a str) -> Self {
        Self::new("Namespace", name)
    }
}

/// Map a `kube` error onto the query error model.
fn map_kube_error(target: Target<'_>, err: kube::Error) -> QueryError {
    match err {
        kube::Error::Api(e) if e.code == 404 => QueryError::not_found(target.kind, target.name),
        kube::Error::Api(e) if e.code == 401 || e.code == 403 => QueryError::Forbidden(e.message),
        kube::Error::SerdeError(e) => QueryError::Malformed(e.to_string()),
        other => QueryError::Transport(other.to_string()),
    }
}

#[async_trait]
impl ClusterQuery for K8sCluster {
    async fn list_namespaces(&self) -> QueryResult<Vec<NamespaceInfo>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = self
            .bounded(
                "list namespaces",
                Target::new("Resource", "namespaces"),
                api.list(&ListParams::default()),
            )
            .await?;
        Ok(list.items.iter().map(convert::namespace_info).collect())
    }

    async fn list_pods(&self, namespace: &str) -> QueryResult<Vec<PodSnapshot>> {
        let api: Api<Pod> = self.namespaced(namespace);
        let list = self
            .bounded(
                "list pods",
                Target::namespace(namespace),
                api.list(&ListParams::default()),
            )
            .await?;
        debug!(namespace, count = list.items.len(), "Listed pods");
        Ok(list
            .items
            .iter()
            .map(|pod| convert::pod_snapshot(pod, namespace))
            .collect())
    }

    async fn list_resource_quotas(
        &self,
        namespace: &str,
    ) -> QueryResult<Vec<ResourceQuotaSnapshot>> {
        let api: Api<ResourceQuota> = self.namespaced(namespace);
        let list = self
            .bounded(
                "list resource quotas",
                Target::namespace(namespace),
                api.list(&ListParams::default()),
            )
            .await?;
        Ok(list
            .items
            .iter()
            .map(|q| convert::quota_snapshot(q, namespace))
            .collect())
    }

    async fn get_resource_quota_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> QueryResult<ResourceQuotaSnapshot> {
        let api: Api<ResourceQuota> = self.namespaced(namespace);
        let quota = self
            .bounded(
                "read resource quota status",
                Target::new("ResourceQuota", name),
                api.get_status(name),
            )
            .await?;
        Ok(convert::quota_snapshot(&quota, namespace))
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> QueryResult<Option<DataObjectSnapshot>> {
        let api: Api<Secret> = self.namespaced(namespace);
        let secret = self
            .bounded("get secret", Target::new("Secret", name), api.get_opt(name))
            .await?;
        Ok(secret.as_ref().map(convert::secret_snapshot))
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> QueryResult<Option<DataObjectSnapshot>> {
        let api: Api<ConfigMap> = self.namespaced(namespace);
        let cm = self
            .bounded(
                "get config map",
                Target::new("ConfigMap", name),
                api.get_opt(name),
            )
            .await?;
        Ok(cm.as_ref().map(convert::config_map_snapshot))
    }

    async fn get_pvc(&self, namespace: &str, name: &str) -> QueryResult<Option<PvcSnapshot>> {
        let api: Api<PersistentVolumeClaim> = self.namespaced(namespace);
        let pvc = self
            .bounded(
                "get persistent volume claim",
                Target::new("PersistentVolumeClaim", name),
                api.get_opt(name),
            )
            .await?;
        Ok(pvc.as_ref().map(convert::pvc_snapshot))
    }

    async fn list_namespace_events(&self, namespace: &str) -> QueryResult<Vec<EventSnapshot>> {
        let api: Api<Event> = self.namespaced(namespace);
        let list = self
            .bounded(
                "list events",
                Target::namespace(namespace),
                api.list(&ListParams::default()),
            )
            .await?;
        Ok(list.items.iter().map(convert::event_snapshot).collect())
    }

    async fn get_pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        tail_lines: i64,
        previous: bool,
    ) -> QueryResult<Option<String>> {
        let api: Api<Pod> = self.namespaced(namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            tail_lines: Some(tail_lines),
            previous,
            ..Default::default()
        };

        match self
            .bounded(
                "read pod logs",
                Target::new("Pod", pod),
                api.logs(pod, &params),
            )
            .await
        {
            Ok(logs) => Ok(Some(logs)),
            Err(e) if e.is_not_found() => Ok(None),
            // The API server answers 400 when a previous instance does not exist.
            Err(QueryError::Transport(msg)) if previous && msg.contains("previous terminated") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_services(&self, namespace: &str) -> QueryResult<Vec<ServiceSnapshot>> {
        let api: Api<Service> = self.namespaced(namespace);
        let list = self
            .bounded(
                "list services",
                Target::namespace(namespace),
                api.list(&ListParams::default()),
            )
            .await?;
        Ok(list.items.iter().map(convert::service_snapshot).collect())
    }

    async fn list_ingresses(&self, namespace: &str) -> QueryResult<Vec<IngressSnapshot>> {
        let api: Api<Ingress> = self.namespaced(namespace);
        let list = self
            .bounded(
                "list ingresses",
                Target::namespace(namespace),
                api.list(&ListParams::default()),
            )
            .await?;
        Ok(list.items.iter().map(convert::ingress_snapshot).collect())
    }
}
