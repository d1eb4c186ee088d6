//! Read-only snapshots of cluster objects.
//!
//! Snapshots are built once per scan pass from query results and dropped when
//! the pass ends. They carry only what the diagnosis engine inspects.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reason::{TerminatedReason, WaitingReason};

/// A namespace and its lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    /// Namespace name.
    pub name: String,
    /// `Active` or `Terminating`, when reported.
    pub phase: Option<String>,
}

impl NamespaceInfo {
    /// Create a namespace entry with no phase.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: None,
        }
    }
}

/// Phase of the pod lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PodPhase {
    /// Accepted but not all containers are running.
    Pending,
    /// Bound to a node with at least one container running.
    Running,
    /// All containers terminated successfully.
    Succeeded,
    /// All containers terminated and at least one failed.
    Failed,
    /// The pod state could not be obtained.
    Unknown,
    /// Any phase string Kubernetes does not define.
    Invalid,
}

impl PodPhase {
    /// Parse a pod phase from a Kubernetes phase string.
    #[must_use]
    pub fn from_k8s_phase(phase: &str) -> Self {
        match phase {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Unknown" => Self::Unknown,
            _ => Self::Invalid,
        }
    }
}

/// A pod condition as reported in `status.conditions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodCondition {
    /// Condition type, e.g. `PodScheduled`.
    #[serde(rename = "type")]
    pub type_: String,
    /// `True`, `False` or `Unknown`.
    pub status: String,
    /// Machine-readable reason.
    pub reason: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}

/// A volume declared by the pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VolumeReference {
    /// A secret volume.
    Secret {
        /// Secret name.
        name: String,
    },
    /// A config map volume.
    ConfigMap {
        /// Config map name.
        name: String,
    },
    /// A persistent volume claim.
    Pvc {
        /// Claim name.
        claim_name: String,
    },
    /// Any other volume source.
    Other {
        /// Volume name.
        name: String,
    },
}

/// The container fields the diagnosis reads from the pod spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: Option<String>,
    /// `Always`, `IfNotPresent` or `Never`.
    pub image_pull_policy: Option<String>,
}

/// Current state of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContainerState {
    /// The container is running.
    Running {
        /// When the container started.
        started_at: Option<DateTime<Utc>>,
    },
    /// The container is waiting to start.
    Waiting {
        /// Why it is waiting.
        reason: WaitingReason,
        /// Detail from the kubelet.
        message: Option<String>,
    },
    /// The container has terminated.
    Terminated {
        /// Why it terminated.
        reason: TerminatedReason,
        /// Detail from the kubelet.
        message: Option<String>,
        /// Process exit code.
        exit_code: i32,
        /// When the container finished.
        finished_at: Option<DateTime<Utc>>,
    },
}

/// Runtime status of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    /// Container name.
    pub name: String,
    /// Whether the container passes its readiness probe.
    pub ready: bool,
    /// Number of restarts.
    pub restart_count: u32,
    /// Image reference.
    pub image: String,
    /// Pull policy taken from the matching container spec.
    pub image_pull_policy: Option<String>,
    /// Current state; `None` when the container is not yet scheduled.
    pub state: Option<ContainerState>,
}

/// Snapshot of a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSnapshot {
    /// Pod name.
    pub name: String,
    /// Owning namespace.
    pub namespace: String,
    /// Raw phase string as reported by the API server.
    pub phase: String,
    /// Node the pod is assigned to.
    pub node_name: Option<String>,
    /// Pod IP address.
    pub pod_ip: Option<String>,
    /// Pod labels.
    pub labels: BTreeMap<String, String>,
    /// Declared volumes.
    pub volumes: Vec<VolumeReference>,
    /// Container specs.
    pub containers: Vec<ContainerSpec>,
    /// Names of the image pull secrets.
    pub image_pull_secrets: Vec<String>,
    /// Pod conditions.
    pub conditions: Vec<PodCondition>,
    /// Container statuses; `None` when the API reported none.
    pub container_statuses: Option<Vec<ContainerStatus>>,
}

impl PodSnapshot {
    /// Create a pod snapshot with the given phase and nothing else.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        phase: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase: phase.into(),
            node_name: None,
            pod_ip: None,
            labels: BTreeMap::new(),
            volumes: Vec::new(),
            containers: Vec::new(),
            image_pull_secrets: Vec::new(),
            conditions: Vec::new(),
            container_statuses: None,
        }
    }

    /// Parsed pod phase.
    #[must_use]
    pub fn phase(&self) -> PodPhase {
        PodPhase::from_k8s_phase(&self.phase)
    }

    /// Check if the pod declares any image pull secret.
    #[must_use]
    pub fn has_pull_secrets(&self) -> bool {
        !self.image_pull_secrets.is_empty()
    }

    /// Find a container spec by name.
    #[must_use]
    pub fn container_spec(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }
}

/// Used and hard values for one quota resource, as raw quantity strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Amount in use; empty when the API reported none.
    pub used: String,
    /// Hard limit.
    pub hard: String,
}

/// Snapshot of a resource quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuotaSnapshot {
    /// Owning namespace.
    pub namespace: String,
    /// Quota name.
    pub name: String,
    /// Resource key (`cpu`, `requests.memory`, `pods`, ...) to usage.
    pub resources: BTreeMap<String, QuotaUsage>,
}

impl ResourceQuotaSnapshot {
    /// Create an empty quota snapshot.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            resources: BTreeMap::new(),
        }
    }

    /// Add a resource with its used and hard quantities.
    #[must_use]
    pub fn with_resource(
        mut self,
        key: impl Into<String>,
        used: impl Into<String>,
        hard: impl Into<String>,
    ) -> Self {
        self.resources.insert(
            key.into(),
            QuotaUsage {
                used: used.into(),
                hard: hard.into(),
            },
        );
        self
    }
}

/// Snapshot of a secret or config map: its name and data keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataObjectSnapshot {
    /// Object name.
    pub name: String,
    /// Keys present in `data` (and `binaryData` / `stringData`).
    pub keys: Vec<String>,
}

/// Snapshot of a persistent volume claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvcSnapshot {
    /// Claim name.
    pub name: String,
    /// `Bound`, `Pending`, `Lost`, when reported.
    pub phase: Option<String>,
}

/// A Kubernetes event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// `Normal` or `Warning`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Machine-readable reason.
    pub reason: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
    /// Kind of the involved object.
    pub involved_kind: Option<String>,
    /// Name of the involved object.
    pub involved_name: Option<String>,
    /// Component instance that reported the event, usually a node.
    pub reporting_instance: Option<String>,
}

impl EventSnapshot {
    /// Check if this is a warning event.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.type_ != "Normal"
    }

    /// Check if the event involves the given pod.
    #[must_use]
    pub fn involves_pod(&self, pod_name: &str) -> bool {
        self.involved_kind.as_deref().unwrap_or("Pod") == "Pod"
            && self.involved_name.as_deref() == Some(pod_name)
    }
}

/// Snapshot of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Service name.
    pub name: String,
    /// `ClusterIP`, `NodePort`, `LoadBalancer` or `ExternalName`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Pod selector.
    pub selector: BTreeMap<String, String>,
    /// Node port of the first port, when set.
    pub node_port: Option<i32>,
    /// Load balancer hostnames or IPs.
    pub load_balancer_hosts: Vec<String>,
}

impl ServiceSnapshot {
    /// Check if the service selects a pod with the given labels.
    ///
    /// A service without selector selects nothing.
    #[must_use]
    pub fn selects(&self, labels: &BTreeMap<String, String>) -> bool {
        !self.selector.is_empty()
            && self
                .selector
                .iter()
                .all(|(key, value)| labels.get(key) == Some(value))
    }
}

/// One routed path of an ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressPath {
    /// Rule host.
    pub host: Option<String>,
    /// Path, `/` when unset.
    pub path: String,
    /// `Prefix`, `Exact` or `ImplementationSpecific`.
    pub path_type: Option<String>,
    /// Backend service name.
    pub backend_service: Option<String>,
}

/// Snapshot of an ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressSnapshot {
    /// Ingress name.
    pub name: String,
    /// Flattened rule paths.
    pub paths: Vec<IngressPath>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_phase_from_k8s() {
        assert_eq!(PodPhase::from_k8s_phase("Pending"), PodPhase::Pending);
        assert_eq!(PodPhase::from_k8s_phase("Running"), PodPhase::Running);
        assert_eq!(PodPhase::from_k8s_phase("Succeeded"), PodPhase::Succeeded);
        assert_eq!(PodPhase::from_k8s_phase("Failed"), PodPhase::Failed);
        assert_eq!(PodPhase::from_k8s_phase("Unknown"), PodPhase::Unknown);
        assert_eq!(PodPhase::from_k8s_phase("Evicted"), PodPhase::Invalid);
        assert_eq!(PodPhase::from_k8s_phase(""), PodPhase::Invalid);
    }

    #[test]
    fn service_selector_matching() {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "web".to_string());
        labels.insert("tier".to_string(), "frontend".to_string());

        let mut svc = ServiceSnapshot {
            name: "web".to_string(),
            type_: "ClusterIP".to_string(),
            selector: BTreeMap::new(),
            node_port: None,
            load_balancer_hosts: Vec::new(),
        };
        assert!(!svc.selects(&labels));

        svc.selector.insert("app".to_string(), "web".to_string());
        assert!(svc.selects(&labels));

        svc.selector.insert("tier".to_string(), "backend".to_string());
        assert!(!svc.selects(&labels));
    }

    #[test]
    fn event_matching() {
        let event = EventSnapshot {
            type_: "Warning".to_string(),
            reason: Some("FailedMount".to_string()),
            message: None,
            involved_kind: Some("Pod".to_string()),
            involved_name: Some("web-0".to_string()),
            reporting_instance: None,
        };
        assert!(event.is_warning());
        assert!(event.involves_pod("web-0"));
        assert!(!event.involves_pod("web-1"));
    }

    #[test]
    fn container_state_serializes_with_tag() {
        let state = ContainerState::Waiting {
            reason: WaitingReason::CrashLoopBackOff,
            message: None,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "waiting");
        assert_eq!(json["reason"], "CrashLoopBackOff");
    }
}
