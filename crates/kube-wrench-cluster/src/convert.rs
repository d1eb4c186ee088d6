//! Conversion from `k8s-openapi` objects into core snapshots.
//!
//! Missing optional fields degrade to empty values; the diagnosis engine
//! reports them as "no data" instead of failing.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMap, ContainerState as K8sContainerState, ContainerStatus as K8sContainerStatus, Event,
    Namespace, PersistentVolumeClaim, Pod, ResourceQuota, Secret, Service, Volume,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube_wrench_core::{
    ContainerSpec, ContainerState, ContainerStatus, DataObjectSnapshot, EventSnapshot, IngressPath,
    IngressSnapshot, NamespaceInfo, PodCondition, PodSnapshot, PvcSnapshot, QuotaUsage,
    ResourceQuotaSnapshot, ServiceSnapshot, TerminatedReason, VolumeReference, WaitingReason,
};

/// Normalize a name field that is optional in some API versions and
/// required in others. Empty names count as absent.
fn optional_name(name: impl Into<Option<String>>) -> Option<String> {
    name.into().filter(|n| !n.is_empty())
}

/// Convert a namespace.
#[must_use]
pub fn namespace_info(ns: &Namespace) -> NamespaceInfo {
    NamespaceInfo {
        name: ns.metadata.name.clone().unwrap_or_default(),
        phase: ns.status.as_ref().and_then(|s| s.phase.clone()),
    }
}

fn volume_reference(volume: &Volume) -> VolumeReference {
    if let Some(name) = volume
        .secret
        .as_ref()
        .and_then(|s| s.secret_name.clone())
    {
        return VolumeReference::Secret { name };
    }
    if let Some(name) = volume
        .config_map
        .as_ref()
        .and_then(|cm| optional_name(cm.name.clone()))
    {
        return VolumeReference::ConfigMap { name };
    }
    if let Some(pvc) = &volume.persistent_volume_claim {
        return VolumeReference::Pvc {
            claim_name: pvc.claim_name.clone(),
        };
    }
    VolumeReference::Other {
        name: volume.name.clone(),
    }
}

fn container_state(state: &K8sContainerState) -> Option<ContainerState> {
    if let Some(terminated) = &state.terminated {
        return Some(ContainerState::Terminated {
            reason: TerminatedReason::parse(terminated.reason.as_deref().unwrap_or("Unknown")),
            message: terminated.message.clone(),
            exit_code: terminated.exit_code,
            finished_at: terminated.finished_at.as_ref().map(|t| t.0),
        });
    }
    if let Some(waiting) = &state.waiting {
        return Some(ContainerState::Waiting {
            reason: WaitingReason::parse(waiting.reason.as_deref().unwrap_or("Unknown")),
            message: waiting.message.clone(),
        });
    }
    state
        .running
        .as_ref()
        .map(|running| ContainerState::Running {
            started_at: running.started_at.as_ref().map(|t| t.0),
        })
}

fn container_status(status: &K8sContainerStatus, specs: &[ContainerSpec]) -> ContainerStatus {
    let image_pull_policy = specs
        .iter()
        .find(|spec| spec.name == status.name)
        .and_then(|spec| spec.image_pull_policy.clone());

    ContainerStatus {
        name: status.name.clone(),
        ready: status.ready,
        restart_count: status.restart_count.unsigned_abs(),
        image: status.image.clone(),
        image_pull_policy,
        state: status.state.as_ref().and_then(container_state),
    }
}

/// Convert a pod.
///
/// `namespace` is used when the object itself carries no namespace.
#[must_use]
pub fn pod_snapshot(pod: &Pod, namespace: &str) -> PodSnapshot {
    let spec = pod.spec.as_ref();
    let status = pod.status.as_ref();

    let containers: Vec<ContainerSpec> = spec
        .map(|s| {
            s.containers
                .iter()
                .map(|c| ContainerSpec {
                    name: c.name.clone(),
                    image: c.image.clone(),
                    image_pull_policy: c.image_pull_policy.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let container_statuses = status.and_then(|s| s.container_statuses.as_ref()).map(|cs| {
        cs.iter()
            .map(|c| container_status(c, &containers))
            .collect()
    });

    PodSnapshot {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| namespace.to_string()),
        phase: status
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        node_name: spec.and_then(|s| s.node_name.clone()),
        pod_ip: status.and_then(|s| s.pod_ip.clone()),
        labels: pod.metadata.labels.clone().unwrap_or_default(),
        volumes: spec
            .and_then(|s| s.volumes.as_ref())
            .map(|v| v.iter().map(volume_reference).collect())
            .unwrap_or_default(),
        image_pull_secrets: spec
            .and_then(|s| s.image_pull_secrets.as_ref())
            .map(|secrets| {
                secrets
                    .iter()
                    .filter_map(|r| optional_name(r.name.clone()))
                    .collect()
            })
            .unwrap_or_default(),
        conditions: status
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|c| PodCondition {
                        type_: c.type_.clone(),
                        status: c.status.clone(),
                        reason: c.reason.clone(),
                        message: c.message.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        containers,
        container_statuses,
    }
}

fn quantity_map(map: Option<&BTreeMap<String, Quantity>>) -> BTreeMap<String, String> {
    map.map(|m| m.iter().map(|(k, v)| (k.clone(), v.0.clone())).collect())
        .unwrap_or_default()
}

/// Convert a resource quota.
///
/// Hard limits come from the status, falling back to the spec when the
/// quota controller has not filled the status yet.
#[must_use]
pub fn quota_snapshot(quota: &ResourceQuota, namespace: &str) -> ResourceQuotaSnapshot {
    let status = quota.status.as_ref();
    let mut hard = quantity_map(status.and_then(|s| s.hard.as_ref()));
    if hard.is_empty() {
        hard = quantity_map(quota.spec.as_ref().and_then(|s| s.hard.as_ref()));
    }
    let used = quantity_map(status.and_then(|s| s.used.as_ref()));

    let resources = hard
        .into_iter()
        .map(|(key, hard)| {
            let used = used.get(&key).cloned().unwrap_or_default();
            (key, QuotaUsage { used, hard })
        })
        .collect();

    ResourceQuotaSnapshot {
        namespace: quota
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| namespace.to_string()),
        name: quota.metadata.name.clone().unwrap_or_default(),
        resources,
    }
}

/// Convert a secret.
#[must_use]
pub fn secret_snapshot(secret: &Secret) -> DataObjectSnapshot {
    let mut keys: Vec<String> = secret
        .data
        .iter()
        .flat_map(|d| d.keys().cloned())
        .chain(secret.string_data.iter().flat_map(|d| d.keys().cloned()))
        .collect();
    keys.sort();
    keys.dedup();

    DataObjectSnapshot {
        name: secret.metadata.name.clone().unwrap_or_default(),
        keys,
    }
}

/// Convert a config map.
#[must_use]
pub fn config_map_snapshot(cm: &ConfigMap) -> DataObjectSnapshot {
    let mut keys: Vec<String> = cm
        .data
        .iter()
        .flat_map(|d| d.keys().cloned())
        .chain(cm.binary_data.iter().flat_map(|d| d.keys().cloned()))
        .collect();
    keys.sort();

    DataObjectSnapshot {
        name: cm.metadata.name.clone().unwrap_or_default(),
        keys,
    }
}

/// Convert a persistent volume claim.
#[must_use]
pub fn pvc_snapshot(pvc: &PersistentVolumeClaim) -> PvcSnapshot {
    PvcSnapshot {
        name: pvc.metadata.name.clone().unwrap_or_default(),
        phase: pvc.status.as_ref().and_then(|s| s.phase.clone()),
    }
}

/// Convert an event.
#[must_use]
pub fn event_snapshot(event: &Event) -> EventSnapshot {
    EventSnapshot {
        type_: event.type_.clone().unwrap_or_else(|| "Normal".to_string()),
        reason: event.reason.clone(),
        message: event.message.clone(),
        involved_kind: event.involved_object.kind.clone(),
        involved_name: event.involved_object.name.clone(),
        reporting_instance: event.reporting_instance.clone(),
    }
}

/// Convert a service.
#[must_use]
pub fn service_snapshot(svc: &Service) -> ServiceSnapshot {
    let spec = svc.spec.as_ref();

    ServiceSnapshot {
        name: svc.metadata.name.clone().unwrap_or_default(),
        type_: spec
            .and_then(|s| s.type_.clone())
            .unwrap_or_else(|| "ClusterIP".to_string()),
        selector: spec.and_then(|s| s.selector.clone()).unwrap_or_default(),
        node_port: spec
            .and_then(|s| s.ports.as_ref())
            .and_then(|ports| ports.first())
            .and_then(|p| p.node_port),
        load_balancer_hosts: svc
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|ingress| {
                ingress
                    .iter()
                    .filter_map(|i| i.hostname.clone().or_else(|| i.ip.clone()))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Convert an ingress, flattening rules into paths.
#[must_use]
pub fn ingress_snapshot(ing: &Ingress) -> IngressSnapshot {
    let paths = ing
        .spec
        .as_ref()
        .and_then(|s| s.rules.as_ref())
        .map(|rules| {
            rules
                .iter()
                .flat_map(|rule| {
                    rule.http
                        .iter()
                        .flat_map(|http| http.paths.iter())
                        .map(|path| IngressPath {
                            host: rule.host.clone(),
                            path: path.path.clone().unwrap_or_else(|| "/".to_string()),
                            path_type: optional_name(path.path_type.clone()),
                            backend_service: path.backend.service.as_ref().map(|s| s.name.clone()),
                        })
                })
                .collect()
        })
        .unwrap_or_default();

    IngressSnapshot {
        name: ing.metadata.name.clone().unwrap_or_default(),
        paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn crashing_pod() -> Pod {
        serde_json::from_value(json!({
            "metadata": { "name": "web-0", "labels": { "app": "web" } },
            "spec": {
                "containers": [{
                    "name": "web",
                    "image": "nginx:1.27",
                    "imagePullPolicy": "Never"
                }],
                "imagePullSecrets": [{ "name": "regcred" }, { "name": "" }],
                "volumes": [
                    { "name": "creds", "secret": { "secretName": "db-creds" } },
                    { "name": "settings", "configMap": { "name": "web-settings" } },
                    { "name": "data", "persistentVolumeClaim": { "claimName": "web-data" } },
                    { "name": "scratch", "emptyDir": {} }
                ]
            },
            "status": {
                "phase": "Running",
                "conditions": [{ "type": "Ready", "status": "False" }],
                "containerStatuses": [{
                    "name": "web",
                    "ready": false,
                    "restartCount": 5,
                    "image": "nginx:1.27",
                    "imageID": "",
                    "state": {
                        "waiting": { "reason": "CrashLoopBackOff", "message": "back-off 5m0s" }
                    }
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn pod_snapshot_maps_volumes_and_statuses() {
        let snapshot = pod_snapshot(&crashing_pod(), "shop");

        assert_eq!(snapshot.name, "web-0");
        assert_eq!(snapshot.namespace, "shop");
        assert_eq!(snapshot.phase, "Running");
        assert_eq!(snapshot.labels["app"], "web");
        assert_eq!(snapshot.image_pull_secrets, vec!["regcred".to_string()]);
        assert_eq!(
            snapshot.volumes,
            vec![
                VolumeReference::Secret {
                    name: "db-creds".to_string()
                },
                VolumeReference::ConfigMap {
                    name: "web-settings".to_string()
                },
                VolumeReference::Pvc {
                    claim_name: "web-data".to_string()
                },
                VolumeReference::Other {
                    name: "scratch".to_string()
                },
            ]
        );

        let statuses = snapshot.container_statuses.unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].restart_count, 5);
        assert_eq!(statuses[0].image_pull_policy.as_deref(), Some("Never"));
        assert_eq!(
            statuses[0].state,
            Some(ContainerState::Waiting {
                reason: WaitingReason::CrashLoopBackOff,
                message: Some("back-off 5m0s".to_string()),
            })
        );
    }

    #[test]
    fn pod_without_status_has_no_container_statuses() {
        let pod: Pod = serde_json::from_value(json!({ "metadata": { "name": "bare" } })).unwrap();
        let snapshot = pod_snapshot(&pod, "default");

        assert_eq!(snapshot.phase, "Unknown");
        assert!(snapshot.container_statuses.is_none());
        assert!(snapshot.conditions.is_empty());
    }

    #[test]
    fn terminated_state_wins_over_waiting() {
        let state: K8sContainerState = serde_json::from_value(json!({
            "terminated": { "reason": "OOMKilled", "exitCode": 137 },
            "waiting": { "reason": "CrashLoopBackOff" }
        }))
        .unwrap();

        match container_state(&state) {
            Some(ContainerState::Terminated {
                reason, exit_code, ..
            }) => {
                assert_eq!(reason, TerminatedReason::OomKilled);
                assert_eq!(exit_code, 137);
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn quota_snapshot_pairs_used_with_hard() {
        let quota: ResourceQuota = serde_json::from_value(json!({
            "metadata": { "name": "compute" },
            "status": {
                "hard": { "cpu": "4", "pods": "10" },
                "used": { "cpu": "3500m" }
            }
        }))
        .unwrap();

        let snapshot = quota_snapshot(&quota, "shop");
        assert_eq!(snapshot.name, "compute");
        assert_eq!(snapshot.namespace, "shop");
        assert_eq!(snapshot.resources["cpu"].used, "3500m");
        assert_eq!(snapshot.resources["cpu"].hard, "4");
        assert_eq!(snapshot.resources["pods"].used, "");
    }

    #[test]
    fn quota_snapshot_falls_back_to_spec_hard() {
        let quota: ResourceQuota = serde_json::from_value(json!({
            "metadata": { "name": "fresh" },
            "spec": { "hard": { "memory": "2Gi" } }
        }))
        .unwrap();

        let snapshot = quota_snapshot(&quota, "shop");
        assert_eq!(snapshot.resources["memory"].hard, "2Gi");
        assert_eq!(snapshot.resources["memory"].used, "");
    }

    #[test]
    fn ingress_snapshot_flattens_rules() {
        let ing: Ingress = serde_json::from_value(json!({
            "metadata": { "name": "shop" },
            "spec": {
                "rules": [{
                    "host": "shop.example.com",
                    "http": {
                        "paths": [{
                            "path": "/api",
                            "pathType": "Prefix",
                            "backend": { "service": { "name": "api", "port": { "number": 80 } } }
                        }]
                    }
                }]
            }
        }))
        .unwrap();

        let snapshot = ingress_snapshot(&ing);
        assert_eq!(snapshot.paths.len(), 1);
        assert_eq!(snapshot.paths[0].host.as_deref(), Some("shop.example.com"));
        assert_eq!(snapshot.paths[0].path, "/api");
        assert_eq!(snapshot.paths[0].path_type.as_deref(), Some("Prefix"));
        assert_eq!(snapshot.paths[0].backend_service.as_deref(), Some("api"));
    }
}
