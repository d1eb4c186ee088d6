//! Per-pod diagnosis driven by the pod phase.
//!
//! ```text
//!   Running ──────────────▶ containers (+ services/ingresses)
//!   Pending │ Failed │ Unknown
//!        └──▶ node check ── allocated ─────▶ done
//!                  └─ not allocated ─▶ volumes, quotas, containers
//!   Succeeded ────────────▶ completed
//!   anything else ────────▶ invalid
//! ```

use kube_wrench_cluster::{ClusterQuery, IngressProber};
use kube_wrench_core::{Category, EventSnapshot, Finding, PodPhase, PodReport, PodSnapshot};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::container::{ContainerDiagnoser, FollowUp};
use crate::events::pod_warning_events;
use crate::network::NetworkView;
use crate::quota::check_namespace_quotas;
use crate::volume::{VolumeBindingChecker, VolumeScope};

/// Namespace data shared by every pod of a scan.
#[derive(Debug, Clone, Default)]
pub struct NamespaceContext {
    /// Namespace events, when event correlation is on and the listing
    /// succeeded.
    pub events: Option<Vec<EventSnapshot>>,
    /// Services and ingresses, when network correlation is on.
    pub network: Option<NetworkView>,
}

/// Diagnoses single pods.
pub struct PodDiagnoser<'a, C: ?Sized, P: ?Sized> {
    cluster: &'a C,
    prober: &'a P,
    config: &'a ScanConfig,
    containers: ContainerDiagnoser,
}

impl<'a, C, P> PodDiagnoser<'a, C, P>
where
    C: ClusterQuery + ?Sized,
    P: IngressProber + ?Sized,
{
    /// Create a pod diagnoser.
    #[must_use]
    pub fn new(cluster: &'a C, prober: &'a P, config: &'a ScanConfig) -> Self {
        Self {
            cluster,
            prober,
            config,
            containers: ContainerDiagnoser::new(config.crash_loop_restarts),
        }
    }

    /// Diagnose one pod. Never fails; query errors become findings.
    pub async fn diagnose(&self, pod: &PodSnapshot, ctx: &NamespaceContext) -> PodReport {
        let mut report = PodReport::new(&pod.name, &pod.phase);
        let phase = pod.phase();
        let subject = format!("pod/{}", pod.name);

        match phase {
            PodPhase::Running => {
                info!(namespace = %pod.namespace, pod = %pod.name, "Pod is running");
                report.push(Finding::info(Category::PodRunning, subject, "pod is Running"));
                self.diagnose_containers(pod, &mut report).await;
                if let Some(view) = &ctx.network {
                    report.extend(view.check_pod(pod, self.prober).await);
                }
            }
            PodPhase::Pending | PodPhase::Failed | PodPhase::Unknown => {
                warn!(
                    namespace = %pod.namespace,
                    pod = %pod.name,
                    phase = %pod.phase,
                    "Pod is not running"
                );
                report.push(Finding::warning(
                    Category::PodNotRunning,
                    subject,
                    format!("pod is in {} phase", pod.phase),
                ));

                if !Self::check_node(pod, &mut report) {
                    let volumes = VolumeBindingChecker::new(self.cluster)
                        .check(pod, VolumeScope::All)
                        .await;
                    report.extend(volumes);
                    report.extend(check_namespace_quotas(self.cluster, &pod.namespace).await);
                    self.diagnose_containers(pod, &mut report).await;
                }

                if let Some(events) = &ctx.events {
                    report.extend(pod_warning_events(events, &pod.name));
                }
            }
            PodPhase::Succeeded => {
                report.push(Finding::info(Category::PodCompleted, subject, "pod completed"));
            }
            PodPhase::Invalid => {
                warn!(
                    namespace = %pod.namespace,
                    pod = %pod.name,
                    phase = %pod.phase,
                    "Invalid pod phase"
                );
                report.push(Finding::error(
                    Category::InvalidPhase,
                    subject,
                    format!("pod reports unrecognized phase {:?}", pod.phase),
                ));
            }
        }

        report
    }

    /// Report node allocation. Returns true when the pod has a node.
    fn check_node(pod: &PodSnapshot, report: &mut PodReport) -> bool {
        if let Some(node) = pod.node_name.as_deref().filter(|n| !n.is_empty()) {
            report.push(Finding::info(
                Category::NodeAllocated,
                format!("node/{node}"),
                format!("pod is scheduled on node {node}"),
            ));
            return true;
        }

        report.push(
            Finding::error(
                Category::NodeNotAllocated,
                format!("pod/{}", pod.name),
                "pod is not scheduled on any node",
            )
            .with_hint("check the scheduler, node capacity, taints and affinity rules"),
        );

        if pod.conditions.is_empty() {
            report.push(Finding::warning(
                Category::NoData,
                format!("pod/{}", pod.name),
                "pod reports no scheduling conditions",
            ));
        }
        for condition in &pod.conditions {
            let mut message = format!("{} is {}", condition.type_, condition.status);
            if let Some(reason) = &condition.reason {
                message.push_str(&format!(": {reason}"));
            }
            if let Some(detail) = &condition.message {
                message.push_str(&format!(": {detail}"));
            }
            let subject = format!("condition/{}", condition.type_);
            report.push(if condition.status == "True" {
                Finding::info(Category::SchedulingCondition, subject, message)
            } else {
                Finding::warning(Category::SchedulingCondition, subject, message)
            });
        }

        false
    }

    async fn diagnose_containers(&self, pod: &PodSnapshot, report: &mut PodReport) {
        let Some(statuses) = &pod.container_statuses else {
            report.push(ContainerDiagnoser::no_containers(pod));
            return;
        };

        let mut mounts_checked = false;
        for status in statuses {
            let diagnosis = self.containers.diagnose(status, pod);
            debug!(
                namespace = %pod.namespace,
                pod = %pod.name,
                container = %status.name,
                category = %diagnosis.category,
                "Diagnosed container"
            );

            let mut findings = diagnosis.findings;
            let mut extra = Vec::new();
            for follow_up in diagnosis.follow_ups {
                match follow_up {
                    FollowUp::AttachLogTail { container } => {
                        match self.log_tail(pod, &container).await {
                            Ok(Some(logs)) => {
                                if let Some(primary) = findings.first_mut() {
                                    primary.log_excerpt = Some(logs);
                                }
                            }
                            Ok(None) => {}
                            Err(finding) => extra.push(finding),
                        }
                    }
                    FollowUp::CheckMounts if !mounts_checked => {
                        mounts_checked = true;
                        extra.extend(
                            VolumeBindingChecker::new(self.cluster)
                                .check(pod, VolumeScope::SecretsAndConfigMaps)
                                .await,
                        );
                    }
                    FollowUp::CheckMounts => {}
                }
            }

            report.extend(findings);
            report.extend(extra);
        }
    }

    /// Tail the current logs, falling back to the previous instance when
    /// the current one has nothing.
    async fn log_tail(
        &self,
        pod: &PodSnapshot,
        container: &str,
    ) -> Result<Option<String>, Finding> {
        let lines = self.config.log_tail_lines;
        let mut last_error = None;

        for previous in [false, true] {
            match self
                .cluster
                .get_pod_logs(&pod.namespace, &pod.name, container, lines, previous)
                .await
            {
                Ok(Some(logs)) if !logs.trim().is_empty() => {
                    return Ok(Some(logs.trim_end().to_string()));
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(pod = %pod.name, container, previous, error = %e, "Log read failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => {
                warn!(
                    namespace = %pod.namespace,
                    pod = %pod.name,
                    container,
                    error = %e,
                    "Could not read logs in current or previous run"
                );
                Err(Finding::warning(
                    Category::QueryFailed,
                    format!("container/{container}"),
                    format!("could not read logs: {e}"),
                ))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube_wrench_cluster::{MockCluster, MockProber, QueryOp};
    use kube_wrench_core::{
        ContainerState, ContainerStatus, PodCondition, QueryError, ResourceQuotaSnapshot,
        Severity, VolumeReference, WaitingReason,
    };

    fn crash_looping(restarts: u32) -> ContainerStatus {
        ContainerStatus {
            name: "web".to_string(),
            ready: false,
            restart_count: restarts,
            image: "shop/web:1.4".to_string(),
            image_pull_policy: Some("IfNotPresent".to_string()),
            state: Some(ContainerState::Waiting {
                reason: WaitingReason::CrashLoopBackOff,
                message: Some("back-off 5m0s restarting failed container".to_string()),
            }),
        }
    }

    fn categories(report: &PodReport) -> Vec<Category> {
        report.findings.iter().map(|f| f.category).collect()
    }

    async fn run(cluster: &MockCluster, pod: &PodSnapshot, ctx: &NamespaceContext) -> PodReport {
        let config = ScanConfig::default();
        let prober = MockProber::new();
        PodDiagnoser::new(cluster, &prober, &config)
            .diagnose(pod, ctx)
            .await
    }

    #[tokio::test]
    async fn running_crash_loop_attaches_previous_logs() {
        let cluster = MockCluster::new();
        cluster.set_logs("shop", "web-0", "web", true, "panic: missing DATABASE_URL\n");

        let mut pod = PodSnapshot::new("shop", "web-0", "Running");
        pod.node_name = Some("node-1".to_string());
        pod.container_statuses = Some(vec![crash_looping(5)]);

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert_eq!(
            categories(&report),
            vec![Category::PodRunning, Category::CrashLooping]
        );
        let crash = &report.findings[1];
        assert_eq!(
            crash.log_excerpt.as_deref(),
            Some("panic: missing DATABASE_URL")
        );
        assert_eq!(cluster.call_count(QueryOp::GetPodLogs, "shop"), 2);
    }

    #[tokio::test]
    async fn log_failure_becomes_finding() {
        let cluster = MockCluster::new();
        cluster.fail(
            QueryOp::GetPodLogs,
            "shop",
            QueryError::Timeout {
                operation: "read pod logs".to_string(),
                seconds: 10,
            },
        );

        let mut pod = PodSnapshot::new("shop", "web-0", "Running");
        pod.container_statuses = Some(vec![crash_looping(4)]);

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert_eq!(
            categories(&report),
            vec![
                Category::PodRunning,
                Category::CrashLooping,
                Category::QueryFailed
            ]
        );
        assert!(report.findings[1].log_excerpt.is_none());
    }

    #[tokio::test]
    async fn running_without_statuses() {
        let cluster = MockCluster::new();
        let pod = PodSnapshot::new("shop", "web-0", "Running");

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert_eq!(
            categories(&report),
            vec![Category::PodRunning, Category::NoContainersFound]
        );
    }

    #[tokio::test]
    async fn pending_on_node_stops_after_node_check() {
        let cluster = MockCluster::new();
        let mut pod = PodSnapshot::new("shop", "web-0", "Pending");
        pod.node_name = Some("node-1".to_string());
        pod.volumes.push(VolumeReference::Secret {
            name: "db-creds".to_string(),
        });

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert_eq!(
            categories(&report),
            vec![Category::PodNotRunning, Category::NodeAllocated]
        );
        assert_eq!(cluster.total_calls(QueryOp::GetSecret), 0);
        assert_eq!(cluster.total_calls(QueryOp::ListResourceQuotas), 0);
    }

    #[tokio::test]
    async fn unschedulable_pod_runs_volume_and_quota_checks() {
        let cluster = MockCluster::new();
        cluster.add_quota(
            ResourceQuotaSnapshot::new("shop", "compute").with_resource("pods", "10", "10"),
        );
        cluster.add_pvc("shop", "web-data", Some("Pending"));

        let mut pod = PodSnapshot::new("shop", "web-0", "Pending");
        pod.volumes.push(VolumeReference::Pvc {
            claim_name: "web-data".to_string(),
        });
        pod.conditions.push(PodCondition {
            type_: "PodScheduled".to_string(),
            status: "False".to_string(),
            reason: Some("Unschedulable".to_string()),
            message: Some("0/3 nodes are available: 3 Insufficient cpu.".to_string()),
        });

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert_eq!(
            categories(&report),
            vec![
                Category::PodNotRunning,
                Category::NodeNotAllocated,
                Category::SchedulingCondition,
                Category::PvcPending,
                Category::QuotaNearLimit,
                Category::NoContainersFound,
            ]
        );
        assert!(report.findings[2].message.contains("Unschedulable"));
        assert_eq!(report.findings[2].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn unscheduled_without_conditions_reports_no_data() {
        let cluster = MockCluster::new();
        let pod = PodSnapshot::new("shop", "web-0", "Unknown");

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert!(categories(&report).contains(&Category::NoData));
    }

    #[tokio::test]
    async fn succeeded_pod_is_terminal() {
        let cluster = MockCluster::new();
        let mut pod = PodSnapshot::new("shop", "job-1", "Succeeded");
        pod.volumes.push(VolumeReference::Secret {
            name: "db-creds".to_string(),
        });

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert_eq!(categories(&report), vec![Category::PodCompleted]);
        assert_eq!(cluster.total_calls(QueryOp::GetSecret), 0);
    }

    #[tokio::test]
    async fn unknown_phase_string_is_invalid() {
        let cluster = MockCluster::new();
        let pod = PodSnapshot::new("shop", "web-0", "Exploded");

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert_eq!(categories(&report), vec![Category::InvalidPhase]);
        assert_eq!(report.findings[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn mount_error_checks_secrets_once() {
        let cluster = MockCluster::new();
        let mut pod = PodSnapshot::new("shop", "web-0", "Running");
        pod.volumes.push(VolumeReference::ConfigMap {
            name: "web-settings".to_string(),
        });
        let mut first = crash_looping(0);
        first.state = Some(ContainerState::Waiting {
            reason: WaitingReason::CreateContainerError,
            message: None,
        });
        let mut second = first.clone();
        second.name = "sidecar".to_string();
        pod.container_statuses = Some(vec![first, second]);

        let report = run(&cluster, &pod, &NamespaceContext::default()).await;
        assert_eq!(
            categories(&report),
            vec![
                Category::PodRunning,
                Category::MountOrConfigError,
                Category::ConfigMapMissing,
                Category::MountOrConfigError,
            ]
        );
        assert_eq!(cluster.total_calls(QueryOp::GetConfigMap), 1);
    }

    #[tokio::test]
    async fn warning_events_attach_to_pending_pods() {
        let cluster = MockCluster::new();
        let mut pod = PodSnapshot::new("shop", "web-0", "Pending");
        pod.node_name = Some("node-1".to_string());
        let ctx = NamespaceContext {
            events: Some(vec![EventSnapshot {
                type_: "Warning".to_string(),
                reason: Some("FailedMount".to_string()),
                message: Some("secret \"db-creds\" not found".to_string()),
                involved_kind: Some("Pod".to_string()),
                involved_name: Some("web-0".to_string()),
                reporting_instance: None,
            }]),
            network: None,
        };

        let report = run(&cluster, &pod, &ctx).await;
        assert_eq!(report.findings.last().unwrap().category, Category::WarningEvent);
    }
}
