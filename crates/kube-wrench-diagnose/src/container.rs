//! Per-container diagnosis.
//!
//! [`ContainerDiagnoser::diagnose`] is a pure function of the container
//! status and its pod. Anything that needs the cluster (log tails, mount
//! checks) is returned as a [`FollowUp`] for the caller to run.

use kube_wrench_core::{
    Category, ContainerState, ContainerStatus, Finding, PodSnapshot, TerminatedReason,
    WaitingReason,
};

use crate::config::DEFAULT_CRASH_LOOP_RESTARTS;

const CRASH_LOOP_HINT: &str = "likely causes: bad image, application error, failing health probe";

/// Cluster work requested by a container diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Attach the tail of the container's logs to the primary finding.
    AttachLogTail {
        /// Container to read logs from.
        container: String,
    },
    /// Check that the pod's secrets and config maps resolve.
    CheckMounts,
}

/// Result of diagnosing one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDiagnosis {
    /// Container name.
    pub container: String,
    /// Primary category.
    pub category: Category,
    /// Findings, primary first.
    pub findings: Vec<Finding>,
    /// Cluster checks to run next.
    pub follow_ups: Vec<FollowUp>,
}

impl ContainerDiagnosis {
    fn new(container: &str, primary: Finding) -> Self {
        Self {
            container: container.to_string(),
            category: primary.category,
            findings: vec![primary],
            follow_ups: Vec::new(),
        }
    }

    fn with(mut self, finding: Finding) -> Self {
        self.findings.push(finding);
        self
    }

    fn follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_ups.push(follow_up);
        self
    }
}

/// Classifies container runtime state.
#[derive(Debug, Clone, Copy)]
pub struct ContainerDiagnoser {
    crash_loop_restarts: u32,
}

impl Default for ContainerDiagnoser {
    fn default() -> Self {
        Self::new(DEFAULT_CRASH_LOOP_RESTARTS)
    }
}

impl ContainerDiagnoser {
    /// Create a diagnoser. Crash-looping containers with more than
    /// `crash_loop_restarts` restarts get a log tail and a hint.
    #[must_use]
    pub const fn new(crash_loop_restarts: u32) -> Self {
        Self {
            crash_loop_restarts,
        }
    }

    /// Diagnose one container of `pod`.
    #[must_use]
    pub fn diagnose(&self, status: &ContainerStatus, pod: &PodSnapshot) -> ContainerDiagnosis {
        let subject = format!("container/{}", status.name);

        if status.ready {
            return ContainerDiagnosis::new(
                &status.name,
                Finding::info(Category::Healthy, subject, "container is ready"),
            );
        }

        match &status.state {
            Some(ContainerState::Terminated {
                reason,
                message,
                exit_code,
                ..
            }) => Self::terminated(status, subject, reason, message.as_deref(), *exit_code),
            Some(ContainerState::Waiting { reason, message }) => {
                self.waiting(status, pod, subject, reason, message.as_deref())
            }
            Some(ContainerState::Running { .. }) => ContainerDiagnosis::new(
                &status.name,
                Finding::warning(
                    Category::UnknownContainerState,
                    subject,
                    "container is running but not ready",
                )
                .with_hint("check the readiness probe"),
            ),
            None => ContainerDiagnosis::new(
                &status.name,
                Finding::warning(
                    Category::UnknownContainerState,
                    subject,
                    "container is not ready and reports no state",
                ),
            ),
        }
    }

    fn terminated(
        status: &ContainerStatus,
        subject: String,
        reason: &TerminatedReason,
        message: Option<&str>,
        exit_code: i32,
    ) -> ContainerDiagnosis {
        let category = reason.category();
        let text = with_message(
            format!("terminated with {reason} (exit code {exit_code})"),
            message,
        );

        let finding = match reason {
            TerminatedReason::OomKilled => Finding::error(category, subject, text)
                .with_hint("raise the container's memory limits and requests"),
            TerminatedReason::ContainerCannotRun => Finding::error(category, subject, text)
                .with_hint("check the configuration inside the container image"),
            TerminatedReason::DeadlineExceeded => Finding::error(category, subject, text)
                .with_hint("a probe or job deadline expired; check timeouts"),
            TerminatedReason::Error => Finding::error(category, subject, text)
                .with_hint("the process exited with an error; check the image and its logs"),
            TerminatedReason::Completed => Finding::info(
                category,
                subject,
                "container completed its run and shut down",
            ),
            TerminatedReason::Other(_) => Finding::warning(category, subject, text),
        };

        ContainerDiagnosis::new(&status.name, finding)
    }

    fn waiting(
        &self,
        status: &ContainerStatus,
        pod: &PodSnapshot,
        subject: String,
        reason: &WaitingReason,
        message: Option<&str>,
    ) -> ContainerDiagnosis {
        let category = reason.category();
        let text = with_message(
            format!("waiting in {reason} (restarts: {})", status.restart_count),
            message,
        );

        match reason {
            WaitingReason::ImagePullBackOff
            | WaitingReason::ErrImagePull
            | WaitingReason::ErrImageNeverPull => {
                let mut diagnosis = ContainerDiagnosis::new(
                    &status.name,
                    Finding::error(
                        category,
                        subject.clone(),
                        with_message(format!("failed pulling image {}", status.image), message),
                    )
                    .with_hint("check the image name, tag and registry credentials"),
                );
                if !pod.has_pull_secrets() {
                    diagnosis = diagnosis.with(Finding::warning(
                        Category::MissingPullSecret,
                        subject.clone(),
                        "pod declares no image pull secrets",
                    ));
                }
                if pull_policy(status, pod) == Some("Never") {
                    diagnosis = diagnosis.with(
                        Finding::warning(
                            Category::PullPolicyNeverMisconfigured,
                            subject,
                            "image pull policy is Never",
                        )
                        .with_hint("use IfNotPresent or pre-load the image on the node"),
                    );
                }
                diagnosis
            }
            WaitingReason::RegistryUnavailable => ContainerDiagnosis::new(
                &status.name,
                Finding::error(category, subject, text)
                    .with_hint("the image registry is unreachable from the node"),
            ),
            WaitingReason::InvalidImageName => ContainerDiagnosis::new(
                &status.name,
                Finding::error(
                    category,
                    subject,
                    with_message(format!("invalid image name {}", status.image), message),
                ),
            ),
            WaitingReason::CreateContainerConfigError => ContainerDiagnosis::new(
                &status.name,
                Finding::error(category, subject, text)
                    .with_hint("a referenced config map, secret or key could not be resolved"),
            ),
            WaitingReason::RunContainerError | WaitingReason::CreateContainerError => {
                ContainerDiagnosis::new(
                    &status.name,
                    Finding::error(category, subject, text).with_hint(
                        "possible causes: mounting a missing config map or secret, \
                         mounting a read-only volume as read-write",
                    ),
                )
                .follow_up(FollowUp::CheckMounts)
            }
            WaitingReason::ContainerCreating => ContainerDiagnosis::new(
                &status.name,
                Finding::info(category, subject, text),
            ),
            WaitingReason::ImageInspectError | WaitingReason::CrashLoopBackOff => {
                if status.restart_count > self.crash_loop_restarts {
                    ContainerDiagnosis::new(
                        &status.name,
                        Finding::error(category, subject, text).with_hint(CRASH_LOOP_HINT),
                    )
                    .follow_up(FollowUp::AttachLogTail {
                        container: status.name.clone(),
                    })
                } else {
                    ContainerDiagnosis::new(&status.name, Finding::error(category, subject, text))
                }
            }
            WaitingReason::NetworkPluginNotReady | WaitingReason::DockerDaemonNotReady => {
                ContainerDiagnosis::new(
                    &status.name,
                    Finding::error(category, subject, text)
                        .with_hint("node infrastructure is not ready; check the node"),
                )
            }
            WaitingReason::PreStartHookError | WaitingReason::PostStartHookError => {
                ContainerDiagnosis::new(
                    &status.name,
                    Finding::error(category, subject, text)
                        .with_hint("check the container's lifecycle hooks"),
                )
            }
            WaitingReason::Other(_) => ContainerDiagnosis::new(
                &status.name,
                Finding::warning(category, subject, text),
            ),
        }
    }

    /// Finding for a pod whose container status list is absent.
    #[must_use]
    pub fn no_containers(pod: &PodSnapshot) -> Finding {
        Finding::warning(
            Category::NoContainersFound,
            format!("pod/{}", pod.name),
            "pod reports no container statuses",
        )
    }
}

fn pull_policy<'a>(status: &'a ContainerStatus, pod: &'a PodSnapshot) -> Option<&'a str> {
    status.image_pull_policy.as_deref().or_else(|| {
        pod.container_spec(&status.name)
            .and_then(|spec| spec.image_pull_policy.as_deref())
    })
}

fn with_message(text: String, message: Option<&str>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!("{text}: {m}"),
        _ => text,
    }
}
