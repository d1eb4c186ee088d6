//! Findings: the structured unit of diagnostic output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a finding is.
///
/// Ordered so that `Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational, nothing to fix.
    Info,
    /// Something that likely needs attention.
    Warning,
    /// A definite fault.
    Error,
}

impl Severity {
    /// Lowercase label used in text output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    // Container diagnoses
    /// Container is ready, or terminated with `Completed`.
    Healthy,
    /// Terminated with `OOMKilled`.
    MemoryExceeded,
    /// Terminated with `ContainerCannotRun`.
    ImageConfigError,
    /// Terminated with `DeadlineExceeded`.
    ProbeOrJobTimeout,
    /// Terminated with `Error`.
    GenericContainerError,
    /// Terminated with an unrecognized reason.
    UnclassifiedTermination,
    /// Waiting on an image pull failure.
    ImagePullFailure,
    /// Image pull failed and the pod declares no pull secrets.
    MissingPullSecret,
    /// A container uses pull policy `Never`.
    PullPolicyNeverMisconfigured,
    /// The image registry is unreachable.
    RegistryUnreachable,
    /// The image reference is invalid.
    InvalidImageReference,
    /// The container configuration could not be resolved.
    ConfigResolutionError,
    /// Container creation failed, often due to a bad mount.
    MountOrConfigError,
    /// The container is still being created.
    StillCreating,
    /// The container keeps crashing.
    CrashLooping,
    /// Node networking or runtime is not ready.
    InfrastructureNotReady,
    /// A lifecycle hook failed.
    LifecycleHookError,
    /// Waiting with an unrecognized reason.
    UnclassifiedWaiting,
    /// Not ready and no state reported.
    UnknownContainerState,
    /// The pod reports no container statuses.
    NoContainersFound,

    // Volume binding
    /// Referenced secret exists.
    SecretFound,
    /// Referenced secret does not exist.
    SecretMissing,
    /// Referenced config map exists.
    ConfigMapFound,
    /// Referenced config map does not exist.
    ConfigMapMissing,
    /// Claim is bound.
    PvcBound,
    /// Claim is pending.
    PvcPending,
    /// Claim is in another phase.
    PvcOther,
    /// Referenced claim does not exist.
    PvcMissing,
    /// A volume lookup failed for a reason other than absence.
    VolumeLookupFailed,

    // Quota
    /// Usage above the saturation threshold.
    QuotaNearLimit,
    /// Usage within the threshold.
    QuotaWithinThreshold,
    /// The hard limit is zero.
    QuotaHardLimitZero,
    /// A quota quantity could not be normalized.
    QuotaUnparseable,
    /// The namespace has no resource quotas.
    NoResourceQuota,

    // Pod
    /// The pod is running.
    PodRunning,
    /// The pod is in a problem phase.
    PodNotRunning,
    /// The pod is scheduled on a node.
    NodeAllocated,
    /// The pod is not scheduled on any node.
    NodeNotAllocated,
    /// A scheduling condition reported by the pod.
    SchedulingCondition,
    /// The pod completed.
    PodCompleted,
    /// The pod reports an unrecognized phase.
    InvalidPhase,
    /// An expected sub-structure was absent.
    NoData,
    /// A warning event involving the pod.
    WarningEvent,

    // Namespace and queries
    /// The namespace has no pods.
    NoPodsFound,
    /// A cluster query failed; the sub-check was skipped.
    QueryFailed,

    // Network
    /// A service selects the pod.
    ServiceMapped,
    /// No service selects the pod.
    NoServiceMapped,
    /// The ingress answered 200.
    IngressReachable,
    /// The ingress answered with a redirect or auth challenge.
    IngressResponding,
    /// The ingress answered with a client or server error.
    IngressBroken,
    /// The ingress answered with an unexpected status.
    IngressNeedsCheck,
    /// The ingress could not be reached over https or http.
    IngressUnreachable,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single diagnostic output unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// How serious the finding is.
    pub severity: Severity,
    /// Category tag.
    pub category: Category,
    /// What the finding is about, e.g. `container/web` or `secret/db-creds`.
    pub subject: String,
    /// Human-readable message.
    pub message: String,
    /// Suggested remediation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Recent log lines attached to the finding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_excerpt: Option<String>,
}

impl Finding {
    /// Create a finding without hint or log excerpt.
    #[must_use]
    pub fn new(
        severity: Severity,
        category: Category,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            subject: subject.into(),
            message: message.into(),
            hint: None,
            log_excerpt: None,
        }
    }

    /// Shorthand for an informational finding.
    #[must_use]
    pub fn info(
        category: Category,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, category, subject, message)
    }

    /// Shorthand for a warning finding.
    #[must_use]
    pub fn warning(
        category: Category,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, category, subject, message)
    }

    /// Shorthand for an error finding.
    #[must_use]
    pub fn error(
        category: Category,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, category, subject, message)
    }

    /// Attach a remediation hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a log excerpt.
    #[must_use]
    pub fn with_log_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.log_excerpt = Some(excerpt.into());
        self
    }
}
