//! Container waiting and termination reasons.
//!
//! Kubernetes reports container reasons as free-form strings. They are parsed
//! once into closed enums here, and the mapping to a diagnosis [`Category`] is
//! an exhaustive match, so adding a reason forces a decision about how it is
//! diagnosed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::finding::Category;

/// Reason a container is in the `Waiting` state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WaitingReason {
    /// Back-off after repeated image pull failures.
    ImagePullBackOff,
    /// The image pull failed.
    ErrImagePull,
    /// The image is absent and the pull policy forbids pulling.
    ErrImageNeverPull,
    /// The image registry could not be reached.
    RegistryUnavailable,
    /// The image reference is not valid.
    InvalidImageName,
    /// A referenced config map or secret key could not be resolved.
    CreateContainerConfigError,
    /// The runtime failed to start the container.
    RunContainerError,
    /// The runtime failed to create the container.
    CreateContainerError,
    /// The container is still being created.
    ContainerCreating,
    /// The image could not be inspected.
    ImageInspectError,
    /// Back-off after repeated container crashes.
    CrashLoopBackOff,
    /// The CNI plugin is not ready.
    NetworkPluginNotReady,
    /// The container runtime daemon is not ready.
    DockerDaemonNotReady,
    /// The preStart hook failed.
    PreStartHookError,
    /// The postStart hook failed.
    PostStartHookError,
    /// Any reason not listed above.
    Other(String),
}

impl WaitingReason {
    /// Parse a reason string as reported by the kubelet.
    #[must_use]
    pub fn parse(reason: &str) -> Self {
        match reason {
            "ImagePullBackOff" => Self::ImagePullBackOff,
            "ErrImagePull" => Self::ErrImagePull,
            "ErrImageNeverPull" => Self::ErrImageNeverPull,
            "RegistryUnavailable" => Self::RegistryUnavailable,
            "InvalidImageName" => Self::InvalidImageName,
            "CreateContainerConfigError" => Self::CreateContainerConfigError,
            "RunContainerError" => Self::RunContainerError,
            "CreateContainerError" => Self::CreateContainerError,
            "ContainerCreating" => Self::ContainerCreating,
            "ImageInspectError" => Self::ImageInspectError,
            "CrashLoopBackOff" => Self::CrashLoopBackOff,
            "NetworkPluginNotReady" => Self::NetworkPluginNotReady,
            "DockerDaemonNotReady" => Self::DockerDaemonNotReady,
            "PreStartHookError" => Self::PreStartHookError,
            "PostStartHookError" => Self::PostStartHookError,
            other => Self::Other(other.to_string()),
        }
    }

    /// The reason as the kubelet spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ImagePullBackOff => "ImagePullBackOff",
            Self::ErrImagePull => "ErrImagePull",
            Self::ErrImageNeverPull => "ErrImageNeverPull",
            Self::RegistryUnavailable => "RegistryUnavailable",
            Self::InvalidImageName => "InvalidImageName",
            Self::CreateContainerConfigError => "CreateContainerConfigError",
            Self::RunContainerError => "RunContainerError",
            Self::CreateContainerError => "CreateContainerError",
            Self::ContainerCreating => "ContainerCreating",
            Self::ImageInspectError => "ImageInspectError",
            Self::CrashLoopBackOff => "CrashLoopBackOff",
            Self::NetworkPluginNotReady => "NetworkPluginNotReady",
            Self::DockerDaemonNotReady => "DockerDaemonNotReady",
            Self::PreStartHookError => "PreStartHookError",
            Self::PostStartHookError => "PostStartHookError",
            Self::Other(other) => other,
        }
    }

    /// Diagnosis category for this reason.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::ImagePullBackOff | Self::ErrImagePull | Self::ErrImageNeverPull => {
                Category::ImagePullFailure
            }
            Self::RegistryUnavailable => Category::RegistryUnreachable,
            Self::InvalidImageName => Category::InvalidImageReference,
            Self::CreateContainerConfigError => Category::ConfigResolutionError,
            Self::RunContainerError | Self::CreateContainerError => Category::MountOrConfigError,
            Self::ContainerCreating => Category::StillCreating,
            Self::ImageInspectError | Self::CrashLoopBackOff => Category::CrashLooping,
            Self::NetworkPluginNotReady | Self::DockerDaemonNotReady => {
                Category::InfrastructureNotReady
            }
            Self::PreStartHookError | Self::PostStartHookError => Category::LifecycleHookError,
            Self::Other(_) => Category::UnclassifiedWaiting,
        }
    }
}

impl fmt::Display for WaitingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WaitingReason {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<WaitingReason> for String {
    fn from(reason: WaitingReason) -> Self {
        reason.as_str().to_string()
    }
}

/// Reason a container is in the `Terminated` state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TerminatedReason {
    /// Killed by the kernel OOM killer.
    OomKilled,
    /// The runtime could not run the container.
    ContainerCannotRun,
    /// An active deadline or probe timeout expired.
    DeadlineExceeded,
    /// The process exited with a non-zero code.
    Error,
    /// The process exited successfully.
    Completed,
    /// Any reason not listed above.
    Other(String),
}

impl TerminatedReason {
    /// Parse a reason string as reported by the kubelet.
    #[must_use]
    pub fn parse(reason: &str) -> Self {
        match reason {
            "OOMKilled" => Self::OomKilled,
            "ContainerCannotRun" => Self::ContainerCannotRun,
            "DeadlineExceeded" => Self::DeadlineExceeded,
            "Error" => Self::Error,
            "Completed" => Self::Completed,
            other => Self::Other(other.to_string()),
        }
    }

    /// The reason as the kubelet spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::OomKilled => "OOMKilled",
            Self::ContainerCannotRun => "ContainerCannotRun",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::Error => "Error",
            Self::Completed => "Completed",
            Self::Other(other) => other,
        }
    }

    /// Diagnosis category for this reason.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::OomKilled => Category::MemoryExceeded,
            Self::ContainerCannotRun => Category::ImageConfigError,
            Self::DeadlineExceeded => Category::ProbeOrJobTimeout,
            Self::Error => Category::GenericContainerError,
            Self::Completed => Category::Healthy,
            Self::Other(_) => Category::UnclassifiedTermination,
        }
    }
}

impl fmt::Display for TerminatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TerminatedReason {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<TerminatedReason> for String {
    fn from(reason: TerminatedReason) -> Self {
        reason.as_str().to_string()
    }
}
