//! Core types for kube-wrench.
//!
//! This crate provides the foundational types shared by every kube-wrench crate:
//!
//! - **Snapshots**: read-only views of pods, containers, quotas, events and
//!   networking objects, built once per scan pass
//! - **Reasons**: closed enums for container waiting and termination reasons
//! - **Findings**: the structured unit of diagnostic output
//! - **Report**: findings grouped by namespace and pod
//! - **Error types**: query and quantity errors
//!
//! # Example
//!
//! ```
//! use kube_wrench_core::{Category, Finding, PodReport, Severity};
//!
//! let mut report = PodReport::new("web-0", "Running");
//! report.push(Finding::new(
//!     Severity::Warning,
//!     Category::CrashLooping,
//!     "container/web",
//!     "Container web is crash looping",
//! ));
//!
//! assert_eq!(report.worst_severity(), Some(Severity::Warning));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod finding;
pub mod model;
pub mod reason;
pub mod report;

pub use error::{QuantityError, QueryError, QueryResult};
pub use finding::{Category, Finding, Severity};
pub use model::{
    ContainerSpec, ContainerState, ContainerStatus, DataObjectSnapshot, EventSnapshot, IngressPath,
    IngressSnapshot, NamespaceInfo, PodCondition, PodPhase, PodSnapshot, PvcSnapshot, QuotaUsage,
    ResourceQuotaSnapshot, ServiceSnapshot, VolumeReference,
};
pub use reason::{TerminatedReason, WaitingReason};
pub use report::{NamespaceReport, PodReport, Report, SeverityCounts};
