//! Read-only Kubernetes query layer for kube-wrench.
//!
//! This crate provides the [`ClusterQuery`] trait through which the diagnosis
//! engine reads cluster state, and [`K8sCluster`], its implementation on top
//! of a `kube` client. It also provides the [`IngressProber`] used to check
//! ingress reachability over HTTP.
//!
//! Every query is bounded by a timeout and maps API failures onto
//! [`QueryError`](kube_wrench_core::QueryError) so callers can fail soft.
//!
//! # Example
//!
//! ```no_run
//! use kube_wrench_cluster::{ClusterConfig, ClusterQuery, K8sCluster};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cluster = K8sCluster::new(ClusterConfig::default()).await?;
//!
//! for pod in cluster.list_pods("default").await? {
//!     println!("{} is {}", pod.name, pod.phase);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! For testing without a real cluster, enable the `test-utils` feature and
//! use the in-memory fake:
//!
//! ```ignore
//! use kube_wrench_cluster::{ClusterQuery, MockCluster};
//! use kube_wrench_core::PodSnapshot;
//!
//! # async fn example() {
//! let cluster = MockCluster::new();
//! cluster.add_pod(PodSnapshot::new("default", "web-0", "Running"));
//!
//! assert_eq!(cluster.list_pods("default").await.unwrap().len(), 1);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod convert;
pub mod error;
pub mod k8s;
pub mod probe;
pub mod query;
pub mod types;

pub use error::{ClusterError, Result};
pub use k8s::K8sCluster;
pub use probe::{HttpProber, IngressProber, ProbeOutcome};
pub use query::ClusterQuery;
pub use types::ClusterConfig;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockCluster, MockProber, QueryOp};
