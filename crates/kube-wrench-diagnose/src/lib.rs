//! Diagnosis engine for kube-wrench.
//!
//! This crate inspects pods, containers, volumes and resource quotas through
//! the read-only [`ClusterQuery`](kube_wrench_cluster::ClusterQuery) interface
//! and produces a structured [`Report`](kube_wrench_core::Report).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     NamespaceScanner                        │
//! │        one namespace, or all of them, concurrently          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       PodDiagnoser                          │
//! │              state machine on the pod phase                 │
//! └─────────────────────────────────────────────────────────────┘
//!          │               │               │              │
//!          ▼               ▼               ▼              ▼
//!   ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌────────────┐
//!   │ Container  │  │  Volume    │  │   Quota    │  │  Network   │
//!   │ Diagnoser  │  │  Binding   │  │ Evaluator  │  │ (opt-in)   │
//!   └────────────┘  └────────────┘  └────────────┘  └────────────┘
//! ```
//!
//! Nothing here fails once a scan has started: every query error becomes a
//! finding and the scan moves on.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use kube_wrench_cluster::{ClusterConfig, HttpProber, K8sCluster};
//! use kube_wrench_diagnose::{NamespaceScanner, NamespaceSelector, ScanConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cluster_config = ClusterConfig::from_env();
//! let prober = Arc::new(HttpProber::new(&cluster_config)?);
//! let cluster = Arc::new(K8sCluster::new(cluster_config).await?);
//!
//! let scanner = NamespaceScanner::new(cluster, prober, ScanConfig::default());
//! let report = scanner.scan(&NamespaceSelector::parse(Some("all"))?).await;
//!
//! println!("{} namespaces scanned", report.namespaces.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod container;
pub mod error;
pub mod events;
pub mod network;
pub mod pod;
pub mod quantity;
pub mod quota;
pub mod scanner;
pub mod volume;

pub use config::ScanConfig;
pub use container::{ContainerDiagnoser, ContainerDiagnosis, FollowUp};
pub use error::{DiagnoseError, Result};
pub use network::{IngressHealth, NetworkView};
pub use pod::{NamespaceContext, PodDiagnoser};
pub use quota::{QuotaEvaluator, SATURATION_THRESHOLD};
pub use scanner::{NamespaceScanner, NamespaceSelector, DEFAULT_NAMESPACE};
pub use volume::{VolumeBindingChecker, VolumeScope};
