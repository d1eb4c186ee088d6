//! Scan report: findings grouped by namespace, then pod.

use serde::{Deserialize, Serialize};

use crate::finding::{Finding, Severity};

/// Findings for one pod, in the order they were produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodReport {
    /// Pod name.
    pub pod: String,
    /// Raw phase string.
    pub phase: String,
    /// Ordered findings.
    pub findings: Vec<Finding>,
}

impl PodReport {
    /// Create an empty report for a pod.
    #[must_use]
    pub fn new(pod: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            phase: phase.into(),
            findings: Vec::new(),
        }
    }

    /// Append a finding.
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Append several findings, keeping their order.
    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    /// Highest severity among the findings.
    #[must_use]
    pub fn worst_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

/// Findings for one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceReport {
    /// Namespace name.
    pub namespace: String,
    /// Namespace lifecycle phase, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Set when the namespace could not be scanned completely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Namespace-level findings (quotas, failed queries).
    pub findings: Vec<Finding>,
    /// Per-pod reports, in listing order.
    pub pods: Vec<PodReport>,
}

impl NamespaceReport {
    /// Create an empty report for a namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            phase: None,
            error: None,
            findings: Vec::new(),
            pods: Vec::new(),
        }
    }

    /// Mark the namespace as failed with the given error.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    /// Check if the namespace carries an error marker.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Iterate over every finding, namespace-level first.
    pub fn all_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .chain(self.pods.iter().flat_map(|p| p.findings.iter()))
    }
}

/// Number of findings per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Informational findings.
    pub info: usize,
    /// Warnings.
    pub warning: usize,
    /// Errors.
    pub error: usize,
}

impl SeverityCounts {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Info => self.info += 1,
            Severity::Warning => self.warning += 1,
            Severity::Error => self.error += 1,
        }
    }
}

/// The result of one scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// The namespace selector the scan ran with.
    pub selector: String,
    /// Set when no namespace could be scanned at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-namespace reports.
    pub namespaces: Vec<NamespaceReport>,
}

impl Report {
    /// Create an empty report.
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            error: None,
            namespaces: Vec::new(),
        }
    }

    /// Find a namespace report by name.
    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&NamespaceReport> {
        self.namespaces.iter().find(|n| n.namespace == name)
    }

    /// Count findings per severity across the whole report.
    #[must_use]
    pub fn counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for finding in self.namespaces.iter().flat_map(NamespaceReport::all_findings) {
            counts.record(finding.severity);
        }
        counts
    }

    /// Number of namespaces carrying an error marker.
    #[must_use]
    pub fn failed_namespaces(&self) -> usize {
        self.namespaces.iter().filter(|n| n.is_failed()).count()
    }
}
