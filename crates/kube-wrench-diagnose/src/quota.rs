//! Resource quota saturation.

use std::fmt::Write as _;

use kube_wrench_cluster::ClusterQuery;
use kube_wrench_core::{Category, Finding, QuotaUsage, ResourceQuotaSnapshot};
use tracing::{debug, info, warn};

use crate::quantity::{self, ResourceKind};

/// Usage ratio above which a quota resource is reported as near its limit.
pub const SATURATION_THRESHOLD: f64 = 0.90;

/// Decimal places kept when rounding a usage ratio.
pub const RATIO_DECIMALS: i32 = 3;

/// Round a ratio to [`RATIO_DECIMALS`] places.
#[must_use]
pub fn round_ratio(ratio: f64) -> f64 {
    let scale = 10_f64.powi(RATIO_DECIMALS);
    (ratio * scale).round() / scale
}

/// Computes per-resource usage ratios of a quota.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotaEvaluator;

impl QuotaEvaluator {
    /// Evaluate every resource with a hard limit.
    ///
    /// Resources are visited in key order. A quantity that cannot be
    /// normalized yields a `QuotaUnparseable` finding and the key is skipped.
    #[must_use]
    pub fn evaluate(&self, quota: &ResourceQuotaSnapshot) -> Vec<Finding> {
        quota
            .resources
            .iter()
            .map(|(key, usage)| Self::evaluate_resource(&quota.name, key, usage))
            .collect()
    }

    fn evaluate_resource(quota: &str, key: &str, usage: &QuotaUsage) -> Finding {
        let subject = format!("quota/{quota}/{key}");

        let normalized = quantity::normalize(key, &usage.used)
            .and_then(|used| quantity::normalize(key, &usage.hard).map(|hard| (used, hard)));
        let (used, hard) = match normalized {
            Ok(pair) => pair,
            Err(e) => {
                warn!(quota, key, error = %e, "Unparseable quota quantity");
                return Finding::warning(
                    Category::QuotaUnparseable,
                    subject,
                    format!(
                        "cannot interpret {key} usage {}/{}: {e}",
                        usage.used, usage.hard
                    ),
                );
            }
        };

        if hard.abs() < f64::EPSILON {
            return Finding::warning(
                Category::QuotaHardLimitZero,
                subject,
                format!("hard limit for {key} is 0 (used {})", display(&usage.used)),
            )
            .with_hint("a zero hard limit blocks every new object of this kind");
        }

        let ratio = round_ratio(used / hard);
        let mut message = format!(
            "{key} at {:.1}% ({}/{})",
            ratio * 100.0,
            display(&usage.used),
            usage.hard
        );
        if ResourceKind::of(key) == ResourceKind::Cpu {
            let _ = write!(message, ", compared as {used:.0}/{hard:.0} whole cores");
        }

        if ratio > SATURATION_THRESHOLD {
            Finding::warning(Category::QuotaNearLimit, subject, message)
                .with_hint("raise the quota or free resources in this namespace")
        } else {
            Finding::info(Category::QuotaWithinThreshold, subject, message)
        }
    }
}

fn display(raw: &str) -> &str {
    if raw.is_empty() {
        "0"
    } else {
        raw
    }
}

/// List a namespace's quotas, read each quota's live status and evaluate it.
///
/// A failed status read falls back to the listed object. A failed listing
/// yields a single `QueryFailed` finding.
pub async fn check_namespace_quotas<C>(cluster: &C, namespace: &str) -> Vec<Finding>
where
    C: ClusterQuery + ?Sized,
{
    let quotas = match cluster.list_resource_quotas(namespace).await {
        Ok(quotas) => quotas,
        Err(e) => {
            warn!(namespace, error = %e, "Failed to list resource quotas");
            return vec![Finding::warning(
                Category::QueryFailed,
                format!("namespace/{namespace}"),
                format!("could not list resource quotas: {e}"),
            )];
        }
    };

    if quotas.is_empty() {
        info!(namespace, "No resource quota found");
        return vec![Finding::info(
            Category::NoResourceQuota,
            format!("namespace/{namespace}"),
            "no resource quota defined",
        )];
    }

    debug!(namespace, count = quotas.len(), "Checking resource quotas");
    let evaluator = QuotaEvaluator;
    let mut findings = Vec::new();

    for listed in quotas {
        let quota = match cluster
            .get_resource_quota_status(namespace, &listed.name)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                warn!(namespace, quota = %listed.name, error = %e, "Failed to read quota status");
                findings.push(Finding::warning(
                    Category::QueryFailed,
                    format!("quota/{}", listed.name),
                    format!("could not read live status, using listed values: {e}"),
                ));
                listed
            }
        };
        findings.extend(evaluator.evaluate(&quota));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube_wrench_cluster::{MockCluster, QueryOp};
    use kube_wrench_core::{QueryError, Severity};

    fn single(key: &str, used: &str, hard: &str) -> Finding {
        let quota = ResourceQuotaSnapshot::new("shop", "compute").with_resource(key, used, hard);
        let mut findings = QuotaEvaluator.evaluate(&quota);
        assert_eq!(findings.len(), 1);
        findings.remove(0)
    }

    #[test]
    fn zero_hard_limit_is_reported_not_divided() {
        let finding = single("pods", "3", "0");
        assert_eq!(finding.category, Category::QuotaHardLimitZero);
        assert_eq!(finding.severity, Severity::Warning);
    }

    #[test]
    fn threshold_is_exclusive() {
        let at = single("pods", "9", "10");
        assert_eq!(at.category, Category::QuotaWithinThreshold);
        assert_eq!(at.severity, Severity::Info);

        let above = single("pods", "91", "100");
        assert_eq!(above.category, Category::QuotaNearLimit);
        assert_eq!(above.severity, Severity::Warning);

        let below = single("services", "1", "10");
        assert_eq!(below.category, Category::QuotaWithinThreshold);
    }

    #[test]
    fn ratio_rounding_keeps_boundary_informational() {
        // 0.9004 rounds to 0.900, which is not above the threshold.
        let finding = single("pods", "9004", "10000");
        assert_eq!(finding.category, Category::QuotaWithinThreshold);
        assert!((round_ratio(0.9004) - 0.9).abs() < f64::EPSILON);
        assert!((round_ratio(0.9006) - 0.901).abs() < 1e-12);
    }

    #[test]
    fn cpu_uses_whole_cores() {
        // 3500m rounds up to 4 cores out of 4.
        let finding = single("requests.cpu", "3500m", "4");
        assert_eq!(finding.category, Category::QuotaNearLimit);
        assert!(finding.message.contains("100.0%"));
        assert!(finding.message.contains("4/4 whole cores"));
    }

    #[test]
    fn millicore_quota_names_the_rounding() {
        let finding = single("cpu", "100m", "200m");
        assert_eq!(finding.category, Category::QuotaNearLimit);
        assert!(finding.message.ends_with("compared as 1/1 whole cores"));
    }

    #[test]
    fn nan_quantities_are_unparseable() {
        for (used, hard) in [("NaN", "10"), ("1", "NaN"), ("inf", "10")] {
            let finding = single("pods", used, hard);
            assert_eq!(finding.category, Category::QuotaUnparseable);
            assert_eq!(finding.severity, Severity::Warning);
        }
    }

    #[test]
    fn memory_within_threshold() {
        let finding = single("limits.memory", "512Mi", "2Gi");
        assert_eq!(finding.category, Category::QuotaWithinThreshold);
        assert!(finding.message.contains("25.6%"));
    }

    #[test]
    fn unparseable_key_is_skipped_not_fatal() {
        let quota = ResourceQuotaSnapshot::new("shop", "compute")
            .with_resource("memory", "1G", "2G")
            .with_resource("pods", "1", "10");
        let findings = QuotaEvaluator.evaluate(&quota);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].category, Category::QuotaUnparseable);
        assert_eq!(findings[1].category, Category::QuotaWithinThreshold);
    }

    #[tokio::test]
    async fn namespace_without_quota() {
        let cluster = MockCluster::new();
        let findings = check_namespace_quotas(&cluster, "shop").await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::NoResourceQuota);
    }

    #[tokio::test]
    async fn live_status_preferred_over_listing() {
        let cluster = MockCluster::new();
        cluster.add_quota(
            ResourceQuotaSnapshot::new("shop", "compute").with_resource("pods", "1", "10"),
        );
        cluster.set_quota_status(
            ResourceQuotaSnapshot::new("shop", "compute").with_resource("pods", "10", "10"),
        );

        let findings = check_namespace_quotas(&cluster, "shop").await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::QuotaNearLimit);
    }

    #[tokio::test]
    async fn status_failure_falls_back_to_listing() {
        let cluster = MockCluster::new();
        cluster.add_quota(
            ResourceQuotaSnapshot::new("shop", "compute").with_resource("pods", "1", "10"),
        );
        cluster.fail(
            QueryOp::GetResourceQuotaStatus,
            "shop",
            QueryError::Forbidden("denied".to_string()),
        );

        let findings = check_namespace_quotas(&cluster, "shop").await;
        let categories: Vec<_> = findings.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![Category::QueryFailed, Category::QuotaWithinThreshold]
        );
    }

    #[tokio::test]
    async fn listing_failure_is_one_finding() {
        let cluster = MockCluster::new();
        cluster.fail(
            QueryOp::ListResourceQuotas,
            "shop",
            QueryError::Transport("connection reset".to_string()),
        );

        let findings = check_namespace_quotas(&cluster, "shop").await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::QueryFailed);
    }
}
