//! Volume binding checks.

use kube_wrench_cluster::ClusterQuery;
use kube_wrench_core::{
    Category, DataObjectSnapshot, Finding, PodSnapshot, QueryError, VolumeReference,
};
use tracing::{debug, warn};

/// Which volume kinds a check covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeScope {
    /// Secrets, config maps and claims.
    All,
    /// Secrets and config maps only.
    SecretsAndConfigMaps,
}

impl VolumeScope {
    const fn covers(self, volume: &VolumeReference) -> bool {
        match volume {
            VolumeReference::Secret { .. } | VolumeReference::ConfigMap { .. } => true,
            VolumeReference::Pvc { .. } => matches!(self, Self::All),
            VolumeReference::Other { .. } => false,
        }
    }
}

/// Verifies that a pod's volume references resolve.
pub struct VolumeBindingChecker<'a, C: ClusterQuery + ?Sized> {
    cluster: &'a C,
}

impl<'a, C: ClusterQuery + ?Sized> VolumeBindingChecker<'a, C> {
    /// Create a checker reading from `cluster`.
    #[must_use]
    pub const fn new(cluster: &'a C) -> Self {
        Self { cluster }
    }

    /// Check every volume of `pod` within `scope`, in declaration order.
    ///
    /// Lookup failures other than absence become `VolumeLookupFailed`
    /// findings and the remaining volumes are still checked.
    pub async fn check(&self, pod: &PodSnapshot, scope: VolumeScope) -> Vec<Finding> {
        let mut findings = Vec::new();

        for volume in pod.volumes.iter().filter(|v| scope.covers(v)) {
            debug!(namespace = %pod.namespace, pod = %pod.name, ?volume, "Checking volume");
            let finding = match volume {
                VolumeReference::Secret { name } => self.secret(pod, name).await,
                VolumeReference::ConfigMap { name } => self.config_map(pod, name).await,
                VolumeReference::Pvc { claim_name } => self.claim(pod, claim_name).await,
                VolumeReference::Other { .. } => continue,
            };
            findings.push(finding);
        }

        findings
    }

    async fn secret(&self, pod: &PodSnapshot, name: &str) -> Finding {
        let subject = format!("secret/{name}");
        match self.cluster.get_secret(&pod.namespace, name).await {
            Ok(Some(secret)) => {
                Finding::info(Category::SecretFound, subject, describe("secret", &secret))
            }
            Ok(None) => Finding::error(Category::SecretMissing, subject, "secret does not exist")
                .with_hint("create the secret or fix the volume reference"),
            Err(e) => lookup_failed(pod, subject, &e),
        }
    }

    async fn config_map(&self, pod: &PodSnapshot, name: &str) -> Finding {
        let subject = format!("configmap/{name}");
        match self.cluster.get_config_map(&pod.namespace, name).await {
            Ok(Some(cm)) => {
                Finding::info(Category::ConfigMapFound, subject, describe("config map", &cm))
            }
            Ok(None) => Finding::error(
                Category::ConfigMapMissing,
                subject,
                "config map does not exist",
            )
            .with_hint("create the config map or fix the volume reference"),
            Err(e) => lookup_failed(pod, subject, &e),
        }
    }

    async fn claim(&self, pod: &PodSnapshot, claim_name: &str) -> Finding {
        let subject = format!("pvc/{claim_name}");
        match self.cluster.get_pvc(&pod.namespace, claim_name).await {
            Ok(Some(pvc)) => match pvc.phase.as_deref() {
                Some("Bound") => Finding::info(Category::PvcBound, subject, "claim is Bound"),
                Some("Pending") => {
                    Finding::warning(Category::PvcPending, subject, "claim is Pending")
                        .with_hint("no volume matches the claim yet; check the storage class")
                }
                phase => Finding::warning(
                    Category::PvcOther,
                    subject,
                    format!("claim is {}", phase.unwrap_or("in an unknown phase")),
                ),
            },
            Ok(None) => Finding::error(Category::PvcMissing, subject, "claim does not exist")
                .with_hint("create the claim or fix the volume reference"),
            Err(e) => lookup_failed(pod, subject, &e),
        }
    }
}

/// Found message listing the object's data keys. A mounted object without
/// keys projects no files.
fn describe(kind: &str, object: &DataObjectSnapshot) -> String {
    if object.keys.is_empty() {
        format!("{kind} exists but holds no keys")
    } else {
        format!("{kind} exists with keys: {}", object.keys.join(", "))
    }
}

fn lookup_failed(pod: &PodSnapshot, subject: String, error: &QueryError) -> Finding {
    warn!(
        namespace = %pod.namespace,
        pod = %pod.name,
        subject = %subject,
        error = %error,
        "Volume lookup failed"
    );
    Finding::warning(
        Category::VolumeLookupFailed,
        subject,
        format!("lookup failed: {error}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube_wrench_cluster::{MockCluster, QueryOp};

    fn pod_with_volumes() -> PodSnapshot {
        let mut pod = PodSnapshot::new("shop", "web-0", "Pending");
        pod.volumes = vec![
            VolumeReference::Secret {
                name: "db-creds".to_string(),
            },
            VolumeReference::ConfigMap {
                name: "web-settings".to_string(),
            },
            VolumeReference::Pvc {
                claim_name: "web-data".to_string(),
            },
            VolumeReference::Other {
                name: "scratch".to_string(),
            },
        ];
        pod
    }

    fn categories(findings: &[Finding]) -> Vec<Category> {
        findings.iter().map(|f| f.category).collect()
    }

    #[tokio::test]
    async fn all_volumes_resolve() {
        let cluster = MockCluster::new();
        cluster.add_secret("shop", "db-creds", &["password"]);
        cluster.add_config_map("shop", "web-settings", &["app.yaml"]);
        cluster.add_pvc("shop", "web-data", Some("Bound"));

        let findings = VolumeBindingChecker::new(&cluster)
            .check(&pod_with_volumes(), VolumeScope::All)
            .await;
        assert_eq!(
            categories(&findings),
            vec![Category::SecretFound, Category::ConfigMapFound, Category::PvcBound]
        );
        assert_eq!(findings[0].message, "secret exists with keys: password");
        assert_eq!(findings[1].message, "config map exists with keys: app.yaml");
    }

    #[tokio::test]
    async fn missing_claim_is_an_error() {
        let cluster = MockCluster::new();
        cluster.add_secret("shop", "db-creds", &["password"]);
        cluster.add_config_map("shop", "web-settings", &["app.yaml"]);

        let findings = VolumeBindingChecker::new(&cluster)
            .check(&pod_with_volumes(), VolumeScope::All)
            .await;
        assert_eq!(
            categories(&findings),
            vec![Category::SecretFound, Category::ConfigMapFound, Category::PvcMissing]
        );
        assert_eq!(findings[2].subject, "pvc/web-data");
        assert_eq!(findings[2].severity, kube_wrench_core::Severity::Error);
        assert_eq!(cluster.call_count(QueryOp::GetPvc, "shop"), 1);
    }

    #[tokio::test]
    async fn missing_config_map_does_not_stop_the_check() {
        let cluster = MockCluster::new();
        cluster.add_secret("shop", "db-creds", &["password"]);
        cluster.add_pvc("shop", "web-data", Some("Pending"));

        let findings = VolumeBindingChecker::new(&cluster)
            .check(&pod_with_volumes(), VolumeScope::All)
            .await;
        assert_eq!(
            categories(&findings),
            vec![
                Category::SecretFound,
                Category::ConfigMapMissing,
                Category::PvcPending
            ]
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_reported_and_check_continues() {
        let cluster = MockCluster::new();
        cluster.fail(
            QueryOp::GetSecret,
            "shop",
            QueryError::Forbidden("secrets is forbidden".to_string()),
        );
        cluster.add_config_map("shop", "web-settings", &[]);
        cluster.add_pvc("shop", "web-data", Some("Lost"));

        let findings = VolumeBindingChecker::new(&cluster)
            .check(&pod_with_volumes(), VolumeScope::All)
            .await;
        assert_eq!(
            categories(&findings),
            vec![
                Category::VolumeLookupFailed,
                Category::ConfigMapFound,
                Category::PvcOther
            ]
        );
        assert_eq!(findings[1].message, "config map exists but holds no keys");
        assert!(findings[2].message.contains("Lost"));
    }

    #[tokio::test]
    async fn mount_scope_skips_claims() {
        let cluster = MockCluster::new();
        let findings = VolumeBindingChecker::new(&cluster)
            .check(&pod_with_volumes(), VolumeScope::SecretsAndConfigMaps)
            .await;

        assert_eq!(
            categories(&findings),
            vec![Category::SecretMissing, Category::ConfigMapMissing]
        );
        assert_eq!(cluster.total_calls(QueryOp::GetPvc), 0);
    }

    #[tokio::test]
    async fn pod_without_volumes_yields_nothing() {
        let cluster = MockCluster::new();
        let pod = PodSnapshot::new("shop", "web-0", "Pending");
        let findings = VolumeBindingChecker::new(&cluster)
            .check(&pod, VolumeScope::All)
            .await;
        assert!(findings.is_empty());
    }
}
