//! Service and ingress correlation for running pods.

use kube_wrench_cluster::{IngressProber, ProbeOutcome};
use kube_wrench_core::{Category, Finding, IngressSnapshot, PodSnapshot, ServiceSnapshot};
use tracing::{debug, info};

/// How an ingress answered a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressHealth {
    /// 200.
    Reachable,
    /// 302 or 401.
    Responding,
    /// 400, 404 or 500-504.
    Broken,
    /// Any other status.
    NeedsCheck,
}

impl IngressHealth {
    /// Classify an HTTP status code.
    #[must_use]
    pub const fn classify(status: u16) -> Self {
        match status {
            200 => Self::Reachable,
            302 | 401 => Self::Responding,
            400 | 404 | 500..=504 => Self::Broken,
            _ => Self::NeedsCheck,
        }
    }

    const fn category(self) -> Category {
        match self {
            Self::Reachable => Category::IngressReachable,
            Self::Responding => Category::IngressResponding,
            Self::Broken => Category::IngressBroken,
            Self::NeedsCheck => Category::IngressNeedsCheck,
        }
    }
}

/// Services and ingresses of one namespace, loaded once per scan.
#[derive(Debug, Clone, Default)]
pub struct NetworkView {
    /// Services in the namespace.
    pub services: Vec<ServiceSnapshot>,
    /// Ingresses in the namespace.
    pub ingresses: Vec<IngressSnapshot>,
}

impl NetworkView {
    /// Services selecting `pod`.
    pub fn services_for<'a>(
        &'a self,
        pod: &'a PodSnapshot,
    ) -> impl Iterator<Item = &'a ServiceSnapshot> + 'a {
        self.services.iter().filter(|svc| svc.selects(&pod.labels))
    }

    /// Report the services mapped to `pod` and probe their ingresses.
    pub async fn check_pod<P>(&self, pod: &PodSnapshot, prober: &P) -> Vec<Finding>
    where
        P: IngressProber + ?Sized,
    {
        let mut findings = Vec::new();

        for svc in self.services_for(pod) {
            info!(
                namespace = %pod.namespace,
                pod = %pod.name,
                service = %svc.name,
                "Service mapped to pod"
            );
            findings.push(Finding::info(
                Category::ServiceMapped,
                format!("service/{}", svc.name),
                describe_service(svc),
            ));
            findings.extend(self.check_ingresses(svc, prober).await);
        }

        if findings.is_empty() {
            findings.push(Finding::info(
                Category::NoServiceMapped,
                format!("pod/{}", pod.name),
                "no service selects this pod",
            ));
        }

        findings
    }

    async fn check_ingresses<P>(&self, svc: &ServiceSnapshot, prober: &P) -> Vec<Finding>
    where
        P: IngressProber + ?Sized,
    {
        let mut findings = Vec::new();

        for ing in &self.ingresses {
            for path in ing
                .paths
                .iter()
                .filter(|p| p.backend_service.as_deref() == Some(svc.name.as_str()))
            {
                let Some(host) = path.host.as_deref().filter(|h| !h.is_empty()) else {
                    debug!(ingress = %ing.name, "Ingress rule has no host, skipping probe");
                    continue;
                };
                let subject = format!("ingress/{}", ing.name);
                findings.push(probe_path(prober, subject, host, &path.path).await);
            }
        }

        findings
    }
}

fn describe_service(svc: &ServiceSnapshot) -> String {
    match svc.type_.as_str() {
        "NodePort" => match svc.node_port {
            Some(port) => format!("NodePort service, node port {port}"),
            None => "NodePort service".to_string(),
        },
        "LoadBalancer" => match svc.load_balancer_hosts.first() {
            Some(host) => format!("LoadBalancer service at {host}"),
            None => "LoadBalancer service, no address assigned yet".to_string(),
        },
        other => format!("{other} service"),
    }
}

/// Probe `host` + `path` over https, falling back to http.
async fn probe_path<P>(prober: &P, subject: String, host: &str, path: &str) -> Finding
where
    P: IngressProber + ?Sized,
{
    let https = format!("https://{host}{path}");
    let (uri, outcome) = match prober.probe(&https).await {
        ProbeOutcome::Status(code) => (https, ProbeOutcome::Status(code)),
        ProbeOutcome::Failed(e) => {
            debug!(uri = %https, error = %e, "https probe failed, trying http");
            let http = format!("http://{host}{path}");
            let outcome = prober.probe(&http).await;
            (http, outcome)
        }
    };

    match outcome {
        ProbeOutcome::Status(code) => {
            let health = IngressHealth::classify(code);
            let message = format!("{uri} answered {code}");
            match health {
                IngressHealth::Reachable | IngressHealth::Responding => {
                    Finding::info(health.category(), subject, message)
                }
                IngressHealth::Broken | IngressHealth::NeedsCheck => {
                    Finding::warning(health.category(), subject, message)
                }
            }
        }
        ProbeOutcome::Failed(e) => Finding::warning(
            Category::IngressUnreachable,
            subject,
            format!("{host}{path} unreachable over https and http: {e}"),
        ),
    }
}
