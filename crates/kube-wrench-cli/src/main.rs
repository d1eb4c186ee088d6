//! kube-wrench - read-only diagnosis of Kubernetes pods and namespaces.
//!
//! This is the entry point for the `kube-wrench` binary. Logs go to stderr,
//! the report goes to stdout.

mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use kube_wrench_cluster::{ClusterConfig, HttpProber, K8sCluster};
use kube_wrench_diagnose::{NamespaceScanner, NamespaceSelector, ScanConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use output::OutputFormat;

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human readable
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Diagnose pods, containers, volumes and quotas in a namespace.
#[derive(Parser, Debug)]
#[command(name = "kube-wrench")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Namespace to scan, or `all` for every namespace.
    #[arg(short, long, env = "KUBE_WRENCH_NAMESPACE")]
    namespace: Option<String>,

    /// Path to the kubeconfig file.
    #[arg(short, long)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use.
    #[arg(long)]
    context: Option<String>,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t, env = "KUBE_WRENCH_OUTPUT")]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info", env = "KUBE_WRENCH_LOG_LEVEL")]
    log_level: String,

    /// Log line format.
    #[arg(long, value_enum, default_value_t, env = "KUBE_WRENCH_LOG_FORMAT")]
    log_format: LogFormat,

    /// Disable logging entirely.
    #[arg(long)]
    silent: bool,

    /// Per-query timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Skip TLS verification for the API server and ingress probes.
    #[arg(long)]
    insecure: bool,

    /// Namespaces diagnosed at the same time.
    #[arg(long)]
    namespace_concurrency: Option<usize>,

    /// Pods diagnosed at the same time within a namespace.
    #[arg(long)]
    pod_concurrency: Option<usize>,

    /// Do not attach warning events to pods.
    #[arg(long)]
    no_events: bool,

    /// Correlate running pods with services and probe their ingresses.
    #[arg(long)]
    network: bool,
}

impl Args {
    fn cluster_config(&self) -> ClusterConfig {
        let mut config = ClusterConfig::from_env();
        if let Some(path) = &self.kubeconfig {
            config.kubeconfig = Some(path.clone());
        }
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }
        if let Some(secs) = self.timeout {
            config.query_timeout = Duration::from_secs(secs);
        }
        if self.insecure {
            config.insecure_skip_tls_verify = true;
        }
        config
    }

    fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig::from_env();
        if let Some(n) = self.namespace_concurrency {
            config.namespace_concurrency = n;
        }
        if let Some(n) = self.pod_concurrency {
            config.pod_concurrency = n;
        }
        if self.no_events {
            config.events = false;
        }
        if self.network {
            config.network = true;
        }
        config
    }
}

fn init_tracing(args: &Args) {
    if args.silent {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},kube=warn,hyper=warn", args.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    match args.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let selector = NamespaceSelector::parse(args.namespace.as_deref())?;
    let scan_config = args.scan_config();
    scan_config.validate()?;
    let cluster_config = args.cluster_config();

    let started = Instant::now();
    let cluster = K8sCluster::new(cluster_config.clone())
        .await
        .context("failed to create Kubernetes client")?;
    let prober = HttpProber::new(&cluster_config).context("failed to create ingress prober")?;

    let scanner = NamespaceScanner::new(Arc::new(cluster), Arc::new(prober), scan_config);
    let report = scanner.scan(&selector).await;

    println!("{}", output::render(&report, args.output)?);
    if args.output != OutputFormat::Json {
        println!("{}", output::summary(&report, started.elapsed()));
    }

    info!(
        namespaces = report.namespaces.len(),
        failed = report.failed_namespaces(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Scan complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    tokio::select! {
        result = run(args) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, exiting");
            Ok(())
        }
    }
}
