//! Report rendering.

use std::fmt::Write as _;
use std::time::Duration;

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use kube_wrench_core::{Finding, Report, Severity};
use tabled::{settings::Style, Table, Tabled};

/// Output format for the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented text grouped by namespace and pod (default)
    #[default]
    Text,
    /// One table row per finding
    Table,
    /// The full report as JSON
    Json,
}

/// Render `report` in the requested format.
pub fn render(report: &Report, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Table => Ok(render_table(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report),
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Info => severity.as_str().blue(),
        Severity::Warning => severity.as_str().yellow().bold(),
        Severity::Error => severity.as_str().red().bold(),
    }
}

fn write_finding(out: &mut String, finding: &Finding, indent: &str) {
    let _ = writeln!(
        out,
        "{indent}[{}] {} {}: {}",
        severity_label(finding.severity),
        finding.category,
        finding.subject.dimmed(),
        finding.message
    );
    if let Some(hint) = &finding.hint {
        let _ = writeln!(out, "{indent}    {} {hint}", "hint:".cyan());
    }
    if let Some(logs) = &finding.log_excerpt {
        let _ = writeln!(out, "{indent}    {}", "logs:".cyan());
        for line in logs.lines() {
            let _ = writeln!(out, "{indent}      | {line}");
        }
    }
}

/// Findings grouped by namespace, then pod.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    if let Some(error) = &report.error {
        let _ = writeln!(out, "{} {error}", "✗".red().bold());
        return out;
    }
    if report.namespaces.is_empty() {
        let _ = writeln!(out, "{}", "No namespaces scanned".yellow());
        return out;
    }

    for ns in &report.namespaces {
        let mut header = format!("Namespace {}", ns.namespace.bold());
        if let Some(phase) = &ns.phase {
            let _ = write!(header, " ({phase})");
        }
        if ns.is_failed() {
            let _ = write!(header, " {}", "[scan failed]".red().bold());
        }
        let _ = writeln!(out, "{header}");

        for finding in &ns.findings {
            write_finding(&mut out, finding, "  ");
        }
        for pod in &ns.pods {
            let _ = writeln!(out, "  Pod {} [{}]", pod.pod.bold(), pod.phase);
            for finding in &pod.findings {
                write_finding(&mut out, finding, "    ");
            }
        }
        out.push('\n');
    }

    out
}

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "NAMESPACE")]
    namespace: String,
    #[tabled(rename = "POD")]
    pod: String,
    #[tabled(rename = "SEVERITY")]
    severity: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "SUBJECT")]
    subject: String,
    #[tabled(rename = "MESSAGE")]
    message: String,
}

impl FindingRow {
    fn new(namespace: &str, pod: &str, finding: &Finding) -> Self {
        let mut message = finding.message.clone();
        if let Some(hint) = &finding.hint {
            let _ = write!(message, " (hint: {hint})");
        }
        Self {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            severity: finding.severity.to_string(),
            category: finding.category.to_string(),
            subject: finding.subject.clone(),
            message,
        }
    }
}

/// One row per finding. Namespace-level findings have an empty pod column.
pub fn render_table(report: &Report) -> String {
    if let Some(error) = &report.error {
        return format!("{} {error}", "✗".red().bold());
    }

    let mut rows = Vec::new();
    for ns in &report.namespaces {
        rows.extend(
            ns.findings
                .iter()
                .map(|f| FindingRow::new(&ns.namespace, "", f)),
        );
        for pod in &ns.pods {
            rows.extend(
                pod.findings
                    .iter()
                    .map(|f| FindingRow::new(&ns.namespace, &pod.pod, f)),
            );
        }
    }

    if rows.is_empty() {
        return "No findings".yellow().to_string();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Severity counts and elapsed time.
pub fn summary(report: &Report, elapsed: Duration) -> String {
    let counts = report.counts();
    let mut line = format!(
        "{} errors, {} warnings, {} info across {} namespaces",
        counts.error.to_string().red().bold(),
        counts.warning.to_string().yellow().bold(),
        counts.info.to_string().blue(),
        report.namespaces.len()
    );
    let failed = report.failed_namespaces();
    if failed > 0 {
        let _ = write!(line, " ({failed} failed)");
    }
    let _ = write!(line, " in {:.2}s", elapsed.as_secs_f64());
    line
}
