//! Correlation of namespace events with pods.

use kube_wrench_core::{Category, EventSnapshot, Finding};

/// Warning events involving `pod`, as findings in event order.
#[must_use]
pub fn pod_warning_events(events: &[EventSnapshot], pod: &str) -> Vec<Finding> {
    events
        .iter()
        .filter(|e| e.is_warning() && e.involves_pod(pod))
        .map(|e| {
            let reason = e.reason.as_deref().unwrap_or("Unknown");
            let mut message = format!("{reason}: {}", e.message.as_deref().unwrap_or(""));
            if let Some(node) = e.reporting_instance.as_deref().filter(|n| !n.is_empty()) {
                message.push_str(&format!(" (reported by {node})"));
            }
            Finding::warning(Category::WarningEvent, format!("event/{reason}"), message)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(type_: &str, name: &str, reason: &str) -> EventSnapshot {
        EventSnapshot {
            type_: type_.to_string(),
            reason: Some(reason.to_string()),
            message: Some("0/3 nodes are available".to_string()),
            involved_kind: Some("Pod".to_string()),
            involved_name: Some(name.to_string()),
            reporting_instance: Some("node-1".to_string()),
        }
    }

    #[test]
    fn only_warnings_for_the_pod() {
        let events = vec![
            event("Warning", "web-0", "FailedScheduling"),
            event("Normal", "web-0", "Scheduled"),
            event("Warning", "web-1", "BackOff"),
        ];

        let findings = pod_warning_events(&events, "web-0");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::WarningEvent);
        assert_eq!(findings[0].subject, "event/FailedScheduling");
        assert!(findings[0].message.contains("node-1"));
    }

    #[test]
    fn events_for_other_kinds_are_ignored() {
        let mut e = event("Warning", "web-0", "FailedCreate");
        e.involved_kind = Some("ReplicaSet".to_string());
        assert!(pod_warning_events(&[e], "web-0").is_empty());
    }
}
