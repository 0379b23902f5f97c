//! Static-priority failover policy.

use crate::registry::HealthRecord;

/// First healthy identity in priority order, or `None` when everything is
/// down. Strict static priority: the router wants one deterministic choice
/// per cycle, not load distribution.
pub fn resolve(snapshot: &[(String, HealthRecord)]) -> Option<String> {
    snapshot
        .iter()
        .find(|(_, record)| record.healthy)
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(states: &[(&str, bool)]) -> Vec<(String, HealthRecord)> {
        states
            .iter()
            .map(|(name, healthy)| {
                (
                    name.to_string(),
                    HealthRecord {
                        healthy: *healthy,
                        ..HealthRecord::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn parent_wins_when_healthy_regardless_of_children() {
        let snap = snapshot(&[("parent", true), ("child1", true), ("child2", true)]);
        assert_eq!(resolve(&snap).as_deref(), Some("parent"));
    }

    #[test]
    fn falls_over_to_first_healthy_child() {
        let snap = snapshot(&[("parent", false), ("child1", true), ("child2", true)]);
        assert_eq!(resolve(&snap).as_deref(), Some("child1"));
    }

    #[test]
    fn last_resort_child_still_resolves() {
        let snap = snapshot(&[("parent", false), ("child1", false), ("child2", true)]);
        assert_eq!(resolve(&snap).as_deref(), Some("child2"));
    }

    #[test]
    fn none_when_everything_is_down() {
        let snap = snapshot(&[("parent", false), ("child1", false), ("child2", false)]);
        assert_eq!(resolve(&snap), None);
    }

    #[test]
    fn none_for_empty_snapshot() {
        assert_eq!(resolve(&[]), None);
    }
}
