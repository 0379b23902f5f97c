//! Last-known health state per broker.
//!
//! The registry is owned by the scheduler loop and is its single mutation
//! point: probes return outcomes, the loop folds them in. With concurrent
//! probes the per-key records are still independent, so no locking is needed
//! as long as cycles run one at a time.

use crate::probe::ProbeOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Last observed outcome for one broker. Replaced wholesale on every check,
/// never merged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthRecord {
    pub healthy: bool,
    pub last_check: Option<DateTime<Utc>>,
    /// Ping round-trip in seconds, present only when a pong was observed.
    pub response_time: Option<f64>,
    pub error: Option<String>,
}

pub struct HealthRegistry {
    priority: Vec<String>,
    records: HashMap<String, HealthRecord>,
}

impl HealthRegistry {
    /// Seed every broker with an unknown/unhealthy record so the first
    /// published status already lists the full set.
    pub fn new(priority: impl IntoIterator<Item = String>) -> Self {
        let priority: Vec<String> = priority.into_iter().collect();
        let records = priority
            .iter()
            .map(|name| (name.clone(), HealthRecord::default()))
            .collect();
        Self { priority, records }
    }

    /// Full replace of the record for `name`, stamped with `now`.
    pub fn update(&mut self, name: &str, outcome: ProbeOutcome, now: DateTime<Utc>) {
        let record = match outcome {
            ProbeOutcome::Healthy { response_time } => HealthRecord {
                healthy: true,
                last_check: Some(now),
                response_time: response_time.map(|d| d.as_secs_f64()),
                error: None,
            },
            ProbeOutcome::Unhealthy { error } => HealthRecord {
                healthy: false,
                last_check: Some(now),
                response_time: None,
                error: Some(error),
            },
        };
        self.records.insert(name.to_string(), record);
    }

    /// Records in configured priority order.
    pub fn snapshot(&self) -> Vec<(String, HealthRecord)> {
        self.priority
            .iter()
            .filter_map(|name| self.records.get(name).map(|r| (name.clone(), r.clone())))
            .collect()
    }
}
