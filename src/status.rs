//! Atomic publication of the status artifact consumed by nginx.

use crate::registry::HealthRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("failed to write status file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize status: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Document shape read by the router; field names are part of the contract.
#[derive(Debug, Serialize)]
pub struct StatusDocument {
    pub timestamp: DateTime<Utc>,
    pub primary_broker: Option<String>,
    pub brokers: HashMap<String, HealthRecord>,
    pub overall_healthy: bool,
}

impl StatusDocument {
    pub fn new(snapshot: Vec<(String, HealthRecord)>, primary_broker: Option<String>) -> Self {
        let overall_healthy = primary_broker.is_some();
        Self {
            timestamp: Utc::now(),
            primary_broker,
            brokers: snapshot.into_iter().collect(),
            overall_healthy,
        }
    }
}

pub struct StatusPublisher {
    path: PathBuf,
}

impl StatusPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write to a sibling temp file and rename over the target, so a reader
    /// polling the path never observes a torn document. The parent directory
    /// is created on demand.
    pub async fn publish(&self, status: &StatusDocument) -> Result<(), StatusError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_string_pretty(status)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
