//! mqtt-sentinel - MQTT broker health checker with static-priority failover
//!
//! Probes every configured broker on a fixed cadence over its own MQTT
//! transport, keeps the last outcome per broker, resolves the primary by
//! static priority and publishes a JSON status artifact for nginx:
//! - Per-broker probe: connect, subscribe pong, publish ping, bounded wait
//! - Registry of last-known health, owned by the scheduler loop
//! - First-healthy-wins failover across parent/child1/child2
//! - Atomic status file updates (temp file + rename)

mod config;
mod failover;
mod probe;
mod registry;
mod status;

use anyhow::Result;
use chrono::Utc;
use config::SentinelConfig;
use futures::future::join_all;
use registry::HealthRegistry;
use status::{StatusDocument, StatusPublisher};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// A cycle that overruns the interval delays the next tick instead of
/// bursting catch-up checks, matching a sleep-after-cycle cadence.
fn cycle_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

struct Sentinel {
    config: SentinelConfig,
    registry: HealthRegistry,
    publisher: StatusPublisher,
}

impl Sentinel {
    fn new(config: SentinelConfig) -> Self {
        let registry = HealthRegistry::new(config.brokers.iter().map(|b| b.name.clone()));
        let publisher = StatusPublisher::new(&config.status_file);
        Self {
            config,
            registry,
            publisher,
        }
    }

    /// One full pass: probe every broker, fold the results into the
    /// registry, resolve the primary and publish. Every failure inside a
    /// cycle is logged and absorbed; the next tick retries from scratch.
    async fn run_cycle(&mut self) {
        info!("Running health checks...");

        let timeout = self.config.timeout();
        let probes = self.config.brokers.iter().map(|broker| async move {
            (broker.name.clone(), probe::probe(broker, timeout).await)
        });
        // One probe per broker, joined before publishing; outcomes come back
        // as values so the registry has a single mutation point here.
        for (name, outcome) in join_all(probes).await {
            self.registry.update(&name, outcome, Utc::now());
        }

        let snapshot = self.registry.snapshot();
        for (name, record) in &snapshot {
            if record.healthy {
                match record.response_time {
                    Some(rt) => info!("Broker {} is healthy (response: {:.3}s)", name, rt),
                    None => info!("Broker {} is healthy (response time unavailable)", name),
                }
            } else {
                warn!(
                    "Broker {} health check failed: {}",
                    name,
                    record.error.as_deref().unwrap_or("unknown")
                );
            }
        }

        let primary = failover::resolve(&snapshot);
        let status = StatusDocument::new(snapshot, primary.clone());
        match self.publisher.publish(&status).await {
            Ok(()) => info!(
                "Health status updated - Primary: {}",
                primary.as_deref().unwrap_or("none")
            ),
            Err(e) => error!("Failed to update health status file: {}", e),
        }
    }

    /// Check / publish / idle forever; only an interrupt breaks the loop,
    /// and it also aborts an in-flight cycle instead of waiting it out.
    async fn run(&mut self) {
        let mut ticker = cycle_ticker(self.config.check_interval());
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Health checker stopped by user");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = &mut ctrl_c => {
                            info!("Health checker stopped by user, aborting in-flight cycle");
                            break;
                        }
                        _ = self.run_cycle() => {}
                    }
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    let config = SentinelConfig::load().await;
    info!("Starting MQTT Health Sentinel");
    info!(
        "Check interval: {}s, Timeout: {}s, Fail threshold: {}",
        config.check_interval_secs, config.timeout_secs, config.fail_threshold
    );
    info!(
        "Monitoring {} brokers, status file: {}",
        config.brokers.len(),
        config.status_file.display()
    );

    Sentinel::new(config).run().await;

    info!("Health sentinel stopped");
    Ok(())
}
