//! Single-broker liveness probe.
//!
//! Opens one short-lived MQTT session, arms a pong subscription before the
//! ping goes out, and classifies the result within a single deadline. A
//! broker that accepts the connection counts as healthy even when no pong
//! ever arrives: reachability is the signal, not message delivery. The
//! response time is only recorded when a pong was actually observed.

use crate::config::BrokerConfig;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use std::time::{Duration, Instant};
use tokio::time::timeout_at;
use tracing::debug;
use uuid::Uuid;

/// Grace period for an optional pong responder once the broker has acked the
/// ping. Most brokers never echo, so the probe settles on reachability
/// instead of waiting out the full budget.
const PONG_GRACE: Duration = Duration::from_millis(500);

/// Terminal result of one probe session.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Healthy { response_time: Option<Duration> },
    Unhealthy { error: String },
}

/// Probe one broker, bounded by `timeout` end to end. Never touches shared
/// state; the caller folds the returned outcome into the registry.
pub async fn probe(broker: &BrokerConfig, timeout: Duration) -> ProbeOutcome {
    // Unique client id so overlapping probes of one broker never kick each
    // other off the session.
    let client_id = format!("sentinel-{}-{}", broker.name, Uuid::new_v4().simple());
    let mut options = MqttOptions::new(client_id, &broker.host, broker.port);
    options.set_keep_alive(timeout.max(Duration::from_secs(5)));
    options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(options, 10);

    let ping_topic = format!("health/{}/ping", broker.name);
    let pong_topic = format!("health/{}/pong", broker.name);

    // Both requests are queued now and flushed once the connection is up,
    // subscription first, so the pong cannot race past an unarmed listener.
    // The ping goes out at QoS 1 so broker acceptance shows up as a PubAck.
    if let Err(e) = client.subscribe(&pong_topic, QoS::AtMostOnce).await {
        return ProbeOutcome::Unhealthy {
            error: format!("subscribe request failed: {e}"),
        };
    }
    if let Err(e) = client.publish(&ping_topic, QoS::AtLeastOnce, false, "ping").await {
        return ProbeOutcome::Unhealthy {
            error: format!("publish request failed: {e}"),
        };
    }

    let mut deadline = tokio::time::Instant::now() + timeout;
    let mut connected_at: Option<Instant> = None;
    let mut response_time: Option<Duration> = None;

    let outcome = loop {
        match timeout_at(deadline, eventloop.poll()).await {
            Ok(Ok(Event::Incoming(Incoming::ConnAck(_)))) => {
                debug!("Connected to {} broker", broker.name);
                connected_at = Some(Instant::now());
            }
            Ok(Ok(Event::Incoming(Incoming::PubAck(_)))) => {
                // Ping accepted; leave only the grace window for a pong.
                deadline = deadline.min(tokio::time::Instant::now() + PONG_GRACE);
            }
            Ok(Ok(Event::Incoming(Incoming::Publish(p)))) if p.topic == pong_topic => {
                if let Some(t0) = connected_at {
                    response_time = Some(t0.elapsed());
                }
                break ProbeOutcome::Healthy { response_time };
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                // A transport error after ConnAck still means the broker was
                // reachable; before ConnAck it is the failure reason.
                if connected_at.is_some() {
                    break ProbeOutcome::Healthy { response_time };
                }
                break ProbeOutcome::Unhealthy {
                    error: format!("connection failed: {e}"),
                };
            }
            Err(_) => {
                if connected_at.is_some() {
                    break ProbeOutcome::Healthy { response_time };
                }
                break ProbeOutcome::Unhealthy {
                    error: format!("no connection within {}s", timeout.as_secs()),
                };
            }
        }
    };

    // Best-effort clean disconnect; one short poll lets the packet flush.
    // Dropping the event loop closes the socket either way, so nothing leaks
    // on the error paths.
    let _ = client.disconnect().await;
    let _ = tokio::time::timeout(Duration::from_millis(100), eventloop.poll()).await;

    outcome
}
