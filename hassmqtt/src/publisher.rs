//! Throttled config + state publishing
//!
//! A metric is either *fresh* (config never announced, or last announced at
//! least [`ANNOUNCE_INTERVAL`] ago) or *warm*. Publishing a value on a fresh
//! metric first announces its config, and only a successful announcement
//! makes it warm. A failed announcement aborts the call before the value is
//! sent, leaving the metric fresh so the next call retries it.
//!
//! The metric's lock is held for the whole sequence: concurrent publishes on
//! one metric run one after the other and can never both announce inside the
//! same window. Different metrics never contend.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::model::Metric;
use crate::transport::Transport;

/// Minimum delay between two config announcements of the same metric.
pub const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(60);

impl Metric {
    /// Publishes `value` as JSON on the state topic, announcing the metric's
    /// config first when it is due.
    ///
    /// Both messages are sent with `retain = false`. Errors from either phase
    /// are returned as-is; nothing is retried here.
    pub async fn publish<T, V>(&self, transport: &T, value: &V) -> Result<()>
    where
        T: Transport + Sync,
        V: Serialize + Sync + ?Sized,
    {
        let mut announced = self.announced.lock().await;

        if announcement_due(*announced, Instant::now()) {
            let topic = self.config_topic();
            if let Err(e) = send(transport, &topic, &self.config_payload(), false).await {
                warn!("config announcement failed for {}: {}", topic, e);
                return Err(e);
            }
            *announced = Some(Instant::now());
            debug!("announced config on {}", topic);
        }

        let topic = self.topic();
        send(transport, &topic, value, false).await?;
        trace!("published value on {}", topic);
        Ok(())
    }
}

fn announcement_due(last: Option<Instant>, now: Instant) -> bool {
    match last {
        Some(at) => now.saturating_duration_since(at) >= ANNOUNCE_INTERVAL,
        None => true,
    }
}

async fn send<T, P>(transport: &T, topic: &str, payload: &P, retain: bool) -> Result<()>
where
    T: Transport + Sync,
    P: Serialize + Sync + ?Sized,
{
    let bytes = serde_json::to_vec(payload).map_err(|source| Error::Serialization {
        topic: topic.to_string(),
        source,
    })?;

    transport
        .publish(topic, bytes, retain)
        .await
        .map_err(|source| Error::Transport {
            topic: topic.to_string(),
            source: Box::new(source),
        })
}
