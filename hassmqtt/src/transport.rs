//! Publish primitive used by [`crate::Metric::publish`]
//!
//! The core only needs to send bytes to a topic and learn whether it worked.
//! Connection handling, reconnects, TLS and sessions are the transport's
//! business.

use std::future::Future;

use rumqttc::{AsyncClient, ClientError, QoS};

pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends `payload` to `topic`. Errors are handed back to the caller unchanged.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Publishes at QoS 0 without waiting for room on the client's request queue.
///
/// A queued request counts as sent; the event loop must be polled elsewhere.
/// When the queue is full (broker unreachable, event loop stalled) or closed,
/// the publish fails at once with `ClientError::TryRequest` instead of
/// blocking, so a metric whose config could not be queued stays unannounced.
impl Transport for AsyncClient {
    type Error = ClientError;

    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        std::future::ready(self.try_publish(topic, QoS::AtMostOnce, retain, payload))
    }
}
