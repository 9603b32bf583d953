/*!
Mock MQTT Transport pour développement sans broker

Implémente `hassmqtt::Transport` en mémoire. Enregistre tous les messages
publiés, permet de simuler des pannes par topic et une latence réseau, et
mesure le nombre de publications simultanées.
*/

use hassmqtt::Transport;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

/// Erreur renvoyée pour une panne simulée
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("simulated publish failure on {topic}")]
pub struct MockTransportError {
    pub topic: String,
}

/// Pannes programmées: topic -> nombre d'échecs restants (`None` = permanent)
type FailurePlan = HashMap<String, Option<usize>>;

/// Transport mocké, clonable, partagé entre tâches
#[derive(Clone, Default)]
pub struct MockTransport {
    published_messages: Arc<Mutex<Vec<MockMessage>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<FailurePlan>>,
    latency: Arc<Mutex<Option<Duration>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chaque publication attend `latency` avant de répondre
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = Some(latency);
        self
    }

    /// Toutes les publications sur `topic` échouent jusqu'à `clear_failures`
    pub fn fail_topic<S: Into<String>>(&self, topic: S) {
        self.failures.lock().unwrap().insert(topic.into(), None);
    }

    /// Les `times` prochaines publications sur `topic` échouent
    pub fn fail_topic_times<S: Into<String>>(&self, topic: S, times: usize) {
        if times == 0 {
            return;
        }
        self.failures.lock().unwrap().insert(topic.into(), Some(times));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Consomme une panne programmée pour ce topic, si il y en a une
    fn take_failure(&self, topic: &str) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(topic) {
            Some(None) => true,
            Some(Some(remaining)) => {
                *remaining -= 1;
                if *remaining == 0 {
                    failures.remove(topic);
                }
                true
            }
            None => false,
        }
    }

    /// Récupère tous les messages publiés avec succès (pour assertions de tests)
    pub fn get_published_messages(&self) -> Vec<MockMessage> {
        self.published_messages.lock().unwrap().clone()
    }

    /// Topics de toutes les tentatives, échecs compris, dans l'ordre
    pub fn get_attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Trouve les messages publiés sur un topic donné
    pub fn find_messages_by_topic(&self, topic: &str) -> Vec<MockMessage> {
        self.published_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.topic == topic)
            .cloned()
            .collect()
    }

    pub fn count_messages(&self, topic: &str) -> usize {
        self.find_messages_by_topic(topic).len()
    }

    /// Parse le dernier message d'un topic en JSON
    pub fn get_last_json_message<T: DeserializeOwned>(&self, topic: &str) -> Result<Option<T>> {
        let messages = self.find_messages_by_topic(topic);
        if let Some(last_msg) = messages.last() {
            let parsed: T = serde_json::from_slice(&last_msg.payload)?;
            Ok(Some(parsed))
        } else {
            Ok(None)
        }
    }

    /// Nombre maximum de publications observées en même temps
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Reset tous les messages enregistrés et les pannes programmées
    pub fn clear(&self) {
        self.published_messages.lock().unwrap().clear();
        self.attempts.lock().unwrap().clear();
        self.failures.lock().unwrap().clear();
        self.max_in_flight.store(0, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    type Error = MockTransportError;

    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MockTransportError> {
        self.attempts.lock().unwrap().push(topic.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        match latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }

        let outcome = if self.take_failure(topic) {
            log::warn!("💥 [MOCK] Simulated failure on {}", topic);
            Err(MockTransportError { topic: topic.to_string() })
        } else {
            log::info!("📤 [MOCK] Published to {}: {} bytes", topic, payload.len());
            self.published_messages.lock().unwrap().push(MockMessage {
                topic: topic.to_string(),
                payload,
                retain,
            });
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
