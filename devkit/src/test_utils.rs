/*!
Test Harness pour publications Home Assistant

Facilite l'écriture de tests avec:
- Setup automatique du transport mocké et d'un device de test
- Assertions sur les messages config / state publiés par une métrique
*/

use crate::mqtt_stub::MockTransport;
use hassmqtt::{ConfigPayload, Device, Metric};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use anyhow::Result;

/// Harness de test complet pour métriques hassmqtt
pub struct TestHarness {
    pub transport: MockTransport,
    pub device: Arc<Device>,
    expectations: Vec<Expectation>,
}

#[derive(Debug)]
struct Expectation {
    topic: String,
    expected_count: usize,
}

impl TestHarness {
    /// Crée un harness avec le device `home / host-abc / kitchen`
    pub fn new() -> Self {
        Self::with_device(Device::new("home", "host-abc", "kitchen"))
    }

    pub fn with_device(device: Device) -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        Self {
            transport: MockTransport::new(),
            device: Arc::new(device),
            expectations: Vec::new(),
        }
    }

    /// Nouvelle métrique attachée au device du harness
    pub fn metric(&self, id: &str, device_type: &str) -> Metric {
        Metric::new(self.device.clone(), id, device_type)
    }

    /// Ajoute une expectation: on s'attend à trouver N messages sur un topic
    pub fn expect_messages(&mut self, topic: &str, count: usize) -> &mut Self {
        self.expectations.push(Expectation {
            topic: topic.to_string(),
            expected_count: count,
        });
        self
    }

    /// Vérifie toutes les expectations configurées
    pub fn verify_expectations(&self) -> Result<()> {
        log::info!("🔍 Verifying {} expectations...", self.expectations.len());

        for expectation in &self.expectations {
            let actual_count = self.transport.count_messages(&expectation.topic);

            if actual_count != expectation.expected_count {
                anyhow::bail!(
                    "Expectation failed for topic '{}': expected {} messages, got {}",
                    expectation.topic, expectation.expected_count, actual_count
                );
            }

            log::info!("✅ Topic '{}': {} messages as expected", expectation.topic, actual_count);
        }

        Ok(())
    }

    /// Nombre d'annonces config publiées pour cette métrique
    pub fn config_count(&self, metric: &Metric) -> usize {
        self.transport.count_messages(&metric.config_topic())
    }

    /// Nombre de valeurs publiées pour cette métrique
    pub fn state_count(&self, metric: &Metric) -> usize {
        self.transport.count_messages(&metric.topic())
    }

    /// Dernière annonce config publiée pour cette métrique
    pub fn last_config(&self, metric: &Metric) -> Result<Option<ConfigPayload>> {
        self.transport.get_last_json_message(&metric.config_topic())
    }

    /// Dernière valeur publiée pour cette métrique
    pub fn last_state(&self, metric: &Metric) -> Result<Option<Value>> {
        self.transport.get_last_json_message(&metric.topic())
    }

    /// Assert qu'un champ a une valeur spécifique dans le dernier message
    pub fn assert_field_equals(&self, topic: &str, field_path: &str, expected: &Value) -> Result<()> {
        if let Some(msg) = self.transport.get_last_json_message::<Value>(topic)? {
            if let Some(actual) = get_nested_field(&msg, field_path) {
                if actual == expected {
                    return Ok(());
                }
                anyhow::bail!(
                    "Field '{}' mismatch: expected {:?}, got {:?}",
                    field_path, expected, actual
                );
            }
        }

        anyhow::bail!("Field '{}' not found for comparison in {}", field_path, topic);
    }

    /// Stats sur les messages collectés
    pub fn get_stats(&self) -> TestStats {
        let messages = self.transport.get_published_messages();
        let mut topic_counts = HashMap::new();

        for msg in &messages {
            *topic_counts.entry(msg.topic.clone()).or_insert(0) += 1;
        }

        TestStats {
            total_messages: messages.len(),
            failed_attempts: self.transport.get_attempts().len() - messages.len(),
            topic_counts,
        }
    }

    /// Reset le harness pour un nouveau test
    pub fn reset(&mut self) {
        self.transport.clear();
        self.expectations.clear();
        log::info!("🧹 Test harness reset");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn get_nested_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

#[derive(Debug)]
pub struct TestStats {
    pub total_messages: usize,
    pub failed_attempts: usize,
    pub topic_counts: HashMap<String, usize>,
}

impl TestStats {
    pub fn print(&self) {
        println!("📊 Test Statistics:");
        println!("  Total messages: {}", self.total_messages);
        println!("  Failed attempts: {}", self.failed_attempts);
        for (topic, count) in &self.topic_counts {
            println!("    {}: {} messages", topic, count);
        }
    }
}
