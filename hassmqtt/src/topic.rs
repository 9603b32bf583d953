//! Topic and discovery payload derivation
//!
//! Pure functions of a metric and its device. Identifiers are not validated:
//! empty segments or segments containing `/` produce odd but well defined
//! topics, callers are expected to pick sane IDs.

use serde::{Deserialize, Serialize};

use crate::model::Metric;

/// Root of the Home Assistant discovery topic tree.
pub const DISCOVERY_PREFIX: &str = "homeassistant";

/// Discovery message describing a metric (Home Assistant MQTT discovery schema).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPayload {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub device_class: String,
    pub state_topic: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit_of_measurement: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value_template: String,
    pub unique_id: String,
    pub device: DeviceDescriptor,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state_class: String,
}

/// Device block nested in [`ConfigPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub identifiers: Vec<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hw_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sw_version: String,
}

impl Metric {
    /// State topic: `<namespace>/<client id>/<device id>/<metric id>`.
    pub fn topic(&self) -> String {
        let device = &self.device;
        [
            device.namespace.as_str(),
            device.client_id.as_str(),
            device.id.as_str(),
            self.id.as_str(),
        ]
        .join("/")
    }

    /// Discovery topic:
    /// `homeassistant/<device type>/<namespace>-<client id>-<device id>-<metric id>/config`.
    pub fn config_topic(&self) -> String {
        let device = &self.device;
        let key = [
            device.namespace.as_str(),
            device.client_id.as_str(),
            device.id.as_str(),
            self.id.as_str(),
        ]
        .join("-");

        [DISCOVERY_PREFIX, self.device_type.as_str(), key.as_str(), "config"].join("/")
    }

    /// Unique ID of the metric. Leaves the client ID out so the entity
    /// survives a change of generated client ID.
    pub fn unique_id(&self) -> String {
        [
            self.device.namespace.as_str(),
            self.device.id.as_str(),
            self.id.as_str(),
        ]
        .join("-")
    }

    /// Builds a fresh discovery payload. `state_topic` always equals [`Metric::topic`].
    pub fn config_payload(&self) -> ConfigPayload {
        let device = &self.device;

        ConfigPayload {
            name: self.name.clone(),
            device_class: self.device_class.clone(),
            state_topic: self.topic(),
            unit_of_measurement: self.unit.clone(),
            value_template: self.value_template.clone(),
            unique_id: self.unique_id(),
            state_class: self.state_class.clone(),

            device: DeviceDescriptor {
                // same asymmetry as unique_id: no client ID
                identifiers: vec![format!("{}-{}", device.namespace, device.id)],
                name: device.name.clone(),
                manufacturer: device.manufacturer.clone(),
                model: device.model.clone(),
                hw_version: device.hw_version.clone(),
                sw_version: device.sw_version.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Device;
    use serde_json::json;
    use std::sync::Arc;

    fn kitchen() -> Arc<Device> {
        Arc::new(Device::new("home", "host-abc", "kitchen"))
    }

    #[test]
    fn test_state_and_config_topics() {
        let temp = Metric::new(kitchen(), "temp", "sensor");
        assert_eq!(temp.topic(), "home/host-abc/kitchen/temp");
        assert_eq!(
            temp.config_topic(),
            "homeassistant/sensor/home-host-abc-kitchen-temp/config"
        );
    }

    #[test]
    fn test_payload_state_topic_matches_topic() {
        let ids = [
            ("home", "host-abc", "kitchen", "temp"),
            ("", "", "", ""),
            ("a/b", "c", "d-e", "f g"),
        ];
        for (namespace, client, device, metric) in ids {
            let metric = Metric::new(Arc::new(Device::new(namespace, client, device)), metric, "sensor");
            assert_eq!(metric.config_payload().state_topic, metric.topic());
        }
    }

    #[test]
    fn test_identifiers_omit_client_id() {
        let temp = Metric::new(kitchen(), "temp", "sensor");
        let payload = temp.config_payload();
        assert_eq!(payload.unique_id, "home-kitchen-temp");
        assert_eq!(payload.device.identifiers, vec!["home-kitchen".to_string()]);
        assert!(temp.config_topic().contains("host-abc"));
    }

    #[test]
    fn test_unique_id_stable_across_client_ids() {
        let a = Metric::new(Arc::new(Device::new("home", "host-a-h0000000", "kitchen")), "temp", "sensor");
        let b = Metric::new(Arc::new(Device::new("home", "host-b-h1111111", "kitchen")), "temp", "sensor");
        assert_eq!(a.unique_id(), b.unique_id());
        assert_ne!(a.config_topic(), b.config_topic());
    }

    #[test]
    fn test_minimal_payload_omits_empty_fields() {
        let temp = Metric::new(kitchen(), "temp", "sensor");
        let value = serde_json::to_value(temp.config_payload()).unwrap();
        assert_eq!(
            value,
            json!({
                "device_class": "",
                "state_topic": "home/host-abc/kitchen/temp",
                "unique_id": "home-kitchen-temp",
                "device": {
                    "identifiers": ["home-kitchen"],
                    "name": ""
                }
            })
        );
    }

    #[test]
    fn test_full_payload() {
        let device = Arc::new(Device {
            name: "Kitchen".into(),
            manufacturer: "Acme".into(),
            model: "Probe 2".into(),
            hw_version: "rev3".into(),
            sw_version: "1.4.0".into(),
            ..Device::new("home", "host-abc", "kitchen")
        });
        let temp = Metric::new(device, "temp", "sensor")
            .with_name("Temperature")
            .with_device_class("temperature")
            .with_unit("°C")
            .with_state_class("measurement")
            .with_value_template("{{ value_json }}");

        let value = serde_json::to_value(temp.config_payload()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Temperature",
                "device_class": "temperature",
                "state_topic": "home/host-abc/kitchen/temp",
                "unit_of_measurement": "°C",
                "value_template": "{{ value_json }}",
                "unique_id": "home-kitchen-temp",
                "device": {
                    "identifiers": ["home-kitchen"],
                    "name": "Kitchen",
                    "manufacturer": "Acme",
                    "model": "Probe 2",
                    "hw_version": "rev3",
                    "sw_version": "1.4.0"
                },
                "state_class": "measurement"
            })
        );
    }

    #[test]
    fn test_payload_field_order() {
        let temp = Metric::new(kitchen(), "temp", "sensor").with_name("T");
        let text = serde_json::to_string(&temp.config_payload()).unwrap();
        assert!(text.starts_with(r#"{"name":"T","device_class":"","state_topic":"#));
    }
}
