//! Device and metric data model
//!
//! A [`Device`] is built once by the host process and shared through an
//! `Arc` by every [`Metric`] that belongs to it. The `Arc` keeps the device
//! alive for as long as any of its metrics, and only hands out shared
//! references, so neither side is mutated after construction. The single
//! piece of mutable state is the metric's last announcement instant, which
//! lives behind the metric's own lock (see [`crate::publisher`]).

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Logical entity grouping metrics under shared display metadata.
///
/// Only `id` is required; empty display fields are left out of discovery
/// payloads where Home Assistant allows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Device {
    pub namespace: String,
    pub client_id: String,
    pub id: String,

    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub hw_version: String,
    pub sw_version: String,
}

impl Device {
    pub fn new(
        namespace: impl Into<String>,
        client_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            client_id: client_id.into(),
            id: id.into(),
            ..Default::default()
        }
    }
}

/// One measurable quantity of a [`Device`].
///
/// `device_type` is the Home Assistant component (`sensor`, `binary_sensor`,
/// ...). `device_class`, `unit`, `state_class` and `value_template` are
/// passed through to the discovery payload as-is.
#[derive(Debug)]
pub struct Metric {
    pub device: Arc<Device>,
    pub id: String,
    pub device_type: String,
    pub device_class: String,
    pub unit: String,
    pub name: String,
    pub state_class: String,
    pub value_template: String,

    /// Instant of the last successful config publish.
    pub(crate) announced: Mutex<Option<Instant>>,
}

impl Metric {
    pub fn new(device: Arc<Device>, id: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            device,
            id: id.into(),
            device_type: device_type.into(),
            device_class: String::new(),
            unit: String::new(),
            name: String::new(),
            state_class: String::new(),
            value_template: String::new(),
            announced: Mutex::new(None),
        }
    }

    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = device_class.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_state_class(mut self, state_class: impl Into<String>) -> Self {
        self.state_class = state_class.into();
        self
    }

    pub fn with_value_template(mut self, value_template: impl Into<String>) -> Self {
        self.value_template = value_template.into();
        self
    }

    /// When the config message was last announced successfully, if ever.
    ///
    /// Waits for any publish in progress on this metric.
    pub async fn announced_at(&self) -> Option<Instant> {
        *self.announced.lock().await
    }
}
