//! hassmqtt - expose metrics to Home Assistant over MQTT
//!
//! Each [`Metric`] belongs to a [`Device`] and publishes two kinds of messages:
//! - a discovery "config" message on `homeassistant/<type>/<key>/config`,
//!   re-announced at most once per [`ANNOUNCE_INTERVAL`]
//! - its live value on the state topic `<namespace>/<client>/<device>/<metric>`
//!
//! ```ignore
//! let device = Arc::new(Device::new("home", hassmqtt::client_id("kitchen-sensors"), "kitchen"));
//! let temp = Metric::new(device.clone(), "temp", "sensor")
//!     .with_device_class("temperature")
//!     .with_unit("°C");
//! temp.publish(&mqtt_client, &21.5).await?;
//! ```
//!
//! The transport is anything implementing [`Transport`]; an implementation for
//! `rumqttc::AsyncClient` is provided.

pub mod error;
pub mod identity;
pub mod model;
pub mod publisher;
pub mod topic;
pub mod transport;

pub use error::{Error, Result};
pub use identity::{client_id, client_id_from};
pub use model::{Device, Metric};
pub use publisher::ANNOUNCE_INTERVAL;
pub use topic::{ConfigPayload, DeviceDescriptor};
pub use transport::Transport;
