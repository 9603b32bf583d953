/*!
# hassmqtt DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant le test des publications Home Assistant avec:
- Transport MQTT mocké (enregistrement, pannes simulées, latence)
- Harness de test avec assertions sur les messages config / state
*/

pub mod mqtt_stub;
pub mod test_utils;

pub use mqtt_stub::{MockMessage, MockTransport, MockTransportError};
pub use test_utils::TestHarness;
