//! Pure domain logic for the myUplink → MQTT bridge.
//!
//! Classification of raw vendor parameters into semantic sensor
//! descriptions, Home-Assistant discovery payload construction, and MQTT
//! topic layout. Everything here is deterministic and side-effect free;
//! the binary crate owns all I/O.

pub mod classify;
pub mod discovery;
pub mod topics;

pub use classify::{ClassifiedSensor, DeviceClass, EntityCategory, StateClass, classify};
pub use discovery::{DeviceInfo, DiscoveryPayload, build_discovery_payload};
