// Home Assistant MQTT discovery payloads.
//
// One retained JSON config per sensor entity under
// `{discovery_prefix}/sensor/{unique_id}/config`; entities of the same
// physical device share a device block so Home Assistant groups them.

use serde::Serialize;

use myuplink_api::Device;

use crate::classify::{ClassifiedSensor, DeviceClass, EntityCategory, StateClass};

const REPOSITORY_URL: &str = "https://github.com/j-b-n/myuplink2mqtt-rs";

/// Device identity as it appears in discovery payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub product_name: String,
    pub serial_number: String,
    pub firmware_version: String,
}

impl DeviceInfo {
    /// Manufacturer part of the product name: everything before the
    /// first whitespace run. A single-word product name is all
    /// manufacturer.
    pub fn manufacturer(&self) -> &str {
        self.product_name
            .split_whitespace()
            .next()
            .unwrap_or_default()
    }

    /// Model part of the product name: everything after the first
    /// whitespace run, empty for single-word names.
    pub fn model(&self) -> &str {
        let name = self.product_name.trim();
        name.find(char::is_whitespace)
            .map_or("", |i| name[i..].trim_start())
    }
}

impl From<&Device> for DeviceInfo {
    fn from(device: &Device) -> Self {
        Self {
            device_id: device.id.clone(),
            product_name: device.product.name.clone(),
            serial_number: device.serial_number.clone(),
            firmware_version: device.current_fw_version.clone(),
        }
    }
}

/// The `device` block shared by all entities of one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceBlock {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sw_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serial_number: String,
}

/// The `origin` block identifying this bridge to Home Assistant.
#[derive(Debug, Clone, Serialize)]
pub struct OriginBlock {
    pub name: &'static str,
    #[serde(rename = "sw")]
    pub sw_version: &'static str,
    pub url: &'static str,
}

impl Default for OriginBlock {
    fn default() -> Self {
        Self {
            name: "myuplink2mqtt",
            sw_version: env!("CARGO_PKG_VERSION"),
            url: REPOSITORY_URL,
        }
    }
}

/// Entity configuration published to the discovery topic.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryPayload {
    pub name: String,
    pub unique_id: String,
    pub object_id: String,
    pub state_topic: String,
    pub availability_topic: String,
    pub payload_available: &'static str,
    pub payload_not_available: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<EntityCategory>,
    pub device: DeviceBlock,
    pub origin: OriginBlock,
}

/// Assemble the discovery config for one classified sensor.
pub fn build_discovery_payload(
    device: &DeviceInfo,
    sensor: &ClassifiedSensor,
    state_topic: String,
    availability_topic: String,
) -> DiscoveryPayload {
    DiscoveryPayload {
        name: sensor.name.clone(),
        unique_id: sensor.unique_id.clone(),
        object_id: sensor.unique_id.clone(),
        state_topic,
        availability_topic,
        payload_available: "online",
        payload_not_available: "offline",
        unit_of_measurement: sensor.unit.clone(),
        device_class: sensor.device_class,
        state_class: sensor.state_class,
        entity_category: sensor.entity_category,
        device: DeviceBlock {
            identifiers: vec![format!("myuplink_{}", device.device_id)],
            name: device.product_name.clone(),
            manufacturer: device.manufacturer().to_string(),
            model: device.model().to_string(),
            sw_version: device.firmware_version.clone(),
            serial_number: device.serial_number.clone(),
        },
        origin: OriginBlock::default(),
    }
}
