//! One-shot JSON export of everything the API returns.
//!
//! `--save [FILE]` walks the same systems/devices/points endpoints as
//! the poll loop and writes the raw data as pretty-printed JSON, then
//! exits. Useful for inspecting what a unit reports without standing up
//! a broker.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use myuplink_api::{ApiClient, Parameter, Product};

use crate::error::BridgeError;

#[derive(Debug, Serialize)]
struct Export {
    systems: Vec<SystemExport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemExport {
    system_id: String,
    name: String,
    devices: Vec<DeviceExport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceExport {
    id: String,
    product: Product,
    serial_number: String,
    connection_state: Option<String>,
    current_fw_version: String,
    data_points: Vec<Parameter>,
}

/// Fetch every system, device and data point and write them to `path`.
///
/// A device that fails to answer is skipped with a warning so one sick
/// unit does not sink the whole export.
pub async fn run(client: &ApiClient, path: &Path) -> Result<(), BridgeError> {
    let systems = client.list_systems().await?;
    let mut export = Export {
        systems: Vec::new(),
    };

    for system in systems {
        let mut devices = Vec::new();
        for device_ref in &system.devices {
            let details = match client.get_device_details(&device_ref.id).await {
                Ok(d) => d,
                Err(e) => {
                    warn!(device = %device_ref.id, "device skipped in export: {e}");
                    continue;
                }
            };
            let points = match client.get_device_points(&device_ref.id, None).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(device = %device_ref.id, "device skipped in export: {e}");
                    continue;
                }
            };
            devices.push(DeviceExport {
                id: details.id,
                product: details.product,
                serial_number: details.serial_number,
                connection_state: details.connection_state,
                current_fw_version: details.current_fw_version,
                data_points: points,
            });
        }
        export.systems.push(SystemExport {
            system_id: system.system_id,
            name: system.name,
            devices,
        });
    }

    let json = serde_json::to_string_pretty(&export).map_err(std::io::Error::other)?;
    std::fs::write(path, json)?;
    info!("API data saved to {}", path.display());
    Ok(())
}
