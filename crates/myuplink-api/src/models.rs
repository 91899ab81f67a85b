// Wire types for the myUplink v2 API.
//
// The API is camelCase JSON; identifiers are opaque strings. Parameter
// ids are documented as strings but some firmwares emit bare numbers,
// so the id field accepts both.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Envelope around `GET /v2/systems/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemsPage {
    #[serde(default)]
    pub systems: Vec<System>,
}

/// A system (installation) owned by the authorized user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub system_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub devices: Vec<DeviceRef>,
}

/// Device reference as embedded in the systems listing.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRef {
    pub id: String,
}

/// Full device details from `GET /v2/devices/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub product: Product,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub current_fw_version: String,
    #[serde(default)]
    pub connection_state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub name: String,
}

/// A single data point from `GET /v2/devices/{id}/points`.
///
/// Also serializable, in the same camelCase shape, for the `--save`
/// export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(deserialize_with = "id_string")]
    pub parameter_id: String,
    #[serde(default)]
    pub parameter_name: String,
    #[serde(default)]
    pub parameter_unit: String,
    pub value: PointValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<EnumValue>,
}

/// A parameter value: numeric for sensor readings, text for labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Number(f64),
    Text(String),
}

impl PointValue {
    /// Numeric view of the value, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for PointValue {
    /// Render without a trailing `.0` for integral floats, matching the
    /// string the vendor app shows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One option of an enumerated parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumValue {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub text: String,
}

/// Accept a parameter id as either a JSON string or a bare number.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(i64),
        Text(String),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Num(n) => n.to_string(),
        Repr::Text(s) => s,
    })
}
