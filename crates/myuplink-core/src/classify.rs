// Turns raw vendor data points into semantic sensor descriptions.
//
// Classification is pure and deterministic: the same `Parameter` always
// yields the same `ClassifiedSensor`. Priority order is parameter-id
// special cases, then name cleanup, then unit-derived metadata, then
// value formatting.

use myuplink_api::{Parameter, PointValue};
use serde::Serialize;

use crate::topics;

/// Home Assistant device class for a sensor entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Temperature,
    Power,
    Energy,
    Current,
    Voltage,
    Humidity,
    Pressure,
    Frequency,
    VolumeFlowRate,
}

/// Home Assistant entity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Diagnostic,
    Config,
}

/// Home Assistant state class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// A parameter after classification: everything the publishers need,
/// nothing vendor-shaped left.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSensor {
    pub parameter_id: String,
    pub unique_id: String,
    /// Cleaned human-readable name.
    pub name: String,
    /// Normalized unit, `None` when the parameter is unitless.
    pub unit: Option<String>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub entity_category: Option<EntityCategory>,
    /// Formatted value ready to publish as the state payload.
    pub state_value: String,
}

/// Parameter ids whose labels the vendor never localizes; the firmware
/// returns `Text not found: id[...]` for these.
const INSTALLATION_DATE_NAMES: &[(&str, &str)] = &[
    ("60720", "Installation year"),
    ("60719", "Installation month"),
    ("60704", "Installation day"),
];

/// Ids that force a device class regardless of unit.
const ID_DEVICE_CLASSES: &[(&str, DeviceClass)] = &[("60433", DeviceClass::Humidity)];

/// Unit string (as reported by the API) to device class.
const UNIT_DEVICE_CLASSES: &[(&str, DeviceClass)] = &[
    ("°C", DeviceClass::Temperature),
    ("C", DeviceClass::Temperature),
    ("°F", DeviceClass::Temperature),
    ("F", DeviceClass::Temperature),
    ("kW", DeviceClass::Power),
    ("W", DeviceClass::Power),
    ("kWh", DeviceClass::Energy),
    ("Wh", DeviceClass::Energy),
    ("A", DeviceClass::Current),
    ("V", DeviceClass::Voltage),
    ("rh%", DeviceClass::Humidity),
    ("%", DeviceClass::Humidity),
    ("bar", DeviceClass::Pressure),
    ("Pa", DeviceClass::Pressure),
    ("hPa", DeviceClass::Pressure),
    ("Hz", DeviceClass::Frequency),
    ("l/m", DeviceClass::VolumeFlowRate),
    ("l/min", DeviceClass::VolumeFlowRate),
    ("l/hr", DeviceClass::VolumeFlowRate),
    ("m³/h", DeviceClass::VolumeFlowRate),
];

/// Ids that are diagnostic by nature (counters, alarms) even when the
/// name alone would not say so.
const DIAGNOSTIC_IDS: &[&str] = &["43161", "43437", "43438"];

const DIAGNOSTIC_KEYWORDS: &[&str] = &[
    "accumulated",
    "total",
    "starts",
    "runtime",
    "hours",
    "alarm",
    "error",
];

/// Classify one data point of a device.
pub fn classify(system_id: &str, device_id: &str, parameter: &Parameter) -> ClassifiedSensor {
    let id = parameter.parameter_id.as_str();
    let name = display_name(id, &parameter.parameter_name);

    let unit = normalize_unit(&parameter.parameter_unit);
    let unit = (!unit.is_empty()).then(|| unit.to_string());

    let device_class = device_class(id, &parameter.parameter_unit);
    let state_class = unit.as_deref().map(|u| match u {
        "kWh" | "Wh" => StateClass::TotalIncreasing,
        _ => StateClass::Measurement,
    });
    let entity_category = entity_category(id, &name);

    ClassifiedSensor {
        parameter_id: id.to_string(),
        unique_id: topics::unique_id(system_id, device_id, id),
        state_value: format_value(parameter, device_class, unit.as_deref()),
        name,
        unit,
        device_class,
        state_class,
        entity_category,
    }
}

/// Human-readable name for a parameter, resolving untranslated labels.
fn display_name(parameter_id: &str, raw_name: &str) -> String {
    if let Some(name) = installation_date_name(parameter_id) {
        return name.to_string();
    }

    let cleaned = clean_name(raw_name);
    let cleaned = strip_device_prefix(&cleaned);

    // Firmware without a translation emits
    // `Text not found: id[60720], fw[noem-h], lang[en-US]`.
    if let Some(id) = untranslated_id(&cleaned) {
        return installation_date_name(id)
            .map_or_else(|| format!("No Label ({id})"), ToString::to_string);
    }

    cleaned
}

fn installation_date_name(parameter_id: &str) -> Option<&'static str> {
    INSTALLATION_DATE_NAMES
        .iter()
        .find(|(id, _)| *id == parameter_id)
        .map(|(_, name)| *name)
}

fn untranslated_id(name: &str) -> Option<&str> {
    let rest = name.strip_prefix("Text not found: id[")?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

/// Strip soft hyphens, normalize non-breaking spaces, drop CR/LF,
/// collapse space runs, trim.
fn clean_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true; // also trims leading spaces
    for c in raw.chars() {
        match c {
            '\u{00ad}' | '\r' | '\n' => {}
            ' ' | '\u{00a0}' => {
                if !last_space {
                    out.push(' ');
                    last_space = true;
                }
            }
            c => {
                out.push(c);
                last_space = false;
            }
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Strip the `PREFIX (…)` device-code wrapper some firmwares put around
/// parameter names, e.g. `SAK (SAK Operating mode)` → `Operating mode`.
fn strip_device_prefix(name: &str) -> String {
    let Some(open) = name.find('(') else {
        return name.to_string();
    };
    let prefix = name[..open].trim_end();
    let wrapped = !prefix.is_empty()
        && prefix.chars().all(|c| c.is_alphanumeric() || c == '_')
        && name.ends_with(')')
        && open < name.len() - 1;
    if !wrapped {
        return name.to_string();
    }

    let inner = &name[open + 1..name.len() - 1];
    if inner.is_empty() {
        return name.to_string();
    }

    // The device code is often repeated inside the parentheses.
    if let Some(rest) = inner.strip_prefix(prefix) {
        let rest = rest.trim_start();
        if !rest.is_empty() && rest.len() < inner.len() {
            return rest.to_string();
        }
    }
    inner.to_string()
}

fn device_class(parameter_id: &str, raw_unit: &str) -> Option<DeviceClass> {
    ID_DEVICE_CLASSES
        .iter()
        .find(|(id, _)| *id == parameter_id)
        .or_else(|| UNIT_DEVICE_CLASSES.iter().find(|(u, _)| *u == raw_unit))
        .map(|(_, class)| *class)
}

/// Map vendor unit spellings onto the representations Home Assistant
/// expects.
fn normalize_unit(raw_unit: &str) -> &str {
    match raw_unit {
        "rh%" => "%",
        "l/m" => "l/hr",
        unit => unit,
    }
}

fn entity_category(parameter_id: &str, name: &str) -> Option<EntityCategory> {
    if installation_date_name(parameter_id).is_some() {
        return Some(EntityCategory::Config);
    }
    if DIAGNOSTIC_IDS.contains(&parameter_id) {
        return Some(EntityCategory::Diagnostic);
    }
    let lower = name.to_lowercase();
    if DIAGNOSTIC_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some(EntityCategory::Diagnostic);
    }
    None
}

/// Format the state payload for a parameter.
///
/// Enumerated parameters publish the option text; installation-date
/// components and percentages publish integers; temperatures keep one
/// decimal; everything else renders the value as-is.
fn format_value(
    parameter: &Parameter,
    device_class: Option<DeviceClass>,
    unit: Option<&str>,
) -> String {
    if let Some(text) = enum_text(parameter) {
        return text;
    }

    let Some(n) = parameter.value.as_f64() else {
        return parameter.value.to_string();
    };

    if installation_date_name(&parameter.parameter_id).is_some() {
        return format!("{}", n as i64);
    }
    if device_class == Some(DeviceClass::Temperature) {
        return format!("{n:.1}");
    }
    if unit == Some("%") {
        return format!("{}", n.round() as i64);
    }
    parameter.value.to_string()
}

/// Resolve the option text of an enumerated parameter, if any.
fn enum_text(parameter: &Parameter) -> Option<String> {
    if parameter.enum_values.is_empty() {
        return None;
    }
    let key = match &parameter.value {
        PointValue::Number(n) => format!("{}", *n as i64),
        PointValue::Text(s) => s.clone(),
    };
    parameter
        .enum_values
        .iter()
        .find(|e| e.value == key)
        .map(|e| clean_name(&e.text))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parameter(id: &str, name: &str, unit: &str, value: f64) -> Parameter {
        serde_json::from_value(serde_json::json!({
            "parameterId": id,
            "parameterName": name,
            "parameterUnit": unit,
            "value": value,
        }))
        .expect("parameter fixture")
    }

    #[test]
    fn outdoor_temperature_classifies_as_temperature_sensor() {
        let p = parameter("40004", "Outdoor temperature (BT1)", "°C", 21.5);
        let sensor = classify("sys-1", "dev-1", &p);

        assert_eq!(sensor.unique_id, "myuplink_sys_1_dev_1_40004");
        assert_eq!(sensor.name, "Outdoor temperature (BT1)");
        assert_eq!(sensor.unit.as_deref(), Some("°C"));
        assert_eq!(sensor.device_class, Some(DeviceClass::Temperature));
        assert_eq!(sensor.state_class, Some(StateClass::Measurement));
        assert_eq!(sensor.entity_category, None);
        assert_eq!(sensor.state_value, "21.5");
    }

    #[test]
    fn classification_is_deterministic() {
        let p = parameter("40004", "Outdoor temperature (BT1)", "°C", 21.5);
        assert_eq!(classify("s", "d", &p), classify("s", "d", &p));
    }

    #[test]
    fn installation_date_ids_override_name_unit_and_formatting() {
        let p = parameter(
            "60720",
            "Text not found: id[60720], fw[noem-h], lang[en-US]",
            "",
            2019.0,
        );
        let sensor = classify("s", "d", &p);

        assert_eq!(sensor.name, "Installation year");
        assert_eq!(sensor.entity_category, Some(EntityCategory::Config));
        assert_eq!(sensor.state_value, "2019");
        assert_eq!(sensor.unit, None);
        assert_eq!(sensor.state_class, None);
    }

    #[test]
    fn unmapped_untranslated_labels_become_no_label() {
        let p = parameter(
            "61234",
            "Text not found: id[61234], fw[noem-h], lang[en-US]",
            "",
            1.0,
        );
        assert_eq!(classify("s", "d", &p).name, "No Label (61234)");
    }

    #[test]
    fn name_cleanup_strips_soft_hyphens_and_collapses_spaces() {
        assert_eq!(clean_name("Hot\u{00ad}water  charge\r\n"), "Hotwater charge");
        assert_eq!(clean_name("a\u{00a0}b"), "a b");
        assert_eq!(clean_name("  trimmed  "), "trimmed");
    }

    #[test]
    fn device_prefix_wrapper_is_stripped() {
        assert_eq!(strip_device_prefix("SAK (Set automatically)"), "Set automatically");
        assert_eq!(strip_device_prefix("SAK (SAK Operating mode)"), "Operating mode");
        // Not a wrapper: text after the closing parenthesis.
        assert_eq!(
            strip_device_prefix("Outdoor temperature (BT1) avg"),
            "Outdoor temperature (BT1) avg"
        );
        // Multi-word prefixes are real names, not device codes.
        assert_eq!(
            strip_device_prefix("Outdoor temperature (BT1)"),
            "Outdoor temperature (BT1)"
        );
    }

    #[test]
    fn unit_table_covers_every_documented_unit() {
        let cases = [
            ("°C", DeviceClass::Temperature),
            ("C", DeviceClass::Temperature),
            ("°F", DeviceClass::Temperature),
            ("F", DeviceClass::Temperature),
            ("kW", DeviceClass::Power),
            ("W", DeviceClass::Power),
            ("kWh", DeviceClass::Energy),
            ("Wh", DeviceClass::Energy),
            ("A", DeviceClass::Current),
            ("V", DeviceClass::Voltage),
            ("rh%", DeviceClass::Humidity),
            ("%", DeviceClass::Humidity),
            ("bar", DeviceClass::Pressure),
            ("Pa", DeviceClass::Pressure),
            ("hPa", DeviceClass::Pressure),
            ("Hz", DeviceClass::Frequency),
            ("l/m", DeviceClass::VolumeFlowRate),
            ("l/min", DeviceClass::VolumeFlowRate),
            ("l/hr", DeviceClass::VolumeFlowRate),
            ("m³/h", DeviceClass::VolumeFlowRate),
        ];
        for (unit, expected) in cases {
            assert_eq!(device_class("0", unit), Some(expected), "unit {unit}");
        }
        assert_eq!(device_class("0", "furlongs"), None);
    }

    #[test]
    fn id_override_beats_unit_lookup() {
        // 60433 is relative humidity even when the unit says nothing.
        assert_eq!(device_class("60433", ""), Some(DeviceClass::Humidity));
    }

    #[test]
    fn units_are_normalized() {
        let p = parameter("40013", "Room humidity", "rh%", 43.6);
        let sensor = classify("s", "d", &p);
        assert_eq!(sensor.unit.as_deref(), Some("%"));
        assert_eq!(sensor.device_class, Some(DeviceClass::Humidity));
        assert_eq!(sensor.state_value, "44");

        let p = parameter("40072", "Flow sensor (BF1)", "l/m", 12.0);
        assert_eq!(classify("s", "d", &p).unit.as_deref(), Some("l/hr"));
    }

    #[test]
    fn energy_units_get_total_increasing_state_class() {
        let p = parameter("44308", "Heating, compressor only", "kWh", 1234.5);
        let sensor = classify("s", "d", &p);
        assert_eq!(sensor.state_class, Some(StateClass::TotalIncreasing));
        assert_eq!(sensor.entity_category, None);
    }

    #[test]
    fn diagnostic_ids_and_keywords_mark_diagnostic_entities() {
        let p = parameter("43437", "Pump speed", "%", 60.0);
        assert_eq!(
            classify("s", "d", &p).entity_category,
            Some(EntityCategory::Diagnostic)
        );

        let p = parameter("40940", "Compressor starts", "", 812.0);
        assert_eq!(
            classify("s", "d", &p).entity_category,
            Some(EntityCategory::Diagnostic)
        );

        let p = parameter("40004", "Outdoor temperature (BT1)", "°C", 1.0);
        assert_eq!(classify("s", "d", &p).entity_category, None);
    }

    #[test]
    fn enumerated_parameters_publish_option_text() {
        let p: Parameter = serde_json::from_value(serde_json::json!({
            "parameterId": "49994",
            "parameterName": "Priority",
            "parameterUnit": "",
            "value": 30.0,
            "enumValues": [
                { "value": "10", "text": "Off" },
                { "value": "30", "text": "Heating" },
            ],
        }))
        .expect("parameter fixture");

        assert_eq!(classify("s", "d", &p).state_value, "Heating");
    }

    #[test]
    fn enum_without_matching_option_falls_back_to_raw_value() {
        let p: Parameter = serde_json::from_value(serde_json::json!({
            "parameterId": "49994",
            "parameterName": "Priority",
            "parameterUnit": "",
            "value": 99.0,
            "enumValues": [{ "value": "10", "text": "Off" }],
        }))
        .expect("parameter fixture");

        assert_eq!(classify("s", "d", &p).state_value, "99");
    }

    #[test]
    fn text_values_pass_through() {
        let p: Parameter = serde_json::from_value(serde_json::json!({
            "parameterId": "50000",
            "parameterName": "Status",
            "parameterUnit": "",
            "value": "active",
        }))
        .expect("parameter fixture");

        assert_eq!(classify("s", "d", &p).state_value, "active");
    }
}
