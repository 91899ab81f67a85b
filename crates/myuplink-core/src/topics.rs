// MQTT topic layout and identifier sanitization.
//
// State:        {base_topic}/{system_id}_{device_id}/{parameter_id}/value
// Availability: {base_topic}/{system_id}_{device_id}/available
// Discovery:    {discovery_prefix}/sensor/{unique_id}/config
//
// unique_id is derived deterministically from (system_id, device_id,
// parameter_id) and must be stable across cycles and restarts.

/// Sanitize a raw identifier for use in topics and entity ids: lowercase
/// alphanumerics and underscores only, no consecutive or trailing
/// underscores.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = true; // suppress leading underscore
    for c in name.chars() {
        let mapped = if c.is_ascii_alphanumeric() {
            Some(c.to_ascii_lowercase())
        } else if c == ' ' || c == '_' || c == '-' {
            Some('_')
        } else {
            None
        };
        match mapped {
            Some('_') if last_underscore => {}
            Some('_') => {
                out.push('_');
                last_underscore = true;
            }
            Some(c) => {
                out.push(c);
                last_underscore = false;
            }
            None => {}
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Stable entity identifier: `myuplink_{system}_{device}_{parameter}`.
pub fn unique_id(system_id: &str, device_id: &str, parameter_id: &str) -> String {
    sanitize(&format!("myuplink_{system_id}_{device_id}_{parameter_id}"))
}

pub fn state_topic(base_topic: &str, system_id: &str, device_id: &str, parameter_id: &str) -> String {
    format!("{base_topic}/{system_id}_{device_id}/{parameter_id}/value")
}

pub fn availability_topic(base_topic: &str, system_id: &str, device_id: &str) -> String {
    format!("{base_topic}/{system_id}_{device_id}/available")
}

pub fn discovery_topic(discovery_prefix: &str, unique_id: &str) -> String {
    format!("{discovery_prefix}/sensor/{unique_id}/config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_and_lowercases() {
        assert_eq!(sanitize("Outdoor Temp (BT1)"), "outdoor_temp_bt1");
        assert_eq!(sanitize("a--b  c"), "a_b_c");
        assert_eq!(sanitize("_trailing_"), "trailing");
    }

    #[test]
    fn unique_id_is_stable_and_sanitized() {
        let a = unique_id("Sys-1", "Dev 2", "40004");
        let b = unique_id("Sys-1", "Dev 2", "40004");
        assert_eq!(a, b);
        assert_eq!(a, "myuplink_sys_1_dev_2_40004");
    }

    #[test]
    fn topic_layout() {
        assert_eq!(
            state_topic("myuplink", "s1", "d1", "40004"),
            "myuplink/s1_d1/40004/value"
        );
        assert_eq!(availability_topic("myuplink", "s1", "d1"), "myuplink/s1_d1/available");
        assert_eq!(
            discovery_topic("homeassistant", "myuplink_s1_d1_40004"),
            "homeassistant/sensor/myuplink_s1_d1_40004/config"
        );
    }
}
