//! `$SERVICE_TAG` handling for manifest text.
//!
//! Service manifests are templated by the container build: the literal
//! `$SERVICE_TAG` is replaced by the image tag, and the `stable` channel
//! marker is dropped from the resulting version string.

const TAG_PLACEHOLDER: &str = "$SERVICE_TAG";
pub const DEFAULT_SERVICE_TAG: &str = "4.0.0.dev0";

/// Tag taken from the `SERVICE_TAG` environment variable, or the dev default.
pub fn service_tag_from_env() -> String {
    std::env::var("SERVICE_TAG")
        .ok()
        .filter(|tag| !tag.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVICE_TAG.to_string())
}

pub fn substitute_service_tag(content: &str, tag: &str) -> String {
    content.replace(TAG_PLACEHOLDER, tag)
}

/// Normalize the `version` key in place: numbers become strings and the
/// `stable` marker is removed.
pub fn normalize_version(yaml: &mut serde_yaml::Value) {
    let Some(map) = yaml.as_mapping_mut() else {
        return;
    };
    let key = serde_yaml::Value::String("version".to_string());
    let normalized = match map.get(&key) {
        Some(serde_yaml::Value::String(s)) => s.replace("stable", ""),
        Some(serde_yaml::Value::Number(n)) => n.to_string(),
        _ => return,
    };
    map.insert(key, serde_yaml::Value::String(normalized));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_replaced_everywhere() {
        let text = "version: $SERVICE_TAG\ndocker_config:\n  image: svc:$SERVICE_TAG\n";
        let out = substitute_service_tag(text, "4.5.1.stable3");
        assert_eq!(out, "version: 4.5.1.stable3\ndocker_config:\n  image: svc:4.5.1.stable3\n");
    }

    #[test]
    fn test_text_without_placeholder_untouched() {
        let text = "name: Sample\nversion: 1.0";
        assert_eq!(substitute_service_tag(text, "x"), text);
    }

    #[test]
    fn test_stable_removed_from_version() {
        let mut yaml: serde_yaml::Value = serde_yaml::from_str("version: 4.5.1.stable3").unwrap();
        normalize_version(&mut yaml);
        assert_eq!(yaml["version"].as_str(), Some("4.5.1.3"));
    }

    #[test]
    fn test_numeric_version_becomes_string() {
        let mut yaml: serde_yaml::Value = serde_yaml::from_str("version: 4.5").unwrap();
        normalize_version(&mut yaml);
        assert_eq!(yaml["version"].as_str(), Some("4.5"));
    }

    #[test]
    fn test_missing_version_left_alone() {
        let mut yaml: serde_yaml::Value = serde_yaml::from_str("name: Sample").unwrap();
        normalize_version(&mut yaml);
        assert!(yaml.get("version").is_none());
    }
}
