use serde_json::Value;
use std::collections::BTreeMap;
use crate::errors::ServiceKitError;
use crate::manifest::ServiceManifest;
use tracing::{debug, warn};

/// Merge submission parameters: manifest `value`, then the task's
/// `service_config`, then command-line overrides. Later sources win.
pub fn resolve_submission_params(
    manifest: &ServiceManifest,
    service_config: &BTreeMap<String, Value>,
    overrides: &[(String, String)],
) -> Result<BTreeMap<String, Value>, ServiceKitError> {
    let mut params = manifest.default_submission_values();

    for (name, value) in service_config {
        match manifest.submission_param(name) {
            Some(param) if !param.accepts(value) => {
                return Err(ServiceKitError::Input(format!(
                    "Task service_config value for '{}' is not a valid {}",
                    name,
                    param.param_type.as_str()
                )));
            }
            Some(_) => {}
            None => warn!(param = %name, "Task sets a submission parameter the manifest does not declare"),
        }
        params.insert(name.clone(), value.clone());
    }

    for (name, raw) in overrides {
        let param = manifest.submission_param(name).ok_or_else(|| {
            ServiceKitError::Input(format!("Unknown submission parameter: {}", name))
        })?;
        let value = param.coerce(raw).ok_or_else(|| {
            ServiceKitError::Input(format!(
                "Invalid value '{}' for {} parameter '{}'",
                raw,
                param.param_type.as_str(),
                name
            ))
        })?;
        debug!(param = %name, value = %value, "Submission parameter overridden");
        params.insert(name.clone(), value);
    }

    Ok(params)
}

/// Split a `key=value` argument.
pub fn parse_override(arg: &str) -> Result<(String, String), ServiceKitError> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(ServiceKitError::Input(format!(
            "Submission override must look like KEY=VALUE, got '{}'",
            arg
        ))),
    }
}
