use std::collections::BTreeSet;
use std::path::Path;
use crate::errors::ServiceKitError;
use super::filter::FileTypeFilter;
use super::schema::MANIFEST_SCHEMA;
use super::tag::{normalize_version, service_tag_from_env, substitute_service_tag};
use super::types::{DockerConfig, ParamType, ServiceManifest};
use tracing::debug;

const MAX_MANIFEST_BYTES: u64 = 1_048_576;

pub async fn parse_manifest(path: &Path) -> Result<ServiceManifest, ServiceKitError> {
    parse_manifest_file(path, &service_tag_from_env()).await
}

/// Read and validate a manifest file with an explicit `$SERVICE_TAG` value.
pub async fn parse_manifest_file(path: &Path, service_tag: &str) -> Result<ServiceManifest, ServiceKitError> {
    if !path.is_file() {
        return Err(ServiceKitError::Input(format!(
            "Service manifest not found: {}",
            path.display()
        )));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_MANIFEST_BYTES {
        return Err(ServiceKitError::Schema("Service manifest exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let manifest = parse_manifest_with_tag(&content, service_tag)?;
    debug!(path = %path.display(), service = %manifest.name, "Loaded service manifest");
    Ok(manifest)
}

/// Parse manifest text, substituting `$SERVICE_TAG` from the environment.
pub fn parse_manifest_str(content: &str) -> Result<ServiceManifest, ServiceKitError> {
    parse_manifest_with_tag(content, &service_tag_from_env())
}

pub fn parse_manifest_with_tag(content: &str, service_tag: &str) -> Result<ServiceManifest, ServiceKitError> {
    let content = substitute_service_tag(content, service_tag);
    let mut yaml: serde_yaml::Value = serde_yaml::from_str(&content)
        .map_err(|e| ServiceKitError::Schema(format!("Manifest is not valid YAML: {}", e)))?;

    if yaml.is_null() {
        return Err(ServiceKitError::Schema("Service manifest is empty".into()));
    }

    normalize_version(&mut yaml);

    // Structural validation against the JSON schema
    validate_schema(&yaml)?;

    // Parse into typed manifest
    let manifest: ServiceManifest = serde_yaml::from_value(yaml)
        .map_err(|e| ServiceKitError::Schema(format!("Invalid service manifest: {}", e)))?;

    validate_semantics(&manifest)?;

    Ok(manifest)
}

/// Serialize a manifest back to YAML.
pub fn manifest_to_yaml(manifest: &ServiceManifest) -> Result<String, ServiceKitError> {
    Ok(serde_yaml::to_string(manifest)?)
}

/// Validate the raw document against the JSON schema. Every violation is
/// reported, not only the first.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), ServiceKitError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| ServiceKitError::Schema(format!("Manifest conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&MANIFEST_SCHEMA)
        .map_err(|e| ServiceKitError::Internal(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        let messages: Vec<String> = errors
            .map(|e| {
                let at = e.instance_path.to_string();
                if at.is_empty() {
                    e.to_string()
                } else {
                    format!("{} at {}", e, at)
                }
            })
            .collect();
        if !messages.is_empty() {
            return Err(ServiceKitError::Schema(messages.join("; ")));
        }
    }

    Ok(())
}

/// Invariants the schema cannot express.
fn validate_semantics(manifest: &ServiceManifest) -> Result<(), ServiceKitError> {
    let mut problems = Vec::new();

    let mut seen = BTreeSet::new();
    for heuristic in &manifest.heuristics {
        if !seen.insert(heuristic.heur_id) {
            problems.push(format!("duplicate heur_id {}", heuristic.heur_id));
        }
    }

    let mut names = BTreeSet::new();
    for param in &manifest.submission_params {
        if !names.insert(param.name.as_str()) {
            problems.push(format!("duplicate submission parameter '{}'", param.name));
        }
        if param.param_type == ParamType::List && param.list.as_ref().map_or(true, |l| l.is_empty()) {
            problems.push(format!("submission parameter '{}' of type list has no choices", param.name));
            continue;
        }
        if !param.accepts(&param.default) {
            problems.push(format!(
                "submission parameter '{}' default {} is not a valid {}",
                param.name, param.default, param.param_type
            ));
        }
        if !param.accepts(&param.value) {
            problems.push(format!(
                "submission parameter '{}' value {} is not a valid {}",
                param.name, param.value, param.param_type
            ));
        }
    }

    if let Err(e) = FileTypeFilter::from_manifest(manifest) {
        problems.push(e.to_string().trim_start_matches("Schema error: ").to_string());
    }

    check_docker_config("docker_config", &manifest.docker_config, &mut problems);

    if let Some(update) = &manifest.update_config {
        let mut sources = BTreeSet::new();
        for source in &update.sources {
            if !sources.insert(source.name.as_str()) {
                problems.push(format!("duplicate update source '{}'", source.name));
            }
        }
        if let Some(run_options) = &update.run_options {
            check_docker_config("update_config.run_options", run_options, &mut problems);
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ServiceKitError::Schema(problems.join("; ")))
    }
}

fn check_docker_config(path: &str, docker: &DockerConfig, problems: &mut Vec<String>) {
    if !(docker.cpu_cores > 0.0) {
        problems.push(format!("{}.cpu_cores must be positive", path));
    }
    if docker.ram_mb_min > docker.ram_mb {
        problems.push(format!(
            "{}.ram_mb_min ({}) exceeds ram_mb ({})",
            path, docker.ram_mb_min, docker.ram_mb
        ));
    }
}
