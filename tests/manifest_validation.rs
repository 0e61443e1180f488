use al_service::manifest::{
    manifest_to_yaml, parse_manifest, parse_manifest_file, parse_manifest_with_tag, Category, FileTypeFilter,
    ParamType, Stage,
};
use al_service::ServiceKitError;
use std::fs;
use tempfile::TempDir;

const FULL_MANIFEST: &str = r#"
name: Extract
version: $SERVICE_TAG
description: Extracts embedded files from archives
accepts: archive/.*|executable/windows
rejects: empty|metadata/.*|archive/audiovisual/flash
stage: EXTRACT
category: Extraction
file_required: true
timeout: 90
licence_count: 0
config:
  default_pw_list: [password, infected]
  named_attachments_only: false
submission_params:
  - name: password
    type: str
    default: ""
    value: ""
  - name: extract_executable_sections
    type: bool
    default: false
    value: false
heuristics:
  - heur_id: 1
    name: Password protected
    score: 0
    filetype: archive
    attack_id: T1027
  - heur_id: 2
    name: Too many files
    score: 500
    max_score: 1000
    signature_score_map:
      zip_bomb: 1000
docker_config:
  image: ${REGISTRY}cccs/assemblyline-service-extract:$SERVICE_TAG
  cpu_cores: 1.5
  ram_mb: 1024
  ram_mb_min: 256
  environment:
    - name: EXTRACT_LOG_LEVEL
      value: INFO
update_config:
  method: run
  update_interval_seconds: 86400
  generates_signatures: false
  sources:
    - uri: https://example.com/passwords.txt
      name: passwords
"#;

fn write(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("service_manifest.yml");
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_full_manifest_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, FULL_MANIFEST);

    let manifest = parse_manifest_file(&path, "4.5.1.stable7").await.unwrap();
    assert_eq!(manifest.name, "Extract");
    assert_eq!(manifest.version, "4.5.1.7");
    assert_eq!(manifest.stage, Stage::Extract);
    assert_eq!(manifest.category, Category::Extraction);
    assert_eq!(manifest.timeout, 90);
    assert_eq!(manifest.docker_config.image, "${REGISTRY}cccs/assemblyline-service-extract:4.5.1.stable7");
    assert_eq!(manifest.submission_params[1].param_type, ParamType::Bool);
    assert_eq!(manifest.heuristic(1).unwrap().attack_id, vec!["T1027".to_string()]);
    assert_eq!(manifest.heuristic(2).unwrap().signature_score_map["zip_bomb"], 1000);
    assert_eq!(manifest.config["default_pw_list"][1], "infected");
    assert_eq!(manifest.update_config.as_ref().unwrap().sources.len(), 1);

    let filter = FileTypeFilter::from_manifest(&manifest).unwrap();
    assert!(filter.matches("archive/zip"));
    assert!(!filter.matches("archive/audiovisual/flash"));
    assert!(!filter.matches("document/pdf"));
}

#[tokio::test]
async fn test_normalized_yaml_parses_back_to_same_manifest() {
    let manifest = parse_manifest_with_tag(FULL_MANIFEST, "4.5.1.0").unwrap();
    let yaml = manifest_to_yaml(&manifest).unwrap();
    assert_eq!(parse_manifest_with_tag(&yaml, "unused").unwrap(), manifest);
}

#[tokio::test]
async fn test_schema_errors_exit_with_code_2() {
    let cases = [
        FULL_MANIFEST.replace("name: Extract\n", ""),
        FULL_MANIFEST.replace("stage: EXTRACT", "stage: LATE"),
        FULL_MANIFEST.replace("heur_id: 2", "heur_id: 1"),
        FULL_MANIFEST.replace("timeout: 90", "timeout: 0"),
        FULL_MANIFEST.replace("name: passwords", "name: passwords\n    - uri: https://example.org/x\n      name: passwords"),
    ];
    for case in cases {
        let err = parse_manifest_with_tag(&case, "1.0").unwrap_err();
        assert!(matches!(err, ServiceKitError::Schema(_)), "unexpected: {}", err);
        assert_eq!(err.exit_code(), 2);
    }
}

#[tokio::test]
async fn test_duplicate_heuristic_named_in_error() {
    let text = FULL_MANIFEST.replace("heur_id: 2", "heur_id: 1");
    let err = parse_manifest_with_tag(&text, "1.0").unwrap_err();
    assert!(err.to_string().contains("duplicate heur_id 1"));
}

#[tokio::test]
async fn test_missing_manifest_file_is_input_error() {
    let dir = TempDir::new().unwrap();
    let err = parse_manifest(&dir.path().join("service_manifest.yml")).await.unwrap_err();
    assert!(matches!(err, ServiceKitError::Input(_)));
}

#[tokio::test]
async fn test_oversized_manifest_rejected() {
    let dir = TempDir::new().unwrap();
    let padding = format!("# {}\n", "x".repeat(1024));
    let content = format!("{}{}", FULL_MANIFEST, padding.repeat(1100));
    let path = write(&dir, &content);

    let err = parse_manifest(&path).await.unwrap_err();
    assert!(matches!(err, ServiceKitError::Schema(_)));
}

#[tokio::test]
async fn test_bundled_demo_manifests_are_valid() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    for service in ["result_sample", "extra_feature"] {
        let path = demos.join(service).join("service_manifest.yml");
        let manifest = parse_manifest_file(&path, "4.5.0.stable0").await.unwrap();
        assert_eq!(manifest.version, "4.5.0.0");
    }
}
