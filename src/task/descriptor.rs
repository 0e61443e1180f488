use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use crate::errors::ServiceKitError;

/// Contents of `task.json`: the file to analyze and the submission-level
/// inputs that accompany it. Read once per run and never modified.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskDescriptor {
    #[serde(default = "new_sid")]
    pub sid: String,
    /// Target file, relative to the input directory.
    pub filename: String,
    #[serde(default = "default_file_type")]
    pub file_type: String,
    /// Submission parameter overrides, keyed by parameter name.
    #[serde(default)]
    pub service_config: BTreeMap<String, Value>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub temporary_submission_data: BTreeMap<String, Value>,
    #[serde(default)]
    pub deep_scan: bool,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Days the result is kept before expiry.
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub depth: u32,
}

impl TaskDescriptor {
    /// When a result created at `created` expires.
    pub fn expiry_after(&self, created: DateTime<Utc>) -> Result<DateTime<Utc>, ServiceKitError> {
        chrono::Duration::try_days(i64::from(self.ttl))
            .and_then(|ttl| created.checked_add_signed(ttl))
            .ok_or_else(|| ServiceKitError::Input(format!("Task ttl of {} days is out of range", self.ttl)))
    }
}

fn new_sid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn default_file_type() -> String {
    "unknown".to_string()
}

fn default_max_files() -> usize {
    501
}

fn default_ttl() -> u32 {
    30
}

/// Identity of the target file as computed by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub sha256: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_task_gets_defaults() {
        let task: TaskDescriptor = serde_json::from_str(r#"{"filename": "sample.exe"}"#).unwrap();
        assert_eq!(task.filename, "sample.exe");
        assert_eq!(task.file_type, "unknown");
        assert_eq!(task.max_files, 501);
        assert_eq!(task.ttl, 30);
        assert_eq!(task.sid.len(), 32);
        assert!(task.service_config.is_empty());
    }

    #[test]
    fn test_expiry_after_ttl() {
        let task: TaskDescriptor = serde_json::from_str(r#"{"filename": "a.bin", "ttl": 2}"#).unwrap();
        let created = Utc::now();
        assert_eq!(task.expiry_after(created).unwrap(), created + chrono::Duration::days(2));
    }

    #[test]
    fn test_huge_ttl_is_input_error() {
        let task: TaskDescriptor =
            serde_json::from_str(r#"{"filename": "a.bin", "ttl": 4294967295}"#).unwrap();
        let err = task.expiry_after(Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceKitError::Input(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_explicit_sid_kept() {
        let task: TaskDescriptor =
            serde_json::from_str(r#"{"sid": "abc123", "filename": "a.bin"}"#).unwrap();
        assert_eq!(task.sid, "abc123");
    }

    #[test]
    fn test_missing_filename_rejected() {
        assert!(serde_json::from_str::<TaskDescriptor>(r#"{"sid": "abc"}"#).is_err());
    }

    #[test]
    fn test_overrides_and_tags() {
        let task: TaskDescriptor = serde_json::from_str(
            r#"{
                "filename": "doc.docx",
                "file_type": "document/office/word",
                "service_config": {"extract_all": true},
                "tags": {"network.static.domain": ["example.com"]}
            }"#,
        )
        .unwrap();
        assert_eq!(task.service_config["extract_all"], serde_json::json!(true));
        assert_eq!(task.tags["network.static.domain"], vec!["example.com".to_string()]);
    }
}
