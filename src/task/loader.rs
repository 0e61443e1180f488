use std::path::{Component, Path, PathBuf};
use crate::errors::ServiceKitError;
use crate::utils::digest::sha256_file;
use crate::utils::formatting::format_size;
use super::descriptor::{FileInfo, TaskDescriptor};
use tracing::{debug, info};

pub const TASK_FILE_NAME: &str = "task.json";

/// A task read from an input directory, with the target file located and
/// fingerprinted.
#[derive(Debug, Clone)]
pub struct LoadedTask {
    pub descriptor: TaskDescriptor,
    pub file_path: PathBuf,
    pub file_info: FileInfo,
}

/// Read `task.json` and locate its target file. Every failure here is an
/// input problem: nothing has been started yet.
pub async fn load_task(input_dir: &Path) -> Result<LoadedTask, ServiceKitError> {
    if !input_dir.is_dir() {
        return Err(ServiceKitError::Input(format!(
            "Input directory not found: {}",
            input_dir.display()
        )));
    }

    let task_path = input_dir.join(TASK_FILE_NAME);
    if !task_path.is_file() {
        return Err(ServiceKitError::Input(format!(
            "No '{}' found in {}",
            TASK_FILE_NAME,
            input_dir.display()
        )));
    }

    let content = tokio::fs::read_to_string(&task_path).await?;
    let descriptor: TaskDescriptor = serde_json::from_str(&content)
        .map_err(|e| ServiceKitError::Input(format!("Invalid {}: {}", TASK_FILE_NAME, e)))?;

    check_relative_filename(&descriptor.filename)?;
    descriptor.expiry_after(chrono::Utc::now())?;

    let file_path = input_dir.join(&descriptor.filename);
    if !file_path.is_file() {
        return Err(ServiceKitError::Input(format!(
            "Target file not found: {}",
            file_path.display()
        )));
    }

    let (sha256, size) = sha256_file(&file_path).await?;
    debug!(sid = %descriptor.sid, sha256 = %sha256, size = %format_size(size), "Fingerprinted target file");
    info!(sid = %descriptor.sid, file = %descriptor.filename, "Task loaded");

    let file_info = FileInfo {
        sha256,
        size,
        file_type: descriptor.file_type.clone(),
    };

    Ok(LoadedTask { descriptor, file_path, file_info })
}

/// The target must live inside the input directory.
fn check_relative_filename(filename: &str) -> Result<(), ServiceKitError> {
    if filename.trim().is_empty() {
        return Err(ServiceKitError::Input("Task filename is empty".into()));
    }
    let escapes = Path::new(filename)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ServiceKitError::Input(format!(
            "Task filename must be relative to the input directory: {}",
            filename
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_load_task_and_target() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sample.bin"), b"abc").unwrap();
        fs::write(
            dir.path().join(TASK_FILE_NAME),
            r#"{"sid": "s1", "filename": "sample.bin", "file_type": "unknown"}"#,
        )
        .unwrap();

        let task = load_task(dir.path()).await.unwrap();
        assert_eq!(task.descriptor.sid, "s1");
        assert_eq!(task.file_info.size, 3);
        assert_eq!(task.file_path, dir.path().join("sample.bin"));
    }

    #[tokio::test]
    async fn test_missing_task_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sample.bin"), b"abc").unwrap();
        let err = load_task(dir.path()).await.unwrap_err();
        assert!(matches!(err, ServiceKitError::Input(_)));
        assert!(err.to_string().contains("task.json"));
    }

    #[tokio::test]
    async fn test_missing_target_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TASK_FILE_NAME), r#"{"filename": "gone.bin"}"#).unwrap();
        let err = load_task(dir.path()).await.unwrap_err();
        assert!(matches!(err, ServiceKitError::Input(_)));
        assert!(err.to_string().contains("gone.bin"));
    }

    #[tokio::test]
    async fn test_malformed_task_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TASK_FILE_NAME), "{not json").unwrap();
        assert!(matches!(load_task(dir.path()).await, Err(ServiceKitError::Input(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sample.bin"), b"abc").unwrap();
        fs::write(
            dir.path().join(TASK_FILE_NAME),
            r#"{"filename": "sample.bin", "ttl": 4294967295}"#,
        )
        .unwrap();
        let err = load_task(dir.path()).await.unwrap_err();
        assert!(matches!(err, ServiceKitError::Input(_)));
        assert!(err.to_string().contains("ttl"));
    }

    #[tokio::test]
    async fn test_missing_input_dir() {
        let err = load_task(Path::new("/nonexistent/input")).await.unwrap_err();
        assert!(matches!(err, ServiceKitError::Input(_)));
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(check_relative_filename("../outside.bin").is_err());
        assert!(check_relative_filename("/etc/passwd").is_err());
        assert!(check_relative_filename("  ").is_err());
        assert!(check_relative_filename("nested/inside.bin").is_ok());
        assert!(check_relative_filename("./inside.bin").is_ok());
    }
}
