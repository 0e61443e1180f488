use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use crate::errors::ServiceKitError;
use crate::result::{FileRef, ServiceResult};
use crate::task::{FileInfo, TaskDescriptor};
use crate::utils::digest::sha256_file;
use tracing::info;

/// Everything a service sees while processing one file, and the place it
/// leaves its output.
#[derive(Debug)]
pub struct ServiceRequest {
    task: TaskDescriptor,
    file_path: PathBuf,
    file_info: FileInfo,
    params: BTreeMap<String, Value>,
    working_directory: PathBuf,
    extracted: Vec<FileRef>,
    supplementary: Vec<FileRef>,
    result: Option<ServiceResult>,
    drop_file: bool,
    service_context: Option<String>,
}

impl ServiceRequest {
    pub fn new(
        task: TaskDescriptor,
        file_path: PathBuf,
        file_info: FileInfo,
        params: BTreeMap<String, Value>,
        working_directory: PathBuf,
    ) -> Self {
        Self {
            task,
            file_path,
            file_info,
            params,
            working_directory,
            extracted: Vec::new(),
            supplementary: Vec::new(),
            result: None,
            drop_file: false,
            service_context: None,
        }
    }

    pub fn sid(&self) -> &str {
        &self.task.sid
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn file_name(&self) -> &str {
        &self.task.filename
    }

    pub fn file_type(&self) -> &str {
        &self.file_info.file_type
    }

    pub fn sha256(&self) -> &str {
        &self.file_info.sha256
    }

    pub fn file_size(&self) -> u64 {
        self.file_info.size
    }

    pub fn deep_scan(&self) -> bool {
        self.task.deep_scan
    }

    pub fn tags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.task.tags
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.task.metadata
    }

    pub fn temp_submission_data(&self) -> &BTreeMap<String, Value> {
        &self.task.temporary_submission_data
    }

    /// Scratch directory for files the service produces.
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Resolved submission parameter value.
    pub fn get_param(&self, name: &str) -> Result<&Value, ServiceKitError> {
        self.params
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ServiceKitError::Service(format!("Service submission parameter not found: {}", name)))
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub async fn read_file(&self) -> Result<Vec<u8>, ServiceKitError> {
        Ok(tokio::fs::read(&self.file_path).await?)
    }

    /// Queue a file for further analysis. Returns `false` when the file is
    /// empty and was ignored.
    pub async fn add_extracted(
        &mut self,
        path: &Path,
        name: &str,
        description: &str,
    ) -> Result<bool, ServiceKitError> {
        let max_extracted = self.task.max_files;
        if max_extracted > 0 && self.extracted.len() >= max_extracted {
            return Err(ServiceKitError::Service(format!(
                "Maximum number of extracted files exceeded ({})",
                max_extracted
            )));
        }

        match self.file_ref(path, name, description).await? {
            Some(file) => {
                self.extracted.push(file);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Attach a file for the analyst without re-analysing it.
    pub async fn add_supplementary(
        &mut self,
        path: &Path,
        name: &str,
        description: &str,
    ) -> Result<bool, ServiceKitError> {
        match self.file_ref(path, name, description).await? {
            Some(file) => {
                self.supplementary.push(file);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn file_ref(
        &self,
        path: &Path,
        name: &str,
        description: &str,
    ) -> Result<Option<FileRef>, ServiceKitError> {
        if path.as_os_str().is_empty() {
            return Err(ServiceKitError::Service("Path cannot be empty".into()));
        }
        if name.is_empty() {
            return Err(ServiceKitError::Service("Name cannot be empty".into()));
        }
        if description.is_empty() {
            return Err(ServiceKitError::Service("Description cannot be empty".into()));
        }

        let (sha256, size) = sha256_file(path).await.map_err(|e| {
            ServiceKitError::Service(format!("Cannot read output file {}: {}", path.display(), e))
        })?;
        if size == 0 {
            info!(name, "Adding empty extracted or supplementary files is not allowed, ignored");
            return Ok(None);
        }

        Ok(Some(FileRef {
            name: name.to_string(),
            sha256,
            description: description.to_string(),
            path: path.to_path_buf(),
            is_section_image: false,
            allow_dynamic_recursion: false,
            parent_relation: "EXTRACTED".to_string(),
        }))
    }

    pub fn extracted(&self) -> &[FileRef] {
        &self.extracted
    }

    pub fn supplementary(&self) -> &[FileRef] {
        &self.supplementary
    }

    pub fn set_result(&mut self, result: ServiceResult) {
        self.result = Some(result);
    }

    pub fn result(&self) -> Option<&ServiceResult> {
        self.result.as_ref()
    }

    /// Tell the platform not to pass the file to later stages.
    pub fn drop_file(&mut self) {
        self.drop_file = true;
    }

    pub fn set_service_context(&mut self, context: impl Into<String>) {
        self.service_context = Some(context.into());
    }

    pub(crate) fn into_parts(self) -> RequestOutput {
        RequestOutput {
            task: self.task,
            file_info: self.file_info,
            result: self.result,
            extracted: self.extracted,
            supplementary: self.supplementary,
            drop_file: self.drop_file,
            service_context: self.service_context,
        }
    }
}

/// What is left of a request once the service has returned.
#[derive(Debug)]
pub(crate) struct RequestOutput {
    pub task: TaskDescriptor,
    pub file_info: FileInfo,
    pub result: Option<ServiceResult>,
    pub extracted: Vec<FileRef>,
    pub supplementary: Vec<FileRef>,
    pub drop_file: bool,
    pub service_context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(dir: &Path, max_files: usize) -> ServiceRequest {
        let task: TaskDescriptor = serde_json::from_value(json!({
            "sid": "sid-1",
            "filename": "sample.bin",
            "max_files": max_files,
        }))
        .unwrap();
        let info = FileInfo { sha256: "00".into(), size: 3, file_type: "unknown".into() };
        let params = BTreeMap::from([("extract_all".to_string(), json!(true))]);
        ServiceRequest::new(task, dir.join("sample.bin"), info, params, dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_add_extracted_records_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("child.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut req = request(dir.path(), 10);
        assert!(req.add_extracted(&path, "child.bin", "Embedded file").await.unwrap());
        assert_eq!(req.extracted().len(), 1);
        assert!(req.extracted()[0].sha256.starts_with("ba7816bf"));
    }

    #[tokio::test]
    async fn test_empty_file_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let mut req = request(dir.path(), 10);
        assert!(!req.add_supplementary(&path, "empty.bin", "Nothing").await.unwrap());
        assert!(req.supplementary().is_empty());
    }

    #[tokio::test]
    async fn test_max_extracted_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("child.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut req = request(dir.path(), 1);
        req.add_extracted(&path, "one", "first").await.unwrap();
        let err = req.add_extracted(&path, "two", "second").await.unwrap_err();
        assert!(matches!(err, ServiceKitError::Service(_)));
    }

    #[tokio::test]
    async fn test_description_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("child.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut req = request(dir.path(), 10);
        assert!(req.add_extracted(&path, "child", "").await.is_err());
    }

    #[test]
    fn test_get_param() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path(), 10);
        assert_eq!(req.get_param("extract_all").unwrap(), &json!(true));
        assert!(req.get_param("missing").is_err());
    }
}
