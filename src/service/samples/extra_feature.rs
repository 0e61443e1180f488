use async_trait::async_trait;
use serde::Serialize;
use crate::errors::ServiceKitError;
use crate::result::{BodyFormat, ResultSection, ServiceResult};
use crate::service::{AnalysisService, ServiceRequest};

/// Echoes the submission context it was handed: tags from other services,
/// submission metadata and temporary submission data.
#[derive(Debug, Default)]
pub struct ExtraFeature;

fn dump_section<T: Serialize>(title: &str, value: &T) -> Result<ResultSection, ServiceKitError> {
    let mut section = ResultSection::new(title);
    section.set_body(serde_json::to_string_pretty(value)?, BodyFormat::MemoryDump);
    Ok(section)
}

#[async_trait]
impl AnalysisService for ExtraFeature {
    async fn execute(&self, request: &mut ServiceRequest) -> Result<(), ServiceKitError> {
        let mut result = ServiceResult::new();
        result.add_section(dump_section("Tags generated from other services", request.tags())?);
        result.add_section(dump_section("Metadata provided during submission", request.metadata())?);
        result.add_section(dump_section("Temporary submission data", request.temp_submission_data())?);
        request.set_result(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{FileInfo, TaskDescriptor};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_dumps_submission_context() {
        let dir = tempfile::tempdir().unwrap();
        let task: TaskDescriptor = serde_json::from_value(json!({
            "filename": "sample.bin",
            "tags": {"network.static.domain": ["example.com"]},
            "metadata": {"submitter": "analyst"},
        }))
        .unwrap();
        let info = FileInfo { sha256: "00".into(), size: 1, file_type: "unknown".into() };
        let mut request = ServiceRequest::new(
            task,
            dir.path().join("sample.bin"),
            info,
            BTreeMap::new(),
            dir.path().to_path_buf(),
        );

        ExtraFeature.execute(&mut request).await.unwrap();

        let sections = request.result().unwrap().sections();
        assert_eq!(sections.len(), 3);
        assert!(sections[0].body().unwrap().contains("example.com"));
        assert!(sections[1].body().unwrap().contains("analyst"));
        assert_eq!(sections[2].body(), Some("{}"));
        assert_eq!(sections[2].body_format(), BodyFormat::MemoryDump);
    }
}
