use regex::Regex;
use crate::errors::ServiceKitError;
use super::types::ServiceManifest;

/// Compiled `accepts`/`rejects` pair. Patterns match from the start of the
/// file type, the same way the dispatcher routes files to services.
#[derive(Debug, Clone)]
pub struct FileTypeFilter {
    accepts: Regex,
    rejects: Regex,
}

impl FileTypeFilter {
    pub fn new(accepts: &str, rejects: &str) -> Result<Self, ServiceKitError> {
        Ok(Self {
            accepts: compile_anchored("accepts", accepts)?,
            rejects: compile_anchored("rejects", rejects)?,
        })
    }

    pub fn from_manifest(manifest: &ServiceManifest) -> Result<Self, ServiceKitError> {
        Self::new(&manifest.accepts, &manifest.rejects)
    }

    pub fn matches(&self, file_type: &str) -> bool {
        self.accepts.is_match(file_type) && !self.rejects.is_match(file_type)
    }
}

fn compile_anchored(field: &str, pattern: &str) -> Result<Regex, ServiceKitError> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
        ServiceKitError::Schema(format!("'{}' is not a valid regular expression: {}", field, e))
    })
}
