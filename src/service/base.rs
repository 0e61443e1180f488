use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use crate::config::RuntimeEnv;
use crate::errors::ServiceKitError;
use crate::manifest::ServiceManifest;
use super::request::ServiceRequest;

/// What a service is constructed with.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub manifest: Arc<ServiceManifest>,
    /// Manifest `config`, opaque to the runner.
    pub config: BTreeMap<String, Value>,
    pub runtime: RuntimeEnv,
}

impl ServiceContext {
    pub fn new(manifest: Arc<ServiceManifest>, runtime: RuntimeEnv) -> Self {
        let config = manifest.config.clone();
        Self { manifest, config, runtime }
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }
}

/// A file-analysis service. `execute` is called once per file. The runner
/// drives `start` and `execute` on a blocking thread, so both may block; a
/// call that outlives the manifest timeout is abandoned.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Warm-up before the first file.
    async fn start(&mut self) -> Result<(), ServiceKitError> {
        Ok(())
    }

    async fn execute(&self, request: &mut ServiceRequest) -> Result<(), ServiceKitError>;

    async fn stop(&mut self) -> Result<(), ServiceKitError> {
        Ok(())
    }

    /// Version of the underlying tool or signature set, if any.
    fn tool_version(&self) -> Option<String> {
        None
    }
}
