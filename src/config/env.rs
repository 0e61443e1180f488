use std::path::PathBuf;
use crate::manifest::tag::DEFAULT_SERVICE_TAG;

/// Environment the container tooling hands to a service. Values are passed
/// through to the service context; only `SERVICE_MANIFEST_PATH` and
/// `SERVICE_TAG` change what this crate does.
#[derive(Clone)]
pub struct RuntimeEnv {
    pub service_path: Option<String>,
    pub service_api_host: Option<String>,
    pub service_api_key: Option<String>,
    pub container_mode: Option<String>,
    pub service_manifest_path: Option<PathBuf>,
    pub service_tag: String,
}

impl RuntimeEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            service_path: get("SERVICE_PATH"),
            service_api_host: get("SERVICE_API_HOST"),
            service_api_key: get("SERVICE_API_KEY"),
            container_mode: get("CONTAINER_MODE"),
            service_manifest_path: get("SERVICE_MANIFEST_PATH").map(PathBuf::from),
            service_tag: get("SERVICE_TAG").unwrap_or_else(|| DEFAULT_SERVICE_TAG.to_string()),
        }
    }
}

impl Default for RuntimeEnv {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl std::fmt::Debug for RuntimeEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeEnv")
            .field("service_path", &self.service_path)
            .field("service_api_host", &self.service_api_host)
            .field("service_api_key", &self.service_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("container_mode", &self.container_mode)
            .field("service_manifest_path", &self.service_manifest_path)
            .field("service_tag", &self.service_tag)
            .finish()
    }
}
