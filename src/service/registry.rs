use std::collections::BTreeMap;
use std::sync::Arc;
use crate::errors::ServiceKitError;
use super::base::{AnalysisService, ServiceContext};
use super::samples::{ExtraFeature, ResultSample};

pub type ServiceFactory = Arc<dyn Fn(&ServiceContext) -> Box<dyn AnalysisService> + Send + Sync>;

/// Maps dotted service paths (`module.ClassName`) to constructors.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    factories: BTreeMap<String, ServiceFactory>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the bundled sample services.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("result_sample.ResultSample", |ctx| Box::new(ResultSample::new(ctx)));
        registry.register("extra_feature.ExtraFeature", |_| Box::new(ExtraFeature));
        registry
    }

    pub fn register<F>(&mut self, service_path: &str, factory: F)
    where
        F: Fn(&ServiceContext) -> Box<dyn AnalysisService> + Send + Sync + 'static,
    {
        self.factories.insert(service_path.to_string(), Arc::new(factory));
    }

    pub fn service_paths(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Exact path first, then the class name alone (case-insensitive).
    fn resolve(&self, service_path: &str) -> Option<&ServiceFactory> {
        if let Some(factory) = self.factories.get(service_path) {
            return Some(factory);
        }
        let wanted = service_name_from_path(service_path);
        self.factories
            .iter()
            .find(|(path, _)| service_name_from_path(path).eq_ignore_ascii_case(wanted))
            .map(|(_, factory)| factory)
    }

    pub fn instantiate(
        &self,
        service_path: &str,
        context: &ServiceContext,
    ) -> Result<Box<dyn AnalysisService>, ServiceKitError> {
        let factory = self.resolve(service_path).ok_or_else(|| {
            ServiceKitError::Input(format!(
                "Unknown service '{}'. Known services: {}",
                service_path,
                self.service_paths().join(", ")
            ))
        })?;
        Ok(factory(context))
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_paths())
            .finish()
    }
}

/// `result_sample.ResultSample` -> `ResultSample`.
pub fn service_name_from_path(service_path: &str) -> &str {
    service_path.rsplit('.').next().unwrap_or(service_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeEnv;
    use crate::manifest::parse_manifest_str;

    fn context() -> ServiceContext {
        let manifest = parse_manifest_str("name: Sample\nversion: 1.0\ndocker_config:\n  image: sample\n").unwrap();
        ServiceContext::new(Arc::new(manifest), RuntimeEnv::default())
    }

    #[test]
    fn test_service_name_from_path() {
        assert_eq!(service_name_from_path("result_sample.ResultSample"), "ResultSample");
        assert_eq!(service_name_from_path("a.b.c.Deep"), "Deep");
        assert_eq!(service_name_from_path("Plain"), "Plain");
    }

    #[test]
    fn test_builtin_resolves_by_path_and_name() {
        let registry = ServiceRegistry::with_builtin();
        let ctx = context();
        assert!(registry.instantiate("result_sample.ResultSample", &ctx).is_ok());
        assert!(registry.instantiate("extrafeature", &ctx).is_ok());
    }

    #[test]
    fn test_unknown_service_is_input_error() {
        let registry = ServiceRegistry::with_builtin();
        let err = registry.instantiate("nope.Missing", &context()).err().unwrap();
        assert!(matches!(err, ServiceKitError::Input(_)));
        assert!(err.to_string().contains("result_sample.ResultSample"));
    }
}
