pub mod base;
pub mod registry;
pub mod request;
pub mod samples;

pub use base::{AnalysisService, ServiceContext};
pub use registry::{service_name_from_path, ServiceFactory, ServiceRegistry};
pub use request::ServiceRequest;
