pub mod types;
pub mod classification;

pub use types::ServiceKitError;
pub use classification::ErrorClassification;
