use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceKitError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
