use super::types::ServiceKitError;

/// How an error is reported to the console and to the calling process.
/// Nothing in this crate is retried: a single-task run surfaces the first
/// failure as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub exit_code: i32,
}

impl ServiceKitError {
    pub fn classify(&self) -> ErrorClassification {
        match self {
            ServiceKitError::Schema(_) => ErrorClassification {
                error_type: "SchemaError",
                exit_code: 2,
            },
            ServiceKitError::Input(_) => ErrorClassification {
                error_type: "InputError",
                exit_code: 3,
            },
            ServiceKitError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                exit_code: 4,
            },
            ServiceKitError::Service(_) => ErrorClassification {
                error_type: "ServiceError",
                exit_code: 5,
            },
            ServiceKitError::Io(_) => ErrorClassification {
                error_type: "IoError",
                exit_code: 1,
            },
            ServiceKitError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                exit_code: 1,
            },
            ServiceKitError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                exit_code: 1,
            },
            ServiceKitError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                exit_code: 1,
            },
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.classify().exit_code
    }
}
