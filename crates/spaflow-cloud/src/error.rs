//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// A required resource or response shape is missing, or a resource is
    /// owned by something else. Never retried.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("[{service}] {resource} not found")]
    NotFound {
        service: &'static str,
        resource: String,
    },

    #[error("[{service}] API error{}: {message}", code_suffix(.code))]
    Provider {
        service: &'static str,
        code: Option<String>,
        status: Option<u16>,
        message: String,
    },

    #[error("{0}")]
    UserDeclined(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

impl CloudError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// True when the provider reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for a provider-side HTTP 409.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Provider {
                status: Some(409),
                ..
            }
        )
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display_includes_code() {
        let err = CloudError::Provider {
            service: "S3",
            code: Some("AccessDenied".into()),
            status: Some(403),
            message: "nope".into(),
        };
        assert_eq!(err.to_string(), "[S3] API error (AccessDenied): nope");

        let err = CloudError::Provider {
            service: "ACM",
            code: None,
            status: None,
            message: "dispatch failure".into(),
        };
        assert_eq!(err.to_string(), "[ACM] API error: dispatch failure");
    }

    #[test]
    fn test_classification_helpers() {
        let not_found = CloudError::NotFound {
            service: "S3",
            resource: "bucket example.com".into(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = CloudError::Provider {
            service: "S3",
            code: Some("BucketAlreadyExists".into()),
            status: Some(409),
            message: String::new(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
    }
}
