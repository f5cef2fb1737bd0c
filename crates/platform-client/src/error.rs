//! Platform client errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Object does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create raced another writer (HTTP 409, reason AlreadyExists)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Update lost an optimistic concurrency race (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other API error response
    #[error("Kubernetes API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport or client-side error
    #[error("Kubernetes client error: {0}")]
    Kube(kube::Error),

    /// Invalid request (e.g., object without a name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl PlatformError {
    /// HTTP 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Create raced another writer
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

impl From<kube::Error> for PlatformError {
    fn from(err: kube::Error) -> Self {
        if let kube::Error::Api(response) = &err {
            let message = response.message.clone();
            return match response.code {
                404 => Self::NotFound(message),
                409 if response.reason == "AlreadyExists" => Self::AlreadyExists(message),
                409 => Self::Conflict(message),
                code => Self::Api(format!("{} {}: {}", code, response.reason, message)),
            };
        }
        Self::Kube(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_helpers() {
        assert!(PlatformError::NotFound("deployments/x".to_string()).is_not_found());
        assert!(!PlatformError::Conflict("deployments/x".to_string()).is_not_found());
        assert!(PlatformError::AlreadyExists("services/x".to_string()).is_already_exists());
        assert!(!PlatformError::Api("boom".to_string()).is_already_exists());
    }
}
