//! Controller-specific error types.

use crate::validation::ValidationError;
use kube::Error as KubeError;
use platform_client::PlatformError;
use thiserror::Error;

/// Errors that can occur in the MariaDB Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Reading an object failed for a reason other than NotFound
    #[error("Failed to fetch {kind} {name}: {source}")]
    Fetch {
        kind: &'static str,
        name: String,
        #[source]
        source: PlatformError,
    },

    /// Creating or updating a dependent object failed
    #[error("Failed to apply {kind} {name}: {source}")]
    Apply {
        kind: &'static str,
        name: String,
        #[source]
        source: PlatformError,
    },

    /// Listing peer Services for a cluster failed
    #[error("Peer discovery failed: {0}")]
    PeerDiscovery(#[source] PlatformError),

    /// Writing the status subresource failed
    #[error("Status update failed: {0}")]
    StatusUpdate(#[source] PlatformError),

    /// The desired-state object is malformed; retrying will not help
    #[error("Invalid spec: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Metrics registry setup or rendering failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probes/metrics server failed to bind or serve
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

impl ControllerError {
    /// Errors that only a spec change can fix
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
