//! Reconciliation logic for the MariaDB CRDs.
//!
//! One module per desired-state kind. Each pass re-reads its object, validates
//! it, then converges the dependents in a fixed order; the first step that
//! fails or asks for a requeue ends the pass. Status is written last and only
//! when it changed.

pub mod backup;
pub mod mariadb;
pub mod mariadb_cluster;
pub mod monitor;

#[cfg(test)]
mod mariadb_test;

use crate::backoff::FibonacciBackoff;
use crate::config::Config;
use crate::convergence::{DependentKind, Outcome, ensure};
use crate::error::ControllerError;
use crate::metrics::Metrics;
use kube_runtime::controller::Action;
use platform_client::{PlatformClientTrait, PlatformError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Re-run a converged object this often so status follows pod churn
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

const BACKOFF_MIN_SECONDS: u64 = 5;
const BACKOFF_MAX_SECONDS: u64 = 300;

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(BACKOFF_MIN_SECONDS, BACKOFF_MAX_SECONDS),
            error_count: 0,
        }
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciles MariaDB, MariaDBCluster, Monitor and Backup objects.
pub struct Reconciler {
    pub(crate) client: Box<dyn PlatformClientTrait + Send + Sync>,
    pub(crate) config: Config,
    pub(crate) metrics: Arc<Metrics>,
    /// Error tracking per resource (kind/namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    pub fn new(
        client: Box<dyn PlatformClientTrait + Send + Sync>,
        config: Config,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            client,
            config,
            metrics,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn client(&self) -> &dyn PlatformClientTrait {
        self.client.as_ref()
    }

    /// Converge one dependent and count the outcome
    pub(crate) async fn converge<K>(&self, kind: &K, desired: &K::Object) -> Result<Outcome, ControllerError>
    where
        K: DependentKind,
    {
        let outcome = ensure(kind, self.client(), desired).await?;
        self.metrics.record_outcome(K::KIND, outcome);
        Ok(outcome)
    }

    /// End a failed pass quietly when the owner was deleted while it ran.
    ///
    /// `refetch` is a fresh read of the owner taken after the failure.
    pub(crate) fn resolve_step_error<T>(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        error: ControllerError,
        refetch: Result<T, PlatformError>,
    ) -> Result<Action, ControllerError> {
        match refetch {
            Err(e) if e.is_not_found() => {
                info!(
                    "{} {}/{} was deleted during reconciliation, dropping error: {}",
                    kind, namespace, name, error
                );
                Ok(Action::await_change())
            }
            _ => Err(error),
        }
    }

    /// Next backoff for a resource and the number of consecutive errors
    pub fn next_backoff(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                state.error_count += 1;
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(BACKOFF_MIN_SECONDS), 0)
            }
        }
    }

    /// Reset error tracking for a resource (on successful reconciliation)
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use platform_client::MockPlatformClient;
    use std::time::Duration;

    #[test]
    fn test_backoff_is_per_resource_and_resets() {
        let reconciler = create_test_reconciler(&MockPlatformClient::new());

        assert_eq!(reconciler.next_backoff("MariaDB/db/a"), (Duration::from_secs(5), 1));
        assert_eq!(reconciler.next_backoff("MariaDB/db/a"), (Duration::from_secs(5), 2));
        assert_eq!(reconciler.next_backoff("MariaDB/db/a"), (Duration::from_secs(10), 3));
        assert_eq!(reconciler.next_backoff("MariaDB/db/b"), (Duration::from_secs(5), 1));

        reconciler.reset_backoff("MariaDB/db/a");
        assert_eq!(reconciler.next_backoff("MariaDB/db/a"), (Duration::from_secs(5), 1));
    }
}
