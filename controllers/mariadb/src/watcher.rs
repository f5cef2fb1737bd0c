//! Kubernetes resource watchers.
//!
//! One kube_runtime `Controller` per desired-state kind. Each also watches the
//! namespaced objects it owns, so deleting or editing a dependent triggers a
//! pass on its owner. All controllers share a generic `run_controller()`
//! helper that wires reconcile, error policy, metrics and backoff.

use crate::config::Config;
use crate::error::ControllerError;
use crate::labels::{BACKUP_TIER, DATABASE_TIER, MEMBERSHIP_LABEL, MONITOR_TIER};
use crate::reconciler::{RESYNC_INTERVAL, Reconciler};
use crds::{Backup, MariaDB, MariaDBCluster, Monitor};
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service};
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::{
    Controller, watcher,
    controller::{Action, Config as ControllerConfig},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Backoff table key of one object
fn resource_key<K>(kind: &str, object: &K) -> String
where
    K: Resource,
{
    format!("{}/{}/{}", kind, object.namespace().unwrap_or_default(), object.name_any())
}

/// Selector for owned objects carrying `tier`
fn owned_selector(app: &str, tier: &str) -> watcher::Config {
    watcher::Config::default().labels(&format!("app={},tier={}", app, tier))
}

/// Metric result of one pass: a requeue other than the periodic resync means
/// the pass stopped early to wait for something
fn pass_result(result: &Result<Action, ControllerError>) -> &'static str {
    match result {
        Ok(action) if *action == Action::requeue(RESYNC_INTERVAL) || *action == Action::await_change() => "success",
        Ok(_) => "requeue",
        Err(_) => "error",
    }
}

/// Run a configured controller until its watch stream ends.
///
/// Successful passes reset the object's backoff; failed ones requeue after the
/// next Fibonacci delay, except validation failures, which wait for the
/// object to change.
async fn run_controller<K, F>(
    controller: Controller<K>,
    config: &Config,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = resource_key(resource_name, obj.as_ref());
        if error.is_permanent() {
            warn!("{} is invalid, waiting for a spec change: {}", key, error);
            return Action::await_change();
        }
        let (backoff, error_count) = ctx.next_backoff(&key);
        error!(
            "Reconciliation error for {} (attempt {}), retrying in {:?}: {}",
            key, error_count, backoff, error
        );
        Action::requeue(backoff)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = resource_key(resource_name, obj.as_ref());
            debug!("Reconciling {}", key);
            let started = Instant::now();

            let result = reconcile_fn(ctx.clone(), obj).await;
            if result.is_ok() {
                ctx.reset_backoff(&key);
            }
            ctx.metrics.observe_reconcile(resource_name, pass_result(&result), started.elapsed());
            result
        }
    };

    let controller_config = ControllerConfig::default()
        .debounce(config.reconcile_debounce)
        .concurrency(config.reconcile_concurrency);

    controller
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((object, action)) => debug!("Reconciled {}: {:?}", object, action),
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    Ok(())
}

/// Watches the four desired-state kinds and their dependents.
pub struct Watcher {
    client: Client,
    config: Config,
    reconciler: Arc<Reconciler>,
}

impl Watcher {
    /// Create a watcher set sharing one reconciler
    pub fn new(client: Client, config: Config, reconciler: Arc<Reconciler>) -> Self {
        Self {
            client,
            config,
            reconciler,
        }
    }

    /// Api over the watched namespace, or all namespaces
    fn api<K>(&self) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match self.config.namespace.as_deref() {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    /// Starts watching MariaDB resources.
    pub async fn watch_mariadbs(&self) -> Result<(), ControllerError> {
        let owned = || owned_selector("MariaDB", DATABASE_TIER);
        let controller = Controller::new(self.api::<MariaDB>(), watcher::Config::default())
            .owns(self.api::<Secret>(), owned())
            .owns(self.api::<PersistentVolumeClaim>(), owned())
            .owns(self.api::<Deployment>(), owned())
            .owns(self.api::<Service>(), owned());

        run_controller(
            controller,
            &self.config,
            self.reconciler.clone(),
            |reconciler, resource| Box::pin(async move { reconciler.reconcile_mariadb(&resource).await }),
            "MariaDB",
        )
        .await
    }

    /// Starts watching MariaDBCluster resources.
    pub async fn watch_mariadb_clusters(&self) -> Result<(), ControllerError> {
        let owned = || owned_selector("MariaDBCluster", DATABASE_TIER);
        let controller = Controller::new(self.api::<MariaDBCluster>(), watcher::Config::default())
            .owns(self.api::<Secret>(), owned())
            .owns(self.api::<PersistentVolumeClaim>(), owned())
            .owns(self.api::<StatefulSet>(), owned())
            .owns(
                self.api::<Service>(),
                watcher::Config::default().labels(MEMBERSHIP_LABEL),
            );

        run_controller(
            controller,
            &self.config,
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_mariadb_cluster(&resource).await })
            },
            "MariaDBCluster",
        )
        .await
    }

    /// Starts watching Monitor resources.
    pub async fn watch_monitors(&self) -> Result<(), ControllerError> {
        let owned = || owned_selector("MariaDB-Monitor", MONITOR_TIER);
        let controller = Controller::new(self.api::<Monitor>(), watcher::Config::default())
            .owns(self.api::<Deployment>(), owned())
            .owns(self.api::<Service>(), owned());

        run_controller(
            controller,
            &self.config,
            self.reconciler.clone(),
            |reconciler, resource| Box::pin(async move { reconciler.reconcile_monitor(&resource).await }),
            "Monitor",
        )
        .await
    }

    /// Starts watching Backup resources.
    pub async fn watch_backups(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(self.api::<Backup>(), watcher::Config::default())
            .owns(self.api::<PersistentVolumeClaim>(), owned_selector("MariaDB-Backup", BACKUP_TIER))
            .owns(self.api::<CronJob>(), owned_selector("MariaDB-Backup", BACKUP_TIER))
            .owns(self.api::<Service>(), owned_selector("MariaDB", BACKUP_TIER));

        run_controller(
            controller,
            &self.config,
            self.reconciler.clone(),
            |reconciler, resource| Box::pin(async move { reconciler.reconcile_backup(&resource).await }),
            "Backup",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_mariadb;

    #[test]
    fn test_resource_key() {
        let db = create_test_mariadb("mariadb", "db", 1, "db:10.3");
        assert_eq!(resource_key("MariaDB", &db), "MariaDB/db/mariadb");
    }

    #[test]
    fn test_pass_result_labels() {
        assert_eq!(pass_result(&Ok(Action::requeue(RESYNC_INTERVAL))), "success");
        assert_eq!(pass_result(&Ok(Action::await_change())), "success");
        assert_eq!(pass_result(&Ok(Action::requeue(std::time::Duration::from_secs(10)))), "requeue");
        let failed = Err(ControllerError::Watch("stream ended".to_string()));
        assert_eq!(pass_result(&failed), "error");
    }
}
