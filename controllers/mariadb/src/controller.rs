//! Main controller implementation.
//!
//! Starts one watcher per CRD plus the probes/metrics server and runs until
//! any of them exits.

use crate::config::Config;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::server::{ServerState, serve};
use crate::watcher::Watcher;
use kube::Client;
use platform_client::KubePlatformClient;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for MariaDB resources.
pub struct Controller {
    mariadb_watcher: JoinHandle<Result<(), ControllerError>>,
    mariadb_cluster_watcher: JoinHandle<Result<(), ControllerError>>,
    monitor_watcher: JoinHandle<Result<(), ControllerError>>,
    backup_watcher: JoinHandle<Result<(), ControllerError>>,
    server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing MariaDB Controller");

        let kube_client = Client::try_default().await?;
        let metrics = Arc::new(Metrics::new()?);

        let reconciler = Arc::new(Reconciler::new(
            Box::new(KubePlatformClient::new(kube_client.clone())),
            config.clone(),
            metrics.clone(),
        ));
        let watcher_instance = Arc::new(Watcher::new(kube_client, config.clone(), reconciler));

        let mariadb_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_mariadbs().await })
        };

        let mariadb_cluster_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_mariadb_clusters().await })
        };

        let monitor_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_monitors().await })
        };

        let backup_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_backups().await })
        };

        let state = ServerState::new(metrics);
        let server = {
            let state = state.clone();
            let addr = config.metrics_addr;
            tokio::spawn(async move { serve(addr, state).await })
        };
        state.set_ready(true);

        Ok(Self {
            mariadb_watcher,
            mariadb_cluster_watcher,
            monitor_watcher,
            backup_watcher,
            server,
        })
    }

    /// Runs the controller.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("MariaDB Controller running");

        // Wait for any task to exit (they should run forever)
        tokio::select! {
            result = &mut self.mariadb_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("MariaDB watcher panicked: {}", e)))??;
            }
            result = &mut self.mariadb_cluster_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("MariaDBCluster watcher panicked: {}", e)))??;
            }
            result = &mut self.monitor_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Monitor watcher panicked: {}", e)))??;
            }
            result = &mut self.backup_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Backup watcher panicked: {}", e)))??;
            }
            result = &mut self.server => {
                result.map_err(|e| ControllerError::Watch(format!("Probes server panicked: {}", e)))??;
            }
        }

        info!("MariaDB Controller stopped");
        Ok(())
    }
}
