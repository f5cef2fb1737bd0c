//! MariaDB Controller
//!
//! Operator for MariaDB on Kubernetes. Watches four CRDs:
//! - MariaDB: standalone database (Deployment + NodePort Service + hostPath volume)
//! - MariaDBCluster: one Galera node (StatefulSet + headless Service), joined to
//!   its peers through a computed `gcomm://` address
//! - Monitor: mysqld exporter Deployment + Service
//! - Backup: scheduled mysqldump CronJob against a MariaDB instance

mod backoff;
mod config;
mod controller;
mod convergence;
mod error;
mod fetcher;
mod labels;
mod membership;
mod metrics;
mod naming;
mod reconciler;
mod resources;
mod server;
mod validation;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting MariaDB Controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Peer name format: {}", config.peer_name_format);
    info!("  Concurrency: {}", config.reconcile_concurrency);
    info!("  Debounce: {:?}", config.reconcile_debounce);
    info!("  Metrics address: {}", config.metrics_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
