//! Monitor reconciliation: exporter Deployment, then its Service.

use super::{RESYNC_INTERVAL, Reconciler};
use crate::convergence::adapters::{DeploymentKind, ServiceKind};
use crate::error::ControllerError;
use crate::fetcher::{optional, pod_names};
use crate::labels::monitor_labels;
use crate::resources::services::monitor_service;
use crate::resources::workload::monitor_deployment;
use crate::validation::{object_identity, validate_monitor};
use crds::{Monitor, MonitorStatus};
use kube_runtime::controller::Action;
use tracing::info;

impl Reconciler {
    /// Reconcile a Monitor
    pub async fn reconcile_monitor(&self, monitor: &Monitor) -> Result<Action, ControllerError> {
        let (name, namespace) = object_identity(&monitor.metadata)?;
        info!("Reconciling Monitor {}/{}", namespace, name);

        let Some(monitor) = optional(self.client.get_monitor(&namespace, &name).await, "Monitor", &name)? else {
            info!("Monitor {}/{} no longer exists, nothing to do", namespace, name);
            return Ok(Action::await_change());
        };
        validate_monitor(&monitor.spec)?;

        match self.converge_monitor(&monitor, &name, &namespace).await {
            Ok(action) => Ok(action),
            Err(e) => {
                let refetch = self.client.get_monitor(&namespace, &name).await;
                self.resolve_step_error("Monitor", &namespace, &name, e, refetch)
            }
        }
    }

    async fn converge_monitor(&self, monitor: &Monitor, name: &str, namespace: &str) -> Result<Action, ControllerError> {
        self.converge(&DeploymentKind, &monitor_deployment(monitor)).await?;
        self.converge(&ServiceKind, &monitor_service(monitor)).await?;

        let status = MonitorStatus {
            nodes: pod_names(self.client(), namespace, &monitor_labels(name)).await?,
        };
        if monitor.status.as_ref() != Some(&status) {
            self.client
                .update_monitor_status(namespace, name, &status)
                .await
                .map_err(ControllerError::StatusUpdate)?;
        }

        Ok(Action::requeue(RESYNC_INTERVAL))
    }
}
