//! MariaDBCluster reconciliation.
//!
//! Order: secret, PV, PVC, StatefulSet, headless Service. The StatefulSet's
//! launch arguments carry the `gcomm://` address built from the other nodes'
//! headless Services. A node that may not bootstrap and sees no peers stops
//! before the StatefulSet and retries after `peer_wait`.

use super::{RESYNC_INTERVAL, Reconciler};
use crate::convergence::adapters::{
    PersistentVolumeClaimKind, PersistentVolumeKind, SecretKind, ServiceKind, StatefulSetKind,
};
use crate::error::ControllerError;
use crate::fetcher::{optional, pod_names};
use crate::labels::cluster_node_labels;
use crate::membership::{discover, wsrep_args};
use crate::naming;
use crate::resources::secret::{AuthCredentials, auth_secret};
use crate::resources::services::cluster_headless_service;
use crate::resources::volumes::{persistent_volume, persistent_volume_claim};
use crate::resources::workload::cluster_stateful_set;
use crate::validation::{object_identity, validate_mariadb_cluster};
use crds::{MariaDBCluster, MariaDBClusterStatus};
use kube_runtime::controller::Action;
use tracing::info;

impl Reconciler {
    /// Reconcile one Galera node
    pub async fn reconcile_mariadb_cluster(&self, node: &MariaDBCluster) -> Result<Action, ControllerError> {
        let (name, namespace) = object_identity(&node.metadata)?;
        info!("Reconciling MariaDBCluster {}/{}", namespace, name);

        let fetched = self.client.get_mariadb_cluster(&namespace, &name).await;
        let Some(node) = optional(fetched, "MariaDBCluster", &name)? else {
            info!("MariaDBCluster {}/{} no longer exists, nothing to do", namespace, name);
            return Ok(Action::await_change());
        };
        validate_mariadb_cluster(&node.spec)?;

        match self.converge_cluster_node(&node, &name, &namespace).await {
            Ok(action) => Ok(action),
            Err(e) => {
                let refetch = self.client.get_mariadb_cluster(&namespace, &name).await;
                self.resolve_step_error("MariaDBCluster", &namespace, &name, e, refetch)
            }
        }
    }

    /// Launch arguments for this node, or `None` when it has to wait for a peer
    async fn launch_args(&self, node: &MariaDBCluster, name: &str, namespace: &str) -> Result<Option<Vec<String>>, ControllerError> {
        let cluster = &node.spec.cluster;
        if !cluster.enabled {
            return Ok(Some(Vec::new()));
        }

        let address = discover(
            self.client(),
            namespace,
            cluster.cluster_name(),
            &naming::service_name(name),
            self.config.peer_name_format,
        )
        .await?;

        if address.is_bootstrap() && !cluster.first_node {
            return Ok(None);
        }
        if address.is_bootstrap() {
            info!("MariaDBCluster {}/{} bootstraps cluster {}", namespace, name, cluster.cluster_name());
        }
        Ok(Some(wsrep_args(&address, cluster.cluster_name())))
    }

    async fn converge_cluster_node(&self, node: &MariaDBCluster, name: &str, namespace: &str) -> Result<Action, ControllerError> {
        let labels = cluster_node_labels(name);
        let credentials = AuthCredentials {
            username: &node.spec.username,
            password: &node.spec.password,
            root_password: &node.spec.root_password,
        };

        self.converge(&SecretKind, &auth_secret(node, credentials, labels.clone())).await?;
        self.converge(
            &PersistentVolumeKind,
            &persistent_volume(
                node,
                naming::volume_name(name, namespace),
                &node.spec.data_storage_path,
                &node.spec.data_storage_size,
                labels.clone(),
            ),
        )
        .await?;
        self.converge(
            &PersistentVolumeClaimKind,
            &persistent_volume_claim(
                node,
                naming::volume_claim_name(name),
                naming::volume_name(name, namespace),
                &node.spec.data_storage_size,
                labels.clone(),
            ),
        )
        .await?;

        let Some(args) = self.launch_args(node, name, namespace).await? else {
            info!(
                "MariaDBCluster {}/{} found no peers in cluster {} and is not the first node, retrying in {:?}",
                namespace,
                name,
                node.spec.cluster.cluster_name(),
                self.config.peer_wait
            );
            return Ok(Action::requeue(self.config.peer_wait));
        };

        self.converge(&StatefulSetKind, &cluster_stateful_set(node, args)).await?;
        self.converge(&ServiceKind, &cluster_headless_service(node)).await?;

        let status = MariaDBClusterStatus {
            nodes: pod_names(self.client(), namespace, &labels).await?,
        };
        if node.status.as_ref() != Some(&status) {
            self.client
                .update_mariadb_cluster_status(namespace, name, &status)
                .await
                .map_err(ControllerError::StatusUpdate)?;
        }

        Ok(Action::requeue(RESYNC_INTERVAL))
    }
}
