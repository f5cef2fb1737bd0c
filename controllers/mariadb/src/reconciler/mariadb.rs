//! MariaDB reconciliation: secret, PV, PVC, Deployment, Service.

use super::{RESYNC_INTERVAL, Reconciler};
use crate::convergence::adapters::{
    DeploymentKind, PersistentVolumeClaimKind, PersistentVolumeKind, SecretKind, ServiceKind,
};
use crate::error::ControllerError;
use crate::fetcher::{optional, pod_names};
use crate::labels::{DATABASE_TIER, database_labels};
use crate::naming;
use crate::resources::secret::{AuthCredentials, auth_secret};
use crate::resources::services::database_service;
use crate::resources::volumes::{persistent_volume, persistent_volume_claim};
use crate::resources::workload::database_deployment;
use crate::validation::{object_identity, validate_mariadb};
use crds::{MariaDB, MariaDBStatus};
use kube_runtime::controller::Action;
use tracing::{debug, info};

impl Reconciler {
    /// Reconcile a MariaDB
    pub async fn reconcile_mariadb(&self, db: &MariaDB) -> Result<Action, ControllerError> {
        let (name, namespace) = object_identity(&db.metadata)?;
        info!("Reconciling MariaDB {}/{}", namespace, name);

        let Some(db) = optional(self.client.get_mariadb(&namespace, &name).await, "MariaDB", &name)? else {
            info!("MariaDB {}/{} no longer exists, nothing to do", namespace, name);
            return Ok(Action::await_change());
        };
        validate_mariadb(&db.spec)?;

        match self.converge_mariadb(&db, &name, &namespace).await {
            Ok(action) => Ok(action),
            Err(e) => {
                let refetch = self.client.get_mariadb(&namespace, &name).await;
                self.resolve_step_error("MariaDB", &namespace, &name, e, refetch)
            }
        }
    }

    async fn converge_mariadb(&self, db: &MariaDB, name: &str, namespace: &str) -> Result<Action, ControllerError> {
        let labels = database_labels(name, DATABASE_TIER);
        let credentials = AuthCredentials {
            username: &db.spec.username,
            password: &db.spec.password,
            root_password: &db.spec.root_password,
        };

        self.converge(&SecretKind, &auth_secret(db, credentials, labels.clone())).await?;
        self.converge(
            &PersistentVolumeKind,
            &persistent_volume(
                db,
                naming::volume_name(name, namespace),
                &db.spec.data_storage_path,
                &db.spec.data_storage_size,
                labels.clone(),
            ),
        )
        .await?;
        self.converge(
            &PersistentVolumeClaimKind,
            &persistent_volume_claim(
                db,
                naming::volume_claim_name(name),
                naming::volume_name(name, namespace),
                &db.spec.data_storage_size,
                labels.clone(),
            ),
        )
        .await?;
        self.converge(&DeploymentKind, &database_deployment(db)).await?;
        self.converge(&ServiceKind, &database_service(db)).await?;

        let status = MariaDBStatus {
            nodes: pod_names(self.client(), namespace, &labels).await?,
        };
        if db.status.as_ref() != Some(&status) {
            debug!("MariaDB {}/{} nodes: {:?}", namespace, name, status.nodes);
            self.client
                .update_mariadb_status(namespace, name, &status)
                .await
                .map_err(ControllerError::StatusUpdate)?;
        }

        Ok(Action::requeue(RESYNC_INTERVAL))
    }
}
