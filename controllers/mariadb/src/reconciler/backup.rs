//! Backup reconciliation.
//!
//! Order: database lookup, database pod lookup, PV, PVC, backup Service,
//! CronJob. A missing database or a database without pods is not an error;
//! the pass retries after `peer_wait`.

use super::{RESYNC_INTERVAL, Reconciler};
use crate::convergence::adapters::{
    CronJobKind, PersistentVolumeClaimKind, PersistentVolumeKind, ServiceKind,
};
use crate::error::ControllerError;
use crate::fetcher::{find_database, first_database_pod, optional};
use crate::labels::backup_labels;
use crate::naming;
use crate::resources::cronjob::backup_cron_job;
use crate::resources::services::backup_service;
use crate::resources::volumes::{persistent_volume, persistent_volume_claim};
use crate::validation::{BackupSettings, object_identity, validate_backup};
use crds::{Backup, BackupStatus};
use kube_runtime::controller::Action;
use tracing::{info, warn};

impl Reconciler {
    /// Reconcile a Backup
    pub async fn reconcile_backup(&self, backup: &Backup) -> Result<Action, ControllerError> {
        let (name, namespace) = object_identity(&backup.metadata)?;
        info!("Reconciling Backup {}/{}", namespace, name);

        let Some(backup) = optional(self.client.get_backup(&namespace, &name).await, "Backup", &name)? else {
            info!("Backup {}/{} no longer exists, nothing to do", namespace, name);
            return Ok(Action::await_change());
        };
        let settings = validate_backup(&backup.spec)?;

        match self.converge_backup(&backup, &settings, &name, &namespace).await {
            Ok(action) => Ok(action),
            Err(e) => {
                let refetch = self.client.get_backup(&namespace, &name).await;
                self.resolve_step_error("Backup", &namespace, &name, e, refetch)
            }
        }
    }

    async fn converge_backup(
        &self,
        backup: &Backup,
        settings: &BackupSettings,
        name: &str,
        namespace: &str,
    ) -> Result<Action, ControllerError> {
        let database_ref = settings.database_ref.as_str();

        let Some(database) = find_database(self.client(), namespace, database_ref).await? else {
            warn!(
                "Backup {}/{}: MariaDB {} not found, retrying in {:?}",
                namespace, name, database_ref, self.config.peer_wait
            );
            return Ok(Action::requeue(self.config.peer_wait));
        };
        let Some(database_pod) = first_database_pod(self.client(), namespace, database_ref).await? else {
            info!(
                "Backup {}/{}: MariaDB {} has no pods yet, retrying in {:?}",
                namespace, name, database_ref, self.config.peer_wait
            );
            return Ok(Action::requeue(self.config.peer_wait));
        };

        let labels = backup_labels(name);
        self.converge(
            &PersistentVolumeKind,
            &persistent_volume(
                backup,
                naming::volume_name(name, namespace),
                &settings.backup_path,
                &settings.backup_size,
                labels.clone(),
            ),
        )
        .await?;
        self.converge(
            &PersistentVolumeClaimKind,
            &persistent_volume_claim(
                backup,
                naming::volume_claim_name(name),
                naming::volume_name(name, namespace),
                &settings.backup_size,
                labels,
            ),
        )
        .await?;
        self.converge(&ServiceKind, &backup_service(backup, database_ref)).await?;
        self.converge(&CronJobKind, &backup_cron_job(backup, settings, &database.spec.image)).await?;

        let status = BackupStatus {
            cron_job: Some(naming::cron_job_name(name)),
            database_pod: Some(database_pod),
        };
        if backup.status.as_ref() != Some(&status) {
            self.client
                .update_backup_status(namespace, name, &status)
                .await
                .map_err(ControllerError::StatusUpdate)?;
        }

        Ok(Action::requeue(RESYNC_INTERVAL))
    }
}
