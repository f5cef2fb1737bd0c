//! Backup CRD
//!
//! Scheduled mysqldump of a MariaDB instance into a hostPath volume.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Schedule used when none is given: daily at midnight
pub const DEFAULT_SCHEDULE: &str = "0 0 * * *";

/// Host directory backups land in when none is given
pub const DEFAULT_BACKUP_PATH: &str = "/mnt/backup";

/// MariaDB object backed up when `databaseRef` is not set
pub const DEFAULT_DATABASE_REF: &str = "mariadb";

/// Scheduled mysqldump of a MariaDB
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "mariadb.persistentsys.com",
    version = "v1alpha1",
    kind = "Backup",
    plural = "backups",
    namespaced,
    status = "BackupStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// Cron schedule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    /// Host path backups are written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,

    /// Size of the backup volume, as a Kubernetes quantity
    #[serde(default)]
    pub backup_size: String,

    /// Name of the MariaDB object to back up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_ref: Option<String>,
}

impl BackupSpec {
    /// Schedule, or the nightly default
    pub fn schedule(&self) -> &str {
        non_blank(self.schedule.as_deref()).unwrap_or(DEFAULT_SCHEDULE)
    }

    /// Backup path, or the default
    pub fn backup_path(&self) -> &str {
        non_blank(self.backup_path.as_deref()).unwrap_or(DEFAULT_BACKUP_PATH)
    }

    /// Database name, or the default
    pub fn database_ref(&self) -> &str {
        non_blank(self.database_ref.as_deref()).unwrap_or(DEFAULT_DATABASE_REF)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Observed state of a backup
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    /// Name of the CronJob running the backup
    #[serde(default)]
    pub cron_job: Option<String>,

    /// Database pod the backup service points at
    #[serde(default)]
    pub database_pod: Option<String>,
}
