//! PlatformClient trait for mocking
//!
//! This trait abstracts the Kubernetes API so reconcilers can be unit tested.
//! `KubePlatformClient` implements it over `kube::Api`, tests use
//! `MockPlatformClient`.

use crate::error::PlatformError;
use crds::{
    Backup, BackupStatus, MariaDB, MariaDBCluster, MariaDBClusterStatus, MariaDBStatus, Monitor,
    MonitorStatus,
};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service};
use std::collections::BTreeMap;

/// Trait for Kubernetes API operations used by the controllers
///
/// Every call is a fresh API read or write; implementations do not retry.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PlatformClientTrait: Send + Sync {
    // Secrets
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, PlatformError>;
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, PlatformError>;

    // Storage (PersistentVolumes are cluster scoped)
    async fn get_persistent_volume(&self, name: &str) -> Result<PersistentVolume, PlatformError>;
    async fn create_persistent_volume(&self, volume: &PersistentVolume) -> Result<PersistentVolume, PlatformError>;
    async fn get_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, PlatformError>;
    async fn create_persistent_volume_claim(&self, namespace: &str, claim: &PersistentVolumeClaim) -> Result<PersistentVolumeClaim, PlatformError>;

    // Workloads
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, PlatformError>;
    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, PlatformError>;
    async fn update_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, PlatformError>;
    async fn get_stateful_set(&self, namespace: &str, name: &str) -> Result<StatefulSet, PlatformError>;
    async fn create_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet) -> Result<StatefulSet, PlatformError>;
    async fn update_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet) -> Result<StatefulSet, PlatformError>;

    // Network endpoints
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, PlatformError>;
    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, PlatformError>;
    async fn list_services(&self, namespace: &str, labels: &BTreeMap<String, String>) -> Result<Vec<Service>, PlatformError>;

    // Scheduled jobs
    async fn get_cron_job(&self, namespace: &str, name: &str) -> Result<CronJob, PlatformError>;
    async fn create_cron_job(&self, namespace: &str, cron_job: &CronJob) -> Result<CronJob, PlatformError>;
    async fn update_cron_job(&self, namespace: &str, cron_job: &CronJob) -> Result<CronJob, PlatformError>;

    // Pods (observed only)
    async fn list_pods(&self, namespace: &str, labels: &BTreeMap<String, String>) -> Result<Vec<Pod>, PlatformError>;

    // Desired-state objects: read the object, merge-patch its status subresource
    async fn get_mariadb(&self, namespace: &str, name: &str) -> Result<MariaDB, PlatformError>;
    async fn update_mariadb_status(&self, namespace: &str, name: &str, status: &MariaDBStatus) -> Result<MariaDB, PlatformError>;
    async fn get_mariadb_cluster(&self, namespace: &str, name: &str) -> Result<MariaDBCluster, PlatformError>;
    async fn update_mariadb_cluster_status(&self, namespace: &str, name: &str, status: &MariaDBClusterStatus) -> Result<MariaDBCluster, PlatformError>;
    async fn get_monitor(&self, namespace: &str, name: &str) -> Result<Monitor, PlatformError>;
    async fn update_monitor_status(&self, namespace: &str, name: &str, status: &MonitorStatus) -> Result<Monitor, PlatformError>;
    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Backup, PlatformError>;
    async fn update_backup_status(&self, namespace: &str, name: &str, status: &BackupStatus) -> Result<Backup, PlatformError>;
}
