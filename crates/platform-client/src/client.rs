//! Kubernetes API client
//!
//! Implements `PlatformClientTrait` over `kube::Api`. Namespaced kinds share
//! a handful of generic helpers; PersistentVolumes go through `Api::all`.

use crate::error::PlatformError;
use crate::platform_trait::PlatformClientTrait;
use crds::{
    Backup, BackupStatus, MariaDB, MariaDBCluster, MariaDBClusterStatus, MariaDBStatus, Monitor,
    MonitorStatus,
};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service};
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

/// Render a label map as a Kubernetes equality selector (`a=1,b=2`)
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Kubernetes API client
#[derive(Clone)]
pub struct KubePlatformClient {
    client: Client,
}

impl std::fmt::Debug for KubePlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePlatformClient").finish_non_exhaustive()
    }
}

impl KubePlatformClient {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster config or the local kubeconfig
    pub async fn try_default() -> Result<Self, PlatformError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_namespaced<K>(&self, namespace: &str, name: &str) -> Result<K, PlatformError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        debug!("GET {} {}/{}", K::kind(&Default::default()), namespace, name);
        Ok(self.namespaced::<K>(namespace).get(name).await?)
    }

    async fn create_namespaced<K>(&self, namespace: &str, object: &K) -> Result<K, PlatformError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let name = object_name(object)?;
        debug!("CREATE {} {}/{}", K::kind(&Default::default()), namespace, name);
        Ok(self
            .namespaced::<K>(namespace)
            .create(&PostParams::default(), object)
            .await?)
    }

    /// Full replace; the object's resourceVersion makes this a compare-and-swap
    async fn replace_namespaced<K>(&self, namespace: &str, object: &K) -> Result<K, PlatformError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let name = object_name(object)?;
        debug!("UPDATE {} {}/{}", K::kind(&Default::default()), namespace, name);
        Ok(self
            .namespaced::<K>(namespace)
            .replace(name, &PostParams::default(), object)
            .await?)
    }

    async fn list_namespaced<K>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, PlatformError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let selector = label_selector(labels);
        debug!("LIST {} in {} ({})", K::kind(&Default::default()), namespace, selector);
        let params = ListParams::default().labels(&selector);
        Ok(self.namespaced::<K>(namespace).list(&params).await?.items)
    }

    async fn patch_status<K, S>(&self, namespace: &str, name: &str, status: &S) -> Result<K, PlatformError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
        S: Serialize + Sync,
    {
        debug!("PATCH status {} {}/{}", K::kind(&Default::default()), namespace, name);
        let patch = serde_json::json!({ "status": status });
        Ok(self
            .namespaced::<K>(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }
}

fn object_name<K: Resource>(object: &K) -> Result<&str, PlatformError> {
    object
        .meta()
        .name
        .as_deref()
        .ok_or_else(|| PlatformError::InvalidRequest("object has no metadata.name".to_string()))
}

#[async_trait::async_trait]
impl PlatformClientTrait for KubePlatformClient {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, PlatformError> {
        self.create_namespaced(namespace, secret).await
    }

    async fn get_persistent_volume(&self, name: &str) -> Result<PersistentVolume, PlatformError> {
        debug!("GET PersistentVolume {}", name);
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn create_persistent_volume(&self, volume: &PersistentVolume) -> Result<PersistentVolume, PlatformError> {
        let name = object_name(volume)?;
        debug!("CREATE PersistentVolume {}", name);
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        Ok(api.create(&PostParams::default(), volume).await?)
    }

    async fn get_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_persistent_volume_claim(&self, namespace: &str, claim: &PersistentVolumeClaim) -> Result<PersistentVolumeClaim, PlatformError> {
        self.create_namespaced(namespace, claim).await
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, PlatformError> {
        self.create_namespaced(namespace, deployment).await
    }

    async fn update_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, PlatformError> {
        self.replace_namespaced(namespace, deployment).await
    }

    async fn get_stateful_set(&self, namespace: &str, name: &str) -> Result<StatefulSet, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet) -> Result<StatefulSet, PlatformError> {
        self.create_namespaced(namespace, stateful_set).await
    }

    async fn update_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet) -> Result<StatefulSet, PlatformError> {
        self.replace_namespaced(namespace, stateful_set).await
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, PlatformError> {
        self.create_namespaced(namespace, service).await
    }

    async fn list_services(&self, namespace: &str, labels: &BTreeMap<String, String>) -> Result<Vec<Service>, PlatformError> {
        self.list_namespaced(namespace, labels).await
    }

    async fn get_cron_job(&self, namespace: &str, name: &str) -> Result<CronJob, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_cron_job(&self, namespace: &str, cron_job: &CronJob) -> Result<CronJob, PlatformError> {
        self.create_namespaced(namespace, cron_job).await
    }

    async fn update_cron_job(&self, namespace: &str, cron_job: &CronJob) -> Result<CronJob, PlatformError> {
        self.replace_namespaced(namespace, cron_job).await
    }

    async fn list_pods(&self, namespace: &str, labels: &BTreeMap<String, String>) -> Result<Vec<Pod>, PlatformError> {
        self.list_namespaced(namespace, labels).await
    }

    async fn get_mariadb(&self, namespace: &str, name: &str) -> Result<MariaDB, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn update_mariadb_status(&self, namespace: &str, name: &str, status: &MariaDBStatus) -> Result<MariaDB, PlatformError> {
        self.patch_status(namespace, name, status).await
    }

    async fn get_mariadb_cluster(&self, namespace: &str, name: &str) -> Result<MariaDBCluster, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn update_mariadb_cluster_status(&self, namespace: &str, name: &str, status: &MariaDBClusterStatus) -> Result<MariaDBCluster, PlatformError> {
        self.patch_status(namespace, name, status).await
    }

    async fn get_monitor(&self, namespace: &str, name: &str) -> Result<Monitor, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn update_monitor_status(&self, namespace: &str, name: &str, status: &MonitorStatus) -> Result<Monitor, PlatformError> {
        self.patch_status(namespace, name, status).await
    }

    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Backup, PlatformError> {
        self.get_namespaced(namespace, name).await
    }

    async fn update_backup_status(&self, namespace: &str, name: &str, status: &BackupStatus) -> Result<Backup, PlatformError> {
        self.patch_status(namespace, name, status).await
    }
}
