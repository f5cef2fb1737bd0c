//! Mock PlatformClient for unit testing
//!
//! This module provides an in-memory implementation of `PlatformClientTrait`
//! so reconcilers can be exercised without a cluster. Objects are stored as
//! JSON keyed by (kind, namespace, name), which keeps one store for every kind.
//!
//! Besides storage the mock can:
//! - count calls per operation and kind
//! - fail a given operation for a given kind
//! - serve a stale NotFound for one read of an existing object
//! - assign a clusterIP to Services on create, like the API server does

use crate::error::PlatformError;
use crate::platform_trait::PlatformClientTrait;
use crds::{
    Backup, BackupStatus, MariaDB, MariaDBCluster, MariaDBClusterStatus, MariaDBStatus, Monitor,
    MonitorStatus,
};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service};
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const GET: &str = "get";
const CREATE: &str = "create";
const UPDATE: &str = "update";
const LIST: &str = "list";
const UPDATE_STATUS: &str = "update_status";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObjectKey {
    kind: String,
    namespace: String,
    name: String,
}

impl ObjectKey {
    fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{} {}", self.kind, self.name)
        } else {
            write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn kind_of<K: Resource<DynamicType = ()>>() -> String {
    K::kind(&()).to_string()
}

/// Mock PlatformClient for testing
///
/// Clones share the same store, so a test can keep one handle for assertions
/// while the reconciler owns another.
#[derive(Clone, Default)]
pub struct MockPlatformClient {
    objects: Arc<Mutex<HashMap<ObjectKey, serde_json::Value>>>,
    calls: Arc<Mutex<HashMap<(String, String), usize>>>,
    failures: Arc<Mutex<HashMap<(String, String), String>>>,
    stale_reads: Arc<Mutex<HashSet<ObjectKey>>>,
    next_uid: Arc<Mutex<u64>>,
    next_cluster_ip: Arc<Mutex<u8>>,
}

impl std::fmt::Debug for MockPlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPlatformClient")
            .field("objects", &lock(&self.objects).len())
            .finish_non_exhaustive()
    }
}

impl MockPlatformClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object as-is (for test setup). Namespace comes from the object.
    pub fn insert<K>(&self, object: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let meta = object.meta();
        let key = ObjectKey::new(
            &kind_of::<K>(),
            meta.namespace.as_deref().unwrap_or_default(),
            meta.name.as_deref().unwrap_or_default(),
        );
        match serde_json::to_value(object) {
            Ok(value) => {
                lock(&self.objects).insert(key, value);
            }
            Err(e) => panic!("test object {} does not serialize: {}", key, e),
        }
    }

    /// Read an object back from the store without counting a call
    pub fn stored<K>(&self, namespace: &str, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let key = ObjectKey::new(&kind_of::<K>(), namespace, name);
        let value = lock(&self.objects).get(&key).cloned()?;
        serde_json::from_value(value).ok()
    }

    /// Remove an object, as a user or garbage collector would
    pub fn remove<K>(&self, namespace: &str, name: &str)
    where
        K: Resource<DynamicType = ()>,
    {
        let key = ObjectKey::new(&kind_of::<K>(), namespace, name);
        lock(&self.objects).remove(&key);
    }

    /// Number of stored objects of one kind
    pub fn count_of(&self, kind: &str) -> usize {
        lock(&self.objects).keys().filter(|key| key.kind == kind).count()
    }

    /// Number of calls made for an operation ("get", "create", "update",
    /// "list", "update_status") on a kind
    pub fn call_count(&self, operation: &str, kind: &str) -> usize {
        lock(&self.calls)
            .get(&(operation.to_string(), kind.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Successful and failed create calls for `kind`
    pub fn create_count(&self, kind: &str) -> usize {
        self.call_count(CREATE, kind)
    }

    /// Successful and failed update calls for `kind`
    pub fn update_count(&self, kind: &str) -> usize {
        self.call_count(UPDATE, kind)
    }

    /// Status writes for `kind`
    pub fn status_update_count(&self, kind: &str) -> usize {
        self.call_count(UPDATE_STATUS, kind)
    }

    /// Make every call of `operation` on `kind` fail with an API error
    pub fn fail_operation(&self, operation: &str, kind: &str, message: impl Into<String>) {
        lock(&self.failures).insert((operation.to_string(), kind.to_string()), message.into());
    }

    /// Drop all injected failures
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// The next read of this object reports NotFound even though it exists,
    /// like a lagging cache racing another writer
    pub fn serve_stale_read(&self, kind: &str, namespace: &str, name: &str) {
        lock(&self.stale_reads).insert(ObjectKey::new(kind, namespace, name));
    }

    fn record(&self, operation: &str, kind: &str) -> Result<(), PlatformError> {
        *lock(&self.calls)
            .entry((operation.to_string(), kind.to_string()))
            .or_insert(0) += 1;
        match lock(&self.failures).get(&(operation.to_string(), kind.to_string())) {
            Some(message) => Err(PlatformError::Api(message.clone())),
            None => Ok(()),
        }
    }

    fn next_uid(&self) -> String {
        let mut uid = lock(&self.next_uid);
        *uid += 1;
        format!("00000000-0000-0000-0000-{:012}", *uid)
    }

    fn next_cluster_ip(&self) -> String {
        let mut host = lock(&self.next_cluster_ip);
        *host = host.wrapping_add(1).max(1);
        format!("10.96.0.{}", *host)
    }

    fn get_object<K>(&self, namespace: &str, name: &str) -> Result<K, PlatformError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let kind = kind_of::<K>();
        self.record(GET, &kind)?;
        let key = ObjectKey::new(&kind, namespace, name);
        if lock(&self.stale_reads).remove(&key) {
            return Err(PlatformError::NotFound(key.to_string()));
        }
        let value = lock(&self.objects)
            .get(&key)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(key.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    fn create_object<K>(&self, namespace: &str, object: &K) -> Result<K, PlatformError>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    {
        let kind = kind_of::<K>();
        self.record(CREATE, &kind)?;
        let name = object
            .meta()
            .name
            .clone()
            .ok_or_else(|| PlatformError::InvalidRequest(format!("{} has no metadata.name", kind)))?;
        let key = ObjectKey::new(&kind, namespace, &name);

        let mut value = serde_json::to_value(object)?;
        if !namespace.is_empty() {
            value["metadata"]["namespace"] = serde_json::json!(namespace);
        }
        value["metadata"]["uid"] = serde_json::json!(self.next_uid());
        value["metadata"]["resourceVersion"] = serde_json::json!("1");
        if kind == "Service" && value["spec"]["clusterIP"].is_null() {
            value["spec"]["clusterIP"] = serde_json::json!(self.next_cluster_ip());
        }

        let mut objects = lock(&self.objects);
        if objects.contains_key(&key) {
            return Err(PlatformError::AlreadyExists(key.to_string()));
        }
        objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    fn update_object<K>(&self, namespace: &str, object: &K) -> Result<K, PlatformError>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    {
        let kind = kind_of::<K>();
        self.record(UPDATE, &kind)?;
        let name = object
            .meta()
            .name
            .clone()
            .ok_or_else(|| PlatformError::InvalidRequest(format!("{} has no metadata.name", kind)))?;
        let key = ObjectKey::new(&kind, namespace, &name);

        let mut objects = lock(&self.objects);
        let existing = objects
            .get(&key)
            .ok_or_else(|| PlatformError::NotFound(key.to_string()))?;
        let current_version = resource_version(existing);
        if let Some(sent) = object.meta().resource_version.as_deref() {
            if sent != current_version.to_string() {
                return Err(PlatformError::Conflict(key.to_string()));
            }
        }

        let mut value = serde_json::to_value(object)?;
        value["metadata"]["resourceVersion"] = serde_json::json!((current_version + 1).to_string());
        objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    fn list_objects<K>(&self, namespace: &str, labels: &BTreeMap<String, String>) -> Result<Vec<K>, PlatformError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let kind = kind_of::<K>();
        self.record(LIST, &kind)?;
        let matching: Vec<serde_json::Value> = lock(&self.objects)
            .iter()
            .filter(|(key, _)| key.kind == kind && key.namespace == namespace)
            .filter(|(_, value)| {
                labels
                    .iter()
                    .all(|(k, v)| value["metadata"]["labels"][k].as_str() == Some(v.as_str()))
            })
            .map(|(_, value)| value.clone())
            .collect();
        matching
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(PlatformError::from))
            .collect()
    }

    fn patch_status<K, S>(&self, namespace: &str, name: &str, status: &S) -> Result<K, PlatformError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
        S: Serialize,
    {
        let kind = kind_of::<K>();
        self.record(UPDATE_STATUS, &kind)?;
        let key = ObjectKey::new(&kind, namespace, name);

        let mut objects = lock(&self.objects);
        let existing = objects
            .get_mut(&key)
            .ok_or_else(|| PlatformError::NotFound(key.to_string()))?;
        let next_version = resource_version(existing) + 1;
        existing["status"] = serde_json::to_value(status)?;
        existing["metadata"]["resourceVersion"] = serde_json::json!(next_version.to_string());
        Ok(serde_json::from_value(existing.clone())?)
    }
}

fn resource_version(value: &serde_json::Value) -> u64 {
    value["metadata"]["resourceVersion"]
        .as_str()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[async_trait::async_trait]
impl PlatformClientTrait for MockPlatformClient {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, PlatformError> {
        self.create_object(namespace, secret)
    }

    async fn get_persistent_volume(&self, name: &str) -> Result<PersistentVolume, PlatformError> {
        self.get_object("", name)
    }

    async fn create_persistent_volume(&self, volume: &PersistentVolume) -> Result<PersistentVolume, PlatformError> {
        self.create_object("", volume)
    }

    async fn get_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn create_persistent_volume_claim(&self, namespace: &str, claim: &PersistentVolumeClaim) -> Result<PersistentVolumeClaim, PlatformError> {
        self.create_object(namespace, claim)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, PlatformError> {
        self.create_object(namespace, deployment)
    }

    async fn update_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, PlatformError> {
        self.update_object(namespace, deployment)
    }

    async fn get_stateful_set(&self, namespace: &str, name: &str) -> Result<StatefulSet, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn create_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet) -> Result<StatefulSet, PlatformError> {
        self.create_object(namespace, stateful_set)
    }

    async fn update_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet) -> Result<StatefulSet, PlatformError> {
        self.update_object(namespace, stateful_set)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, PlatformError> {
        self.create_object(namespace, service)
    }

    async fn list_services(&self, namespace: &str, labels: &BTreeMap<String, String>) -> Result<Vec<Service>, PlatformError> {
        self.list_objects(namespace, labels)
    }

    async fn get_cron_job(&self, namespace: &str, name: &str) -> Result<CronJob, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn create_cron_job(&self, namespace: &str, cron_job: &CronJob) -> Result<CronJob, PlatformError> {
        self.create_object(namespace, cron_job)
    }

    async fn update_cron_job(&self, namespace: &str, cron_job: &CronJob) -> Result<CronJob, PlatformError> {
        self.update_object(namespace, cron_job)
    }

    async fn list_pods(&self, namespace: &str, labels: &BTreeMap<String, String>) -> Result<Vec<Pod>, PlatformError> {
        self.list_objects(namespace, labels)
    }

    async fn get_mariadb(&self, namespace: &str, name: &str) -> Result<MariaDB, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn update_mariadb_status(&self, namespace: &str, name: &str, status: &MariaDBStatus) -> Result<MariaDB, PlatformError> {
        self.patch_status(namespace, name, status)
    }

    async fn get_mariadb_cluster(&self, namespace: &str, name: &str) -> Result<MariaDBCluster, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn update_mariadb_cluster_status(&self, namespace: &str, name: &str, status: &MariaDBClusterStatus) -> Result<MariaDBCluster, PlatformError> {
        self.patch_status(namespace, name, status)
    }

    async fn get_monitor(&self, namespace: &str, name: &str) -> Result<Monitor, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn update_monitor_status(&self, namespace: &str, name: &str, status: &MonitorStatus) -> Result<Monitor, PlatformError> {
        self.patch_status(namespace, name, status)
    }

    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Backup, PlatformError> {
        self.get_object(namespace, name)
    }

    async fn update_backup_status(&self, namespace: &str, name: &str, status: &BackupStatus) -> Result<Backup, PlatformError> {
        self.patch_status(namespace, name, status)
    }
}
