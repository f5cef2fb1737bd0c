//! Builders for the desired dependent objects.
//!
//! Pure functions: a validated desired-state object in, a complete
//! Kubernetes object out. Every object carries a controller owner reference
//! to the object it was built from.

pub mod cronjob;
pub mod secret;
pub mod services;
pub mod volumes;
pub mod workload;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;
use std::collections::BTreeMap;

/// Port MariaDB listens on inside every pod
pub const MARIADB_PORT: i32 = 3306;
/// Data directory of the MariaDB image; volumes mount here
pub const DATA_MOUNT_PATH: &str = "/var/lib/mysql";
/// Storage class binding our hostPath PVs to our PVCs
pub const STORAGE_CLASS: &str = "manual";

fn owner_references<K>(owner: &K) -> Option<Vec<OwnerReference>>
where
    K: Resource<DynamicType = ()>,
{
    owner.controller_owner_ref(&()).map(|reference| vec![reference])
}

/// Metadata for an object owned by `owner`; `namespace` is `None` for
/// cluster-scoped objects
fn owned_meta<K>(
    owner: &K,
    name: String,
    namespace: Option<String>,
    labels: BTreeMap<String, String>,
) -> ObjectMeta
where
    K: Resource<DynamicType = ()>,
{
    ObjectMeta {
        name: Some(name),
        namespace,
        labels: Some(labels),
        owner_references: owner_references(owner),
        ..Default::default()
    }
}
