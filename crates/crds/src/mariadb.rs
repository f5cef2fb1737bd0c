//! MariaDB CRD
//!
//! A standalone MariaDB server backed by a Deployment, a NodePort Service
//! and a hostPath PersistentVolume.

use crate::credential::Credential;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Standalone MariaDB server
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "mariadb.persistentsys.com",
    version = "v1alpha1",
    kind = "MariaDB",
    plural = "mariadbs",
    shortname = "mdb",
    namespaced,
    status = "MariaDBStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBSpec {
    /// Number of database replicas
    #[serde(default, rename = "size", alias = "replicas")]
    pub replicas: i32,

    /// Application user created on first start
    #[serde(default)]
    pub username: Credential,

    /// Password for the application user
    #[serde(default)]
    pub password: Credential,

    /// Database created on first start
    #[serde(default)]
    pub database: String,

    /// Root password
    #[serde(default, rename = "rootpwd")]
    pub root_password: Credential,

    /// MariaDB container image
    #[serde(default)]
    pub image: String,

    /// Host path backing the PersistentVolume
    #[serde(default)]
    pub data_storage_path: String,

    /// Storage size, as a Kubernetes quantity (e.g. "1Gi")
    #[serde(default)]
    pub data_storage_size: String,

    /// NodePort the database is exposed on
    #[serde(default)]
    pub port: i32,
}

/// Observed state, written by the controller
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBStatus {
    /// Names of the pods running this database, sorted
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_field_maps_to_replicas() {
        let spec: MariaDBSpec = serde_json::from_value(serde_json::json!({
            "size": 2,
            "username": "app",
            "password": "pw",
            "rootpwd": "root",
            "database": "test",
            "image": "mariadb/server:10.3",
            "dataStoragePath": "/mnt/data",
            "dataStorageSize": "1Gi",
            "port": 30685
        }))
        .unwrap();

        assert_eq!(spec.replicas, 2);
        assert_eq!(spec.root_password.expose(), "root");
        assert_eq!(spec.data_storage_size, "1Gi");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let spec: MariaDBSpec = serde_json::from_value(serde_json::json!({ "replicas": 1 })).unwrap();
        assert_eq!(spec.replicas, 1);
        assert!(spec.image.is_empty());
    }
}
