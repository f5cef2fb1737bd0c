//! MariaDBCluster CRD
//!
//! One Galera node. Each node of a cluster is its own MariaDBCluster object;
//! nodes find each other through headless Services labeled with the cluster
//! name.

use crate::credential::Credential;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Galera cluster name used when `cluster.name` is not set
pub const DEFAULT_CLUSTER_NAME: &str = "galera_cluster";

/// One Galera cluster node
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "mariadb.persistentsys.com",
    version = "v1alpha1",
    kind = "MariaDBCluster",
    plural = "mariadbclusters",
    shortname = "mdbc",
    namespaced,
    status = "MariaDBClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBClusterSpec {
    /// Application user created on first start
    #[serde(default)]
    pub username: Credential,

    /// Password of `username`
    #[serde(default)]
    pub password: Credential,

    /// Database created on first start
    #[serde(default)]
    pub database: String,

    /// Root password
    #[serde(default, rename = "rootpwd")]
    pub root_password: Credential,

    /// Server image
    #[serde(default)]
    pub image: String,

    /// Host path of the data volume
    #[serde(default)]
    pub data_storage_path: String,

    /// Size of the data volume, as a Kubernetes quantity
    #[serde(default)]
    pub data_storage_size: String,

    /// Port the node listens on inside the cluster
    #[serde(default)]
    pub port: i32,

    /// Galera membership settings
    #[serde(default)]
    pub cluster: ClusterDefinition,
}

/// Galera settings of a node
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDefinition {
    /// Launch with wsrep replication
    #[serde(default)]
    pub enabled: bool,

    /// This node may bootstrap a new cluster when no peers exist
    #[serde(default)]
    pub first_node: bool,

    /// Node identifier within the cluster
    #[serde(default)]
    pub node_name: String,

    /// Galera cluster name (defaults to "galera_cluster")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ClusterDefinition {
    /// Configured cluster name, or the default
    pub fn cluster_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => DEFAULT_CLUSTER_NAME,
        }
    }
}

/// Observed state of a node
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MariaDBClusterStatus {
    /// Pod names, sorted
    #[serde(default)]
    pub nodes: Vec<String>,
}
