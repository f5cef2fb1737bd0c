//! Monitor CRD
//!
//! A mysqld exporter deployment pointed at a database through a data source
//! name.

use crate::credential::Credential;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// mysqld-exporter deployment
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "mariadb.persistentsys.com",
    version = "v1alpha1",
    kind = "Monitor",
    plural = "monitors",
    namespaced,
    status = "MonitorStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSpec {
    /// Number of exporter replicas
    #[serde(default)]
    pub size: i32,

    /// Exporter image
    #[serde(default)]
    pub image: String,

    /// DSN the exporter connects with (contains credentials)
    #[serde(default)]
    pub data_source_name: Credential,
}

/// Observed state of a monitor
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    /// Pod names, sorted
    #[serde(default)]
    pub nodes: Vec<String>,
}
