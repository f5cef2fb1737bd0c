//! Test utilities for unit testing reconcilers
//!
//! Builders for desired-state objects and a reconciler wired to
//! `MockPlatformClient`.

#[cfg(test)]
use crate::config::Config;
#[cfg(test)]
use crate::metrics::Metrics;
#[cfg(test)]
use crate::reconciler::Reconciler;
#[cfg(test)]
use crds::*;
#[cfg(test)]
use k8s_openapi::api::core::v1::Pod;
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use platform_client::MockPlatformClient;
#[cfg(test)]
use std::collections::BTreeMap;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
fn test_metadata(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        uid: Some(format!("{}-uid", name)),
        ..Default::default()
    }
}

/// Valid MariaDB spec exposed on NodePort 30685
#[cfg(test)]
pub fn mariadb_spec(replicas: i32, image: &str) -> MariaDBSpec {
    MariaDBSpec {
        replicas,
        username: Credential::from("app"),
        password: Credential::from("app-secret"),
        database: "test-db".to_string(),
        root_password: Credential::from("root-secret"),
        image: image.to_string(),
        data_storage_path: "/mnt/data".to_string(),
        data_storage_size: "1Gi".to_string(),
        port: 30685,
    }
}

/// Valid cluster node spec; `cluster.name` is left unset
#[cfg(test)]
pub fn mariadb_cluster_spec(enabled: bool, first_node: bool, node_name: &str) -> MariaDBClusterSpec {
    MariaDBClusterSpec {
        username: Credential::from("app"),
        password: Credential::from("app-secret"),
        database: "test-db".to_string(),
        root_password: Credential::from("root-secret"),
        image: "mariadb/server:10.3".to_string(),
        data_storage_path: "/mnt/galera".to_string(),
        data_storage_size: "1Gi".to_string(),
        port: 3306,
        cluster: ClusterDefinition {
            enabled,
            first_node,
            node_name: node_name.to_string(),
            name: None,
        },
    }
}

/// Helper to create test MariaDB CRD
#[cfg(test)]
pub fn create_test_mariadb(name: &str, namespace: &str, replicas: i32, image: &str) -> MariaDB {
    MariaDB {
        metadata: test_metadata(name, namespace),
        spec: mariadb_spec(replicas, image),
        status: None,
    }
}

/// Helper to create a cluster node scheduled on host `worker-<name>`
#[cfg(test)]
pub fn create_test_cluster_node(
    name: &str,
    namespace: &str,
    cluster_name: &str,
    enabled: bool,
    first_node: bool,
) -> MariaDBCluster {
    let mut spec = mariadb_cluster_spec(enabled, first_node, &format!("worker-{}", name));
    spec.cluster.name = Some(cluster_name.to_string());
    MariaDBCluster {
        metadata: test_metadata(name, namespace),
        spec,
        status: None,
    }
}

/// Helper to create test Monitor CRD
#[cfg(test)]
pub fn create_test_monitor(name: &str, namespace: &str, size: i32) -> Monitor {
    Monitor {
        metadata: test_metadata(name, namespace),
        spec: MonitorSpec {
            size,
            image: "prom/mysqld-exporter:v0.12.1".to_string(),
            data_source_name: Credential::from("root:root-secret@(mariadb-service:3306)/"),
        },
        status: None,
    }
}

/// Helper to create a Backup with default schedule and path
#[cfg(test)]
pub fn create_test_backup(name: &str, namespace: &str, database_ref: &str) -> Backup {
    Backup {
        metadata: test_metadata(name, namespace),
        spec: BackupSpec {
            schedule: None,
            backup_path: None,
            backup_size: "1Gi".to_string(),
            database_ref: Some(database_ref.to_string()),
        },
        status: None,
    }
}

/// Helper to create a running pod carrying `labels`
#[cfg(test)]
pub fn create_test_pod(name: &str, namespace: &str, labels: BTreeMap<String, String>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Helper to create a reconciler sharing `client`'s store
#[cfg(test)]
pub fn create_test_reconciler(client: &MockPlatformClient) -> Reconciler {
    create_test_reconciler_with_config(client, Config::default())
}

#[cfg(test)]
pub fn create_test_reconciler_with_config(client: &MockPlatformClient, config: Config) -> Reconciler {
    let metrics = Arc::new(Metrics::new().expect("metrics registry"));
    Reconciler::new(Box::new(client.clone()), config, metrics)
}
