//! Deployments and StatefulSets running MariaDB and the metrics exporter.

use super::secret::{PASSWORD_KEY, ROOT_PASSWORD_KEY, USERNAME_KEY};
use super::{DATA_MOUNT_PATH, MARIADB_PORT, owned_meta};
use crate::labels::{self, DATABASE_TIER};
use crate::naming;
use crds::{MariaDB, MariaDBCluster, Monitor};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, PersistentVolumeClaimVolumeSource, PodSpec,
    PodTemplateSpec, SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Container name in the MariaDB Deployment
pub const DATABASE_CONTAINER: &str = "mariadb-service";
/// Container name in the Galera StatefulSet
pub const CLUSTER_CONTAINER: &str = "mariadb-cluster-service";
/// Container name in the exporter Deployment
pub const MONITOR_CONTAINER: &str = "monitor-app";
/// mysqld-exporter metrics port
pub const MONITOR_PORT: i32 = 9104;

const DATA_VOLUME: &str = "mariadb-pv-storage";
const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

/// Galera ports besides the client port: SST, replication, IST
pub const GALERA_PORTS: [(&str, i32); 3] = [
    ("sst-port", 4444),
    ("galera-replication-port", 4567),
    ("ist-port", 4568),
];

pub(crate) fn secret_env(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                optional: None,
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn plain_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn database_env(owner: &str, database: &str) -> Vec<EnvVar> {
    let secret = naming::secret_name(owner);
    vec![
        secret_env("MYSQL_ROOT_PASSWORD", &secret, ROOT_PASSWORD_KEY),
        plain_env("MYSQL_DATABASE", database),
        secret_env("MYSQL_USER", &secret, USERNAME_KEY),
        secret_env("MYSQL_PASSWORD", &secret, PASSWORD_KEY),
    ]
}

fn port(name: &str, container_port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port,
        ..Default::default()
    }
}

pub(crate) fn data_volume(claim_name: String) -> Volume {
    Volume {
        name: DATA_VOLUME.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name,
            read_only: None,
        }),
        ..Default::default()
    }
}

pub(crate) fn data_mount(volume: &str) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: DATA_MOUNT_PATH.to_string(),
        ..Default::default()
    }
}

fn pod_template(labels: BTreeMap<String, String>, spec: PodSpec) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            ..Default::default()
        }),
        spec: Some(spec),
    }
}

fn selector(labels: &BTreeMap<String, String>) -> LabelSelector {
    LabelSelector {
        match_labels: Some(labels.clone()),
        ..Default::default()
    }
}

/// Deployment running a standalone MariaDB
pub fn database_deployment(db: &MariaDB) -> Deployment {
    let name = db.name_any();
    let labels = labels::database_labels(&name, DATABASE_TIER);

    let container = Container {
        name: DATABASE_CONTAINER.to_string(),
        image: Some(db.spec.image.clone()),
        image_pull_policy: Some("Always".to_string()),
        ports: Some(vec![port("mariadb", MARIADB_PORT)]),
        env: Some(database_env(&name, &db.spec.database)),
        volume_mounts: Some(vec![data_mount(DATA_VOLUME)]),
        ..Default::default()
    };

    Deployment {
        metadata: owned_meta(db, naming::database_deployment_name(&name), db.namespace(), labels.clone()),
        spec: Some(DeploymentSpec {
            replicas: Some(db.spec.replicas),
            selector: selector(&labels),
            template: pod_template(
                labels,
                PodSpec {
                    containers: vec![container],
                    volumes: Some(vec![data_volume(naming::volume_claim_name(&name))]),
                    ..Default::default()
                },
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Single-replica StatefulSet pinned to the node's host; `args` are the wsrep
/// launch arguments, empty when replication is disabled
pub fn cluster_stateful_set(node: &MariaDBCluster, args: Vec<String>) -> StatefulSet {
    let name = node.name_any();
    let labels = labels::cluster_node_labels(&name);

    let mut ports = vec![port("mariadb-port", MARIADB_PORT)];
    ports.extend(GALERA_PORTS.iter().map(|(port_name, number)| port(port_name, *number)));

    let container = Container {
        name: CLUSTER_CONTAINER.to_string(),
        image: Some(node.spec.image.clone()),
        image_pull_policy: Some("Always".to_string()),
        args: (!args.is_empty()).then_some(args),
        ports: Some(ports),
        env: Some(database_env(&name, &node.spec.database)),
        volume_mounts: Some(vec![data_mount(DATA_VOLUME)]),
        ..Default::default()
    };

    StatefulSet {
        metadata: owned_meta(node, naming::stateful_set_name(&name), node.namespace(), labels.clone()),
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            service_name: Some(naming::service_name(&name)),
            selector: selector(&labels),
            template: pod_template(
                labels,
                PodSpec {
                    containers: vec![container],
                    node_selector: Some(BTreeMap::from([(
                        HOSTNAME_LABEL.to_string(),
                        node.spec.cluster.node_name.clone(),
                    )])),
                    volumes: Some(vec![data_volume(naming::volume_claim_name(&name))]),
                    ..Default::default()
                },
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Deployment running the metrics exporter
pub fn monitor_deployment(monitor: &Monitor) -> Deployment {
    let name = monitor.name_any();
    let labels = labels::monitor_labels(&name);

    let container = Container {
        name: MONITOR_CONTAINER.to_string(),
        image: Some(monitor.spec.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        ports: Some(vec![port("monitor", MONITOR_PORT)]),
        env: Some(vec![plain_env("DATA_SOURCE_NAME", monitor.spec.data_source_name.expose())]),
        ..Default::default()
    };

    Deployment {
        metadata: owned_meta(monitor, naming::monitor_deployment_name(&name), monitor.namespace(), labels.clone()),
        spec: Some(DeploymentSpec {
            replicas: Some(monitor.spec.size),
            selector: selector(&labels),
            template: pod_template(
                labels,
                PodSpec {
                    containers: vec![container],
                    ..Default::default()
                },
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_cluster_node, create_test_mariadb, create_test_monitor};

    fn first_container(spec: &Option<PodSpec>) -> &Container {
        &spec.as_ref().unwrap().containers[0]
    }

    #[test]
    fn test_database_deployment() {
        let db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        let deployment = database_deployment(&db);

        assert_eq!(deployment.metadata.name.as_deref(), Some("mariadb-server"));
        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.selector.match_labels.as_ref().unwrap()["MariaDB_cr"], "mariadb");

        let container = first_container(&spec.template.spec);
        assert_eq!(container.image.as_deref(), Some("db:10.3"));
        let volumes = spec.template.spec.as_ref().unwrap().volumes.as_ref().unwrap();
        assert_eq!(
            volumes[0].persistent_volume_claim.as_ref().unwrap().claim_name,
            "mariadb-pv-claim"
        );
    }

    #[test]
    fn test_database_env_never_inlines_credentials() {
        let db = create_test_mariadb("mariadb", "db", 1, "db:10.3");
        let deployment = database_deployment(&db);
        let spec = deployment.spec.unwrap();
        let env = first_container(&spec.template.spec).env.clone().unwrap();

        let root = env.iter().find(|var| var.name == "MYSQL_ROOT_PASSWORD").unwrap();
        assert!(root.value.is_none());
        let source = root.value_from.as_ref().unwrap().secret_key_ref.as_ref().unwrap();
        assert_eq!(source.name, "mariadb-auth");
        assert_eq!(source.key, ROOT_PASSWORD_KEY);
    }

    #[test]
    fn test_cluster_stateful_set_pins_node_and_passes_args() {
        let node = create_test_cluster_node("node-1", "db", "galera", true, true);
        let args = vec!["--wsrep-on=ON".to_string()];
        let stateful_set = cluster_stateful_set(&node, args.clone());

        assert_eq!(stateful_set.metadata.name.as_deref(), Some("node-1-statefulset"));
        let spec = stateful_set.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(spec.service_name.as_deref(), Some("node-1-service"));

        let pod = spec.template.spec.as_ref().unwrap();
        assert_eq!(pod.node_selector.as_ref().unwrap()[HOSTNAME_LABEL], "worker-node-1");
        assert_eq!(pod.containers[0].args, Some(args));
    }

    #[test]
    fn test_cluster_stateful_set_without_replication_has_no_args() {
        let node = create_test_cluster_node("node-1", "db", "galera", false, true);
        let stateful_set = cluster_stateful_set(&node, Vec::new());
        let spec = stateful_set.spec.unwrap();
        assert!(first_container(&spec.template.spec).args.is_none());
    }

    #[test]
    fn test_monitor_deployment() {
        let monitor = create_test_monitor("exporter", "db", 1);
        let deployment = monitor_deployment(&monitor);

        assert_eq!(deployment.metadata.name.as_deref(), Some("exporter-deployment"));
        let spec = deployment.spec.unwrap();
        let container = first_container(&spec.template.spec);
        assert_eq!(container.name, MONITOR_CONTAINER);
        assert_eq!(container.ports.as_ref().unwrap()[0].container_port, MONITOR_PORT);
    }
}
