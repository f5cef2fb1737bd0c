//! Services exposing MariaDB pods, cluster nodes, the exporter and the
//! backup endpoint.

use super::workload::{GALERA_PORTS, MONITOR_PORT};
use super::{MARIADB_PORT, owned_meta};
use crate::labels::{self, BACKUP_TIER, DATABASE_TIER};
use crate::naming;
use crds::{Backup, MariaDB, MariaDBCluster, Monitor};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

fn service_port(name: &str, port: i32, target: i32, node_port: Option<i32>) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(target)),
        node_port,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

fn service<K>(
    owner: &K,
    labels: BTreeMap<String, String>,
    selector: BTreeMap<String, String>,
    spec: ServiceSpec,
) -> Service
where
    K: Resource<DynamicType = ()>,
{
    Service {
        metadata: owned_meta(owner, naming::service_name(&owner.name_any()), owner.namespace(), labels),
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ..spec
        }),
        ..Default::default()
    }
}

/// NodePort Service exposing a standalone MariaDB on `spec.port`
pub fn database_service(db: &MariaDB) -> Service {
    let labels = labels::database_labels(&db.name_any(), DATABASE_TIER);
    service(
        db,
        labels.clone(),
        labels,
        ServiceSpec {
            type_: Some("NodePort".to_string()),
            ports: Some(vec![service_port("mariadb", MARIADB_PORT, MARIADB_PORT, Some(db.spec.port))]),
            ..Default::default()
        },
    )
}

/// Headless Service of one Galera node, labeled for peer discovery
pub fn cluster_headless_service(node: &MariaDBCluster) -> Service {
    let name = node.name_any();
    let client_port = if node.spec.port > 0 { node.spec.port } else { MARIADB_PORT };

    let mut ports = vec![service_port("mariadb-port", client_port, MARIADB_PORT, None)];
    ports.extend(
        GALERA_PORTS
            .iter()
            .map(|(port_name, number)| service_port(port_name, *number, *number, None)),
    );

    service(
        node,
        labels::cluster_service_labels(&name, node.spec.cluster.cluster_name()),
        labels::cluster_node_labels(&name),
        ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            cluster_ip: Some("None".to_string()),
            publish_not_ready_addresses: Some(true),
            ports: Some(ports),
            ..Default::default()
        },
    )
}

/// NodePort Service exposing the exporter
pub fn monitor_service(monitor: &Monitor) -> Service {
    let labels = labels::monitor_labels(&monitor.name_any());
    service(
        monitor,
        labels.clone(),
        labels,
        ServiceSpec {
            type_: Some("NodePort".to_string()),
            ports: Some(vec![service_port("monitor", MONITOR_PORT, MONITOR_PORT, None)]),
            ..Default::default()
        },
    )
}

/// In-cluster Service the backup job dumps through; selects the pods of the
/// referenced database
pub fn backup_service(backup: &Backup, database: &str) -> Service {
    service(
        backup,
        labels::database_labels(database, BACKUP_TIER),
        labels::database_labels(database, DATABASE_TIER),
        ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            ports: Some(vec![service_port("mariadb", MARIADB_PORT, MARIADB_PORT, None)]),
            ..Default::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::MEMBERSHIP_LABEL;
    use crate::test_utils::{create_test_backup, create_test_cluster_node, create_test_mariadb};

    #[test]
    fn test_database_service_exposes_node_port() {
        let db = create_test_mariadb("mariadb", "db", 1, "db:10.3");
        let service = database_service(&db);

        assert_eq!(service.metadata.name.as_deref(), Some("mariadb-service"));
        let spec = service.spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("NodePort"));
        let port = &spec.ports.unwrap()[0];
        assert_eq!(port.port, MARIADB_PORT);
        assert_eq!(port.node_port, Some(30685));
    }

    #[test]
    fn test_headless_service_carries_membership_label() {
        let node = create_test_cluster_node("node-1", "db", "galera", true, true);
        let service = cluster_headless_service(&node);

        assert_eq!(service.metadata.name.as_deref(), Some("node-1-service"));
        let labels = service.metadata.labels.unwrap();
        assert_eq!(labels[MEMBERSHIP_LABEL], "galera");

        let spec = service.spec.unwrap();
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        assert!(!spec.selector.unwrap().contains_key(MEMBERSHIP_LABEL));
        let ports: Vec<i32> = spec.ports.unwrap().iter().map(|port| port.port).collect();
        assert_eq!(ports, vec![3306, 4444, 4567, 4568]);
    }

    #[test]
    fn test_backup_service_selects_database_pods() {
        let backup = create_test_backup("nightly", "db", "mariadb");
        let service = backup_service(&backup, "mariadb");

        assert_eq!(service.metadata.name.as_deref(), Some("nightly-service"));
        assert_eq!(service.metadata.owner_references.unwrap()[0].kind, "Backup");
        let spec = service.spec.unwrap();
        assert_eq!(spec.selector.unwrap(), labels::database_labels("mariadb", DATABASE_TIER));
    }
}
