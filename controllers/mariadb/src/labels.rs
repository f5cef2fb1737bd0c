//! Label sets shared by builders (object and selector labels) and the
//! fetcher (list selectors).

use std::collections::BTreeMap;

/// Label carried by every headless Service of a Galera cluster; its value is
/// the cluster name
pub const MEMBERSHIP_LABEL: &str = "mariadb.persistentsys.com/cluster";

/// `tier` label of database dependents
pub const DATABASE_TIER: &str = "mariadb";
/// `tier` label of backup dependents
pub const BACKUP_TIER: &str = "mariadb-backup";
/// `tier` label of monitor dependents
pub const MONITOR_TIER: &str = "monitor-app";

fn label_set(pairs: [(&str, &str); 3]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Labels of a standalone MariaDB's objects and pods
pub fn database_labels(name: &str, tier: &str) -> BTreeMap<String, String> {
    label_set([("app", "MariaDB"), ("MariaDB_cr", name), ("tier", tier)])
}

/// Labels of one cluster node's objects and pods
pub fn cluster_node_labels(name: &str) -> BTreeMap<String, String> {
    label_set([("app", "MariaDBCluster"), ("MariaDBCluster_cr", name), ("tier", DATABASE_TIER)])
}

/// Node labels plus the cluster membership label
pub fn cluster_service_labels(name: &str, cluster_name: &str) -> BTreeMap<String, String> {
    let mut labels = cluster_node_labels(name);
    labels.insert(MEMBERSHIP_LABEL.to_string(), cluster_name.to_string());
    labels
}

/// Selector matching every headless Service of a cluster
pub fn membership_selector(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(MEMBERSHIP_LABEL.to_string(), cluster_name.to_string())])
}

/// Labels of a Backup's own volumes
pub fn backup_labels(name: &str) -> BTreeMap<String, String> {
    label_set([("app", "MariaDB-Backup"), ("MariaDB_cr", name), ("tier", BACKUP_TIER)])
}

/// Labels of a Monitor's dependents
pub fn monitor_labels(name: &str) -> BTreeMap<String, String> {
    label_set([("app", "MariaDB-Monitor"), ("Monitor_cr", name), ("tier", MONITOR_TIER)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_labels() {
        let labels = database_labels("mariadb", DATABASE_TIER);
        assert_eq!(labels.get("app").map(String::as_str), Some("MariaDB"));
        assert_eq!(labels.get("MariaDB_cr").map(String::as_str), Some("mariadb"));
        assert_eq!(labels.get("tier").map(String::as_str), Some("mariadb"));
    }

    #[test]
    fn test_cluster_service_labels_include_membership() {
        let labels = cluster_service_labels("node-1", "galera_cluster");
        assert_eq!(labels.get(MEMBERSHIP_LABEL).map(String::as_str), Some("galera_cluster"));

        // every membership selector pair is present on the service labels
        for (key, value) in membership_selector("galera_cluster") {
            assert_eq!(labels.get(&key), Some(&value));
        }
    }

    #[test]
    fn test_node_labels_are_per_node() {
        assert_ne!(cluster_node_labels("node-1"), cluster_node_labels("node-2"));
    }
}
