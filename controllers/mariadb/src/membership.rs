//! Galera membership address builder.
//!
//! A node's `gcomm://` address lists the headless Services of every other
//! node carrying the same membership label. An empty list bootstraps a new
//! cluster, so a node that is not `firstNode` must never be launched with it.

use crate::config::PeerNameFormat;
use crate::error::ControllerError;
use crate::fetcher;
use k8s_openapi::api::core::v1::Service;
use platform_client::PlatformClientTrait;
use tracing::debug;

const GALERA_PROVIDER: &str = "/usr/lib/galera/libgalera_smm.so";

/// Cluster address of one node for this pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterAddress {
    /// No peers: start a new cluster
    Bootstrap,
    /// Join through these peers (sorted, unique, never empty)
    Join(Vec<String>),
}

impl ClusterAddress {
    /// Build the address from the cluster's live Services, excluding
    /// `self_service` and Services being deleted
    pub fn from_peers(
        services: &[Service],
        self_service: &str,
        namespace: &str,
        format: PeerNameFormat,
    ) -> Self {
        let mut peers: Vec<String> = services
            .iter()
            .filter(|service| service.metadata.deletion_timestamp.is_none())
            .filter_map(|service| {
                let name = service.metadata.name.as_deref()?;
                if name == self_service {
                    return None;
                }
                Some(match format {
                    PeerNameFormat::Bare => name.to_string(),
                    PeerNameFormat::Namespaced => {
                        let peer_namespace = service.metadata.namespace.as_deref().unwrap_or(namespace);
                        format!("{}.{}", name, peer_namespace)
                    }
                })
            })
            .collect();
        peers.sort();
        peers.dedup();

        if peers.is_empty() {
            Self::Bootstrap
        } else {
            Self::Join(peers)
        }
    }

    /// No peers: this node would form a new cluster
    pub fn is_bootstrap(&self) -> bool {
        matches!(self, Self::Bootstrap)
    }

    /// Galera cluster address, `gcomm://` when bootstrapping
    pub fn gcomm_url(&self) -> String {
        match self {
            Self::Bootstrap => "gcomm://".to_string(),
            Self::Join(peers) => format!("gcomm://{}", peers.join(",")),
        }
    }
}

/// Launch arguments of a replicated node
pub fn wsrep_args(address: &ClusterAddress, cluster_name: &str) -> Vec<String> {
    vec![
        "--wsrep-on=ON".to_string(),
        format!("--wsrep-cluster-address={}", address.gcomm_url()),
        format!("--wsrep-provider={}", GALERA_PROVIDER),
        "--binlog-format=row".to_string(),
        "--default-storage-engine=InnoDB".to_string(),
        "--innodb-autoinc-lock_mode=2".to_string(),
        "--bind-address=0.0.0.0".to_string(),
        format!("--wsrep-cluster-name={}", cluster_name),
    ]
}

/// Query the cluster's Services and build this node's address.
///
/// A failed list is an error, never an empty cluster.
pub async fn discover(
    client: &dyn PlatformClientTrait,
    namespace: &str,
    cluster_name: &str,
    self_service: &str,
    format: PeerNameFormat,
) -> Result<ClusterAddress, ControllerError> {
    let services = fetcher::cluster_services(client, namespace, cluster_name)
        .await
        .map_err(ControllerError::PeerDiscovery)?;
    let address = ClusterAddress::from_peers(&services, self_service, namespace, format);
    debug!(
        "Cluster {} in {}: {} live services, address {}",
        cluster_name,
        namespace,
        services.len(),
        address.gcomm_url()
    );
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::services::cluster_headless_service;
    use crate::test_utils::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use platform_client::MockPlatformClient;

    fn node_service(name: &str, cluster: &str) -> Service {
        cluster_headless_service(&create_test_cluster_node(name, "db", cluster, true, false))
    }

    #[test]
    fn test_self_is_excluded() {
        let services = vec![node_service("c", "galera"), node_service("a", "galera"), node_service("b", "galera")];
        let address = ClusterAddress::from_peers(&services, "b-service", "db", PeerNameFormat::Bare);

        assert_eq!(address, ClusterAddress::Join(vec!["a-service".to_string(), "c-service".to_string()]));
        assert_eq!(address.gcomm_url(), "gcomm://a-service,c-service");
    }

    #[test]
    fn test_only_self_bootstraps() {
        let services = vec![node_service("a", "galera")];
        let address = ClusterAddress::from_peers(&services, "a-service", "db", PeerNameFormat::Bare);

        assert!(address.is_bootstrap());
        assert_eq!(address.gcomm_url(), "gcomm://");
    }

    #[test]
    fn test_namespaced_format() {
        let services = vec![node_service("a", "galera")];
        let address = ClusterAddress::from_peers(&services, "b-service", "db", PeerNameFormat::Namespaced);
        assert_eq!(address.gcomm_url(), "gcomm://a-service.db");
    }

    #[test]
    fn test_terminating_peer_is_skipped() {
        let mut leaving = node_service("a", "galera");
        leaving.metadata.deletion_timestamp = Some(Time(Default::default()));
        let services = vec![leaving, node_service("c", "galera")];

        let address = ClusterAddress::from_peers(&services, "b-service", "db", PeerNameFormat::Bare);
        assert_eq!(address.gcomm_url(), "gcomm://c-service");
    }

    #[test]
    fn test_wsrep_args() {
        let address = ClusterAddress::Join(vec!["a-service".to_string()]);
        let args = wsrep_args(&address, "galera_cluster");

        assert_eq!(args.len(), 8);
        assert_eq!(args[0], "--wsrep-on=ON");
        assert_eq!(args[1], "--wsrep-cluster-address=gcomm://a-service");
        assert_eq!(args[2], "--wsrep-provider=/usr/lib/galera/libgalera_smm.so");
        assert_eq!(args[7], "--wsrep-cluster-name=galera_cluster");
    }

    #[tokio::test]
    async fn test_discover_filters_by_cluster() {
        let client = MockPlatformClient::new();
        client.insert(&node_service("a", "galera"));
        client.insert(&node_service("b", "galera"));
        client.insert(&node_service("x", "other"));

        let address = discover(&client, "db", "galera", "b-service", PeerNameFormat::Bare).await.unwrap();
        assert_eq!(address.gcomm_url(), "gcomm://a-service");
    }

    #[tokio::test]
    async fn test_discover_list_failure_is_not_bootstrap() {
        let client = MockPlatformClient::new();
        client.fail_operation("list", "Service", "apiserver unavailable");

        let result = discover(&client, "db", "galera", "b-service", PeerNameFormat::Bare).await;
        assert!(matches!(result, Err(ControllerError::PeerDiscovery(_))));
    }
}
