//! Read-only queries against the platform.
//!
//! Every call is a fresh read; nothing here caches.

use crate::error::ControllerError;
use crate::labels;
use crds::MariaDB;
use k8s_openapi::api::core::v1::Service;
use platform_client::{PlatformClientTrait, PlatformError, label_selector};
use std::collections::BTreeMap;

/// Turn a NotFound into `None`; any other failure is a fetch error
pub fn optional<T>(result: Result<T, PlatformError>, kind: &'static str, name: &str) -> Result<Option<T>, ControllerError> {
    match result {
        Ok(object) => Ok(Some(object)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(source) => Err(ControllerError::Fetch {
            kind,
            name: name.to_string(),
            source,
        }),
    }
}

/// Names of the pods matching `labels`, sorted
pub async fn pod_names(
    client: &dyn PlatformClientTrait,
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> Result<Vec<String>, ControllerError> {
    let pods = client
        .list_pods(namespace, labels)
        .await
        .map_err(|source| ControllerError::Fetch {
            kind: "Pod",
            name: label_selector(labels),
            source,
        })?;

    let mut names: Vec<String> = pods.into_iter().filter_map(|pod| pod.metadata.name).collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// The MariaDB a Backup points at, if it exists
pub async fn find_database(
    client: &dyn PlatformClientTrait,
    namespace: &str,
    name: &str,
) -> Result<Option<MariaDB>, ControllerError> {
    optional(client.get_mariadb(namespace, name).await, "MariaDB", name)
}

/// First pod, by name, running the standalone database `database`
pub async fn first_database_pod(
    client: &dyn PlatformClientTrait,
    namespace: &str,
    database: &str,
) -> Result<Option<String>, ControllerError> {
    let selector = labels::database_labels(database, labels::DATABASE_TIER);
    Ok(pod_names(client, namespace, &selector).await?.into_iter().next())
}

/// Headless Services of every node of `cluster_name`, including ones being
/// deleted
pub async fn cluster_services(
    client: &dyn PlatformClientTrait,
    namespace: &str,
    cluster_name: &str,
) -> Result<Vec<Service>, PlatformError> {
    client
        .list_services(namespace, &labels::membership_selector(cluster_name))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{DATABASE_TIER, database_labels};
    use crate::test_utils::*;
    use platform_client::MockPlatformClient;

    #[tokio::test]
    async fn test_pod_names_sorted_and_filtered() {
        let client = MockPlatformClient::new();
        let labels = database_labels("mariadb", DATABASE_TIER);
        client.insert(&create_test_pod("mariadb-server-b", "db", labels.clone()));
        client.insert(&create_test_pod("mariadb-server-a", "db", labels.clone()));
        client.insert(&create_test_pod("other", "db", database_labels("other", DATABASE_TIER)));
        client.insert(&create_test_pod("mariadb-server-c", "elsewhere", labels.clone()));

        let names = pod_names(&client, "db", &labels).await.unwrap();
        assert_eq!(names, vec!["mariadb-server-a", "mariadb-server-b"]);
    }

    #[tokio::test]
    async fn test_find_database_missing_is_none() {
        let client = MockPlatformClient::new();
        assert!(find_database(&client, "db", "mariadb").await.unwrap().is_none());

        client.insert(&create_test_mariadb("mariadb", "db", 1, "db:10.3"));
        assert!(find_database(&client, "db", "mariadb").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_database_api_error_is_fetch_error() {
        let client = MockPlatformClient::new();
        client.fail_operation("get", "MariaDB", "connection refused");

        let result = find_database(&client, "db", "mariadb").await;
        assert!(matches!(result, Err(ControllerError::Fetch { kind: "MariaDB", .. })));
    }

    #[tokio::test]
    async fn test_first_database_pod() {
        let client = MockPlatformClient::new();
        assert_eq!(first_database_pod(&client, "db", "mariadb").await.unwrap(), None);

        let labels = database_labels("mariadb", DATABASE_TIER);
        client.insert(&create_test_pod("mariadb-server-z", "db", labels.clone()));
        client.insert(&create_test_pod("mariadb-server-k", "db", labels));
        assert_eq!(
            first_database_pod(&client, "db", "mariadb").await.unwrap().as_deref(),
            Some("mariadb-server-k")
        );
    }
}
