//! Unit tests for MariaDB reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::labels::{DATABASE_TIER, database_labels};
    use crate::reconciler::RESYNC_INTERVAL;
    use crate::test_utils::*;
    use crate::validation::ValidationError;
    use crds::MariaDB;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{
        PersistentVolume, PersistentVolumeClaim, Secret, Service,
    };
    use kube_runtime::controller::Action;
    use platform_client::{MockPlatformClient, PlatformError};

    #[tokio::test]
    async fn test_reconcile_mariadb_creates_dependents() {
        let client = MockPlatformClient::new();
        let db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        client.insert(&db);
        let reconciler = create_test_reconciler(&client);

        let action = reconciler.reconcile_mariadb(&db).await.unwrap();

        assert_eq!(action, Action::requeue(RESYNC_INTERVAL));
        assert!(client.stored::<Secret>("db", "mariadb-auth").is_some());
        assert!(client.stored::<PersistentVolume>("", "mariadb-db-pv").is_some());
        assert!(client.stored::<PersistentVolumeClaim>("db", "mariadb-pv-claim").is_some());
        assert!(client.stored::<Deployment>("db", "mariadb-server").is_some());
        assert!(client.stored::<Service>("db", "mariadb-service").is_some());
    }

    #[tokio::test]
    async fn test_reconcile_mariadb_is_idempotent() {
        let client = MockPlatformClient::new();
        let db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        client.insert(&db);
        let reconciler = create_test_reconciler(&client);

        reconciler.reconcile_mariadb(&db).await.unwrap();
        reconciler.reconcile_mariadb(&db).await.unwrap();

        for kind in ["Secret", "PersistentVolume", "PersistentVolumeClaim", "Deployment", "Service"] {
            assert_eq!(client.create_count(kind), 1, "{} created more than once", kind);
            assert_eq!(client.count_of(kind), 1);
        }
        assert_eq!(client.update_count("Deployment"), 0);
        assert_eq!(client.status_update_count("MariaDB"), 1);
    }

    #[tokio::test]
    async fn test_reconcile_mariadb_scale_up_updates_deployment() {
        let client = MockPlatformClient::new();
        let db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        client.insert(&db);
        let reconciler = create_test_reconciler(&client);
        reconciler.reconcile_mariadb(&db).await.unwrap();
        assert_eq!(client.create_count("Deployment"), 1);

        let mut scaled: MariaDB = client.stored("db", "mariadb").unwrap();
        scaled.spec.replicas = 3;
        client.insert(&scaled);
        reconciler.reconcile_mariadb(&scaled).await.unwrap();

        assert_eq!(client.create_count("Deployment"), 1);
        assert_eq!(client.update_count("Deployment"), 1);
        let live: Deployment = client.stored("db", "mariadb-server").unwrap();
        let spec = live.spec.unwrap();
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(
            spec.template.spec.unwrap().containers[0].image.as_deref(),
            Some("db:10.3")
        );
    }

    #[tokio::test]
    async fn test_reconcile_mariadb_reads_fresh_spec() {
        let client = MockPlatformClient::new();
        let stale = create_test_mariadb("mariadb", "db", 1, "db:10.3");
        let mut current = stale.clone();
        current.spec.replicas = 4;
        client.insert(&current);
        let reconciler = create_test_reconciler(&client);

        reconciler.reconcile_mariadb(&stale).await.unwrap();

        let live: Deployment = client.stored("db", "mariadb-server").unwrap();
        assert_eq!(live.spec.unwrap().replicas, Some(4));
    }

    #[tokio::test]
    async fn test_reconcile_mariadb_status_lists_sorted_pods() {
        let client = MockPlatformClient::new();
        let db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        client.insert(&db);
        let labels = database_labels("mariadb", DATABASE_TIER);
        client.insert(&create_test_pod("mariadb-server-7d9f-zz", "db", labels.clone()));
        client.insert(&create_test_pod("mariadb-server-7d9f-aa", "db", labels));
        let reconciler = create_test_reconciler(&client);

        reconciler.reconcile_mariadb(&db).await.unwrap();

        let stored: MariaDB = client.stored("db", "mariadb").unwrap();
        assert_eq!(
            stored.status.unwrap().nodes,
            vec!["mariadb-server-7d9f-aa", "mariadb-server-7d9f-zz"]
        );
    }

    #[tokio::test]
    async fn test_reconcile_deleted_mariadb_awaits_change() {
        let client = MockPlatformClient::new();
        let db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        let reconciler = create_test_reconciler(&client);

        let action = reconciler.reconcile_mariadb(&db).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(client.create_count("Secret"), 0);
        assert_eq!(client.create_count("Deployment"), 0);
    }

    #[tokio::test]
    async fn test_reconcile_invalid_mariadb_creates_nothing() {
        let client = MockPlatformClient::new();
        let mut db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        db.spec.port = 80;
        client.insert(&db);
        let reconciler = create_test_reconciler(&client);

        let result = reconciler.reconcile_mariadb(&db).await;

        match result {
            Err(e @ ControllerError::Validation(ValidationError::NodePortOutOfRange(80))) => {
                assert!(e.is_permanent());
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
        assert_eq!(client.create_count("Secret"), 0);
    }

    #[tokio::test]
    async fn test_reconcile_step_failure_stops_pass() {
        let client = MockPlatformClient::new();
        let db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        client.insert(&db);
        client.fail_operation("create", "PersistentVolumeClaim", "quota exceeded");
        let reconciler = create_test_reconciler(&client);

        let result = reconciler.reconcile_mariadb(&db).await;

        assert!(matches!(
            result,
            Err(ControllerError::Apply { kind: "PersistentVolumeClaim", .. })
        ));
        assert_eq!(client.count_of("PersistentVolume"), 1);
        assert_eq!(client.create_count("Deployment"), 0);
        assert_eq!(client.status_update_count("MariaDB"), 0);
    }

    #[tokio::test]
    async fn test_reconcile_status_write_failure_fails_pass() {
        let client = MockPlatformClient::new();
        let db = create_test_mariadb("mariadb", "db", 2, "db:10.3");
        client.insert(&db);
        client.fail_operation("update_status", "MariaDB", "conflict");
        let reconciler = create_test_reconciler(&client);

        let result = reconciler.reconcile_mariadb(&db).await;

        assert!(matches!(result, Err(ControllerError::StatusUpdate(_))));
    }

    #[test]
    fn test_step_error_with_deleted_owner_is_benign() {
        let reconciler = create_test_reconciler(&MockPlatformClient::new());
        let error = ControllerError::Apply {
            kind: "Deployment",
            name: "mariadb-server".to_string(),
            source: PlatformError::Api("namespace is terminating".to_string()),
        };

        let refetch: Result<MariaDB, PlatformError> = Err(PlatformError::NotFound("mariadb".to_string()));
        let action = reconciler
            .resolve_step_error("MariaDB", "db", "mariadb", error, refetch)
            .unwrap();
        assert_eq!(action, Action::await_change());
    }

    #[test]
    fn test_step_error_with_live_owner_propagates() {
        let reconciler = create_test_reconciler(&MockPlatformClient::new());
        let error = ControllerError::Apply {
            kind: "Deployment",
            name: "mariadb-server".to_string(),
            source: PlatformError::Api("quota exceeded".to_string()),
        };

        let refetch = Ok(create_test_mariadb("mariadb", "db", 2, "db:10.3"));
        let result = reconciler.resolve_step_error("MariaDB", "db", "mariadb", error, refetch);
        assert!(matches!(result, Err(ControllerError::Apply { .. })));
    }
}
