//! Deterministic names of dependent objects.
//!
//! Builders, the fetcher and the membership builder all derive names from
//! these functions, so a Service created by one pass is recognised as "self"
//! by the next.

/// Credentials Secret
pub fn secret_name(owner: &str) -> String {
    format!("{}-auth", owner)
}

/// PersistentVolumes are cluster scoped, so the namespace is part of the name
pub fn volume_name(owner: &str, namespace: &str) -> String {
    format!("{}-{}-pv", owner, namespace)
}

/// Data PersistentVolumeClaim
pub fn volume_claim_name(owner: &str) -> String {
    format!("{}-pv-claim", owner)
}

/// MariaDB Deployment
pub fn database_deployment_name(owner: &str) -> String {
    format!("{}-server", owner)
}

/// Service of a MariaDB, a cluster node (headless), a Monitor or a Backup
pub fn service_name(owner: &str) -> String {
    format!("{}-service", owner)
}

/// Galera node StatefulSet
pub fn stateful_set_name(owner: &str) -> String {
    format!("{}-statefulset", owner)
}

/// Exporter Deployment
pub fn monitor_deployment_name(owner: &str) -> String {
    format!("{}-deployment", owner)
}

/// Backup CronJob
pub fn cron_job_name(backup: &str) -> String {
    backup.to_string()
}
