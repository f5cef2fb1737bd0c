//! Validation and defaulting of desired-state objects.
//!
//! Runs before any builder. A spec that fails here is reported once and not
//! retried until it changes; builders can assume every field they read is
//! usable.

use crds::{BackupSpec, Credential, MariaDBClusterSpec, MariaDBSpec, MonitorSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use thiserror::Error;

const NODE_PORT_RANGE: std::ops::RangeInclusive<i32> = 30000..=32767;

/// A spec the operator refuses to act on
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Object has no name, namespace or uid
    #[error("metadata.{0} is missing")]
    MissingMetadata(&'static str),

    /// Required field is blank
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Count below zero
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: i32 },

    /// Not a Kubernetes quantity
    #[error("{field} is not a valid storage quantity: '{value}'")]
    InvalidQuantity { field: &'static str, value: String },

    /// Host path is not absolute
    #[error("{field} must be an absolute path, got '{value}'")]
    RelativePath { field: &'static str, value: String },

    /// NodePort outside the cluster range
    #[error("port {0} is outside the NodePort range 30000-32767")]
    NodePortOutOfRange(i32),

    /// Not a TCP port
    #[error("port {0} is not a valid TCP port")]
    PortOutOfRange(i32),

    /// Not a cron expression or macro
    #[error("schedule '{0}' is not a cron expression")]
    InvalidSchedule(String),

    /// Cluster name unusable as a label value
    #[error("cluster name '{0}' is not a valid label value")]
    InvalidClusterName(String),
}

/// Name and namespace of a stored object. The uid is required too: without
/// it no owner reference can be built.
pub fn object_identity(meta: &ObjectMeta) -> Result<(String, String), ValidationError> {
    let name = meta.name.clone().ok_or(ValidationError::MissingMetadata("name"))?;
    let namespace = meta
        .namespace
        .clone()
        .ok_or(ValidationError::MissingMetadata("namespace"))?;
    if meta.uid.is_none() {
        return Err(ValidationError::MissingMetadata("uid"));
    }
    Ok((name, namespace))
}

/// Check a MariaDB spec
pub fn validate_mariadb(spec: &MariaDBSpec) -> Result<(), ValidationError> {
    non_negative("size", spec.replicas)?;
    credentials(&spec.username, &spec.password, &spec.root_password)?;
    not_empty("database", &spec.database)?;
    not_empty("image", &spec.image)?;
    absolute_path("dataStoragePath", &spec.data_storage_path)?;
    quantity("dataStorageSize", &spec.data_storage_size)?;
    if !NODE_PORT_RANGE.contains(&spec.port) {
        return Err(ValidationError::NodePortOutOfRange(spec.port));
    }
    Ok(())
}

/// Check a cluster node spec
pub fn validate_mariadb_cluster(spec: &MariaDBClusterSpec) -> Result<(), ValidationError> {
    credentials(&spec.username, &spec.password, &spec.root_password)?;
    not_empty("database", &spec.database)?;
    not_empty("image", &spec.image)?;
    absolute_path("dataStoragePath", &spec.data_storage_path)?;
    quantity("dataStorageSize", &spec.data_storage_size)?;
    if !(0..=65535).contains(&spec.port) {
        return Err(ValidationError::PortOutOfRange(spec.port));
    }
    not_empty("cluster.nodeName", &spec.cluster.node_name)?;
    let cluster_name = spec.cluster.cluster_name();
    if !is_label_value(cluster_name) {
        return Err(ValidationError::InvalidClusterName(cluster_name.to_string()));
    }
    Ok(())
}

/// Check a Monitor spec
pub fn validate_monitor(spec: &MonitorSpec) -> Result<(), ValidationError> {
    non_negative("size", spec.size)?;
    not_empty("image", &spec.image)?;
    if spec.data_source_name.is_empty() {
        return Err(ValidationError::Empty("dataSourceName"));
    }
    Ok(())
}

/// Backup spec with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    /// Cron schedule
    pub schedule: String,
    /// Host path of the backup volume
    pub backup_path: String,
    /// Backup volume size
    pub backup_size: String,
    /// MariaDB object to back up
    pub database_ref: String,
}

/// Check a Backup spec and fill in its defaults
pub fn validate_backup(spec: &BackupSpec) -> Result<BackupSettings, ValidationError> {
    let settings = BackupSettings {
        schedule: spec.schedule().trim().to_string(),
        backup_path: spec.backup_path().trim().to_string(),
        backup_size: spec.backup_size.trim().to_string(),
        database_ref: spec.database_ref().trim().to_string(),
    };
    if !is_cron_expression(&settings.schedule) {
        return Err(ValidationError::InvalidSchedule(settings.schedule));
    }
    absolute_path("backupPath", &settings.backup_path)?;
    quantity("backupSize", &settings.backup_size)?;
    Ok(settings)
}

fn not_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

fn non_negative(field: &'static str, value: i32) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

fn credentials(username: &Credential, password: &Credential, root: &Credential) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::Empty("username"));
    }
    if password.is_empty() {
        return Err(ValidationError::Empty("password"));
    }
    if root.is_empty() {
        return Err(ValidationError::Empty("rootpwd"));
    }
    Ok(())
}

fn absolute_path(field: &'static str, value: &str) -> Result<(), ValidationError> {
    not_empty(field, value)?;
    if !value.trim().starts_with('/') {
        return Err(ValidationError::RelativePath {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn quantity(field: &'static str, value: &str) -> Result<(), ValidationError> {
    not_empty(field, value)?;
    if !is_storage_quantity(value.trim()) {
        return Err(ValidationError::InvalidQuantity {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Positive decimal number with an optional binary or decimal SI suffix
/// ("512Mi", "1Gi", "1.5G", "1000")
fn is_storage_quantity(value: &str) -> bool {
    const SUFFIXES: [&str; 13] = ["Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "k", "M", "G", "T", "P", "E", ""];

    SUFFIXES.iter().any(|suffix| {
        value.strip_suffix(suffix).is_some_and(|number| {
            !number.is_empty()
                && number.chars().all(|c| c.is_ascii_digit() || c == '.')
                && number.chars().filter(|c| *c == '.').count() <= 1
                && number.chars().any(|c| c.is_ascii_digit() && c != '0')
        })
    })
}

/// Five whitespace separated fields, or one of the `@` shorthands the
/// CronJob controller accepts
fn is_cron_expression(value: &str) -> bool {
    const MACROS: [&str; 7] = ["@yearly", "@annually", "@monthly", "@weekly", "@daily", "@midnight", "@hourly"];

    if value.starts_with('@') {
        return MACROS.contains(&value);
    }
    let fields: Vec<&str> = value.split_whitespace().collect();
    fields.len() == 5
        && fields.iter().all(|field| {
            field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | '/' | ',' | '-' | '?'))
        })
}

/// Kubernetes label value: at most 63 characters, alphanumerics plus
/// `-`, `_` and `.`, starting and ending with an alphanumeric
fn is_label_value(value: &str) -> bool {
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= 63
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        }
        _ => false,
    }
}
