//! MariaDB Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the MariaDB controllers.

pub mod backup;
pub mod credential;
pub mod mariadb;
pub mod mariadb_cluster;
pub mod monitor;

pub use backup::*;
pub use credential::Credential;
pub use mariadb::*;
pub use mariadb_cluster::*;
pub use monitor::*;
