//! Kubernetes Platform Client
//!
//! Typed access to the Kubernetes objects the MariaDB operator reads and
//! writes: the dependent objects it converges (Secrets, PersistentVolumes,
//! PersistentVolumeClaims, Deployments, StatefulSets, Services, CronJobs),
//! the Pods and Services it observes, and the status of its own CRDs.
//!
//! # Example
//!
//! ```no_run
//! use platform_client::{KubePlatformClient, PlatformClientTrait};
//! use std::collections::BTreeMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubePlatformClient::try_default().await?;
//!
//! let mut labels = BTreeMap::new();
//! labels.insert("app".to_string(), "MariaDB".to_string());
//! let pods = client.list_pods("default", &labels).await?;
//! println!("{} database pods", pods.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **test-util**: enables `MockPlatformClient`, an in-memory implementation
//!   of `PlatformClientTrait` for controller unit tests

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod platform_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{KubePlatformClient, label_selector};
pub use error::PlatformError;
pub use platform_trait::PlatformClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockPlatformClient;
