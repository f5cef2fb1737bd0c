//! Controller configuration, read once from the environment at startup.

use crate::error::ControllerError;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// How peer addresses are written into `gcomm://`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerNameFormat {
    /// Service name only, resolvable from inside the namespace
    #[default]
    Bare,
    /// `<service>.<namespace>`
    Namespaced,
}

impl FromStr for PeerNameFormat {
    type Err = ControllerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bare" => Ok(Self::Bare),
            "namespaced" => Ok(Self::Namespaced),
            other => Err(ControllerError::InvalidConfig(format!(
                "PEER_NAME_FORMAT must be 'bare' or 'namespaced', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PeerNameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare => f.write_str("bare"),
            Self::Namespaced => f.write_str("namespaced"),
        }
    }
}

/// Controller settings read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// How peer Services are written into the cluster address
    pub peer_name_format: PeerNameFormat,
    /// Concurrent reconciliations per watcher
    pub reconcile_concurrency: u16,
    /// Quiet period before a burst of events triggers a pass
    pub reconcile_debounce: Duration,
    /// Requeue delay for a cluster node waiting for its first peer
    pub peer_wait: Duration,
    /// Listen address of the probes/metrics server
    pub metrics_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            peer_name_format: PeerNameFormat::Bare,
            reconcile_concurrency: 3,
            reconcile_debounce: Duration::from_secs(5),
            peer_wait: Duration::from_secs(10),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl Config {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset or blank keys keep defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            namespace: get("WATCH_NAMESPACE"),
            peer_name_format: match get("PEER_NAME_FORMAT") {
                Some(value) => value.parse()?,
                None => defaults.peer_name_format,
            },
            reconcile_concurrency: match get("RECONCILE_CONCURRENCY") {
                Some(value) => parse_number("RECONCILE_CONCURRENCY", &value)?,
                None => defaults.reconcile_concurrency,
            },
            reconcile_debounce: match get("RECONCILE_DEBOUNCE_SECS") {
                Some(value) => Duration::from_secs(parse_number("RECONCILE_DEBOUNCE_SECS", &value)?),
                None => defaults.reconcile_debounce,
            },
            peer_wait: match get("PEER_WAIT_SECS") {
                Some(value) => Duration::from_secs(parse_number("PEER_WAIT_SECS", &value)?),
                None => defaults.peer_wait,
            },
            metrics_addr: match get("METRICS_ADDR") {
                Some(value) => value.trim().parse().map_err(|e| {
                    ControllerError::InvalidConfig(format!("METRICS_ADDR '{}' is not a socket address: {}", value, e))
                })?,
                None => defaults.metrics_addr,
            },
        })
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e| {
        ControllerError::InvalidConfig(format!("{} must be a non-negative integer, got '{}': {}", key, value, e))
    })
}
