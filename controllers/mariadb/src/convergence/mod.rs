//! Convergence engine
//!
//! Drives one dependent object toward its desired snapshot: create it when
//! absent, otherwise copy the kind's mutable-field whitelist onto the live
//! object when any of those fields drifted. Fields outside the whitelist
//! (assigned clusterIPs, volume bindings) are never written after creation.
//! StatefulSet container args are not compared but are refreshed whenever
//! the StatefulSet is updated.
//!
//! A live object whose controller owner differs from the desired one is
//! never adopted or modified.

pub mod adapters;

use crate::error::ControllerError;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use platform_client::{PlatformClientTrait, PlatformError};
use std::fmt;
use tracing::{debug, info, warn};

/// What `ensure` did to the live object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The object was absent and has been created
    Created,
    /// A whitelisted field drifted and the object was updated
    Updated,
    /// The live object already matched
    Unchanged,
}

impl Outcome {
    /// Metric label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind access to the platform plus the kind's mutable-field whitelist.
///
/// Kinds without mutable fields keep the defaults and are only ever created.
#[async_trait]
pub trait DependentKind: Send + Sync {
    /// Platform type of the dependent
    type Object: Resource<DynamicType = ()> + Clone + Send + Sync + 'static;

    /// Kind name for logs and errors
    const KIND: &'static str;

    /// Read the live object
    async fn fetch(
        &self,
        client: &dyn PlatformClientTrait,
        namespace: &str,
        name: &str,
    ) -> Result<Self::Object, PlatformError>;

    /// Create the desired object
    async fn create(
        &self,
        client: &dyn PlatformClientTrait,
        namespace: &str,
        desired: &Self::Object,
    ) -> Result<Self::Object, PlatformError>;

    /// Write back a live object carrying the desired whitelisted fields
    async fn update(
        &self,
        _client: &dyn PlatformClientTrait,
        _namespace: &str,
        _live: &Self::Object,
    ) -> Result<Self::Object, PlatformError> {
        Err(PlatformError::InvalidRequest(format!(
            "{} has no mutable fields",
            Self::KIND
        )))
    }

    /// Whether any whitelisted field drifted
    fn mutable_fields_differ(&self, _live: &Self::Object, _desired: &Self::Object) -> bool {
        false
    }

    /// Copy the whitelisted fields from `desired` onto `live`
    fn apply_mutable_fields(&self, _live: &mut Self::Object, _desired: &Self::Object) {}
}

fn controller_uid(meta: &ObjectMeta) -> Option<&str> {
    meta.owner_references
        .as_ref()?
        .iter()
        .find(|reference| reference.controller == Some(true))
        .map(|reference| reference.uid.as_str())
}

/// Converge the live object named by `desired` onto `desired`.
///
/// Issues at most one create or one update. A create racing another writer
/// (`AlreadyExists`) falls through to the update-or-noop path.
pub async fn ensure<K>(
    kind: &K,
    client: &dyn PlatformClientTrait,
    desired: &K::Object,
) -> Result<Outcome, ControllerError>
where
    K: DependentKind,
{
    let name = desired.meta().name.clone().unwrap_or_default();
    let namespace = desired.meta().namespace.clone().unwrap_or_default();
    let fetch_error = |source| ControllerError::Fetch {
        kind: K::KIND,
        name: name.clone(),
        source,
    };
    let apply_error = |source| ControllerError::Apply {
        kind: K::KIND,
        name: name.clone(),
        source,
    };

    let live = match kind.fetch(client, &namespace, &name).await {
        Ok(live) => live,
        Err(e) if e.is_not_found() => match kind.create(client, &namespace, desired).await {
            Ok(_) => {
                info!("Created {} {}", K::KIND, name);
                return Ok(Outcome::Created);
            }
            Err(e) if e.is_already_exists() => {
                debug!("{} {} appeared concurrently, re-reading", K::KIND, name);
                kind.fetch(client, &namespace, &name).await.map_err(fetch_error)?
            }
            Err(e) => return Err(apply_error(e)),
        },
        Err(e) => return Err(fetch_error(e)),
    };

    let owner = controller_uid(desired.meta());
    if owner.is_some() && controller_uid(live.meta()) != owner {
        warn!("{} {} exists but is controlled by another owner", K::KIND, name);
        return Err(apply_error(PlatformError::Conflict(format!(
            "{} {} is controlled by another owner",
            K::KIND,
            name
        ))));
    }

    if !kind.mutable_fields_differ(&live, desired) {
        debug!("{} {} is up to date", K::KIND, name);
        return Ok(Outcome::Unchanged);
    }

    let mut updated = live;
    kind.apply_mutable_fields(&mut updated, desired);
    kind.update(client, &namespace, &updated).await.map_err(apply_error)?;
    info!("Updated {} {}", K::KIND, name);
    Ok(Outcome::Updated)
}
