//! hostPath PersistentVolume and its claim.
//!
//! The PV is cluster scoped and bound to the PVC by name through the
//! `manual` storage class, so each owner gets exactly one volume.

use super::{STORAGE_CLASS, owned_meta};
use k8s_openapi::api::core::v1::{
    HostPathVolumeSource, PersistentVolume, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

const ACCESS_MODE: &str = "ReadWriteMany";

fn storage(size: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([("storage".to_string(), Quantity(size.to_string()))])
}

/// hostPath PersistentVolume in the `manual` storage class
pub fn persistent_volume<K>(
    owner: &K,
    name: String,
    host_path: &str,
    size: &str,
    labels: BTreeMap<String, String>,
) -> PersistentVolume
where
    K: Resource<DynamicType = ()>,
{
    PersistentVolume {
        metadata: owned_meta(owner, name, None, labels),
        spec: Some(PersistentVolumeSpec {
            storage_class_name: Some(STORAGE_CLASS.to_string()),
            capacity: Some(storage(size)),
            access_modes: Some(vec![ACCESS_MODE.to_string()]),
            host_path: Some(HostPathVolumeSource {
                path: host_path.to_string(),
                type_: None,
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Claim bound to the named volume
pub fn persistent_volume_claim<K>(
    owner: &K,
    name: String,
    volume_name: String,
    size: &str,
    labels: BTreeMap<String, String>,
) -> PersistentVolumeClaim
where
    K: Resource<DynamicType = ()>,
{
    PersistentVolumeClaim {
        metadata: owned_meta(owner, name, owner.namespace(), labels),
        spec: Some(PersistentVolumeClaimSpec {
            storage_class_name: Some(STORAGE_CLASS.to_string()),
            access_modes: Some(vec![ACCESS_MODE.to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(storage(size)),
                ..Default::default()
            }),
            volume_name: Some(volume_name),
            ..Default::default()
        }),
        ..Default::default()
    }
}
