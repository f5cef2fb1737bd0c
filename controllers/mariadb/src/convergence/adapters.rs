//! `DependentKind` adapters for every dependent object kind.

use super::DependentKind;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{
    PersistentVolume, PersistentVolumeClaim, PodSpec, PodTemplateSpec, Secret, Service,
};
use platform_client::{PlatformClientTrait, PlatformError};

fn first_image(template: Option<&PodTemplateSpec>) -> Option<&str> {
    template
        .and_then(|template| template.spec.as_ref())
        .and_then(|spec| spec.containers.first())
        .and_then(|container| container.image.as_deref())
}

/// Copy the first container's image, or the whole container list when the
/// live template lost its containers
fn set_first_image(live: &mut PodTemplateSpec, desired: Option<&PodTemplateSpec>) {
    let Some(desired_spec) = desired.and_then(|template| template.spec.as_ref()) else {
        return;
    };
    let live_spec = live.spec.get_or_insert_with(PodSpec::default);
    match (live_spec.containers.first_mut(), desired_spec.containers.first()) {
        (Some(live_container), Some(desired_container)) => {
            live_container.image = desired_container.image.clone();
        }
        (None, Some(_)) => live_spec.containers = desired_spec.containers.clone(),
        _ => {}
    }
}

/// Copy the first container's args; they ride along with an update but never
/// trigger one on their own
fn set_first_args(live: &mut PodTemplateSpec, desired: Option<&PodTemplateSpec>) {
    let desired_args = desired
        .and_then(|template| template.spec.as_ref())
        .and_then(|spec| spec.containers.first())
        .map(|container| container.args.clone());
    let live_container = live.spec.as_mut().and_then(|spec| spec.containers.first_mut());
    if let (Some(live_container), Some(args)) = (live_container, desired_args) {
        live_container.args = args;
    }
}

/// Create-only
pub struct SecretKind;

#[async_trait]
impl DependentKind for SecretKind {
    type Object = Secret;
    const KIND: &'static str = "Secret";

    async fn fetch(&self, client: &dyn PlatformClientTrait, namespace: &str, name: &str) -> Result<Secret, PlatformError> {
        client.get_secret(namespace, name).await
    }

    async fn create(&self, client: &dyn PlatformClientTrait, namespace: &str, desired: &Secret) -> Result<Secret, PlatformError> {
        client.create_secret(namespace, desired).await
    }
}

/// Cluster scoped; the namespace argument is ignored
pub struct PersistentVolumeKind;

#[async_trait]
impl DependentKind for PersistentVolumeKind {
    type Object = PersistentVolume;
    const KIND: &'static str = "PersistentVolume";

    async fn fetch(&self, client: &dyn PlatformClientTrait, _namespace: &str, name: &str) -> Result<PersistentVolume, PlatformError> {
        client.get_persistent_volume(name).await
    }

    async fn create(&self, client: &dyn PlatformClientTrait, _namespace: &str, desired: &PersistentVolume) -> Result<PersistentVolume, PlatformError> {
        client.create_persistent_volume(desired).await
    }
}

/// Create-only
pub struct PersistentVolumeClaimKind;

#[async_trait]
impl DependentKind for PersistentVolumeClaimKind {
    type Object = PersistentVolumeClaim;
    const KIND: &'static str = "PersistentVolumeClaim";

    async fn fetch(&self, client: &dyn PlatformClientTrait, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, PlatformError> {
        client.get_persistent_volume_claim(namespace, name).await
    }

    async fn create(&self, client: &dyn PlatformClientTrait, namespace: &str, desired: &PersistentVolumeClaim) -> Result<PersistentVolumeClaim, PlatformError> {
        client.create_persistent_volume_claim(namespace, desired).await
    }
}

/// Whitelist: `spec.replicas`, first container image
pub struct DeploymentKind;

#[async_trait]
impl DependentKind for DeploymentKind {
    type Object = Deployment;
    const KIND: &'static str = "Deployment";

    async fn fetch(&self, client: &dyn PlatformClientTrait, namespace: &str, name: &str) -> Result<Deployment, PlatformError> {
        client.get_deployment(namespace, name).await
    }

    async fn create(&self, client: &dyn PlatformClientTrait, namespace: &str, desired: &Deployment) -> Result<Deployment, PlatformError> {
        client.create_deployment(namespace, desired).await
    }

    async fn update(&self, client: &dyn PlatformClientTrait, namespace: &str, live: &Deployment) -> Result<Deployment, PlatformError> {
        client.update_deployment(namespace, live).await
    }

    fn mutable_fields_differ(&self, live: &Deployment, desired: &Deployment) -> bool {
        let live = live.spec.as_ref();
        let desired = desired.spec.as_ref();
        live.and_then(|spec| spec.replicas) != desired.and_then(|spec| spec.replicas)
            || first_image(live.map(|spec| &spec.template)) != first_image(desired.map(|spec| &spec.template))
    }

    fn apply_mutable_fields(&self, live: &mut Deployment, desired: &Deployment) {
        let desired = desired.spec.as_ref();
        let spec = live.spec.get_or_insert_with(Default::default);
        spec.replicas = desired.and_then(|spec| spec.replicas);
        set_first_image(&mut spec.template, desired.map(|spec| &spec.template));
    }
}

/// Whitelist: `spec.replicas`, first container image. An update also
/// rewrites the first container's args so a rolled pod starts with the
/// current cluster address.
pub struct StatefulSetKind;

#[async_trait]
impl DependentKind for StatefulSetKind {
    type Object = StatefulSet;
    const KIND: &'static str = "StatefulSet";

    async fn fetch(&self, client: &dyn PlatformClientTrait, namespace: &str, name: &str) -> Result<StatefulSet, PlatformError> {
        client.get_stateful_set(namespace, name).await
    }

    async fn create(&self, client: &dyn PlatformClientTrait, namespace: &str, desired: &StatefulSet) -> Result<StatefulSet, PlatformError> {
        client.create_stateful_set(namespace, desired).await
    }

    async fn update(&self, client: &dyn PlatformClientTrait, namespace: &str, live: &StatefulSet) -> Result<StatefulSet, PlatformError> {
        client.update_stateful_set(namespace, live).await
    }

    fn mutable_fields_differ(&self, live: &StatefulSet, desired: &StatefulSet) -> bool {
        let live = live.spec.as_ref();
        let desired = desired.spec.as_ref();
        live.and_then(|spec| spec.replicas) != desired.and_then(|spec| spec.replicas)
            || first_image(live.map(|spec| &spec.template)) != first_image(desired.map(|spec| &spec.template))
    }

    fn apply_mutable_fields(&self, live: &mut StatefulSet, desired: &StatefulSet) {
        let desired = desired.spec.as_ref();
        let spec = live.spec.get_or_insert_with(Default::default);
        spec.replicas = desired.and_then(|spec| spec.replicas);
        set_first_image(&mut spec.template, desired.map(|spec| &spec.template));
        set_first_args(&mut spec.template, desired.map(|spec| &spec.template));
    }
}

/// Create-only; the assigned clusterIP is never rewritten
pub struct ServiceKind;

#[async_trait]
impl DependentKind for ServiceKind {
    type Object = Service;
    const KIND: &'static str = "Service";

    async fn fetch(&self, client: &dyn PlatformClientTrait, namespace: &str, name: &str) -> Result<Service, PlatformError> {
        client.get_service(namespace, name).await
    }

    async fn create(&self, client: &dyn PlatformClientTrait, namespace: &str, desired: &Service) -> Result<Service, PlatformError> {
        client.create_service(namespace, desired).await
    }
}

/// Whitelist: `spec.schedule`, first container image of the job template
pub struct CronJobKind;

fn job_template(cron_job: &CronJob) -> Option<&PodTemplateSpec> {
    cron_job
        .spec
        .as_ref()
        .and_then(|spec| spec.job_template.spec.as_ref())
        .map(|job| &job.template)
}

#[async_trait]
impl DependentKind for CronJobKind {
    type Object = CronJob;
    const KIND: &'static str = "CronJob";

    async fn fetch(&self, client: &dyn PlatformClientTrait, namespace: &str, name: &str) -> Result<CronJob, PlatformError> {
        client.get_cron_job(namespace, name).await
    }

    async fn create(&self, client: &dyn PlatformClientTrait, namespace: &str, desired: &CronJob) -> Result<CronJob, PlatformError> {
        client.create_cron_job(namespace, desired).await
    }

    async fn update(&self, client: &dyn PlatformClientTrait, namespace: &str, live: &CronJob) -> Result<CronJob, PlatformError> {
        client.update_cron_job(namespace, live).await
    }

    fn mutable_fields_differ(&self, live: &CronJob, desired: &CronJob) -> bool {
        let schedule = |cron_job: &CronJob| cron_job.spec.as_ref().map(|spec| spec.schedule.clone());
        schedule(live) != schedule(desired) || first_image(job_template(live)) != first_image(job_template(desired))
    }

    fn apply_mutable_fields(&self, live: &mut CronJob, desired: &CronJob) {
        let desired_template = job_template(desired);
        let schedule = desired.spec.as_ref().map(|spec| spec.schedule.clone()).unwrap_or_default();
        let spec = live.spec.get_or_insert_with(Default::default);
        spec.schedule = schedule;
        let job = spec.job_template.spec.get_or_insert_with(Default::default);
        set_first_image(&mut job.template, desired_template);
    }
}
