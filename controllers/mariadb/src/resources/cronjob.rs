//! Scheduled mysqldump of a MariaDB into the backup volume.

use super::secret::ROOT_PASSWORD_KEY;
use super::workload::{data_mount, plain_env, secret_env};
use super::{MARIADB_PORT, owned_meta};
use crate::labels;
use crate::naming;
use crate::validation::BackupSettings;
use crds::Backup;
use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
use k8s_openapi::api::core::v1::{
    Container, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Volume,
};
use kube::ResourceExt;

const BACKUP_VOLUME: &str = "mariadb-bkp-pv-storage";

/// Shell command run by each backup job
pub fn backup_command(service_host: &str, port: i32) -> String {
    format!(
        "echo 'Starting DB Backup' && mysqldump -P {} -h '{}' --lock-tables --all-databases > /var/lib/mysql/backup_`date +%F_%T`.sql && echo 'Completed DB Backup'",
        port, service_host
    )
}

/// CronJob dumping the database `settings.database_ref` with `image`
pub fn backup_cron_job(backup: &Backup, settings: &BackupSettings, image: &str) -> CronJob {
    let name = backup.name_any();
    let namespace = backup.namespace().unwrap_or_default();
    let service_host = format!("{}.{}", naming::service_name(&name), namespace);

    let container = Container {
        name: name.clone(),
        image: Some(image.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
        args: Some(vec![backup_command(&service_host, MARIADB_PORT)]),
        env: Some(vec![
            secret_env(
                "MYSQL_PWD",
                &naming::secret_name(&settings.database_ref),
                ROOT_PASSWORD_KEY,
            ),
            plain_env("USER", "root"),
        ]),
        volume_mounts: Some(vec![data_mount(BACKUP_VOLUME)]),
        ..Default::default()
    };

    let pod = PodSpec {
        containers: vec![container],
        restart_policy: Some("OnFailure".to_string()),
        volumes: Some(vec![Volume {
            name: BACKUP_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: naming::volume_claim_name(&name),
                read_only: None,
            }),
            ..Default::default()
        }]),
        ..Default::default()
    };

    CronJob {
        metadata: owned_meta(
            backup,
            naming::cron_job_name(&name),
            backup.namespace(),
            labels::backup_labels(&name),
        ),
        spec: Some(CronJobSpec {
            schedule: settings.schedule.clone(),
            job_template: JobTemplateSpec {
                metadata: None,
                spec: Some(JobSpec {
                    template: PodTemplateSpec {
                        metadata: None,
                        spec: Some(pod),
                    },
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_backup;
    use crate::validation::validate_backup;

    #[test]
    fn test_backup_command_targets_service() {
        let command = backup_command("nightly-service.db", 3306);
        assert!(command.starts_with("echo 'Starting DB Backup' && mysqldump -P 3306 -h 'nightly-service.db'"));
        assert!(command.ends_with("&& echo 'Completed DB Backup'"));
    }

    #[test]
    fn test_backup_cron_job() {
        let backup = create_test_backup("nightly", "db", "mariadb");
        let settings = validate_backup(&backup.spec).unwrap();
        let cron_job = backup_cron_job(&backup, &settings, "db:10.3");

        assert_eq!(cron_job.metadata.name.as_deref(), Some("nightly"));
        let spec = cron_job.spec.unwrap();
        assert_eq!(spec.schedule, "0 0 * * *");

        let pod = spec.job_template.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("OnFailure"));
        assert_eq!(
            pod.volumes.unwrap()[0].persistent_volume_claim.as_ref().unwrap().claim_name,
            "nightly-pv-claim"
        );

        let container = &pod.containers[0];
        assert_eq!(container.image.as_deref(), Some("db:10.3"));
        let password = &container.env.as_ref().unwrap()[0];
        assert_eq!(password.name, "MYSQL_PWD");
        assert_eq!(
            password.value_from.as_ref().unwrap().secret_key_ref.as_ref().unwrap().name,
            "mariadb-auth"
        );
    }
}
