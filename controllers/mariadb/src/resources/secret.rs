//! Credentials Secret shared by MariaDB and MariaDBCluster pods.

use super::owned_meta;
use crate::naming;
use crds::Credential;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

/// Secret key of the application user
pub const USERNAME_KEY: &str = "username";
/// Secret key of the application password
pub const PASSWORD_KEY: &str = "password";
/// Secret key of the root password
pub const ROOT_PASSWORD_KEY: &str = "rootpwd";

/// Credentials copied from the desired-state object; never generated
#[derive(Debug, Clone, Copy)]
pub struct AuthCredentials<'a> {
    /// Application user
    pub username: &'a Credential,
    /// Application password
    pub password: &'a Credential,
    /// Root password
    pub root_password: &'a Credential,
}

/// Opaque `<name>-auth` Secret holding the credentials
pub fn auth_secret<K>(owner: &K, credentials: AuthCredentials<'_>, labels: BTreeMap<String, String>) -> Secret
where
    K: Resource<DynamicType = ()>,
{
    let bytes = |credential: &Credential| ByteString(credential.expose().as_bytes().to_vec());
    let data = BTreeMap::from([
        (USERNAME_KEY.to_string(), bytes(credentials.username)),
        (PASSWORD_KEY.to_string(), bytes(credentials.password)),
        (ROOT_PASSWORD_KEY.to_string(), bytes(credentials.root_password)),
    ]);

    Secret {
        metadata: owned_meta(owner, naming::secret_name(&owner.name_any()), owner.namespace(), labels),
        type_: Some("Opaque".to_string()),
        data: Some(data),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{DATABASE_TIER, database_labels};
    use crate::test_utils::create_test_mariadb;

    #[test]
    fn test_auth_secret_carries_all_credentials() {
        let db = create_test_mariadb("mariadb", "db", 1, "mariadb/server:10.3");
        let secret = auth_secret(
            &db,
            AuthCredentials {
                username: &db.spec.username,
                password: &db.spec.password,
                root_password: &db.spec.root_password,
            },
            database_labels("mariadb", DATABASE_TIER),
        );

        assert_eq!(secret.metadata.name.as_deref(), Some("mariadb-auth"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("db"));
        let data = secret.data.unwrap();
        assert_eq!(data[USERNAME_KEY].0, b"app".to_vec());
        assert_eq!(data[ROOT_PASSWORD_KEY].0, b"root-secret".to_vec());

        let owner = &secret.metadata.owner_references.unwrap()[0];
        assert_eq!(owner.kind, "MariaDB");
        assert_eq!(owner.controller, Some(true));
    }
}
