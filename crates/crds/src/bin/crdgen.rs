//! Prints every CRD as a multi-document YAML stream.
//!
//! `cargo run -p crds --bin crdgen > config/crd/bases/all.yaml`

use crds::{Backup, MariaDB, MariaDBCluster, Monitor};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let crds = [
        MariaDB::crd(),
        MariaDBCluster::crd(),
        Monitor::crd(),
        Backup::crd(),
    ];

    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }

    Ok(())
}
