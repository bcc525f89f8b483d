// SPDX-License-Identifier: Apache-2.0

//! Loads `Parameters` the way `authority_node`'s surrounding binaries load their
//! own node config: defaults, then an optional TOML file, then environment overrides, layered
//! with `figment` rather than hand-rolled merge logic.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use logos_config::{EpochCommittee, Parameters, NUM_DELEGATES};

/// Builds `Parameters` from defaults, an optional TOML file at `config_path`, and any
/// `LOGOS_`-prefixed environment variables, in that increasing order of precedence.
pub fn load_parameters(config_path: Option<&Path>) -> anyhow::Result<Parameters> {
    let mut figment = Figment::new().merge(Serialized::defaults(Parameters::default()));
    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed("LOGOS_"));
    figment
        .extract()
        .map_err(|err| anyhow::anyhow!("failed to load node configuration: {err}"))
}

/// Loads the current epoch's `EpochCommittee` from a TOML file. Committee provisioning itself
/// (election, staking, rotation) is out of scope for this crate; this only covers
/// deserializing the already-elected delegate set a node is handed at startup, the same
/// arm's-length relationship `Parameters` loading has to the rest of node config.
pub fn load_committee(path: &Path) -> anyhow::Result<EpochCommittee> {
    let committee: EpochCommittee = Figment::new()
        .merge(Toml::file(path))
        .extract()
        .map_err(|err| anyhow::anyhow!("failed to load committee from {path:?}: {err}"))?;
    if committee.delegates().count() != NUM_DELEGATES {
        anyhow::bail!(
            "committee file {path:?} must list exactly {NUM_DELEGATES} delegates, found {}",
            committee.delegates().count()
        );
    }
    Ok(committee)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_still_yields_defaults() {
        let parameters = load_parameters(None).unwrap();
        assert_eq!(parameters.bootstrap_connections, 4);
        assert!(parameters.db_path.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logos.toml");
        std::fs::write(&path, "bootstrap_connections = 8\ndb_path = \"/var/lib/logos\"\n").unwrap();

        let parameters = load_parameters(Some(&path)).unwrap();
        assert_eq!(parameters.bootstrap_connections, 8);
        assert_eq!(
            parameters.db_path,
            Some(std::path::PathBuf::from("/var/lib/logos"))
        );
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logos.toml");
        std::fs::write(&path, "bootstrap_connections = 8\n").unwrap();

        std::env::set_var("LOGOS_BOOTSTRAP_CONNECTIONS", "16");
        let parameters = load_parameters(Some(&path)).unwrap();
        std::env::remove_var("LOGOS_BOOTSTRAP_CONNECTIONS");

        assert_eq!(parameters.bootstrap_connections, 16);
    }
}
