use std::collections::HashMap;
use std::env;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config as HierarchicalConfig, Environment};
use log::debug;
use serde::{Deserialize, Serialize};
use storefront_catalog::{CatalogClientConfig, DEFAULT_CATALOG_URL};

/// Name of the storefront config directory
const STOREFRONT_DIR_NAME: &str = "storefront";
const STOREFRONT_CONFIG_DIR_VAR: &str = "STOREFRONT_CONFIG_DIR";
pub const STOREFRONT_CONFIG_FILE: &str = "storefront.toml";
const ENV_PREFIX: &str = "STOREFRONT_";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Base URL of the product catalog
    pub catalog_url: String,
    /// How many products a listing page shows
    pub page_size: NonZeroUsize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Overrides the user agent sent to the catalog
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Config {
    /// Read the configuration from files and `STOREFRONT_*` variables.
    ///
    /// Later sources override earlier ones:
    /// built-in defaults, `/etc/storefront/storefront.toml`,
    /// the user config file, then the environment.
    pub fn parse() -> Result<Config> {
        let config_dir = match env::var(STOREFRONT_CONFIG_DIR_VAR) {
            Ok(dir) => {
                debug!("`${STOREFRONT_CONFIG_DIR_VAR}` set: {dir}");
                Some(PathBuf::from(dir))
            },
            Err(_) => {
                let dir = dirs::config_dir().map(|dir| dir.join(STOREFRONT_DIR_NAME));
                debug!("`${STOREFRONT_CONFIG_DIR_VAR}` not set, using {dir:?}");
                dir
            },
        };

        let system_file = Path::new("/etc")
            .join(STOREFRONT_DIR_NAME)
            .join(STOREFRONT_CONFIG_FILE);
        let user_file = config_dir.map(|dir| dir.join(STOREFRONT_CONFIG_FILE));

        Self::from_sources(&system_file, user_file.as_deref(), env::vars())
    }

    fn from_sources(
        system_file: &Path,
        user_file: Option<&Path>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Config> {
        let mut builder = HierarchicalConfig::builder()
            .set_default("catalog_url", DEFAULT_CATALOG_URL)?
            .set_default("page_size", 12_i64)?
            .set_default("connect_timeout_secs", 15_i64)?
            .set_default("request_timeout_secs", 60_i64)?;

        builder = builder.add_source(
            config::File::from(system_file)
                .format(config::FileFormat::Toml)
                .required(false),
        );

        if let Some(user_file) = user_file {
            debug!("reading user config from {}", user_file.display());
            builder = builder.add_source(
                config::File::from(user_file)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        // override via env variables
        let storefront_envs = vars
            .into_iter()
            .filter_map(|(k, v)| k.strip_prefix(ENV_PREFIX).map(|k| (k.to_lowercase(), v)))
            .collect::<HashMap<_, _>>();
        builder = builder.add_source(
            Environment::default()
                .source(Some(storefront_envs))
                .try_parsing(true),
        );

        let config: Config = builder
            .build()?
            .try_deserialize()
            .context("Could not parse config")?;
        debug!("using config: {config:?}");
        Ok(config)
    }

    /// Catalog client settings derived from this configuration.
    pub fn catalog_client_config(&self) -> CatalogClientConfig {
        CatalogClientConfig {
            catalog_url: self.catalog_url.clone(),
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..CatalogClientConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn no_vars() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn defaults_without_sources() {
        let tempdir = TempDir::new().unwrap();
        let config = Config::from_sources(
            &tempdir.path().join("missing.toml"),
            None,
            no_vars(),
        )
        .unwrap();

        assert_eq!(config, Config {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            page_size: NonZeroUsize::new(12).unwrap(),
            connect_timeout_secs: 15,
            request_timeout_secs: 60,
            user_agent: None,
        });
    }

    #[test]
    fn user_file_overrides_system_file() {
        let tempdir = TempDir::new().unwrap();
        let system_file = tempdir.path().join("system.toml");
        let user_file = tempdir.path().join("user.toml");
        fs::write(&system_file, "catalog_url = \"https://system.example\"\npage_size = 24\n")
            .unwrap();
        fs::write(&user_file, "catalog_url = \"https://user.example\"\n").unwrap();

        let config = Config::from_sources(&system_file, Some(&user_file), no_vars()).unwrap();

        assert_eq!(config.catalog_url, "https://user.example");
        assert_eq!(config.page_size.get(), 24);
    }

    #[test]
    fn environment_overrides_files() {
        let tempdir = TempDir::new().unwrap();
        let user_file = tempdir.path().join("user.toml");
        fs::write(&user_file, "request_timeout_secs = 5\n").unwrap();

        let config = Config::from_sources(
            &tempdir.path().join("missing.toml"),
            Some(&user_file),
            [
                ("STOREFRONT_REQUEST_TIMEOUT_SECS".to_string(), "9".to_string()),
                ("STOREFRONT_USER_AGENT".to_string(), "storefront-test".to_string()),
                ("CATALOG_URL".to_string(), "https://unprefixed.example".to_string()),
            ],
        )
        .unwrap();

        assert_eq!(config.request_timeout_secs, 9);
        assert_eq!(config.user_agent.as_deref(), Some("storefront-test"));
        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let tempdir = TempDir::new().unwrap();
        let result = Config::from_sources(
            &tempdir.path().join("missing.toml"),
            None,
            [("STOREFRONT_PAGE_SIZE".to_string(), "0".to_string())],
        );
        assert!(result.is_err());
    }

    #[test]
    fn parse_reads_config_dir_from_environment() {
        let tempdir = TempDir::new().unwrap();
        fs::write(
            tempdir.path().join(STOREFRONT_CONFIG_FILE),
            "catalog_url = \"https://catalog.example\"\n",
        )
        .unwrap();

        let config = temp_env::with_vars(
            [
                (STOREFRONT_CONFIG_DIR_VAR, Some(tempdir.path().as_os_str())),
                ("STOREFRONT_CATALOG_URL", None),
                ("STOREFRONT_PAGE_SIZE", None),
            ],
            Config::parse,
        )
        .unwrap();

        assert_eq!(config.catalog_url, "https://catalog.example");
    }

    #[test]
    fn client_config_carries_timeouts() {
        let config = Config {
            catalog_url: "https://catalog.example".to_string(),
            page_size: NonZeroUsize::new(12).unwrap(),
            connect_timeout_secs: 3,
            request_timeout_secs: 30,
            user_agent: Some("storefront-test".to_string()),
        };

        let client_config = config.catalog_client_config();

        assert_eq!(client_config.catalog_url, "https://catalog.example");
        assert_eq!(client_config.connect_timeout, Duration::from_secs(3));
        assert_eq!(client_config.request_timeout, Duration::from_secs(30));
        assert_eq!(client_config.user_agent.as_deref(), Some("storefront-test"));
        assert!(client_config.extra_headers.is_empty());
    }
}
