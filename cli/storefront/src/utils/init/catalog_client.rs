use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use storefront_catalog::{CatalogClient, Client, MockClient, STOREFRONT_CATALOG_MOCK_DATA_VAR};
use tracing::debug;

use crate::config::Config;

/// Initialize the catalog client
///
/// - Initialize a mock client if `_STOREFRONT_USE_CATALOG_MOCK` points to a file of mock responses
/// - Initialize a real client otherwise
pub fn init_catalog_client(config: &Config) -> Result<Client> {
    if let Ok(path_str) = std::env::var(STOREFRONT_CATALOG_MOCK_DATA_VAR) {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            bail!("path to mock data file doesn't exist: {}", path.display());
        }

        debug!(mock_data_path = %path.display(), "using mock catalog client");
        let client = MockClient::new(Some(&path))
            .with_context(|| format!("failed to load mock data from {}", path.display()))?;
        return Ok(client.into());
    }

    let client_config = config.catalog_client_config();
    debug!(catalog_url = %client_config.catalog_url, "using catalog client");
    Ok(CatalogClient::new(client_config)?.into())
}
