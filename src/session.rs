//! Assembles a [`RequestWrapper`] from configuration.
//!
//! Logs in to iThenticate, opens the SQLite store, and points the file
//! source at `[files].root`. Every command that talks to the vendor goes
//! through [`open_wrapper`].

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use ithenticate_core::notice::Notifier;
use ithenticate_core::wrapper::RequestWrapper;

use crate::client::XmlRpcClient;
use crate::config::{Config, Credentials};
use crate::db;
use crate::file_source::FsFileSource;
use crate::sqlite_store::SqliteStore;

/// Credential values given on the command line; `None` defers to config.
#[derive(Debug, Default, Clone)]
pub struct CredentialOverrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_url: Option<String>,
}

impl CredentialOverrides {
    pub fn resolve(&self, config: &Config) -> Credentials {
        config.ithenticate.credentials(
            self.username.as_deref(),
            self.password.as_deref(),
            self.api_url.as_deref(),
        )
    }
}

/// Log in and open the SQLite store.
pub async fn open_wrapper(
    config: &Config,
    overrides: &CredentialOverrides,
    notifier: Arc<dyn Notifier>,
) -> Result<RequestWrapper> {
    let credentials = overrides.resolve(config);
    let client = XmlRpcClient::login(&credentials, config.ithenticate.timeout_secs)
        .await
        .with_context(|| format!("Failed to log in to {}", credentials.api_url))?;
    info!(user = %credentials.username, "logged in to iThenticate");

    let pool = db::connect(config).await?;

    Ok(RequestWrapper::new(
        Arc::new(client),
        Arc::new(SqliteStore::new(pool)),
        Arc::new(FsFileSource::new(config.files.root.clone())),
        notifier,
        config.ithenticate.folder_number,
    ))
}

/// Open the SQLite store alone, for commands that never call the vendor.
pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config).await?;
    Ok(SqliteStore::new(pool))
}
