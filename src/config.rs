//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/ithenticate.sqlite"
//!
//! [ithenticate]
//! username = "editor@example.org"
//! password = "secret"
//! api_url = "https://api.ithenticate.com/rpc"
//! folder_number = 1234
//!
//! [files]
//! root = "./files"
//! ```
//!
//! `ITHENTICATE_USERNAME` and `ITHENTICATE_PASSWORD` fill in credentials the
//! file leaves empty.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub ithenticate: IthenticateConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IthenticateConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub api_url: String,
    /// Destination folder for submissions.
    pub folder_number: i64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    #[serde(default = "default_files_root")]
    pub root: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_files_root(),
        }
    }
}

fn default_files_root() -> PathBuf {
    PathBuf::from(".")
}

/// Resolved login data for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub api_url: String,
}

impl IthenticateConfig {
    /// Explicit values win; `None` or empty strings fall back to config.
    pub fn credentials(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        api_url: Option<&str>,
    ) -> Credentials {
        fn pick(explicit: Option<&str>, fallback: &str) -> String {
            match explicit {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => fallback.to_string(),
            }
        }

        Credentials {
            username: pick(username, &self.username),
            password: pick(password, &self.password),
            api_url: pick(api_url, &self.api_url),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    if config.ithenticate.username.is_empty() {
        if let Ok(user) = std::env::var("ITHENTICATE_USERNAME") {
            config.ithenticate.username = user;
        }
    }
    if config.ithenticate.password.is_empty() {
        if let Ok(pass) = std::env::var("ITHENTICATE_PASSWORD") {
            config.ithenticate.password = pass;
        }
    }

    Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.ithenticate.api_url.trim().is_empty() {
        anyhow::bail!("ithenticate.api_url must not be empty");
    }
    url::Url::parse(&config.ithenticate.api_url).with_context(|| {
        format!(
            "ithenticate.api_url is not a valid URL: {}",
            config.ithenticate.api_url
        )
    })?;

    if config.ithenticate.folder_number <= 0 {
        anyhow::bail!("ithenticate.folder_number must be > 0");
    }

    if config.ithenticate.timeout_secs == 0 {
        anyhow::bail!("ithenticate.timeout_secs must be > 0");
    }

    Ok(config)
}
