// Configuration module: everything the CLI needs to know about its
// environment is read once at startup from environment variables, with
// defaults that work against a local development server.

use anyhow::{Context, Result};
use reqwest::Url;
use std::path::PathBuf;

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub token_path: PathBuf,
    pub ssh_dir: PathBuf,
}

impl Config {
    /// Build the configuration from `PK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        let raw_api = get("PK_API_URL").unwrap_or_else(|| "http://localhost:3001".into());
        let api_url = Url::parse(&raw_api)
            .with_context(|| format!("Invalid PK_API_URL '{}'", raw_api))?;

        let token_url = match get("PK_TOKEN_URL") {
            Some(raw) => {
                Url::parse(&raw).with_context(|| format!("Invalid PK_TOKEN_URL '{}'", raw))?
            }
            None => {
                let mut url = api_url.clone();
                url.path_segments_mut()
                    .map_err(|_| anyhow::anyhow!("PK_API_URL '{}' cannot take a path", raw_api))?
                    .pop_if_empty()
                    .extend(["oauth", "token"]);
                url
            }
        };

        Ok(Config {
            api_url,
            token_url,
            client_id: get("PK_CLIENT_ID").unwrap_or_else(|| "pk-cli".into()),
            client_secret: get("PK_CLIENT_SECRET").unwrap_or_default(),
            token_path: get("PK_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(".pk_token")),
            ssh_dir: get("PK_SSH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(".ssh")),
        })
    }
}
