// Per-invocation context: the API client, the authorizer, the prompter
// and the key inventory, built once in `main` and passed to every
// command. Nothing here is global.

use crate::api::{ApiClient, PlatformApi};
use crate::auth::{Authorizer, InteractiveAuthorizer, OAuthClient, TokenStore};
use crate::config::Config;
use crate::error::Result;
use crate::keys::{FsKeyInventory, KeyInventory};
use crate::ui::{Prompter, TerminalPrompter};
use anyhow::Context as _;
use reqwest::blocking::Client;

pub struct Context {
    pub api: Box<dyn PlatformApi>,
    pub auth: Box<dyn Authorizer>,
    pub prompter: Box<dyn Prompter>,
    pub keys: Box<dyn KeyInventory>,
}

impl Context {
    pub fn new(
        api: Box<dyn PlatformApi>,
        auth: Box<dyn Authorizer>,
        prompter: Box<dyn Prompter>,
        keys: Box<dyn KeyInventory>,
    ) -> Self {
        Context {
            api,
            auth,
            prompter,
            keys,
        }
    }

    /// Wire up the real terminal, filesystem and HTTP collaborators.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        let store = TokenStore::new(config.token_path.clone());
        let oauth = OAuthClient::new(client.clone(), config);

        Ok(Context::new(
            Box::new(ApiClient::new(client, config).with_store(store.clone())),
            Box::new(InteractiveAuthorizer::new(store, oauth)),
            Box::new(TerminalPrompter),
            Box::new(FsKeyInventory::new(config.ssh_dir.clone())),
        ))
    }

    /// Obtain a credential (from cache unless `force`) and hand it to the
    /// API client.
    pub fn authorize(&mut self, force: bool) -> Result<()> {
        let token = self.auth.authorize(force)?;
        self.api.set_token(token);
        Ok(())
    }
}
