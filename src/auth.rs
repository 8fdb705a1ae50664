// Authentication module: owns the OAuth credential. It knows how to
// exchange a user's email/password for a token, refresh an expired one,
// and remember the result on disk between runs. The rest of the CLI only
// ever calls `Authorizer::authorize` and hands the token to the API client.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ui;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use dialoguer::{Input, Password};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Tokens this close to their expiry are refreshed before use.
const EXPIRY_SKEW_SECS: i64 = 30;

/// An OAuth access token plus what we need to renew it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(access_token: &str) -> Self {
        Token {
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// A token without an expiry is trusted until the service rejects it.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at <= Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }
}

/// Token endpoint success payload.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Token endpoint error payload (RFC 6749 section 5.2).
#[derive(Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Why a token exchange did not produce a token.
enum ExchangeError {
    /// The identity provider answered with an OAuth error.
    Rejected(String),
    Failed(Error),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        ExchangeError::Failed(Error::Http(e))
    }
}

/// Talks to the OAuth token endpoint.
#[derive(Clone)]
pub struct OAuthClient {
    client: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
}

impl OAuthClient {
    pub fn new(client: Client, config: &Config) -> Self {
        OAuthClient {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    /// Resource-owner password grant used by interactive login.
    pub fn password_grant(&self, username: &str, password: &str) -> Result<Token> {
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        self.exchange(&form, None).map_err(|e| match e {
            ExchangeError::Rejected(why) => Error::Login(why),
            ExchangeError::Failed(e) => e,
        })
    }

    /// Renew an access token. A rejection here means the credential is
    /// gone for good and surfaces as `Error::ExpiredToken`.
    pub fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.exchange(&form, Some(refresh_token)).map_err(|e| match e {
            ExchangeError::Rejected(why) => Error::ExpiredToken(why),
            ExchangeError::Failed(e) => e,
        })
    }

    fn exchange(
        &self,
        form: &[(&str, &str)],
        previous_refresh: Option<&str>,
    ) -> std::result::Result<Token, ExchangeError> {
        debug!(url = %self.token_url, grant = form[0].1, "token exchange");
        let res = self
            .client
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()?;

        let status = res.status();
        let body = res.text()?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<OAuthErrorResponse>(&body) {
                Ok(oauth) => ExchangeError::Rejected(match oauth.error_description {
                    Some(desc) => format!("{}: {}", oauth.error, desc),
                    None => oauth.error,
                }),
                Err(_) => ExchangeError::Failed(Error::Api {
                    status: status.as_u16(),
                    message: body,
                }),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .context("Parsing token response json")
            .map_err(|e| ExchangeError::Failed(e.into()))?;
        Ok(Token {
            access_token: parsed.access_token,
            // Providers may omit the refresh token on refresh; keep the old one.
            refresh_token: parsed
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: parsed
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}

/// Persists the token as JSON in a single file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        TokenStore { path }
    }

    /// Load the stored token. A missing or unreadable file just means we
    /// have no credential yet.
    pub fn load(&self) -> Option<Token> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read stored token");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed stored token");
                None
            }
        }
    }

    pub fn save(&self, token: &Token) -> Result<()> {
        let data = serde_json::to_string_pretty(token).context("Serializing token")?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            // `mode` only applies on creation; tighten a file left by an older run.
            if self.path.exists() {
                std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
            }
        }
        options.open(&self.path)?.write_all(data.as_bytes())?;
        debug!(path = %self.path.display(), "token saved");
        Ok(())
    }
}

/// Produces a usable credential, either from cache or by logging in.
pub trait Authorizer {
    /// With `force == false` a cached credential may be returned as is;
    /// with `force == true` the user always logs in again and the stored
    /// credential is overwritten.
    fn authorize(&mut self, force: bool) -> Result<Token>;
}

/// Terminal login backed by the token file.
pub struct InteractiveAuthorizer {
    store: TokenStore,
    oauth: OAuthClient,
}

impl InteractiveAuthorizer {
    pub fn new(store: TokenStore, oauth: OAuthClient) -> Self {
        InteractiveAuthorizer { store, oauth }
    }

    fn login(&self) -> Result<Token> {
        let email: String = Input::new().with_prompt("Email").interact_text()?;
        let password: String = Password::new().with_prompt("Password").interact()?;

        let spinner = ui::spinner("Logging in...");
        let result = self.oauth.password_grant(&email, &password);
        spinner.finish_and_clear();

        let token = result?;
        println!("Welcome {}!", email);
        Ok(token)
    }
}

impl Authorizer for InteractiveAuthorizer {
    fn authorize(&mut self, force: bool) -> Result<Token> {
        if !force {
            if let Some(token) = self.store.load() {
                debug!("using stored access token");
                return Ok(token);
            }
        }
        info!(force, "starting interactive login");
        let token = self.login()?;
        self.store.save(&token)?;
        Ok(token)
    }
}
