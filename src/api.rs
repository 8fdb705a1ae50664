// API client module: a small blocking HTTP client for the platform's
// key and project endpoints. Every failure leaves this module already
// classified as a `crate::Error` variant, so callers never inspect
// reqwest or OAuth internals.

use crate::auth::{OAuthClient, Token, TokenStore};
use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// An SSH key as registered on the account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegisteredKey {
    pub name: String,
    pub fingerprint: String,
    #[serde(default)]
    pub preview: String,
}

/// A hosted project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct KeyList {
    #[serde(default)]
    keys: Vec<RegisteredKey>,
}

#[derive(Deserialize)]
struct ProjectList {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Serialize)]
struct UploadKeyRequest<'a> {
    name: &'a str,
    key: &'a str,
}

#[derive(Serialize)]
struct CreateProjectRequest<'a> {
    name: &'a str,
}

/// Operations the commands need from the platform service.
pub trait PlatformApi {
    /// Replace the credential used for subsequent calls.
    fn set_token(&mut self, token: Token);

    fn list_keys(&mut self) -> Result<Vec<RegisteredKey>>;
    fn upload_key(&mut self, name: &str, authorized_key: &str) -> Result<()>;
    fn delete_key(&mut self, fingerprint: &str) -> Result<()>;

    fn create_project(&mut self, name: &str) -> Result<Project>;
    fn list_projects(&mut self) -> Result<Vec<Project>>;
    fn delete_project(&mut self, name: &str) -> Result<()>;
}

/// HTTP implementation of `PlatformApi`.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    oauth: OAuthClient,
    token: Option<Token>,
    store: Option<TokenStore>,
}

impl ApiClient {
    pub fn new(client: Client, config: &Config) -> Self {
        ApiClient {
            oauth: OAuthClient::new(client.clone(), config),
            client,
            base_url: config.api_url.clone(),
            token: None,
            store: None,
        }
    }

    /// Persist tokens renewed during requests into `store`.
    pub fn with_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// The access token to send, refreshing it first when it has expired
    /// and we hold a refresh token.
    fn access_token(&mut self) -> Result<Option<String>> {
        let refresh = match &self.token {
            None => return Ok(None),
            Some(t) if !t.is_expired() => return Ok(Some(t.access_token.clone())),
            Some(t) => match &t.refresh_token {
                Some(r) => r.clone(),
                None => return Ok(Some(t.access_token.clone())),
            },
        };

        info!("access token expired, refreshing");
        let fresh = self.oauth.refresh(&refresh)?;
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&fresh) {
                warn!(error = %e, "cannot persist refreshed token");
            }
        }
        let access = fresh.access_token.clone();
        self.token = Some(fresh);
        Ok(Some(access))
    }

    fn send(&mut self, req: RequestBuilder) -> Result<Response> {
        let req = match self.access_token()? {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let res = req.send()?;
        let status = res.status();
        debug!(url = %res.url(), %status, "api response");
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        })
    }
}

/// Pull a human readable message out of an error body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["error", "message"] {
            if let Some(msg) = value.get(field).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

impl PlatformApi for ApiClient {
    fn set_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    fn list_keys(&mut self) -> Result<Vec<RegisteredKey>> {
        let req = self.client.get(self.url(&["keys"]));
        let list: KeyList = self.send(req)?.json()?;
        Ok(list.keys)
    }

    fn upload_key(&mut self, name: &str, authorized_key: &str) -> Result<()> {
        let body = UploadKeyRequest {
            name,
            key: authorized_key,
        };
        let req = self.client.post(self.url(&["keys"])).json(&body);
        self.send(req)?;
        Ok(())
    }

    fn delete_key(&mut self, fingerprint: &str) -> Result<()> {
        let req = self.client.delete(self.url(&["keys", fingerprint]));
        self.send(req)?;
        Ok(())
    }

    fn create_project(&mut self, name: &str) -> Result<Project> {
        let req = self
            .client
            .post(self.url(&["projects"]))
            .json(&CreateProjectRequest { name });
        Ok(self.send(req)?.json()?)
    }

    fn list_projects(&mut self) -> Result<Vec<Project>> {
        let req = self.client.get(self.url(&["projects"]));
        let list: ProjectList = self.send(req)?.json()?;
        Ok(list.projects)
    }

    fn delete_project(&mut self, name: &str) -> Result<()> {
        let req = self.client.delete(self.url(&["projects", name]));
        self.send(req)?;
        Ok(())
    }
}
