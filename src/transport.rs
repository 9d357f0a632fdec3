//! HTTP plumbing for the `/api/homepage` backend.
//!
//! Every backend response is wrapped in `{ "success", "data", "message" }`.
//! [`Transport::request`] unwraps that envelope and returns the `data` payload,
//! turning non-2xx statuses and `success: false` into [`SyncError::Api`].

use crate::config;
use crate::error::{Result, SyncError};
use crate::storage::Storage;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Backend access used by the sync services.
///
/// `path` is relative to the API base path, e.g. `/data/marketStats`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

/// Unwrap a response envelope given its HTTP status and raw body.
pub fn unwrap_envelope(status: u16, body: &str) -> Result<Value> {
    let parsed: Option<Envelope> = if body.trim().is_empty() {
        None
    } else {
        serde_json::from_str(body).ok()
    };

    if !(200..300).contains(&status) {
        let message = parsed
            .as_ref()
            .and_then(Envelope::message)
            .unwrap_or_else(|| format!("request failed with status {}", status));
        return Err(SyncError::Api { status, message });
    }

    let Some(envelope) = parsed else {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        // Surface the parse error for a malformed 2xx body.
        let err = serde_json::from_str::<Value>(body).err();
        return match err {
            Some(e) => Err(SyncError::Json(e)),
            None => Err(SyncError::Api {
                status,
                message: "response is not a JSON object".into(),
            }),
        };
    };

    if envelope.success == Some(false) {
        return Err(SyncError::Api {
            status,
            message: envelope
                .message()
                .unwrap_or_else(|| "backend reported failure".into()),
        });
    }
    Ok(envelope.data.unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// `reqwest`-backed transport.
///
/// Attaches `Authorization: Bearer <token>` when the auth token key is present
/// in storage, and keeps a cookie store for session-cookie fallback.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    storage: Arc<dyn Storage>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration, storage: Arc<dyn Storage>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            storage,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, config::API_BASE_PATH, path)
    }

    fn auth_token(&self) -> Option<String> {
        self.storage
            .get(config::keys::AUTH_TOKEN)
            .ok()
            .flatten()
            .map(|t| t.trim().trim_matches('"').to_string())
            .filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.url(path);
        debug!(%method, %url, "backend request");

        let mut req = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if let Some(token) = self.auth_token() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        unwrap_envelope(status, &text)
    }
}

// ---------------------------------------------------------------------------
// OfflineTransport
// ---------------------------------------------------------------------------

/// Transport for storage-only mode: every request fails, so the services run
/// entirely on stored state and defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineTransport;

#[async_trait]
impl Transport for OfflineTransport {
    async fn request(&self, method: Method, path: &str, _body: Option<Value>) -> Result<Value> {
        Err(SyncError::Api {
            status: 0,
            message: format!("offline mode: {} {} not sent", method, path),
        })
    }
}
