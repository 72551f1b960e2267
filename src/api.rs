//! Authenticated blocking HTTP transport shared by the Sheets and Drive clients

use crate::error::{LedgerError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Environment variable holding the OAuth bearer token
pub const ACCESS_TOKEN_ENV: &str = "LEDGER_ACCESS_TOKEN";

/// Thin wrapper over a reqwest client that attaches the bearer token and
/// turns non-success statuses into [`LedgerError::Remote`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    token: String,
}

impl ApiClient {
    pub fn new(token: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            token: token.into(),
        })
    }

    /// Build a client from [`ACCESS_TOKEN_ENV`]
    pub fn from_env(timeout_secs: u64) -> Result<Self> {
        let token = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LedgerError::config(format!("{} is not set", ACCESS_TOKEN_ENV)))?;
        Self::new(token.trim(), timeout_secs)
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url).bearer_auth(&self.token)
    }

    pub fn put(&self, url: Url) -> RequestBuilder {
        self.client.put(url).bearer_auth(&self.token)
    }

    pub fn post(&self, url: Url) -> RequestBuilder {
        self.client.post(url).bearer_auth(&self.token)
    }

    /// Send a request and decode a JSON body
    pub fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send()?)?;
        Ok(response.json()?)
    }

    /// Send a request and discard the body
    pub fn send(&self, request: RequestBuilder) -> Result<()> {
        check_status(request.send()?)?;
        Ok(())
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());

    Err(LedgerError::remote(status.as_u16(), message))
}

/// Parse a base URL, mapping failure into a configuration error
pub fn parse_url(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| LedgerError::config(format!("Invalid URL '{}': {}", base, e)))
}
