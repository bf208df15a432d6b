// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Upstream fetcher for the affiliate network API.
//!
//! Issues one authenticated GET per call, classifies the outcome and hands
//! back the parsed JSON body. There is no retry: a failed call is reported
//! once and the caller decides what an empty source means.

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::{AppError, UpstreamError};

/// Bearer token plus the optional secondary key sent as `x-api-key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    api_key: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            token: token.into(),
            api_key,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `x-api-key` header; the bearer token when no key is set.
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or(&self.token)
    }
}

/// Seam between the adapters and the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str, credentials: &Credentials) -> Result<Value, UpstreamError>;
}

/// HTTP client wrapper for talking to the affiliate API.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    user_agent: String,
}

impl UpstreamClient {
    /// Construct a new upstream client using the provided configuration.
    pub fn try_new(config: UpstreamConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow!("Failed to build upstream client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: config.user_agent,
        })
    }
}

#[async_trait]
impl JsonFetcher for UpstreamClient {
    async fn fetch_json(&self, url: &str, credentials: &Credentials) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", credentials.token()))
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, self.user_agent.as_str())
            .header("x-api-key", credentials.api_key())
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| UpstreamError::Transport {
            message: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        serde_json::from_slice(&body).map_err(|e| UpstreamError::MalformedBody {
            message: e.to_string(),
        })
    }
}

/// Pull a readable message out of an error body, if it is JSON and has one.
fn error_message(status: u16, body: &[u8]) -> String {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();

    parsed
        .as_ref()
        .and_then(|json| message_field(json).or_else(|| json.get("error").and_then(message_field)))
        .unwrap_or_else(|| format!("HTTP error {}", status))
}

fn message_field(json: &Value) -> Option<String> {
    ["description", "message"]
        .iter()
        .filter_map(|key| json.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}
