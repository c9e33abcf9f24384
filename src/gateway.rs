//! Machine-translation gateway.
//!
//! The gateway makes exactly one upstream call per request and never retries;
//! callers decide what to do with a `GatewayError` (see `GatewayError::is_retryable`).

use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("translation API is not configured (missing API key)")]
    NotConfigured,

    #[error("translation API unreachable: {0}")]
    Unreachable(String),

    #[error("translation API rate limit exceeded")]
    RateLimited,

    #[error("translation API error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed translation API response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Rate limiting, 5xx and network failures are transient; the rest are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Unreachable(_) | GatewayError::RateLimited => true,
            GatewayError::Upstream { status, .. } => *status >= 500,
            GatewayError::NotConfigured | GatewayError::Malformed(_) => false,
        }
    }
}

/// A text translation backend.
pub trait TranslationGateway: Send + Sync {
    /// Translate `text` from `source` into `target`.
    fn translate(
        &self,
        text: &str,
        target: Locale,
        source: Locale,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;

    /// Check that the upstream API is reachable without translating anything.
    fn health_check(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// Google Cloud Translation (v2, basic) request body
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Debug, Clone)]
pub struct GoogleTranslateGateway {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
}

impl GoogleTranslateGateway {
    pub fn new(client: reqwest::Client, api_key: Option<String>, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.api_key.as_deref().ok_or(GatewayError::NotConfigured)
    }

    async fn error_from_response(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return GatewayError::RateLimited;
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        GatewayError::Upstream {
            status: status.as_u16(),
            body,
        }
    }
}

impl TranslationGateway for GoogleTranslateGateway {
    async fn translate(&self, text: &str, target: Locale, source: Locale) -> Result<String, GatewayError> {
        if text.trim().is_empty() || target == source {
            return Ok(text.to_string());
        }
        let api_key = self.api_key()?;

        debug!(
            "Translating {} chars {} -> {}",
            text.chars().count(),
            source.code(),
            target.code()
        );

        let request = TranslateRequest {
            q: text,
            source: source.code(),
            target: target.code(),
            format: "text",
        };

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| GatewayError::Malformed("response contained no translations".to_string()))
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/languages", self.api_url))
            .query(&[("key", api_key)])
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response).await)
        }
    }
}
