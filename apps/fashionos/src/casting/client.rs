//! HTTP client for the AI gateway.

use super::{CastingRecommendation, CastingRequest, completion_body, parse_completion};
use crate::config::GatewayConfig;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors from the AI gateway layer.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("AI gateway is not configured (set FASHIONOS_GATEWAY_API_KEY)")]
    MissingApiKey,
    #[error("invalid casting request: {0}")]
    InvalidRequest(String),
    #[error("rate limited")]
    RateLimited,
    #[error("credits exhausted")]
    CreditsExhausted,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Message shown to the organizer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => "Rate limit exceeded, please try again later.".to_string(),
            Self::CreditsExhausted => {
                "AI credits exhausted, please add funds to your workspace.".to_string()
            }
            Self::InvalidRequest(msg) => msg.clone(),
            Self::MissingApiKey => "AI casting is not available.".to_string(),
            _ => "Failed to generate casting recommendations.".to_string(),
        }
    }

    /// Map a non-success gateway status.
    #[must_use]
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::PAYMENT_REQUIRED => Self::CreditsExhausted,
            _ => Self::Http {
                status: status.as_u16(),
                body,
            },
        }
    }
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Ask the gateway for casting recommendations.
    pub async fn recommend(
        &self,
        request: &CastingRequest,
    ) -> Result<Vec<CastingRecommendation>, GatewayError> {
        request.validate()?;
        let key = self.api_key.as_deref().ok_or(GatewayError::MissingApiKey)?;

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(key)
            .json(&completion_body(request, &self.model))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = GatewayError::from_status(status, body);
            tracing::warn!(status = status.as_u16(), error = %err, "AI gateway request failed");
            return Err(err);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;
        let recommendations = parse_completion(&body)?;
        tracing::info!(
            count = recommendations.len(),
            model = %self.model,
            "Casting recommendations received"
        );
        Ok(recommendations)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            GatewayError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            GatewayError::RateLimited
        ));
        assert!(matches!(
            GatewayError::from_status(StatusCode::PAYMENT_REQUIRED, String::new()),
            GatewayError::CreditsExhausted
        ));
        assert!(matches!(
            GatewayError::from_status(StatusCode::BAD_GATEWAY, "upstream".to_string()),
            GatewayError::Http { status: 502, .. }
        ));
    }

    #[test]
    fn user_messages() {
        assert_eq!(
            GatewayError::RateLimited.user_message(),
            "Rate limit exceeded, please try again later."
        );
        assert_eq!(
            GatewayError::CreditsExhausted.user_message(),
            "AI credits exhausted, please add funds to your workspace."
        );
        assert_eq!(
            GatewayError::Timeout.user_message(),
            "Failed to generate casting recommendations."
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = GatewayClient::from_config(&GatewayConfig::default());
        assert!(client.is_ok());
        if let Ok(client) = client {
            assert!(!client.is_configured());
            let request = CastingRequest {
                session_id: None,
                event_title: "Gala".to_string(),
                event_type: String::new(),
                event_date: None,
                style_notes: String::new(),
                model_count: 2,
            };
            assert!(matches!(
                client.recommend(&request).await,
                Err(GatewayError::MissingApiKey)
            ));
        }
    }
}
