//! Realtime session token issuance against the `OpenAI` API

use super::{SessionToken, TokenIssuer, VoiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Issues ephemeral client secrets for realtime voice sessions
pub struct OpenAiTokenIssuer {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    client_secret: ClientSecret,
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    value: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

impl OpenAiTokenIssuer {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Result<Self, VoiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/v1/realtime/sessions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenIssuer for OpenAiTokenIssuer {
    async fn issue_session_token(&self) -> Result<SessionToken, VoiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| VoiceError::auth("OPENAI_API_KEY is not configured"))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&SessionRequest { model: &self.model })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VoiceError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    VoiceError::network(format!("Connection failed: {e}"))
                } else {
                    VoiceError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        let token = parse_session_body(&body)?;
        tracing::info!(model = %self.model, "Issued realtime session token");
        Ok(token)
    }
}

fn parse_session_body(body: &str) -> Result<SessionToken, VoiceError> {
    let parsed: SessionResponse = serde_json::from_str(body)
        .map_err(|e| VoiceError::unknown(format!("Failed to parse session response: {e}")))?;

    if parsed.client_secret.value.is_empty() {
        return Err(VoiceError::unknown("Session response carried an empty client secret"));
    }
    if let Some(expires_at) = parsed.client_secret.expires_at {
        tracing::debug!(expires_at, "Session token expiry");
    }
    Ok(SessionToken::new(parsed.client_secret.value))
}

fn classify_error(status: u16, body: &str) -> VoiceError {
    // Proxies answer with HTML, so fall back to the raw body.
    let message = serde_json::from_str::<OpenAiErrorResponse>(body)
        .map_or_else(|_| body.to_string(), |resp| resp.error.message);
    match status {
        401 | 403 => VoiceError::auth(format!("Authentication failed: {message}")),
        429 => VoiceError::rate_limit(format!("Rate limit exceeded: {message}")),
        400 => VoiceError::invalid_request(format!("Invalid request: {message}")),
        500..=599 => VoiceError::server_error(format!("Server error: {message}")),
        _ => VoiceError::unknown(format!("HTTP {status}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::VoiceErrorKind;

    #[test]
    fn test_endpoint_from_base_url() {
        let issuer =
            OpenAiTokenIssuer::new(None, "https://api.openai.com/", "gpt-realtime").unwrap();
        assert_eq!(issuer.endpoint(), "https://api.openai.com/v1/realtime/sessions");
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let issuer = OpenAiTokenIssuer::new(None, "http://127.0.0.1:9", "gpt-realtime").unwrap();
        let err = issuer.issue_session_token().await.unwrap_err();
        assert_eq!(err.kind, VoiceErrorKind::Auth);
    }

    #[test]
    fn test_parse_session_body() {
        let token = parse_session_body(
            r#"{"id":"sess_1","client_secret":{"value":"ek_abc","expires_at":1700000000}}"#,
        )
        .unwrap();
        assert_eq!(token.secret(), "ek_abc");

        assert!(parse_session_body(r#"{"client_secret":{"value":""}}"#).is_err());
        assert!(parse_session_body("not json").is_err());
    }

    #[test]
    fn test_classify_error() {
        let body = r#"{"error":{"message":"bad key"}}"#;
        assert_eq!(classify_error(401, body).kind, VoiceErrorKind::Auth);
        assert_eq!(classify_error(429, body).kind, VoiceErrorKind::RateLimit);
        assert_eq!(classify_error(400, body).kind, VoiceErrorKind::InvalidRequest);
        assert_eq!(classify_error(503, body).kind, VoiceErrorKind::ServerError);
        assert!(classify_error(503, body).kind.is_transient());
        assert_eq!(classify_error(418, body).kind, VoiceErrorKind::Unknown);
        assert_eq!(classify_error(418, "oops").kind, VoiceErrorKind::Unknown);
    }

    #[test]
    fn test_classify_error_without_json_body() {
        let html = "<html><body>502 Bad Gateway</body></html>";
        let err = classify_error(502, html);
        assert_eq!(err.kind, VoiceErrorKind::ServerError);
        assert!(err.kind.is_transient());
        assert!(err.message.contains("502 Bad Gateway"));

        assert_eq!(classify_error(401, "denied").kind, VoiceErrorKind::Auth);
    }
}
