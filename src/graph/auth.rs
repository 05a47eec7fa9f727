//! OAuth 2.0 client-credentials tokens for the Graph API.
//!
//! One token is cached in-process and reused until shortly before it expires.

use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::error::AuthError;

/// Scope for application permissions on Graph.
const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

/// Acquires and caches app-only access tokens.
pub struct TokenProvider {
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    client: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(config: &GraphConfig, client: reqwest::Client) -> Self {
        Self {
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                config.authority.trim_end_matches('/'),
                config.tenant_id
            ),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            client,
            cached: RwLock::new(None),
        }
    }

    /// A valid access token, from cache when possible.
    pub async fn access_token(&self) -> Result<SecretString, AuthError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }

        debug!("No cached token, acquiring a new one");
        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn request_token(&self) -> Result<CachedToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", GRAPH_DEFAULT_SCOPE),
        ];

        let resp = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;
        let parsed: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            AuthError::InvalidResponse(format!("HTTP {status}: {e}"))
        })?;

        if let Some(error) = parsed.error {
            return Err(AuthError::Rejected {
                error,
                description: parsed.error_description.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            return Err(AuthError::InvalidResponse(format!("HTTP {status}")));
        }

        let access_token = parsed
            .access_token
            .ok_or_else(|| AuthError::InvalidResponse("missing access_token".into()))?;
        let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        info!(expires_in, "Acquired Graph access token");
        Ok(CachedToken {
            token: SecretString::from(access_token),
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn config(authority: &str) -> GraphConfig {
        GraphConfig {
            tenant_id: "tenant-1".into(),
            client_id: "client-1".into(),
            client_secret: SecretString::from("shh"),
            mailbox: "csr@example.com".into(),
            api_base: "unused".into(),
            authority: authority.to_string(),
        }
    }

    #[tokio::test]
    async fn acquires_and_caches_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "client-1".into()),
                Matcher::UrlEncoded("client_secret".into(), "shh".into()),
                Matcher::UrlEncoded("scope".into(), GRAPH_DEFAULT_SCOPE.into()),
            ]))
            .with_status(200)
            .with_body(r#"{"token_type": "Bearer", "expires_in": 3599, "access_token": "tok-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = TokenProvider::new(&config(&server.url()), reqwest::Client::new());
        let first = provider.access_token().await.unwrap();
        let second = provider.access_token().await.unwrap();

        assert_eq!(first.expose_secret(), "tok-1");
        assert_eq!(second.expose_secret(), "tok-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refreshes_token_inside_expiry_margin() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(200)
            .with_body(r#"{"expires_in": 30, "access_token": "short-lived"}"#)
            .expect(2)
            .create_async()
            .await;

        let provider = TokenProvider::new(&config(&server.url()), reqwest::Client::new());
        provider.access_token().await.unwrap();
        provider.access_token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_rejection_details() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(401)
            .with_body(
                r#"{"error": "invalid_client", "error_description": "AADSTS7000215: Invalid client secret"}"#,
            )
            .create_async()
            .await;

        let provider = TokenProvider::new(&config(&server.url()), reqwest::Client::new());
        match provider.access_token().await.unwrap_err() {
            AuthError::Rejected { error, description } => {
                assert_eq!(error, "invalid_client");
                assert!(description.contains("Invalid client secret"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_response_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let provider = TokenProvider::new(&config(&server.url()), reqwest::Client::new());
        assert!(matches!(
            provider.access_token().await,
            Err(AuthError::InvalidResponse(_))
        ));
    }
}
