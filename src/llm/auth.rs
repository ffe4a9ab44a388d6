use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use uuid::Uuid;

use super::{Credential, CredentialProvider};
use crate::error::AuthError;

pub const DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Unix time in milliseconds. Logged only; tokens are never reused.
    expires_at: Option<i64>,
}

/// OAuth exchange of a static authorization key for a bearer token.
pub struct OAuthCredentialProvider {
    http: Client,
    auth_url: String,
    scope: String,
}

impl OAuthCredentialProvider {
    pub fn new(http: Client, auth_url: impl Into<String>, scope: impl Into<String>) -> Self {
        OAuthCredentialProvider {
            http,
            auth_url: auth_url.into(),
            scope: scope.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn fetch_token(&self, api_key: &str) -> Result<Credential, AuthError> {
        let rq_uid = Uuid::new_v4().to_string();

        log::info!("Requesting GigaChat access token (RqUID {rq_uid})");

        let resp = self
            .http
            .post(&self.auth_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .header("RqUID", &rq_uid)
            .header(AUTHORIZATION, format!("Basic {api_key}"))
            .body(format!("scope={}", self.scope))
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(AuthError::Transport)?;

        if status != StatusCode::OK {
            return Err(AuthError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        if let Some(expires_at) = parsed.expires_at {
            log::debug!("Access token expires at {expires_at}");
        }

        Ok(Credential::new(parsed.access_token))
    }
}
