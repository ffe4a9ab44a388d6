use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;

use crate::config::Config;
use crate::llm::Backend;
use crate::llm::auth::OAuthCredentialProvider;
use crate::llm::gigachat::GigaChatClient;

/// Shared HTTP client for the credential and chat endpoints.
pub fn build_http_client(cfg: &Config) -> Result<Client> {
    let timeout = Duration::from_secs(cfg.timeout_secs);

    if cfg.accept_invalid_certs {
        warn!("TLS certificate verification is disabled");
    }

    Client::builder()
        .connect_timeout(timeout)
        // Idle time between reads, so long streamed replies are not cut off.
        .read_timeout(timeout)
        .danger_accept_invalid_certs(cfg.accept_invalid_certs)
        .build()
        .context("failed to build HTTP client")
}

/// Build the GigaChat backend based on CLI + config.
pub fn build_backend(cfg: &Config) -> Result<Backend> {
    let http = build_http_client(cfg)?;

    debug!(
        "Using GigaChat backend: auth={}, chat={}, scope={}",
        cfg.auth_url, cfg.chat_url, cfg.scope
    );

    Ok(Backend {
        credentials: Arc::new(OAuthCredentialProvider::new(
            http.clone(),
            cfg.auth_url.clone(),
            cfg.scope.clone(),
        )),
        chat: Arc::new(GigaChatClient::new(http, cfg.chat_url.clone())),
    })
}
