use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::stream::{ApiErrorBody, JsonObjectDecoder, parse_chunk};
use super::{ChatClient, ChatOutcome, ChatRequest, Credential, FragmentSink};
use crate::error::ChatError;

pub const DEFAULT_CHAT_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1/chat/completions";

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiErrorBody>,
    message: Option<String>,
}

/// Pull a human-readable message out of an error response body.
pub fn api_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error.and_then(|e| e.message).or(env.message))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Chat completion client for the GigaChat REST API.
pub struct GigaChatClient {
    http: Client,
    chat_url: String,
}

impl GigaChatClient {
    pub fn new(http: Client, chat_url: impl Into<String>) -> Self {
        GigaChatClient {
            http,
            chat_url: chat_url.into(),
        }
    }

    async fn read_single(
        &self,
        resp: reqwest::Response,
        on_fragment: &mut FragmentSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<ChatOutcome, ChatError> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ChatOutcome::Cancelled),
            body = resp.bytes() => body.map_err(ChatError::Transport)?,
        };

        log::trace!("GigaChat raw response: {}", String::from_utf8_lossy(&body));

        let parsed: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| ChatError::Protocol(format!("invalid response body: {e}")))?;

        if let Some(usage) = &parsed.usage {
            log::info!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ChatError::Protocol("no choices returned".to_string()))?;

        if cancel.is_cancelled() {
            return Ok(ChatOutcome::Cancelled);
        }
        on_fragment(&content);
        Ok(ChatOutcome::Completed)
    }

    async fn read_stream(
        &self,
        mut resp: reqwest::Response,
        on_fragment: &mut FragmentSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<ChatOutcome, ChatError> {
        let mut decoder = JsonObjectDecoder::new();
        let mut delivered = 0usize;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("Chat stream cancelled after {delivered} fragment(s)");
                    return Ok(ChatOutcome::Cancelled);
                }
                chunk = resp.chunk() => chunk.map_err(ChatError::Transport)?,
            };

            let Some(bytes) = chunk else {
                decoder.finish()?;
                log::debug!("Chat stream finished with {delivered} fragment(s)");
                return Ok(ChatOutcome::Completed);
            };

            log::trace!("Chat stream chunk: {}", String::from_utf8_lossy(&bytes));
            decoder.push(&bytes);

            while let Some(object) = decoder.next_object()? {
                if let Some(text) = parse_chunk(&object)? {
                    if cancel.is_cancelled() {
                        return Ok(ChatOutcome::Cancelled);
                    }
                    on_fragment(&text);
                    delivered += 1;
                }
            }
        }
    }
}

#[async_trait]
impl ChatClient for GigaChatClient {
    async fn complete(
        &self,
        request: &ChatRequest,
        token: &Credential,
        on_fragment: &mut FragmentSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<ChatOutcome, ChatError> {
        log::info!(
            "Calling GigaChat model {:?} (stream: {})",
            request.model,
            request.stream
        );

        let send = self
            .http
            .post(&self.chat_url)
            .header(ACCEPT, "application/json")
            .bearer_auth(token.secret())
            .json(request)
            .send();

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ChatOutcome::Cancelled),
            resp = send => resp.map_err(ChatError::Transport)?,
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(ChatOutcome::Cancelled),
                body = resp.bytes() => body.unwrap_or_else(|e| {
                    log::warn!("Failed to read GigaChat error body (HTTP {status}): {e}");
                    Default::default()
                }),
            };
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        if request.stream {
            self.read_stream(resp, on_fragment, cancel).await
        } else {
            self.read_single(resp, on_fragment, cancel).await
        }
    }
}
