pub mod auth;
pub mod gigachat;
pub mod prompt_builder;
pub mod prompts;
pub mod stream;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{AuthError, ChatError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of a chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Short-lived bearer token. Lives for one suggestion and is never cached.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// How a chat exchange ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    Completed,
    Cancelled,
}

/// Exchanges a static API key for a bearer token.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch_token(&self, api_key: &str) -> Result<Credential, AuthError>;
}

/// Receives each piece of text as it arrives.
pub type FragmentSink<'s> = dyn for<'a> FnMut(&'a str) + Send + 's;

/// Talks to a chat completion endpoint.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `request` and hand every received piece of text to `on_fragment`.
    ///
    /// Cancelling `cancel` tears the connection down and resolves with
    /// [`ChatOutcome::Cancelled`]; no fragment is delivered after that.
    async fn complete(
        &self,
        request: &ChatRequest,
        token: &Credential,
        on_fragment: &mut FragmentSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<ChatOutcome, ChatError>;
}

/// Credential provider and chat client that belong together.
#[derive(Clone)]
pub struct Backend {
    pub credentials: std::sync::Arc<dyn CredentialProvider>,
    pub chat: std::sync::Arc<dyn ChatClient>,
}

/// Truncate long strings for debug logging.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...\n[truncated {} bytes]", &s[..end], s.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_in_wire_shape() {
        let req = ChatRequest {
            model: "GigaChat".into(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 64,
            stream: true,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "GigaChat",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 64,
                "stream": true
            })
        );
    }

    #[test]
    fn credential_debug_hides_secret() {
        let token = Credential::new("super-secret");
        assert_eq!(format!("{token:?}"), "Credential(***)");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "ééééé";
        let out = truncate(s, 3);
        assert!(out.starts_with('é'));
        assert!(out.contains("[truncated"));
    }
}
