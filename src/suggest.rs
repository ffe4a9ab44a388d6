//! The "suggest commit message" command.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::changes::classify;
use crate::error::{CollaboratorError, ConfigError, SuggestError};
use crate::llm::prompt_builder::{assemble, validate_prompt};
use crate::llm::{Backend, ChatOutcome, ChatRequest, truncate};
use crate::session::{Begin, Session, SessionState};
use crate::vcs::Vcs;

/// How streamed fragments end up in the commit message box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentPolicy {
    /// The box shows everything received so far.
    #[default]
    Append,
    /// The box shows only the latest fragment.
    Replace,
}

impl FragmentPolicy {
    pub fn apply(self, message: &mut String, fragment: &str) {
        match self {
            FragmentPolicy::Append => message.push_str(fragment),
            FragmentPolicy::Replace => {
                message.clear();
                message.push_str(fragment);
            }
        }
    }
}

/// Inputs the command validates before doing any work.
#[derive(Debug, Clone)]
pub struct SuggestSettings {
    pub auth_key: Option<String>,
    pub prompt: String,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub stream: bool,
    pub fragments: FragmentPolicy,
    /// Where the user can set the key; shown when it is missing.
    pub config_hint: String,
}

/// User-facing side of the command.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);

    /// Asked when the command is invoked while a request is running.
    /// Returns `true` if the user wants to cancel it.
    async fn confirm_cancel(&self) -> bool;
}

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The message was generated and written to the input box.
    Suggested(String),
    Cancelled,
    /// Something went wrong; the user has been told.
    Failed(String),
    /// Another request was already running.
    Busy { cancel_requested: bool },
}

/// Sequences validation, change collection, authentication and the chat call.
pub struct Suggester {
    settings: SuggestSettings,
    backend: Backend,
    vcs: Option<Arc<dyn Vcs>>,
    notifier: Arc<dyn Notifier>,
    session: Session,
}

impl Suggester {
    pub fn new(
        settings: SuggestSettings,
        backend: Backend,
        vcs: Option<Arc<dyn Vcs>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Suggester {
            settings,
            backend,
            vcs,
            notifier,
            session: Session::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Run the command once.
    ///
    /// While a request is in flight, invoking again does not start another
    /// one; it offers to cancel the running request instead.
    pub async fn invoke(&self) -> Outcome {
        let active = match self.session.begin() {
            Begin::Started(active) => active,
            Begin::Busy(token) => {
                log::info!("Suggestion already in progress");
                let cancel_requested = self.notifier.confirm_cancel().await;
                if cancel_requested {
                    log::warn!("Cancelling the running suggestion");
                    token.cancel();
                }
                return Outcome::Busy { cancel_requested };
            }
        };

        let cancel = active.token().clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            result = self.run(&cancel) => result,
        };
        drop(active);

        match result {
            Ok(Some(message)) => Outcome::Suggested(message),
            Ok(None) => {
                log::info!("Suggestion cancelled");
                Outcome::Cancelled
            }
            Err(err) => {
                let message = err.to_string();
                log::debug!("Suggestion failed: {err:?}");
                self.notifier.error(&message);
                Outcome::Failed(message)
            }
        }
    }

    /// `Ok(None)` means the request was cancelled.
    async fn run(&self, cancel: &CancellationToken) -> Result<Option<String>, SuggestError> {
        let s = &self.settings;

        let auth_key = s
            .auth_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingAuthKey {
                config_hint: s.config_hint.clone(),
            })?;
        validate_prompt(&s.prompt)?;
        let model = s
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or(ConfigError::MissingModel)?;

        let vcs = self.vcs.as_ref().ok_or(CollaboratorError::VcsMissing)?;
        let repo = vcs
            .repository()
            .await?
            .ok_or(CollaboratorError::RepositoryMissing)?;

        let changes = repo.staged_changes().await?;
        let classified = classify(&changes, repo.as_ref()).await?;
        let messages = assemble(&s.prompt, &classified)?;

        log::debug!("Changes prompt:\n{}", truncate(&messages[1].content, 3000));

        let request = ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens: s.max_tokens,
            stream: s.stream,
        };

        let token = self.backend.credentials.fetch_token(auth_key).await?;

        let input_box = repo.input_box();
        let policy = s.fragments;
        let mut message = String::new();
        let mut on_fragment = |fragment: &str| {
            policy.apply(&mut message, fragment);
            input_box.set_value(&message);
        };

        let outcome = self
            .backend
            .chat
            .complete(&request, &token, &mut on_fragment, cancel)
            .await?;
        drop(token);

        match outcome {
            ChatOutcome::Completed => Ok(Some(message)),
            ChatOutcome::Cancelled => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_accumulates_fragments() {
        let mut message = String::new();
        for fragment in ["Fix ", "the ", "parser"] {
            FragmentPolicy::Append.apply(&mut message, fragment);
        }
        assert_eq!(message, "Fix the parser");
    }

    #[test]
    fn replace_keeps_only_latest_fragment() {
        let mut message = String::new();
        for fragment in ["Fix ", "the ", "parser"] {
            FragmentPolicy::Replace.apply(&mut message, fragment);
        }
        assert_eq!(message, "parser");
    }

    #[test]
    fn policy_deserializes_from_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            fragments: FragmentPolicy,
        }
        let w: Wrapper = toml::from_str("fragments = \"replace\"").unwrap();
        assert_eq!(w.fragments, FragmentPolicy::Replace);
    }
}
