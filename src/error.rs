//! Error types for the suggestion pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Problems with the resolved configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Set your GigaChat API key first! (GIGACOMMIT_AUTH_KEY, --auth-key or `auth_key` in {config_hint})")]
    MissingAuthKey { config_hint: String },

    #[error("Prompt is too short! ({len} characters, at least {min} required)")]
    PromptTooShort { len: usize, min: usize },

    #[error("GigaChat model is not set!")]
    MissingModel,

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// A required collaborator (git or a repository) is not available.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Failed to find the git executable!")]
    VcsMissing,

    #[error("Failed to find a Git repository!")]
    RepositoryMissing,
}

/// Errors raised by the version-control adapter.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Failed to run git {args:?}: {source}")]
    Spawn {
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("git {args:?} exited with status {code:?}: {stderr}")]
    Failed {
        args: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to write commit message to {path:?}: {source}")]
    WriteMessage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from classifying staged changes.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("There are no staged changes!")]
    NoStagedChanges,

    #[error(transparent)]
    Vcs(#[from] VcsError),
}

/// Errors from the credential exchange.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("GigaChat authorization failed: HTTP {status} - {body}")]
    Status { status: u16, body: String },

    #[error("GigaChat authorization request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("GigaChat authorization returned an unexpected body: {0}")]
    InvalidResponse(String),
}

/// Errors from the chat completion exchange.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("GigaChat API error: HTTP {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed GigaChat response: {0}")]
    Protocol(String),

    #[error("GigaChat request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Everything that can end a suggestion early.
///
/// Caught once by the orchestrator and shown to the user as a single notice.
#[derive(Error, Debug)]
pub enum SuggestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}
