use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli_args::Cli;
use crate::error::ConfigError;
use crate::llm::auth::{DEFAULT_AUTH_URL, DEFAULT_SCOPE};
use crate::llm::gigachat::DEFAULT_CHAT_URL;
use crate::llm::prompts::DEFAULT_PROMPT;
use crate::suggest::{FragmentPolicy, SuggestSettings};

pub const DEFAULT_MODEL: &str = "GigaChat";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

const SCOPES: [&str; 3] = ["GIGACHAT_API_PERS", "GIGACHAT_API_B2B", "GIGACHAT_API_CORP"];

/// Final resolved configuration for gigacommit.
#[derive(Debug, Clone)]
pub struct Config {
    /// Left unset here; the suggest command reports it when missing.
    pub auth_key: Option<String>,
    pub prompt: String,
    pub model: String,
    pub stream: bool,
    pub max_tokens: u32,
    pub scope: String,
    pub auth_url: String,
    pub chat_url: String,
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
    pub fragments: FragmentPolicy,
    pub apply: bool,
    /// File the settings were (or would have been) read from.
    pub config_path: PathBuf,
}

impl Config {
    /// Build the final config from CLI flags, environment, TOML file, and defaults.
    ///
    /// Precedence:
    ///   1. CLI flags (`--model`)
    ///   2. Env vars (`GIGACOMMIT_MODEL`, read through clap)
    ///   3. TOML `~/.config/gigacommit.toml` or `--config <path>`
    ///   4. Hardcoded defaults
    pub fn from_sources(cli: &Cli) -> Result<Self, ConfigError> {
        let (path, file_cfg) = match &cli.config {
            Some(path) => (path.clone(), load_file_config(path)?),
            None => {
                let path = config_path().unwrap_or_else(|| PathBuf::from("~/.config/gigacommit.toml"));
                let file_cfg = if path.exists() {
                    load_file_config(&path)?
                } else {
                    log::debug!("No config file at {}", path.display());
                    FileConfig::default()
                };
                (path, file_cfg)
            }
        };

        Self::resolve(cli, file_cfg, path)
    }

    /// Merge already-loaded sources.
    pub fn resolve(cli: &Cli, file_cfg: FileConfig, config_path: PathBuf) -> Result<Self, ConfigError> {
        let scope = cli
            .scope
            .clone()
            .or(file_cfg.scope)
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string());

        if !SCOPES.contains(&scope.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "scope",
                value: scope,
            });
        }

        let cfg = Config {
            auth_key: cli.auth_key.clone().or(file_cfg.auth_key),
            prompt: cli
                .prompt
                .clone()
                .or(file_cfg.prompt)
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            model: cli
                .model
                .clone()
                .or(file_cfg.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            stream: cli.stream.or(file_cfg.stream).unwrap_or(true),
            max_tokens: file_cfg.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            scope,
            auth_url: file_cfg
                .auth_url
                .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            chat_url: file_cfg
                .chat_url
                .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            accept_invalid_certs: file_cfg.accept_invalid_certs.unwrap_or(false),
            timeout_secs: file_cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            fragments: file_cfg.fragments.unwrap_or_default(),
            apply: cli.apply,
            config_path,
        };

        log::debug!(
            "Resolved config: model={}, stream={}, scope={}, fragments={:?}",
            cfg.model,
            cfg.stream,
            cfg.scope,
            cfg.fragments
        );

        Ok(cfg)
    }

    pub fn suggest_settings(&self) -> SuggestSettings {
        SuggestSettings {
            auth_key: self.auth_key.clone(),
            prompt: self.prompt.clone(),
            model: Some(self.model.clone()),
            max_tokens: self.max_tokens,
            stream: self.stream,
            fragments: self.fragments,
            config_hint: self.config_path.display().to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub auth_key: Option<String>,
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub stream: Option<bool>,
    pub max_tokens: Option<u32>,
    pub scope: Option<String>,
    pub auth_url: Option<String>,
    pub chat_url: Option<String>,
    /// The GigaChat endpoints are signed by a CA most systems do not trust.
    pub accept_invalid_certs: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub fragments: Option<FragmentPolicy>,
}

/// Return `~/.config/gigacommit.toml`
fn config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("gigacommit.toml"))
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<FileConfig>(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
