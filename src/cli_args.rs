use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// CLI options
#[derive(Parser, Debug, Default)]
#[command(
    name = "gigacommit",
    version,
    about = "Suggest a Git commit message for the staged changes using GigaChat",
    after_help = "Press Ctrl-C while the model is thinking to cancel the request."
)]
pub struct Cli {
    /// If set, write the generated message into .git/COMMIT_EDITMSG (no commit is created)
    #[arg(long)]
    pub apply: bool,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// GigaChat authorization key (Base64 of client_id:client_secret)
    #[arg(long, env = "GIGACOMMIT_AUTH_KEY", hide_env_values = true)]
    pub auth_key: Option<String>,

    /// Model name to use (e.g. GigaChat, GigaChat-Pro)
    #[arg(long, env = "GIGACOMMIT_MODEL")]
    pub model: Option<String>,

    /// Instruction sent to the model ahead of the staged changes
    #[arg(long, env = "GIGACOMMIT_PROMPT")]
    pub prompt: Option<String>,

    /// API scope requested with the access token
    #[arg(long, env = "GIGACOMMIT_SCOPE")]
    pub scope: Option<String>,

    /// Stream the reply as it is generated (true/false)
    #[arg(long, env = "GIGACOMMIT_STREAM", value_name = "BOOL")]
    pub stream: Option<bool>,

    /// Config file to read instead of ~/.config/gigacommit.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
