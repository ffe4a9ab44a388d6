//! gigacommit - suggests a commit message for the staged changes of a Git
//! repository by sending them, with an instruction prompt, to GigaChat.

pub mod changes;
pub mod cli_args;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod logging;
pub mod session;
pub mod setup;
pub mod suggest;
pub mod terminal;
pub mod vcs;

pub use changes::{ChangeRecord, ChangeStatus, ClassifiedChanges, classify};
pub use error::{AuthError, ChatError, ClassifyError, CollaboratorError, ConfigError, SuggestError, VcsError};
pub use suggest::{FragmentPolicy, Outcome, Suggester, SuggestSettings};
