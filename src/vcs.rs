//! Capabilities the suggestion pipeline needs from version control.

use std::sync::Arc;

use async_trait::async_trait;

use crate::changes::{ChangeRecord, DiffSource};
use crate::error::VcsError;

/// Entry point to the version-control tooling.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// The repository to work on, or `None` when there is none here.
    async fn repository(&self) -> Result<Option<Arc<dyn Repository>>, VcsError>;
}

/// A repository with an index and a commit message box.
#[async_trait]
pub trait Repository: DiffSource {
    async fn staged_changes(&self) -> Result<Vec<ChangeRecord>, VcsError>;

    fn input_box(&self) -> &dyn InputBox;
}

/// Commit message input. Every call replaces the whole value.
pub trait InputBox: Send + Sync {
    fn set_value(&self, value: &str);
}
