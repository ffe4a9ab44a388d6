//! Git CLI adapter for the VCS capabilities.
//!
//! Shells out to `git` via `tokio::process::Command`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::changes::{ChangeRecord, ChangeStatus, DiffSource};
use crate::error::VcsError;
use crate::vcs::{InputBox, Repository, Vcs};

/// Run a git command in `dir` and capture stdout as String.
pub async fn git_output(dir: &Path, args: &[&str]) -> Result<String, VcsError> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|source| VcsError::Spawn {
            args: owned(args),
            source,
        })?;

    if !output.status.success() {
        return Err(VcsError::Failed {
            args: owned(args),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Get the absolute path to the Git directory (e.g. .git)
pub async fn git_dir(dir: &Path) -> Result<PathBuf, VcsError> {
    let out = git_output(dir, &["rev-parse", "--absolute-git-dir"]).await?;
    Ok(PathBuf::from(out.trim()))
}

/// Write the commit message into .git/COMMIT_EDITMSG so the next `git commit`
/// will use it as the default message in the editor.
pub async fn write_commit_editmsg(dir: &Path, message: &str) -> Result<PathBuf, VcsError> {
    let path = git_dir(dir).await?.join("COMMIT_EDITMSG");
    tokio::fs::write(&path, message)
        .await
        .map_err(|source| VcsError::WriteMessage {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Parse `git diff --cached --name-status -z` output.
pub fn parse_name_status(output: &str) -> Vec<ChangeRecord> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut changes = Vec::new();

    while let Some(status) = fields.next() {
        let Some(path) = fields.next() else { break };

        let record = match status.chars().next() {
            Some('R') => match fields.next() {
                Some(to) => ChangeRecord::renamed(path, to),
                None => break,
            },
            // Copies leave the source in place; the new file is what changed.
            Some('C') => match fields.next() {
                Some(to) => ChangeRecord::added(to),
                None => break,
            },
            Some('D') => ChangeRecord::deleted(path),
            Some('M') => ChangeRecord::modified(path),
            Some('A') => ChangeRecord::added(path),
            _ => ChangeRecord::with_status(ChangeStatus::Other(status.to_string()), path),
        };
        changes.push(record);
    }

    changes
}

/// The `git` executable, used from a working directory.
pub struct GitCli {
    work_dir: PathBuf,
    input_box: Arc<dyn InputBox>,
}

impl GitCli {
    /// `None` when no `git` executable is on the PATH.
    pub fn locate(work_dir: impl Into<PathBuf>, input_box: Arc<dyn InputBox>) -> Option<Self> {
        match which::which("git") {
            Ok(path) => {
                log::debug!("Using git at {}", path.display());
                Some(GitCli {
                    work_dir: work_dir.into(),
                    input_box,
                })
            }
            Err(e) => {
                log::warn!("git executable not found: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn repository(&self) -> Result<Option<Arc<dyn Repository>>, VcsError> {
        let root = match git_output(&self.work_dir, &["rev-parse", "--show-toplevel"]).await {
            Ok(out) => PathBuf::from(out.trim()),
            Err(VcsError::Failed { stderr, .. }) => {
                log::debug!("Not inside a git repository: {stderr}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        log::info!("Using repository at {}", root.display());

        let repo: Arc<dyn Repository> = Arc::new(GitRepository {
            root,
            input_box: Arc::clone(&self.input_box),
        });
        Ok(Some(repo))
    }
}

/// A working tree whose index is read with `git diff --cached`.
pub struct GitRepository {
    root: PathBuf,
    input_box: Arc<dyn InputBox>,
}

#[async_trait]
impl DiffSource for GitRepository {
    async fn diff(&self, path: &str) -> Result<String, VcsError> {
        git_output(&self.root, &["diff", "--cached", "--", path]).await
    }
}

#[async_trait]
impl Repository for GitRepository {
    async fn staged_changes(&self) -> Result<Vec<ChangeRecord>, VcsError> {
        let out = git_output(&self.root, &["diff", "--cached", "--name-status", "-M", "-z"]).await?;
        Ok(parse_name_status(&out))
    }

    fn input_box(&self) -> &dyn InputBox {
        self.input_box.as_ref()
    }
}
