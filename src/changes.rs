use async_trait::async_trait;

use crate::error::{ClassifyError, VcsError};

/// Status of a single staged file as reported by the VCS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    Modified,
    Added,
    Renamed,
    Deleted,
    /// Anything else (copies, type changes, unmerged entries, ...).
    Other(String),
}

/// One staged file change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub status: ChangeStatus,
    pub path: String,
    /// Present for renames and deletions.
    pub original_path: Option<String>,
    /// Present for renames.
    pub renamed_to_path: Option<String>,
}

impl ChangeRecord {
    pub fn modified(path: impl Into<String>) -> Self {
        Self::with_status(ChangeStatus::Modified, path)
    }

    pub fn added(path: impl Into<String>) -> Self {
        Self::with_status(ChangeStatus::Added, path)
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        let path = path.into();
        ChangeRecord {
            status: ChangeStatus::Deleted,
            original_path: Some(path.clone()),
            path,
            renamed_to_path: None,
        }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        let to = to.into();
        ChangeRecord {
            status: ChangeStatus::Renamed,
            path: to.clone(),
            original_path: Some(from.into()),
            renamed_to_path: Some(to),
        }
    }

    pub fn with_status(status: ChangeStatus, path: impl Into<String>) -> Self {
        ChangeRecord {
            status,
            path: path.into(),
            original_path: None,
            renamed_to_path: None,
        }
    }

    fn original_or_path(&self) -> &str {
        self.original_path.as_deref().unwrap_or(&self.path)
    }
}

/// Something that can produce the staged unified diff of a single file.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn diff(&self, path: &str) -> Result<String, VcsError>;
}

/// Staged changes rendered into text, one fragment per change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedChanges {
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<String>,
}

impl ClassifiedChanges {
    pub fn len(&self) -> usize {
        self.modified.len() + self.deleted.len() + self.renamed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition staged changes into modified/deleted/renamed fragments.
///
/// Diffs are fetched one file at a time so fragments keep the reported order.
pub async fn classify<D>(changes: &[ChangeRecord], diffs: &D) -> Result<ClassifiedChanges, ClassifyError>
where
    D: DiffSource + ?Sized,
{
    if changes.is_empty() {
        return Err(ClassifyError::NoStagedChanges);
    }

    let mut out = ClassifiedChanges::default();

    for change in changes {
        match change.status {
            ChangeStatus::Renamed => {
                let to = change.renamed_to_path.as_deref().unwrap_or(&change.path);
                out.renamed
                    .push(format!("RENAMED: {} to {};", change.original_or_path(), to));
            }
            ChangeStatus::Deleted => {
                out.deleted
                    .push(format!("DELETED: {};", change.original_or_path()));
            }
            _ => {
                log::debug!("Fetching staged diff for {} ({:?})", change.path, change.status);
                let diff = diffs.diff(&change.path).await?;
                out.modified.push(diff);
            }
        }
    }

    log::info!(
        "Classified {} change(s): {} diff(s), {} deletion(s), {} rename(s)",
        out.len(),
        out.modified.len(),
        out.deleted.len(),
        out.renamed.len()
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeDiffs {
        diffs: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeDiffs {
        fn new(pairs: &[(&str, &str)]) -> Self {
            FakeDiffs {
                diffs: pairs
                    .iter()
                    .map(|(p, d)| (p.to_string(), d.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DiffSource for FakeDiffs {
        async fn diff(&self, path: &str) -> Result<String, VcsError> {
            self.calls.lock().unwrap().push(path.to_string());
            Ok(self.diffs.get(path).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn empty_input_is_no_staged_changes() {
        let diffs = FakeDiffs::new(&[]);
        let err = classify(&[], &diffs).await.unwrap_err();
        assert!(matches!(err, ClassifyError::NoStagedChanges));
    }

    #[tokio::test]
    async fn renders_each_category() {
        let diffs = FakeDiffs::new(&[("src/lib.rs", "--- a\n+++ b")]);
        let changes = vec![
            ChangeRecord::renamed("old.ts", "new.ts"),
            ChangeRecord::modified("src/lib.rs"),
            ChangeRecord::deleted("original/path"),
        ];

        let out = classify(&changes, &diffs).await.unwrap();

        assert_eq!(out.modified, vec!["--- a\n+++ b"]);
        assert_eq!(out.deleted, vec!["DELETED: original/path;"]);
        assert_eq!(out.renamed, vec!["RENAMED: old.ts to new.ts;"]);
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn only_non_rename_non_delete_changes_fetch_diffs() {
        let diffs = FakeDiffs::new(&[]);
        let changes = vec![
            ChangeRecord::deleted("gone.rs"),
            ChangeRecord::added("new.rs"),
            ChangeRecord::renamed("a.rs", "b.rs"),
            ChangeRecord::with_status(ChangeStatus::Other("T".into()), "link"),
        ];

        classify(&changes, &diffs).await.unwrap();

        assert_eq!(*diffs.calls.lock().unwrap(), vec!["new.rs", "link"]);
    }

    #[tokio::test]
    async fn preserves_order_within_categories() {
        let diffs = FakeDiffs::new(&[("a", "diff a"), ("b", "diff b"), ("c", "diff c")]);
        let changes = vec![
            ChangeRecord::modified("c"),
            ChangeRecord::deleted("z"),
            ChangeRecord::modified("a"),
            ChangeRecord::renamed("r1", "r2"),
            ChangeRecord::deleted("y"),
            ChangeRecord::modified("b"),
            ChangeRecord::renamed("q1", "q2"),
        ];

        let out = classify(&changes, &diffs).await.unwrap();

        assert_eq!(out.modified, vec!["diff c", "diff a", "diff b"]);
        assert_eq!(out.deleted, vec!["DELETED: z;", "DELETED: y;"]);
        assert_eq!(
            out.renamed,
            vec!["RENAMED: r1 to r2;", "RENAMED: q1 to q2;"]
        );
    }

    #[tokio::test]
    async fn rename_without_target_falls_back_to_path() {
        let diffs = FakeDiffs::new(&[]);
        let mut change = ChangeRecord::with_status(ChangeStatus::Renamed, "now.rs");
        change.original_path = Some("before.rs".into());

        let out = classify(&[change], &diffs).await.unwrap();
        assert_eq!(out.renamed, vec!["RENAMED: before.rs to now.rs;"]);
    }
}
