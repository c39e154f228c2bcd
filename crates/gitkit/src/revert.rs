//! Rollback/revert engine.
//!
//! Synthesizes a commit that reproduces an older tree state, and provides
//! the hard-reset reconciliation against HEAD. Each file operation is
//! attempted independently; failures are logged and skipped, but no revert
//! commit is ever created unless the reconciliation loop completed without
//! failures. A partial restore must not claim success.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::config::Identity;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::store::{short_oid, CommitInfo, ObjectStore, Oid};

/// Result of [`revert_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertOutcome {
    /// HEAD already matches the target; no commit was created.
    AlreadyAtTarget,
    /// A revert commit was created.
    Reverted {
        /// Oid of the new commit.
        oid: Oid,
        /// Number of commits rolled back.
        rolled_back: usize,
    },
}

/// Revert the repository to the tree of `target`, committing the result.
///
/// The new commit's parent is the current tip, so history is preserved;
/// its message names the target and enumerates every rolled-back commit.
pub async fn revert_to(
    store: &dyn ObjectStore,
    fs: &Arc<dyn FileSystem>,
    dir: &Path,
    target: &str,
    author: &Identity,
) -> Result<RevertOutcome> {
    let tip = store.resolve_ref(dir, "HEAD").await?;
    let target_oid = store.resolve_ref(dir, target).await?;
    if tip == target_oid {
        return Ok(RevertOutcome::AlreadyAtTarget);
    }

    let rolled_back = commits_since(store, dir, &target_oid, &tip).await?;

    let target_tree: BTreeMap<String, Oid> =
        store.tree_entries(dir, &target_oid).await?.into_iter().collect();
    let tip_tree: BTreeMap<String, Oid> =
        store.tree_entries(dir, &tip).await?.into_iter().collect();

    let mut failed: Vec<String> = Vec::new();

    // Drop paths that exist only at the tip.
    for path in tip_tree.keys().filter(|p| !target_tree.contains_key(*p)) {
        if let Err(e) = remove_path(store, fs, dir, path).await {
            warn!(path = %path, error = %e, "revert: failed to remove path");
            failed.push(path.clone());
        }
    }

    // Restore every path from the target tree and stage it.
    for (path, blob_oid) in &target_tree {
        if let Err(e) = restore_path(store, fs, dir, path, blob_oid).await {
            warn!(path = %path, error = %e, "revert: failed to restore path");
            failed.push(path.clone());
        }
    }

    if !failed.is_empty() {
        return Err(Error::Internal(format!(
            "revert incomplete: {} path(s) could not be restored ({})",
            failed.len(),
            failed.join(", ")
        )));
    }

    let message = revert_message(&target_oid, &rolled_back);
    match store.commit(dir, &message, author).await {
        Ok(oid) => Ok(RevertOutcome::Reverted { oid, rolled_back: rolled_back.len() }),
        // Distinct commits can share a tree; the working state already
        // matches the target then.
        Err(Error::NothingToCommit) => Ok(RevertOutcome::AlreadyAtTarget),
        Err(e) => Err(e),
    }
}

/// Reconcile index and working tree with HEAD, removing untracked files.
///
/// Runs the same per-file loop as [`revert_to`] but against HEAD's tree
/// and without committing.
pub async fn hard_reset_to_head(
    store: &dyn ObjectStore,
    fs: &Arc<dyn FileSystem>,
    dir: &Path,
) -> Result<()> {
    let head = store.resolve_ref(dir, "HEAD").await?;
    let head_tree: BTreeMap<String, Oid> =
        store.tree_entries(dir, &head).await?.into_iter().collect();

    let mut failed: Vec<String> = Vec::new();

    for row in store.status_matrix(dir).await? {
        if head_tree.contains_key(&row.path) {
            continue;
        }
        // Tracked-by-index or untracked: either way the path goes.
        if let Err(e) = remove_path(store, fs, dir, &row.path).await {
            warn!(path = %row.path, error = %e, "hard reset: failed to remove path");
            failed.push(row.path);
        }
    }

    for (path, blob_oid) in &head_tree {
        if let Err(e) = restore_path(store, fs, dir, path, blob_oid).await {
            warn!(path = %path, error = %e, "hard reset: failed to restore path");
            failed.push(path.clone());
        }
    }

    if !failed.is_empty() {
        return Err(Error::Internal(format!(
            "hard reset incomplete: {} path(s) could not be restored ({})",
            failed.len(),
            failed.join(", ")
        )));
    }
    Ok(())
}

/// Commits reachable from `tip` (inclusive) down to `target` (exclusive),
/// following first parents.
async fn commits_since(
    store: &dyn ObjectStore,
    dir: &Path,
    target: &str,
    tip: &str,
) -> Result<Vec<CommitInfo>> {
    let mut commits = Vec::new();
    let mut cursor = Some(tip.to_string());
    while let Some(oid) = cursor {
        if oid == target {
            return Ok(commits);
        }
        let commit = store.read_commit(dir, &oid).await?;
        cursor = commit.parents.first().cloned();
        commits.push(commit);
    }
    Err(Error::Internal(format!(
        "commit {} is not an ancestor of HEAD",
        short_oid(target)
    )))
}

async fn remove_path(
    store: &dyn ObjectStore,
    fs: &Arc<dyn FileSystem>,
    dir: &Path,
    path: &str,
) -> Result<()> {
    let abs = dir.join(path);
    if fs.exists(&abs).await? {
        fs.remove(&abs, false).await?;
    }
    store.remove_from_index(dir, path).await
}

async fn restore_path(
    store: &dyn ObjectStore,
    fs: &Arc<dyn FileSystem>,
    dir: &Path,
    path: &str,
    blob_oid: &str,
) -> Result<()> {
    let content = store.read_blob(dir, blob_oid).await?;
    let abs = dir.join(path);
    if let Some(parent) = abs.parent() {
        if !fs.exists(parent).await? {
            fs.mkdir(parent, true).await?;
        }
    }
    fs.write_file(&abs, &content).await?;
    store.stage_path(dir, path).await
}

fn revert_message(target: &str, rolled_back: &[CommitInfo]) -> String {
    let mut message = format!("Revert to commit {}\n", short_oid(target));
    if !rolled_back.is_empty() {
        message.push_str("\nRolled back commits:\n");
        for commit in rolled_back {
            message.push_str(&format!("  {} {}\n", short_oid(&commit.oid), commit.summary()));
        }
    }
    message
}
