//! Object-store adapter
//!
//! The command layer talks to repository storage through the async
//! [`ObjectStore`] trait: refs, index, commits, status matrix, remotes,
//! config. [`VfsStore`] is the default implementation, keeping all state
//! inside the virtual filesystem. Implementations must surface sync
//! failures as the typed variants in [`crate::Error`] (authentication,
//! rejected push, fast-forward, merge, network, HTTP status) so callers
//! never classify by message text.

mod vfs;

pub use vfs::VfsStore;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::Identity;
use crate::error::Result;

/// Content-derived object id (40-char lowercase hex).
pub type Oid = String;

/// Abbreviate an oid for display.
pub fn short_oid(oid: &str) -> &str {
    &oid[..7.min(oid.len())]
}

/// One row of the status matrix: the blob oid of a path as seen by HEAD,
/// the working tree, and the index. `None` means the path is absent on
/// that side. Derived fresh per query, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// Path relative to the repository root.
    pub path: String,
    /// Blob oid in the HEAD commit's tree.
    pub head: Option<Oid>,
    /// Blob oid of the working tree file contents.
    pub workdir: Option<Oid>,
    /// Blob oid recorded in the index.
    pub stage: Option<Oid>,
}

/// An immutable commit node.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// Commit oid.
    pub oid: Oid,
    /// Tree oid.
    pub tree: Oid,
    /// Parent commit oids (empty for a root commit).
    pub parents: Vec<Oid>,
    /// Author as `Name <email>`.
    pub author: String,
    /// Author timestamp (Unix time).
    pub timestamp: i64,
    /// Free-text commit message.
    pub message: String,
}

impl CommitInfo {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Remote name (`origin` by convention).
    pub remote: String,
    /// Remote URL.
    pub url: String,
}

/// Credentials produced by an auth callback during push.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Callback invoked by the store when a transport demands credentials.
pub type AuthCallback = Arc<dyn Fn(&str) -> Option<Credentials> + Send + Sync>;

/// Signs push payloads for stores that require signed updates.
pub trait Signer: Send + Sync {
    /// Sign the given payload, returning the signature bytes.
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

/// Options for [`ObjectStore::checkout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutOptions {
    /// Overwrite local modifications.
    pub force: bool,
    /// Move HEAD without touching the working tree.
    pub no_checkout: bool,
}

/// Options for [`ObjectStore::push`].
#[derive(Clone, Default)]
pub struct PushOptions {
    /// Allow non-fast-forward ref updates.
    pub force: bool,
    /// Credential callback, invoked with the remote URL.
    pub on_auth: Option<AuthCallback>,
    /// Optional payload signer.
    pub signer: Option<Arc<dyn Signer>>,
}

/// Options for [`ObjectStore::clone_repo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneOptions {
    /// Fetch only the default branch.
    pub single_branch: bool,
    /// Truncate history to this many commits.
    pub depth: Option<usize>,
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote ref already pointed at the local oid.
    UpToDate,
    /// The remote ref was updated.
    Updated {
        /// Previous remote oid, if the ref existed.
        old: Option<Oid>,
        /// New remote oid.
        new: Oid,
    },
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The local branch already contained the remote's history.
    UpToDate,
    /// The local branch was fast-forwarded.
    FastForwarded {
        /// Previous local oid, if the branch existed.
        old: Option<Oid>,
        /// New local oid.
        new: Oid,
    },
}

/// Async object-store operations against one repository directory.
///
/// All mutating operations must leave the repository queryable: no
/// half-written index, no dangling ref update.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create an empty repository at `dir` with the given default branch.
    async fn init(&self, dir: &Path, default_branch: &str) -> Result<()>;

    /// Check whether `dir` contains a control directory.
    async fn is_repository(&self, dir: &Path) -> Result<bool>;

    /// Resolve a revision (ref name, `HEAD`, tag, or oid prefix) to an oid.
    async fn resolve_ref(&self, dir: &Path, refish: &str) -> Result<Oid>;

    /// Name of the branch HEAD points at, or `None` when detached.
    async fn current_branch(&self, dir: &Path) -> Result<Option<String>>;

    /// All local branch names, sorted.
    async fn list_branches(&self, dir: &Path) -> Result<Vec<String>>;

    /// Create a branch pointing at `target`.
    async fn create_branch(&self, dir: &Path, name: &str, target: &str) -> Result<()>;

    /// Delete a branch ref. Fails if it is checked out.
    async fn delete_branch(&self, dir: &Path, name: &str) -> Result<Oid>;

    /// Move a branch ref to `target`, creating it if absent (force-reset).
    async fn force_branch(&self, dir: &Path, name: &str, target: &str) -> Result<()>;

    /// Move HEAD to `refish`, reconciling index and working tree unless
    /// `no_checkout` is set.
    async fn checkout(&self, dir: &Path, refish: &str, opts: CheckoutOptions) -> Result<()>;

    /// Three-way per-path comparison of HEAD, working tree, and index.
    async fn status_matrix(&self, dir: &Path) -> Result<Vec<StatusRow>>;

    /// Paths in a commit's tree (or the index when `refish` is `None`), sorted.
    async fn list_files(&self, dir: &Path, refish: Option<&str>) -> Result<Vec<String>>;

    /// `(path, blob oid)` pairs of a commit's tree, sorted by path.
    async fn tree_entries(&self, dir: &Path, refish: &str) -> Result<Vec<(String, Oid)>>;

    /// Read blob contents by oid.
    async fn read_blob(&self, dir: &Path, oid: &str) -> Result<Vec<u8>>;

    /// Store blob contents, returning the content-derived oid.
    async fn write_blob(&self, dir: &Path, content: &[u8]) -> Result<Oid>;

    /// Stage a working-tree path (records deletion if the file is gone).
    async fn stage_path(&self, dir: &Path, path: &str) -> Result<()>;

    /// Remove a path from the index (queues a deletion).
    async fn remove_from_index(&self, dir: &Path, path: &str) -> Result<()>;

    /// Restore a path's index entry to its state in `refish`, or HEAD when
    /// `None` (unstage). Paths absent from that tree are dropped.
    async fn reset_index_path(&self, dir: &Path, refish: Option<&str>, path: &str) -> Result<()>;

    /// Record the index as a commit. Fails with
    /// [`crate::Error::NothingToCommit`] when the index matches HEAD's tree.
    async fn commit(&self, dir: &Path, message: &str, author: &Identity) -> Result<Oid>;

    /// Commit history from HEAD, newest first, following first parents.
    async fn log(&self, dir: &Path, depth: Option<usize>) -> Result<Vec<CommitInfo>>;

    /// Read a single commit by oid.
    async fn read_commit(&self, dir: &Path, oid: &str) -> Result<CommitInfo>;

    /// Whether `ancestor` is reachable from `descendant` (or equal to it).
    async fn is_ancestor(&self, dir: &Path, ancestor: &str, descendant: &str) -> Result<bool>;

    /// All configured remotes.
    async fn list_remotes(&self, dir: &Path) -> Result<Vec<RemoteInfo>>;

    /// Add a remote. Fails if the name exists.
    async fn add_remote(&self, dir: &Path, remote: &str, url: &str) -> Result<()>;

    /// Delete a remote. Fails if the name is absent.
    async fn delete_remote(&self, dir: &Path, remote: &str) -> Result<()>;

    /// Push a branch to a remote.
    async fn push(
        &self,
        dir: &Path,
        remote: &str,
        refname: &str,
        opts: PushOptions,
    ) -> Result<PushOutcome>;

    /// Fetch a remote's branches into remote-tracking refs.
    async fn fetch(&self, dir: &Path, remote: &str) -> Result<()>;

    /// Fetch then fast-forward the named branch.
    async fn pull(&self, dir: &Path, remote: &str, refname: &str) -> Result<PullOutcome>;

    /// Clone the repository at `url` into `dest`.
    async fn clone_repo(&self, url: &str, dest: &Path, opts: CloneOptions) -> Result<()>;

    /// Read a config value. `dir = None` addresses the global scope.
    async fn get_config(&self, dir: Option<&Path>, key: &str) -> Result<Option<String>>;

    /// Write a config value. `dir = None` addresses the global scope.
    async fn set_config(&self, dir: Option<&Path>, key: &str, value: &str) -> Result<()>;

    /// All `(key, value)` config pairs in scope, sorted by key.
    async fn list_config(&self, dir: Option<&Path>) -> Result<Vec<(String, String)>>;

    /// All tag names, sorted.
    async fn list_tags(&self, dir: &Path) -> Result<Vec<String>>;

    /// Create a lightweight tag pointing at `target`.
    async fn create_tag(&self, dir: &Path, name: &str, target: &str) -> Result<()>;

    /// Delete a tag, returning the oid it pointed at.
    async fn delete_tag(&self, dir: &Path, name: &str) -> Result<Oid>;
}
