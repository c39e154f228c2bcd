//! Error types for GitKit
//!
//! Two families live in one enum:
//! - precondition errors, detected before any storage mutation (missing
//!   repository, unknown ref/remote, target already exists);
//! - storage/sync errors, surfaced as a closed set of typed variants so the
//!   sync conflict classifier never has to match on message text.
//!
//! Display strings carry the conventional `fatal:`/`error:` prefixes; the
//! dispatcher writes them to stderr verbatim.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using GitKit's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// GitKit error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The directory has no `.git` control directory.
    #[error("fatal: not a git repository (or any of the parent directories): {}/.git", .0.display())]
    NotARepository(PathBuf),

    /// A revision or ref name did not resolve to an object.
    #[error("fatal: ambiguous argument '{0}': unknown revision or path not in the working tree")]
    RefNotFound(String),

    /// An object id did not resolve in the object store.
    #[error("fatal: bad object {0}")]
    ObjectNotFound(String),

    /// Branch creation target already exists.
    #[error("fatal: a branch named '{0}' already exists")]
    BranchExists(String),

    /// Branch deletion target does not exist.
    #[error("error: branch '{0}' not found")]
    BranchNotFound(String),

    /// Refusing to delete the branch HEAD points at.
    #[error("error: cannot delete branch '{}' checked out at '{}'", .0, .1.display())]
    BranchCheckedOut(String, PathBuf),

    /// Refusing to delete a branch whose commits are not in HEAD's history.
    #[error("error: the branch '{0}' is not fully merged\nhint: use 'git branch -D {0}' to force delete")]
    BranchNotMerged(String),

    /// Tag creation target already exists.
    #[error("fatal: tag '{0}' already exists")]
    TagExists(String),

    /// Tag deletion target does not exist.
    #[error("error: tag '{0}' not found")]
    TagNotFound(String),

    /// Remote creation target already exists.
    #[error("error: remote {0} already exists.")]
    RemoteExists(String),

    /// Remote lookup failed.
    #[error("error: No such remote: '{0}'")]
    RemoteNotFound(String),

    /// A remote URL did not point at a repository.
    #[error("fatal: repository '{0}' not found")]
    RepositoryNotFound(String),

    /// Commit attempted with an index identical to HEAD.
    #[error("nothing to commit, working tree clean")]
    NothingToCommit,

    /// Config key with no section component.
    #[error("error: key does not contain a section: {0}")]
    InvalidConfigKey(String),

    /// Config key outside the supported fixed key set.
    #[error("error: unsupported configuration key: {0}")]
    UnsupportedConfigKey(String),

    /// I/O error from virtual filesystem operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // Sync failures (closed set consumed by the conflict classifier).
    /// The transport rejected the provided credentials.
    #[error("error: authentication failed")]
    AuthenticationFailed,

    /// The remote refused a non-fast-forward ref update.
    #[error("error: failed to push some refs: {0}")]
    PushRejected(String),

    /// Local and remote histories diverged; fast-forward is impossible.
    #[error("error: not possible to fast-forward")]
    FastForwardUnsupported,

    /// The operation would need a merge commit the store cannot represent.
    #[error("error: merges are not supported by this store")]
    MergeUnsupported,

    /// The transport could not reach the remote at all.
    #[error("error: network failure: {0}")]
    NetworkFailure(String),

    /// The transport reached the remote but got a failing HTTP status.
    #[error("error: HTTP {code}: {text}")]
    HttpStatus { code: u16, text: String },

    /// The store requires a signer for this operation and none was given.
    #[error("error: this operation requires a configured signer")]
    SignerRequired,

    /// Internal error for unexpected failures.
    #[error("fatal: internal error: {0}")]
    Internal(String),
}
