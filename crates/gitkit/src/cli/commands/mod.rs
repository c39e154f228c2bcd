//! Subcommand handlers.
//!
//! Every handler implements [`Command`] and receives the shared
//! [`CmdContext`]. Handlers parse their own argument grammar, call the
//! object store, and format stdout/stderr; they never print directly.

pub mod branching;
pub mod configure;
pub mod inspect;
pub mod remote;
pub mod stage;
pub mod start;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::CmdOutput;
use crate::config::Identity;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::store::{AuthCallback, ObjectStore, Signer};

/// Shared execution context injected into every handler.
pub struct CmdContext {
    /// Virtual filesystem.
    pub fs: Arc<dyn FileSystem>,
    /// Object store.
    pub store: Arc<dyn ObjectStore>,
    /// Repository working directory.
    pub workdir: PathBuf,
    /// Fallback commit author when config has no `user.name`.
    pub identity: Identity,
    /// Optional payload signer for push.
    pub signer: Option<Arc<dyn Signer>>,
    /// Optional credential callback for push.
    pub on_auth: Option<AuthCallback>,
}

/// A single git subcommand.
#[async_trait]
pub trait Command: Send + Sync {
    /// Execute with the arguments after the subcommand name.
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput>;
}

/// Fail with [`Error::NotARepository`] unless the workdir is a repository.
pub async fn require_repo(ctx: &CmdContext) -> Result<()> {
    if ctx.store.is_repository(&ctx.workdir).await? {
        Ok(())
    } else {
        Err(Error::NotARepository(ctx.workdir.clone()))
    }
}

/// Commit author for this repository: `user.name`/`user.email` from config
/// (repo scope over global) with the context identity as fallback.
pub async fn resolve_identity(ctx: &CmdContext) -> Result<Identity> {
    let dir = Some(ctx.workdir.as_path());
    let name = match ctx.store.get_config(dir, "user.name").await? {
        Some(v) => Some(v),
        None => ctx.store.get_config(None, "user.name").await?,
    };
    let email = match ctx.store.get_config(dir, "user.email").await? {
        Some(v) => Some(v),
        None => ctx.store.get_config(None, "user.email").await?,
    };
    Ok(Identity::new().author(
        name.unwrap_or_else(|| ctx.identity.name().to_string()),
        email.unwrap_or_else(|| ctx.identity.email().to_string()),
    ))
}

/// Usage error helper: `error: <msg>` on stderr with exit code 1.
pub fn usage(msg: impl Into<String>) -> Result<CmdOutput> {
    Ok(CmdOutput::err(format!("error: {}\n", msg.into()), 1))
}
