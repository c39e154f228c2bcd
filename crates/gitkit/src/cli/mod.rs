//! Command dispatcher
//!
//! [`GitCli`] resolves `argv[0]` against a fixed subcommand registry and
//! routes to the matching handler. All handlers share one injected
//! context: filesystem, object store, working directory, author identity,
//! and optional auth callback/signer. One command runs at a time per
//! repository handle; independent handles share no mutable state.
//!
//! # Example
//!
//! ```rust
//! use gitkit::GitCli;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> gitkit::Result<()> {
//! let cli = GitCli::builder().workdir("/repo").build();
//! let out = cli.execute(&["init".to_string()]).await;
//! assert_eq!(out.exit_code, 0);
//! # Ok(())
//! # }
//! ```

mod commands;

pub(crate) use commands::CmdContext;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Identity;
use crate::fs::{FileSystem, InMemoryFs};
use crate::store::{AuthCallback, ObjectStore, Signer, VfsStore};

use commands::{branching, configure, inspect, remote, stage, start, Command};

/// Result of one command execution.
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code
    pub exit_code: i32,
}

impl CmdOutput {
    /// Create a successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), stderr: String::new(), exit_code: 0 }
    }

    /// Create a failed result with the given stderr.
    pub fn err(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self { stdout: String::new(), stderr: stderr.into(), exit_code }
    }

    /// Check if the result indicates success.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Fixed subcommand registry, built once; no open-ended dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmd {
    Init,
    Clone,
    Add,
    Commit,
    Reset,
    Stash,
    Status,
    Log,
    Diff,
    Show,
    Branch,
    Checkout,
    Tag,
    Remote,
    Push,
    Pull,
    Fetch,
    Config,
}

const REGISTRY: &[(&str, Cmd)] = &[
    ("init", Cmd::Init),
    ("clone", Cmd::Clone),
    ("add", Cmd::Add),
    ("commit", Cmd::Commit),
    ("reset", Cmd::Reset),
    ("stash", Cmd::Stash),
    ("status", Cmd::Status),
    ("log", Cmd::Log),
    ("diff", Cmd::Diff),
    ("show", Cmd::Show),
    ("branch", Cmd::Branch),
    ("checkout", Cmd::Checkout),
    ("tag", Cmd::Tag),
    ("remote", Cmd::Remote),
    ("push", Cmd::Push),
    ("pull", Cmd::Pull),
    ("fetch", Cmd::Fetch),
    ("config", Cmd::Config),
];

fn lookup(name: &str) -> Option<Cmd> {
    REGISTRY.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}

const HELP: &str = "\
usage: git <command> [<args>]

start a working area
   clone      Clone a repository into a new directory
   init       Create an empty Git repository

work on the current change
   add        Add file contents to the index
   commit     Record changes to the repository
   reset      Reset current HEAD to the specified state
   stash      Stash the changes in a dirty working directory

examine the history and state
   branch     List, create, or delete branches
   checkout   Switch branches
   diff       Show changes between commits, trees, and files
   log        Show commit logs
   show       Show commits and file contents
   status     Show the working tree status
   tag        Create, list, or delete tags

collaborate
   fetch      Download objects and refs from another repository
   pull       Fetch and fast-forward the current branch
   push       Update remote refs along with associated objects
   remote     Manage the set of tracked repositories

configuration
   config     Get and set repository or global options
";

/// Virtual git command-line interface.
///
/// Built via [`GitCli::builder`]; see the module docs for an example.
pub struct GitCli {
    ctx: CmdContext,
}

impl GitCli {
    /// Create a builder with default components.
    pub fn builder() -> GitCliBuilder {
        GitCliBuilder::default()
    }

    /// The virtual filesystem behind this CLI.
    pub fn fs(&self) -> Arc<dyn FileSystem> {
        self.ctx.fs.clone()
    }

    /// The object store behind this CLI.
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.ctx.store.clone()
    }

    /// The repository working directory.
    pub fn workdir(&self) -> &std::path::Path {
        &self.ctx.workdir
    }

    /// Execute one command. `argv[0]` is the subcommand name.
    ///
    /// Never panics and never returns an error: failures are reported
    /// through `exit_code` and `stderr` with conventional
    /// `fatal:`/`error:` wording.
    pub async fn execute(&self, argv: &[String]) -> CmdOutput {
        let Some(name) = argv.first() else {
            return CmdOutput::err(HELP, 1);
        };
        match name.as_str() {
            "--help" | "help" => return CmdOutput::ok(HELP),
            "--version" | "version" => {
                return CmdOutput::ok(format!("gitkit version {}\n", env!("CARGO_PKG_VERSION")));
            }
            _ => {}
        }

        let Some(cmd) = lookup(name) else {
            return CmdOutput::err(
                format!("git: '{}' is not a git command. See 'git --help'.\n", name),
                1,
            );
        };

        let args = &argv[1..];
        let result = match cmd {
            Cmd::Init => start::Init.run(&self.ctx, args).await,
            Cmd::Clone => start::Clone.run(&self.ctx, args).await,
            Cmd::Add => stage::Add.run(&self.ctx, args).await,
            Cmd::Commit => stage::Commit.run(&self.ctx, args).await,
            Cmd::Reset => stage::Reset.run(&self.ctx, args).await,
            Cmd::Stash => stage::Stash.run(&self.ctx, args).await,
            Cmd::Status => inspect::Status.run(&self.ctx, args).await,
            Cmd::Log => inspect::Log.run(&self.ctx, args).await,
            Cmd::Diff => inspect::Diff.run(&self.ctx, args).await,
            Cmd::Show => inspect::Show.run(&self.ctx, args).await,
            Cmd::Branch => branching::Branch.run(&self.ctx, args).await,
            Cmd::Checkout => branching::Checkout.run(&self.ctx, args).await,
            Cmd::Tag => branching::Tag.run(&self.ctx, args).await,
            Cmd::Remote => remote::Remote.run(&self.ctx, args).await,
            Cmd::Push => remote::Push.run(&self.ctx, args).await,
            Cmd::Pull => remote::Pull.run(&self.ctx, args).await,
            Cmd::Fetch => remote::Fetch.run(&self.ctx, args).await,
            Cmd::Config => configure::Config.run(&self.ctx, args).await,
        };

        match result {
            Ok(output) => output,
            Err(e) => CmdOutput::err(format!("{}\n", e), 1),
        }
    }
}

/// Builder for [`GitCli`].
#[derive(Default)]
pub struct GitCliBuilder {
    fs: Option<Arc<dyn FileSystem>>,
    store: Option<Arc<dyn ObjectStore>>,
    workdir: Option<PathBuf>,
    identity: Option<Identity>,
    signer: Option<Arc<dyn Signer>>,
    on_auth: Option<AuthCallback>,
}

impl GitCliBuilder {
    /// Use a custom filesystem (default: a fresh [`InMemoryFs`]).
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Use a custom object store (default: [`VfsStore`] over the filesystem).
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the repository working directory (default: `/`).
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Set the fallback commit author identity.
    pub fn author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.identity = Some(Identity::new().author(name, email));
        self
    }

    /// Set the payload signer passed through to push operations.
    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Set the credential callback passed through to push operations.
    pub fn on_auth(mut self, on_auth: AuthCallback) -> Self {
        self.on_auth = Some(on_auth);
        self
    }

    /// Build the CLI.
    pub fn build(self) -> GitCli {
        let fs = self.fs.unwrap_or_else(|| Arc::new(InMemoryFs::new()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(VfsStore::new(fs.clone())));
        GitCli {
            ctx: CmdContext {
                fs,
                store,
                workdir: self.workdir.unwrap_or_else(|| PathBuf::from("/")),
                identity: self.identity.unwrap_or_default(),
                signer: self.signer,
                on_auth: self.on_auth,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let cli = GitCli::builder().build();
        let out = cli.execute(&argv("frobnicate")).await;
        assert_eq!(out.exit_code, 1);
        assert!(out.stderr.contains("'frobnicate' is not a git command"));
    }

    #[tokio::test]
    async fn test_help_groups() {
        let cli = GitCli::builder().build();
        let out = cli.execute(&argv("--help")).await;
        assert!(out.is_success());
        for group in [
            "start a working area",
            "work on the current change",
            "examine the history and state",
            "collaborate",
            "configuration",
        ] {
            assert!(out.stdout.contains(group), "missing group: {}", group);
        }
    }

    #[tokio::test]
    async fn test_no_args_prints_usage_and_fails() {
        let cli = GitCli::builder().build();
        let out = cli.execute(&[]).await;
        assert_eq!(out.exit_code, 1);
        assert!(out.stderr.contains("usage: git <command>"));
    }

    #[tokio::test]
    async fn test_version_is_fixed_string() {
        let cli = GitCli::builder().build();
        let out = cli.execute(&argv("--version")).await;
        assert!(out.stdout.starts_with("gitkit version "));
    }

    #[tokio::test]
    async fn test_not_a_repository_prefix() {
        let cli = GitCli::builder().workdir("/repo").build();
        let out = cli.execute(&argv("status")).await;
        assert_eq!(out.exit_code, 1);
        assert!(out.stderr.starts_with("fatal: not a git repository"));
    }
}
