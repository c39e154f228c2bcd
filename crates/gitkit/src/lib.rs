//! GitKit - Sandboxed git CLI emulation for multi-tenant environments
//!
//! Part of the Everruns ecosystem.
//!
//! GitKit runs familiar git commands entirely in-process: repositories,
//! refs, the index, and the object store all live inside a virtual
//! filesystem, with no native process or server behind them. Remotes are
//! other repository directories in the same filesystem, so push, pull,
//! fetch, and clone work end to end inside the sandbox.
//!
//! # Example
//!
//! ```rust
//! use gitkit::GitCli;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cli = GitCli::builder().workdir("/repo").build();
//!     let run = |line: &str| line.split_whitespace().map(str::to_string).collect::<Vec<_>>();
//!
//!     let out = cli.execute(&run("init")).await;
//!     assert_eq!(out.exit_code, 0);
//!
//!     cli.fs().write_file("/repo/a.txt".as_ref(), b"hello").await.unwrap();
//!     cli.execute(&run("add a.txt")).await;
//!     let out = cli.execute(&run("commit -m initial")).await;
//!     assert!(out.stdout.contains("root-commit"));
//! }
//! ```

mod cli;
mod config;
mod error;
pub mod fs;
mod revert;
pub mod status;
pub mod store;
pub mod sync;

pub use cli::{CmdOutput, GitCli, GitCliBuilder};
pub use config::Identity;
pub use error::{Error, Result};
pub use revert::{hard_reset_to_head, revert_to, RevertOutcome};
