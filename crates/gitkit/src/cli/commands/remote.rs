//! Collaboration: `remote`, `push`, `pull`, `fetch`.
//!
//! Push and pull failures run through the sync conflict classifier; the
//! resulting remediation hints land on stderr under the primary error.

use async_trait::async_trait;

use crate::cli::commands::{require_repo, usage, CmdContext, Command};
use crate::cli::CmdOutput;
use crate::error::{Error, Result};
use crate::store::{short_oid, PullOutcome, PushOptions, PushOutcome};
use crate::sync::{self, RemedyAction};

/// `git remote [-v] | git remote add <name> <url> | git remote remove <name>`
pub struct Remote;

#[async_trait]
impl Command for Remote {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        match args.first().map(String::as_str) {
            None => {
                let mut output = String::new();
                for info in ctx.store.list_remotes(&ctx.workdir).await? {
                    output.push_str(&format!("{}\n", info.remote));
                }
                Ok(CmdOutput::ok(output))
            }
            Some("-v") | Some("--verbose") => {
                let mut output = String::new();
                for info in ctx.store.list_remotes(&ctx.workdir).await? {
                    output.push_str(&format!("{}\t{} (fetch)\n", info.remote, info.url));
                    output.push_str(&format!("{}\t{} (push)\n", info.remote, info.url));
                }
                Ok(CmdOutput::ok(output))
            }
            Some("add") => match &args[1..] {
                [name, url] => {
                    ctx.store.add_remote(&ctx.workdir, name, url).await?;
                    Ok(CmdOutput::ok(""))
                }
                _ => usage("usage: git remote add <name> <url>"),
            },
            Some("remove") | Some("rm") => match &args[1..] {
                [name] => {
                    ctx.store.delete_remote(&ctx.workdir, name).await?;
                    Ok(CmdOutput::ok(""))
                }
                _ => usage("usage: git remote remove <name>"),
            },
            Some(other) => usage(format!("unknown subcommand: '{}'", other)),
        }
    }
}

/// Remote name and branch from trailing positional arguments, defaulting to
/// `origin` and the checked-out branch.
async fn remote_and_branch(
    ctx: &CmdContext,
    positional: &[&str],
) -> Result<(String, String)> {
    let remote = positional.first().unwrap_or(&"origin").to_string();
    let branch = match positional.get(1) {
        Some(b) => b.to_string(),
        None => ctx
            .store
            .current_branch(&ctx.workdir)
            .await?
            .ok_or_else(|| {
                Error::Internal("you are not currently on a branch".to_string())
            })?,
    };
    Ok((remote, branch))
}

/// Classified sync failure rendered for stderr.
fn sync_failure(err: Error) -> CmdOutput {
    let conflict = sync::classify(&err);
    let mut msg = format!("{}\n", err);
    msg.push_str(&format!("hint: {}\n", conflict.detail));
    for action in &conflict.actions {
        if *action != RemedyAction::Dismiss {
            msg.push_str(&format!("hint: {}\n", action.hint()));
        }
    }
    CmdOutput::err(msg, 1)
}

/// `git push [-f|--force] [<remote>] [<branch>]`
pub struct Push;

#[async_trait]
impl Command for Push {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut force = false;
        let mut positional: Vec<&str> = Vec::new();
        for arg in args {
            match arg.as_str() {
                "-f" | "--force" => force = true,
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other => positional.push(other),
            }
        }
        let (remote, branch) = remote_and_branch(ctx, &positional).await?;

        let opts = PushOptions {
            force,
            on_auth: ctx.on_auth.clone(),
            signer: ctx.signer.clone(),
        };
        match ctx.store.push(&ctx.workdir, &remote, &branch, opts).await {
            Ok(PushOutcome::UpToDate) => Ok(CmdOutput::ok("Everything up-to-date\n")),
            Ok(PushOutcome::Updated { old, new }) => {
                let url = remote_url(ctx, &remote).await?;
                let line = match old {
                    Some(old) => format!(
                        "   {}..{}  {} -> {}\n",
                        short_oid(&old),
                        short_oid(&new),
                        branch,
                        branch
                    ),
                    None => format!(" * [new branch]      {} -> {}\n", branch, branch),
                };
                Ok(CmdOutput::ok(format!("To {}\n{}", url, line)))
            }
            Err(e) => Ok(sync_failure(e)),
        }
    }
}

async fn remote_url(ctx: &CmdContext, remote: &str) -> Result<String> {
    Ok(ctx
        .store
        .list_remotes(&ctx.workdir)
        .await?
        .into_iter()
        .find(|info| info.remote == remote)
        .map(|info| info.url)
        .unwrap_or_else(|| remote.to_string()))
}

/// `git pull [<remote>] [<branch>]`
pub struct Pull;

#[async_trait]
impl Command for Pull {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let positional: Vec<&str> = args.iter().map(String::as_str).collect();
        if positional.iter().any(|a| a.starts_with('-')) {
            return usage("usage: git pull [<remote>] [<branch>]");
        }
        let (remote, branch) = remote_and_branch(ctx, &positional).await?;

        match ctx.store.pull(&ctx.workdir, &remote, &branch).await {
            Ok(PullOutcome::UpToDate) => Ok(CmdOutput::ok("Already up to date.\n")),
            Ok(PullOutcome::FastForwarded { old, new }) => {
                let from = old.as_deref().map(short_oid).unwrap_or("(none)").to_string();
                Ok(CmdOutput::ok(format!(
                    "Updating {}..{}\nFast-forward\n",
                    from,
                    short_oid(&new)
                )))
            }
            Err(e) => Ok(sync_failure(e)),
        }
    }
}

/// `git fetch [<remote>]`
pub struct Fetch;

#[async_trait]
impl Command for Fetch {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let remote = match args {
            [] => "origin",
            [one] if !one.starts_with('-') => one.as_str(),
            _ => return usage("usage: git fetch [<remote>]"),
        };
        match ctx.store.fetch(&ctx.workdir, remote).await {
            Ok(()) => Ok(CmdOutput::ok("")),
            Err(e) => Ok(sync_failure(e)),
        }
    }
}
