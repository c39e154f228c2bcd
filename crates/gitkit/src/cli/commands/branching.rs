//! Refs: `branch`, `checkout`, `tag`.

use async_trait::async_trait;

use crate::cli::commands::{require_repo, usage, CmdContext, Command};
use crate::cli::CmdOutput;
use crate::error::{Error, Result};
use crate::store::{short_oid, CheckoutOptions};

/// `git branch [<name> [<start>]] | git branch -d|-D <name>`
pub struct Branch;

#[async_trait]
impl Command for Branch {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut delete = false;
        let mut force_delete = false;
        let mut names: Vec<&str> = Vec::new();
        for arg in args {
            match arg.as_str() {
                "-d" | "--delete" => delete = true,
                "-D" => force_delete = true,
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other => names.push(other),
            }
        }

        if delete || force_delete {
            let Some(name) = names.first() else {
                return usage("branch name required");
            };
            let branches = ctx.store.list_branches(&ctx.workdir).await?;
            if !branches.iter().any(|b| b == name) {
                return Err(Error::BranchNotFound(name.to_string()));
            }
            if !force_delete {
                // Refuse to drop commits not reachable from HEAD.
                let merged = ctx.store.is_ancestor(&ctx.workdir, name, "HEAD").await?;
                if !merged {
                    return Err(Error::BranchNotMerged(name.to_string()));
                }
            }
            let oid = ctx.store.delete_branch(&ctx.workdir, name).await?;
            return Ok(CmdOutput::ok(format!(
                "Deleted branch {} (was {}).\n",
                name,
                short_oid(&oid)
            )));
        }

        match names.as_slice() {
            [] => {
                let current = ctx.store.current_branch(&ctx.workdir).await?;
                let mut output = String::new();
                for branch in ctx.store.list_branches(&ctx.workdir).await? {
                    if Some(&branch) == current.as_ref() {
                        output.push_str(&format!("* {}\n", branch));
                    } else {
                        output.push_str(&format!("  {}\n", branch));
                    }
                }
                Ok(CmdOutput::ok(output))
            }
            [name] => {
                ctx.store.create_branch(&ctx.workdir, name, "HEAD").await?;
                Ok(CmdOutput::ok(""))
            }
            [name, start] => {
                ctx.store.create_branch(&ctx.workdir, name, start).await?;
                Ok(CmdOutput::ok(""))
            }
            _ => usage("too many arguments"),
        }
    }
}

/// `git checkout [-b] [-f] <ref>`
pub struct Checkout;

#[async_trait]
impl Command for Checkout {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut create = false;
        let mut opts = CheckoutOptions::default();
        let mut names: Vec<&str> = Vec::new();
        for arg in args {
            match arg.as_str() {
                "-b" => create = true,
                "-f" | "--force" => opts.force = true,
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other => names.push(other),
            }
        }

        let Some(target) = names.first() else {
            return usage("you must specify a branch or revision");
        };

        if create {
            let start = names.get(1).copied().unwrap_or("HEAD");
            ctx.store.create_branch(&ctx.workdir, target, start).await?;
            ctx.store.checkout(&ctx.workdir, target, opts).await?;
            return Ok(CmdOutput::ok(format!("Switched to a new branch '{}'\n", target)));
        }

        ctx.store.checkout(&ctx.workdir, target, opts).await?;
        match ctx.store.current_branch(&ctx.workdir).await? {
            Some(branch) => Ok(CmdOutput::ok(format!("Switched to branch '{}'\n", branch))),
            None => {
                let oid = ctx.store.resolve_ref(&ctx.workdir, "HEAD").await?;
                let commit = ctx.store.read_commit(&ctx.workdir, &oid).await?;
                Ok(CmdOutput::ok(format!(
                    "HEAD is now at {} {}\n",
                    short_oid(&oid),
                    commit.summary()
                )))
            }
        }
    }
}

/// `git tag [<name> [<target>]] | git tag -d <name>`
pub struct Tag;

#[async_trait]
impl Command for Tag {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut delete = false;
        let mut names: Vec<&str> = Vec::new();
        for arg in args {
            match arg.as_str() {
                "-d" | "--delete" => delete = true,
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other => names.push(other),
            }
        }

        if delete {
            let Some(name) = names.first() else {
                return usage("tag name required");
            };
            let oid = ctx.store.delete_tag(&ctx.workdir, name).await?;
            return Ok(CmdOutput::ok(format!(
                "Deleted tag '{}' (was {})\n",
                name,
                short_oid(&oid)
            )));
        }

        match names.as_slice() {
            [] => {
                let mut output = String::new();
                for tag in ctx.store.list_tags(&ctx.workdir).await? {
                    output.push_str(&format!("{}\n", tag));
                }
                Ok(CmdOutput::ok(output))
            }
            [name] => {
                ctx.store.create_tag(&ctx.workdir, name, "HEAD").await?;
                Ok(CmdOutput::ok(""))
            }
            [name, target] => {
                ctx.store.create_tag(&ctx.workdir, name, target).await?;
                Ok(CmdOutput::ok(""))
            }
            _ => usage("too many arguments"),
        }
    }
}
