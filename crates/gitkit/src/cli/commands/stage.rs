//! Index and history mutation: `add`, `commit`, `reset`, `stash`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

use crate::cli::commands::{require_repo, resolve_identity, usage, CmdContext, Command};
use crate::cli::CmdOutput;
use crate::error::{Error, Result};
use crate::revert;
use crate::store::{short_oid, Oid};

/// `git add <pathspec>... | git add -A`
pub struct Add;

#[async_trait]
impl Command for Add {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut all = false;
        let mut paths: Vec<&str> = Vec::new();
        for arg in args {
            match arg.as_str() {
                "-A" | "--all" => all = true,
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other => paths.push(other),
            }
        }
        if !all && paths.is_empty() {
            return usage("Nothing specified, nothing added.");
        }

        if all {
            paths = vec!["."];
        }
        for path in &paths {
            ctx.store.stage_path(&ctx.workdir, path).await?;
        }
        if all {
            // `stage_path(".")` only sees existing files; record deletions of
            // tracked files that are gone from the working tree.
            for row in ctx.store.status_matrix(&ctx.workdir).await? {
                if row.workdir.is_none() && row.stage.is_some() {
                    ctx.store.stage_path(&ctx.workdir, &row.path).await?;
                }
            }
        }
        Ok(CmdOutput::ok(""))
    }
}

/// `git commit -m <message>`
pub struct Commit;

#[async_trait]
impl Command for Commit {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut message: Option<String> = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-m" | "--message" => match iter.next() {
                    Some(m) => message = Some(m.clone()),
                    None => return usage("switch 'm' requires a value"),
                },
                other if other.starts_with("--message=") => {
                    message = Some(other["--message=".len()..].to_string());
                }
                other => return usage(format!("unknown option '{}'", other)),
            }
        }
        let Some(message) = message else {
            return usage("commit message required (use -m <message>)");
        };

        let author = resolve_identity(ctx).await?;
        let oid = ctx.store.commit(&ctx.workdir, &message, &author).await?;
        let commit = ctx.store.read_commit(&ctx.workdir, &oid).await?;

        let branch = ctx
            .store
            .current_branch(&ctx.workdir)
            .await?
            .unwrap_or_else(|| "HEAD".to_string());
        let marker = if commit.parents.is_empty() { " (root-commit)" } else { "" };
        Ok(CmdOutput::ok(format!(
            "[{}{} {}] {}\n",
            branch,
            marker,
            short_oid(&oid),
            commit.summary()
        )))
    }
}

/// `git reset [--soft|--mixed|--hard] [<revision>] | git reset [<revision>] -- <path>...`
pub struct Reset;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ResetMode {
    Soft,
    Mixed,
    Hard,
}

#[async_trait]
impl Command for Reset {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut mode = ResetMode::Mixed;
        let mut revision: Option<String> = None;
        let mut paths: Vec<String> = Vec::new();
        let mut after_separator = false;

        for arg in args {
            match arg.as_str() {
                "--soft" if !after_separator => mode = ResetMode::Soft,
                "--mixed" if !after_separator => mode = ResetMode::Mixed,
                "--hard" if !after_separator => mode = ResetMode::Hard,
                "--" => after_separator = true,
                other if other.starts_with('-') && !after_separator => {
                    return usage(format!("unknown option '{}'", other));
                }
                other if after_separator => paths.push(other.to_string()),
                other if revision.is_none() => revision = Some(other.to_string()),
                other => paths.push(other.to_string()),
            }
        }

        if mode == ResetMode::Soft {
            return usage("soft reset is not supported");
        }
        if mode == ResetMode::Hard && !paths.is_empty() {
            return usage("Cannot do hard reset with paths.");
        }

        // A positional argument that does not resolve is a path to unstage.
        if mode == ResetMode::Mixed {
            if let Some(rev) = revision.clone() {
                if ctx.store.resolve_ref(&ctx.workdir, &rev).await.is_err() {
                    revision = None;
                    paths.insert(0, rev);
                }
            }
        }

        if !paths.is_empty() {
            // Index entries come from the named revision, HEAD by default.
            for path in &paths {
                ctx.store
                    .reset_index_path(&ctx.workdir, revision.as_deref(), path)
                    .await?;
            }
            return Ok(CmdOutput::ok(""));
        }

        let target = revision.as_deref().unwrap_or("HEAD");
        let oid = ctx.store.resolve_ref(&ctx.workdir, target).await?;
        let branch = ctx
            .store
            .current_branch(&ctx.workdir)
            .await?
            .ok_or_else(|| Error::Internal("cannot reset: HEAD is detached".to_string()))?;
        ctx.store.force_branch(&ctx.workdir, &branch, &oid).await?;
        rebuild_index(ctx, &oid).await?;

        match mode {
            ResetMode::Hard => {
                revert::hard_reset_to_head(ctx.store.as_ref(), &ctx.fs, &ctx.workdir).await?;
                let commit = ctx.store.read_commit(&ctx.workdir, &oid).await?;
                Ok(CmdOutput::ok(format!(
                    "HEAD is now at {} {}\n",
                    short_oid(&oid),
                    commit.summary()
                )))
            }
            _ => Ok(CmdOutput::ok("")),
        }
    }
}

/// Point every index entry back at the new HEAD tree, dropping entries the
/// tree does not have.
async fn rebuild_index(ctx: &CmdContext, head: &str) -> Result<()> {
    let mut paths: BTreeSet<String> = ctx
        .store
        .list_files(&ctx.workdir, None)
        .await?
        .into_iter()
        .collect();
    for (path, _) in ctx.store.tree_entries(&ctx.workdir, head).await? {
        paths.insert(path);
    }
    for path in paths {
        ctx.store.reset_index_path(&ctx.workdir, Some(head), &path).await?;
    }
    Ok(())
}

/// `git stash [push [-m <msg>] | list | pop]`
pub struct Stash;

/// One saved stash entry. Blob contents live in the object store; `None`
/// marks a path that was deleted from the working tree.
#[derive(Debug, Serialize, Deserialize)]
struct StashEntry {
    message: String,
    branch: String,
    files: BTreeMap<String, Option<Oid>>,
}

#[async_trait]
impl Command for Stash {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        match args.first().map(String::as_str) {
            None | Some("push") => {
                let mut message: Option<String> = None;
                let rest = if args.is_empty() { args } else { &args[1..] };
                let mut iter = rest.iter();
                while let Some(arg) = iter.next() {
                    match arg.as_str() {
                        "-m" | "--message" => match iter.next() {
                            Some(m) => message = Some(m.clone()),
                            None => return usage("switch 'm' requires a value"),
                        },
                        other => return usage(format!("unknown option '{}'", other)),
                    }
                }
                self.push(ctx, message).await
            }
            Some("list") => self.list(ctx).await,
            Some("pop") => self.pop(ctx).await,
            Some(other) => usage(format!("unknown subcommand: '{}'", other)),
        }
    }
}

impl Stash {
    async fn push(&self, ctx: &CmdContext, message: Option<String>) -> Result<CmdOutput> {
        let rows = ctx.store.status_matrix(&ctx.workdir).await?;
        let report = crate::status::classify(&rows);
        if report.is_clean() {
            return Ok(CmdOutput::ok("No local changes to save\n"));
        }

        let branch = ctx
            .store
            .current_branch(&ctx.workdir)
            .await?
            .unwrap_or_else(|| "HEAD".to_string());
        let message = match message {
            Some(m) => m,
            None => {
                let head = ctx.store.resolve_ref(&ctx.workdir, "HEAD").await?;
                let commit = ctx.store.read_commit(&ctx.workdir, &head).await?;
                format!("WIP: {} {}", short_oid(&head), commit.summary())
            }
        };

        // Snapshot every changed path's working-tree content.
        let mut files: BTreeMap<String, Option<Oid>> = BTreeMap::new();
        for entry in &report.entries {
            let abs = ctx.workdir.join(&entry.path);
            if ctx.fs.exists(&abs).await? {
                let content = ctx.fs.read_file(&abs).await?;
                let oid = ctx.store.write_blob(&ctx.workdir, &content).await?;
                files.insert(entry.path.clone(), Some(oid));
            } else {
                files.insert(entry.path.clone(), None);
            }
        }

        let mut stack = self.read_stack(ctx).await?;
        stack.push(StashEntry { message: message.clone(), branch: branch.clone(), files });
        self.write_stack(ctx, &stack).await?;

        revert::hard_reset_to_head(ctx.store.as_ref(), &ctx.fs, &ctx.workdir).await?;
        Ok(CmdOutput::ok(format!(
            "Saved working directory and index state On {}: {}\n",
            branch, message
        )))
    }

    async fn list(&self, ctx: &CmdContext) -> Result<CmdOutput> {
        let stack = self.read_stack(ctx).await?;
        let mut output = String::new();
        // Newest entry is stash@{0}.
        for (i, entry) in stack.iter().rev().enumerate() {
            output.push_str(&format!(
                "stash@{{{}}}: On {}: {}\n",
                i, entry.branch, entry.message
            ));
        }
        Ok(CmdOutput::ok(output))
    }

    async fn pop(&self, ctx: &CmdContext) -> Result<CmdOutput> {
        let mut stack = self.read_stack(ctx).await?;
        let Some(entry) = stack.pop() else {
            return Ok(CmdOutput::err("error: No stash entries found.\n", 1));
        };

        for (path, blob) in &entry.files {
            let abs = ctx.workdir.join(path);
            match blob {
                Some(oid) => {
                    let content = ctx.store.read_blob(&ctx.workdir, oid).await?;
                    if let Some(parent) = abs.parent() {
                        if !ctx.fs.exists(parent).await? {
                            ctx.fs.mkdir(parent, true).await?;
                        }
                    }
                    ctx.fs.write_file(&abs, &content).await?;
                }
                None => {
                    if ctx.fs.exists(&abs).await? {
                        ctx.fs.remove(&abs, false).await?;
                    }
                }
            }
        }
        self.write_stack(ctx, &stack).await?;
        Ok(CmdOutput::ok(format!(
            "Dropped stash@{{0}} ({} file(s) restored)\n",
            entry.files.len()
        )))
    }

    async fn read_stack(&self, ctx: &CmdContext) -> Result<Vec<StashEntry>> {
        let path = stash_path(&ctx.workdir);
        if !ctx.fs.exists(&path).await? {
            return Ok(Vec::new());
        }
        let data = ctx.fs.read_file(&path).await?;
        serde_json::from_slice(&data)
            .map_err(|e| Error::Internal(format!("corrupt stash file: {}", e)))
    }

    async fn write_stack(&self, ctx: &CmdContext, stack: &[StashEntry]) -> Result<()> {
        let data = serde_json::to_vec(stack)
            .map_err(|e| Error::Internal(format!("stash encoding failed: {}", e)))?;
        ctx.fs.write_file(&stash_path(&ctx.workdir), &data).await
    }
}

fn stash_path(workdir: &Path) -> std::path::PathBuf {
    workdir.join(".git").join("stash")
}
