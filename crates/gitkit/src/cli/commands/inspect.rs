//! Read-only inspection: `status`, `log`, `diff`, `show`.

use async_trait::async_trait;
use chrono::DateTime;
use std::collections::BTreeMap;

use crate::cli::commands::{require_repo, usage, CmdContext, Command};
use crate::cli::CmdOutput;
use crate::error::{Error, Result};
use crate::status;
use crate::store::{short_oid, CommitInfo, Oid};

/// `git status [--porcelain|-s|--short]`
pub struct Status;

#[async_trait]
impl Command for Status {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut porcelain = false;
        for arg in args {
            match arg.as_str() {
                "--porcelain" | "-s" | "--short" => porcelain = true,
                other => return usage(format!("unknown option '{}'", other)),
            }
        }

        let rows = ctx.store.status_matrix(&ctx.workdir).await?;
        let report = status::classify(&rows);
        if porcelain {
            Ok(CmdOutput::ok(status::render_porcelain(&report)))
        } else {
            let branch = ctx.store.current_branch(&ctx.workdir).await?;
            Ok(CmdOutput::ok(status::render_human(&report, branch.as_deref())))
        }
    }
}

/// `git log [-n <count>|--max-count=<count>] [--oneline]`
pub struct Log;

#[async_trait]
impl Command for Log {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut depth: Option<usize> = None;
        let mut oneline = false;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-n" | "--max-count" => match iter.next().and_then(|v| v.parse().ok()) {
                    Some(n) => depth = Some(n),
                    None => return usage("switch 'n' requires a numeric value"),
                },
                "--oneline" => oneline = true,
                other if other.starts_with("--max-count=") => {
                    match other["--max-count=".len()..].parse() {
                        Ok(n) => depth = Some(n),
                        Err(_) => return usage("switch 'max-count' requires a numeric value"),
                    }
                }
                other => return usage(format!("unknown option '{}'", other)),
            }
        }

        let commits = ctx.store.log(&ctx.workdir, depth).await?;
        if commits.is_empty() {
            let branch = ctx
                .store
                .current_branch(&ctx.workdir)
                .await?
                .unwrap_or_else(|| "HEAD".to_string());
            return Ok(CmdOutput::err(
                format!(
                    "fatal: your current branch '{}' does not have any commits yet\n",
                    branch
                ),
                1,
            ));
        }

        let mut output = String::new();
        for commit in &commits {
            if oneline {
                output.push_str(&format!("{} {}\n", short_oid(&commit.oid), commit.summary()));
            } else {
                output.push_str(&format_commit(commit));
            }
        }
        Ok(CmdOutput::ok(output))
    }
}

fn format_commit(commit: &CommitInfo) -> String {
    let mut out = format!("commit {}\n", commit.oid);
    out.push_str(&format!("Author: {}\n", commit.author));
    out.push_str(&format!("Date:   {}\n\n", format_date(commit.timestamp)));
    for line in commit.message.lines() {
        out.push_str(&format!("    {}\n", line));
    }
    out.push('\n');
    out
}

fn format_date(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%a %b %e %H:%M:%S %Y +0000").to_string(),
        None => timestamp.to_string(),
    }
}

/// `git diff [--staged|--cached] [<revision> [<revision>]]`
///
/// Name-status output: one `<code>\t<path>` line per changed file, where
/// code is `A`, `M`, or `D`.
pub struct Diff;

#[async_trait]
impl Command for Diff {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let mut staged = false;
        let mut revs: Vec<&str> = Vec::new();
        for arg in args {
            match arg.as_str() {
                "--staged" | "--cached" => staged = true,
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other => revs.push(other),
            }
        }

        let rows = ctx.store.status_matrix(&ctx.workdir).await?;
        let changes = match (staged, revs.as_slice()) {
            (true, []) => {
                // Index vs HEAD.
                let report = status::classify(&rows);
                report
                    .entries
                    .iter()
                    .filter_map(|e| {
                        let code = match e.staged? {
                            status::StagedChange::Added => 'A',
                            status::StagedChange::Modified => 'M',
                            status::StagedChange::Deleted => 'D',
                        };
                        Some((code, e.path.clone()))
                    })
                    .collect()
            }
            (false, []) => {
                // Working tree vs index.
                let report = status::classify(&rows);
                report
                    .entries
                    .iter()
                    .filter_map(|e| {
                        let code = match e.worktree? {
                            status::WorktreeChange::Modified => 'M',
                            status::WorktreeChange::Deleted => 'D',
                        };
                        Some((code, e.path.clone()))
                    })
                    .collect()
            }
            (false, [rev]) => {
                // Revision vs working tree, tracked paths only.
                let old: BTreeMap<String, Oid> =
                    ctx.store.tree_entries(&ctx.workdir, rev).await?.into_iter().collect();
                let new: BTreeMap<String, Oid> = rows
                    .iter()
                    .filter(|r| r.head.is_some() || r.stage.is_some())
                    .filter_map(|r| Some((r.path.clone(), r.workdir.clone()?)))
                    .collect();
                diff_maps(&old, &new)
            }
            (false, [old_rev, new_rev]) => {
                let old: BTreeMap<String, Oid> = ctx
                    .store
                    .tree_entries(&ctx.workdir, old_rev)
                    .await?
                    .into_iter()
                    .collect();
                let new: BTreeMap<String, Oid> = ctx
                    .store
                    .tree_entries(&ctx.workdir, new_rev)
                    .await?
                    .into_iter()
                    .collect();
                diff_maps(&old, &new)
            }
            _ => return usage("usage: git diff [--staged] [<revision> [<revision>]]"),
        };

        let mut output = String::new();
        for (code, path) in changes {
            output.push_str(&format!("{}\t{}\n", code, path));
        }
        Ok(CmdOutput::ok(output))
    }
}

/// Name-status comparison of two path → oid maps.
fn diff_maps(old: &BTreeMap<String, Oid>, new: &BTreeMap<String, Oid>) -> Vec<(char, String)> {
    let mut changes = Vec::new();
    for (path, old_oid) in old {
        match new.get(path) {
            None => changes.push(('D', path.clone())),
            Some(new_oid) if new_oid != old_oid => changes.push(('M', path.clone())),
            Some(_) => {}
        }
    }
    for path in new.keys() {
        if !old.contains_key(path) {
            changes.push(('A', path.clone()));
        }
    }
    changes.sort_by(|a, b| a.1.cmp(&b.1));
    changes
}

/// `git show [<revision>] | git show <revision>:<path>`
pub struct Show;

#[async_trait]
impl Command for Show {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        require_repo(ctx).await?;

        let target = match args {
            [] => "HEAD",
            [one] => one.as_str(),
            _ => return usage("usage: git show [<revision>[:<path>]]"),
        };

        // `rev:path` prints the blob at that revision.
        if let Some((rev, path)) = target.split_once(':') {
            let oid = ctx.store.resolve_ref(&ctx.workdir, rev).await?;
            let tree = ctx.store.tree_entries(&ctx.workdir, &oid).await?;
            let blob_oid = tree
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, o)| o.clone())
                .ok_or_else(|| {
                    Error::RefNotFound(format!("{}:{}", short_oid(&oid), path))
                })?;
            let content = ctx.store.read_blob(&ctx.workdir, &blob_oid).await?;
            return Ok(CmdOutput::ok(String::from_utf8_lossy(&content).into_owned()));
        }

        let oid = ctx.store.resolve_ref(&ctx.workdir, target).await?;
        let commit = ctx.store.read_commit(&ctx.workdir, &oid).await?;
        let mut output = format_commit(&commit);

        let new: BTreeMap<String, Oid> =
            ctx.store.tree_entries(&ctx.workdir, &oid).await?.into_iter().collect();
        let old: BTreeMap<String, Oid> = match commit.parents.first() {
            Some(parent) => ctx
                .store
                .tree_entries(&ctx.workdir, parent)
                .await?
                .into_iter()
                .collect(),
            None => BTreeMap::new(),
        };
        for (code, path) in diff_maps(&old, &new) {
            output.push_str(&format!("{}\t{}\n", code, path));
        }
        Ok(CmdOutput::ok(output))
    }
}
