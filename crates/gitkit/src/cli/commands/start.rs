//! Repository bootstrap: `init` and `clone`.

use async_trait::async_trait;

use crate::cli::commands::{usage, CmdContext, Command};
use crate::cli::CmdOutput;
use crate::error::Result;
use crate::store::CloneOptions;

/// `git init [directory] [-b <branch>]`
pub struct Init;

#[async_trait]
impl Command for Init {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        let mut branch = "main".to_string();
        let mut dir = ctx.workdir.clone();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-b" | "--initial-branch" => match iter.next() {
                    Some(name) => branch = name.clone(),
                    None => return usage("switch 'b' requires a value"),
                },
                other if other.starts_with("--initial-branch=") => {
                    branch = other["--initial-branch=".len()..].to_string();
                }
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other => dir = ctx.workdir.join(other),
            }
        }

        if ctx.store.is_repository(&dir).await? {
            return Ok(CmdOutput::ok(format!(
                "Reinitialized existing Git repository in {}/.git/\n",
                dir.display()
            )));
        }
        ctx.store.init(&dir, &branch).await?;
        Ok(CmdOutput::ok(format!(
            "Initialized empty Git repository in {}/.git/\n",
            dir.display()
        )))
    }
}

/// `git clone <url> [directory] [--single-branch] [--depth <n>]`
pub struct Clone;

#[async_trait]
impl Command for Clone {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        let mut url: Option<&str> = None;
        let mut dest: Option<String> = None;
        let mut opts = CloneOptions::default();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--single-branch" => opts.single_branch = true,
                "--depth" => match iter.next().and_then(|v| v.parse().ok()) {
                    Some(n) => opts.depth = Some(n),
                    None => return usage("switch 'depth' requires a numeric value"),
                },
                other if other.starts_with("--depth=") => {
                    match other["--depth=".len()..].parse() {
                        Ok(n) => opts.depth = Some(n),
                        Err(_) => return usage("switch 'depth' requires a numeric value"),
                    }
                }
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other if url.is_none() => url = Some(other),
                other => dest = Some(other.to_string()),
            }
        }

        let Some(url) = url else {
            return usage("you must specify a repository to clone");
        };
        let dest = dest.unwrap_or_else(|| default_dest(url));
        let dest_dir = ctx.workdir.join(&dest);

        ctx.store.clone_repo(url, &dest_dir, opts).await?;
        Ok(CmdOutput::ok(format!("Cloning into '{}'...\n", dest)))
    }
}

/// Destination directory derived from the URL basename, sans `.git`.
fn default_dest(url: &str) -> String {
    let base = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    base.strip_suffix(".git").unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dest_strips_git_suffix() {
        assert_eq!(default_dest("/srv/project.git"), "project");
        assert_eq!(default_dest("https://host/org/repo"), "repo");
        assert_eq!(default_dest("/srv/demos/"), "demos");
    }
}
