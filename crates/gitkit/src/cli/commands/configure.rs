//! `config`: get/set/list over a fixed key set.
//!
//! Supported keys: `user.name`, `user.email`, `core.bare`, and
//! `remote.<name>.url` / `remote.<name>.fetch`. Anything else is rejected;
//! this is not an arbitrary key-value store.

use async_trait::async_trait;
use std::path::Path;

use crate::cli::commands::{require_repo, usage, CmdContext, Command};
use crate::cli::CmdOutput;
use crate::error::{Error, Result};

/// `git config [--global] <key> [<value>] | git config [--global] --list`
pub struct Config;

#[async_trait]
impl Command for Config {
    async fn run(&self, ctx: &CmdContext, args: &[String]) -> Result<CmdOutput> {
        let mut global = false;
        let mut list = false;
        let mut positional: Vec<&str> = Vec::new();
        for arg in args {
            match arg.as_str() {
                "--global" => global = true,
                "--list" | "-l" => list = true,
                other if other.starts_with('-') => {
                    return usage(format!("unknown option '{}'", other));
                }
                other => positional.push(other),
            }
        }

        if !global {
            require_repo(ctx).await?;
        }
        let dir: Option<&Path> = if global { None } else { Some(&ctx.workdir) };

        if list {
            let mut output = String::new();
            for (key, value) in ctx.store.list_config(dir).await? {
                output.push_str(&format!("{}={}\n", key, value));
            }
            return Ok(CmdOutput::ok(output));
        }

        match positional.as_slice() {
            [key] => {
                validate_key(key)?;
                let mut value = ctx.store.get_config(dir, key).await?;
                if value.is_none() && !global {
                    // Repo scope falls back to the global file on reads.
                    value = ctx.store.get_config(None, key).await?;
                }
                match value {
                    Some(value) => Ok(CmdOutput::ok(format!("{}\n", value))),
                    None => Ok(CmdOutput::err("", 1)),
                }
            }
            [key, value] => {
                validate_key(key)?;
                ctx.store.set_config(dir, key, value).await?;
                Ok(CmdOutput::ok(""))
            }
            [] => usage("usage: git config [--global] <key> [<value>]"),
            _ => usage("too many arguments"),
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if !key.contains('.') {
        return Err(Error::InvalidConfigKey(key.to_string()));
    }
    let supported = matches!(key, "user.name" | "user.email" | "core.bare") || {
        let parts: Vec<&str> = key.split('.').collect();
        parts.len() == 3 && parts[0] == "remote" && matches!(parts[2], "url" | "fetch")
    };
    if supported {
        Ok(())
    } else {
        Err(Error::UnsupportedConfigKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(validate_key("user.name").is_ok());
        assert!(validate_key("user.email").is_ok());
        assert!(validate_key("core.bare").is_ok());
        assert!(validate_key("remote.origin.url").is_ok());
        assert!(validate_key("remote.upstream.fetch").is_ok());
        assert!(validate_key("nosection").is_err());
        assert!(validate_key("alias.co").is_err());
        assert!(validate_key("remote.origin.push").is_err());
    }
}
