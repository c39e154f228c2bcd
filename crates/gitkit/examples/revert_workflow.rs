//! Rolling a repository back to an earlier commit while keeping history.
//!
//! Run with: cargo run --example revert_workflow

use gitkit::{revert_to, GitCli, Identity, RevertOutcome};
use std::path::Path;

fn argv(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> gitkit::Result<()> {
    let cli = GitCli::builder().workdir("/repo").build();
    cli.execute(&argv("init")).await;

    // Three commits, each changing config.toml
    let mut first = String::new();
    for (i, content) in ["v1", "v2", "v3"].iter().enumerate() {
        cli.fs()
            .write_file(Path::new("/repo/config.toml"), content.as_bytes())
            .await?;
        cli.execute(&argv("add config.toml")).await;
        cli.execute(&["commit".into(), "-m".into(), format!("deploy {}", content)])
            .await;
        if i == 0 {
            first = cli.store().resolve_ref(Path::new("/repo"), "HEAD").await?;
        }
    }

    // Roll back to the first deploy; a new commit records the rollback
    let outcome = revert_to(
        cli.store().as_ref(),
        &cli.fs(),
        Path::new("/repo"),
        &first,
        &Identity::new(),
    )
    .await?;
    if let RevertOutcome::Reverted { oid, rolled_back } = outcome {
        println!("reverted {} commit(s), new commit {}", rolled_back, &oid[..7]);
    }

    let content = cli.fs().read_file(Path::new("/repo/config.toml")).await?;
    println!("config.toml is back to: {}", String::from_utf8_lossy(&content));

    let out = cli.execute(&argv("log --oneline")).await;
    print!("{}", out.stdout);
    Ok(())
}
