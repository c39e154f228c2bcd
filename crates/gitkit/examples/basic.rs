//! Basic GitKit usage example
//!
//! Run with: cargo run --example basic

use gitkit::GitCli;
use std::path::Path;

fn argv(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> gitkit::Result<()> {
    let cli = GitCli::builder().workdir("/repo").build();

    // Create a repository inside the virtual filesystem
    let out = cli.execute(&argv("init")).await;
    print!("{}", out.stdout);

    // Write a file and stage it
    cli.fs()
        .write_file(Path::new("/repo/hello.txt"), b"Hello, GitKit!\n")
        .await?;
    cli.execute(&argv("add hello.txt")).await;

    // Commit
    let out = cli
        .execute(&["commit".into(), "-m".into(), "initial commit".into()])
        .await;
    print!("{}", out.stdout);

    // Inspect
    let out = cli.execute(&argv("status")).await;
    print!("{}", out.stdout);
    let out = cli.execute(&argv("log --oneline")).await;
    print!("{}", out.stdout);

    Ok(())
}
