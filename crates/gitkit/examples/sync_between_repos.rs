//! Push, clone, and pull between repositories sharing one virtual
//! filesystem.
//!
//! Run with: cargo run --example sync_between_repos

use gitkit::fs::{FileSystem, InMemoryFs};
use gitkit::store::{ObjectStore, VfsStore};
use gitkit::GitCli;
use std::path::Path;
use std::sync::Arc;

fn argv(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> gitkit::Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(InMemoryFs::new());
    let store: Arc<dyn ObjectStore> = Arc::new(VfsStore::new(fs.clone()));
    let cli_at = |dir: &str| {
        GitCli::builder()
            .fs(fs.clone())
            .store(store.clone())
            .workdir(dir)
            .build()
    };

    // A shared "server" repository and a local working copy
    let server = cli_at("/srv/project");
    server.execute(&argv("init")).await;
    fs.write_file(Path::new("/srv/project/readme.md"), b"# project\n")
        .await?;
    server.execute(&argv("add readme.md")).await;
    server
        .execute(&["commit".into(), "-m".into(), "initial".into()])
        .await;

    // Clone it elsewhere in the same filesystem
    let work = cli_at("/home/dev");
    fs.mkdir(Path::new("/home/dev"), true).await?;
    let out = work.execute(&argv("clone /srv/project")).await;
    print!("{}", out.stdout);

    // Commit in the clone, push back
    let clone = cli_at("/home/dev/project");
    fs.write_file(Path::new("/home/dev/project/feature.rs"), b"// new\n")
        .await?;
    clone.execute(&argv("add feature.rs")).await;
    clone
        .execute(&["commit".into(), "-m".into(), "add feature".into()])
        .await;
    let out = clone.execute(&argv("push")).await;
    print!("{}{}", out.stdout, out.stderr);

    Ok(())
}
