//! Integration tests for the rollback engine and hard reset, driven through
//! both the library API and the CLI.

use async_trait::async_trait;
use gitkit::fs::{DirEntry, FileSystem, InMemoryFs, Metadata};
use gitkit::{revert_to, CmdOutput, GitCli, Identity, RevertOutcome};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

fn argv(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

async fn run(cli: &GitCli, line: &str) -> CmdOutput {
    cli.execute(&argv(line)).await
}

async fn commit_file(cli: &GitCli, name: &str, content: &[u8], msg: &str) -> String {
    cli.fs()
        .write_file(&Path::new("/repo").join(name), content)
        .await
        .unwrap();
    run(cli, &format!("add {}", name)).await;
    let out = cli
        .execute(&["commit".into(), "-m".into(), msg.into()])
        .await;
    assert!(out.is_success(), "{}", out.stderr);
    cli.store()
        .resolve_ref(Path::new("/repo"), "HEAD")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_revert_to_ancestor_preserves_history() {
    let cli = GitCli::builder().workdir("/repo").build();
    run(&cli, "init").await;
    let c1 = commit_file(&cli, "a.txt", b"one", "first").await;
    commit_file(&cli, "b.txt", b"two", "second").await;
    let c3 = commit_file(&cli, "a.txt", b"three", "third").await;

    let outcome = revert_to(
        cli.store().as_ref(),
        &cli.fs(),
        Path::new("/repo"),
        &c1,
        &Identity::new(),
    )
    .await
    .unwrap();

    let RevertOutcome::Reverted { oid, rolled_back } = outcome else {
        panic!("expected a revert commit");
    };
    assert_eq!(rolled_back, 2);

    // File set equals the target tree.
    assert_eq!(cli.fs().read_file(Path::new("/repo/a.txt")).await.unwrap(), b"one");
    assert!(!cli.fs().exists(Path::new("/repo/b.txt")).await.unwrap());

    // History grew: the revert commit's parent is the old tip.
    let commit = cli.store().read_commit(Path::new("/repo"), &oid).await.unwrap();
    assert_eq!(commit.parents, vec![c3]);
    assert!(commit.message.starts_with("Revert to commit "));
    assert!(commit.message.contains("second"));
    assert!(commit.message.contains("third"));

    // The working tree is clean afterwards.
    let out = run(&cli, "status --porcelain").await;
    assert_eq!(out.stdout, "");
}

#[tokio::test]
async fn test_revert_twice_reports_already_at_target() {
    let cli = GitCli::builder().workdir("/repo").build();
    run(&cli, "init").await;
    let c1 = commit_file(&cli, "a.txt", b"one", "first").await;
    commit_file(&cli, "a.txt", b"two", "second").await;

    let store = cli.store();
    let fs = cli.fs();
    let dir = Path::new("/repo");

    let first = revert_to(store.as_ref(), &fs, dir, &c1, &Identity::new())
        .await
        .unwrap();
    assert!(matches!(first, RevertOutcome::Reverted { .. }));
    let history = store.log(dir, None).await.unwrap().len();

    let second = revert_to(store.as_ref(), &fs, dir, "HEAD", &Identity::new())
        .await
        .unwrap();
    assert_eq!(second, RevertOutcome::AlreadyAtTarget);
    assert_eq!(store.log(dir, None).await.unwrap().len(), history);
}

#[tokio::test]
async fn test_reset_hard_discards_everything() {
    let cli = GitCli::builder().workdir("/repo").build();
    run(&cli, "init").await;
    commit_file(&cli, "a.txt", b"one", "first").await;

    cli.fs().write_file(Path::new("/repo/a.txt"), b"dirty").await.unwrap();
    cli.fs().write_file(Path::new("/repo/junk.txt"), b"junk").await.unwrap();
    run(&cli, "add a.txt").await;

    let out = run(&cli, "reset --hard HEAD").await;
    assert!(out.is_success(), "{}", out.stderr);
    assert!(out.stdout.starts_with("HEAD is now at "));
    assert!(out.stdout.contains("first"));

    assert_eq!(cli.fs().read_file(Path::new("/repo/a.txt")).await.unwrap(), b"one");
    assert!(!cli.fs().exists(Path::new("/repo/junk.txt")).await.unwrap());
    let out = run(&cli, "status --porcelain").await;
    assert_eq!(out.stdout, "");
}

#[tokio::test]
async fn test_reset_hard_to_older_commit_moves_branch() {
    let cli = GitCli::builder().workdir("/repo").build();
    run(&cli, "init").await;
    let c1 = commit_file(&cli, "a.txt", b"one", "first").await;
    commit_file(&cli, "b.txt", b"two", "second").await;

    let out = run(&cli, &format!("reset --hard {}", &c1[..8])).await;
    assert!(out.is_success(), "{}", out.stderr);

    assert!(!cli.fs().exists(Path::new("/repo/b.txt")).await.unwrap());
    let head = cli
        .store()
        .resolve_ref(Path::new("/repo"), "HEAD")
        .await
        .unwrap();
    assert_eq!(head, c1);
    assert_eq!(cli.store().log(Path::new("/repo"), None).await.unwrap().len(), 1);
}

/// Filesystem wrapper whose writes to one configured path fail.
struct FlakyFs {
    inner: InMemoryFs,
    broken: Mutex<Option<PathBuf>>,
}

impl FlakyFs {
    fn new() -> Self {
        Self { inner: InMemoryFs::new(), broken: Mutex::new(None) }
    }

    fn break_writes(&self, path: &str) {
        *self.broken.lock().unwrap() = Some(PathBuf::from(path));
    }
}

#[async_trait]
impl FileSystem for FlakyFs {
    async fn read_file(&self, path: &Path) -> gitkit::Result<Vec<u8>> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> gitkit::Result<()> {
        if self.broken.lock().unwrap().as_deref() == Some(path) {
            return Err(std::io::Error::other("write failed").into());
        }
        self.inner.write_file(path, content).await
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> gitkit::Result<()> {
        self.inner.mkdir(path, recursive).await
    }

    async fn remove(&self, path: &Path, recursive: bool) -> gitkit::Result<()> {
        self.inner.remove(path, recursive).await
    }

    async fn stat(&self, path: &Path) -> gitkit::Result<Metadata> {
        self.inner.stat(path).await
    }

    async fn read_dir(&self, path: &Path) -> gitkit::Result<Vec<DirEntry>> {
        self.inner.read_dir(path).await
    }

    async fn exists(&self, path: &Path) -> gitkit::Result<bool> {
        self.inner.exists(path).await
    }
}

#[tokio::test]
async fn test_revert_write_failure_creates_no_commit() {
    let flaky = Arc::new(FlakyFs::new());
    let fs: Arc<dyn FileSystem> = flaky.clone();
    let cli = GitCli::builder().fs(fs.clone()).workdir("/repo").build();
    run(&cli, "init").await;
    let c1 = commit_file(&cli, "a.txt", b"one", "first").await;
    let c2 = commit_file(&cli, "a.txt", b"two", "second").await;

    let dir = Path::new("/repo");
    let before = cli.store().log(dir, None).await.unwrap().len();

    flaky.break_writes("/repo/a.txt");
    let result = revert_to(cli.store().as_ref(), &fs, dir, &c1, &Identity::new()).await;
    assert!(result.is_err());

    // No revert commit was created; HEAD still points at the old tip.
    assert_eq!(cli.store().log(dir, None).await.unwrap().len(), before);
    assert_eq!(cli.store().resolve_ref(dir, "HEAD").await.unwrap(), c2);
}

#[tokio::test]
async fn test_reset_mixed_keeps_working_tree() {
    let cli = GitCli::builder().workdir("/repo").build();
    run(&cli, "init").await;
    let c1 = commit_file(&cli, "a.txt", b"one", "first").await;
    commit_file(&cli, "a.txt", b"two", "second").await;

    let out = run(&cli, &format!("reset {}", &c1[..8])).await;
    assert!(out.is_success(), "{}", out.stderr);

    // Working tree untouched, index back at the target.
    assert_eq!(cli.fs().read_file(Path::new("/repo/a.txt")).await.unwrap(), b"two");
    let out = run(&cli, "status --porcelain").await;
    assert_eq!(out.stdout, " M a.txt\n");
}

#[tokio::test]
async fn test_reset_revision_with_path_restages_from_that_commit() {
    let cli = GitCli::builder().workdir("/repo").build();
    run(&cli, "init").await;
    let c1 = commit_file(&cli, "a.txt", b"one", "first").await;
    commit_file(&cli, "a.txt", b"two", "second").await;

    let out = run(&cli, &format!("reset {} -- a.txt", &c1[..8])).await;
    assert!(out.is_success(), "{}", out.stderr);

    // Index holds the older blob; HEAD and working tree keep the newer one.
    let out = run(&cli, "status --porcelain").await;
    assert_eq!(out.stdout, "MM a.txt\n");
    assert_eq!(cli.fs().read_file(Path::new("/repo/a.txt")).await.unwrap(), b"two");
}

#[tokio::test]
async fn test_reset_hard_with_paths_rejected() {
    let cli = GitCli::builder().workdir("/repo").build();
    run(&cli, "init").await;
    commit_file(&cli, "a.txt", b"one", "first").await;

    let out = run(&cli, "reset --hard HEAD -- a.txt").await;
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("Cannot do hard reset with paths"));
}
