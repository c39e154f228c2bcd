//! Integration tests for push/pull/fetch/clone between repositories that
//! share one virtual filesystem, plus conflict classification on failure.

use gitkit::fs::{FileSystem, InMemoryFs};
use gitkit::store::{ObjectStore, VfsStore};
use gitkit::{CmdOutput, GitCli};
use std::path::Path;
use std::sync::Arc;

fn argv(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

async fn run(cli: &GitCli, line: &str) -> CmdOutput {
    cli.execute(&argv(line)).await
}

async fn write(cli: &GitCli, path: &str, content: &[u8]) {
    cli.fs().write_file(Path::new(path), content).await.unwrap();
}

/// Two CLI handles over one shared filesystem and store.
fn pair(workdir_a: &str, workdir_b: &str) -> (GitCli, GitCli) {
    let fs: Arc<dyn FileSystem> = Arc::new(InMemoryFs::new());
    let store: Arc<dyn ObjectStore> = Arc::new(VfsStore::new(fs.clone()));
    let a = GitCli::builder()
        .fs(fs.clone())
        .store(store.clone())
        .workdir(workdir_a)
        .build();
    let b = GitCli::builder().fs(fs).store(store).workdir(workdir_b).build();
    (a, b)
}

async fn seed_commit(cli: &GitCli, path: &str, content: &[u8], msg: &str) {
    write(cli, path, content).await;
    let rel = path.rsplit('/').next().unwrap();
    run(cli, &format!("add {}", rel)).await;
    let out = cli
        .execute(&["commit".into(), "-m".into(), msg.into()])
        .await;
    assert!(out.is_success(), "{}", out.stderr);
}

#[tokio::test]
async fn test_remote_add_list_remove() {
    let (local, _) = pair("/local", "/srv/origin");
    run(&local, "init").await;

    run(&local, "remote add origin /srv/origin").await;
    let out = run(&local, "remote").await;
    assert_eq!(out.stdout, "origin\n");
    let out = run(&local, "remote -v").await;
    assert_eq!(out.stdout, "origin\t/srv/origin (fetch)\norigin\t/srv/origin (push)\n");

    let out = run(&local, "remote add origin /elsewhere").await;
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("already exists"));

    run(&local, "remote remove origin").await;
    let out = run(&local, "remote remove origin").await;
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("No such remote"));
}

#[tokio::test]
async fn test_push_new_branch_then_up_to_date() {
    let (local, origin) = pair("/local", "/srv/origin");
    run(&origin, "init").await;
    run(&local, "init").await;
    run(&local, "remote add origin /srv/origin").await;
    seed_commit(&local, "/local/a.txt", b"one", "one").await;

    let out = run(&local, "push origin main").await;
    assert!(out.is_success(), "{}", out.stderr);
    assert!(out.stdout.contains("To /srv/origin"));
    assert!(out.stdout.contains("[new branch]"));

    // Pushing again with nothing new reports success, not an error.
    let out = run(&local, "push").await;
    assert!(out.is_success());
    assert_eq!(out.stdout, "Everything up-to-date\n");
}

#[tokio::test]
async fn test_push_rejected_when_remote_is_ahead() {
    let (local, origin) = pair("/local", "/srv/origin");
    run(&origin, "init").await;
    run(&local, "init").await;
    run(&local, "remote add origin /srv/origin").await;
    seed_commit(&local, "/local/a.txt", b"one", "one").await;
    run(&local, "push").await;

    // Someone else lands a commit on the remote.
    seed_commit(&origin, "/srv/origin/b.txt", b"remote work", "remote work").await;
    seed_commit(&local, "/local/a.txt", b"two", "two").await;

    let out = run(&local, "push").await;
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("failed to push some refs"));
    assert!(out.stderr.contains("hint:"));
    assert!(out.stderr.contains("retry"));

    // Force push overwrites.
    let out = run(&local, "push -f").await;
    assert!(out.is_success(), "{}", out.stderr);
}

#[tokio::test]
async fn test_pull_fast_forward_and_divergence() {
    let (local, origin) = pair("/local", "/srv/origin");
    run(&origin, "init").await;
    run(&local, "init").await;
    run(&local, "remote add origin /srv/origin").await;
    seed_commit(&local, "/local/a.txt", b"one", "one").await;
    run(&local, "push").await;

    let out = run(&local, "pull").await;
    assert_eq!(out.stdout, "Already up to date.\n");

    seed_commit(&origin, "/srv/origin/b.txt", b"remote", "remote work").await;
    let out = run(&local, "pull").await;
    assert!(out.is_success(), "{}", out.stderr);
    assert!(out.stdout.contains("Fast-forward"));
    assert_eq!(
        local.fs().read_file(Path::new("/local/b.txt")).await.unwrap(),
        b"remote"
    );

    // Both sides advance: no fast-forward possible.
    seed_commit(&origin, "/srv/origin/b.txt", b"remote2", "more remote").await;
    seed_commit(&local, "/local/a.txt", b"local2", "more local").await;
    let out = run(&local, "pull").await;
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("not possible to fast-forward"));
    assert!(out.stderr.contains("hint:"));
}

#[tokio::test]
async fn test_fetch_updates_tracking_without_touching_worktree() {
    let (local, origin) = pair("/local", "/srv/origin");
    run(&origin, "init").await;
    run(&local, "init").await;
    run(&local, "remote add origin /srv/origin").await;
    seed_commit(&local, "/local/a.txt", b"one", "one").await;
    run(&local, "push").await;

    seed_commit(&origin, "/srv/origin/b.txt", b"remote", "remote work").await;
    let out = run(&local, "fetch").await;
    assert!(out.is_success(), "{}", out.stderr);
    assert!(!local.fs().exists(Path::new("/local/b.txt")).await.unwrap());

    // The fetched commit is resolvable through the tracking ref.
    let oid = local
        .store()
        .resolve_ref(Path::new("/local"), "origin/main")
        .await
        .unwrap();
    assert_eq!(oid.len(), 40);
}

#[tokio::test]
async fn test_clone_checks_out_default_branch() {
    let (seed, _) = pair("/srv/project", "/unused");
    run(&seed, "init").await;
    seed_commit(&seed, "/srv/project/readme.md", b"# project", "initial").await;

    let clone_cli = GitCli::builder()
        .fs(seed.fs())
        .store(seed.store())
        .workdir("/work")
        .build();
    clone_cli.fs().mkdir(Path::new("/work"), true).await.unwrap();
    let out = run(&clone_cli, "clone /srv/project").await;
    assert!(out.is_success(), "{}", out.stderr);
    assert_eq!(out.stdout, "Cloning into 'project'...\n");

    assert_eq!(
        clone_cli
            .fs()
            .read_file(Path::new("/work/project/readme.md"))
            .await
            .unwrap(),
        b"# project"
    );

    // The clone is a working repository wired to its origin.
    let cloned = GitCli::builder()
        .fs(seed.fs())
        .store(seed.store())
        .workdir("/work/project")
        .build();
    let out = run(&cloned, "remote -v").await;
    assert!(out.stdout.contains("/srv/project"));
    let out = run(&cloned, "log --oneline").await;
    assert!(out.stdout.contains("initial"));
}

#[tokio::test]
async fn test_clone_missing_source_fails() {
    let cli = GitCli::builder().workdir("/work").build();
    cli.fs().mkdir(Path::new("/work"), true).await.unwrap();
    let out = run(&cli, "clone /srv/nothing").await;
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("repository '/srv/nothing' not found"));
}

#[tokio::test]
async fn test_http_remote_reports_network_failure() {
    let cli = GitCli::builder().workdir("/local").build();
    run(&cli, "init").await;
    run(&cli, "remote add origin https://example.com/repo.git").await;
    seed_commit(&cli, "/local/a.txt", b"one", "one").await;

    let out = run(&cli, "push").await;
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("network failure"));
}

#[tokio::test]
async fn test_push_without_remote_fails() {
    let cli = GitCli::builder().workdir("/local").build();
    run(&cli, "init").await;
    seed_commit(&cli, "/local/a.txt", b"one", "one").await;

    let out = run(&cli, "push").await;
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("origin"));
}
