//! VFS-backed object store.
//!
//! Keeps all repository state inside the virtual filesystem under `.git/`:
//! content-addressed objects (sha1 oids over kind-prefixed payloads), one
//! file per ref, a JSON index, and an INI config. Object payloads for trees
//! and commits are JSON records rather than canonical git object format;
//! the trade is the same the rest of the sandbox makes: user-facing
//! behavior over wire compatibility.
//!
//! Remote URLs that name a VFS directory are first-class: push, fetch,
//! pull, and clone move objects between repository directories in the same
//! filesystem. `http(s)://` URLs fail with a network error since no
//! transport exists in-process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::{
    CheckoutOptions, CloneOptions, CommitInfo, ObjectStore, Oid, PullOutcome, PushOptions,
    PushOutcome, RemoteInfo, StatusRow,
};
use crate::config::Identity;
use crate::error::{Error, Result};
use crate::fs::FileSystem;

/// Path of the global-scope config file inside the VFS.
const GLOBAL_CONFIG_PATH: &str = "/.gitconfig";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TreeEntry {
    oid: String,
    mode: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct TreeRecord {
    entries: BTreeMap<String, TreeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommitRecord {
    tree: String,
    parents: Vec<String>,
    author_name: String,
    author_email: String,
    timestamp: i64,
    message: String,
}

type IndexMap = BTreeMap<String, TreeEntry>;

/// Object store keeping git state inside the virtual filesystem.
pub struct VfsStore {
    fs: Arc<dyn FileSystem>,
}

impl VfsStore {
    /// Create a store over the given filesystem.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    fn git_dir(dir: &Path) -> PathBuf {
        dir.join(".git")
    }

    async fn require_repo(&self, dir: &Path) -> Result<()> {
        if !self.fs.exists(&Self::git_dir(dir)).await? {
            return Err(Error::NotARepository(dir.to_path_buf()));
        }
        Ok(())
    }

    fn hash_object(kind: &str, data: &[u8]) -> Oid {
        let mut hasher = Sha1::new();
        hasher.update(kind.as_bytes());
        hasher.update(b"\0");
        hasher.update(data);
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    async fn write_object(&self, dir: &Path, kind: &str, data: &[u8]) -> Result<Oid> {
        let oid = Self::hash_object(kind, data);
        let path = Self::git_dir(dir).join("objects").join(&oid);
        if !self.fs.exists(&path).await? {
            self.fs.write_file(&path, data).await?;
        }
        Ok(oid)
    }

    async fn read_object(&self, dir: &Path, oid: &str) -> Result<Vec<u8>> {
        let path = Self::git_dir(dir).join("objects").join(oid);
        if !self.fs.exists(&path).await? {
            return Err(Error::ObjectNotFound(oid.to_string()));
        }
        self.fs.read_file(&path).await
    }

    async fn read_tree_record(&self, dir: &Path, oid: &str) -> Result<TreeRecord> {
        let data = self.read_object(dir, oid).await?;
        serde_json::from_slice(&data)
            .map_err(|e| Error::Internal(format!("malformed tree object {}: {}", oid, e)))
    }

    async fn read_commit_record(&self, dir: &Path, oid: &str) -> Result<CommitRecord> {
        let data = self.read_object(dir, oid).await?;
        serde_json::from_slice(&data)
            .map_err(|e| Error::Internal(format!("malformed commit object {}: {}", oid, e)))
    }

    async fn read_index(&self, dir: &Path) -> Result<IndexMap> {
        let path = Self::git_dir(dir).join("index");
        if !self.fs.exists(&path).await? {
            return Ok(IndexMap::new());
        }
        let data = self.fs.read_file(&path).await?;
        serde_json::from_slice(&data)
            .map_err(|e| Error::Internal(format!("malformed index: {}", e)))
    }

    async fn write_index(&self, dir: &Path, index: &IndexMap) -> Result<()> {
        let data = serde_json::to_vec(index)
            .map_err(|e| Error::Internal(format!("index encoding failed: {}", e)))?;
        self.fs
            .write_file(&Self::git_dir(dir).join("index"), &data)
            .await
    }

    /// Branch name HEAD points at, or `None` when detached.
    async fn head_branch(&self, dir: &Path) -> Result<Option<String>> {
        let head_path = Self::git_dir(dir).join("HEAD");
        if !self.fs.exists(&head_path).await? {
            return Ok(None);
        }
        let content = self.fs.read_file(&head_path).await?;
        let content = String::from_utf8_lossy(&content);
        Ok(content
            .trim()
            .strip_prefix("ref: refs/heads/")
            .map(str::to_string))
    }

    async fn read_ref_file(&self, path: &Path) -> Result<Option<Oid>> {
        if !self.fs.exists(path).await? {
            return Ok(None);
        }
        let content = self.fs.read_file(path).await?;
        Ok(Some(String::from_utf8_lossy(&content).trim().to_string()))
    }

    async fn branch_oid(&self, dir: &Path, name: &str) -> Result<Option<Oid>> {
        self.read_ref_file(&Self::git_dir(dir).join("refs/heads").join(name))
            .await
    }

    async fn set_branch(&self, dir: &Path, name: &str, oid: &str) -> Result<()> {
        self.fs
            .write_file(
                &Self::git_dir(dir).join("refs/heads").join(name),
                oid.as_bytes(),
            )
            .await
    }

    async fn head_oid(&self, dir: &Path) -> Result<Option<Oid>> {
        match self.head_branch(dir).await? {
            Some(branch) => self.branch_oid(dir, &branch).await,
            None => self.read_ref_file(&Self::git_dir(dir).join("HEAD")).await,
        }
    }

    /// Tree map of a commit, or empty when `oid` is `None`.
    async fn tree_map_of(&self, dir: &Path, oid: Option<&str>) -> Result<IndexMap> {
        match oid {
            Some(oid) => {
                let commit = self.read_commit_record(dir, oid).await?;
                Ok(self.read_tree_record(dir, &commit.tree).await?.entries)
            }
            None => Ok(IndexMap::new()),
        }
    }

    /// All working-tree file paths relative to `dir`, skipping `.git`.
    async fn workdir_files(&self, dir: &Path) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            for entry in self.fs.read_dir(&current).await? {
                if current == dir && entry.name == ".git" {
                    continue;
                }
                let path = current.join(&entry.name);
                if entry.metadata.file_type.is_dir() {
                    stack.push(path);
                } else {
                    let rel = path
                        .strip_prefix(dir)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .to_string();
                    files.push(rel);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Rewrite working tree and index to match `target`.
    ///
    /// Tracked paths (HEAD or index) absent from `target` are removed;
    /// untracked files are removed only when `remove_untracked` is set.
    async fn reconcile_worktree(
        &self,
        dir: &Path,
        target: &IndexMap,
        remove_untracked: bool,
    ) -> Result<()> {
        let head = self.tree_map_of(dir, self.head_oid(dir).await?.as_deref()).await?;
        let index = self.read_index(dir).await?;

        let doomed: Vec<String> = if remove_untracked {
            self.workdir_files(dir)
                .await?
                .into_iter()
                .filter(|p| !target.contains_key(p))
                .collect()
        } else {
            head.keys()
                .chain(index.keys())
                .filter(|p| !target.contains_key(*p))
                .cloned()
                .collect::<HashSet<_>>()
                .into_iter()
                .collect()
        };

        for path in doomed {
            let abs = dir.join(&path);
            if self.fs.exists(&abs).await? {
                self.fs.remove(&abs, false).await?;
            }
        }

        for (path, entry) in target {
            let abs = dir.join(path);
            if let Some(parent) = abs.parent() {
                if !self.fs.exists(parent).await? {
                    self.fs.mkdir(parent, true).await?;
                }
            }
            let content = self.read_object(dir, &entry.oid).await?;
            self.fs.write_file(&abs, &content).await?;
        }

        self.write_index(dir, target).await
    }

    /// Copy objects present in `src` but missing in `dst`.
    async fn copy_missing_objects(&self, src: &Path, dst: &Path) -> Result<()> {
        let src_objects = Self::git_dir(src).join("objects");
        let dst_objects = Self::git_dir(dst).join("objects");
        for entry in self.fs.read_dir(&src_objects).await? {
            let to = dst_objects.join(&entry.name);
            if !self.fs.exists(&to).await? {
                let data = self.fs.read_file(&src_objects.join(&entry.name)).await?;
                self.fs.write_file(&to, &data).await?;
            }
        }
        Ok(())
    }

    async fn list_refs_in(&self, dir: &Path, subdir: &str) -> Result<Vec<String>> {
        let path = Self::git_dir(dir).join(subdir);
        if !self.fs.exists(&path).await? {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = self
            .fs
            .read_dir(&path)
            .await?
            .into_iter()
            .filter(|e| e.metadata.file_type.is_file())
            .map(|e| e.name)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Resolve the VFS directory a remote name points at.
    ///
    /// `http(s)://` URLs have no in-process transport and fail with
    /// [`Error::NetworkFailure`].
    async fn remote_dir(&self, dir: &Path, remote: &str) -> Result<(String, PathBuf)> {
        let url = self
            .get_config(Some(dir), &format!("remote.{}.url", remote))
            .await?
            .ok_or_else(|| Error::RemoteNotFound(remote.to_string()))?;
        let target = Self::url_to_dir(&url)?;
        if !self.fs.exists(&Self::git_dir(&target)).await? {
            return Err(Error::RepositoryNotFound(url));
        }
        Ok((url, target))
    }

    fn url_to_dir(url: &str) -> Result<PathBuf> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Err(Error::NetworkFailure(format!(
                "unable to access '{}': no transport available",
                url
            )));
        }
        Ok(PathBuf::from(url))
    }

    /// Ancestor walk over all parents, starting from `descendant`.
    async fn oid_is_ancestor(&self, dir: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
        let mut queue = vec![descendant.to_string()];
        let mut seen = HashSet::new();
        while let Some(oid) = queue.pop() {
            if oid == ancestor {
                return Ok(true);
            }
            if !seen.insert(oid.clone()) {
                continue;
            }
            let commit = self.read_commit_record(dir, &oid).await?;
            queue.extend(commit.parents);
        }
        Ok(false)
    }

    fn split_config_key(key: &str) -> Result<(String, Option<String>, String)> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            [section, name] => Ok((section.to_lowercase(), None, name.to_lowercase())),
            [section, sub, name] => Ok((
                section.to_lowercase(),
                Some(sub.to_string()),
                name.to_lowercase(),
            )),
            _ => Err(Error::InvalidConfigKey(key.to_string())),
        }
    }

    fn config_file(dir: Option<&Path>) -> PathBuf {
        match dir {
            Some(dir) => Self::git_dir(dir).join("config"),
            None => PathBuf::from(GLOBAL_CONFIG_PATH),
        }
    }

    /// Parse INI config into flattened `section[.subsection].name` pairs,
    /// preserving file order.
    async fn read_config_entries(&self, path: &Path) -> Result<Vec<(String, String)>> {
        if !self.fs.exists(path).await? {
            return Ok(Vec::new());
        }
        let content = self.fs.read_file(path).await?;
        let content = String::from_utf8_lossy(&content);

        let mut entries = Vec::new();
        let mut prefix = String::new();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('[') && line.ends_with(']') {
                let header = &line[1..line.len() - 1];
                prefix = match header.split_once(' ') {
                    Some((section, sub)) => {
                        let sub = sub.trim().trim_matches('"');
                        format!("{}.{}", section.to_lowercase(), sub)
                    }
                    None => header.to_lowercase(),
                };
            } else if let Some((k, v)) = line.split_once('=') {
                if !prefix.is_empty() {
                    entries.push((
                        format!("{}.{}", prefix, k.trim().to_lowercase()),
                        v.trim().to_string(),
                    ));
                }
            }
        }
        Ok(entries)
    }

    /// Serialize flattened entries back to INI, grouping by section.
    async fn write_config_entries(&self, path: &Path, entries: &[(String, String)]) -> Result<()> {
        let mut sections: Vec<(String, Vec<(String, String)>)> = Vec::new();
        for (key, value) in entries {
            let (section, sub, name) = Self::split_config_key(key)?;
            let header = match sub {
                Some(sub) => format!("[{} \"{}\"]", section, sub),
                None => format!("[{}]", section),
            };
            match sections.iter_mut().find(|(h, _)| *h == header) {
                Some((_, items)) => items.push((name, value.clone())),
                None => sections.push((header, vec![(name, value.clone())])),
            }
        }

        let mut out = String::new();
        for (header, items) in sections {
            out.push_str(&header);
            out.push('\n');
            for (name, value) in items {
                out.push_str(&format!("\t{} = {}\n", name, value));
            }
        }
        self.fs.write_file(path, out.as_bytes()).await
    }

    fn commit_info(oid: &str, record: CommitRecord) -> CommitInfo {
        CommitInfo {
            oid: oid.to_string(),
            tree: record.tree,
            parents: record.parents,
            author: format!("{} <{}>", record.author_name, record.author_email),
            timestamp: record.timestamp,
            message: record.message,
        }
    }
}

#[async_trait]
impl ObjectStore for VfsStore {
    async fn init(&self, dir: &Path, default_branch: &str) -> Result<()> {
        let git_dir = Self::git_dir(dir);
        if !self.fs.exists(dir).await? {
            self.fs.mkdir(dir, true).await?;
        }
        self.fs.mkdir(&git_dir.join("objects"), true).await?;
        self.fs.mkdir(&git_dir.join("refs/heads"), true).await?;
        self.fs.mkdir(&git_dir.join("refs/tags"), true).await?;
        self.fs
            .write_file(
                &git_dir.join("HEAD"),
                format!("ref: refs/heads/{}\n", default_branch).as_bytes(),
            )
            .await?;
        self.write_index(dir, &IndexMap::new()).await?;
        self.write_config_entries(
            &git_dir.join("config"),
            &[("core.bare".to_string(), "false".to_string())],
        )
        .await
    }

    async fn is_repository(&self, dir: &Path) -> Result<bool> {
        self.fs.exists(&Self::git_dir(dir)).await
    }

    async fn resolve_ref(&self, dir: &Path, refish: &str) -> Result<Oid> {
        self.require_repo(dir).await?;

        if refish == "HEAD" {
            return self
                .head_oid(dir)
                .await?
                .ok_or_else(|| Error::RefNotFound("HEAD".to_string()));
        }

        let git_dir = Self::git_dir(dir);
        for prefix in ["refs/heads", "refs/tags", "refs/remotes"] {
            if let Some(oid) = self.read_ref_file(&git_dir.join(prefix).join(refish)).await? {
                return Ok(oid);
            }
        }

        // Oid or unique oid prefix.
        if refish.len() >= 4 && refish.chars().all(|c| c.is_ascii_hexdigit()) {
            let matches: Vec<String> = self
                .fs
                .read_dir(&git_dir.join("objects"))
                .await?
                .into_iter()
                .map(|e| e.name)
                .filter(|name| name.starts_with(refish))
                .collect();
            if matches.len() == 1 {
                return Ok(matches.into_iter().next().unwrap_or_default());
            }
        }

        Err(Error::RefNotFound(refish.to_string()))
    }

    async fn current_branch(&self, dir: &Path) -> Result<Option<String>> {
        self.require_repo(dir).await?;
        self.head_branch(dir).await
    }

    async fn list_branches(&self, dir: &Path) -> Result<Vec<String>> {
        self.require_repo(dir).await?;
        self.list_refs_in(dir, "refs/heads").await
    }

    async fn create_branch(&self, dir: &Path, name: &str, target: &str) -> Result<()> {
        self.require_repo(dir).await?;
        if self.branch_oid(dir, name).await?.is_some() {
            return Err(Error::BranchExists(name.to_string()));
        }
        let oid = self.resolve_ref(dir, target).await?;
        self.set_branch(dir, name, &oid).await
    }

    async fn delete_branch(&self, dir: &Path, name: &str) -> Result<Oid> {
        self.require_repo(dir).await?;
        if self.head_branch(dir).await?.as_deref() == Some(name) {
            return Err(Error::BranchCheckedOut(name.to_string(), dir.to_path_buf()));
        }
        let oid = self
            .branch_oid(dir, name)
            .await?
            .ok_or_else(|| Error::BranchNotFound(name.to_string()))?;
        self.fs
            .remove(&Self::git_dir(dir).join("refs/heads").join(name), false)
            .await?;
        Ok(oid)
    }

    async fn force_branch(&self, dir: &Path, name: &str, target: &str) -> Result<()> {
        self.require_repo(dir).await?;
        let oid = self.resolve_ref(dir, target).await?;
        self.set_branch(dir, name, &oid).await
    }

    async fn checkout(&self, dir: &Path, refish: &str, opts: CheckoutOptions) -> Result<()> {
        self.require_repo(dir).await?;
        let head_path = Self::git_dir(dir).join("HEAD");

        let (head_content, oid) = if self.branch_oid(dir, refish).await?.is_some() {
            let oid = self.resolve_ref(dir, refish).await?;
            (format!("ref: refs/heads/{}\n", refish), oid)
        } else {
            let oid = self.resolve_ref(dir, refish).await?;
            (oid.clone(), oid)
        };

        if !opts.no_checkout {
            let target = self.tree_map_of(dir, Some(&oid)).await?;
            self.reconcile_worktree(dir, &target, opts.force).await?;
        }
        debug!(target = refish, "checkout");
        self.fs.write_file(&head_path, head_content.as_bytes()).await
    }

    async fn status_matrix(&self, dir: &Path) -> Result<Vec<StatusRow>> {
        self.require_repo(dir).await?;
        let head = self.tree_map_of(dir, self.head_oid(dir).await?.as_deref()).await?;
        let index = self.read_index(dir).await?;

        let mut workdir: BTreeMap<String, Oid> = BTreeMap::new();
        for path in self.workdir_files(dir).await? {
            let content = self.fs.read_file(&dir.join(&path)).await?;
            workdir.insert(path, Self::hash_object("blob", &content));
        }

        let mut paths: Vec<&String> = head
            .keys()
            .chain(index.keys())
            .chain(workdir.keys())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| StatusRow {
                path: path.clone(),
                head: head.get(path).map(|e| e.oid.clone()),
                workdir: workdir.get(path).cloned(),
                stage: index.get(path).map(|e| e.oid.clone()),
            })
            .collect())
    }

    async fn list_files(&self, dir: &Path, refish: Option<&str>) -> Result<Vec<String>> {
        self.require_repo(dir).await?;
        let map = match refish {
            Some(refish) => {
                let oid = self.resolve_ref(dir, refish).await?;
                self.tree_map_of(dir, Some(&oid)).await?
            }
            None => self.read_index(dir).await?,
        };
        Ok(map.into_keys().collect())
    }

    async fn tree_entries(&self, dir: &Path, refish: &str) -> Result<Vec<(String, Oid)>> {
        self.require_repo(dir).await?;
        let oid = self.resolve_ref(dir, refish).await?;
        let map = self.tree_map_of(dir, Some(&oid)).await?;
        Ok(map.into_iter().map(|(p, e)| (p, e.oid)).collect())
    }

    async fn read_blob(&self, dir: &Path, oid: &str) -> Result<Vec<u8>> {
        self.require_repo(dir).await?;
        self.read_object(dir, oid).await
    }

    async fn write_blob(&self, dir: &Path, content: &[u8]) -> Result<Oid> {
        self.require_repo(dir).await?;
        self.write_object(dir, "blob", content).await
    }

    async fn stage_path(&self, dir: &Path, path: &str) -> Result<()> {
        self.require_repo(dir).await?;
        let mut index = self.read_index(dir).await?;
        let abs = dir.join(path);

        if self.fs.exists(&abs).await? {
            let meta = self.fs.stat(&abs).await?;
            if meta.file_type.is_dir() {
                // Stage every file under the directory.
                let prefix = if path == "." { String::new() } else { format!("{}/", path) };
                for file in self.workdir_files(dir).await? {
                    if prefix.is_empty() || file.starts_with(&prefix) {
                        let content = self.fs.read_file(&dir.join(&file)).await?;
                        let oid = self.write_object(dir, "blob", &content).await?;
                        index.insert(file, TreeEntry { oid, mode: 0o100644 });
                    }
                }
            } else {
                let content = self.fs.read_file(&abs).await?;
                let oid = self.write_object(dir, "blob", &content).await?;
                index.insert(path.to_string(), TreeEntry { oid, mode: meta.mode | 0o100000 });
            }
        } else {
            // Staging a deleted file records the deletion.
            index.remove(path);
        }
        self.write_index(dir, &index).await
    }

    async fn remove_from_index(&self, dir: &Path, path: &str) -> Result<()> {
        self.require_repo(dir).await?;
        let mut index = self.read_index(dir).await?;
        index.remove(path);
        self.write_index(dir, &index).await
    }

    async fn reset_index_path(&self, dir: &Path, refish: Option<&str>, path: &str) -> Result<()> {
        self.require_repo(dir).await?;
        let tree = match refish {
            Some(refish) => {
                let oid = self.resolve_ref(dir, refish).await?;
                self.tree_map_of(dir, Some(&oid)).await?
            }
            None => self.tree_map_of(dir, self.head_oid(dir).await?.as_deref()).await?,
        };
        let mut index = self.read_index(dir).await?;
        match tree.get(path) {
            Some(entry) => index.insert(path.to_string(), entry.clone()),
            None => index.remove(path),
        };
        self.write_index(dir, &index).await
    }

    async fn commit(&self, dir: &Path, message: &str, author: &Identity) -> Result<Oid> {
        self.require_repo(dir).await?;
        let index = self.read_index(dir).await?;

        let tree = TreeRecord { entries: index };
        let tree_data = serde_json::to_vec(&tree)
            .map_err(|e| Error::Internal(format!("tree encoding failed: {}", e)))?;
        let tree_oid = Self::hash_object("tree", &tree_data);

        let head = self.head_oid(dir).await?;
        if let Some(head_oid) = &head {
            let head_commit = self.read_commit_record(dir, head_oid).await?;
            if head_commit.tree == tree_oid {
                return Err(Error::NothingToCommit);
            }
        } else if tree.entries.is_empty() {
            return Err(Error::NothingToCommit);
        }

        self.write_object(dir, "tree", &tree_data).await?;
        let record = CommitRecord {
            tree: tree_oid,
            parents: head.clone().into_iter().collect(),
            author_name: author.name().to_string(),
            author_email: author.email().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            message: message.to_string(),
        };
        let commit_data = serde_json::to_vec(&record)
            .map_err(|e| Error::Internal(format!("commit encoding failed: {}", e)))?;
        let oid = self.write_object(dir, "commit", &commit_data).await?;

        match self.head_branch(dir).await? {
            Some(branch) => self.set_branch(dir, &branch, &oid).await?,
            None => {
                self.fs
                    .write_file(&Self::git_dir(dir).join("HEAD"), oid.as_bytes())
                    .await?
            }
        }
        debug!(oid = %oid, "commit created");
        Ok(oid)
    }

    async fn log(&self, dir: &Path, depth: Option<usize>) -> Result<Vec<CommitInfo>> {
        self.require_repo(dir).await?;
        let mut entries = Vec::new();
        let mut cursor = self.head_oid(dir).await?;
        while let Some(oid) = cursor {
            if depth.is_some_and(|d| entries.len() >= d) {
                break;
            }
            let record = self.read_commit_record(dir, &oid).await?;
            cursor = record.parents.first().cloned();
            entries.push(Self::commit_info(&oid, record));
        }
        Ok(entries)
    }

    async fn read_commit(&self, dir: &Path, oid: &str) -> Result<CommitInfo> {
        self.require_repo(dir).await?;
        let record = self.read_commit_record(dir, oid).await?;
        Ok(Self::commit_info(oid, record))
    }

    async fn is_ancestor(&self, dir: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
        self.require_repo(dir).await?;
        let anc = self.resolve_ref(dir, ancestor).await?;
        let desc = self.resolve_ref(dir, descendant).await?;
        self.oid_is_ancestor(dir, &anc, &desc).await
    }

    async fn list_remotes(&self, dir: &Path) -> Result<Vec<RemoteInfo>> {
        self.require_repo(dir).await?;
        let entries = self
            .read_config_entries(&Self::config_file(Some(dir)))
            .await?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, url)| {
                let name = key.strip_prefix("remote.")?.strip_suffix(".url")?;
                Some(RemoteInfo { remote: name.to_string(), url })
            })
            .collect())
    }

    async fn add_remote(&self, dir: &Path, remote: &str, url: &str) -> Result<()> {
        self.require_repo(dir).await?;
        if self
            .get_config(Some(dir), &format!("remote.{}.url", remote))
            .await?
            .is_some()
        {
            return Err(Error::RemoteExists(remote.to_string()));
        }
        self.set_config(Some(dir), &format!("remote.{}.url", remote), url)
            .await?;
        self.set_config(
            Some(dir),
            &format!("remote.{}.fetch", remote),
            &format!("+refs/heads/*:refs/remotes/{}/*", remote),
        )
        .await
    }

    async fn delete_remote(&self, dir: &Path, remote: &str) -> Result<()> {
        self.require_repo(dir).await?;
        let path = Self::config_file(Some(dir));
        let entries = self.read_config_entries(&path).await?;
        let prefix = format!("remote.{}.", remote);
        if !entries.iter().any(|(k, _)| k.starts_with(&prefix)) {
            return Err(Error::RemoteNotFound(remote.to_string()));
        }
        let kept: Vec<(String, String)> = entries
            .into_iter()
            .filter(|(k, _)| !k.starts_with(&prefix))
            .collect();
        self.write_config_entries(&path, &kept).await?;
        let tracking = Self::git_dir(dir).join("refs/remotes").join(remote);
        if self.fs.exists(&tracking).await? {
            self.fs.remove(&tracking, true).await?;
        }
        Ok(())
    }

    /// Push the branch to a VFS remote.
    ///
    /// `opts.on_auth` and `opts.signer` pass through untouched: directory
    /// remotes have no authentication or signing step.
    async fn push(
        &self,
        dir: &Path,
        remote: &str,
        refname: &str,
        opts: PushOptions,
    ) -> Result<PushOutcome> {
        self.require_repo(dir).await?;
        let (url, remote_dir) = self.remote_dir(dir, remote).await?;
        let local = self
            .branch_oid(dir, refname)
            .await?
            .ok_or_else(|| Error::RefNotFound(refname.to_string()))?;

        self.copy_missing_objects(dir, &remote_dir).await?;

        let old = self.branch_oid(&remote_dir, refname).await?;
        match &old {
            Some(remote_oid) if *remote_oid == local => return Ok(PushOutcome::UpToDate),
            Some(remote_oid) => {
                let fast_forward = self
                    .oid_is_ancestor(&remote_dir, remote_oid, &local)
                    .await?;
                if !fast_forward && !opts.force {
                    return Err(Error::PushRejected(format!(
                        "updates were rejected because the remote '{}' contains work that you do not have locally",
                        url
                    )));
                }
            }
            None => {}
        }

        self.set_branch(&remote_dir, refname, &local).await?;
        let tracking = Self::git_dir(dir).join("refs/remotes").join(remote);
        self.fs.mkdir(&tracking, true).await?;
        self.fs
            .write_file(&tracking.join(refname), local.as_bytes())
            .await?;
        debug!(remote = remote, branch = refname, "push");
        Ok(PushOutcome::Updated { old, new: local })
    }

    async fn fetch(&self, dir: &Path, remote: &str) -> Result<()> {
        self.require_repo(dir).await?;
        let (_, remote_dir) = self.remote_dir(dir, remote).await?;
        self.copy_missing_objects(&remote_dir, dir).await?;

        let tracking = Self::git_dir(dir).join("refs/remotes").join(remote);
        self.fs.mkdir(&tracking, true).await?;
        for branch in self.list_refs_in(&remote_dir, "refs/heads").await? {
            if let Some(oid) = self.branch_oid(&remote_dir, &branch).await? {
                self.fs
                    .write_file(&tracking.join(&branch), oid.as_bytes())
                    .await?;
            }
        }
        Ok(())
    }

    async fn pull(&self, dir: &Path, remote: &str, refname: &str) -> Result<PullOutcome> {
        self.fetch(dir, remote).await?;

        let tracking = format!("{}/{}", remote, refname);
        let remote_oid = self
            .read_ref_file(&Self::git_dir(dir).join("refs/remotes").join(remote).join(refname))
            .await?
            .ok_or_else(|| Error::RefNotFound(tracking))?;

        let local = self.branch_oid(dir, refname).await?;
        match &local {
            None => {}
            Some(local_oid) if *local_oid == remote_oid => return Ok(PullOutcome::UpToDate),
            Some(local_oid) => {
                if self.oid_is_ancestor(dir, &remote_oid, local_oid).await? {
                    // Local is ahead of the remote.
                    return Ok(PullOutcome::UpToDate);
                }
                if !self.oid_is_ancestor(dir, local_oid, &remote_oid).await? {
                    return Err(Error::FastForwardUnsupported);
                }
            }
        }

        self.set_branch(dir, refname, &remote_oid).await?;
        if self.head_branch(dir).await?.as_deref() == Some(refname) {
            let target = self.tree_map_of(dir, Some(&remote_oid)).await?;
            self.reconcile_worktree(dir, &target, false).await?;
        }
        Ok(PullOutcome::FastForwarded { old: local, new: remote_oid })
    }

    /// Clone a VFS repository.
    ///
    /// `opts.depth` is accepted but full history is copied: objects are
    /// shared files, so truncation would save nothing and break parent
    /// links.
    async fn clone_repo(&self, url: &str, dest: &Path, opts: CloneOptions) -> Result<()> {
        let src = Self::url_to_dir(url)?;
        if !self.fs.exists(&Self::git_dir(&src)).await? {
            return Err(Error::RepositoryNotFound(url.to_string()));
        }
        if self.fs.exists(&Self::git_dir(dest)).await? {
            return Err(Error::Internal(format!(
                "destination path '{}' already exists and is not an empty directory",
                dest.display()
            )));
        }

        let default_branch = self
            .head_branch(&src)
            .await?
            .unwrap_or_else(|| "main".to_string());
        self.init(dest, &default_branch).await?;
        self.copy_missing_objects(&src, dest).await?;

        self.set_config(Some(dest), "remote.origin.url", url).await?;
        self.set_config(
            Some(dest),
            "remote.origin.fetch",
            "+refs/heads/*:refs/remotes/origin/*",
        )
        .await?;

        let tracking = Self::git_dir(dest).join("refs/remotes/origin");
        self.fs.mkdir(&tracking, true).await?;
        let branches = if opts.single_branch {
            vec![default_branch.clone()]
        } else {
            self.list_refs_in(&src, "refs/heads").await?
        };
        for branch in branches {
            if let Some(oid) = self.branch_oid(&src, &branch).await? {
                self.fs
                    .write_file(&tracking.join(&branch), oid.as_bytes())
                    .await?;
            }
        }

        if let Some(oid) = self.branch_oid(&src, &default_branch).await? {
            self.set_branch(dest, &default_branch, &oid).await?;
            let target = self.tree_map_of(dest, Some(&oid)).await?;
            self.reconcile_worktree(dest, &target, false).await?;
        }
        debug!(url = url, dest = %dest.display(), "clone");
        Ok(())
    }

    async fn get_config(&self, dir: Option<&Path>, key: &str) -> Result<Option<String>> {
        let (section, sub, name) = Self::split_config_key(key)?;
        let full = match sub {
            Some(sub) => format!("{}.{}.{}", section, sub, name),
            None => format!("{}.{}", section, name),
        };
        let entries = self.read_config_entries(&Self::config_file(dir)).await?;
        Ok(entries
            .into_iter()
            .rev()
            .find(|(k, _)| *k == full)
            .map(|(_, v)| v))
    }

    async fn set_config(&self, dir: Option<&Path>, key: &str, value: &str) -> Result<()> {
        let (section, sub, name) = Self::split_config_key(key)?;
        let full = match sub {
            Some(sub) => format!("{}.{}.{}", section, sub, name),
            None => format!("{}.{}", section, name),
        };
        let path = Self::config_file(dir);
        let mut entries = self.read_config_entries(&path).await?;
        match entries.iter_mut().find(|(k, _)| *k == full) {
            Some((_, v)) => *v = value.to_string(),
            None => entries.push((full, value.to_string())),
        }
        self.write_config_entries(&path, &entries).await
    }

    async fn list_config(&self, dir: Option<&Path>) -> Result<Vec<(String, String)>> {
        let mut entries = self.read_config_entries(&Self::config_file(dir)).await?;
        entries.sort();
        Ok(entries)
    }

    async fn list_tags(&self, dir: &Path) -> Result<Vec<String>> {
        self.require_repo(dir).await?;
        self.list_refs_in(dir, "refs/tags").await
    }

    async fn create_tag(&self, dir: &Path, name: &str, target: &str) -> Result<()> {
        self.require_repo(dir).await?;
        let path = Self::git_dir(dir).join("refs/tags").join(name);
        if self.fs.exists(&path).await? {
            return Err(Error::TagExists(name.to_string()));
        }
        let oid = self.resolve_ref(dir, target).await?;
        self.fs.write_file(&path, oid.as_bytes()).await
    }

    async fn delete_tag(&self, dir: &Path, name: &str) -> Result<Oid> {
        self.require_repo(dir).await?;
        let path = Self::git_dir(dir).join("refs/tags").join(name);
        let oid = self
            .read_ref_file(&path)
            .await?
            .ok_or_else(|| Error::TagNotFound(name.to_string()))?;
        self.fs.remove(&path, false).await?;
        Ok(oid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;

    fn store() -> VfsStore {
        VfsStore::new(Arc::new(InMemoryFs::new()))
    }

    async fn write(store: &VfsStore, path: &str, content: &[u8]) {
        let abs = Path::new(path);
        if let Some(parent) = abs.parent() {
            store.fs.mkdir(parent, true).await.unwrap();
        }
        store.fs.write_file(abs, content).await.unwrap();
    }

    async fn commit_file(store: &VfsStore, dir: &Path, path: &str, content: &[u8], msg: &str) -> Oid {
        write(store, &format!("{}/{}", dir.display(), path), content).await;
        store.stage_path(dir, path).await.unwrap();
        store.commit(dir, msg, &Identity::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_init_creates_control_directory() {
        let s = store();
        s.init(Path::new("/repo"), "main").await.unwrap();
        assert!(s.is_repository(Path::new("/repo")).await.unwrap());
        assert_eq!(
            s.current_branch(Path::new("/repo")).await.unwrap(),
            Some("main".to_string())
        );
    }

    #[tokio::test]
    async fn test_not_a_repository() {
        let s = store();
        let err = s.status_matrix(Path::new("/nowhere")).await.unwrap_err();
        assert!(err.to_string().starts_with("fatal: not a git repository"));
    }

    #[tokio::test]
    async fn test_commit_advances_branch_and_clears_staged_changes() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        let oid = commit_file(&s, dir, "a.txt", b"hello", "add a").await;

        assert_eq!(s.resolve_ref(dir, "HEAD").await.unwrap(), oid);
        assert_eq!(s.resolve_ref(dir, "main").await.unwrap(), oid);

        // Index now matches HEAD: nothing staged.
        let rows = s.status_matrix(dir).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].head, rows[0].stage);
        assert_eq!(rows[0].head, rows[0].workdir);

        let err = s.commit(dir, "again", &Identity::new()).await.unwrap_err();
        assert!(matches!(err, Error::NothingToCommit));
    }

    #[tokio::test]
    async fn test_status_matrix_tracks_all_three_sides() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        commit_file(&s, dir, "a.txt", b"one", "add a").await;

        write(&s, "/repo/a.txt", b"two").await;
        write(&s, "/repo/b.txt", b"new").await;

        let rows = s.status_matrix(dir).await.unwrap();
        let a = rows.iter().find(|r| r.path == "a.txt").unwrap();
        assert!(a.head.is_some());
        assert_eq!(a.head, a.stage);
        assert_ne!(a.head, a.workdir);

        let b = rows.iter().find(|r| r.path == "b.txt").unwrap();
        assert!(b.head.is_none());
        assert!(b.stage.is_none());
        assert!(b.workdir.is_some());
    }

    #[tokio::test]
    async fn test_resolve_oid_prefix() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        let oid = commit_file(&s, dir, "a.txt", b"x", "add").await;
        assert_eq!(s.resolve_ref(dir, &oid[..8]).await.unwrap(), oid);
    }

    #[tokio::test]
    async fn test_branch_create_delete_guards() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        commit_file(&s, dir, "a.txt", b"x", "add").await;

        s.create_branch(dir, "dev", "HEAD").await.unwrap();
        assert!(matches!(
            s.create_branch(dir, "dev", "HEAD").await.unwrap_err(),
            Error::BranchExists(_)
        ));
        assert!(matches!(
            s.delete_branch(dir, "main").await.unwrap_err(),
            Error::BranchCheckedOut(..)
        ));
        s.delete_branch(dir, "dev").await.unwrap();
        assert!(matches!(
            s.delete_branch(dir, "dev").await.unwrap_err(),
            Error::BranchNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_checkout_switches_tree() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        commit_file(&s, dir, "a.txt", b"one", "c1").await;
        s.create_branch(dir, "dev", "HEAD").await.unwrap();
        commit_file(&s, dir, "b.txt", b"two", "c2").await;

        s.checkout(dir, "dev", CheckoutOptions::default()).await.unwrap();
        assert!(!s.fs.exists(Path::new("/repo/b.txt")).await.unwrap());
        assert!(s.fs.exists(Path::new("/repo/a.txt")).await.unwrap());

        s.checkout(dir, "main", CheckoutOptions::default()).await.unwrap();
        assert!(s.fs.exists(Path::new("/repo/b.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_ancestor() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        let c1 = commit_file(&s, dir, "a.txt", b"one", "c1").await;
        let c2 = commit_file(&s, dir, "a.txt", b"two", "c2").await;
        assert!(s.is_ancestor(dir, &c1, &c2).await.unwrap());
        assert!(!s.is_ancestor(dir, &c2, &c1).await.unwrap());
    }

    #[tokio::test]
    async fn test_push_and_reject() {
        let s = store();
        let local = Path::new("/local");
        let remote = Path::new("/remote");
        s.init(local, "main").await.unwrap();
        s.init(remote, "main").await.unwrap();
        s.add_remote(local, "origin", "/remote").await.unwrap();

        commit_file(&s, local, "a.txt", b"one", "c1").await;
        let out = s
            .push(local, "origin", "main", PushOptions::default())
            .await
            .unwrap();
        assert!(matches!(out, PushOutcome::Updated { old: None, .. }));

        // Second push with no new commits: up to date.
        let out = s
            .push(local, "origin", "main", PushOptions::default())
            .await
            .unwrap();
        assert_eq!(out, PushOutcome::UpToDate);

        // Remote moves ahead independently: push is rejected.
        commit_file(&s, remote, "b.txt", b"x", "remote work").await;
        commit_file(&s, local, "c.txt", b"y", "local work").await;
        let err = s
            .push(local, "origin", "main", PushOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PushRejected(_)));

        // Forced push wins.
        let out = s
            .push(local, "origin", "main", PushOptions { force: true, ..Default::default() })
            .await
            .unwrap();
        assert!(matches!(out, PushOutcome::Updated { .. }));
    }

    #[tokio::test]
    async fn test_pull_fast_forward_and_divergence() {
        let s = store();
        let a = Path::new("/a");
        let b = Path::new("/b");
        s.init(a, "main").await.unwrap();
        commit_file(&s, a, "a.txt", b"one", "c1").await;
        s.clone_repo("/a", b, CloneOptions::default()).await.unwrap();

        // New commit upstream fast-forwards the clone.
        commit_file(&s, a, "a.txt", b"two", "c2").await;
        let out = s.pull(b, "origin", "main").await.unwrap();
        assert!(matches!(out, PullOutcome::FastForwarded { .. }));
        assert_eq!(s.fs.read_file(Path::new("/b/a.txt")).await.unwrap(), b"two");

        // Nothing new: up to date.
        assert_eq!(s.pull(b, "origin", "main").await.unwrap(), PullOutcome::UpToDate);

        // Diverged histories cannot fast-forward.
        commit_file(&s, a, "a.txt", b"three", "c3").await;
        commit_file(&s, b, "b.txt", b"other", "local").await;
        let err = s.pull(b, "origin", "main").await.unwrap_err();
        assert!(matches!(err, Error::FastForwardUnsupported));
    }

    #[tokio::test]
    async fn test_clone_checks_out_working_tree() {
        let s = store();
        let src = Path::new("/src");
        s.init(src, "main").await.unwrap();
        commit_file(&s, src, "dir/file.txt", b"content", "c1").await;

        s.clone_repo("/src", Path::new("/dst"), CloneOptions::default())
            .await
            .unwrap();
        assert_eq!(
            s.fs.read_file(Path::new("/dst/dir/file.txt")).await.unwrap(),
            b"content"
        );
        let remotes = s.list_remotes(Path::new("/dst")).await.unwrap();
        assert_eq!(remotes[0].remote, "origin");
        assert_eq!(remotes[0].url, "/src");
    }

    #[tokio::test]
    async fn test_http_remote_is_a_network_failure() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        s.add_remote(dir, "origin", "https://example.com/repo.git")
            .await
            .unwrap();
        commit_file(&s, dir, "a.txt", b"x", "c1").await;
        let err = s
            .push(dir, "origin", "main", PushOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NetworkFailure(_)));
    }

    #[tokio::test]
    async fn test_config_subsection_round_trip() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        s.set_config(Some(dir), "user.name", "Test").await.unwrap();
        s.set_config(Some(dir), "remote.origin.url", "/elsewhere")
            .await
            .unwrap();
        assert_eq!(
            s.get_config(Some(dir), "user.name").await.unwrap(),
            Some("Test".to_string())
        );
        assert_eq!(
            s.get_config(Some(dir), "remote.origin.url").await.unwrap(),
            Some("/elsewhere".to_string())
        );
        // Global scope is a separate file.
        assert_eq!(s.get_config(None, "user.name").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tags() {
        let s = store();
        let dir = Path::new("/repo");
        s.init(dir, "main").await.unwrap();
        let oid = commit_file(&s, dir, "a.txt", b"x", "c1").await;
        s.create_tag(dir, "v1.0", "HEAD").await.unwrap();
        assert_eq!(s.list_tags(dir).await.unwrap(), vec!["v1.0"]);
        assert_eq!(s.resolve_ref(dir, "v1.0").await.unwrap(), oid);
        assert!(matches!(
            s.create_tag(dir, "v1.0", "HEAD").await.unwrap_err(),
            Error::TagExists(_)
        ));
        assert_eq!(s.delete_tag(dir, "v1.0").await.unwrap(), oid);
    }
}
