//! Status-matrix interpretation.
//!
//! Pure functions from [`StatusRow`]s to categorized change sets, rendered
//! either as the grouped human report or as stable two-column porcelain.
//! Rows where HEAD, index, and working tree all agree are omitted; a clean
//! repository renders the clean sentinel (human) or nothing (porcelain).

use crate::store::StatusRow;

/// How a path changed in the index relative to HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedChange {
    /// In the index, absent from HEAD.
    Added,
    /// In both, with different contents.
    Modified,
    /// In HEAD, removed from the index.
    Deleted,
}

/// How a path changed in the working tree relative to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeChange {
    /// In both, with different contents.
    Modified,
    /// In the index, missing from the working tree.
    Deleted,
}

/// Per-path classification of one status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Path relative to the repository root.
    pub path: String,
    /// Staged change, if any.
    pub staged: Option<StagedChange>,
    /// Unstaged working-tree change, if any.
    pub worktree: Option<WorktreeChange>,
    /// Present only in the working tree.
    pub untracked: bool,
}

/// Categorized change sets for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Changed paths in matrix order; unchanged paths are excluded.
    pub entries: Vec<FileStatus>,
}

impl StatusReport {
    /// True when nothing is staged, modified, or untracked.
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Classify a status matrix into a report.
pub fn classify(rows: &[StatusRow]) -> StatusReport {
    let mut entries = Vec::new();

    for row in rows {
        if row.head == row.stage && row.stage == row.workdir {
            continue;
        }

        if row.head.is_none() && row.stage.is_none() {
            if row.workdir.is_some() {
                entries.push(FileStatus {
                    path: row.path.clone(),
                    staged: None,
                    worktree: None,
                    untracked: true,
                });
            }
            continue;
        }

        let staged = match (&row.head, &row.stage) {
            (None, Some(_)) => Some(StagedChange::Added),
            (Some(_), None) => Some(StagedChange::Deleted),
            (Some(h), Some(s)) if h != s => Some(StagedChange::Modified),
            _ => None,
        };
        let worktree = match (&row.stage, &row.workdir) {
            (Some(_), None) => Some(WorktreeChange::Deleted),
            (Some(s), Some(w)) if s != w => Some(WorktreeChange::Modified),
            _ => None,
        };

        if staged.is_some() || worktree.is_some() {
            entries.push(FileStatus {
                path: row.path.clone(),
                staged,
                worktree,
                untracked: false,
            });
        }
    }

    StatusReport { entries }
}

/// Render the grouped human-readable report.
pub fn render_human(report: &StatusReport, branch: Option<&str>) -> String {
    let mut output = String::new();

    if let Some(branch) = branch {
        output.push_str(&format!("On branch {}\n", branch));
    } else {
        output.push_str("HEAD detached\n");
    }

    let staged: Vec<&FileStatus> = report.entries.iter().filter(|e| e.staged.is_some()).collect();
    let unstaged: Vec<&FileStatus> =
        report.entries.iter().filter(|e| e.worktree.is_some()).collect();
    let untracked: Vec<&FileStatus> = report.entries.iter().filter(|e| e.untracked).collect();

    if !staged.is_empty() {
        output.push_str("\nChanges to be committed:\n");
        output.push_str("  (use \"git restore --staged <file>...\" to unstage)\n");
        for entry in &staged {
            let label = match entry.staged {
                Some(StagedChange::Added) => "new file:",
                Some(StagedChange::Deleted) => "deleted:",
                _ => "modified:",
            };
            output.push_str(&format!("\t{:<12}{}\n", label, entry.path));
        }
    }

    if !unstaged.is_empty() {
        output.push_str("\nChanges not staged for commit:\n");
        output.push_str("  (use \"git add <file>...\" to update what will be committed)\n");
        for entry in &unstaged {
            let label = match entry.worktree {
                Some(WorktreeChange::Deleted) => "deleted:",
                _ => "modified:",
            };
            output.push_str(&format!("\t{:<12}{}\n", label, entry.path));
        }
    }

    if !untracked.is_empty() {
        output.push_str("\nUntracked files:\n");
        output.push_str("  (use \"git add <file>...\" to include in what will be committed)\n");
        for entry in &untracked {
            output.push_str(&format!("\t{}\n", entry.path));
        }
    }

    if report.is_clean() {
        output.push_str("\nnothing to commit, working tree clean\n");
    }

    output
}

/// Render stable machine-parsable porcelain: a two-character code and the
/// path, one line per changed file, empty when clean.
pub fn render_porcelain(report: &StatusReport) -> String {
    let mut output = String::new();

    for entry in &report.entries {
        if entry.untracked {
            output.push_str(&format!("?? {}\n", entry.path));
            continue;
        }
        let x = match entry.staged {
            Some(StagedChange::Added) => 'A',
            Some(StagedChange::Modified) => 'M',
            Some(StagedChange::Deleted) => 'D',
            None => ' ',
        };
        let y = match entry.worktree {
            Some(WorktreeChange::Modified) => 'M',
            Some(WorktreeChange::Deleted) => 'D',
            None => ' ',
        };
        output.push_str(&format!("{}{} {}\n", x, y, entry.path));
    }

    output
}
