//! Git history extraction via git2.
//!
//! Walks commit history and emits one [`ChangeEvent`] per commit × file,
//! with line counts taken from the diff against the first parent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::{
    Commit, Delta, DiffFindOptions, DiffOptions, ObjectType, Repository, Sort, TreeWalkMode,
    TreeWalkResult,
};
use tracing::debug;
use vitals_core::{ChangeEvent, HistoryConfig, VitalsError};

use crate::source::{parse_iso_reference, ChangeSource};

/// A [`ChangeSource`] reading a local git repository.
///
/// The repository is reopened per call; nothing is cached between calls.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use chrono::{Duration, Utc};
/// use vitals_core::HistoryConfig;
/// use vitals_gitpulse::mining::GitSource;
/// use vitals_gitpulse::source::ChangeSource;
///
/// let source = GitSource::new(Path::new("."), HistoryConfig::default());
/// let now = Utc::now();
/// let events = source.changes(now - Duration::days(90), now).unwrap();
/// println!("{} file changes", events.len());
/// ```
#[derive(Debug, Clone)]
pub struct GitSource {
    repo_path: PathBuf,
    options: HistoryConfig,
}

impl GitSource {
    pub fn new(repo_path: &Path, options: HistoryConfig) -> Self {
        Self {
            repo_path: repo_path.to_path_buf(),
            options,
        }
    }

    fn open(&self) -> Result<Repository, VitalsError> {
        Repository::open(&self.repo_path)
            .map_err(|e| VitalsError::Git(format!("failed to open repository: {e}")))
    }

    fn revwalk<'r>(&self, repo: &'r Repository) -> Result<git2::Revwalk<'r>, VitalsError> {
        let mut revwalk = repo
            .revwalk()
            .map_err(|e| VitalsError::Git(format!("failed to create revwalk: {e}")))?;

        revwalk.set_sorting(Sort::TIME).ok();

        if let Some(ref branch) = self.options.branch {
            let reference = repo
                .resolve_reference_from_short_name(branch)
                .map_err(|e| VitalsError::Git(format!("failed to resolve branch '{branch}': {e}")))?;
            let oid = reference
                .target()
                .ok_or_else(|| VitalsError::Git("branch has no target".into()))?;
            revwalk
                .push(oid)
                .map_err(|e| VitalsError::Git(format!("failed to push oid: {e}")))?;
        } else {
            revwalk
                .push_head()
                .map_err(|e| VitalsError::Git(format!("failed to push HEAD: {e}")))?;
        }

        Ok(revwalk)
    }

    /// Newest commit on the walked branch at or before `at`.
    fn commit_at_or_before<'r>(
        &self,
        repo: &'r Repository,
        at: DateTime<Utc>,
    ) -> Result<Option<Commit<'r>>, VitalsError> {
        for oid_result in self.revwalk(repo)? {
            let oid = oid_result.map_err(|e| VitalsError::Git(format!("revwalk error: {e}")))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| VitalsError::Git(format!("failed to find commit: {e}")))?;
            if commit_time(&commit)? <= at {
                return Ok(Some(commit));
            }
        }
        Ok(None)
    }

    fn find_reference_commit<'r>(
        &self,
        repo: &'r Repository,
        reference: &str,
    ) -> Result<Commit<'r>, VitalsError> {
        if let Ok(commit) = repo.revparse_single(reference).and_then(|o| o.peel_to_commit()) {
            return Ok(commit);
        }
        if let Some(at) = parse_iso_reference(reference) {
            if let Some(commit) = self.commit_at_or_before(repo, at)? {
                return Ok(commit);
            }
        }
        Err(VitalsError::UnresolvableRef(reference.to_string()))
    }
}

impl ChangeSource for GitSource {
    fn changes(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ChangeEvent>, VitalsError> {
        let repo = self.open()?;
        let mut events = Vec::new();
        let mut skipped = 0usize;

        for oid_result in self.revwalk(&repo)? {
            let oid = oid_result.map_err(|e| VitalsError::Git(format!("revwalk error: {e}")))?;

            let commit = repo
                .find_commit(oid)
                .map_err(|e| VitalsError::Git(format!("failed to find commit: {e}")))?;

            let timestamp = commit_time(&commit)?;
            if timestamp > until {
                continue;
            }
            if timestamp < since {
                break;
            }

            let files = extract_file_changes(&repo, &commit)?;

            // Large refactors and merges drown out real co-change signal
            if files.len() > self.options.max_files_per_commit {
                skipped += 1;
                continue;
            }

            let author = commit.author();
            let author_name = author.name().unwrap_or("unknown").to_string();
            let author_email = author.email().unwrap_or("unknown").to_string();
            let commit_hash = oid.to_string();

            events.extend(files.into_iter().map(|(file_path, added, deleted)| ChangeEvent {
                commit_hash: commit_hash.clone(),
                timestamp,
                file_path,
                lines_added: added,
                lines_deleted: deleted,
                author_name: author_name.clone(),
                author_email: author_email.clone(),
            }));
        }

        debug!(
            events = events.len(),
            skipped_commits = skipped,
            "mined change events"
        );
        Ok(events)
    }

    fn file_sizes(&self, reference: &str) -> Result<HashMap<String, u64>, VitalsError> {
        let repo = self.open()?;
        let commit = self.find_reference_commit(&repo, reference)?;
        let tree = commit
            .tree()
            .map_err(|e| VitalsError::Git(format!("failed to get commit tree: {e}")))?;
        let odb = repo
            .odb()
            .map_err(|e| VitalsError::Git(format!("failed to open object database: {e}")))?;

        let mut sizes = HashMap::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let (Some(name), Ok((size, _))) = (entry.name(), odb.read_header(entry.id())) {
                    sizes.insert(format!("{root}{name}"), size as u64);
                }
            }
            TreeWalkResult::Ok
        })
        .map_err(|e| VitalsError::Git(format!("failed to walk tree: {e}")))?;

        Ok(sizes)
    }

    fn resolve_ref(&self, reference: &str) -> Result<DateTime<Utc>, VitalsError> {
        let repo = self.open()?;
        let commit = repo
            .revparse_single(reference)
            .and_then(|o| o.peel_to_commit())
            .map_err(|_| VitalsError::UnresolvableRef(reference.to_string()))?;
        commit_time(&commit)
    }
}

fn commit_time(commit: &Commit<'_>) -> Result<DateTime<Utc>, VitalsError> {
    let seconds = commit.time().seconds();
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| VitalsError::Git(format!("commit time out of range: {seconds}")))
}

/// `(path, lines_added, lines_deleted)` per file touched by `commit`.
fn extract_file_changes(
    repo: &Repository,
    commit: &Commit<'_>,
) -> Result<Vec<(String, u64, u64)>, VitalsError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| VitalsError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| VitalsError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| VitalsError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&commit_tree),
            Some(&mut diff_opts),
        )
        .map_err(|e| VitalsError::Git(format!("failed to compute diff: {e}")))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| VitalsError::Git(format!("failed to find renames: {e}")))?;

    let mut paths = Vec::new();
    for delta in diff.deltas() {
        // Deleted files are reported under their old path
        let file = match delta.status() {
            Delta::Deleted => delta.old_file(),
            _ => delta.new_file(),
        };
        if let Some(path) = file.path() {
            let path = path.to_string_lossy().to_string();
            if !path.is_empty() {
                paths.push(path);
            }
        }
    }

    let mut line_counts: HashMap<String, (u64, u64)> = HashMap::new();
    diff.foreach(
        &mut |_delta, _progress| true,
        None,
        None,
        Some(&mut |delta, _hunk, line| {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .unwrap_or(Path::new(""))
                .to_string_lossy()
                .to_string();

            let entry = line_counts.entry(path).or_insert((0, 0));
            match line.origin() {
                '+' => entry.0 += 1,
                '-' => entry.1 += 1,
                _ => {}
            }
            true
        }),
    )
    .map_err(|e| VitalsError::Git(format!("failed to iterate diff lines: {e}")))?;

    Ok(paths
        .into_iter()
        .map(|path| {
            let (added, deleted) = line_counts.get(&path).copied().unwrap_or((0, 0));
            (path, added, deleted)
        })
        .collect())
}
