//! Copy, Mirror and Sync over any pair of transports
//!
//! Every operation is a sequence of depth-first walks. Each visited entry
//! turns into a [`Decision`] which is tallied into the [`Summary`] and handed
//! to the [`Logger`]. Dry-run only gates the mutating transport calls, so the
//! decisions of a dry run are exactly those of a live one.

mod copy_tree;
mod mirror;
mod sync;

pub use copy_tree::copy;
pub use mirror::mirror;
pub use sync::sync;

use crate::compare::deep_equal;
use crate::copy::copy_file;
use crate::error::{Result, SyncError};
use crate::fileset::{is_hidden, relative_path, FileSet};
use crate::logger::Logger;
use crate::summary::{Decision, SkipReason, Summary};
use crate::transport::{EntryKind, EntryMeta, LocalTransport, Transport, WalkEntry};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Fixed for the duration of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Decide and report everything, mutate nothing
    pub dry_run: bool,
    /// Mirror: prune destination-only entries. Copy: wipe the destination first.
    pub clean_destination: bool,
    /// Ignore every path with a segment starting with `.`
    pub skip_hidden: bool,
    /// Confirm a metadata difference byte by byte before overwriting
    pub deep_compare: bool,
    /// Mirror: overwrite files present on both sides without comparing
    pub force_write: bool,
    pub keep_permissions: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            clean_destination: false,
            skip_hidden: false,
            deep_compare: false,
            force_write: false,
            keep_permissions: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Create,
    Overwrite,
    Skip(SkipReason),
}

/// State of one operation: options, logger and the running tallies
struct Run<'a> {
    opts: &'a ReconcileOptions,
    logger: &'a dyn Logger,
    summary: Summary,
    started: Instant,
    /// Mirror and Copy replace a destination entry of the other kind;
    /// Sync never deletes and skips such paths instead
    replace_conflicts: bool,
    /// Destination directories removed to make room for a file
    replaced_dirs: Vec<String>,
    /// Source directories that could not be created; their contents are skipped
    blocked_dirs: Vec<String>,
}

impl<'a> Run<'a> {
    fn new(opts: &'a ReconcileOptions, logger: &'a dyn Logger) -> Self {
        Self {
            opts,
            logger,
            summary: Summary::default(),
            started: Instant::now(),
            replace_conflicts: true,
            replaced_dirs: Vec::new(),
            blocked_dirs: Vec::new(),
        }
    }

    fn record(&mut self, decision: Decision) {
        self.summary.record(&decision);
        self.logger.decision(&decision);
    }

    /// Walk `root`, dropping the root itself and hidden entries, and hand
    /// every other entry to `visit`. The first error aborts the walk.
    fn walk<S, F>(&mut self, src: &S, root: &Path, mut visit: F) -> Result<()>
    where
        S: Transport + ?Sized,
        F: FnMut(&mut Self, String, WalkEntry) -> Result<()>,
    {
        for entry in src.walk(root) {
            let entry = entry.map_err(|e| SyncError::walk(root, e))?;
            let Some(rel) = relative_path(root, &entry.path) else {
                continue;
            };
            if self.opts.skip_hidden && is_hidden(&rel) {
                self.record(Decision::Skip {
                    path: rel,
                    reason: SkipReason::Hidden,
                });
                continue;
            }
            self.summary.items += 1;
            if entry.meta.is_file() {
                self.summary.bytes += entry.meta.size;
            }
            visit(self, rel, entry)?;
        }
        Ok(())
    }

    /// Directory: create at the destination. Non-regular: skip. Regular
    /// file: create when `existing` is `None`, otherwise ask `decide`.
    /// An `existing` entry of the other kind is removed first (Sync skips
    /// the path instead). Returns whether a file was (or in dry-run would
    /// be) written.
    #[allow(clippy::too_many_arguments)]
    fn push_entry<S, D, F>(
        &mut self,
        src: &S,
        dst: &D,
        dst_root: &Path,
        rel: &str,
        entry: &WalkEntry,
        existing: Option<&EntryMeta>,
        decide: F,
    ) -> Result<bool>
    where
        S: Transport + ?Sized,
        D: Transport + ?Sized,
        F: FnOnce(&Path, &EntryMeta) -> Result<Verdict>,
    {
        if self.blocked_dirs.iter().any(|dir| is_within(rel, dir)) {
            self.skip(rel, SkipReason::KindConflict);
            return Ok(false);
        }
        if entry.meta.kind == EntryKind::Other {
            self.skip(rel, SkipReason::NonRegular);
            return Ok(false);
        }

        let target = dst_root.join(rel);
        let existing = match existing {
            Some(meta) if meta.kind != entry.meta.kind => {
                if !self.replace_conflicts {
                    if entry.meta.is_dir() {
                        self.blocked_dirs.push(rel.to_string());
                    }
                    self.skip(rel, SkipReason::KindConflict);
                    return Ok(false);
                }
                self.remove_conflicting(dst, &target, rel, meta)?;
                None
            }
            other => other,
        };

        let rel = rel.to_string();
        if entry.meta.is_dir() {
            if !self.opts.dry_run {
                dst.mkdir_all(&target)
                    .map_err(|e| SyncError::transfer("create directory", &target, e))?;
            }
            self.record(Decision::CreateDir { path: rel });
            return Ok(false);
        }
        let verdict = match existing {
            None => Verdict::Create,
            Some(meta) => decide(&target, meta)?,
        };
        self.apply(verdict, src, entry, dst, &target, rel)
    }

    fn skip(&mut self, rel: &str, reason: SkipReason) {
        self.record(Decision::Skip {
            path: rel.to_string(),
            reason,
        });
    }

    /// Clear a destination entry whose kind differs from the source's
    fn remove_conflicting<D>(&mut self, dst: &D, target: &Path, rel: &str, existing: &EntryMeta) -> Result<()>
    where
        D: Transport + ?Sized,
    {
        if !self.opts.dry_run {
            let removed = if existing.is_dir() {
                dst.remove_dir_all(target)
            } else {
                dst.remove_file(target)
            };
            removed.map_err(|e| SyncError::transfer("remove", target, e))?;
        }
        if existing.is_dir() {
            self.replaced_dirs.push(rel.to_string());
        }
        self.record(Decision::Delete {
            path: rel.to_string(),
        });
        Ok(())
    }

    fn apply<S, D>(
        &mut self,
        verdict: Verdict,
        src: &S,
        entry: &WalkEntry,
        dst: &D,
        target: &Path,
        rel: String,
    ) -> Result<bool>
    where
        S: Transport + ?Sized,
        D: Transport + ?Sized,
    {
        let reason = match verdict {
            Verdict::Skip(reason) => reason,
            Verdict::Create | Verdict::Overwrite => {
                let bytes = if self.opts.dry_run {
                    entry.meta.size
                } else {
                    copy_file(
                        src,
                        &entry.path,
                        dst,
                        target,
                        &entry.meta,
                        self.opts.keep_permissions,
                    )?
                };
                let decision = if verdict == Verdict::Create {
                    Decision::Copy { path: rel, bytes }
                } else {
                    Decision::Overwrite { path: rel, bytes }
                };
                self.record(decision);
                return Ok(true);
            }
        };
        self.record(Decision::Skip { path: rel, reason });
        Ok(false)
    }

    fn finish(mut self) -> Summary {
        self.summary.elapsed = self.started.elapsed();
        self.summary
    }
}

/// Resolve both roots; the source must be an existing directory, and on a
/// shared backend neither root may equal or contain the other. Returns the (still empty) source set and the destination root.
fn resolve_roots<S, D>(src: &S, src_root: &Path, dst: &D, dst_root: &Path) -> Result<(FileSet, PathBuf)>
where
    S: Transport + ?Sized,
    D: Transport + ?Sized,
{
    let src_root = src
        .resolve_root(src_root)
        .map_err(|e| SyncError::invalid_root(src_root, e.to_string()))?;
    let dst_root = dst
        .resolve_root(dst_root)
        .map_err(|e| SyncError::invalid_root(dst_root, e.to_string()))?;
    if src.location(&src_root) == dst.location(&dst_root) {
        return Err(SyncError::invalid_root(
            dst_root,
            "source and destination must not be identical",
        ));
    }
    // same backend: neither root may contain the other
    if src.location(&dst_root) == dst.location(&dst_root) {
        if src_root.starts_with(&dst_root) {
            return Err(SyncError::invalid_root(dst_root, "contains the source"));
        }
        if dst_root.starts_with(&src_root) {
            return Err(SyncError::invalid_root(dst_root, "lies inside the source"));
        }
    }
    let src_set = FileSet::build(src, &src_root)?;
    Ok((src_set, dst_root))
}

/// Eager snapshot of the destination, creating the root (0755) when it is
/// missing. A dry run against a missing root sees an empty tree.
fn snapshot_destination<D>(dst: &D, dst_root: &Path, opts: &ReconcileOptions) -> Result<FileSet>
where
    D: Transport + ?Sized,
{
    match dst.stat(dst_root).map_err(|e| SyncError::walk(dst_root, e))? {
        Some(meta) if meta.is_dir() => FileSet::snapshot(dst, dst_root),
        Some(_) => Err(SyncError::invalid_root(
            dst_root,
            "is a file, not a directory",
        )),
        None if opts.dry_run => Ok(FileSet::new(dst_root)),
        None => {
            dst.mkdir_all(dst_root).map_err(|e| {
                SyncError::invalid_root(dst_root, format!("cannot be created: {e}"))
            })?;
            FileSet::snapshot(dst, dst_root)
        }
    }
}

/// A file present on both sides failed the metadata check; with
/// `deep_compare` the bytes get the final word.
fn confirm_overwrite<S, D>(
    opts: &ReconcileOptions,
    src: &S,
    entry: &WalkEntry,
    dst: &D,
    target: &Path,
    dst_meta: &EntryMeta,
) -> Result<Verdict>
where
    S: Transport + ?Sized,
    D: Transport + ?Sized,
{
    if opts.deep_compare
        && dst_meta.is_file()
        && deep_equal(src, &entry.path, dst, target)
            .map_err(|e| SyncError::transfer("compare", target, e))?
    {
        return Ok(Verdict::Skip(SkipReason::SameContent));
    }
    Ok(Verdict::Overwrite)
}

/// Mirror between the local filesystem and a remote tree. `reverse` makes
/// the remote side the source.
pub fn mirror_remote<R>(
    local_root: &Path,
    remote: &R,
    remote_root: &Path,
    reverse: bool,
    opts: &ReconcileOptions,
    logger: &dyn Logger,
) -> Result<Summary>
where
    R: Transport + ?Sized,
{
    let local = LocalTransport::new();
    if reverse {
        mirror(remote, remote_root, &local, local_root, opts, logger)
    } else {
        mirror(&local, local_root, remote, remote_root, opts, logger)
    }
}

/// Two-way sync between the local filesystem and a remote tree
pub fn sync_remote<R>(
    local_root: &Path,
    remote: &R,
    remote_root: &Path,
    opts: &ReconcileOptions,
    logger: &dyn Logger,
) -> Result<Summary>
where
    R: Transport + ?Sized,
{
    sync(&LocalTransport::new(), local_root, remote, remote_root, opts, logger)
}

/// `path` lies strictly below the directory `dir`
fn is_within(path: &str, dir: &str) -> bool {
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}

/// Copy, mirror and sync on the local filesystem
pub fn copy_local(src: &Path, dst: &Path, opts: &ReconcileOptions, logger: &dyn Logger) -> Result<Summary> {
    let local = LocalTransport::new();
    copy(&local, src, &local, dst, opts, logger)
}

pub fn mirror_local(src: &Path, dst: &Path, opts: &ReconcileOptions, logger: &dyn Logger) -> Result<Summary> {
    let local = LocalTransport::new();
    mirror(&local, src, &local, dst, opts, logger)
}

pub fn sync_local(a: &Path, b: &Path, opts: &ReconcileOptions, logger: &dyn Logger) -> Result<Summary> {
    let local = LocalTransport::new();
    sync(&local, a, &local, b, opts, logger)
}
