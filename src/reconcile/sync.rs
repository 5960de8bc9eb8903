use super::{confirm_overwrite, resolve_roots, snapshot_destination, ReconcileOptions, Run, Verdict};
use crate::compare::Comparator;
use crate::error::{Result, SyncError};
use crate::fileset::FileSet;
use crate::logger::Logger;
use crate::summary::{Decision, SkipReason, Summary};
use crate::transport::{EntryMeta, Transport, WalkEntry};
use std::collections::HashSet;
use std::path::Path;

/// Two-way reconciliation. Phase one pushes A onto B, phase two walks B
/// (now including phase one's writes) and pushes back onto A whatever A is
/// missing or older on, except paths phase one just wrote. Nothing is ever
/// deleted, so `clean_destination` is ignored.
pub fn sync<A, B>(
    a: &A,
    a_root: &Path,
    b: &B,
    b_root: &Path,
    opts: &ReconcileOptions,
    logger: &dyn Logger,
) -> Result<Summary>
where
    A: Transport + ?Sized,
    B: Transport + ?Sized,
{
    let (mut a_set, b_root) = resolve_roots(a, a_root, b, b_root)?;
    let a_root = a_set.basepath().to_path_buf();
    logger.start("sync", &a.location(&a_root), &b.location(&b_root));
    let mut run = Run::new(opts, logger);
    run.replace_conflicts = false;
    let b_set = snapshot_destination(b, &b_root, opts)?;
    let cmp = Comparator::for_transports(a, b);
    let mut pushed: HashSet<String> = HashSet::new();

    run.walk(a, &a_root, |run, rel, entry| {
        a_set.insert(rel.as_str(), entry.meta.clone());
        let wrote = run.push_entry(a, b, &b_root, &rel, &entry, b_set.get(&rel), |target, existing| {
            decide(&cmp, opts, a, &entry, b, target, existing)
        })?;
        if wrote {
            pushed.insert(rel);
        }
        Ok(())
    })?;

    // a dry run never created B, so there is nothing to walk back
    let b_exists = !opts.dry_run
        || b
            .stat(&b_root)
            .map_err(|e| SyncError::walk(&b_root, e))?
            .is_some();
    if b_exists {
        pull_back(&mut run, &cmp, b, &b_root, a, &a_root, &a_set, &pushed)?;
    }

    let summary = run.finish();
    logger.done("sync", &summary);
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn pull_back<A, B>(
    run: &mut Run<'_>,
    cmp: &Comparator,
    b: &B,
    b_root: &Path,
    a: &A,
    a_root: &Path,
    a_set: &FileSet,
    pushed: &HashSet<String>,
) -> Result<()>
where
    A: Transport + ?Sized,
    B: Transport + ?Sized,
{
    let opts = run.opts;
    run.blocked_dirs.clear();
    run.walk(b, b_root, |run, rel, entry| {
        if pushed.contains(&rel) {
            run.record(Decision::Skip {
                path: rel,
                reason: SkipReason::JustCopied,
            });
            return Ok(());
        }
        run.push_entry(b, a, a_root, &rel, &entry, a_set.get(&rel), |target, existing| {
            decide(cmp, opts, b, &entry, a, target, existing)
        })?;
        Ok(())
    })
}

/// Verdict for a regular file pushed from `src` onto a file `dst` already has
fn decide<S, D>(
    cmp: &Comparator,
    opts: &ReconcileOptions,
    src: &S,
    entry: &WalkEntry,
    dst: &D,
    target: &Path,
    existing: &EntryMeta,
) -> Result<Verdict>
where
    S: Transport + ?Sized,
    D: Transport + ?Sized,
{
    if cmp.supersedes(&entry.meta, existing) {
        confirm_overwrite(opts, src, entry, dst, target, existing)
    } else {
        Ok(Verdict::Skip(SkipReason::Unchanged))
    }
}
