use super::{
    confirm_overwrite, is_within, resolve_roots, snapshot_destination, ReconcileOptions, Run, Verdict,
};
use crate::compare::Comparator;
use crate::error::{Result, SyncError};
use crate::fileset::{is_hidden, FileSet};
use crate::logger::Logger;
use crate::summary::{Decision, SkipReason, Summary};
use crate::transport::Transport;
use std::io;
use std::path::Path;

/// One-way reconciliation: the destination converges toward the source.
/// With `clean_destination` entries only the destination has are pruned.
pub fn mirror<S, D>(
    src: &S,
    src_root: &Path,
    dst: &D,
    dst_root: &Path,
    opts: &ReconcileOptions,
    logger: &dyn Logger,
) -> Result<Summary>
where
    S: Transport + ?Sized,
    D: Transport + ?Sized,
{
    let (mut src_set, dst_root) = resolve_roots(src, src_root, dst, dst_root)?;
    let src_root = src_set.basepath().to_path_buf();
    logger.start("mirror", &src.location(&src_root), &dst.location(&dst_root));
    let mut run = Run::new(opts, logger);
    let dst_set = snapshot_destination(dst, &dst_root, opts)?;
    let cmp = Comparator::for_transports(src, dst);

    run.walk(src, &src_root, |run, rel, entry| {
        src_set.insert(rel.as_str(), entry.meta.clone());
        run.push_entry(src, dst, &dst_root, &rel, &entry, dst_set.get(&rel), |target, existing| {
            if opts.force_write {
                return Ok(Verdict::Overwrite);
            }
            if cmp.unequal(&entry.meta, existing) {
                confirm_overwrite(opts, src, &entry, dst, target, existing)
            } else {
                Ok(Verdict::Skip(SkipReason::Unchanged))
            }
        })?;
        Ok(())
    })?;

    if opts.clean_destination {
        prune(&mut run, dst, &dst_root, &dst_set, &src_set);
    }

    let summary = run.finish();
    logger.done("mirror", &summary);
    Ok(summary)
}

/// Remove every snapshot entry the source does not have. Best effort:
/// failures become `DeleteFailed` decisions and the loop moves on.
fn prune<D>(run: &mut Run<'_>, dst: &D, dst_root: &Path, dst_set: &FileSet, src_set: &FileSet)
where
    D: Transport + ?Sized,
{
    // directories replaced by files during the walk are already gone
    let mut removed_dirs = run.replaced_dirs.clone();

    // sorted, so a directory comes before anything inside it
    for (rel, meta) in dst_set.sorted() {
        if src_set.contains(rel) || (run.opts.skip_hidden && is_hidden(rel)) {
            continue;
        }
        if removed_dirs.iter().any(|dir| is_within(rel, dir)) {
            continue;
        }

        let target = dst_root.join(rel);
        let result = if run.opts.dry_run {
            Ok(())
        } else if meta.is_dir() {
            dst.remove_dir_all(&target)
        } else {
            dst.remove_file(&target)
        };

        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                let error = SyncError::Prune {
                    path: target,
                    source: e,
                };
                run.record(Decision::DeleteFailed {
                    path: rel.to_string(),
                    error: error.to_string(),
                });
                continue;
            }
        }
        if meta.is_dir() {
            removed_dirs.push(rel.to_string());
        }
        run.record(Decision::Delete {
            path: rel.to_string(),
        });
    }
}
