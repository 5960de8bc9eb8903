use super::{resolve_roots, snapshot_destination, ReconcileOptions, Run, Verdict};
use crate::error::{Result, SyncError};
use crate::fileset::FileSet;
use crate::logger::Logger;
use crate::summary::{Decision, Summary};
use crate::transport::Transport;
use std::path::Path;

/// Write every source file onto the destination without comparing.
/// With `clean_destination` the destination root is removed wholesale first.
pub fn copy<S, D>(
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
    let (src_set, dst_root) = resolve_roots(src, src_root, dst, dst_root)?;
    let src_root = src_set.basepath().to_path_buf();

    logger.start("copy", &src.location(&src_root), &dst.location(&dst_root));
    let mut run = Run::new(opts, logger);

    let cleared = opts.clean_destination && clear_root(&mut run, dst, &dst_root)?;
    let dst_set = if cleared && opts.dry_run {
        FileSet::new(dst_root.clone())
    } else {
        snapshot_destination(dst, &dst_root, opts)?
    };

    run.walk(src, &src_root, |run, rel, entry| {
        run.push_entry(src, dst, &dst_root, &rel, &entry, dst_set.get(&rel), |_, _| {
            Ok(Verdict::Overwrite)
        })?;
        Ok(())
    })?;

    let summary = run.finish();
    logger.done("copy", &summary);
    Ok(summary)
}

/// Remove an existing destination root. Returns whether there was one.
fn clear_root<D>(run: &mut Run<'_>, dst: &D, dst_root: &Path) -> Result<bool>
where
    D: Transport + ?Sized,
{
    let Some(meta) = dst.stat(dst_root).map_err(|e| SyncError::walk(dst_root, e))? else {
        return Ok(false);
    };
    if !meta.is_dir() {
        return Err(SyncError::invalid_root(dst_root, "is a file, not a directory"));
    }
    if !run.opts.dry_run {
        dst.remove_dir_all(dst_root).map_err(|e| SyncError::Prune {
            path: dst_root.to_path_buf(),
            source: e,
        })?;
    }
    run.record(Decision::ClearRoot {
        root: dst.location(dst_root),
    });
    Ok(true)
}
