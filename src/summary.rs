//! Per-entry decisions and the run summary built from them

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    NonRegular,
    /// Comparator found nothing to do
    Unchanged,
    /// Metadata differed but the bytes are identical
    SameContent,
    /// Just pushed the other way during sync
    JustCopied,
    /// File on one side, directory on the other; sync leaves both alone
    KindConflict,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Hidden => "hidden",
            SkipReason::NonRegular => "non-regular",
            SkipReason::Unchanged => "unchanged",
            SkipReason::SameContent => "same content",
            SkipReason::JustCopied => "just copied",
            SkipReason::KindConflict => "file/directory conflict",
        }
    }
}

/// What the reconciler did (or, in dry-run, would do) with one entry.
/// Paths are root-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    CreateDir { path: String },
    Copy { path: String, bytes: u64 },
    Overwrite { path: String, bytes: u64 },
    Skip { path: String, reason: SkipReason },
    /// Wholesale removal of a destination root before a clean copy
    ClearRoot { root: String },
    Delete { path: String },
    DeleteFailed { path: String, error: String },
}

impl Decision {
    pub fn path(&self) -> &str {
        match self {
            Decision::CreateDir { path }
            | Decision::Copy { path, .. }
            | Decision::Overwrite { path, .. }
            | Decision::Skip { path, .. }
            | Decision::Delete { path }
            | Decision::DeleteFailed { path, .. } => path,
            Decision::ClearRoot { root } => root,
        }
    }

    /// Anything that changes the destination
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Decision::Copy { .. }
                | Decision::Overwrite { .. }
                | Decision::Delete { .. }
                | Decision::ClearRoot { .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Entries visited by the walks, hidden ones excluded
    pub items: u64,
    /// Size of the regular files among them
    pub bytes: u64,
    pub elapsed: Duration,
    pub dirs: u64,
    pub copied: u64,
    pub overwritten: u64,
    pub transferred_bytes: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub prune_failures: u64,
}

impl Summary {
    pub fn record(&mut self, decision: &Decision) {
        match decision {
            Decision::CreateDir { .. } => self.dirs += 1,
            Decision::Copy { bytes, .. } => {
                self.copied += 1;
                self.transferred_bytes += bytes;
            }
            Decision::Overwrite { bytes, .. } => {
                self.overwritten += 1;
                self.transferred_bytes += bytes;
            }
            Decision::Skip { .. } => self.skipped += 1,
            Decision::ClearRoot { .. } | Decision::Delete { .. } => self.deleted += 1,
            Decision::DeleteFailed { .. } => self.prune_failures += 1,
        }
    }

    /// Copies, overwrites and deletions
    pub fn changes(&self) -> u64 {
        self.copied + self.overwritten + self.deleted
    }

    pub fn throughput(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.transferred_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items ({}) in {:.2?}; {} copied, {} overwritten, {} deleted, {} skipped",
            self.items,
            byte_count(self.bytes),
            self.elapsed,
            self.copied,
            self.overwritten,
            self.deleted,
            self.skipped
        )?;
        if self.prune_failures > 0 {
            write!(f, ", {} failed deletions", self.prune_failures)?;
        }
        Ok(())
    }
}

/// 1024-based human readable size: `512 B`, `1.5 kB`, `3.0 MB`, ...
pub fn byte_count(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = ['k', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}
