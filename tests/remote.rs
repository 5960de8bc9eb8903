//! Remote entry points driven through a stand-in transport that behaves
//! like SFTP v3: whole-second modification times.

mod common;

use anyhow::Result;
use common::{put, read, Recorder, FEB_2006, JAN_2006};
use filetime::FileTime;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use syncit::logger::NoopLogger;
use syncit::reconcile::{mirror_remote, sync_remote};
use syncit::transport::{EntryMeta, Walk};
use syncit::{LocalTransport, ReconcileOptions, Transport};

struct SecondsOnly {
    inner: LocalTransport,
}

fn whole_seconds(t: SystemTime) -> SystemTime {
    let secs = t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn coarse(mut meta: EntryMeta) -> EntryMeta {
    meta.modified = whole_seconds(meta.modified);
    meta
}

impl Transport for SecondsOnly {
    fn location(&self, path: &Path) -> String {
        format!("remote:{}", path.display())
    }

    fn timestamp_granularity(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn resolve_root(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.resolve_root(path)
    }

    fn stat(&self, path: &Path) -> io::Result<Option<EntryMeta>> {
        Ok(self.inner.stat(path)?.map(coarse))
    }

    fn walk<'a>(&'a self, root: &Path) -> Walk<'a> {
        Box::new(self.inner.walk(root).map(|entry| {
            entry.map(|mut e| {
                e.meta = coarse(e.meta);
                e
            })
        }))
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.mkdir_all(path)
    }

    fn open_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + 'a>> {
        self.inner.open_read(path)
    }

    fn create_truncate<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Write + 'a>> {
        self.inner.create_truncate(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_dir_all(path)
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> io::Result<()> {
        self.inner.set_modified(path, whole_seconds(modified))
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.inner.set_permissions(path, mode)
    }
}

fn remote() -> SecondsOnly {
    SecondsOnly {
        inner: LocalTransport::new(),
    }
}

fn clean() -> ReconcileOptions {
    ReconcileOptions {
        clean_destination: true,
        ..ReconcileOptions::default()
    }
}

#[test]
fn push_to_a_coarse_remote_is_idempotent() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (local, far) = (tmp.path().join("local"), tmp.path().join("remote"));
    put(&local, "photo.jpg", "pixels", FEB_2006);
    // sub-second part the remote cannot store
    filetime::set_file_mtime(
        local.join("photo.jpg"),
        FileTime::from_unix_time(FEB_2006, 750_000_000),
    )?;

    let first = mirror_remote(&local, &remote(), &far, false, &clean(), &NoopLogger)?;
    assert_eq!(first.copied, 1);
    assert_eq!(read(&far, "photo.jpg"), "pixels");

    let second = mirror_remote(&local, &remote(), &far, false, &clean(), &NoopLogger)?;
    assert_eq!(second.changes(), 0);
    Ok(())
}

#[test]
fn reverse_pulls_and_prunes_locally() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (local, far) = (tmp.path().join("local"), tmp.path().join("remote"));
    put(&far, "report.txt", "remote copy", FEB_2006);
    put(&local, "report.txt", "local copy", JAN_2006);
    put(&local, "scratch.txt", "only here", JAN_2006);

    let rec = Recorder::default();
    let summary = mirror_remote(&local, &remote(), &far, true, &clean(), &rec)?;

    assert_eq!(read(&local, "report.txt"), "remote copy");
    assert!(!local.join("scratch.txt").exists());
    assert_eq!(read(&far, "report.txt"), "remote copy");
    assert_eq!((summary.overwritten, summary.deleted), (1, 1));
    Ok(())
}

#[test]
fn remote_sync_exchanges_both_ways() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (local, far) = (tmp.path().join("local"), tmp.path().join("remote"));
    put(&local, "up.txt", "up", JAN_2006);
    put(&far, "down.txt", "down", JAN_2006);

    let summary = sync_remote(&local, &remote(), &far, &ReconcileOptions::default(), &NoopLogger)?;
    assert_eq!(read(&far, "up.txt"), "up");
    assert_eq!(read(&local, "down.txt"), "down");
    assert_eq!(summary.copied, 2);

    let again = sync_remote(&local, &remote(), &far, &ReconcileOptions::default(), &NoopLogger)?;
    assert_eq!(again.changes(), 0);
    Ok(())
}
