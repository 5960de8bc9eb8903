//! Local filesystem backend

use super::{clean_path, EntryKind, EntryMeta, Transport, Walk, WalkEntry};
use filetime::FileTime;
use std::fs::{self, File, Metadata};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const IO_BUFFER_SIZE: usize = 64 * 1024;
const DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn meta_from_fs(md: &Metadata) -> EntryMeta {
    let file_type = md.file_type();
    let kind = if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };
    EntryMeta {
        size: md.len(),
        modified: md.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        kind,
        mode: permission_bits(md),
    }
}

#[cfg(unix)]
fn permission_bits(md: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(md.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_bits(_md: &Metadata) -> Option<u32> {
    None
}

/// Expand a leading `~` to `$HOME`
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

impl Transport for LocalTransport {
    fn location(&self, path: &Path) -> String {
        path.display().to_string()
    }

    fn resolve_root(&self, path: &Path) -> io::Result<PathBuf> {
        let expanded = expand_home(path);
        Ok(clean_path(&std::path::absolute(expanded)?))
    }

    fn stat(&self, path: &Path) -> io::Result<Option<EntryMeta>> {
        match fs::metadata(path) {
            Ok(md) => Ok(Some(meta_from_fs(&md))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn walk<'a>(&'a self, root: &Path) -> Walk<'a> {
        use walkdir::WalkDir;

        let entries = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| {
                let entry = entry.map_err(io::Error::from)?;
                let md = entry.metadata().map_err(io::Error::from)?;
                Ok(WalkEntry {
                    meta: meta_from_fs(&md),
                    path: entry.into_path(),
                })
            });
        Box::new(entries)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        match builder.create(path) {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            other => other,
        }
    }

    fn open_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + 'a>> {
        Ok(Box::new(BufReader::with_capacity(
            IO_BUFFER_SIZE,
            File::open(path)?,
        )))
    }

    fn create_truncate<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Write + 'a>> {
        Ok(Box::new(BufWriter::with_capacity(
            IO_BUFFER_SIZE,
            File::create(path)?,
        )))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> io::Result<()> {
        let ft = FileTime::from_system_time(modified);
        filetime::set_file_times(path, ft, ft)
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_permissions(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_is_root_first_and_sorted() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        fs::create_dir_all(tmp.path().join("b/inner"))?;
        fs::write(tmp.path().join("a.txt"), b"a")?;
        fs::write(tmp.path().join("b/inner/c.txt"), b"c")?;

        let t = LocalTransport::new();
        let paths: Vec<PathBuf> = t
            .walk(tmp.path())
            .map(|e| e.map(|e| e.path))
            .collect::<io::Result<_>>()?;
        assert_eq!(
            paths,
            vec![
                tmp.path().to_path_buf(),
                tmp.path().join("a.txt"),
                tmp.path().join("b"),
                tmp.path().join("b/inner"),
                tmp.path().join("b/inner/c.txt"),
            ]
        );
        Ok(())
    }

    #[test]
    fn stat_missing_is_none() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let t = LocalTransport::new();
        assert!(t.stat(&tmp.path().join("nope"))?.is_none());
        assert!(t.stat(tmp.path())?.is_some_and(|m| m.is_dir()));
        Ok(())
    }

    #[test]
    fn mkdir_all_tolerates_existing_dir_but_not_file() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let t = LocalTransport::new();
        let dir = tmp.path().join("x/y");
        t.mkdir_all(&dir)?;
        t.mkdir_all(&dir)?;
        fs::write(tmp.path().join("f"), b"")?;
        assert!(t.mkdir_all(&tmp.path().join("f")).is_err());
        Ok(())
    }

    #[test]
    fn set_modified_round_trips() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let file = tmp.path().join("f");
        fs::write(&file, b"x")?;
        let t = LocalTransport::new();
        let when = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_136_073_600);
        t.set_modified(&file, when)?;
        assert_eq!(t.stat(&file)?.map(|m| m.modified), Some(when));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn walk_reports_symlinks_as_other() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        fs::write(tmp.path().join("target"), b"x")?;
        std::os::unix::fs::symlink(tmp.path().join("target"), tmp.path().join("link"))?;
        let t = LocalTransport::new();
        let link = t
            .walk(tmp.path())
            .filter_map(Result::ok)
            .find(|e| e.path.ends_with("link"))
            .map(|e| e.meta.kind);
        assert_eq!(link, Some(EntryKind::Other));
        Ok(())
    }

    #[test]
    fn expand_home_only_touches_tilde() {
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_home(Path::new("~/x")), PathBuf::from(home).join("x"));
        }
    }
}
