//! SFTP backend over an already authenticated ssh2 session

pub mod session;

use super::{clean_path, EntryKind, EntryMeta, Transport, Walk, WalkEntry};
use ssh2::{ErrorCode, FileStat, OpenFlags, OpenType, Session, Sftp};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use session::{connect, Credentials};

const LIBSSH2_FX_NO_SUCH_FILE: i32 = 2;
const WRITE_BUFFER_SIZE: usize = 32 * 1024;
const DIR_MODE: i32 = 0o755;
const FILE_MODE: i32 = 0o644;

pub struct SftpTransport {
    _session: Session,
    sftp: Sftp,
    /// `user@host` prefix for log lines
    label: String,
}

impl SftpTransport {
    pub fn new(session: Session, sftp: Sftp, label: impl Into<String>) -> Self {
        Self {
            _session: session,
            sftp,
            label: label.into(),
        }
    }

    pub fn sftp(&self) -> &Sftp {
        &self.sftp
    }
}

fn is_not_found(e: &ssh2::Error) -> bool {
    matches!(e.code(), ErrorCode::SFTP(LIBSSH2_FX_NO_SUCH_FILE))
}

pub(crate) fn meta_from_stat(st: &FileStat) -> EntryMeta {
    let kind = if st.is_dir() {
        EntryKind::Dir
    } else if st.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };
    EntryMeta {
        size: st.size.unwrap_or(0),
        modified: UNIX_EPOCH + Duration::from_secs(st.mtime.unwrap_or(0)),
        kind,
        mode: st.perm.map(|p| p & 0o7777),
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Pre-order walk driven by `readdir`; one listing per directory.
struct SftpWalk<'a> {
    sftp: &'a Sftp,
    root: Option<PathBuf>,
    stack: Vec<WalkEntry>,
}

impl Iterator for SftpWalk<'_> {
    type Item = io::Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.root.take() {
            Some(root) => match self.sftp.stat(&root) {
                Ok(st) => WalkEntry {
                    meta: meta_from_stat(&st),
                    path: root,
                },
                Err(e) => return Some(Err(e.into())),
            },
            None => self.stack.pop()?,
        };

        if entry.meta.is_dir() {
            match self.sftp.readdir(&entry.path) {
                Ok(mut children) => {
                    // reversed so that popping yields ascending names
                    children.sort_by(|a, b| b.0.cmp(&a.0));
                    self.stack
                        .extend(children.into_iter().map(|(path, st)| WalkEntry {
                            meta: meta_from_stat(&st),
                            path,
                        }));
                }
                Err(e) => {
                    self.stack.clear();
                    return Some(Err(e.into()));
                }
            }
        }
        Some(Ok(entry))
    }
}

impl Transport for SftpTransport {
    fn location(&self, path: &Path) -> String {
        format!("{}:{}", self.label, path.display())
    }

    /// SFTP v3 carries whole seconds only
    fn timestamp_granularity(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn resolve_root(&self, path: &Path) -> io::Result<PathBuf> {
        if path.is_absolute() {
            return Ok(clean_path(path));
        }
        let home = self.sftp.realpath(Path::new("."))?;
        Ok(clean_path(&home.join(path)))
    }

    fn stat(&self, path: &Path) -> io::Result<Option<EntryMeta>> {
        match self.sftp.stat(path) {
            Ok(st) => Ok(Some(meta_from_stat(&st))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn walk<'a>(&'a self, root: &Path) -> Walk<'a> {
        Box::new(SftpWalk {
            sftp: &self.sftp,
            root: Some(root.to_path_buf()),
            stack: Vec::new(),
        })
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component.as_os_str());
            if !matches!(component, Component::Normal(_)) {
                continue;
            }
            match self.stat(&current)? {
                Some(meta) if meta.is_dir() => continue,
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("'{}' exists and is not a directory", current.display()),
                    ))
                }
                None => self.sftp.mkdir(&current, DIR_MODE)?,
            }
        }
        Ok(())
    }

    fn open_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + 'a>> {
        Ok(Box::new(self.sftp.open(path)?))
    }

    fn create_truncate<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Write + 'a>> {
        let file = self.sftp.open_mode(
            path,
            OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            FILE_MODE,
            OpenType::File,
        )?;
        Ok(Box::new(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file)))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        Ok(self.sftp.unlink(path)?)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        for (child, st) in self.sftp.readdir(path)? {
            if st.is_dir() {
                self.remove_dir_all(&child)?;
            } else {
                self.sftp.unlink(&child)?;
            }
        }
        Ok(self.sftp.rmdir(path)?)
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> io::Result<()> {
        let secs = unix_secs(modified);
        let stat = FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: None,
            atime: Some(secs),
            mtime: Some(secs),
        };
        Ok(self.sftp.setstat(path, stat)?)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()> {
        let stat = FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: Some(mode),
            atime: None,
            mtime: None,
        };
        Ok(self.sftp.setstat(path, stat)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(perm: u32, size: u64, mtime: u64) -> FileStat {
        FileStat {
            size: Some(size),
            uid: None,
            gid: None,
            perm: Some(perm),
            atime: None,
            mtime: Some(mtime),
        }
    }

    #[test]
    fn stat_kinds_map_from_mode_bits() {
        let file = meta_from_stat(&stat(0o100644, 12, 1_138_752_000));
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, 12);
        assert_eq!(file.mode, Some(0o644));
        assert_eq!(
            file.modified,
            UNIX_EPOCH + Duration::from_secs(1_138_752_000)
        );

        assert_eq!(meta_from_stat(&stat(0o040755, 0, 0)).kind, EntryKind::Dir);
        assert_eq!(meta_from_stat(&stat(0o120777, 0, 0)).kind, EntryKind::Other);
    }

    #[test]
    fn missing_times_fall_back_to_epoch() {
        let st = FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: None,
            atime: None,
            mtime: None,
        };
        let meta = meta_from_stat(&st);
        assert_eq!(meta.modified, UNIX_EPOCH);
        assert_eq!(meta.size, 0);
        assert_eq!(meta.mode, None);
    }
}
