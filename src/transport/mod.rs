//! Backends a reconciliation can walk and mutate
//!
//! The reconciler only ever talks to a tree through [`Transport`]; the local
//! filesystem and an SFTP session each implement it once.

pub mod local;
pub mod sftp;

use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

pub use local::LocalTransport;
pub use sftp::SftpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    /// Symlinks, devices, sockets, fifos
    Other,
}

/// Metadata of one tree entry as seen through a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub size: u64,
    pub modified: SystemTime,
    pub kind: EntryKind,
    /// Permission bits, when the backend reports them
    pub mode: Option<u32>,
}

impl EntryMeta {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub meta: EntryMeta,
}

/// Depth-first, root-first sequence of entries. Finite and not restartable.
pub type Walk<'a> = Box<dyn Iterator<Item = io::Result<WalkEntry>> + 'a>;

pub trait Transport {
    /// Human readable location of `path`, also used to tell two roots apart
    fn location(&self, path: &Path) -> String;

    /// Finest modification-time resolution this backend round-trips
    fn timestamp_granularity(&self) -> Duration {
        Duration::from_micros(1)
    }

    /// Turn a user supplied root into the absolute path the walk will use
    fn resolve_root(&self, path: &Path) -> io::Result<PathBuf>;

    /// `Ok(None)` when nothing exists at `path`
    fn stat(&self, path: &Path) -> io::Result<Option<EntryMeta>>;

    fn walk<'a>(&'a self, root: &Path) -> Walk<'a>;

    /// Create `path` and missing parents (mode 0755); an existing directory is fine
    fn mkdir_all(&self, path: &Path) -> io::Result<()>;

    fn open_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + 'a>>;

    fn create_truncate<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Write + 'a>>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    fn set_modified(&self, path: &Path, modified: SystemTime) -> io::Result<()>;

    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// Lexically drop `.` and resolve `..` without touching the filesystem
pub(crate) fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
