//! Relative-path snapshots of a directory tree

use crate::error::{Result, SyncError};
use crate::transport::{EntryMeta, Transport};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Root-relative path → metadata for one tree at one point in time.
///
/// Keys use `/` separators and never start with it; the root itself is never
/// a key. Directories and files share the map.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    basepath: PathBuf,
    paths: HashMap<String, EntryMeta>,
}

impl FileSet {
    /// Empty set, filled lazily through [`FileSet::insert`]
    pub fn new(basepath: impl Into<PathBuf>) -> Self {
        Self {
            basepath: basepath.into(),
            paths: HashMap::new(),
        }
    }

    /// Empty set for `root`, which must be an existing directory
    pub fn build<T: Transport + ?Sized>(transport: &T, root: &Path) -> Result<Self> {
        match transport.stat(root) {
            Ok(Some(meta)) if meta.is_dir() => Ok(Self::new(root)),
            Ok(Some(_)) => Err(SyncError::invalid_root(root, "is not a directory")),
            Ok(None) => Err(SyncError::invalid_root(root, "does not exist")),
            Err(e) => Err(SyncError::walk(root, e)),
        }
    }

    /// Eager variant: build and walk the whole tree
    pub fn snapshot<T: Transport + ?Sized>(transport: &T, root: &Path) -> Result<Self> {
        let mut set = Self::build(transport, root)?;
        set.populate(transport)?;
        Ok(set)
    }

    pub fn populate<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<()> {
        for entry in transport.walk(&self.basepath) {
            let entry = entry.map_err(|e| SyncError::walk(&self.basepath, e))?;
            if let Some(rel) = relative_path(&self.basepath, &entry.path) {
                self.paths.insert(rel, entry.meta);
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, relative: impl Into<String>, meta: EntryMeta) {
        self.paths.insert(relative.into(), meta);
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.paths.contains_key(relative)
    }

    pub fn get(&self, relative: &str) -> Option<&EntryMeta> {
        self.paths.get(relative)
    }

    pub fn basepath(&self) -> &Path {
        &self.basepath
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Entries in path order, parents before their children
    pub fn sorted(&self) -> Vec<(&str, &EntryMeta)> {
        let mut entries: Vec<_> = self.paths.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// `path` relative to `root` as a `/`-joined key; `None` for the root itself
/// or for paths outside of it.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rest
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Any segment starting with `.` hides the entry and its whole subtree
pub fn is_hidden(relative: &str) -> bool {
    relative.split('/').any(|segment| segment.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;
    use std::fs;

    #[test]
    fn relative_keys() {
        let root = Path::new("/data/src");
        assert_eq!(relative_path(root, Path::new("/data/src")), None);
        assert_eq!(
            relative_path(root, Path::new("/data/src/a/b.txt")),
            Some("a/b.txt".to_string())
        );
        assert_eq!(relative_path(root, Path::new("/elsewhere/x")), None);
    }

    #[test]
    fn hidden_segments() {
        assert!(is_hidden(".git"));
        assert!(is_hidden("a/.cache/b"));
        assert!(is_hidden("sub/.hidden.file"));
        assert!(!is_hidden("a/b.c"));
        assert!(!is_hidden("dir./x"));
    }

    #[test]
    fn populate_skips_root_and_keeps_dirs() -> Result<()> {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("sub/deeper")).expect("mkdir");
        fs::write(tmp.path().join("sub/f.txt"), b"x").expect("write");

        let set = FileSet::snapshot(&LocalTransport::new(), tmp.path())?;
        assert_eq!(set.len(), 3);
        assert!(set.contains("sub"));
        assert!(set.contains("sub/deeper"));
        assert!(set.get("sub/f.txt").is_some_and(|m| m.is_file() && m.size == 1));
        assert!(!set.contains(""));
        Ok(())
    }

    #[test]
    fn build_rejects_missing_and_file_roots() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = tmp.path().join("file");
        fs::write(&file, b"").expect("write");
        let t = LocalTransport::new();

        assert!(matches!(
            FileSet::build(&t, &tmp.path().join("missing")),
            Err(SyncError::InvalidRoot { .. })
        ));
        assert!(matches!(
            FileSet::build(&t, &file),
            Err(SyncError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn sorted_puts_parents_first() {
        let mut set = FileSet::new("/r");
        let meta = EntryMeta {
            size: 0,
            modified: std::time::SystemTime::UNIX_EPOCH,
            kind: crate::transport::EntryKind::Dir,
            mode: None,
        };
        for key in ["a/b", "a-b", "a", "a/b/c"] {
            set.insert(key, meta.clone());
        }
        let order: Vec<&str> = set.sorted().into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["a", "a-b", "a/b", "a/b/c"]);
    }
}
