#![allow(dead_code)]

use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use syncit::logger::Logger;
use syncit::{Decision, SkipReason};
use walkdir::WalkDir;

pub const FEB_2006: i64 = 1_138_752_000;
pub const JAN_2006: i64 = 1_136_073_600;

/// Keeps every decision for later inspection
#[derive(Default)]
pub struct Recorder {
    decisions: Mutex<Vec<Decision>>,
}

impl Recorder {
    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions.lock().expect("lock").clone()
    }

    pub fn skipped(&self, reason: SkipReason) -> Vec<String> {
        self.decisions()
            .into_iter()
            .filter_map(|d| match d {
                Decision::Skip { path, reason: r } if r == reason => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn changes(&self) -> Vec<Decision> {
        self.decisions().into_iter().filter(Decision::is_change).collect()
    }
}

impl Logger for Recorder {
    fn decision(&self, decision: &Decision) {
        self.decisions.lock().expect("lock").push(decision.clone());
    }
}

/// Write `content` at `root/rel` with the given modification time
pub fn put(root: &Path, rel: &str, content: &str, mtime: i64) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, content).expect("write file");
    filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).expect("set mtime");
}

pub fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).expect("read file")
}

pub fn mtime(root: &Path, rel: &str) -> i64 {
    let meta = fs::metadata(root.join(rel)).expect("metadata");
    FileTime::from_last_modification_time(&meta).unix_seconds()
}

/// Relative path → (content, mtime) for files, `None` for directories
pub fn tree(root: &Path) -> BTreeMap<String, Option<(Vec<u8>, i64)>> {
    let mut out = BTreeMap::new();
    if !root.exists() {
        return out;
    }
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.expect("walk");
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("under root")
            .to_string_lossy()
            .replace('\\', "/");
        let value = if entry.file_type().is_file() {
            let meta = entry.metadata().expect("metadata");
            Some((
                fs::read(entry.path()).expect("read"),
                FileTime::from_last_modification_time(&meta).unix_seconds(),
            ))
        } else {
            None
        };
        out.insert(rel, value);
    }
    out
}
