use crate::summary::{Decision, Summary};
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Sink for the decision stream of a run. Every method defaults to a no-op.
pub trait Logger: Send + Sync {
    /// A walk from `src` to `dst` begins
    fn start(&self, _op: &str, _src: &str, _dst: &str) {}
    fn decision(&self, _decision: &Decision) {}
    fn done(&self, _op: &str, _summary: &Summary) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

/// Appends `[timestamp] EVENT key=value` lines to a file
pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    /// Open `path` for appending, creating its directory first
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Write failures are dropped
    fn event(&self, event: &str, fields: std::fmt::Arguments<'_>) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "[{}] {event} {fields}", Utc::now().to_rfc3339());
        }
    }
}

impl Logger for TextLogger {
    fn start(&self, op: &str, src: &str, dst: &str) {
        self.event("START", format_args!("op={op} src={src} dst={dst}"));
    }

    fn decision(&self, decision: &Decision) {
        match decision {
            Decision::CreateDir { path } => self.event("MKDIR", format_args!("path={path}")),
            Decision::Copy { path, bytes } => {
                self.event("COPY", format_args!("path={path} bytes={bytes}"))
            }
            Decision::Overwrite { path, bytes } => {
                self.event("OVERWRITE", format_args!("path={path} bytes={bytes}"))
            }
            Decision::Skip { path, reason } => {
                self.event("SKIP", format_args!("path={path} reason={}", reason.as_str()))
            }
            Decision::ClearRoot { root } => self.event("CLEAR", format_args!("root={root}")),
            Decision::Delete { path } => self.event("DELETE", format_args!("path={path}")),
            Decision::DeleteFailed { path, error } => {
                self.event("ERROR", format_args!("ctx=prune path={path} msg={error}"))
            }
        }
    }

    fn done(&self, op: &str, summary: &Summary) {
        self.event(
            "DONE",
            format_args!(
                "op={op} items={} bytes={} copied={} overwritten={} deleted={} seconds={:.3}",
                summary.items,
                summary.bytes,
                summary.copied,
                summary.overwritten,
                summary.deleted,
                summary.elapsed.as_secs_f64()
            ),
        );
    }
}

/// Forwards every event to each sink in order
#[derive(Default)]
pub struct MultiLogger {
    sinks: Vec<Box<dyn Logger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn Logger>) {
        self.sinks.push(sink);
    }
}

impl Logger for MultiLogger {
    fn start(&self, op: &str, src: &str, dst: &str) {
        for sink in &self.sinks {
            sink.start(op, src, dst);
        }
    }

    fn decision(&self, decision: &Decision) {
        for sink in &self.sinks {
            sink.decision(decision);
        }
    }

    fn done(&self, op: &str, summary: &Summary) {
        for sink in &self.sinks {
            sink.done(op, summary);
        }
    }
}
