//! Console reporting
//!
//! File operations scroll above a spinner that stays on the bottom line.
//! Copies, overwrites and deletions are always printed; directory creation
//! and skips only in verbose mode, where the spinner is dropped entirely.

use crate::logger::Logger;
use crate::summary::{byte_count, Decision, SkipReason, Summary};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ConsoleLogger {
    spinner: Option<ProgressBar>,
    verbose: bool,
    dry_run: bool,
}

impl ConsoleLogger {
    pub fn new(verbose: bool, dry_run: bool) -> Self {
        let spinner = (!verbose).then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        });
        Self {
            spinner,
            verbose,
            dry_run,
        }
    }

    fn print(&self, line: String) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    /// Format a decision for the console, `None` when it stays quiet
    pub fn render(&self, decision: &Decision) -> Option<String> {
        let line = match decision {
            Decision::Copy { path, bytes } => format!("copy file '{path}' ({})", byte_count(*bytes)),
            Decision::Overwrite { path, bytes } => {
                format!("overwrite file '{path}' ({})", byte_count(*bytes))
            }
            Decision::Delete { path } => format!("delete '{path}' (not in source)"),
            Decision::ClearRoot { root } => format!("deleting '{root}' for a clean copy"),
            Decision::DeleteFailed { path, error } => format!("deletion of '{path}' failed: {error}"),
            Decision::Skip {
                path,
                reason: reason @ SkipReason::KindConflict,
            } => format!("skip '{path}' ({})", reason.as_str()),
            Decision::CreateDir { path } if self.verbose => format!("create or skip dir '{path}'"),
            Decision::Skip { path, reason } if self.verbose => {
                format!("skip '{path}' ({})", reason.as_str())
            }
            _ => return None,
        };
        Some(line)
    }
}

impl Logger for ConsoleLogger {
    fn start(&self, op: &str, src: &str, dst: &str) {
        if self.dry_run {
            self.print(format!("~~~ {} (dry run) ~~~", op.to_uppercase()));
        } else {
            self.print(format!("~~~ {} ~~~", op.to_uppercase()));
        }
        self.print(format!("'{src}' --> '{dst}'\n"));
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format!("{op}..."));
        }
    }

    fn decision(&self, decision: &Decision) {
        if let Some(line) = self.render(decision) {
            self.print(line);
        }
        if let Some(spinner) = &self.spinner {
            spinner.set_message(decision.path().to_string());
        }
    }

    fn done(&self, op: &str, summary: &Summary) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
        println!("\n~~~ {} done ~~~\n{summary}", op.to_uppercase());
        if summary.transferred_bytes > 0 {
            println!(
                "transferred {} ({}/s)",
                byte_count(summary.transferred_bytes),
                byte_count(summary.throughput())
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_mode_hides_skips_and_dirs() {
        let console = ConsoleLogger {
            spinner: None,
            verbose: false,
            dry_run: false,
        };
        assert_eq!(
            console.render(&Decision::Copy {
                path: "a.txt".into(),
                bytes: 2048
            }),
            Some("copy file 'a.txt' (2.0 kB)".to_string())
        );
        assert_eq!(
            console.render(&Decision::Skip {
                path: "b".into(),
                reason: SkipReason::Unchanged
            }),
            None
        );
        assert_eq!(console.render(&Decision::CreateDir { path: "d".into() }), None);
        assert_eq!(
            console.render(&Decision::Skip {
                path: "x".into(),
                reason: SkipReason::KindConflict
            }),
            Some("skip 'x' (file/directory conflict)".to_string())
        );
    }

    #[test]
    fn verbose_mode_shows_everything() {
        let console = ConsoleLogger {
            spinner: None,
            verbose: true,
            dry_run: false,
        };
        assert_eq!(
            console.render(&Decision::Skip {
                path: "b".into(),
                reason: SkipReason::NonRegular
            }),
            Some("skip 'b' (non-regular)".to_string())
        );
    }
}
