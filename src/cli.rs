//! Command line surface: subcommands, shared flags and their merge with the
//! config file

use crate::config::Config;
use crate::reconcile::ReconcileOptions;
use crate::transport::sftp::session::{Credentials, DEFAULT_PORT};
use crate::url::parse_remote_url;
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "syncit - mirror or two-way sync directory trees, locally or over SFTP"
)]
pub struct Cli {
    /// Config file (default: ~/.config/syncit/syncit.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Append a line per decision to this file
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write every source file onto the destination, no comparison
    #[command(visible_alias = "cp")]
    Copy(LocalArgs),
    /// Make the destination a copy of the source
    #[command(visible_alias = "mi")]
    Mirror(LocalArgs),
    /// Exchange missing and newer files both ways, never delete
    #[command(visible_alias = "sy")]
    Sync(LocalArgs),
    /// Mirror a local directory onto an sftp:// remote (or back with -r)
    #[command(name = "sftp-mirror", visible_alias = "smir")]
    SftpMirror(RemoteMirrorArgs),
    /// Two-way sync between a local directory and an sftp:// remote
    #[command(name = "sftp-sync", visible_alias = "ssy")]
    SftpSync(RemoteArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct CommonOpts {
    /// Decide and report, change nothing
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Leave destination-only entries alone
    #[arg(short = 'x', long)]
    pub dirty: bool,

    /// Ignore files and directories starting with '.'
    #[arg(short = 's', long)]
    pub skip_hidden: bool,

    /// Print every decision, including skips
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Compare contents before overwriting
    #[arg(short = 'd', long)]
    pub deep_compare: bool,

    /// Mirror: overwrite files present on both sides unconditionally
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Do not copy permission bits
    #[arg(long)]
    pub no_perms: bool,
}

impl CommonOpts {
    /// Flags win over the config file; `clean_by_default` is the
    /// operation's stance on pruning before `--dirty`
    pub fn reconcile_options(&self, config: &Config, clean_by_default: bool) -> ReconcileOptions {
        ReconcileOptions {
            dry_run: self.dry_run || config.dry_run,
            clean_destination: clean_by_default && !self.dirty,
            skip_hidden: self.skip_hidden || config.skip_hidden,
            deep_compare: self.deep_compare || config.deep_compare,
            force_write: self.force,
            keep_permissions: config.keep_permissions && !self.no_perms,
        }
    }

    pub fn verbose(&self, config: &Config) -> bool {
        self.verbose || config.verbose
    }
}

#[derive(Args, Debug, Clone)]
pub struct LocalArgs {
    pub source: PathBuf,
    pub destination: PathBuf,
    #[command(flatten)]
    pub common: CommonOpts,
}

#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    pub local: PathBuf,
    /// sftp://[user@]host[:port]/path
    pub remote: PathBuf,
    #[command(flatten)]
    pub common: CommonOpts,
}

#[derive(Args, Debug, Clone)]
pub struct RemoteMirrorArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Pull: the remote is the source
    #[arg(short = 'r', long)]
    pub reverse: bool,
}

impl RemoteArgs {
    /// Session credentials and remote root. URL parts win over the config,
    /// which wins over `$USER` and port 22.
    pub fn credentials(&self, config: &Config) -> Result<(Credentials, PathBuf)> {
        let dest = parse_remote_url(&self.remote)
            .ok_or_else(|| anyhow!("not an sftp:// URL: {}", self.remote.display()))?;
        let user = dest
            .user
            .or_else(|| config.user.clone())
            .or_else(|| std::env::var("USER").ok())
            .ok_or_else(|| anyhow!("no user in URL or config and USER is not set"))?;

        let mut creds = Credentials::new(user, dest.host);
        creds.port = dest.port.or(config.port).unwrap_or(DEFAULT_PORT);
        creds.known_hosts = config.known_hosts.clone();
        if let Some(secs) = config.connect_timeout_secs {
            creds.timeout = Duration::from_secs(secs);
        }
        Ok((creds, dest.path))
    }
}
