//! syncit - mirror or two-way sync of directory trees, locally or over SFTP

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use syncit::cli::{Cli, Command, CommonOpts, RemoteArgs};
use syncit::config::{self, Config};
use syncit::logger::{MultiLogger, TextLogger};
use syncit::progress::ConsoleLogger;
use syncit::reconcile::{self, ReconcileOptions};
use syncit::transport::sftp::session;
use syncit::Summary;

fn main() {
    // Set up Ctrl-C handler
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // 128 + SIGINT
        std::process::exit(130);
    }) {
        eprintln!("warning: cannot install Ctrl-C handler: {e}");
    }

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    let log_file = cli.log_file.clone().or_else(|| config.log_file.clone());

    match cli.command {
        Command::Copy(args) => {
            let opts = args.common.reconcile_options(&config, true);
            let logger = build_logger(&args.common, &config, &opts, log_file.as_deref())?;
            reconcile::copy_local(&args.source, &args.destination, &opts, &logger)
                .context("copy failed")?;
        }
        Command::Mirror(args) => {
            let opts = args.common.reconcile_options(&config, true);
            let logger = build_logger(&args.common, &config, &opts, log_file.as_deref())?;
            reconcile::mirror_local(&args.source, &args.destination, &opts, &logger)
                .context("mirror failed")?;
        }
        Command::Sync(args) => {
            let opts = args.common.reconcile_options(&config, false);
            let logger = build_logger(&args.common, &config, &opts, log_file.as_deref())?;
            reconcile::sync_local(&args.source, &args.destination, &opts, &logger)
                .context("sync failed")?;
        }
        Command::SftpMirror(args) => {
            let opts = args.remote.common.reconcile_options(&config, true);
            let logger = build_logger(&args.remote.common, &config, &opts, log_file.as_deref())?;
            remote(&args.remote, &config, |remote, remote_root| {
                reconcile::mirror_remote(&args.remote.local, remote, remote_root, args.reverse, &opts, &logger)
            })
            .context("sftp mirror failed")?;
        }
        Command::SftpSync(args) => {
            let opts = args.common.reconcile_options(&config, false);
            let logger = build_logger(&args.common, &config, &opts, log_file.as_deref())?;
            remote(&args, &config, |remote, remote_root| {
                reconcile::sync_remote(&args.local, remote, remote_root, &opts, &logger)
            })
            .context("sftp sync failed")?;
        }
    }
    Ok(())
}

/// Connect, then hand the session to `op`
fn remote<F>(args: &RemoteArgs, config: &Config, op: F) -> Result<Summary>
where
    F: FnOnce(&syncit::SftpTransport, &Path) -> syncit::Result<Summary>,
{
    let (creds, remote_root) = args.credentials(config)?;
    let transport = session::connect(&creds).with_context(|| format!("connect to {creds}"))?;
    Ok(op(&transport, &remote_root)?)
}

fn build_logger(
    common: &CommonOpts,
    config: &Config,
    opts: &ReconcileOptions,
    log_file: Option<&Path>,
) -> Result<MultiLogger> {
    let mut logger = MultiLogger::new();
    logger.push(Box::new(ConsoleLogger::new(common.verbose(config), opts.dry_run)));
    if let Some(path) = log_file {
        let text = TextLogger::new(path).with_context(|| format!("open log file {}", path.display()))?;
        logger.push(Box::new(text));
    }
    Ok(logger)
}
