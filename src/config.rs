//! Optional TOML defaults for the command line

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
    pub skip_hidden: bool,
    pub deep_compare: bool,
    pub keep_permissions: bool,

    // SFTP session
    pub port: Option<u16>,
    pub user: Option<String>,
    pub known_hosts: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,

    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            skip_hidden: false,
            deep_compare: false,
            keep_permissions: true,
            port: None,
            user: None,
            known_hosts: None,
            connect_timeout_secs: None,
            log_file: None,
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join("syncit");
    }
    PathBuf::from(".syncit")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("syncit.toml")
}

/// Load `explicit`, which must exist, or the default file, which may not
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => read(path),
        None => {
            let path = default_config_path();
            if path.is_file() {
                read(&path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn read(path: &Path) -> Result<Config> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: Config =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(config)
}
