//! URL parsing for sftp:// remotes

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDest {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub path: PathBuf,
}

/// `sftp://[user@]host[:port]/path`. A path starting with `/~/` is taken
/// relative to the remote login directory.
pub fn parse_remote_url(path: &Path) -> Option<RemoteDest> {
    let s = path.to_string_lossy();
    let s_trim = s.trim();
    let lower = s_trim.to_ascii_lowercase();
    let scheme_end = lower.find("://")?;
    if &lower[..scheme_end] != "sftp" {
        return None;
    }
    let rest = &s_trim[scheme_end + 3..];
    let (authority, p) = rest.split_once('/').unwrap_or((rest, ""));
    let (user, hp) = match authority.rsplit_once('@') {
        Some((u, hp)) if !u.is_empty() => (Some(u.to_string()), hp),
        Some((_, hp)) => (None, hp),
        None => (None, authority),
    };
    let (host, port) = match hp.split_once(':') {
        Some((h, pr)) => (h, Some(pr.parse().ok()?)),
        None => (hp, None),
    };
    if host.is_empty() {
        return None;
    }
    let path = match p.strip_prefix('~') {
        Some(home_rel) => match home_rel.trim_start_matches('/') {
            "" => PathBuf::from("."),
            rel => PathBuf::from(rel),
        },
        None => PathBuf::from(format!("/{p}")),
    };
    Some(RemoteDest {
        user,
        host: host.to_string(),
        port,
        path,
    })
}
