//! SSH session setup: TCP connect, host key check, agent auth, SFTP subsystem
//!
//! The reconciler never calls into this module; it only receives the
//! [`SftpTransport`] built here.

use super::SftpTransport;
use crate::error::{Result, SyncError};
use ssh2::{CheckResult, KnownHostFileKind, Session};
use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub host: String,
    pub port: u16,
    /// Defaults to `~/.ssh/known_hosts`
    pub known_hosts: Option<PathBuf>,
    pub timeout: Duration,
}

impl Credentials {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            known_hosts: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn known_hosts_path(&self) -> Result<PathBuf> {
        if let Some(p) = &self.known_hosts {
            return Ok(p.clone());
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"))
            .ok_or_else(|| SyncError::Transport("HOME is not set; cannot locate known_hosts".into()))
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Open a session and start SFTP. Any failure here is a transport error.
pub fn connect(creds: &Credentials) -> Result<SftpTransport> {
    let addr = (creds.host.as_str(), creds.port)
        .to_socket_addrs()
        .map_err(|e| SyncError::Transport(format!("cannot resolve {}: {e}", creds.host)))?
        .next()
        .ok_or_else(|| SyncError::Transport(format!("no address for {}", creds.host)))?;
    let tcp = TcpStream::connect_timeout(&addr, creds.timeout)
        .map_err(|e| SyncError::Transport(format!("cannot connect to {creds}: {e}")))?;

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(creds.timeout.as_millis()).unwrap_or(u32::MAX));
    session.handshake()?;

    verify_host_key(&session, creds)?;

    session.userauth_agent(&creds.user)?;
    if !session.authenticated() {
        return Err(SyncError::Transport(format!(
            "agent authentication failed for {creds}"
        )));
    }

    let sftp = session.sftp()?;
    let label = format!("{}@{}", creds.user, creds.host);
    Ok(SftpTransport::new(session, sftp, label))
}

fn verify_host_key(session: &Session, creds: &Credentials) -> Result<()> {
    let path = creds.known_hosts_path()?;
    let mut known_hosts = session.known_hosts()?;
    known_hosts
        .read_file(&path, KnownHostFileKind::OpenSSH)
        .map_err(|e| {
            SyncError::Transport(format!("unable to read '{}': {e}", path.display()))
        })?;

    let (key, _) = session
        .host_key()
        .ok_or_else(|| SyncError::Transport(format!("{} sent no host key", creds.host)))?;

    match known_hosts.check_port(&creds.host, creds.port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => Err(SyncError::Transport(format!(
            "no host key for {} in '{}'",
            creds.host,
            path.display()
        ))),
        CheckResult::Mismatch => Err(SyncError::Transport(format!(
            "host key for {} does not match '{}'",
            creds.host,
            path.display()
        ))),
        CheckResult::Failure => Err(SyncError::Transport(format!(
            "host key check for {} failed",
            creds.host
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_display_and_defaults() {
        let c = Credentials::new("me", "example.org");
        assert_eq!(c.port, 22);
        assert_eq!(c.to_string(), "me@example.org:22");
    }

    #[test]
    fn explicit_known_hosts_wins() -> Result<()> {
        let mut c = Credentials::new("me", "h");
        c.known_hosts = Some(PathBuf::from("/etc/ssh/kh"));
        assert_eq!(c.known_hosts_path()?, PathBuf::from("/etc/ssh/kh"));
        Ok(())
    }
}
