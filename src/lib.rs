//! syncit library
//!
//! Copy, mirror and two-way sync of directory trees over pluggable
//! transports: the local filesystem or an SFTP session.

pub mod cli;
pub mod compare;
pub mod config;
pub mod copy;
pub mod error;
pub mod fileset;
pub mod logger;
pub mod progress;
pub mod reconcile;
pub mod summary;
pub mod transport;
pub mod url;

pub use error::{Result, SyncError};
pub use fileset::FileSet;
pub use reconcile::{copy_local, mirror_local, sync_local, ReconcileOptions};
pub use summary::{Decision, SkipReason, Summary};
pub use transport::{LocalTransport, SftpTransport, Transport};
