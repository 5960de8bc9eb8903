//! Decide whether a destination entry must be rewritten

use crate::transport::{EntryMeta, Transport};
use std::io::{self, Read};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Chunk size for byte-level comparison
pub const CHUNK_SIZE: usize = 4096;

/// Compares metadata with timestamps truncated to a common granularity,
/// since some transports lose precision on round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparator {
    granularity: Duration,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(Duration::from_micros(1))
    }
}

impl Comparator {
    pub fn new(granularity: Duration) -> Self {
        let granularity = granularity.max(Duration::from_nanos(1));
        Self { granularity }
    }

    /// Coarsest granularity of the two backends
    pub fn for_transports<S, D>(src: &S, dst: &D) -> Self
    where
        S: Transport + ?Sized,
        D: Transport + ?Sized,
    {
        Self::new(
            src.timestamp_granularity()
                .max(dst.timestamp_granularity()),
        )
    }

    pub fn granularity(&self) -> Duration {
        self.granularity
    }

    fn truncate(&self, t: SystemTime) -> i128 {
        let nanos = match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_nanos() as i128,
            Err(e) => -(e.duration().as_nanos() as i128),
        };
        nanos.div_euclid(self.granularity.as_nanos() as i128)
    }

    /// Source is newer, or sizes differ
    pub fn unequal(&self, src: &EntryMeta, dst: &EntryMeta) -> bool {
        self.younger(src, dst) || src.size != dst.size
    }

    /// Source is newer; size is ignored
    pub fn younger(&self, src: &EntryMeta, dst: &EntryMeta) -> bool {
        self.truncate(src.modified) > self.truncate(dst.modified)
    }

    pub fn same_time(&self, a: &EntryMeta, b: &EntryMeta) -> bool {
        self.truncate(a.modified) == self.truncate(b.modified)
    }

    /// Two-way rule: the newer side wins; on a timestamp tie a size
    /// difference hands the win to `src`, the side currently being pushed.
    pub fn supersedes(&self, src: &EntryMeta, dst: &EntryMeta) -> bool {
        self.younger(src, dst) || (self.same_time(src, dst) && src.size != dst.size)
    }
}

/// Byte-for-byte comparison, possibly across two transports.
/// Sizes are checked first; differing sizes never open either file.
pub fn deep_equal<S, D>(src: &S, src_path: &Path, dst: &D, dst_path: &Path) -> io::Result<bool>
where
    S: Transport + ?Sized,
    D: Transport + ?Sized,
{
    let src_meta = src.stat(src_path)?.ok_or_else(|| not_found(src_path))?;
    let dst_meta = dst.stat(dst_path)?.ok_or_else(|| not_found(dst_path))?;
    if src_meta.size != dst_meta.size {
        return Ok(false);
    }

    let mut a = src.open_read(src_path)?;
    let mut b = dst.open_read(dst_path)?;
    let mut buf_a = [0u8; CHUNK_SIZE];
    let mut buf_b = [0u8; CHUNK_SIZE];
    loop {
        let n = read_chunk(&mut a, &mut buf_a)?;
        let m = read_chunk(&mut b, &mut buf_b)?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("'{}' does not exist", path.display()),
    )
}

/// Fill `buf` unless the reader hits EOF first
fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
