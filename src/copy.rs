//! Copy one regular file between two transports

use crate::error::{Result, SyncError};
use crate::transport::{EntryMeta, Transport};
use std::io::{self, Read, Write};
use std::path::Path;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Stream `src_path` into `dst_path`, then stamp the destination with the
/// source modification time and, if asked, its permission bits.
/// Returns the number of bytes written.
pub fn copy_file<S, D>(
    src: &S,
    src_path: &Path,
    dst: &D,
    dst_path: &Path,
    meta: &EntryMeta,
    keep_permissions: bool,
) -> Result<u64>
where
    S: Transport + ?Sized,
    D: Transport + ?Sized,
{
    let mut reader = src
        .open_read(src_path)
        .map_err(|e| SyncError::transfer("open", src_path, e))?;
    let mut writer = dst
        .create_truncate(dst_path)
        .map_err(|e| SyncError::transfer("create", dst_path, e))?;

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total_bytes = 0u64;

    // Copy loop
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SyncError::transfer("read", src_path, e)),
        };
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| SyncError::transfer("write", dst_path, e))?;
        total_bytes += bytes_read as u64;
    }

    writer
        .flush()
        .map_err(|e| SyncError::transfer("write", dst_path, e))?;
    // both handles closed before touching metadata
    drop(writer);
    drop(reader);

    if keep_permissions {
        if let Some(mode) = meta.mode {
            dst.set_permissions(dst_path, mode)
                .map_err(|e| SyncError::transfer("set permissions of", dst_path, e))?;
        }
    }
    dst.set_modified(dst_path, meta.modified)
        .map_err(|e| SyncError::transfer("set modification time of", dst_path, e))?;

    Ok(total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn copies_bytes_and_mtime() -> Result<()> {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src.bin");
        let dst = tmp.path().join("dst.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
        fs::write(&src, &data).expect("write");

        let t = LocalTransport::new();
        let mut meta = t.stat(&src).expect("stat").expect("exists");
        meta.modified = UNIX_EPOCH + Duration::from_secs(1_138_752_000);

        let n = copy_file(&t, &src, &t, &dst, &meta, true)?;
        assert_eq!(n, data.len() as u64);
        assert_eq!(fs::read(&dst).expect("read"), data);
        assert_eq!(
            t.stat(&dst).expect("stat").map(|m| m.modified),
            Some(meta.modified)
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn keeps_permission_bits_when_asked() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("run.sh");
        fs::write(&src, b"#!/bin/sh\n").expect("write");
        fs::set_permissions(&src, fs::Permissions::from_mode(0o750)).expect("chmod");

        let t = LocalTransport::new();
        let meta = t.stat(&src).expect("stat").expect("exists");
        copy_file(&t, &src, &t, &tmp.path().join("kept.sh"), &meta, true)?;
        copy_file(&t, &src, &t, &tmp.path().join("plain.sh"), &meta, false)?;

        let kept = t.stat(&tmp.path().join("kept.sh")).expect("stat").expect("exists");
        let plain = t.stat(&tmp.path().join("plain.sh")).expect("stat").expect("exists");
        assert_eq!(kept.mode, Some(0o750));
        assert_ne!(plain.mode, Some(0o750));
        Ok(())
    }

    #[test]
    fn missing_source_is_a_transfer_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let t = LocalTransport::new();
        let meta = EntryMeta {
            size: 0,
            modified: UNIX_EPOCH,
            kind: crate::transport::EntryKind::File,
            mode: None,
        };
        let err = copy_file(&t, &tmp.path().join("gone"), &t, &tmp.path().join("x"), &meta, false)
            .expect_err("must fail");
        assert!(matches!(err, SyncError::Transfer { action: "open", .. }));
    }
}
