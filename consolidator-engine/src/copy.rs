//! Byte-for-byte file copies shared by transfer and snapshot.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::path::Path;

use filetime::{set_file_times, FileTime};

use crate::error::{io_err, EngineError};

/// Mode of files created by a copy, before ownership is applied.
pub const COPY_MODE: u32 = 0o644;

/// Copy `src` to `dst`, truncating any existing destination.
///
/// A destination left half-written by a failed read or write is removed.
pub fn copy_contents(src: &Path, dst: &Path) -> Result<u64, EngineError> {
    let mut reader = File::open(src).map_err(|e| io_err(src, e))?;
    let mut writer = create_destination(dst).map_err(|e| io_err(dst, e))?;

    match io::copy(&mut reader, &mut writer) {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            drop(writer);
            let _ = fs::remove_file(dst);
            Err(io_err(dst, err))
        }
    }
}

/// Apply the source's owner, group, access time and modification time to `dst`.
///
/// Ownership goes first: `chown` does not touch the timestamps set afterwards.
pub fn preserve_provenance(dst: &Path, source: &Metadata) -> Result<(), EngineError> {
    #[cfg(unix)]
    {
        use nix::unistd::{chown, Gid, Uid};
        use std::os::unix::fs::MetadataExt;

        chown(
            dst,
            Some(Uid::from_raw(source.uid())),
            Some(Gid::from_raw(source.gid())),
        )
        .map_err(|e| EngineError::Ownership {
            path: dst.to_path_buf(),
            source: e,
        })?;
    }

    set_file_times(
        dst,
        FileTime::from_last_access_time(source),
        FileTime::from_last_modification_time(source),
    )
    .map_err(|e| io_err(dst, e))
}

/// `stat`-style regular-file check: symlinks are followed, errors count as "no".
pub fn regular_file_metadata(path: &Path) -> Option<Metadata> {
    fs::metadata(path).ok().filter(Metadata::is_file)
}

#[cfg(unix)]
fn create_destination(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(COPY_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn create_destination(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
