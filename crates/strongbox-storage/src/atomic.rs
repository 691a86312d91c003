use std::{
    fs, io,
    io::Write,
    path::Path,
};

use tempfile::NamedTempFile;

/// Writes through a sibling temp file and renames it into place, so readers
/// see either the old contents or the new ones.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8], private: bool) -> io::Result<()> {
    let tmp = stage(path, bytes, private)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Like [`write_atomic`], but never replaces an existing file.
///
/// Returns `false` when `path` already exists; the staged copy is discarded.
pub(crate) fn write_new(path: &Path, bytes: &[u8], private: bool) -> io::Result<bool> {
    let tmp = stage(path, bytes, private)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err.error),
    }
}

fn stage(path: &Path, bytes: &[u8], private: bool) -> io::Result<NamedTempFile> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid storage path"))?;
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if private {
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Reads a file, mapping "missing" to `None`.
pub(crate) fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_new_keeps_the_first_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("key.pem");

        assert!(write_new(&path, b"first", true).expect("first write"));
        assert!(!write_new(&path, b"second", true).expect("second write"));
        assert_eq!(fs::read(&path).expect("read"), b"first");

        let leftovers = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .count();
        assert_eq!(leftovers, 1, "losing temp file must be cleaned up");
    }
}
