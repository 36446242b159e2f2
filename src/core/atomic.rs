//! Purpose: Replace a table file's contents all-or-nothing.
//! Exports: `Durability`, `replace`, `temp_prefix`, `TEMP_SUFFIX`.
//! Role: Write path for every store mutation.
//! Invariants: Staging files live in the target's directory so the final rename is atomic.
//! Invariants: Any failure before the rename removes the staging file and leaves the target untouched.
//! Notes: A crash mid-write can orphan a staging file; readers never look at them.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use super::error::Error;

pub const TEMP_SUFFIX: &str = ".tmp";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Durability {
    /// Rename without fsync; survives process crashes, not power loss.
    #[default]
    Fast,
    /// Fsync the staged file before the rename and the directory after it.
    Flush,
}

/// Staging files for `users.csv` are named `.users.csv.<random>.tmp`.
pub fn temp_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(".{name}.")
}

pub fn replace(path: &Path, contents: &[u8], durability: Durability) -> Result<(), Error> {
    replace_with(path, durability, |file| file.write_all(contents))
}

pub(crate) fn replace_with<F>(path: &Path, durability: Durability, fill: F) -> Result<(), Error>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|err| {
        Error::io(err)
            .with_message("failed to create data directory")
            .with_path(dir)
    })?;

    let mut staged = tempfile::Builder::new()
        .prefix(&temp_prefix(path))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|err| {
            Error::io(err)
                .with_message("failed to create staging file")
                .with_path(dir)
        })?;

    let staged_path = staged.path().to_path_buf();
    let write_err = |err: io::Error| {
        Error::io(err)
            .with_message("failed to write staging file")
            .with_path(&staged_path)
    };
    fill(staged.as_file_mut()).map_err(write_err)?;
    staged.as_file_mut().flush().map_err(write_err)?;
    if durability == Durability::Flush {
        staged.as_file().sync_all().map_err(write_err)?;
    }

    // Dropping the NamedTempFile on the error path deletes the staging file.
    staged.persist(path).map_err(|err| {
        Error::io(err.error)
            .with_message("failed to rename staging file over table")
            .with_path(path)
    })?;

    if durability == Durability::Flush {
        sync_dir(dir)?;
    }
    Ok(())
}

/// Makes the rename itself durable.
fn sync_dir(dir: &Path) -> Result<(), Error> {
    File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(|err| {
            Error::io(err)
                .with_message("failed to sync data directory")
                .with_path(dir)
        })
}

#[cfg(test)]
mod tests {
    use super::{Durability, replace, replace_with, sync_dir, temp_prefix};
    use crate::core::error::ErrorKind;
    use std::fs;
    use std::io::{self, Write};
    use std::path::Path;

    fn staging_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .expect("read_dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with('.'))
            .count()
    }

    #[test]
    fn replace_creates_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("t.csv");

        replace(&path, b"id\nA\n", Durability::Fast).expect("first write");
        assert_eq!(fs::read(&path).expect("read"), b"id\nA\n");

        replace(&path, b"id\nB\n", Durability::Flush).expect("second write");
        assert_eq!(fs::read(&path).expect("read"), b"id\nB\n");
        assert_eq!(staging_files(path.parent().expect("parent")), 0);
    }

    #[test]
    fn failure_before_rename_leaves_target_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t.csv");
        replace(&path, b"id\nA\n", Durability::Fast).expect("seed");
        let before = fs::read(&path).expect("read");

        let err = replace_with(&path, Durability::Fast, |file| {
            file.write_all(b"id\nB\nC")?;
            Err(io::Error::other("injected fault"))
        })
        .expect_err("fault");
        assert!(err.to_string().contains("injected fault"));

        assert_eq!(fs::read(&path).expect("read"), before);
        assert_eq!(staging_files(dir.path()), 0);
    }

    #[test]
    fn directory_sync_failure_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        sync_dir(dir.path()).expect("sync existing dir");

        let missing = dir.path().join("gone");
        let err = sync_dir(&missing).expect_err("missing dir");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.path(), Some(&missing));
    }

    #[test]
    fn staging_prefix_names_the_target() {
        assert_eq!(temp_prefix(Path::new("/data/users.csv")), ".users.csv.");
    }
}
