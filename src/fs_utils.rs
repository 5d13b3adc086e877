use crate::error::{Result, SpliceError};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, PersistError};

/// Checks that `path` exists and is a regular file.
///
/// # Errors
///
/// `SpliceError::SourceNotFound` if the path doesn't exist or isn't a file.
pub fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(SpliceError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Output sink that only replaces its destination on [`commit`].
///
/// Bytes go to a temporary file created next to the destination, so the
/// final rename never crosses a filesystem boundary. Dropping the writer
/// without committing removes the temporary file and leaves the destination
/// as it was.
///
/// [`commit`]: AtomicWriter::commit
#[derive(Debug)]
pub struct AtomicWriter {
    destination: PathBuf,
    out: BufWriter<NamedTempFile>,
}

impl AtomicWriter {
    /// Creates the temporary file for `destination`.
    ///
    /// # Errors
    ///
    /// `SpliceError::WriteFailure` if the temporary file cannot be created.
    pub fn create(destination: &Path) -> Result<Self> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| SpliceError::WriteFailure {
                path: destination.to_path_buf(),
                source,
            })?;

        tracing::debug!(temp = %temp.path().display(), "created temporary output");

        Ok(Self {
            destination: destination.to_path_buf(),
            out: BufWriter::new(temp),
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.out.get_ref().path()
    }

    /// Appends bytes to the temporary file.
    ///
    /// # Errors
    ///
    /// `SpliceError::WriteFailure` on any I/O error.
    pub fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.out
            .write_all(bytes)
            .map_err(|source| SpliceError::WriteFailure {
                path: self.destination.clone(),
                source,
            })
    }

    /// Flushes and syncs the temporary file, then renames it over the
    /// destination. The destination's permissions are carried over.
    ///
    /// # Errors
    ///
    /// - `SpliceError::WriteFailure` if flushing or syncing fails; the
    ///   temporary file is removed.
    /// - `SpliceError::CommitFailure` if the rename fails; the temporary file
    ///   is kept on disk and its path is part of the error.
    pub fn commit(self) -> Result<()> {
        let destination = self.destination;
        let write_failure = |source| SpliceError::WriteFailure {
            path: destination.clone(),
            source,
        };

        let temp = self
            .out
            .into_inner()
            .map_err(|e| write_failure(e.into_error()))?;
        temp.as_file().sync_all().map_err(write_failure)?;

        if let Ok(metadata) = fs::metadata(&destination) {
            fs::set_permissions(temp.path(), metadata.permissions()).map_err(write_failure)?;
        }

        match temp.persist(&destination) {
            Ok(_) => {
                tracing::info!("replaced {}", destination.display());
                Ok(())
            }
            Err(PersistError { error, file }) => {
                let temp_path = file.path().to_path_buf();
                if let Err(e) = file.keep() {
                    tracing::warn!("could not keep temporary output: {e}");
                }
                Err(SpliceError::CommitFailure {
                    path: destination.clone(),
                    temp_path,
                    source: error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_require_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("page.html");
        fs::write(&file_path, "x").unwrap();
        assert!(require_file(&file_path).is_ok());

        let missing = temp_dir.path().join("missing.html");
        assert!(matches!(
            require_file(&missing),
            Err(SpliceError::SourceNotFound { .. })
        ));

        // a directory is not a file
        assert!(matches!(
            require_file(temp_dir.path()),
            Err(SpliceError::SourceNotFound { .. })
        ));
    }

    #[test]
    fn test_commit_replaces_destination() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("page.html");
        fs::write(&dest, "old").unwrap();

        let mut writer = AtomicWriter::create(&dest).unwrap();
        assert_eq!(writer.temp_path().parent(), Some(temp_dir.path()));
        writer.put(b"new ").unwrap();
        writer.put(b"content").unwrap();

        // nothing visible before commit
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");

        writer.commit().unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new content");
        assert_eq!(entries(temp_dir.path()), vec!["page.html"]);
    }

    #[test]
    fn test_drop_without_commit_leaves_destination() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("page.html");
        fs::write(&dest, "old").unwrap();

        {
            let mut writer = AtomicWriter::create(&dest).unwrap();
            writer.put(b"partial").unwrap();
        }

        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");
        assert_eq!(entries(temp_dir.path()), vec!["page.html"]);
    }

    #[test]
    fn test_commit_creates_missing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("fresh.html");

        let mut writer = AtomicWriter::create(&dest).unwrap();
        writer.put(b"hello").unwrap();
        writer.commit().unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("no_such_dir").join("page.html");
        assert!(matches!(
            AtomicWriter::create(&dest),
            Err(SpliceError::WriteFailure { .. })
        ));
    }

    #[test]
    fn test_commit_onto_directory_fails_and_keeps_temp() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("page.html");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("inner.txt"), "keep me").unwrap();

        let mut writer = AtomicWriter::create(&dest).unwrap();
        writer.put(b"content").unwrap();
        let err = writer.commit().unwrap_err();

        match err {
            SpliceError::CommitFailure { temp_path, .. } => {
                assert!(temp_path.exists());
                assert_eq!(fs::read_to_string(&temp_path).unwrap(), "content");
            }
            other => panic!("expected CommitFailure, got {other:?}"),
        }
        assert_eq!(
            fs::read_to_string(dest.join("inner.txt")).unwrap(),
            "keep me"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_commit_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("page.html");
        fs::write(&dest, "old").unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o644)).unwrap();

        let mut writer = AtomicWriter::create(&dest).unwrap();
        writer.put(b"new").unwrap();
        writer.commit().unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
