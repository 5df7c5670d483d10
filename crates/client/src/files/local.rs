//! Local files selected for upload.
//!
//! Folder uploads walk a directory tree and turn every regular file into a
//! `/`-separated path relative to the chosen directory. Symbolic links are
//! not followed.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

/// Errors reading local upload sources.
#[derive(Debug, Error)]
pub enum LocalError {
    /// The path does not exist.
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    /// A file was expected.
    #[error("not a file: {0}")]
    NotAFile(PathBuf),

    /// A directory was expected.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The path has no usable final component.
    #[error("path has no name: {0}")]
    NoName(PathBuf),

    /// The file exceeds the configured upload limit.
    #[error("{path} is {size} bytes, the limit is {max} bytes")]
    TooLarge {
        /// Offending file.
        path: PathBuf,
        /// Its size.
        size: u64,
        /// Configured limit.
        max: u64,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A regular file found under an upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Full local path.
    pub path: PathBuf,
    /// Path relative to the walked directory, joined with `/`.
    pub relative: String,
    /// Size in bytes.
    pub size: u64,
}

fn not_found_or_io(path: &Path, e: std::io::Error) -> LocalError {
    if e.kind() == std::io::ErrorKind::NotFound {
        LocalError::NotFound(path.to_path_buf())
    } else {
        LocalError::Io(e)
    }
}

/// Final path component as UTF-8 (lossy).
pub fn file_name(path: &Path) -> Result<String, LocalError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| LocalError::NoName(path.to_path_buf()))
}

/// Collect every regular file under `dir`, sorted by relative path.
pub fn collect_files(dir: &Path) -> Result<Vec<LocalFile>, LocalError> {
    let metadata = fs::metadata(dir).map_err(|e| not_found_or_io(dir, e))?;
    if !metadata.is_dir() {
        return Err(LocalError::NotADirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    walk(dir, "", &mut files)?;
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn walk(dir: &Path, prefix: &str, files: &mut Vec<LocalFile>) -> Result<(), LocalError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        // file_type() does not follow symlinks
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            tracing::debug!("Skipping symlink {}", entry.path().display());
        } else if file_type.is_dir() {
            walk(&entry.path(), &relative, files)?;
        } else if file_type.is_file() {
            files.push(LocalFile {
                path: entry.path(),
                relative,
                size: entry.metadata()?.len(),
            });
        }
    }
    Ok(())
}

/// Read a file for upload, enforcing `max_size`.
pub async fn read_upload(path: &Path, max_size: u64) -> Result<Bytes, LocalError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| not_found_or_io(path, e))?;
    if !metadata.is_file() {
        return Err(LocalError::NotAFile(path.to_path_buf()));
    }
    if metadata.len() > max_size {
        return Err(LocalError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max: max_size,
        });
    }

    let data = tokio::fs::read(path).await?;
    Ok(Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, relative: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_collect_nested() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "b.txt", b"bb");
        create_test_file(temp.path(), "a/z.txt", b"z");
        create_test_file(temp.path(), "a/deep/x.bin", b"xxx");

        let files = collect_files(temp.path()).unwrap();
        let relative: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, vec!["a/deep/x.bin", "a/z.txt", "b.txt"]);
        assert_eq!(files[0].size, 3);
    }

    #[test]
    fn test_collect_empty_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("empty/nested")).unwrap();
        assert!(collect_files(temp.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_skips_symlinks() {
        let temp = TempDir::new().unwrap();
        let target = create_test_file(temp.path(), "real.txt", b"r");
        std::os::unix::fs::symlink(&target, temp.path().join("link.txt")).unwrap();

        let files = collect_files(temp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "real.txt");
    }

    #[test]
    fn test_collect_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = create_test_file(temp.path(), "f.txt", b"f");
        assert!(matches!(
            collect_files(&file),
            Err(LocalError::NotADirectory(_))
        ));
        assert!(matches!(
            collect_files(&temp.path().join("missing")),
            Err(LocalError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/report.pdf")).unwrap(), "report.pdf");
        assert!(file_name(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn test_read_upload() {
        let temp = TempDir::new().unwrap();
        let path = create_test_file(temp.path(), "f.txt", b"hello");

        assert_eq!(&read_upload(&path, 10).await.unwrap()[..], b"hello");
        assert!(matches!(
            read_upload(&path, 4).await,
            Err(LocalError::TooLarge { size: 5, max: 4, .. })
        ));
        assert!(matches!(
            read_upload(temp.path(), 10).await,
            Err(LocalError::NotAFile(_))
        ));
    }
}
