//! Local filesystem implementation.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// File operations used by the engine, the remove flow and the proxy.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a whole file as UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create or truncate `path` with `contents`, leaving it with exactly `mode`.
    async fn write(&self, path: &Path, contents: &str, mode: u32) -> io::Result<()>;

    /// Delete a file.
    async fn remove(&self, path: &Path) -> io::Result<()>;

    /// List the regular files directly inside `dir`, sorted by path.
    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// `FileSystem` over `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl FileSystem for LocalFs {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, contents: &str, mode: u32) -> io::Result<()> {
        tokio::fs::write(path, contents).await?;
        set_mode(path, mode).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service-formatted.ctmpl");

        LocalFs.write(&path, "frontend x", 0o664).await.unwrap();

        assert_eq!(LocalFs.read_to_string(&path).await.unwrap(), "frontend x");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.ctmpl");
        LocalFs.write(&path, "x", 0o664).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o664);
    }

    #[tokio::test]
    async fn test_list_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.cfg"), "b").unwrap();
        std::fs::write(dir.path().join("a.cfg"), "a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let files = LocalFs.list_files(dir.path()).await.unwrap();

        assert_eq!(files, vec![dir.path().join("a.cfg"), dir.path().join("b.cfg")]);
    }

    #[tokio::test]
    async fn test_remove_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFs.remove(&dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
