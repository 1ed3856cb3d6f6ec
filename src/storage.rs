use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Seam between the upload handlers and whatever actually holds the bytes.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, name: &str, body: Bytes) -> anyhow::Result<()>;
    /// Returns false when no such object existed.
    async fn delete_object(&self, name: &str) -> anyhow::Result<bool>;
}

/// Stores uploads as plain files under one directory; the same directory is
/// served read-only at /uploads.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, name: &str, body: Bytes) -> anyhow::Result<()> {
        anyhow::ensure!(is_safe_filename(name), "unsafe filename {name}");
        let path = self.root.join(name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> anyhow::Result<bool> {
        anyhow::ensure!(is_safe_filename(name), "unsafe filename {name}");
        let path = self.root.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("delete {}", path.display())),
        }
    }
}

/// Reject anything that could escape the upload directory.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && name != "."
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("cashbook-storage-{}", Uuid::new_v4()))
    }

    #[test]
    fn filename_safety() {
        assert!(is_safe_filename("a1b2.png"));
        assert!(is_safe_filename("f0e9d8c7.pdf"));
        assert!(!is_safe_filename("../etc/passwd"));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename("a\\b.png"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("."));
    }

    #[tokio::test]
    async fn put_then_delete_roundtrip() {
        let root = temp_root();
        let storage = LocalStorage::new(&root).await.unwrap();

        storage
            .put_object("receipt.png", Bytes::from_static(b"png-bytes"))
            .await
            .unwrap();
        let on_disk = tokio::fs::read(root.join("receipt.png")).await.unwrap();
        assert_eq!(on_disk, b"png-bytes");

        assert!(storage.delete_object("receipt.png").await.unwrap());
        // Second delete reports missing instead of erroring.
        assert!(!storage.delete_object("receipt.png").await.unwrap());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let root = temp_root();
        let storage = LocalStorage::new(&root).await.unwrap();
        let err = storage
            .put_object("../escape.txt", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsafe filename"));
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
