use crate::db::{
    errors::{DbError, Result},
    models::file_storage::{FileStorageRequest, FileStorageResponse},
};
use async_trait::async_trait;
use chrono::Utc;
use rand::prelude::RngExt;
use rand::rng;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Trait for attachment storage backends
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store file content and return storage key
    async fn store(&self, request: FileStorageRequest) -> Result<FileStorageResponse>;

    /// Retrieve file content using storage key
    async fn retrieve(&self, storage_key: &str) -> Result<Vec<u8>>;

    /// Delete file content using storage key. Deleting a missing file is not an error.
    async fn delete(&self, storage_key: &str) -> Result<()>;

    /// Check if file exists using storage key
    async fn exists(&self, storage_key: &str) -> Result<bool>;
}

/// Local filesystem storage: every attachment is a flat file in one upload directory.
pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a storage key to a path inside the upload directory. Keys are bare file names
    /// that we generated, so anything carrying a path component is treated as unknown.
    fn resolve(&self, storage_key: &str) -> Result<PathBuf> {
        let is_bare_name = !storage_key.is_empty()
            && Path::new(storage_key).file_name().is_some_and(|name| name == storage_key)
            && storage_key != ".."
            && !storage_key.contains(['/', '\\']);
        if !is_bare_name {
            return Err(DbError::NotFound);
        }
        Ok(self.base_path.join(storage_key))
    }
}

/// `{unix millis}-{random}{ext}`, e.g. `1718035200123-482913374.pdf`
fn generate_storage_key(extension: &str) -> String {
    let suffix: u32 = rng().random_range(0..1_000_000_000);
    format!("{}-{}{}", Utc::now().timestamp_millis(), suffix, extension)
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, request: FileStorageRequest) -> Result<FileStorageResponse> {
        fs::create_dir_all(&self.base_path).await?;

        let storage_key = generate_storage_key(&request.extension);
        let full_path = self.base_path.join(&storage_key);

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&request.content).await?;
        file.sync_all().await?;

        tracing::debug!(storage_key = %storage_key, size = request.content.len(), "Stored attachment");

        Ok(FileStorageResponse { storage_key })
    }

    async fn retrieve(&self, storage_key: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(storage_key)?;
        // io::ErrorKind::NotFound converts to DbError::NotFound
        Ok(fs::read(&full_path).await?)
    }

    async fn delete(&self, storage_key: &str) -> Result<()> {
        let full_path = self.resolve(storage_key)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, storage_key: &str) -> Result<bool> {
        match self.resolve(storage_key) {
            Ok(full_path) => Ok(fs::try_exists(&full_path).await?),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &[u8], extension: &str) -> FileStorageRequest {
        FileStorageRequest {
            content: content.to_vec(),
            extension: extension.to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_retrieve_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("uploads"));

        let stored = storage.store(request(b"report body", ".pdf")).await.unwrap();
        assert!(stored.storage_key.ends_with(".pdf"));
        assert!(storage.exists(&stored.storage_key).await.unwrap());
        assert_eq!(storage.retrieve(&stored.storage_key).await.unwrap(), b"report body");

        storage.delete(&stored.storage_key).await.unwrap();
        assert!(!storage.exists(&stored.storage_key).await.unwrap());
        // Second delete is a no-op
        storage.delete(&stored.storage_key).await.unwrap();
        assert!(matches!(storage.retrieve(&stored.storage_key).await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn test_storage_key_format() {
        let key = generate_storage_key(".png");
        let (millis, rest) = key.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        let random = rest.strip_suffix(".png").unwrap();
        assert!(random.parse::<u32>().unwrap() < 1_000_000_000);
    }

    #[tokio::test]
    async fn test_keys_outside_upload_dir_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"nope").unwrap();
        let storage = LocalFileStorage::new(dir.path().join("uploads"));

        for key in ["../secret.txt", "..", "", "a/b.pdf"] {
            assert!(matches!(storage.retrieve(key).await, Err(DbError::NotFound)), "{key}");
            assert!(!storage.exists(key).await.unwrap());
        }
    }
}
