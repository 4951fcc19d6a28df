//! Backend sobre filesystem: un directorio por contenedor, un archivo por
//! blob. `put` escribe a un temporal y renombra, así un lector nunca ve un
//! blob a medio escribir.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{validate_name, BlobInfo, BlobStore};
use crate::error::BlobError;

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    async fn container_dir(&self, container: &str) -> Result<PathBuf, BlobError> {
        validate_name(container)?;
        let dir = self.root.join(container);
        match fs::metadata(&dir).await {
            Ok(m) if m.is_dir() => Ok(dir),
            Ok(_) => Err(BlobError::ContainerNotFound(container.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::ContainerNotFound(container.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn blob_path(&self, container: &str, name: &str) -> Result<PathBuf, BlobError> {
        validate_name(name)?;
        Ok(self.container_dir(container).await?.join(name))
    }

    fn not_found(container: &str, name: &str) -> BlobError {
        BlobError::NotFound { container: container.to_string(), name: name.to_string() }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<(), BlobError> {
        validate_name(container)?;
        fs::create_dir_all(self.root.join(container)).await?;
        Ok(())
    }

    async fn get(&self, container: &str, name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.blob_path(container, name).await?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Self::not_found(container, name)),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, container: &str, name: &str, data: &[u8]) -> Result<(), BlobError> {
        let path = self.blob_path(container, name).await?;
        let tmp = path.with_file_name(format!(".{name}.{}", Uuid::new_v4()));
        fs::write(&tmp, data).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!("wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    async fn put_if_not_exists(&self, container: &str, name: &str, data: &[u8]) -> Result<(), BlobError> {
        let path = self.blob_path(container, name).await?;
        let file = fs::OpenOptions::new().write(true).create_new(true).open(&path).await;
        let mut file = match file {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(BlobError::AlreadyExists { container: container.to_string(), name: name.to_string() })
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn list(&self, container: &str) -> Result<Vec<BlobInfo>, BlobError> {
        let dir = self.container_dir(container).await?;
        let mut entries = fs::read_dir(&dir).await?;
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let last_modified: DateTime<Utc> = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
            out.push(BlobInfo { name, size: meta.len(), last_modified });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn delete(&self, container: &str, name: &str) -> Result<(), BlobError> {
        let path = self.blob_path(container, name).await?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Self::not_found(container, name)),
            Err(e) => Err(e.into()),
        }
    }
}
