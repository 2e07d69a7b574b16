use std::{
    io::Result as IoResult,
    path::{Component, Path, PathBuf},
};

use rocket::fairing::AdHoc;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
};

use crate::config::get_app_config;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File exceeds the maximum size of {0} bytes")]
    TooLarge(u64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Flat directory of uploaded document files
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStorage {
            base_path: base_path.into(),
        }
    }

    pub async fn init(&self) -> IoResult<()> {
        tokio::fs::create_dir_all(&self.base_path).await
    }

    pub async fn read_file(&self, name: &str) -> IoResult<Vec<u8>> {
        let path = self.get_file_path(name)?;
        tokio::fs::read(path).await
    }

    /// Write a new file from the reader, failing if it already exists. If more than
    /// `max_bytes` are read, the partial file is removed. Returns the number of bytes written.
    pub async fn create_file(
        &self,
        name: &str,
        mut data: impl AsyncRead + Unpin,
        max_bytes: u64,
    ) -> Result<u64, StorageError> {
        let file_path = self.get_file_path(name)?;
        let mut file = File::create_new(&file_path).await?;

        match copy_bounded(&mut data, &mut file, max_bytes).await {
            Ok(written) => {
                file.flush().await?;
                file.sync_all().await?;
                Ok(written)
            }
            Err(e) => {
                drop(file);
                if let Err(remove_err) = tokio::fs::remove_file(&file_path).await {
                    rocket::warn!("Failed to remove partial file {}: {}", name, remove_err);
                }
                Err(e)
            }
        }
    }

    /// Delete the file. Returns `false` if it didn't exist.
    pub async fn delete_file(&self, name: &str) -> IoResult<bool> {
        let path = self.get_file_path(name)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolve a stored file name. Only a single plain path component is accepted.
    pub fn get_file_path(&self, name: &str) -> IoResult<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.base_path.join(name)),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "File name must be a single plain path component",
            )),
        }
    }
}

async fn copy_bounded(
    data: &mut (impl AsyncRead + Unpin),
    file: &mut File,
    max_bytes: u64,
) -> Result<u64, StorageError> {
    let mut buffer = [0; 8192];
    let mut written: u64 = 0;
    loop {
        let n = data.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        written += n as u64;
        if written > max_bytes {
            return Err(StorageError::TooLarge(max_bytes));
        }
        file.write_all(&buffer[..n]).await?;
    }
    Ok(written)
}

/// Fairing that creates the upload directory and manages the document storage
pub fn setup_storage() -> AdHoc {
    AdHoc::try_on_ignite("Document storage", |rocket| async {
        let storage = LocalStorage::new(get_app_config(&rocket).upload_dir());
        match storage.init().await {
            Ok(()) => {
                rocket::info!("Document storage at {}", storage.base_path.display());
                Ok(rocket.manage(storage))
            }
            Err(e) => {
                rocket::error!("Failed to create upload directory: {}", e);
                Err(rocket)
            }
        }
    })
}
