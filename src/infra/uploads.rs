//! Filesystem storage for uploaded images.
//!
//! Every upload gets a random file name, so deleting one owner's file never
//! affects another record that happened to upload the same bytes.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use imagesize::ImageType;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Subdirectory for profile pictures.
pub const USER_IMAGE_DIR: &str = "images/users";
/// Subdirectory for article thumbnails and inline body images.
pub const ARTICLE_IMAGE_DIR: &str = "images/articles";

#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("uploaded file is not a png or jpg image")]
    UnsupportedType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn detect(data: &[u8]) -> Option<Self> {
        match imagesize::image_type(data) {
            Ok(ImageType::Png) => Some(ImageKind::Png),
            Ok(ImageType::Jpeg) => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub stored_path: String,
}

#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
    max_image_bytes: usize,
    public_base: String,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    ///
    /// `public_base` is the externally visible origin stored paths are served under.
    pub fn new(
        root: PathBuf,
        max_image_bytes: usize,
        public_base: &str,
    ) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            max_image_bytes,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    pub fn public_url(&self, stored_path: &str) -> String {
        format!("{}/{}", self.public_base, stored_path)
    }

    /// Checks size and format, then writes the image under `directory`.
    pub async fn store_image(
        &self,
        directory: &str,
        data: Bytes,
    ) -> Result<StoredImage, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }
        if data.len() > self.max_image_bytes {
            return Err(UploadStorageError::TooLarge {
                limit: self.max_image_bytes,
            });
        }
        let kind = ImageKind::detect(&data).ok_or(UploadStorageError::UnsupportedType)?;

        let stored_path = format!(
            "{directory}/{}.{}",
            Uuid::new_v4().simple(),
            kind.extension()
        );
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        Ok(StoredImage { stored_path })
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}
