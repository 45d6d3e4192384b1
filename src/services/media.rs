//! Uploaded post images
//!
//! Files land under `<media root>/posts/` with a random uuid name; the
//! stored path is relative to the media root, which is served at `/media`.

use crate::config::MediaConfig;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const POSTS_DIR: &str = "posts";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File too large: {size} bytes (maximum {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    config: MediaConfig,
}

impl MediaStore {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.path
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Reject a file before it is written
    pub fn check(&self, content_type: &str, size: u64) -> Result<(), MediaError> {
        if !self.config.is_type_allowed(content_type) {
            return Err(MediaError::UnsupportedType(content_type.to_string()));
        }
        if size > self.config.max_file_size {
            return Err(MediaError::TooLarge {
                size,
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    /// Store an image; returns its path relative to the media root
    pub async fn save(&self, content_type: &str, data: &[u8]) -> Result<String, MediaError> {
        self.check(content_type, data.len() as u64)?;

        let dir = self.config.path.join(POSTS_DIR);
        fs::create_dir_all(&dir).await?;

        let file_name = format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            self.config.get_extension(content_type)
        );
        fs::write(dir.join(&file_name), data).await?;

        let relative = format!("{}/{}", POSTS_DIR, file_name);
        tracing::debug!(path = %relative, size = data.len(), "Image stored");
        Ok(relative)
    }

    /// Absolute location of a stored relative path
    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.config.path.join(relative)
    }

    /// Remove a stored file; a file that is already gone is not an error
    pub async fn remove(&self, relative: &str) -> Result<(), MediaError> {
        match fs::remove_file(self.path_of(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, max_file_size: u64) -> MediaStore {
        MediaStore::new(MediaConfig {
            path: dir.path().to_path_buf(),
            max_file_size,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024);

        let relative = store.save("image/png", b"\x89PNG fake").await.unwrap();
        assert!(relative.starts_with("posts/"));
        assert!(relative.ends_with(".png"));

        let written = std::fs::read(store.path_of(&relative)).unwrap();
        assert_eq!(written, b"\x89PNG fake");

        store.remove(&relative).await.unwrap();
        assert!(!store.path_of(&relative).exists());
        store.remove(&relative).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_bad_uploads() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 4);

        assert!(matches!(
            store.save("text/html", b"<p>").await,
            Err(MediaError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.save("image/jpeg", b"too big").await,
            Err(MediaError::TooLarge { size: 7, max: 4 })
        ));
        assert!(!dir.path().join(POSTS_DIR).exists());
    }
}
