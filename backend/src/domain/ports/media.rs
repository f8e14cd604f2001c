//! Port for stored media files.

use async_trait::async_trait;

use crate::domain::image::ImageUpload;

/// Destination buckets for uploads, mapped to media-root subdirectories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    /// User avatars.
    Avatars,
    /// Recipe images.
    RecipeImages,
}

impl MediaCategory {
    /// Relative directory under the media root.
    pub fn directory(self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::RecipeImages => "recipes/images",
        }
    }
}

/// Failures raised by media storage adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// The file could not be written or removed.
    #[error("media store failure: {message}")]
    Io { message: String },
}

impl MediaError {
    /// Create an I/O error with the given message.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

/// Port for writing decoded uploads and removing replaced files.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an upload under a generated filename; returns the
    /// media-relative path (e.g. `recipes/images/<uuid>.png`).
    async fn save(&self, upload: &ImageUpload, category: MediaCategory)
    -> Result<String, MediaError>;

    /// Remove a previously stored file. Missing files are not an error;
    /// the pointer row is authoritative.
    async fn delete(&self, path: &str) -> Result<(), MediaError>;
}
