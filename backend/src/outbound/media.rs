//! Filesystem-backed [`MediaStore`] implementation.
//!
//! Files land under a configurable media root, in per-category
//! subdirectories, with collision-free generated filenames. The stored
//! path returned to callers is relative to the root so database rows
//! survive a root relocation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::domain::image::ImageUpload;
use crate::domain::ports::{MediaCategory, MediaError, MediaStore};

/// [`MediaStore`] writing uploads beneath a media root directory.
#[derive(Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reject stored paths that would escape the media root.
    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let candidate = Path::new(relative);
        let escapes = candidate.is_absolute()
            || candidate
                .components()
                .any(|part| matches!(part, std::path::Component::ParentDir));
        if escapes {
            return Err(MediaError::io(format!(
                "refusing media path outside the root: {relative}"
            )));
        }
        Ok(self.root.join(candidate))
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn save(
        &self,
        upload: &ImageUpload,
        category: MediaCategory,
    ) -> Result<String, MediaError> {
        let relative = format!("{}/{}", category.directory(), upload.generate_filename());
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|error| MediaError::io(error.to_string()))?;
        }
        fs::write(&target, upload.bytes())
            .await
            .map_err(|error| MediaError::io(error.to_string()))?;
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<(), MediaError> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            // Pointer rows are authoritative; a missing file is stale state,
            // not a failure.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(MediaError::io(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk\
YPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn upload() -> ImageUpload {
        let uri = format!("data:image/png;base64,{PNG_B64}");
        ImageUpload::from_data_uri(&uri).unwrap()
    }

    #[rstest]
    #[actix_rt::test]
    async fn saves_and_deletes_under_category_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path());

        let relative = store.save(&upload(), MediaCategory::Avatars).await.unwrap();
        assert!(relative.starts_with("avatars/"));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).is_file());

        store.delete(&relative).await.unwrap();
        assert!(!dir.path().join(&relative).exists());
    }

    #[rstest]
    #[actix_rt::test]
    async fn deleting_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path());
        store.delete("avatars/gone.png").await.unwrap();
    }

    #[rstest]
    #[actix_rt::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path());
        assert!(store.delete("../outside.png").await.is_err());
    }
}
