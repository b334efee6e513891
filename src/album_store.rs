use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::errors::{log_outcome, AppError, AppResult};
use crate::image_processor;
use crate::media_source::PickedImage;
use crate::security::InputValidator;

/// Album title derived from a timestamp as `YYYYMMDD_HHMMSS`.
///
/// Two albums created within the same second get the same name; nothing here
/// tries to disambiguate them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlbumName(String);

impl AlbumName {
    pub const FORMAT: &'static str = "%Y%m%d_%H%M%S";

    pub fn from_timestamp(at: NaiveDateTime) -> Self {
        Self(at.format(Self::FORMAT).to_string())
    }

    pub fn now() -> Self {
        Self::from_timestamp(Local::now().naive_local())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlbumName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The photo library as a destination for picked images.
#[async_trait]
pub trait AlbumStore: Send + Sync {
    /// Create a collection. Not deduplicated: a second call with the same
    /// name may produce a second collection.
    async fn create_album(&self, name: &str) -> AppResult<()>;

    /// Insert into the first collection whose title equals `album_name`.
    async fn add_image(&self, image: &PickedImage, album_name: &str) -> AppResult<()>;
}

/// What became of one album creation and the inserts that followed it.
#[derive(Debug)]
pub struct AlbumReport {
    pub name: AlbumName,
    pub created: AppResult<()>,
    pub added: Vec<AppResult<()>>,
}

impl AlbumReport {
    pub fn added_count(&self) -> usize {
        self.added.iter().filter(|r| r.is_ok()).count()
    }
}

/// Create the album, wait for it, then insert every image in order.
///
/// A failed create is logged and the inserts are still attempted; each one
/// reports its own outcome.
pub async fn populate_album(
    store: Arc<dyn AlbumStore>,
    name: AlbumName,
    images: Vec<PickedImage>,
) -> AlbumReport {
    log::info!("Creating album {} for {} image(s)", name, images.len());

    let created = log_outcome(
        store.create_album(name.as_str()).await,
        "Create album",
        name.as_str(),
    );

    let mut added = Vec::with_capacity(images.len());
    for image in &images {
        let subject = format!("{} -> {}", image.source(), name);
        added.push(log_outcome(
            store.add_image(image, name.as_str()).await,
            "Add image",
            &subject,
        ));
    }

    let report = AlbumReport {
        name,
        created,
        added,
    };
    log::info!(
        "Album {} populated with {}/{} image(s)",
        report.name,
        report.added_count(),
        images.len()
    );
    report
}

#[derive(Debug, Clone)]
struct Collection {
    id: Uuid,
    title: String,
    assets: Vec<PickedImage>,
}

/// In-memory library that behaves like the platform one: titles are not
/// unique, and lookups take the first match.
#[derive(Debug, Default)]
pub struct MemoryAlbumStore {
    collections: Mutex<Vec<Collection>>,
}

impl MemoryAlbumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(title, asset count)` for every collection, oldest first.
    pub fn collections(&self) -> Vec<(String, usize)> {
        match self.collections.lock() {
            Ok(collections) => collections
                .iter()
                .map(|c| (c.title.clone(), c.assets.len()))
                .collect(),
            Err(e) => {
                log::warn!("Failed to acquire album lock (non-critical): {}", e);
                Vec::new()
            }
        }
    }

    /// Sources of the assets in the first collection with this title.
    pub fn assets_in(&self, title: &str) -> Option<Vec<String>> {
        let collections = self.collections.lock().ok()?;
        collections
            .iter()
            .find(|c| c.title == title)
            .map(|c| c.assets.iter().map(|a| a.source().to_string()).collect())
    }
}

#[async_trait]
impl AlbumStore for MemoryAlbumStore {
    async fn create_album(&self, name: &str) -> AppResult<()> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|e| AppError::Internal(format!("Album lock poisoned: {}", e)))?;

        let collection = Collection {
            id: Uuid::new_v4(),
            title: name.to_string(),
            assets: Vec::new(),
        };
        log::debug!("Created collection {} titled {}", collection.id, name);
        collections.push(collection);
        Ok(())
    }

    async fn add_image(&self, image: &PickedImage, album_name: &str) -> AppResult<()> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|e| AppError::Internal(format!("Album lock poisoned: {}", e)))?;

        let collection = collections
            .iter_mut()
            .find(|c| c.title == album_name)
            .ok_or_else(|| AppError::album_not_found(album_name))?;

        collection.assets.push(image.clone());
        Ok(())
    }
}

/// Library rooted at a directory: one subdirectory per collection, one JPEG
/// per asset.
#[derive(Debug, Clone)]
pub struct DirectoryAlbumStore {
    root: PathBuf,
}

impl DirectoryAlbumStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn find_collection(&self, album_name: &str) -> AppResult<PathBuf> {
        let wanted = InputValidator::sanitize_filename(album_name);

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::album_not_found(album_name));
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy() == wanted && entry.file_type().await?.is_dir() {
                return Ok(entry.path());
            }
        }

        Err(AppError::album_not_found(album_name))
    }
}

#[async_trait]
impl AlbumStore for DirectoryAlbumStore {
    async fn create_album(&self, name: &str) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.root.join(InputValidator::sanitize_filename(name));
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {
                log::info!("Created album directory {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                log::warn!(
                    "Album directory {} already exists, reusing it",
                    path.display()
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn add_image(&self, image: &PickedImage, album_name: &str) -> AppResult<()> {
        let collection = self.find_collection(album_name).await?;

        let pixels = image.clone();
        let bytes = tokio::task::spawn_blocking(move || image_processor::encode_jpeg(pixels.pixels()))
            .await
            .map_err(|e| AppError::Internal(format!("Encode task failed: {}", e)))??;

        let asset_path = collection.join(format!("{}.jpg", Uuid::new_v4()));
        tokio::fs::write(&asset_path, bytes).await?;

        log::debug!("Stored {} as {}", image.source(), asset_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use image::DynamicImage;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn picked(source: &str) -> PickedImage {
        PickedImage::new(source, DynamicImage::new_rgb8(2, 2))
    }

    #[test]
    fn test_album_name_format() {
        let name = AlbumName::from_timestamp(at(12, 0, 0));
        assert_eq!(name.as_str(), "20240101_120000");
        assert_eq!(name.to_string(), "20240101_120000");
        assert!(InputValidator::validate_album_name(AlbumName::now().as_str()).is_ok());
    }

    #[test]
    fn test_album_name_same_second_collides() {
        assert_eq!(
            AlbumName::from_timestamp(at(9, 5, 7)),
            AlbumName::from_timestamp(at(9, 5, 7))
        );
    }

    #[tokio::test]
    async fn test_memory_store_requires_existing_album() {
        let store = MemoryAlbumStore::new();
        assert!(matches!(
            store.add_image(&picked("a"), "20240101_120000").await,
            Err(AppError::AlbumNotFound { .. })
        ));

        store.create_album("20240101_120000").await.unwrap();
        store.add_image(&picked("a"), "20240101_120000").await.unwrap();
        assert_eq!(
            store.assets_in("20240101_120000"),
            Some(vec!["a".to_string()])
        );
    }

    #[tokio::test]
    async fn test_memory_store_allows_duplicate_titles() {
        let store = MemoryAlbumStore::new();
        store.create_album("dup").await.unwrap();
        store.create_album("dup").await.unwrap();
        store.add_image(&picked("a"), "dup").await.unwrap();

        assert_eq!(
            store.collections(),
            vec![("dup".to_string(), 1), ("dup".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_populate_album_reports_each_insert() {
        let store = Arc::new(MemoryAlbumStore::new());
        let name = AlbumName::from_timestamp(at(12, 0, 0));

        let report = populate_album(
            store.clone(),
            name.clone(),
            vec![picked("a"), picked("b")],
        )
        .await;

        assert!(report.created.is_ok());
        assert_eq!(report.added_count(), 2);
        assert_eq!(
            store.assets_in(name.as_str()),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[tokio::test]
    async fn test_directory_store_writes_jpegs() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryAlbumStore::new(dir.path().join("library"));

        assert!(matches!(
            store.add_image(&picked("a"), "20240101_120000").await,
            Err(AppError::AlbumNotFound { .. })
        ));

        store.create_album("20240101_120000").await.unwrap();
        // Existing directory is reused rather than failing
        store.create_album("20240101_120000").await.unwrap();
        store.add_image(&picked("a"), "20240101_120000").await.unwrap();
        store.add_image(&picked("b"), "20240101_120000").await.unwrap();

        let album_dir = store.root().join("20240101_120000");
        let files: Vec<_> = std::fs::read_dir(&album_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 2);
        for file in files {
            assert_eq!(file.extension().unwrap(), "jpg");
            assert!(image::open(&file).is_ok());
        }
    }

    #[tokio::test]
    async fn test_directory_store_lookup_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryAlbumStore::new(dir.path());
        store.create_album("20240101_120000").await.unwrap();

        assert!(matches!(
            store.add_image(&picked("a"), "20240101_12000").await,
            Err(AppError::AlbumNotFound { .. })
        ));
    }
}
