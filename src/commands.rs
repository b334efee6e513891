use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::album_store::{AlbumReport, AlbumStore, DirectoryAlbumStore, MemoryAlbumStore};
use crate::config::{self, Config};
use crate::controller::{Dispatch, SelectionController};
use crate::errors::{AppError, AppResult};
use crate::image_processor::{JpegEncoder, PREVIEW_DIMENSION};
use crate::media_source::FileMediaSource;
use crate::uploader::HttpUploader;

/// Tally of finished upload jobs, for the command line only. The controller
/// itself never aggregates.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub picked: usize,
    pub requests: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumSummary {
    pub picked: usize,
    pub album: Option<String>,
    pub created: bool,
    pub added: usize,
}

impl From<&AlbumReport> for AlbumSummary {
    fn from(report: &AlbumReport) -> Self {
        Self {
            picked: report.added.len(),
            album: Some(report.name.to_string()),
            created: report.created.is_ok(),
            added: report.added_count(),
        }
    }
}

/// Load the config at `config_path`, or replace it with defaults first when
/// `reset` is set. Resetting never reads the old file, so it also repairs one
/// that fails validation.
pub fn load_or_reset_config(config_path: &Path, reset: bool) -> AppResult<Config> {
    if reset {
        config::reset_config_at(config_path)
    } else {
        config::load_config_from(config_path)
    }
}

/// Wire the production collaborators for a pick of `paths`.
pub fn build_controller(
    config: &Config,
    paths: Vec<PathBuf>,
    album_store: Arc<dyn AlbumStore>,
) -> AppResult<SelectionController> {
    let uploader = HttpUploader::from_config(config)?;

    Ok(SelectionController::new(
        Arc::new(FileMediaSource::new(paths)),
        Arc::new(JpegEncoder),
        Arc::new(uploader),
        album_store,
    )
    .with_upload_mode(config.upload_mode))
}

/// Pick everything and log the preview strip.
async fn pick_all(controller: &mut SelectionController) -> AppResult<usize> {
    controller.begin_pick()?;
    controller.finish_picks().await;

    for (image, preview) in controller
        .selection()
        .iter()
        .zip(controller.previews(PREVIEW_DIMENSION))
    {
        log::info!(
            "Selected {} (preview {}x{})",
            image.source(),
            preview.width(),
            preview.height()
        );
    }

    Ok(controller.selection().len())
}

/// Pick, confirm and upload; then wait for the jobs so the process does not
/// exit underneath them.
pub async fn run_upload(config: &Config, paths: Vec<PathBuf>) -> AppResult<UploadSummary> {
    // Uploads never reach the album store, so the library directory is not resolved
    let mut controller = build_controller(config, paths, Arc::new(MemoryAlbumStore::new()))?;
    let picked = pick_all(&mut controller).await?;

    let mut summary = UploadSummary {
        picked,
        ..UploadSummary::default()
    };

    if !controller.request_upload_confirmation() {
        log::warn!("No images could be loaded; nothing to upload");
        return Ok(summary);
    }

    let handles = match controller.confirm() {
        Dispatch::Uploads(handles) => handles,
        other => {
            return Err(AppError::Internal(format!(
                "Upload confirmation dispatched {:?}",
                other
            )))
        }
    };

    summary.requests = handles.len();
    for handle in handles {
        match handle.await {
            Ok(report) if report.is_success() => summary.succeeded += 1,
            Ok(_) => summary.failed += 1,
            Err(e) => {
                log::error!("Upload task panicked: {}", e);
                summary.failed += 1;
            }
        }
    }

    log::info!(
        "Upload finished: {} request(s), {} succeeded, {} failed",
        summary.requests,
        summary.succeeded,
        summary.failed
    );
    Ok(summary)
}

/// Pick, confirm and copy into a fresh timestamped album.
pub async fn run_album(config: &Config, paths: Vec<PathBuf>) -> AppResult<AlbumSummary> {
    let album_store = DirectoryAlbumStore::new(config.library_dir()?);
    let mut controller = build_controller(config, paths, Arc::new(album_store))?;
    let picked = pick_all(&mut controller).await?;

    let empty = AlbumSummary {
        picked,
        album: None,
        created: false,
        added: 0,
    };

    if !controller.request_album_confirmation() {
        log::warn!("No images could be loaded; no album created");
        return Ok(empty);
    }

    let handle = match controller.confirm() {
        Dispatch::Album(Some(handle)) => handle,
        Dispatch::Album(None) => return Ok(empty),
        other => {
            return Err(AppError::Internal(format!(
                "Album confirmation dispatched {:?}",
                other
            )))
        }
    };

    let report = handle
        .await
        .map_err(|e| AppError::Internal(format!("Album task panicked: {}", e)))?;
    controller.acknowledge();

    let summary = AlbumSummary::from(&report);
    log::info!(
        "Album {} holds {}/{} image(s)",
        report.name,
        summary.added,
        summary.picked
    );
    Ok(summary)
}
