use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;
use tokio::sync::mpsc;

use crate::errors::{AppError, AppResult};
use crate::image_processor;

/// A decoded image the user picked, shared cheaply between the selection and
/// the background jobs that encode or store it.
#[derive(Debug, Clone)]
pub struct PickedImage {
    source: String,
    pixels: Arc<DynamicImage>,
}

impl PickedImage {
    pub fn new(source: impl Into<String>, pixels: DynamicImage) -> Self {
        Self {
            source: source.into(),
            pixels: Arc::new(pixels),
        }
    }

    /// Where the image came from, for logs.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }
}

/// One item resolving out of a pick.
#[derive(Debug)]
pub enum PickEvent {
    Ready(PickedImage),
    Failed { source: String, reason: AppError },
}

/// Where a media source delivers its results. The pick is over once every
/// clone of the sink has been dropped.
pub type PickSink = mpsc::UnboundedSender<PickEvent>;

/// The user's photo library, seen as something that can be asked for a
/// selection.
pub trait MediaSource: Send + Sync {
    /// Start a pick and return immediately. Items are loaded independently
    /// and may reach `sink` in any order.
    fn request_selection(&self, sink: PickSink) -> AppResult<()>;
}

/// Picks a fixed list of files from disk, decoding each on the blocking pool.
#[derive(Debug, Clone)]
pub struct FileMediaSource {
    paths: Vec<PathBuf>,
}

impl FileMediaSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl MediaSource for FileMediaSource {
    fn request_selection(&self, sink: PickSink) -> AppResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Internal(format!("No async runtime for picking: {}", e)))?;

        log::info!("Loading {} picked file(s)", self.paths.len());

        for path in &self.paths {
            let path = path.clone();
            let sink = sink.clone();

            runtime.spawn(async move {
                let source = path.to_string_lossy().to_string();
                let decode_path = path.clone();

                let event =
                    match tokio::task::spawn_blocking(move || image_processor::load_image(&decode_path))
                        .await
                    {
                        Ok(Ok(image)) => PickEvent::Ready(image),
                        Ok(Err(reason)) => PickEvent::Failed { source, reason },
                        Err(e) => PickEvent::Failed {
                            source,
                            reason: AppError::Internal(format!("Decode task failed: {}", e)),
                        },
                    };

                if sink.send(event).is_err() {
                    log::debug!(
                        "Dropping pick for {} - selection was replaced",
                        path.display()
                    );
                }
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[tokio::test]
    async fn test_file_media_source_streams_every_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]))
            .save(&good)
            .unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not really a png").unwrap();

        let source = FileMediaSource::new(vec![good.clone(), bad.clone()]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        source.request_selection(tx).unwrap();

        let mut ready = Vec::new();
        let mut failed = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                PickEvent::Ready(image) => ready.push(image),
                PickEvent::Failed { source, .. } => failed.push(source),
            }
        }

        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].dimensions(), (3, 2));
        assert_eq!(ready[0].source(), good.to_string_lossy());
        assert_eq!(failed, vec![bad.to_string_lossy().to_string()]);
    }

    #[test]
    fn test_file_media_source_needs_runtime() {
        let source = FileMediaSource::new(vec![PathBuf::from("a.png")]);
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            source.request_selection(tx),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_picked_image_clones_share_pixels() {
        let image = PickedImage::new("a", DynamicImage::new_rgb8(4, 4));
        let copy = image.clone();
        assert!(std::ptr::eq(image.pixels(), copy.pixels()));
        assert_eq!(copy.source(), "a");
    }
}
