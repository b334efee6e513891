//! Selection state and the user intents that act on it.
//!
//! The controller is the only writer of the selection. Media sources, upload
//! jobs and album jobs run elsewhere and talk back through channels or join
//! handles, never by touching the selection directly.

use chrono::{Local, NaiveDateTime};
use image::DynamicImage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;

use crate::album_store::{populate_album, AlbumName, AlbumReport, AlbumStore};
use crate::config::UploadMode;
use crate::errors::AppResult;
use crate::image_processor::{generate_thumbnail, Encoder};
use crate::media_source::{MediaSource, PickEvent, PickedImage};
use crate::uploader::{dispatch_batch_upload, dispatch_form_uploads, plan_jobs, UploadReport, Uploader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Picking,
    HasSelection,
    Uploading,
    AlbumCreating,
    ConfirmationShown,
}

/// Confirmation the user is being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDialog {
    Upload,
    Album,
}

/// Work started by confirming a dialog.
#[derive(Debug)]
pub enum Dispatch {
    Uploads(Vec<JoinHandle<UploadReport>>),
    Album(Option<JoinHandle<AlbumReport>>),
    Nothing,
}

pub struct SelectionController {
    media_source: Arc<dyn MediaSource>,
    encoder: Arc<dyn Encoder>,
    uploader: Arc<dyn Uploader>,
    album_store: Arc<dyn AlbumStore>,
    upload_mode: UploadMode,
    selection: Vec<PickedImage>,
    state: ControllerState,
    pending_dialog: Option<PendingDialog>,
    picks: Option<mpsc::UnboundedReceiver<PickEvent>>,
}

impl SelectionController {
    pub fn new(
        media_source: Arc<dyn MediaSource>,
        encoder: Arc<dyn Encoder>,
        uploader: Arc<dyn Uploader>,
        album_store: Arc<dyn AlbumStore>,
    ) -> Self {
        Self {
            media_source,
            encoder,
            uploader,
            album_store,
            upload_mode: UploadMode::default(),
            selection: Vec::new(),
            state: ControllerState::Idle,
            pending_dialog: None,
            picks: None,
        }
    }

    pub fn with_upload_mode(mut self, upload_mode: UploadMode) -> Self {
        self.upload_mode = upload_mode;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn selection(&self) -> &[PickedImage] {
        &self.selection
    }

    pub fn pending_dialog(&self) -> Option<PendingDialog> {
        self.pending_dialog
    }

    /// True while the current pick can still deliver images.
    pub fn is_picking(&self) -> bool {
        self.picks.is_some()
    }

    /// Thumbnails in selection order.
    pub fn previews(&self, max_dimension: u32) -> Vec<DynamicImage> {
        self.selection
            .iter()
            .map(|image| generate_thumbnail(image, max_dimension))
            .collect()
    }

    /// Clear the selection and ask the media source for a new one.
    ///
    /// Anything still arriving from an earlier pick is discarded.
    pub fn begin_pick(&mut self) -> AppResult<()> {
        self.selection.clear();
        self.pending_dialog = None;

        let (sink, picks) = mpsc::unbounded_channel();
        self.picks = Some(picks);
        self.state = ControllerState::Picking;

        if let Err(e) = self.media_source.request_selection(sink) {
            log::error!("Failed to start picking: {}", e);
            self.picks = None;
            self.state = ControllerState::Idle;
            return Err(e);
        }

        log::info!("Picking started");
        Ok(())
    }

    /// Append whatever has arrived so far without waiting.
    pub fn drain_picks(&mut self) -> usize {
        let mut appended = 0;

        loop {
            let next = match self.picks.as_mut() {
                Some(picks) => picks.try_recv(),
                None => break,
            };

            match next {
                Ok(event) => appended += self.apply_pick(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.end_pick();
                    break;
                }
            }
        }

        appended
    }

    /// Append everything the current pick delivers until it ends.
    pub async fn finish_picks(&mut self) -> usize {
        let Some(mut picks) = self.picks.take() else {
            return 0;
        };

        let mut appended = 0;
        while let Some(event) = picks.recv().await {
            appended += self.apply_pick(event);
        }

        self.end_pick();
        appended
    }

    fn apply_pick(&mut self, event: PickEvent) -> usize {
        match event {
            PickEvent::Ready(image) => {
                log::debug!(
                    "Picked {} as item {}",
                    image.source(),
                    self.selection.len()
                );
                self.selection.push(image);
                if self.state == ControllerState::Picking {
                    self.state = ControllerState::HasSelection;
                }
                1
            }
            PickEvent::Failed { source, reason } => {
                log::warn!("Dropping picked item {}: {}", source, reason);
                0
            }
        }
    }

    fn end_pick(&mut self) {
        self.picks = None;
        if self.state == ControllerState::Picking {
            self.state = ControllerState::Idle;
        }
        log::info!("Picking finished with {} image(s)", self.selection.len());
    }

    /// Ask before uploading. Only offered when there is a selection.
    pub fn request_upload_confirmation(&mut self) -> bool {
        self.request_dialog(PendingDialog::Upload)
    }

    /// Ask before creating an album. Only offered when there is a selection.
    pub fn request_album_confirmation(&mut self) -> bool {
        self.request_dialog(PendingDialog::Album)
    }

    fn request_dialog(&mut self, dialog: PendingDialog) -> bool {
        self.drain_picks();

        if self.state != ControllerState::HasSelection {
            log::debug!("Ignoring {:?} request in state {:?}", dialog, self.state);
            return false;
        }

        self.pending_dialog = Some(dialog);
        true
    }

    /// Run whatever the pending dialog asked for.
    pub fn confirm(&mut self) -> Dispatch {
        match self.pending_dialog.take() {
            Some(PendingDialog::Upload) => Dispatch::Uploads(self.upload_selection()),
            Some(PendingDialog::Album) => Dispatch::Album(self.create_album()),
            None => Dispatch::Nothing,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(dialog) = self.pending_dialog.take() {
            log::debug!("{:?} dialog cancelled", dialog);
        }
    }

    /// Fan the selection out to the uploader and return to `HasSelection`
    /// without waiting on the network.
    pub fn upload_selection(&mut self) -> Vec<JoinHandle<UploadReport>> {
        self.drain_picks();

        if self.selection.is_empty() || self.state != ControllerState::HasSelection {
            log::debug!(
                "Nothing to upload ({} image(s), state {:?})",
                self.selection.len(),
                self.state
            );
            return Vec::new();
        }

        self.state = ControllerState::Uploading;
        let jobs = plan_jobs(&self.selection);
        let encoder = Arc::clone(&self.encoder);
        let uploader = Arc::clone(&self.uploader);

        let handles = match self.upload_mode {
            UploadMode::Form => dispatch_form_uploads(jobs, encoder, uploader),
            UploadMode::Multipart => vec![dispatch_batch_upload(jobs, encoder, uploader)],
        };

        self.state = ControllerState::HasSelection;
        handles
    }

    pub fn create_album(&mut self) -> Option<JoinHandle<AlbumReport>> {
        self.create_album_at(Local::now().naive_local())
    }

    /// Create an album named after `at` and copy the selection into it.
    ///
    /// Inserts wait for the create to finish; this call does not wait for
    /// either and moves straight to `ConfirmationShown`.
    pub fn create_album_at(&mut self, at: NaiveDateTime) -> Option<JoinHandle<AlbumReport>> {
        self.drain_picks();

        let ready = matches!(
            self.state,
            ControllerState::HasSelection | ControllerState::ConfirmationShown
        );
        if self.selection.is_empty() || !ready {
            log::debug!(
                "Nothing to put in an album ({} image(s), state {:?})",
                self.selection.len(),
                self.state
            );
            return None;
        }

        self.state = ControllerState::AlbumCreating;
        let name = AlbumName::from_timestamp(at);
        let handle = tokio::spawn(populate_album(
            Arc::clone(&self.album_store),
            name,
            self.selection.clone(),
        ));

        self.state = ControllerState::ConfirmationShown;
        Some(handle)
    }

    /// Dismiss the album confirmation and start over.
    pub fn acknowledge(&mut self) {
        if self.state == ControllerState::ConfirmationShown {
            self.selection.clear();
            self.state = ControllerState::Idle;
        }
    }
}
