//! Headless state of the upload / preset / results workflow.
//!
//! A session holds at most one selected file and one result. Every user
//! visible outcome is pushed to the notification channel handed out by
//! [`CompressionSession::new`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::errors::{DomainError, ServiceError, ServiceResult, ValidationError};
use super::service::CompressionService;
use super::types::{CompressionResult, Notification, Preset, SessionMode, SourceFile};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Default)]
struct SessionState {
    selected_file: Option<Arc<SourceFile>>,
    preset: Preset,
    result: Option<Arc<CompressionResult>>,
}

pub struct CompressionSession {
    service: Arc<dyn CompressionService>,
    mode: SessionMode,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
    notifications: mpsc::UnboundedSender<Notification>,
}

/// Clears the in-flight flag when the compression call ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CompressionSession {
    pub fn new(
        service: Arc<dyn CompressionService>,
        mode: SessionMode,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            service,
            mode,
            state: Mutex::new(SessionState::default()),
            in_flight: AtomicBool::new(false),
            notifications: tx,
        };
        (session, rx)
    }

    fn notify(&self, notification: Notification) {
        // Nobody listening is fine
        let _ = self.notifications.send(notification);
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn preset(&self) -> Preset {
        self.state.lock().await.preset
    }

    pub async fn selected_file(&self) -> Option<Arc<SourceFile>> {
        self.state.lock().await.selected_file.clone()
    }

    pub async fn result(&self) -> Option<Arc<CompressionResult>> {
        self.state.lock().await.result.clone()
    }

    /// Select a file. Files outside the session's mode are rejected and
    /// leave the state untouched; an accepted file clears any old result.
    pub async fn select_file(&self, file: SourceFile) -> ServiceResult<()> {
        if !self.mode.accepts(file.category()) {
            log::debug!("Rejected {} ({}) in {} mode", file.name, file.mime_type, self.mode.as_str());
            self.notify(Notification::error("Invalid file type", self.mode.expected_description()));
            return Err(ServiceError::Domain(DomainError::UnsupportedFileType(file.mime_type)));
        }

        if file.data.is_empty() {
            self.notify(Notification::error("Invalid file", "The selected file is empty"));
            return Err(ServiceError::Domain(DomainError::Validation(
                ValidationError::custom("File is empty")
            )));
        }

        let description = format!("{} ({:.2} MB)", file.name, file.size() as f64 / BYTES_PER_MB);
        {
            let mut state = self.state.lock().await;
            state.selected_file = Some(Arc::new(file));
            state.result = None;
        }
        self.notify(Notification::info("File selected", description));
        Ok(())
    }

    pub async fn select_preset(&self, preset: Preset) {
        self.state.lock().await.preset = preset;
    }

    /// Drop the selected file and any result
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.selected_file = None;
        state.result = None;
    }

    /// Compress the selected file with the selected preset.
    pub async fn compress(&self) -> ServiceResult<Arc<CompressionResult>> {
        let (file, preset) = {
            let state = self.state.lock().await;
            (state.selected_file.clone(), state.preset)
        };

        let file = match file {
            Some(file) => file,
            None => {
                self.notify(Notification::error("No file selected", "Please select a file to compress"));
                return Err(ServiceError::Domain(DomainError::Validation(ValidationError::required("file"))));
            }
        };

        if self.in_flight.swap(true, Ordering::SeqCst) {
            log::debug!("Ignoring compress request while another is in flight");
            return Err(ServiceError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        match self.service.compress_file(&file, preset).await {
            Ok(result) => {
                let result = Arc::new(result);
                let still_selected = {
                    let mut state = self.state.lock().await;
                    // A newer selection made while we were busy wins
                    let still_selected = state
                        .selected_file
                        .as_ref()
                        .map(|current| Arc::ptr_eq(current, &file))
                        .unwrap_or(false);
                    if still_selected {
                        state.result = Some(result.clone());
                    }
                    still_selected
                };
                if still_selected {
                    self.notify(Notification::success(
                        "Compression successful!",
                        format!("File compressed by {:.1}%", result.compression_ratio),
                    ));
                } else {
                    log::debug!("Discarding result for {}: selection changed", file.name);
                    self.notify(Notification::info(
                        "Result discarded",
                        format!("{} is no longer selected", file.name),
                    ));
                }
                Ok(result)
            }
            Err(e) => {
                log::warn!("Compression of {} failed: {}", file.name, e);
                self.notify(Notification::error("Compression failed", e.user_message()));
                Err(e)
            }
        }
    }

    /// Write the current result to `dir/<result file name>` and return the path.
    pub async fn save_result(&self, dir: impl AsRef<Path>) -> ServiceResult<PathBuf> {
        let result = match self.result().await {
            Some(result) => result,
            None => {
                self.notify(Notification::error("Nothing to download", "Compress a file first"));
                return Err(ServiceError::Ui("No compression result to save".to_string()));
            }
        };

        let path = dir.as_ref().join(&result.file_name);
        if let Err(e) = tokio::fs::write(&path, &result.data).await {
            log::error!("Failed to write {}: {}", path.display(), e);
            self.notify(Notification::error("Download failed", format!("Could not write {}", result.file_name)));
            return Err(ServiceError::Domain(DomainError::from(e)));
        }

        self.notify(Notification::info("Download started", format!("Downloading {}", result.file_name)));
        Ok(path)
    }

    /// Decompression is not available yet.
    pub async fn decompress(&self) -> ServiceResult<()> {
        self.notify(Notification::info("Coming soon", "Decompression is coming soon"));
        Err(ServiceError::NotImplemented("Decompression is coming soon".to_string()))
    }
}
