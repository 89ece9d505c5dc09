use crate::client::acceptor::FileAcceptor;
use crate::client::notices::Notices;
use crate::client::transport::{NetworkError, UploadTransport};
use crate::models::UploadReceipt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

pub const MSG_NO_FILE: &str = "Please upload a file first";
pub const MSG_SUCCESS: &str = "File uploaded and script triggered successfully";
pub const MSG_REJECTED: &str = "Failed to upload file";
pub const MSG_UNREACHABLE: &str = "Error uploading file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Submitting,
    Success(UploadReceipt),
    Failed(NetworkError),
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Success(_) | UploadState::Failed(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("no file staged")]
    NoFileStaged,

    #[error("a submission is already in flight")]
    InFlight,

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Drives stage -> submit -> report. At most one submission is in flight;
/// further attempts are rejected, never queued.
pub struct UploadOrchestrator<T> {
    transport: T,
    notices: Arc<Notices>,
    submitting: AtomicBool,
    state: Mutex<UploadState>,
}

/// Releases the in-flight flag even if the submit future is dropped mid-request
struct InFlightGuard<'a> {
    submitting: &'a AtomicBool,
    state: &'a Mutex<UploadState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == UploadState::Submitting {
            *state = UploadState::Idle;
        }
        self.submitting.store(false, Ordering::Release);
    }
}

impl<T: UploadTransport> UploadOrchestrator<T> {
    pub fn new(transport: T, notices: Arc<Notices>) -> Self {
        Self {
            transport,
            notices,
            submitting: AtomicBool::new(false),
            state: Mutex::new(UploadState::Idle),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    fn set_state(&self, next: UploadState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Marks a terminal outcome as seen by the user, returning to `Idle`
    pub fn acknowledge(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            *state = UploadState::Idle;
        }
    }

    /// Submits the acceptor's staged file with exactly one request. The
    /// staged file and history are left untouched whatever the outcome.
    pub async fn submit(&self, acceptor: &FileAcceptor) -> Result<UploadReceipt, SubmitError> {
        let Some(file) = acceptor.staged().cloned() else {
            self.notices.error(MSG_NO_FILE);
            return Err(SubmitError::NoFileStaged);
        };

        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Ignoring submit of {}: upload already in flight", file.name);
            return Err(SubmitError::InFlight);
        }
        let _guard = InFlightGuard {
            submitting: &self.submitting,
            state: &self.state,
        };

        self.set_state(UploadState::Submitting);
        tracing::info!("📤 Submitting {} ({} bytes)", file.name, file.size_bytes);

        match self.transport.send(&file).await {
            Ok(receipt) => {
                self.set_state(UploadState::Success(receipt.clone()));
                self.notices.success(MSG_SUCCESS);
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", file.name, e);
                let message = match e {
                    NetworkError::Status(_) => MSG_REJECTED,
                    NetworkError::Unreachable(_) | NetworkError::InvalidRequest(_) => {
                        MSG_UNREACHABLE
                    }
                };
                self.set_state(UploadState::Failed(e.clone()));
                self.notices.error(message);
                Err(SubmitError::Network(e))
            }
        }
    }
}
