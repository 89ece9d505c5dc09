//! Client half of the pipeline: stage a CV locally, then submit it once.

pub mod acceptor;
pub mod notices;
pub mod orchestrator;
pub mod transport;

pub use acceptor::{Candidate, FileAcceptor, StagedFile, UploadRecord};
pub use notices::{Notice, NoticeKind, Notices};
pub use orchestrator::{SubmitError, UploadOrchestrator, UploadState};
pub use transport::{NetworkError, ReqwestTransport, UploadTransport};
