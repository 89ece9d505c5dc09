use crate::utils::file_size::FileSizeUtils;
use crate::utils::validation::{self, ACCEPTED_HINT, MIME_DOCX, MIME_PDF, ValidationError};
use anyhow::Context;
use bytes::Bytes;
use std::collections::VecDeque;
use std::path::Path;

/// How many history entries the "recent uploads" view shows
pub const RECENT_LIMIT: usize = 3;

/// A file offered by pick or drop, before validation
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl Candidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, detecting its type from content and falling
    /// back to the extension
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;
        let mime_type = detect_mime(&name, &bytes);

        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "docx" => Some(MIME_DOCX),
        _ => None,
    }
}

/// DOCX is a ZIP container, so a bare `application/zip` sniff defers to the extension
pub fn detect_mime(name: &str, bytes: &[u8]) -> String {
    let sniffed = infer::get(bytes).map(|kind| kind.mime_type());
    match sniffed {
        Some(mime_type) if mime_type != "application/zip" => mime_type.to_string(),
        _ => mime_from_extension(name)
            .or(sniffed)
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
            .to_string(),
    }
}

/// The single file held client-side awaiting submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub size_bytes: usize,
    pub mime_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub name: String,
    pub size_bytes: usize,
}

impl UploadRecord {
    pub fn size_label(&self) -> String {
        FileSizeUtils::format_size(self.size_bytes as u64)
    }
}

#[derive(Debug, Default)]
pub struct FileAcceptor {
    staged: Option<StagedFile>,
    history: VecDeque<UploadRecord>,
    error: Option<ValidationError>,
}

impl FileAcceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `candidate` and stages it in place of any previous file.
    /// On failure the previous staged file is kept and the error is retained
    /// for display.
    pub fn select(&mut self, candidate: Candidate) -> Result<&StagedFile, ValidationError> {
        if let Err(e) = validation::validate_candidate(&candidate.mime_type, candidate.size()) {
            self.error = Some(e.clone());
            return Err(e);
        }

        let staged = StagedFile {
            size_bytes: candidate.size(),
            name: candidate.name,
            mime_type: candidate.mime_type,
            bytes: candidate.bytes,
        };

        self.error = None;
        self.history.push_front(UploadRecord {
            name: staged.name.clone(),
            size_bytes: staged.size_bytes,
        });

        Ok(self.staged.insert(staged))
    }

    /// Drop entry point: only the first dropped file is considered; an empty
    /// drop changes nothing
    pub fn select_first<I>(&mut self, candidates: I) -> Option<Result<&StagedFile, ValidationError>>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let first = candidates.into_iter().next()?;
        Some(self.select(first))
    }

    /// Clears the staged file and any error; history is kept
    pub fn remove(&mut self) {
        self.staged = None;
        self.error = None;
    }

    pub fn staged(&self) -> Option<&StagedFile> {
        self.staged.as_ref()
    }

    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    /// Most recent first
    pub fn history(&self) -> impl Iterator<Item = &UploadRecord> {
        self.history.iter()
    }

    pub fn recent(&self) -> impl Iterator<Item = &UploadRecord> {
        self.history.iter().take(RECENT_LIMIT)
    }

    /// Text shown under the drop zone
    pub fn hint(&self) -> String {
        match &self.error {
            Some(e) => e.to_string(),
            None => ACCEPTED_HINT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::MAX_FILE_SIZE;

    fn pdf(name: &str, size: usize) -> Candidate {
        Candidate::new(name, MIME_PDF, vec![b'x'; size])
    }

    #[test]
    fn test_select_stages_and_records() {
        let mut acceptor = FileAcceptor::new();
        let staged = acceptor.select(pdf("resume.pdf", 2048)).unwrap();

        assert_eq!(staged.name, "resume.pdf");
        assert_eq!(staged.size_bytes, 2048);
        assert_eq!(acceptor.history().count(), 1);
        assert_eq!(acceptor.hint(), ACCEPTED_HINT);
    }

    #[test]
    fn test_new_selection_replaces_staged_file() {
        let mut acceptor = FileAcceptor::new();
        acceptor.select(pdf("old.pdf", 10)).unwrap();
        acceptor
            .select(Candidate::new("new.docx", MIME_DOCX, vec![0u8; 20]))
            .unwrap();

        let staged = acceptor.staged().unwrap();
        assert_eq!(staged.name, "new.docx");
        assert_eq!(staged.mime_type, MIME_DOCX);

        let names: Vec<&str> = acceptor.history().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["new.docx", "old.pdf"]);
    }

    #[test]
    fn test_rejection_preserves_prior_state() {
        let mut acceptor = FileAcceptor::new();
        acceptor.select(pdf("keep.pdf", 100)).unwrap();

        let err = acceptor
            .select(Candidate::new("notes.txt", "text/plain", vec![b'a'; 1000]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidType { .. }));

        let err = acceptor.select(pdf("huge.pdf", MAX_FILE_SIZE)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));

        assert_eq!(acceptor.staged().unwrap().name, "keep.pdf");
        assert_eq!(acceptor.history().count(), 1);
        assert_eq!(acceptor.hint(), "File too large");
    }

    #[test]
    fn test_size_threshold() {
        let mut acceptor = FileAcceptor::new();
        let mib = 1024 * 1024;

        assert!(acceptor.select(pdf("under.pdf", 9 * mib + 9 * mib / 10)).is_ok());
        assert!(acceptor.select(pdf("over.pdf", 10 * mib + mib / 10)).is_err());
        assert_eq!(acceptor.staged().unwrap().name, "under.pdf");
    }

    #[test]
    fn test_select_first_of_drop() {
        let mut acceptor = FileAcceptor::new();
        assert!(acceptor.select_first(Vec::<Candidate>::new()).is_none());
        assert!(acceptor.staged().is_none());

        let result = acceptor.select_first(vec![pdf("a.pdf", 1), pdf("b.pdf", 1)]);
        assert_eq!(result.unwrap().unwrap().name, "a.pdf");
        assert_eq!(acceptor.history().count(), 1);
    }

    #[test]
    fn test_remove_keeps_history() {
        let mut acceptor = FileAcceptor::new();
        acceptor.select(pdf("cv.pdf", 5)).unwrap();
        let _ = acceptor.select(Candidate::new("x.png", "image/png", vec![1u8]));

        acceptor.remove();

        assert!(acceptor.staged().is_none());
        assert!(acceptor.error().is_none());
        assert_eq!(acceptor.history().count(), 1);
    }

    #[test]
    fn test_recent_shows_three() {
        let mut acceptor = FileAcceptor::new();
        for i in 0..5 {
            acceptor.select(pdf(&format!("cv-{}.pdf", i), 1536)).unwrap();
        }

        let recent: Vec<&UploadRecord> = acceptor.recent().collect();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].name, "cv-4.pdf");
        assert_eq!(recent[0].size_label(), "1.5 KB");
    }

    #[test]
    fn test_detect_mime() {
        assert_eq!(detect_mime("cv.pdf", b"%PDF-1.7\n..."), MIME_PDF);
        assert_eq!(detect_mime("CV.DOCX", b"PK\x03\x04rest-of-zip"), MIME_DOCX);
        assert_eq!(detect_mime("cv.pdf", b"plain text"), MIME_PDF);
        assert_eq!(detect_mime("notes", b"plain text"), "application/octet-stream");
        assert_eq!(detect_mime("photo.pdf", b"\x89PNG\r\n\x1a\n0000"), "image/png");
    }

    #[tokio::test]
    async fn test_candidate_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();

        let candidate = Candidate::from_path(&path).await.unwrap();
        assert_eq!(candidate.name, "resume.pdf");
        assert_eq!(candidate.mime_type, MIME_PDF);
        assert_eq!(candidate.size(), 13);
    }
}
