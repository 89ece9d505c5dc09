use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME types a CV may be submitted as
pub const ALLOWED_MIMES: [&str; 2] = [MIME_PDF, MIME_DOCX];

/// Maximum file size: 10 MiB (exclusive)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Longest filename accepted as a storage key, in bytes
pub const MAX_FILENAME_LEN: usize = 255;

pub const ACCEPTED_HINT: &str = "Accepted: PDF or DOCX, up to 10 MB";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid file type")]
    InvalidType { mime_type: String },

    #[error("File too large")]
    TooLarge { size: usize, max_size: usize },

    #[error("Invalid filename")]
    InvalidFilename { filename: String },
}

/// Strips MIME parameters and lowercases the essence (`Application/PDF; x=y` -> `application/pdf`)
pub fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Validates MIME type against the CV allowlist
pub fn validate_mime_type(content_type: &str) -> Result<(), ValidationError> {
    let normalized = normalize_mime(content_type);

    if ALLOWED_MIMES.iter().any(|allowed| *allowed == normalized) {
        return Ok(());
    }

    Err(ValidationError::InvalidType {
        mime_type: content_type.to_string(),
    })
}

/// Validates file size; a file of exactly `max_size` bytes is already too large
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ValidationError> {
    if size >= max_size {
        return Err(ValidationError::TooLarge { size, max_size });
    }
    Ok(())
}

/// Checks that a client-supplied filename can be used verbatim as a key in the
/// flat storage directory. Unsafe names are rejected, not rewritten.
pub fn validate_filename(filename: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidFilename {
        filename: filename.to_string(),
    };

    if filename.is_empty() || filename == "." || filename == ".." {
        return Err(invalid());
    }

    if filename.len() > MAX_FILENAME_LEN {
        return Err(invalid());
    }

    if filename
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        tracing::warn!("Rejected unsafe filename: {:?}", filename);
        return Err(invalid());
    }

    Ok(())
}

/// Client-side policy: type first, then size
pub fn validate_candidate(mime_type: &str, size: usize) -> Result<(), ValidationError> {
    validate_mime_type(mime_type)?;
    validate_file_size(size, MAX_FILE_SIZE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    #[test]
    fn test_validate_mime_type() {
        assert!(validate_mime_type("application/pdf").is_ok());
        assert!(validate_mime_type(MIME_DOCX).is_ok());
        assert!(validate_mime_type("Application/PDF; charset=binary").is_ok());

        assert!(matches!(
            validate_mime_type("text/plain"),
            Err(ValidationError::InvalidType { .. })
        ));
        // Legacy .doc is not accepted
        assert!(validate_mime_type("application/msword").is_err());
        assert!(validate_mime_type("").is_err());
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(1024, MAX_FILE_SIZE).is_ok());
        assert!(validate_file_size(MAX_FILE_SIZE - 1, MAX_FILE_SIZE).is_ok());
        assert!(validate_file_size(MAX_FILE_SIZE, MAX_FILE_SIZE).is_err());
        assert!(validate_file_size(MAX_FILE_SIZE + 1, MAX_FILE_SIZE).is_err());
    }

    #[test]
    fn test_validate_candidate_thresholds() {
        let just_under = (9.9 * MIB as f64) as usize;
        let just_over = (10.1 * MIB as f64) as usize;

        assert!(validate_candidate(MIME_PDF, just_under).is_ok());
        assert_eq!(
            validate_candidate(MIME_PDF, just_over),
            Err(ValidationError::TooLarge {
                size: just_over,
                max_size: MAX_FILE_SIZE
            })
        );
        assert!(matches!(
            validate_candidate("text/plain", 1000),
            Err(ValidationError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_type_is_checked_before_size() {
        let err = validate_candidate("image/png", 20 * MIB).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidType { .. }));
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("resume.pdf").is_ok());
        assert!(validate_filename("Jane Doe - CV (2024).docx").is_ok());
        assert!(validate_filename("lebenslauf_müller.pdf").is_ok());
        assert!(validate_filename("..resume.pdf").is_ok());

        // Path traversal
        assert!(validate_filename("../../etc/passwd").is_err());
        assert!(validate_filename("..\\..\\windows\\system32").is_err());
        assert!(validate_filename("nested/resume.pdf").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename(".").is_err());

        assert!(validate_filename("").is_err());
        assert!(validate_filename("bad\0name.pdf").is_err());
        assert!(validate_filename(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            validate_mime_type("text/plain").unwrap_err().to_string(),
            "Invalid file type"
        );
        assert_eq!(
            validate_file_size(MAX_FILE_SIZE, MAX_FILE_SIZE)
                .unwrap_err()
                .to_string(),
            "File too large"
        );
    }
}
