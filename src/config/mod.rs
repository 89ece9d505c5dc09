use crate::utils::validation::MAX_FILE_SIZE;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_WORKER_COMMAND: &str = "python3 auto_apply.py";

/// Ingestion and dispatch configuration
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Flat directory holding every uploaded CV (default: "downloads")
    pub storage_dir: PathBuf,

    /// Working directory of dispatched workers (default: ".")
    pub project_root: PathBuf,

    /// Worker program followed by its fixed arguments; the stored file path
    /// is appended as the last argument (default: "python3 auto_apply.py")
    pub worker_command: Vec<String>,

    /// Maximum upload size in bytes, exclusive (default: 10 MiB)
    pub max_file_size: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("downloads"),
            project_root: PathBuf::from("."),
            worker_command: split_command(DEFAULT_WORKER_COMMAND),
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl IntakeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            storage_dir: env::var("STORAGE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.storage_dir),

            project_root: env::var("PROJECT_ROOT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.project_root),

            worker_command: env::var("WORKER_COMMAND")
                .ok()
                .map(|v| split_command(&v))
                .filter(|parts| !parts.is_empty())
                .unwrap_or(default.worker_command),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),
        }
    }

    pub fn worker_program(&self) -> &str {
        self.worker_command
            .first()
            .map(String::as_str)
            .unwrap_or("python3")
    }

    pub fn worker_args(&self) -> &[String] {
        self.worker_command.get(1..).unwrap_or(&[])
    }
}

fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
