use crate::client::acceptor::StagedFile;
use crate::models::UploadReceipt;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use url::Url;

pub const UPLOAD_PATH: &str = "api/upload-cv";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("upload endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("upload endpoint answered with status {0}")]
    Status(u16),

    #[error("could not build upload request: {0}")]
    InvalidRequest(String),
}

/// Sends one staged file to the ingestion endpoint. One call is one request.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn send(&self, file: &StagedFile) -> Result<UploadReceipt, NetworkError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl ReqwestTransport {
    /// `base_url` is the server root, e.g. `http://localhost:8080`
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base =
            Url::parse(base_url).with_context(|| format!("Invalid server URL: {}", base_url))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(UPLOAD_PATH)
            .context("Failed to build upload URL")?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl UploadTransport for ReqwestTransport {
    async fn send(&self, file: &StagedFile) -> Result<UploadReceipt, NetworkError> {
        let part = Part::stream_with_length(file.bytes.clone(), file.size_bytes as u64)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Upload rejected with {}: {}", status, body);
            return Err(NetworkError::Status(status.as_u16()));
        }

        // A 2xx is a success even if the body is not the expected receipt
        match response.json::<UploadReceipt>().await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                tracing::warn!("Upload succeeded but the receipt was unreadable: {}", e);
                Ok(UploadReceipt {
                    success: true,
                    message: String::new(),
                    file_path: String::new(),
                })
            }
        }
    }
}
