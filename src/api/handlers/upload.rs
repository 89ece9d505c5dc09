use crate::AppState;
use crate::api::error::AppError;
use crate::models::UploadReceipt;
use crate::services::storage::StoredFile;
use crate::utils::validation::{validate_filename, validate_mime_type};
use axum::{
    Json,
    extract::{Multipart, State},
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use tracing::{info, warn};

/// Multipart field carrying the CV
pub const FILE_FIELD: &str = "file";

/// Reads and discards whatever is left of the body. Errors only end the drain.
async fn drain(multipart: &mut Multipart) {
    while let Ok(Some(mut field)) = multipart.next_field().await {
        while let Ok(Some(_)) = field.chunk().await {}
    }
}

#[utoipa::path(
    post,
    path = "/api/upload-cv",
    request_body(content = crate::models::UploadCvForm, description = "CV upload", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored and worker dispatched", body = UploadReceipt),
        (status = 400, description = "No file, invalid type or unsafe filename", body = crate::models::ErrorResponse),
        (status = 413, description = "File too large", body = crate::models::ErrorResponse)
    ),
    tag = "cv"
)]
pub async fn upload_cv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, AppError> {
    let result: Result<StoredFile, AppError> = async {
        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            let Some(filename) = field.file_name().map(str::to_string) else {
                continue;
            };
            let content_type = field
                .content_type()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
                .to_string();

            // 1. Policy checks, before anything touches the disk
            validate_mime_type(&content_type)?;
            validate_filename(&filename)?;

            // 2. Stream to storage. Once the rename is done the upload stands,
            // so later parts are never parsed for errors.
            let reader = StreamReader::new(field.map_err(std::io::Error::other));
            return Ok(state
                .storage
                .store_stream(&filename, Box::pin(reader), state.config.max_file_size)
                .await?);
        }

        Err(AppError::BadRequest("No file uploaded".to_string()))
    }
    .await;

    match result {
        Ok(stored) => {
            // Fire and forget: the response does not depend on the worker
            let handle = state.dispatcher.dispatch(&stored.path);
            info!(
                file = %stored.path.display(),
                size = stored.size,
                worker_launched = handle.is_launched(),
                "📄 CV stored"
            );

            // Trailing parts are ignored, malformed or not
            drain(&mut multipart).await;

            Ok(Json(UploadReceipt {
                success: true,
                message: "File uploaded and script triggered".to_string(),
                file_path: stored.path.to_string_lossy().into_owned(),
            }))
        }
        Err(e) => {
            // Drain the rest of the body so the client gets the error instead of a reset
            warn!("Upload rejected: {}. Consuming remaining stream...", e);
            drain(&mut multipart).await;
            Err(e)
        }
    }
}
