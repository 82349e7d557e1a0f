use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::{ensure_owner, CurrentUser},
    error::{ApiError, ApiResult},
    salesforce::{sf_record_id, Document},
    state::AppState,
};

use super::dto::DocumentListResponse;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/customer/:customer_id/documents", get(list_documents))
        .route(
            "/customer/:customer_id/documents/:document_id/download",
            get(download_document),
        )
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/customer/:customer_id/documents", post(upload_document))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[instrument(skip(state, current_user))]
pub async fn list_documents(
    State(state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<DocumentListResponse>> {
    ensure_owner(
        &current_user,
        &customer_id,
        "You can only access your own documents",
    )?;

    let documents = state.salesforce.get_documents(&customer_id).await?;
    Ok(Json(DocumentListResponse { documents }))
}

#[instrument(skip(state, current_user, multipart))]
pub async fn upload_document(
    State(state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    Path(customer_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    ensure_owner(
        &current_user,
        &customer_id,
        "You can only upload documents to your own account",
    )?;

    let mut file: Option<(String, Bytes)> = None;
    let mut document_type: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .unwrap_or_else(|| "upload.bin".into());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                file = Some((filename, data));
            }
            Some("document_type") => {
                document_type = field.text().await.ok();
            }
            _ => {}
        }
    }

    let Some((filename, data)) = file else {
        return Err(ApiError::BadRequest("file is required".into()));
    };
    if data.is_empty() {
        warn!(%customer_id, "empty upload rejected");
        return Err(ApiError::BadRequest("Uploaded file is empty".into()));
    }

    let document_id = sf_record_id("069");
    let stored = stored_file_path(&state.config.uploads_dir, &document_id, &filename);
    if let Some(parent) = stored.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
    }
    tokio::fs::write(&stored, &data)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    let document = Document {
        document_id: document_id.clone(),
        customer_id: customer_id.clone(),
        name: filename,
        doc_type: document_type.unwrap_or_else(|| "Document".into()),
        download_url: format!(
            "/customer/{}/documents/{}/download",
            customer_id, document_id
        ),
        created_date: Some(OffsetDateTime::now_utc()),
    };
    state.salesforce.append_document(&customer_id, &document).await?;

    info!(%customer_id, %document_id, size = data.len(), "document uploaded");
    Ok((StatusCode::CREATED, Json(document)))
}

#[instrument(skip(state, current_user))]
pub async fn download_document(
    State(state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    Path((customer_id, document_id)): Path<(String, String)>,
) -> ApiResult<(HeaderMap, Bytes)> {
    ensure_owner(
        &current_user,
        &customer_id,
        "You can only access your own documents",
    )?;

    let documents = state.salesforce.get_documents(&customer_id).await?;
    let Some(document) = documents.iter().find(|d| d.document_id == document_id) else {
        return Err(ApiError::NotFound("Document not found".into()));
    };

    let stored = stored_file_path(&state.config.uploads_dir, &document_id, &document.name);
    let data = match tokio::fs::read(&stored).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(%customer_id, %document_id, "document record has no stored file");
            return Err(ApiError::NotFound("Document file not found".into()));
        }
        Err(e) => return Err(ApiError::Internal(e.into())),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/octet-stream"),
    );
    if let Ok(disposition) =
        format!("attachment; filename=\"{}\"", document.name).parse::<header::HeaderValue>()
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok((headers, data))
}

/// Uploaded bytes land beside each other as `{document_id}-{filename}`;
/// the filename is reduced to its final path component first.
fn stored_file_path(uploads_dir: &str, document_id: &str, filename: &str) -> PathBuf {
    PathBuf::from(uploads_dir).join(format!("{}-{}", document_id, filename))
}

fn sanitize_filename(name: &str) -> String {
    FsPath::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload.bin".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("a/b/c.txt"), "c.txt");
    }

    #[test]
    fn sanitize_falls_back_on_empty_names() {
        assert_eq!(sanitize_filename(""), "upload.bin");
        assert_eq!(sanitize_filename(".."), "upload.bin");
    }

    #[test]
    fn stored_path_combines_id_and_name() {
        let p = stored_file_path("uploads", "069abc", "report.pdf");
        assert_eq!(p, PathBuf::from("uploads/069abc-report.pdf"));
    }
}
