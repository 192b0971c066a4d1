/**
 * Upload Routes
 * Dashboard media management: multipart image upload, listing, and
 * deletion. The heavy lifting (sniffing, naming, folder rules) lives in
 * the media store; these handlers translate its verdicts to HTTP.
 */
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::routes::{bad_request, not_found, require_session, ErrorResponse, SuccessResponse};
use crate::storage::{MediaEntry, MediaError, ALLOWED_FOLDERS};
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MediaListQuery {
    pub folder: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaListResponse {
    pub files: Vec<MediaEntry>,
    pub count: usize,
}

fn media_error_response(err: &MediaError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        MediaError::Io(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Media storage failed")),
        ),
        other => bad_request(other.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /dashboard/uploads
/// Multipart form with a `folder` text field and a `file` part. The
/// response is the stored object, public URL included.
pub async fn upload_media(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    if let Err(err) = require_session(&state, &jar, &headers) {
        return err.into_response();
    }

    let mut folder: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!("Multipart error: {}", err);
                return bad_request("Invalid multipart data").into_response();
            }
        };

        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("folder") => match field.text().await {
                Ok(value) => folder = Some(value.trim().to_string()),
                Err(err) => {
                    tracing::warn!("Multipart error: {}", err);
                    return bad_request("Invalid multipart data").into_response();
                }
            },
            Some("file") => {
                let original_name = field.file_name().unwrap_or("unknown").to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((original_name, bytes.to_vec())),
                    Err(err) => {
                        tracing::warn!("Failed to read upload bytes: {}", err);
                        return bad_request("Failed to read file data").into_response();
                    }
                }
            }
            _ => {}
        }
    }

    let Some(folder) = folder.filter(|f| !f.is_empty()) else {
        return bad_request("No folder provided").into_response();
    };
    let Some((original_name, bytes)) = file else {
        return bad_request("No file provided").into_response();
    };

    match state.media.put(&folder, &original_name, &bytes).await {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(err) => {
            tracing::warn!(folder = %folder, error = %err, "upload rejected");
            media_error_response(&err).into_response()
        }
    }
}

/// GET /dashboard/uploads
/// Lists one folder when `?folder=` is given, otherwise every folder,
/// newest first.
pub async fn list_media(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<MediaListQuery>,
) -> impl IntoResponse {
    if let Err(err) = require_session(&state, &jar, &headers) {
        return err.into_response();
    }

    let folders: Vec<&str> = match query.folder.as_deref() {
        Some(folder) => vec![folder],
        None => ALLOWED_FOLDERS.to_vec(),
    };

    let mut files = Vec::new();
    for folder in folders {
        match state.media.list(folder).await {
            Ok(entries) => files.extend(entries),
            Err(err) => return media_error_response(&err).into_response(),
        }
    }
    files.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then(a.filename.cmp(&b.filename)));

    let count = files.len();
    Json(MediaListResponse { files, count }).into_response()
}

/// DELETE /dashboard/uploads/{folder}/{filename}
pub async fn delete_media(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path((folder, filename)): Path<(String, String)>,
) -> impl IntoResponse {
    if let Err(err) = require_session(&state, &jar, &headers) {
        return err.into_response();
    }

    match state.media.remove(&folder, &filename).await {
        Ok(true) => {
            tracing::info!(folder = %folder, filename = %filename, "deleted media object");
            Json(SuccessResponse::ok()).into_response()
        }
        Ok(false) => not_found("Media file").into_response(),
        Err(err) => media_error_response(&err).into_response(),
    }
}
