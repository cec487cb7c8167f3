use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, StatusCode},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    import::{self, ImportMode, ImportParams},
    models::ImportProduct,
    AppState,
};

/// Cap for inline JSON bodies, which are read below the extractor layer.
const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

// ── POST /api/products/import/json ────────────────────────────────────────────

/// Accepts either a multipart upload (field `file`) or an inline
/// `{"products": [...]}` body, selected by the request content type.
pub async fn import_json(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    request: Request,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let bytes = read_payload(request).await?;
    let records = import::parse_json(&bytes)?;
    import::validate(&records)?;

    let (imported, total) = apply(&state, params.mode, records).await?;
    info!(imported, total, mode = ?params.mode, "JSON import complete");

    Ok((
        StatusCode::OK,
        Json(json!({
            "imported": imported,
            "total": total,
            "mode": params.mode,
        })),
    ))
}

// ── POST /api/products/import/csv ─────────────────────────────────────────────

pub async fn import_csv(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let bytes = read_upload(multipart).await?;
    let records = import::parse_csv(&bytes)?;
    import::validate(&records)?;

    let (imported, total) = apply(&state, params.mode, records).await?;
    info!(imported, total, mode = ?params.mode, "CSV import complete");

    Ok((
        StatusCode::OK,
        Json(json!({
            "imported": imported,
            "total": total,
        })),
    ))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn apply(
    state: &AppState,
    mode: ImportMode,
    records: Vec<ImportProduct>,
) -> AppResult<(usize, usize)> {
    match mode {
        ImportMode::Merge => state.store.merge(records).await,
        ImportMode::Replace => state.store.replace_all(records).await,
    }
}

/// Pull the import payload out of the request: the `file` field of a
/// multipart upload, or the raw body for inline JSON. Uploads are consumed
/// in memory, so there is no temp file to clean up on the error path.
async fn read_payload(request: Request) -> AppResult<Vec<u8>> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        read_upload(multipart).await
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), MAX_IMPORT_BYTES)
            .await
            .map_err(|e| AppError::BadRequest(format!("Unreadable request body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// Read the `file` field of a multipart upload into memory.
async fn read_upload(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(AppError::BadRequest(
        "Missing `file` upload field".to_string(),
    ))
}
