use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use journal_common::storage::{PhotoStore, StorageError, StoragePath};
use sea_orm::{ActiveModelTrait, Set};
use tracing::instrument;
use uuid::Uuid;

use crate::entity::photo;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::entry::find_owned_entry;
use crate::models::entry::photo_from_model;
use crate::state::AppState;
use crate::utils::filename::{image_extension, photo_file_name, storage_segment};

/// Same-millisecond uploads to one entry probe this many names before giving up.
const MAX_NAME_ATTEMPTS: i64 = 16;

/// Body limit for photo uploads: the photo itself plus multipart framing.
pub fn photo_upload_body_limit(max_photo_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(usize::try_from(max_photo_size).unwrap_or(usize::MAX).saturating_add(64 * 1024))
}

#[utoipa::path(
    post,
    path = "/{id}/photos",
    tag = "Photos",
    operation_id = "uploadPhoto",
    summary = "Attach a photo to an entry",
    description = "Stores the `file` multipart field under `<owner>/<entry>/<unix_millis>.<ext>` \
        and records it on the entry. Only image content types are accepted.",
    params(("id" = Uuid, Path, description = "Entry ID")),
    request_body(content_type = "multipart/form-data", description = "Image upload in the `file` field"),
    responses(
        (status = 201, description = "Photo stored", body = journal_common::Photo),
        (status = 400, description = "Missing, oversized or non-image file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(entry_id = %entry_id))]
pub async fn upload_photo(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let entry = find_owned_entry(&state.db, &auth_user.user_id, entry_id).await?;
    let max_size = state.config.storage.max_photo_size;

    let mut upload: Option<(Vec<u8>, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields.
        }
        let ext = image_extension(field.file_name(), field.content_type())
            .map_err(|e| AppError::Validation(e.message().into()))?;
        let data = read_field_limited(field, max_size).await?;
        upload = Some((data, ext));
    }

    let (data, ext) = upload.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    let path = put_under_free_name(
        state.photo_store.as_ref(),
        &entry.owner_id,
        entry.id,
        &ext,
        &data,
    )
    .await?;

    let row = photo::ActiveModel {
        id: Set(Uuid::now_v7()),
        entry_id: Set(entry.id),
        storage_path: Set(path.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match row.insert(&state.db).await {
        Ok(model) => {
            tracing::info!(path = %path, bytes = data.len(), "Photo stored");
            Ok((StatusCode::CREATED, Json(photo_from_model(model))))
        }
        Err(e) => {
            if let Err(cleanup) = state.photo_store.delete(&path).await {
                tracing::warn!(path = %path, "Failed to remove orphaned photo object: {cleanup}");
            }
            Err(e.into())
        }
    }
}

async fn read_field_limited(
    mut field: axum::extract::multipart::Field<'_>,
    max_size: u64,
) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (data.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::Validation(format!(
                "Photo exceeds maximum size of {max_size} bytes"
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Store `data` under the first free `<owner>/<entry>/<millis>.<ext>`, starting at now.
///
/// The store refuses to overwrite, so a name taken by a concurrent upload
/// moves this one to the next millisecond.
async fn put_under_free_name(
    store: &dyn PhotoStore,
    owner_id: &str,
    entry_id: Uuid,
    ext: &str,
    data: &[u8],
) -> Result<StoragePath, AppError> {
    let owner = storage_segment(owner_id);
    let start = Utc::now().timestamp_millis();

    for offset in 0..MAX_NAME_ATTEMPTS {
        let path = StoragePath::for_photo(&owner, entry_id, &photo_file_name(start + offset, ext))?;
        match store.put(&path, data).await {
            Ok(()) => return Ok(path),
            Err(StorageError::AlreadyExists(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(
        "Too many concurrent uploads for this entry".into(),
    ))
}
