use std::collections::HashMap;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{SubsecRound, Utc};
use journal_common::storage::{PhotoStore, StoragePath};
use journal_common::{
    CreateEntryRequest, DeleteEntryResponse, Entry, EntryListResponse, UpdateEntryRequest,
};
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::{entry, photo};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::entry::*;
use crate::polish::PolishError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Entries",
    operation_id = "listEntries",
    summary = "List the caller's entries, newest first",
    description = "Cursor pagination ordered by `date` descending, then `id` descending. \
        Pass the previous page's `nextCursor` (and `nextCursorId`) as `cursor` (and `cursor_id`) \
        to fetch the following page. An empty page has a null cursor. `limit` defaults to 20 and is clamped to 1-100.",
    params(EntryListQuery),
    responses(
        (status = 200, description = "One page of entries", body = EntryListResponse),
        (status = 400, description = "Malformed query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(owner = %auth_user.user_id))]
pub async fn list_entries(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EntryListQuery>,
) -> Result<Json<EntryListResponse>, AppError> {
    let limit = query.page_size();

    let mut select = entry::Entity::find().filter(entry::Column::OwnerId.eq(&auth_user.user_id));

    if let Some(cursor) = query.page_cursor()? {
        select = match cursor.id {
            Some(cursor_id) => select.filter(
                Condition::any()
                    .add(entry::Column::Date.lt(cursor.date))
                    .add(
                        Condition::all()
                            .add(entry::Column::Date.eq(cursor.date))
                            .add(entry::Column::Id.lt(cursor_id)),
                    ),
            ),
            None => select.filter(entry::Column::Date.lt(cursor.date)),
        };
    }

    let models = select
        .order_by_desc(entry::Column::Date)
        .order_by_desc(entry::Column::Id)
        .limit(limit)
        .all(&state.db)
        .await?;

    let entries = attach_photos(&state.db, models).await?;
    Ok(Json(EntryListResponse::from_page(entries)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Entries",
    operation_id = "createEntry",
    summary = "Create an entry",
    description = "Creates an entry owned by the caller. `date` defaults to now.",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = Entry),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(owner = %auth_user.user_id, id))]
pub async fn create_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_raw_text(&payload.raw_text)?;

    let now = Utc::now().trunc_subsecs(6);
    let id = Uuid::now_v7();
    tracing::Span::current().record("id", tracing::field::display(id));

    let new_entry = entry::ActiveModel {
        id: Set(id),
        owner_id: Set(auth_user.user_id),
        raw_text: Set(payload.raw_text),
        polished_text: Set(None),
        date: Set(payload.date.map_or(now, |d| d.trunc_subsecs(6))),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_entry.insert(&state.db).await?;
    tracing::info!("Entry created");

    Ok((StatusCode::CREATED, Json(entry_from_model(model, Vec::new()))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Entries",
    operation_id = "getEntry",
    summary = "Get one of the caller's entries",
    params(("id" = Uuid, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry with photos", body = Entry),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn get_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Entry>, AppError> {
    let model = find_owned_entry(&state.db, &auth_user.user_id, id).await?;
    Ok(Json(load_one(&state.db, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Entries",
    operation_id = "updateEntry",
    summary = "Replace an entry's text",
    description = "Replaces `raw_text` and clears `polished_text` in the same write.",
    params(("id" = Uuid, Path, description = "Entry ID")),
    request_body = UpdateEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = Entry),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id = %id))]
pub async fn update_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateEntryRequest>,
) -> Result<Json<Entry>, AppError> {
    validate_raw_text(&payload.raw_text)?;

    let txn = state.db.begin().await?;

    let existing = find_owned_entry(&txn, &auth_user.user_id, id).await?;
    let mut active: entry::ActiveModel = existing.into();
    active.raw_text = Set(payload.raw_text);
    active.polished_text = Set(None);
    active.updated_at = Set(Utc::now());

    let model = active.update(&txn).await?;
    let updated = load_one(&txn, model).await?;
    txn.commit().await?;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Entries",
    operation_id = "deleteEntry",
    summary = "Delete an entry and its photos",
    description = "Always reports success for an authenticated caller. Ids that are unknown \
        or owned by someone else are left untouched, so the response reveals nothing about them.",
    params(("id" = Uuid, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry absent after the call", body = DeleteEntryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn delete_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteEntryResponse>, AppError> {
    let txn = state.db.begin().await?;

    let owned = entry::Entity::find_by_id(id)
        .filter(entry::Column::OwnerId.eq(&auth_user.user_id))
        .one(&txn)
        .await?;
    if owned.is_none() {
        tracing::debug!("Delete matched no entry of this owner");
        return Ok(Json(DeleteEntryResponse { success: true }));
    }

    let photos = photo::Entity::find()
        .filter(photo::Column::EntryId.eq(id))
        .all(&txn)
        .await?;

    photo::Entity::delete_many()
        .filter(photo::Column::EntryId.eq(id))
        .exec(&txn)
        .await?;
    entry::Entity::delete_many()
        .filter(entry::Column::Id.eq(id))
        .filter(entry::Column::OwnerId.eq(&auth_user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    remove_photo_objects(state.photo_store.as_ref(), photos).await;
    tracing::info!("Entry deleted");

    Ok(Json(DeleteEntryResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/{id}/polish",
    tag = "Entries",
    operation_id = "polishEntry",
    summary = "Polish an entry's text",
    description = "Sends `raw_text` to the polishing service and stores the returned markup in \
        `polished_text`. Nothing is written unless the service succeeds. The call is bounded by \
        the configured timeout (504 UPSTREAM_TIMEOUT, retryable). If the entry was edited while the \
        service was working the result is discarded with 409 CONFLICT.",
    params(("id" = Uuid, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry polished", body = Entry),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Entry changed during polishing (CONFLICT)", body = ErrorBody),
        (status = 500, description = "Polishing service failed (UPSTREAM_ERROR)", body = ErrorBody),
        (status = 504, description = "Polishing service timed out (UPSTREAM_TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn polish_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Entry>, AppError> {
    let existing = find_owned_entry(&state.db, &auth_user.user_id, id).await?;

    let timeout = state.polish_timeout();
    let started = Instant::now();
    let markup = tokio::time::timeout(timeout, state.polisher.polish(&existing.raw_text))
        .await
        .map_err(|_| PolishError::Timeout(timeout))??;

    // Only write if raw_text is still the text that was polished.
    let result = entry::Entity::update_many()
        .set(entry::ActiveModel {
            polished_text: Set(Some(markup)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(entry::Column::Id.eq(id))
        .filter(entry::Column::OwnerId.eq(&auth_user.user_id))
        .filter(entry::Column::RawText.eq(existing.raw_text.as_str()))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        // Distinguish a concurrent edit from a concurrent delete.
        find_owned_entry(&state.db, &auth_user.user_id, id).await?;
        return Err(AppError::Conflict(
            "Entry was edited while polishing; polish it again".into(),
        ));
    }

    let model = find_owned_entry(&state.db, &auth_user.user_id, id).await?;
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Entry polished");

    Ok(Json(load_one(&state.db, model).await?))
}

pub(crate) async fn find_owned_entry<C: ConnectionTrait>(
    db: &C,
    owner_id: &str,
    id: Uuid,
) -> Result<entry::Model, AppError> {
    entry::Entity::find_by_id(id)
        .filter(entry::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".into()))
}

async fn load_one<C: ConnectionTrait>(db: &C, model: entry::Model) -> Result<Entry, AppError> {
    let photos = photo::Entity::find()
        .filter(photo::Column::EntryId.eq(model.id))
        .order_by_asc(photo::Column::CreatedAt)
        .order_by_asc(photo::Column::Id)
        .all(db)
        .await?;
    Ok(entry_from_model(model, photos))
}

/// Load photos for a page of entries with one query, preserving page order.
async fn attach_photos<C: ConnectionTrait>(
    db: &C,
    models: Vec<entry::Model>,
) -> Result<Vec<Entry>, AppError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let photos = photo::Entity::find()
        .filter(photo::Column::EntryId.is_in(ids))
        .order_by_asc(photo::Column::CreatedAt)
        .order_by_asc(photo::Column::Id)
        .all(db)
        .await?;

    let mut by_entry: HashMap<Uuid, Vec<photo::Model>> = HashMap::new();
    for p in photos {
        by_entry.entry(p.entry_id).or_default().push(p);
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let photos = by_entry.remove(&m.id).unwrap_or_default();
            entry_from_model(m, photos)
        })
        .collect())
}

/// Best-effort removal of photo objects whose rows are already gone.
async fn remove_photo_objects(store: &dyn PhotoStore, photos: Vec<photo::Model>) {
    for p in photos {
        let result = match StoragePath::parse(&p.storage_path) {
            Ok(path) => store.delete(&path).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(path = %p.storage_path, "Failed to remove photo object: {e}");
        }
    }
}
