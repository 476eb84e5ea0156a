use chrono::{DateTime, Utc};
use journal_common::{DEFAULT_PAGE_SIZE, Entry, MAX_PAGE_SIZE, PageCursor, Photo};
use serde::Deserialize;
use uuid::Uuid;

use crate::entity::{entry, photo};
use crate::error::AppError;

/// Longest accepted `raw_text`, in characters.
pub const MAX_RAW_TEXT_CHARS: usize = 100_000;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct EntryListQuery {
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub limit: Option<u64>,
    /// Return only entries dated strictly before this instant.
    #[param(example = "2024-03-04T00:00:00Z")]
    pub cursor: Option<DateTime<Utc>>,
    /// Tie-breaker for `cursor`: also return entries dated exactly `cursor`
    /// whose id is lower than this one.
    pub cursor_id: Option<Uuid>,
}

impl EntryListQuery {
    pub fn page_size(&self) -> u64 {
        clamp_limit(self.limit)
    }

    pub fn page_cursor(&self) -> Result<Option<PageCursor>, AppError> {
        match (self.cursor, self.cursor_id) {
            (Some(date), id) => Ok(Some(PageCursor { date, id })),
            (None, Some(_)) => Err(AppError::Validation(
                "cursor_id requires cursor".into(),
            )),
            (None, None) => Ok(None),
        }
    }
}

pub fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// `raw_text` must contain something other than whitespace.
pub fn validate_raw_text(raw_text: &str) -> Result<(), AppError> {
    if raw_text.trim().is_empty() {
        return Err(AppError::Validation("raw_text must not be empty".into()));
    }
    if raw_text.chars().count() > MAX_RAW_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "raw_text must be at most {MAX_RAW_TEXT_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn photo_from_model(m: photo::Model) -> Photo {
    Photo {
        id: m.id,
        entry_id: m.entry_id,
        storage_path: m.storage_path,
        created_at: m.created_at,
    }
}

pub fn entry_from_model(m: entry::Model, photos: Vec<photo::Model>) -> Entry {
    Entry {
        id: m.id,
        owner_id: m.owner_id,
        raw_text: m.raw_text,
        polished_text: m.polished_text,
        date: m.date,
        photos: photos.into_iter().map(photo_from_model).collect(),
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}
