use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Upper bound applied to caller-supplied page sizes.
pub const MAX_PAGE_SIZE: u64 = 100;

/// A journal entry as exchanged over the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Entry {
    /// Entry ID (UUIDv7), assigned by the server.
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: Uuid,
    /// Identity of the author, taken from the verified bearer token.
    #[schema(example = "2f1c9a4e-5b7d-4c21-9f0e-7d3a1b6c8e90")]
    pub owner_id: String,
    /// The author's unmodified input.
    #[schema(example = "Walked to the harbour, watched the ferries.")]
    pub raw_text: String,
    /// Markup derived from the current `raw_text`, if it has been polished.
    #[schema(example = "<article><p>I walked to the harbour...</p></article>")]
    pub polished_text: Option<String>,
    /// Ordering key and pagination cursor.
    pub date: DateTime<Utc>,
    /// Attached photos, oldest first.
    #[serde(default)]
    pub photos: Vec<Photo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn is_polished(&self) -> bool {
        self.polished_text.is_some()
    }

    /// The cursor that resumes listing right after this entry.
    pub fn cursor(&self) -> PageCursor {
        PageCursor {
            date: self.date,
            id: Some(self.id),
        }
    }

    pub fn first_photo(&self) -> Option<&Photo> {
        self.photos.first()
    }

    /// Newest-first ordering: `date` descending, then `id` descending.
    pub fn cmp_newest_first(&self, other: &Entry) -> Ordering {
        other
            .date
            .cmp(&self.date)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// A photo attached to an entry.
///
/// Only the storage locator is persisted; URLs are resolved at read time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Photo {
    pub id: Uuid,
    pub entry_id: Uuid,
    /// Locator inside the photo bucket: `<owner>/<entry>/<file>`.
    #[schema(example = "2f1c9a4e-5b7d-4c21-9f0e-7d3a1b6c8e90/01936f0e-1234-7abc-8000-000000000001/1718000000000.jpg")]
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

/// Resume point in the newest-first listing.
///
/// Entries strictly older than the cursor are returned. `id` breaks ties
/// between entries sharing the same `date`; without it the bound is on
/// `date` alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    pub date: DateTime<Utc>,
    pub id: Option<Uuid>,
}

impl PageCursor {
    pub fn from_date(date: DateTime<Utc>) -> Self {
        Self { date, id: None }
    }

    /// Whether `entry` lies past this cursor, i.e. belongs to a later page.
    pub fn admits(&self, entry: &Entry) -> bool {
        match self.id {
            Some(id) => entry.date < self.date || (entry.date == self.date && entry.id < id),
            None => entry.date < self.date,
        }
    }
}

/// Response body of `GET /api/entries`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryListResponse {
    pub entries: Vec<Entry>,
    /// `date` of the last entry in this page, or null when the page is empty.
    pub next_cursor: Option<DateTime<Utc>>,
    /// `id` of the last entry in this page, or null when the page is empty.
    #[serde(default)]
    pub next_cursor_id: Option<Uuid>,
}

impl EntryListResponse {
    /// Build a page, deriving the cursor from its last entry.
    pub fn from_page(entries: Vec<Entry>) -> Self {
        let last = entries.last().map(Entry::cursor);
        Self {
            entries,
            next_cursor: last.map(|c| c.date),
            next_cursor_id: last.and_then(|c| c.id),
        }
    }

    pub fn next_page_cursor(&self) -> Option<PageCursor> {
        self.next_cursor.map(|date| PageCursor {
            date,
            id: self.next_cursor_id,
        })
    }
}

/// Request body for creating an entry.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateEntryRequest {
    /// Entry text, must not be blank.
    #[schema(example = "Rainy morning, finished the novel.")]
    pub raw_text: String,
    /// Optional entry date; defaults to the creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Request body for editing an entry's text.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateEntryRequest {
    /// Replacement text, must not be blank. Clears any polished text.
    #[schema(example = "Rainy morning, finished the novel at last.")]
    pub raw_text: String,
}

/// Response body of `DELETE /api/entries/{id}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeleteEntryResponse {
    #[schema(example = true)]
    pub success: bool,
}
