//! Newest-first list of entry cards, reconciled against the server.
//!
//! The feed is a write-after-confirmation cache: cards change only when the
//! server confirms a mutation, except for the provisional
//! [`PolishState::Polishing`] label. All mutable state lives behind one mutex
//! that is never held across an `.await`, so every method takes `&self` and
//! concurrent calls from one event loop interleave safely.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use journal_common::{DEFAULT_PAGE_SIZE, Entry, MAX_PAGE_SIZE, PageCursor, PolishState};
use uuid::Uuid;

use crate::api::{EntriesApi, PhotoUpload};
use crate::error::ClientError;
use crate::photo::PhotoUrlResolver;

/// One entry as displayed.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryCard {
    pub entry: Entry,
    /// Display URL of the first photo; `None` if there is none or it could not be resolved.
    pub photo_url: Option<String>,
    pub polish: PolishState,
}

impl EntryCard {
    pub fn id(&self) -> Uuid {
        self.entry.id
    }
}

/// Point-in-time copy of the feed for rendering.
#[derive(Clone, Debug, Default)]
pub struct FeedSnapshot {
    pub cards: Vec<EntryCard>,
    pub has_more: bool,
    pub loading_more: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Page applied; carries the number of cards added.
    Loaded(usize),
    /// Nothing to do: no cursor, list exhausted, or a load already in flight.
    Skipped,
    /// The result arrived after a reload and was dropped.
    Stale,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PolishOutcome {
    Polished(EntryCard),
    /// Unknown id, or the trigger is disabled in the card's current state.
    Skipped,
}

/// Result of the save flow.
#[derive(Debug)]
pub struct Created {
    pub entry: Entry,
    /// Set when the entry was saved but its photo upload failed.
    pub photo_error: Option<ClientError>,
}

#[derive(Default)]
struct FeedState {
    cards: Vec<EntryCard>,
    next_cursor: Option<PageCursor>,
    exhausted: bool,
    loading_more: bool,
    generation: u64,
    /// Entries with a polish request outstanding; survives reloads and edits.
    polishing: HashSet<Uuid>,
}

impl FeedState {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.cards.iter().position(|c| c.id() == id)
    }

    fn has_more(&self) -> bool {
        !self.exhausted && self.next_cursor.is_some()
    }

    /// Card state for a server-confirmed entry, keeping an outstanding polish visible.
    fn polish_state(&self, entry: &Entry) -> PolishState {
        if self.polishing.contains(&entry.id) {
            PolishState::Polishing
        } else {
            PolishState::of(entry)
        }
    }

    fn mark_in_flight(&self, cards: &mut [EntryCard]) {
        for card in cards {
            if self.polishing.contains(&card.id()) {
                card.polish = PolishState::Polishing;
            }
        }
    }
}

/// Clears the in-flight flag when a page load finishes or is dropped.
struct LoadingGuard<'a> {
    state: &'a Mutex<FeedState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).loading_more = false;
    }
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A page ends the list when it is empty, short, or repeats the previous cursor.
fn ends_list(
    page_len: usize,
    limit: u64,
    previous: Option<PageCursor>,
    next: Option<PageCursor>,
) -> bool {
    page_len == 0 || (page_len as u64) < limit || next.is_none() || next == previous
}

pub struct EntryFeed<A, R> {
    api: Arc<A>,
    resolver: Arc<R>,
    page_size: u64,
    state: Mutex<FeedState>,
}

impl<A: EntriesApi, R: PhotoUrlResolver> EntryFeed<A, R> {
    pub fn new(api: Arc<A>, resolver: Arc<R>) -> Self {
        Self::with_page_size(api, resolver, DEFAULT_PAGE_SIZE)
    }

    /// `page_size` is clamped to what the server will return in one page.
    pub fn with_page_size(api: Arc<A>, resolver: Arc<R>, page_size: u64) -> Self {
        Self {
            api,
            resolver,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            state: Mutex::new(FeedState::default()),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = lock(&self.state);
        FeedSnapshot {
            cards: state.cards.clone(),
            has_more: state.has_more(),
            loading_more: state.loading_more,
        }
    }

    pub fn card(&self, id: Uuid) -> Option<EntryCard> {
        let state = lock(&self.state);
        state.position(id).map(|i| state.cards[i].clone())
    }

    pub fn next_cursor(&self) -> Option<PageCursor> {
        lock(&self.state).next_cursor
    }

    pub fn has_more(&self) -> bool {
        lock(&self.state).has_more()
    }

    /// Replace the list with the first page.
    ///
    /// Any next-page load still in flight is discarded when it completes. On
    /// failure the previous list is left as it was.
    pub async fn load_first_page(&self) -> Result<LoadOutcome, ClientError> {
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.generation
        };

        let page = self.api.list(self.page_size, None).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to load first page");
            e
        })?;
        let next = page.next_page_cursor();
        let mut cards = self.build_cards(page.entries).await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            tracing::debug!("Dropping superseded first page");
            return Ok(LoadOutcome::Stale);
        }
        state.mark_in_flight(&mut cards);
        let added = cards.len();
        state.exhausted = ends_list(added, self.page_size, None, next);
        state.cards = cards;
        state.next_cursor = next;
        Ok(LoadOutcome::Loaded(added))
    }

    /// Append the page after the current cursor.
    ///
    /// Only one next-page load runs at a time; calls made meanwhile return
    /// [`LoadOutcome::Skipped`]. On failure the list and cursor are unchanged
    /// and the call may be retried.
    pub async fn load_next_page(&self) -> Result<LoadOutcome, ClientError> {
        let (cursor, generation) = {
            let mut state = lock(&self.state);
            if state.loading_more || !state.has_more() {
                return Ok(LoadOutcome::Skipped);
            }
            let Some(cursor) = state.next_cursor else {
                return Ok(LoadOutcome::Skipped);
            };
            state.loading_more = true;
            (cursor, state.generation)
        };
        let _guard = LoadingGuard { state: &self.state };

        let page = self
            .api
            .list(self.page_size, Some(cursor))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to load next page");
                e
            })?;
        let next = page.next_page_cursor();
        let mut cards = self.build_cards(page.entries).await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            tracing::debug!("Dropping next page from before a reload");
            return Ok(LoadOutcome::Stale);
        }
        state.mark_in_flight(&mut cards);

        state.exhausted = ends_list(cards.len(), self.page_size, Some(cursor), next);
        if next.is_some() {
            state.next_cursor = next;
        }

        let mut added = 0;
        for card in cards {
            // A row created since the previous page can show up twice.
            if state.position(card.id()).is_none() {
                state.cards.push(card);
                added += 1;
            }
        }
        Ok(LoadOutcome::Loaded(added))
    }

    /// Polish one entry, marking its card `Polishing` until the server answers.
    ///
    /// A failure settles the card from its current entry so the action can be
    /// retried. The `Polishing` label survives reloads and edits meanwhile. An entry the server no longer knows is dropped from the list.
    pub async fn polish(&self, id: Uuid) -> Result<PolishOutcome, ClientError> {
        {
            let mut state = lock(&self.state);
            let Some(i) = state.position(id) else {
                return Ok(PolishOutcome::Skipped);
            };
            let Some(next) = state.cards[i].polish.begin() else {
                return Ok(PolishOutcome::Skipped);
            };
            state.cards[i].polish = next;
            state.polishing.insert(id);
        }

        match self.api.polish(id).await {
            Ok(entry) => Ok(match self.apply_polish_result(id, entry) {
                Some(card) => PolishOutcome::Polished(card),
                None => PolishOutcome::Skipped,
            }),
            Err(e) => {
                tracing::error!(%id, error = %e, "Polish failed");
                let mut state = lock(&self.state);
                state.polishing.remove(&id);
                match state.position(id) {
                    Some(i) if e.is_not_found() => {
                        state.cards.remove(i);
                    }
                    Some(i) => {
                        let settled = PolishState::of(&state.cards[i].entry);
                        state.cards[i].polish = settled;
                    }
                    None => {}
                }
                Err(e)
            }
        }
    }

    /// Delete an entry on the server, then drop its card.
    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        self.api.delete(id).await.map_err(|e| {
            tracing::error!(%id, error = %e, "Delete failed");
            e
        })?;
        self.apply_delete(id);
        Ok(())
    }

    /// Replace an entry's text on the server and reflect the confirmed edit.
    pub async fn edit(&self, id: Uuid, raw_text: &str) -> Result<Entry, ClientError> {
        let entry = self.api.update(id, raw_text).await.map_err(|e| {
            tracing::error!(%id, error = %e, "Edit failed");
            e
        })?;
        self.apply_edit(entry.clone());
        Ok(entry)
    }

    /// Save a new entry, attach its photo if any, and show it in date order.
    ///
    /// A failed photo upload does not undo the save; it is reported in
    /// [`Created::photo_error`].
    pub async fn create(
        &self,
        raw_text: &str,
        date: Option<DateTime<Utc>>,
        photo: Option<PhotoUpload>,
    ) -> Result<Created, ClientError> {
        let mut entry = self.api.create(raw_text, date).await?;

        let mut photo_error = None;
        if let Some(upload) = photo {
            match self.api.upload_photo(entry.id, upload).await {
                Ok(photo) => entry.photos.push(photo),
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "Photo upload failed");
                    photo_error = Some(e);
                }
            }
        }

        let card = self.build_card(entry.clone()).await;
        self.insert_card(card);
        Ok(Created { entry, photo_error })
    }

    /// Replace the card for `id` in place with the polished entry.
    ///
    /// Returns `None` when the card is gone, e.g. deleted while polishing.
    pub fn apply_polish_result(&self, id: Uuid, entry: Entry) -> Option<EntryCard> {
        let mut state = lock(&self.state);
        state.polishing.remove(&id);
        let Some(i) = state.position(id) else {
            tracing::debug!(%id, "Polish result for an entry no longer listed");
            return None;
        };
        let card = &mut state.cards[i];
        card.polish = PolishState::of(&entry);
        card.entry = entry;
        Some(card.clone())
    }

    /// Drop the card for `id`. Returns whether a card was removed.
    pub fn apply_delete(&self, id: Uuid) -> bool {
        let mut state = lock(&self.state);
        match state.position(id) {
            Some(i) => {
                state.cards.remove(i);
                true
            }
            None => false,
        }
    }

    /// Reflect a server-confirmed edit, which resets the polish state unless a
    /// polish request for the entry is still outstanding.
    pub fn apply_edit(&self, entry: Entry) -> bool {
        let mut state = lock(&self.state);
        let Some(i) = state.position(entry.id) else {
            return false;
        };
        let polish = state.polish_state(&entry);
        let card = &mut state.cards[i];
        card.polish = polish;
        card.entry = entry;
        true
    }

    fn insert_card(&self, mut card: EntryCard) {
        let mut state = lock(&self.state);
        card.polish = state.polish_state(&card.entry);
        if state.position(card.id()).is_some() {
            return;
        }
        let at = state
            .cards
            .iter()
            .position(|c| card.entry.cmp_newest_first(&c.entry).is_lt());
        match at {
            Some(i) => state.cards.insert(i, card),
            // Older than everything loaded; a later page will bring it.
            None if state.has_more() => {}
            None => state.cards.push(card),
        }
    }

    async fn build_cards(&self, entries: Vec<Entry>) -> Vec<EntryCard> {
        join_all(entries.into_iter().map(|e| self.build_card(e))).await
    }

    async fn build_card(&self, entry: Entry) -> EntryCard {
        let photo_url = match entry.first_photo() {
            Some(photo) => match self.resolver.resolve(&photo.storage_path).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(
                        id = %entry.id,
                        path = %photo.storage_path,
                        error = %e,
                        "Photo URL unavailable, showing entry without it"
                    );
                    None
                }
            },
            None => None,
        };
        EntryCard {
            polish: PolishState::of(&entry),
            photo_url,
            entry,
        }
    }
}
