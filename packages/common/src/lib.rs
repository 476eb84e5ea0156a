pub mod entry;
pub mod polish_state;
pub mod storage;

pub use entry::{
    CreateEntryRequest, DEFAULT_PAGE_SIZE, DeleteEntryResponse, Entry, EntryListResponse,
    MAX_PAGE_SIZE, PageCursor, Photo, UpdateEntryRequest,
};
pub use polish_state::PolishState;
