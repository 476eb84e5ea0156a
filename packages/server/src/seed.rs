use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::{entry, photo};

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    // Keyset pagination:
    // WHERE owner_id = ? AND (date < ? OR (date = ? AND id < ?)) ORDER BY date DESC, id DESC
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_entry_owner_date_id")
        .table(entry::Entity)
        .col(entry::Column::OwnerId)
        .col(entry::Column::Date)
        .col(entry::Column::Id)
        .to_owned();

    match db.execute_raw(backend.build(&stmt)).await {
        Ok(_) => info!("Ensured index idx_entry_owner_date_id exists"),
        Err(e) => tracing::warn!("Failed to create index idx_entry_owner_date_id: {}", e),
    }

    // Photo lookup per page of entries.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_photo_entry")
        .table(photo::Entity)
        .col(photo::Column::EntryId)
        .to_owned();

    match db.execute_raw(backend.build(&stmt)).await {
        Ok(_) => info!("Ensured index idx_photo_entry exists"),
        Err(e) => tracing::warn!("Failed to create index idx_photo_entry: {}", e),
    }

    Ok(())
}
