use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entry")]
pub struct Model {
    /// UUIDv7 primary key; also the pagination tie-breaker.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Subject of the verified token that created the entry.
    pub owner_id: String,

    #[sea_orm(column_type = "Text")]
    pub raw_text: String,

    /// Cleared whenever `raw_text` changes.
    #[sea_orm(column_type = "Text", nullable)]
    pub polished_text: Option<String>,

    pub date: DateTimeUtc,

    #[sea_orm(has_many)]
    pub photos: HasMany<super::photo::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
