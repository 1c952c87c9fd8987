use async_trait::async_trait;
use chrono::Utc;
use lingchat_entities::memory_record;
use lingchat_shared::AppError;
use sea_orm::{
  ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
  sea_query::OnConflict,
};
use uuid::Uuid;

use super::{MemoryKey, MemoryRecord};

/// Persistence capability behind the memory bank.
#[async_trait]
pub trait MemoryStore: Send + Sync {
  async fn get_latest(&self, key: &MemoryKey) -> Result<Option<MemoryRecord>, AppError>;

  /// Write `record` as the latest state for `key`, returning the row id.
  async fn upsert(&self, key: &MemoryKey, record: &MemoryRecord) -> Result<Uuid, AppError>;
}

/// Cache-only deployment: nothing is loaded and writes are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatileStore;

#[async_trait]
impl MemoryStore for VolatileStore {
  async fn get_latest(&self, _key: &MemoryKey) -> Result<Option<MemoryRecord>, AppError> {
    Ok(None)
  }

  async fn upsert(&self, _key: &MemoryKey, _record: &MemoryRecord) -> Result<Uuid, AppError> {
    Ok(Uuid::nil())
  }
}

/// Postgres-backed store, one row per `(session_id, participant_id)`.
#[derive(Debug, Clone)]
pub struct DbMemoryStore {
  db: DatabaseConnection,
}

impl DbMemoryStore {
  pub const fn new(db: DatabaseConnection) -> Self {
    Self { db }
  }
}

#[async_trait]
impl MemoryStore for DbMemoryStore {
  async fn get_latest(&self, key: &MemoryKey) -> Result<Option<MemoryRecord>, AppError> {
    let model = memory_record::Entity::find()
      .filter(memory_record::Column::SessionId.eq(key.session_id))
      .filter(memory_record::Column::ParticipantId.eq(key.participant_id))
      .order_by_desc(memory_record::Column::UpdatedAt)
      .one(&self.db)
      .await?;

    Ok(model.map(MemoryRecord::from_model))
  }

  async fn upsert(&self, key: &MemoryKey, record: &MemoryRecord) -> Result<Uuid, AppError> {
    let active_model = memory_record::ActiveModel {
      id: Set(Uuid::now_v7()),
      session_id: Set(key.session_id),
      participant_id: Set(key.participant_id),
      short_term: Set(record.sections.short_term.clone()),
      long_term: Set(record.sections.long_term.clone()),
      user_info: Set(record.sections.user_info.clone()),
      promises: Set(record.sections.promises.clone()),
      pointer: Set(i64::try_from(record.pointer)?),
      updated_at: Set(record.updated_at.map(Into::into)),
      created_at: Set(Utc::now().into()),
    };

    let result = memory_record::Entity::insert(active_model)
      .on_conflict(
        OnConflict::columns([
          memory_record::Column::SessionId,
          memory_record::Column::ParticipantId,
        ])
        .update_columns([
          memory_record::Column::ShortTerm,
          memory_record::Column::LongTerm,
          memory_record::Column::UserInfo,
          memory_record::Column::Promises,
          memory_record::Column::Pointer,
          memory_record::Column::UpdatedAt,
        ])
        .to_owned(),
      )
      .exec(&self.db)
      .await?;

    tracing::debug!(%key, pointer = record.pointer, "memory record persisted");
    Ok(result.last_insert_id)
  }
}
