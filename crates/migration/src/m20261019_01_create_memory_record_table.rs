use sea_orm_migration::{
  prelude::*,
  schema::{big_integer, text, timestamp_with_time_zone, uuid},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(MemoryRecord::Table)
          .if_not_exists()
          .col(uuid(MemoryRecord::Id).primary_key())
          .col(uuid(MemoryRecord::SessionId).not_null())
          .col(big_integer(MemoryRecord::ParticipantId).not_null())
          .col(text(MemoryRecord::ShortTerm).not_null().default(""))
          .col(text(MemoryRecord::LongTerm).not_null().default(""))
          .col(text(MemoryRecord::UserInfo).not_null().default(""))
          .col(text(MemoryRecord::Promises).not_null().default(""))
          .col(big_integer(MemoryRecord::Pointer).not_null().default(0))
          .col(timestamp_with_time_zone(MemoryRecord::UpdatedAt).null())
          .col(timestamp_with_time_zone(MemoryRecord::CreatedAt).not_null().default(Expr::current_timestamp()))
          .to_owned(),
      )
      .await?;

    // One live record per (session, participant); upserts conflict on this.
    manager
      .create_index(
        Index::create()
          .name("idx_memory_record_session_participant")
          .table(MemoryRecord::Table)
          .col(MemoryRecord::SessionId)
          .col(MemoryRecord::ParticipantId)
          .unique()
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(MemoryRecord::Table).to_owned())
      .await?;

    Ok(())
  }
}

#[derive(Iden)]
pub enum MemoryRecord {
  Table,

  Id,            // uuid v7
  SessionId,     // owning conversation session
  ParticipantId, // role id of the participant
  ShortTerm,     // recap of the most recent topic
  LongTerm,      // chronicle of milestone events
  UserInfo,      // profile of the user
  Promises,      // open promises and agreements
  Pointer,       // log index already folded into memory
  UpdatedAt,     // last consolidation time (NULL = never)
  CreatedAt,     // creation timestamp
}
