use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Latest consolidated memory of one participant within one session.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "memory_record")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub session_id: Uuid,
  pub participant_id: i64,
  #[sea_orm(column_type = "Text")]
  pub short_term: String,
  #[sea_orm(column_type = "Text")]
  pub long_term: String,
  #[sea_orm(column_type = "Text")]
  pub user_info: String,
  #[sea_orm(column_type = "Text")]
  pub promises: String,
  pub pointer: i64,
  pub updated_at: Option<DateTimeWithTimeZone>,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
