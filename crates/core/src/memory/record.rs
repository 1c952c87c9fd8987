use std::fmt;

use chrono::{DateTime, Utc};
use lingchat_entities::memory_record;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::EntityId;

/// The four fixed sections of a participant's memory, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MemorySection {
  ShortTerm,
  LongTerm,
  UserInfo,
  Promises,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MemorySections {
  /// Recap of the topic currently being discussed.
  pub short_term: String,
  /// Chronicle of milestone events.
  pub long_term: String,
  /// What is known about the user.
  pub user_info: String,
  /// Open promises and agreements.
  pub promises: String,
}

impl MemorySections {
  pub fn get(&self, section: MemorySection) -> &str {
    match section {
      MemorySection::ShortTerm => &self.short_term,
      MemorySection::LongTerm => &self.long_term,
      MemorySection::UserInfo => &self.user_info,
      MemorySection::Promises => &self.promises,
    }
  }

  pub fn set(&mut self, section: MemorySection, content: String) {
    let slot = match section {
      MemorySection::ShortTerm => &mut self.short_term,
      MemorySection::LongTerm => &mut self.long_term,
      MemorySection::UserInfo => &mut self.user_info,
      MemorySection::Promises => &mut self.promises,
    };
    *slot = content;
  }
}

/// Consolidated memory of one participant.
///
/// `pointer` is the index of the first dialogue line not yet folded into the
/// sections. Only the compaction worker mutates a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MemoryRecord {
  pub sections: MemorySections,
  pub pointer: usize,
  pub updated_at: Option<DateTime<Utc>>,
}

impl MemoryRecord {
  pub fn from_model(model: memory_record::Model) -> Self {
    let pointer = usize::try_from(model.pointer).unwrap_or_else(|_| {
      tracing::warn!(
        session_id = %model.session_id,
        participant_id = model.participant_id,
        pointer = model.pointer,
        "stored memory pointer is negative, resetting to 0"
      );
      0
    });

    Self {
      sections: MemorySections {
        short_term: model.short_term,
        long_term: model.long_term,
        user_info: model.user_info,
        promises: model.promises,
      },
      pointer,
      updated_at: model.updated_at.map(|at| at.with_timezone(&Utc)),
    }
  }
}

/// Durable identity of a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryKey {
  pub session_id: Uuid,
  pub participant_id: EntityId,
}

impl fmt::Display for MemoryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.session_id, self.participant_id)
  }
}
