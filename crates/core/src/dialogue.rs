use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Identifier of a conversational participant (a role in the running script).
pub type EntityId = i64;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LineKind {
  /// Persona, prompt or stage direction. Never summarized.
  System,
  User,
  Assistant,
}

/// One entry of the append-only dialogue log.
///
/// A line's global index is its position in the log; lines are never edited
/// or removed once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DialogueLine {
  pub speaker_id: Option<EntityId>,
  pub content: String,
  pub kind: LineKind,
  #[serde(default)]
  pub perceived_by: BTreeSet<EntityId>,
}

impl DialogueLine {
  pub fn new(speaker_id: Option<EntityId>, content: impl Into<String>, kind: LineKind) -> Self {
    Self {
      speaker_id,
      content: content.into(),
      kind,
      perceived_by: BTreeSet::new(),
    }
  }

  #[must_use]
  pub fn perceived_by(mut self, participants: impl IntoIterator<Item = EntityId>) -> Self {
    self.perceived_by.extend(participants);
    self
  }

  pub fn is_visible_to(&self, participant_id: EntityId) -> bool {
    match self.kind {
      LineKind::System => false,
      LineKind::User | LineKind::Assistant => {
        self.speaker_id == Some(participant_id) || self.perceived_by.contains(&participant_id)
      }
    }
  }

  /// Participants whose memory may change because of this line.
  pub fn involved(&self) -> BTreeSet<EntityId> {
    let mut ids = self.perceived_by.clone();
    ids.extend(self.speaker_id);
    ids
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn system_lines_are_never_visible() {
    let line = DialogueLine::new(Some(1), "You are Ling.", LineKind::System).perceived_by([1, 2]);
    assert!(!line.is_visible_to(1));
    assert!(!line.is_visible_to(2));
  }

  #[test]
  fn speaker_and_perceivers_see_the_line() {
    let line = DialogueLine::new(Some(1), "hi", LineKind::Assistant).perceived_by([2]);
    assert!(line.is_visible_to(1));
    assert!(line.is_visible_to(2));
    assert!(!line.is_visible_to(3));
    assert_eq!(line.involved(), BTreeSet::from([1, 2]));
  }

  #[test]
  fn kind_round_trips_through_text() {
    assert_eq!(LineKind::Assistant.to_string(), "assistant");
    assert_eq!(LineKind::from_str("system").ok(), Some(LineKind::System));
    let parsed: DialogueLine =
      serde_json::from_str(r#"{"speaker_id":null,"content":"hey","kind":"user"}"#)
        .expect("line should deserialize");
    assert_eq!(parsed.kind, LineKind::User);
    assert!(parsed.perceived_by.is_empty());
  }
}
