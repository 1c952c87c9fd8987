use std::fmt::Write;

use crate::{DialogueLine, EntityId};

/// A participant's view of a slice of the dialogue log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
  /// One `AI: …` / `User: …` line per visible entry, newline terminated.
  pub transcript: String,
  /// Number of rendered lines.
  pub visible_count: usize,
}

/// Render the lines of `lines` that `participant_id` said or perceived.
///
/// System lines and lines with blank content are skipped and not counted.
/// The participant's own lines are rendered as `AI`, everything else as `User`.
pub fn project(participant_id: EntityId, lines: &[DialogueLine]) -> Projection {
  let mut projection = Projection::default();

  for line in lines.iter().filter(|line| line.is_visible_to(participant_id)) {
    let content = line.content.trim();
    if content.is_empty() {
      continue;
    }

    let speaker = if line.speaker_id == Some(participant_id) {
      "AI"
    } else {
      "User"
    };
    let _ = writeln!(projection.transcript, "{speaker}: {content}");
    projection.visible_count += 1;
  }

  projection
}
