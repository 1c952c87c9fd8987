use lingchat_shared::ChatMessage;

use crate::{DialogueLine, EntityId, MemoryBank};

/// Messages for the live chat model as seen by `participant_id`.
///
/// The system prompt carries the persona plus the long-lived memory sections.
/// Only the lines from the memory bank's slice start onwards are replayed, so
/// the context stays bounded once memory has been consolidated; the short-term
/// recap is prefixed to the first replayed user message.
pub fn build_chat_context(
  participant_id: EntityId,
  persona: &str,
  log: &[DialogueLine],
  memory: &MemoryBank,
) -> Vec<ChatMessage> {
  let start = memory.slice_start(participant_id).min(log.len());
  let mut recap = memory.short_term_user_text(participant_id);

  let mut messages = vec![ChatMessage::system(format!(
    "{persona}{}",
    memory.system_memory_text(participant_id)
  ))];

  for line in log[start..].iter().filter(|line| line.is_visible_to(participant_id)) {
    let content = line.content.trim();
    if content.is_empty() {
      continue;
    }

    if line.speaker_id == Some(participant_id) {
      messages.push(ChatMessage::assistant(content));
    } else {
      messages.push(ChatMessage::user(format!("{}{content}", std::mem::take(&mut recap))));
    }
  }

  if !recap.is_empty() {
    messages.push(ChatMessage::user(recap.trim_end()));
  }

  messages
}
