use lingchat_shared::ChatMessage;

use super::{MemorySection, MemorySections};

// ──────────────────────────────────────────────────
// Compaction prompts
// ──────────────────────────────────────────────────

const ARCHIVIST_PROMPT: &str = "\
You are a meticulous memory archivist. Based on the OLD MEMORY and the NEW DIALOGUE \
below, write an updated, coherent version of one memory section.

General rules:
1. Viewpoint: strictly third person (e.g. \"The user mentioned…\", \"The AI felt…\").
2. Tense: declarative statements that record facts objectively.
3. Output: only the updated section content itself, without any explanation.
4. If the new dialogue contains nothing relevant to this section, reproduce the OLD MEMORY unchanged.

In the dialogue, lines starting with \"AI:\" are yours and lines starting with \"User:\" \
are what others said to you.";

fn section_task(section: MemorySection) -> &'static str {
  match section {
    MemorySection::ShortTerm => "\
Goal: a short-term context summary used to pick the conversation up next time.
1. Topic: what were they just talking about, and has the topic concluded?
2. Mood: what is the current atmosphere of the conversation?
3. Forgetting: drop details from the old memory that are outdated, finished or no longer relevant.
4. Length: keep it within 100-200 words.",
    MemorySection::LongTerm => "\
Goal: a chronicle of the character's experiences with lasting value.
1. Filter noise: ignore greetings and small talk.
2. Extract events: only record milestone events.
3. Accumulate: append newly happened key events to the existing chronicle.",
    MemorySection::UserInfo => "\
Goal: an up-to-date profile of the person on the other side of the screen.
1. Facts: name, age, occupation, likes, dislikes and sensitive topics.
2. Conflicts: when information conflicts (e.g. a new job), the new dialogue wins.",
    MemorySection::Promises => "\
Goal: a list of open promises and agreements.
1. Add: promises that were explicitly agreed on in the dialogue.
2. Settle: remove an entry once the new dialogue shows it has been fulfilled.",
  }
}

/// Messages asking the model to fold `transcript` into one section.
pub fn section_prompt(section: MemorySection, old_content: &str, transcript: &str) -> Vec<ChatMessage> {
  let system = format!(
    "{ARCHIVIST_PROMPT}\n\nMemory section: {section}\n{}",
    section_task(section)
  );
  let old_content = if old_content.trim().is_empty() {
    "(empty)"
  } else {
    old_content
  };
  let user = format!(
    "== OLD MEMORY ==\n{old_content}\n\n\
     == NEW DIALOGUE ==\n{transcript}\n\
     == UPDATED MEMORY (output the result directly) ==",
  );

  vec![ChatMessage::system(system), ChatMessage::user(user)]
}

// ──────────────────────────────────────────────────
// Chat-context rendering
// ──────────────────────────────────────────────────

/// Long-lived memory appended to the live chat system prompt.
pub fn system_memory_text(sections: &MemorySections) -> String {
  format!(
    "\n\n====== Memory Bank ======\n\
     [User info]: {}\n\
     [Promises]: {}\n\
     [Long-term]: {}\n\
     =========================\n",
    sections.user_info, sections.promises, sections.long_term
  )
}

/// Recap prefixed to the first user message, empty without short-term memory.
pub fn short_term_user_text(sections: &MemorySections) -> String {
  let short_term = sections.short_term.trim();
  if short_term.is_empty() {
    return String::new();
  }
  format!("[Recent recap] {short_term}\n\n")
}
