use std::sync::Arc;

use lingchat_ai::TextCompletion;
use lingchat_shared::ChatMessage;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{DialogueLine, EntityId, MemoryBank, MemoryConfig, MemoryStore, build_chat_context};

/// A running conversation: the append-only dialogue log and the memory of
/// everyone taking part in it.
pub struct Session {
  id: Uuid,
  log: RwLock<Vec<DialogueLine>>,
  memory: MemoryBank,
}

impl Session {
  pub fn new(
    id: Uuid,
    config: MemoryConfig,
    completion: Arc<dyn TextCompletion>,
    store: Arc<dyn MemoryStore>,
  ) -> Self {
    Self {
      id,
      log: RwLock::new(Vec::new()),
      memory: MemoryBank::new(id, config, completion, store),
    }
  }

  pub const fn id(&self) -> Uuid {
    self.id
  }

  pub const fn memory(&self) -> &MemoryBank {
    &self.memory
  }

  /// Append `line` and run the compaction scheduler for every participant it
  /// involves. Returns the line's global index.
  ///
  /// The line is always appended. A participant whose memory cannot be loaded
  /// is skipped for this line and retried on the next one.
  pub async fn append_line(&self, line: DialogueLine) -> usize {
    let involved = line.involved();
    let index = {
      let mut log = self.log.write().await;
      log.push(line);
      log.len() - 1
    };

    for participant_id in involved {
      if let Err(err) = self.memory.ensure_loaded(participant_id).await {
        tracing::warn!(session_id = %self.id, participant_id, error = %err, "memory not loaded, skipping check");
        continue;
      }

      let log = self.log.read().await;
      let outcome = self.memory.check_and_trigger(participant_id, &log);
      tracing::trace!(session_id = %self.id, participant_id, ?outcome, "memory check");
    }

    index
  }

  pub async fn len(&self) -> usize {
    self.log.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.log.read().await.is_empty()
  }

  pub async fn lines(&self) -> Vec<DialogueLine> {
    self.log.read().await.clone()
  }

  /// Chat messages for `participant_id`, loading its memory first when needed.
  /// Without loaded memory the context carries the full visible log.
  pub async fn chat_context(&self, participant_id: EntityId, persona: &str) -> Vec<ChatMessage> {
    if let Err(err) = self.memory.ensure_loaded(participant_id).await {
      tracing::warn!(session_id = %self.id, participant_id, error = %err, "memory not loaded, building context without it");
    }

    let log = self.log.read().await;
    build_chat_context(participant_id, persona, &log, &self.memory)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::Ordering;

  use super::*;
  use crate::{
    LineKind, MemoryKey, MemoryRecord, MemorySection, TriggerOutcome,
    testing::{ScriptedCompletion, TestStore, conversation},
  };

  fn session(completion: &Arc<ScriptedCompletion>, store: &Arc<TestStore>) -> Session {
    Session::new(
      Uuid::nil(),
      MemoryConfig::default(),
      Arc::clone(completion) as Arc<dyn TextCompletion>,
      Arc::clone(store) as Arc<dyn MemoryStore>,
    )
  }

  fn seed_user_info(store: &TestStore, participant_id: EntityId, user_info: &str) -> MemoryKey {
    let key = MemoryKey { session_id: Uuid::nil(), participant_id };
    let mut seeded = MemoryRecord::default();
    seeded.sections.user_info = user_info.to_owned();
    store.seed(key, seeded);
    key
  }

  #[tokio::test]
  async fn fiftieth_line_consolidates_and_persists() {
    let completion = Arc::new(ScriptedCompletion::uniform("they talked about tea"));
    let store = Arc::new(TestStore::default());
    let session = session(&completion, &store);

    for (i, line) in conversation(4, 50).into_iter().enumerate() {
      assert_eq!(session.append_line(line).await, i);
      if i < 49 {
        assert_eq!(completion.calls(), 0);
      }
    }
    session.memory().wait_idle().await;

    assert_eq!(completion.calls(), 4);
    let key = MemoryKey { session_id: Uuid::nil(), participant_id: 4 };
    let stored = store.record(&key).expect("record should be persisted");
    assert_eq!(stored.pointer, 50);
    assert_eq!(stored, session.memory().snapshot(4));
  }

  #[tokio::test]
  async fn existing_memory_is_loaded_once_on_first_reference() {
    let completion = Arc::new(ScriptedCompletion::uniform("x"));
    let store = Arc::new(TestStore::default());
    seed_user_info(&store, 9, "The user likes tea.");

    let session = session(&completion, &store);
    let line = DialogueLine::new(None, "hello", LineKind::User).perceived_by([9]);
    session.append_line(line).await;

    assert_eq!(session.memory().snapshot(9).sections.user_info, "The user likes tea.");
    assert!(session.chat_context(9, "").await[0].content.contains("The user likes tea."));
    assert_eq!(session.len().await, 1);
  }

  #[tokio::test]
  async fn context_before_the_first_line_keeps_stored_memory() {
    let completion = Arc::new(
      ScriptedCompletion::uniform("new summary").fail(MemorySection::UserInfo),
    );
    let store = Arc::new(TestStore::default());
    let key = seed_user_info(&store, 9, "The user likes tea.");
    let session = session(&completion, &store);

    let context = session.chat_context(9, "").await;
    assert!(context[0].content.contains("The user likes tea."));

    for line in conversation(9, 50) {
      session.append_line(line).await;
    }
    session.memory().wait_idle().await;

    let stored = store.record(&key).expect("record should be persisted");
    assert_eq!(stored.pointer, 50);
    assert_eq!(stored.sections.user_info, "The user likes tea.");
    assert_eq!(stored.sections.short_term, "new summary");
  }

  #[tokio::test]
  async fn unreadable_memory_does_not_lose_the_line() {
    let completion = Arc::new(ScriptedCompletion::uniform("x"));
    let store = Arc::new(TestStore::default());
    seed_user_info(&store, 9, "The user likes tea.");
    store.fail_reads.store(true, Ordering::SeqCst);
    let session = session(&completion, &store);

    let line = DialogueLine::new(None, "hello", LineKind::User).perceived_by([9]);
    assert_eq!(session.append_line(line).await, 0);
    assert_eq!(session.len().await, 1);
    assert!(!session.memory().is_loaded(9));

    store.fail_reads.store(false, Ordering::SeqCst);
    let line = DialogueLine::new(Some(9), "hi", LineKind::Assistant);
    assert_eq!(session.append_line(line).await, 1);
    assert_eq!(session.memory().snapshot(9).sections.user_info, "The user likes tea.");
  }

  #[tokio::test]
  async fn lines_unseen_by_a_participant_do_not_count() {
    let completion = Arc::new(ScriptedCompletion::uniform("x"));
    let store = Arc::new(TestStore::default());
    let session = session(&completion, &store);

    for line in conversation(1, 60) {
      session.append_line(line).await;
    }
    session.memory().wait_idle().await;

    assert!(!session.memory().is_loaded(2));
    session.memory().ensure_loaded(2).await.expect("load should succeed");
    let log = session.lines().await;
    assert_eq!(
      session.memory().check_and_trigger(2, &log),
      TriggerOutcome::BelowThreshold { visible_count: 0 }
    );
  }
}
