use std::{
  collections::HashMap,
  sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use anyhow::anyhow;
use async_trait::async_trait;
use lingchat_ai::TextCompletion;
use lingchat_shared::{AppError, ChatMessage};
use parking_lot::Mutex;
use strum::IntoEnumIterator;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::{DialogueLine, EntityId, LineKind, MemoryKey, MemoryRecord, MemorySection, MemoryStore};

/// Completion double answering per memory section.
pub(crate) struct ScriptedCompletion {
  default: String,
  replies: HashMap<MemorySection, Option<String>>,
  calls: AtomicUsize,
  gate: Option<Semaphore>,
}

impl ScriptedCompletion {
  pub(crate) fn uniform(text: &str) -> Self {
    Self {
      default: text.to_owned(),
      replies: HashMap::new(),
      calls: AtomicUsize::new(0),
      gate: None,
    }
  }

  pub(crate) fn reply(mut self, section: MemorySection, text: &str) -> Self {
    self.replies.insert(section, Some(text.to_owned()));
    self
  }

  pub(crate) fn fail(mut self, section: MemorySection) -> Self {
    self.replies.insert(section, None);
    self
  }

  /// Every call waits for a permit handed out by [`ScriptedCompletion::release`].
  pub(crate) fn gated(mut self) -> Self {
    self.gate = Some(Semaphore::new(0));
    self
  }

  pub(crate) fn release(&self, calls: usize) {
    if let Some(gate) = &self.gate {
      gate.add_permits(calls);
    }
  }

  pub(crate) fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
  async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, AppError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.gate {
      gate.acquire().await.map_err(AppError::new)?.forget();
    }

    let system = messages.first().map_or("", |m| m.content.as_str());
    let section =
      MemorySection::iter().find(|s| system.contains(&format!("Memory section: {s}\n")));

    match section.and_then(|s| self.replies.get(&s)) {
      Some(Some(text)) => Ok(text.clone()),
      Some(None) => Err(AppError::new(anyhow!("scripted completion failure"))),
      None => Ok(self.default.clone()),
    }
  }
}

#[derive(Default)]
pub(crate) struct TestStore {
  records: Mutex<HashMap<MemoryKey, MemoryRecord>>,
  pub(crate) fail_reads: AtomicBool,
  pub(crate) fail_writes: AtomicBool,
  writes: AtomicUsize,
}

impl TestStore {
  pub(crate) fn seed(&self, key: MemoryKey, record: MemoryRecord) {
    self.records.lock().insert(key, record);
  }

  pub(crate) fn record(&self, key: &MemoryKey) -> Option<MemoryRecord> {
    self.records.lock().get(key).cloned()
  }

  pub(crate) fn writes(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl MemoryStore for TestStore {
  async fn get_latest(&self, key: &MemoryKey) -> Result<Option<MemoryRecord>, AppError> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(AppError::new(anyhow!("database unavailable")));
    }
    Ok(self.record(key))
  }

  async fn upsert(&self, key: &MemoryKey, record: &MemoryRecord) -> Result<Uuid, AppError> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(AppError::new(anyhow!("database unavailable")));
    }
    self.writes.fetch_add(1, Ordering::SeqCst);
    self.records.lock().insert(*key, record.clone());
    Ok(Uuid::now_v7())
  }
}

/// `lines` alternating user/assistant lines visible to `participant` only.
pub(crate) fn conversation(participant: EntityId, lines: usize) -> Vec<DialogueLine> {
  (0..lines)
    .map(|i| {
      if i % 2 == 0 {
        DialogueLine::new(None, format!("user says {i}"), LineKind::User).perceived_by([participant])
      } else {
        DialogueLine::new(Some(participant), format!("ai answers {i}"), LineKind::Assistant)
      }
    })
    .collect()
}
