use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::Utc;
use lingchat_ai::TextCompletion;
use lingchat_shared::AppError;
use parking_lot::Mutex;
use tokio::{runtime::Handle, task::JoinSet};
use uuid::Uuid;

use super::{
  MemoryConfig, MemoryKey, MemoryRecord, MemoryStore, compaction::CompactionJob, prompt,
};
use crate::{DialogueLine, EntityId, Projection, project};

/// Result of one scheduler pass for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
  /// The participant's record has not been loaded from the store yet.
  NotLoaded,
  /// A consolidation is already in flight.
  Busy,
  BelowThreshold { visible_count: usize },
  /// Enough lines were visible but none rendered; the pointer moved past them.
  Skipped { pointer: usize },
  /// No tokio runtime to run the consolidation on; retried on a later pass.
  Deferred,
  Launched {
    visible_count: usize,
    target_pointer: usize,
  },
}

/// Runtime memory slot of one participant.
pub(crate) struct ParticipantMemory {
  pub(crate) key: MemoryKey,
  pub(crate) record: Mutex<MemoryRecord>,
  busy: AtomicBool,
}

impl ParticipantMemory {
  fn new(key: MemoryKey, record: MemoryRecord) -> Self {
    Self {
      key,
      record: Mutex::new(record),
      busy: AtomicBool::new(false),
    }
  }
}

/// Held by an in-flight consolidation; clears the busy flag when dropped,
/// whether the consolidation succeeded, failed, panicked or was aborted.
pub(crate) struct BusyGuard(Arc<ParticipantMemory>);

impl BusyGuard {
  fn acquire(participant: &Arc<ParticipantMemory>) -> Option<Self> {
    participant
      .busy
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self(Arc::clone(participant)))
  }
}

impl Drop for BusyGuard {
  fn drop(&mut self) {
    self.0.busy.store(false, Ordering::Release);
  }
}

/// Per-session memory of every participant, plus the compaction scheduler.
///
/// Participants are independent: each record is owned by its slot and at most
/// one consolidation runs per participant at any time. A slot only exists once
/// [`MemoryBank::ensure_loaded`] has read it from the store; until then readers
/// see an empty record and nothing is consolidated. Dropping the bank aborts
/// the consolidations still in flight.
pub struct MemoryBank {
  session_id: Uuid,
  config: MemoryConfig,
  completion: Arc<dyn TextCompletion>,
  store: Arc<dyn MemoryStore>,
  participants: Mutex<HashMap<EntityId, Arc<ParticipantMemory>>>,
  tasks: Mutex<JoinSet<()>>,
}

impl MemoryBank {
  pub fn new(
    session_id: Uuid,
    config: MemoryConfig,
    completion: Arc<dyn TextCompletion>,
    store: Arc<dyn MemoryStore>,
  ) -> Self {
    Self {
      session_id,
      config,
      completion,
      store,
      participants: Mutex::new(HashMap::new()),
      tasks: Mutex::new(JoinSet::new()),
    }
  }

  pub const fn session_id(&self) -> Uuid {
    self.session_id
  }

  pub const fn config(&self) -> MemoryConfig {
    self.config
  }

  fn key(&self, participant_id: EntityId) -> MemoryKey {
    MemoryKey {
      session_id: self.session_id,
      participant_id,
    }
  }

  fn loaded(&self, participant_id: EntityId) -> Option<Arc<ParticipantMemory>> {
    self.participants.lock().get(&participant_id).cloned()
  }

  /// Load the participant's record from the store the first time it is referenced.
  ///
  /// On a store error nothing is cached and the next call tries again.
  pub async fn ensure_loaded(&self, participant_id: EntityId) -> Result<(), AppError> {
    if self.participants.lock().contains_key(&participant_id) {
      return Ok(());
    }

    let key = self.key(participant_id);
    let record = self.store.get_latest(&key).await?.unwrap_or_default();
    tracing::debug!(%key, pointer = record.pointer, "memory record loaded");

    self
      .participants
      .lock()
      .entry(participant_id)
      .or_insert_with(|| Arc::new(ParticipantMemory::new(key, record)));
    Ok(())
  }

  pub fn participants(&self) -> Vec<EntityId> {
    self.participants.lock().keys().copied().collect()
  }

  pub fn is_loaded(&self, participant_id: EntityId) -> bool {
    self.participants.lock().contains_key(&participant_id)
  }

  /// Current record, empty when the participant is not loaded.
  pub fn snapshot(&self, participant_id: EntityId) -> MemoryRecord {
    self
      .loaded(participant_id)
      .map(|participant| participant.record.lock().clone())
      .unwrap_or_default()
  }

  pub fn is_busy(&self, participant_id: EntityId) -> bool {
    self
      .loaded(participant_id)
      .is_some_and(|participant| participant.busy.load(Ordering::Acquire))
  }

  /// First log index the live chat model should see for this participant.
  pub fn slice_start(&self, participant_id: EntityId) -> usize {
    self.snapshot(participant_id).pointer.saturating_sub(self.config.recent_window)
  }

  pub fn system_memory_text(&self, participant_id: EntityId) -> String {
    prompt::system_memory_text(&self.snapshot(participant_id).sections)
  }

  pub fn short_term_user_text(&self, participant_id: EntityId) -> String {
    prompt::short_term_user_text(&self.snapshot(participant_id).sections)
  }

  /// Decide whether `log` has grown enough since the participant's pointer to
  /// consolidate, and if so launch the consolidation in the background.
  ///
  /// Never blocks on the consolidation itself.
  pub fn check_and_trigger(&self, participant_id: EntityId, log: &[DialogueLine]) -> TriggerOutcome {
    self.reap_finished();

    let Some(participant) = self.loaded(participant_id) else {
      return TriggerOutcome::NotLoaded;
    };
    let log_len = log.len();

    let pointer = {
      let mut record = participant.record.lock();
      if record.pointer > log_len {
        tracing::warn!(
          key = %participant.key,
          pointer = record.pointer,
          log_len,
          "memory pointer outside the dialogue log, resetting to 0"
        );
        record.pointer = 0;
      }
      record.pointer
    };

    if participant.busy.load(Ordering::Acquire) {
      return TriggerOutcome::Busy;
    }

    let Projection {
      transcript,
      visible_count,
    } = project(participant_id, &log[pointer..]);

    if visible_count < self.config.update_interval {
      return TriggerOutcome::BelowThreshold { visible_count };
    }

    if transcript.trim().is_empty() {
      let record = {
        let mut record = participant.record.lock();
        record.pointer = log_len;
        record.updated_at = Some(Utc::now());
        record.clone()
      };
      tracing::debug!(key = %participant.key, pointer = log_len, "nothing renderable, pointer advanced");
      self.persist_in_background(participant.key, record);
      return TriggerOutcome::Skipped { pointer: log_len };
    }

    let Ok(handle) = Handle::try_current() else {
      tracing::debug!(key = %participant.key, "no async runtime, deferring memory compaction");
      return TriggerOutcome::Deferred;
    };

    let Some(guard) = BusyGuard::acquire(&participant) else {
      return TriggerOutcome::Busy;
    };

    tracing::info!(
      key = %participant.key,
      visible_count,
      threshold = self.config.update_interval,
      from = pointer,
      to = log_len,
      "memory compaction triggered"
    );

    let job = CompactionJob {
      participant,
      transcript,
      target_pointer: log_len,
      completion: Arc::clone(&self.completion),
      store: Arc::clone(&self.store),
      _guard: guard,
    };
    self.tasks.lock().spawn_on(job.run(), &handle);

    TriggerOutcome::Launched {
      visible_count,
      target_pointer: log_len,
    }
  }

  fn persist_in_background(&self, key: MemoryKey, record: MemoryRecord) {
    let Ok(handle) = Handle::try_current() else {
      tracing::debug!(%key, "no async runtime, memory record not persisted");
      return;
    };

    let store = Arc::clone(&self.store);
    self.tasks.lock().spawn_on(
      async move {
        if let Err(err) = store.upsert(&key, &record).await {
          tracing::error!(%key, error = %err, "failed to persist memory record");
        }
      },
      &handle,
    );
  }

  fn reap_finished(&self) {
    let mut tasks = self.tasks.lock();
    while let Some(result) = tasks.try_join_next() {
      log_task_result(self.session_id, result);
    }
  }

  /// Wait until every background task launched so far (and any launched
  /// meanwhile) has finished.
  pub async fn wait_idle(&self) {
    loop {
      let mut tasks = std::mem::take(&mut *self.tasks.lock());
      if tasks.is_empty() {
        return;
      }
      while let Some(result) = tasks.join_next().await {
        log_task_result(self.session_id, result);
      }
    }
  }
}

fn log_task_result(session_id: Uuid, result: Result<(), tokio::task::JoinError>) {
  if let Err(err) = result {
    if err.is_panic() {
      tracing::error!(%session_id, error = %err, "memory task panicked");
    } else {
      tracing::debug!(%session_id, error = %err, "memory task cancelled");
    }
  }
}
