use std::{sync::Arc, time::Instant};

use chrono::Utc;
use futures::future::join_all;
use lingchat_ai::TextCompletion;
use lingchat_shared::AppError;
use strum::IntoEnumIterator;

use super::{
  MemoryRecord, MemorySection, MemoryStore,
  bank::{BusyGuard, ParticipantMemory},
  prompt::section_prompt,
};

/// One background consolidation of a participant's memory.
pub(crate) struct CompactionJob {
  pub(crate) participant: Arc<ParticipantMemory>,
  pub(crate) transcript: String,
  pub(crate) target_pointer: usize,
  pub(crate) completion: Arc<dyn TextCompletion>,
  pub(crate) store: Arc<dyn MemoryStore>,
  pub(crate) _guard: BusyGuard,
}

impl CompactionJob {
  /// Errors are logged here and never reach the caller that appended the line.
  /// The busy flag is released when `self` (and with it the guard) is dropped.
  pub(crate) async fn run(self) {
    let key = self.participant.key;
    let started = Instant::now();

    match self.compact().await {
      Ok(()) => tracing::info!(
        %key,
        pointer = self.target_pointer,
        elapsed_ms = started.elapsed().as_millis(),
        "memory compaction finished"
      ),
      Err(err) => tracing::error!(
        %key,
        target_pointer = self.target_pointer,
        error = %err,
        "memory compaction failed"
      ),
    }
  }

  async fn compact(&self) -> Result<(), AppError> {
    let key = self.participant.key;
    let previous = self.participant.record.lock().sections.clone();

    // Fan out: the four section requests run concurrently inside this job and
    // are cancelled with it.
    let requests = MemorySection::iter().map(|section| {
      let messages = section_prompt(section, previous.get(section), &self.transcript);
      self.completion.complete(messages)
    });
    let responses = join_all(requests).await;

    let mut sections = previous;
    for (section, response) in MemorySection::iter().zip(responses) {
      match response {
        Ok(text) if !text.trim().is_empty() => sections.set(section, text.trim().to_owned()),
        Ok(_) => {
          tracing::warn!(%key, %section, "empty completion, keeping previous section");
        }
        Err(err) => {
          tracing::warn!(%key, %section, error = %err, "completion failed, keeping previous section");
        }
      }
    }

    let record = MemoryRecord {
      sections,
      pointer: self.target_pointer,
      updated_at: Some(Utc::now()),
    };

    // The cached record only moves once the store accepted it.
    let record_id = self.store.upsert(&key, &record).await?;
    *self.participant.record.lock() = record;

    tracing::debug!(%key, %record_id, "memory record committed");
    Ok(())
  }
}
