use std::{collections::HashMap, sync::Arc};

use lingchat_ai::{OpenAiClient, TextCompletion};
use lingchat_core::{
  MemoryConfig, MemoryStore, Session, StreamSegmenter, TextRepair, balance_tags,
};
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
  sessions: Arc<Mutex<HashMap<Uuid, Arc<Session>>>>,
  pub client: Arc<OpenAiClient>,
  pub store: Arc<dyn MemoryStore>,
  pub config: MemoryConfig,
  /// Clean-up for the terminal segment of every reply.
  pub repair: TextRepair,
}

impl AppState {
  #[must_use]
  pub fn new(client: OpenAiClient, store: Arc<dyn MemoryStore>, config: MemoryConfig) -> Self {
    Self {
      sessions: Arc::new(Mutex::new(HashMap::new())),
      client: Arc::new(client),
      store,
      config,
      repair: Arc::new(balance_tags),
    }
  }

  /// A fresh segmenter for one reply stream.
  pub fn segmenter(&self) -> StreamSegmenter {
    StreamSegmenter::default().with_repair(Arc::clone(&self.repair))
  }

  /// The running session with `id`, started on first use.
  pub fn session(&self, id: Uuid) -> Arc<Session> {
    let mut sessions = self.sessions.lock();
    Arc::clone(sessions.entry(id).or_insert_with(|| {
      tracing::info!(session_id = %id, "session started");
      Arc::new(Session::new(
        id,
        self.config,
        Arc::clone(&self.client) as Arc<dyn TextCompletion>,
        Arc::clone(&self.store),
      ))
    }))
  }

  pub fn existing_session(&self, id: Uuid) -> Option<Arc<Session>> {
    self.sessions.lock().get(&id).cloned()
  }
}
