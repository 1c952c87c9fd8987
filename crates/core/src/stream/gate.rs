use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::watch;

/// Acknowledgement handle for one emitted segment.
///
/// The consumer signals it once it has finished acting on the segment
/// (e.g. after the voice line finished playing). The segmenter never waits on it.
#[derive(Clone, Debug)]
pub struct ReadyGate {
  tx: Arc<watch::Sender<bool>>,
}

impl ReadyGate {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(false);
    Self { tx: Arc::new(tx) }
  }

  pub fn signal(&self) {
    self.tx.send_replace(true);
  }

  pub fn is_signaled(&self) -> bool {
    *self.tx.borrow()
  }

  /// Resolves once [`ReadyGate::signal`] has been called, immediately if it already was.
  pub async fn wait(&self) {
    let mut rx = self.tx.subscribe();
    let _ = rx.wait_for(|ready| *ready).await;
  }
}

impl Default for ReadyGate {
  fn default() -> Self {
    Self::new()
  }
}

/// Gates of one response, keyed by segment sequence index.
#[derive(Clone, Debug, Default)]
pub struct ReadyGates {
  inner: Arc<Mutex<BTreeMap<usize, ReadyGate>>>,
}

impl ReadyGates {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn create(&self, sequence_index: usize) -> ReadyGate {
    let gate = ReadyGate::new();
    self.inner.lock().insert(sequence_index, gate.clone());
    gate
  }

  pub fn get(&self, sequence_index: usize) -> Option<ReadyGate> {
    self.inner.lock().get(&sequence_index).cloned()
  }

  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.lock().is_empty()
  }
}
