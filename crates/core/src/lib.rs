mod context;
pub use context::build_chat_context;

mod dialogue;
pub use dialogue::{DialogueLine, EntityId, LineKind};

pub mod memory;
pub use memory::{
  DbMemoryStore, MemoryBank, MemoryConfig, MemoryKey, MemoryRecord, MemorySection,
  MemorySections, MemoryStore, TriggerOutcome, VolatileStore,
};

mod session;
pub use session::Session;

pub mod stream;
pub use stream::{
  ReadyGate, ReadyGates, Segment, StreamSegmenter, TagMarkers, TextRepair, balance_tags,
};

mod visibility;
pub use visibility::{Projection, project};

#[cfg(test)]
mod testing;
