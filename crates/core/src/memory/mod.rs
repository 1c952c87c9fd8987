mod bank;
pub use bank::{MemoryBank, TriggerOutcome};

mod compaction;

mod config;
pub use config::{DEFAULT_RECENT_WINDOW, DEFAULT_UPDATE_INTERVAL, MemoryConfig};

pub mod prompt;

mod record;
pub use record::{MemoryKey, MemoryRecord, MemorySection, MemorySections};

mod store;
pub use store::{DbMemoryStore, MemoryStore, VolatileStore};
