use lingchat_shared::env_or;

/// Default number of newly visible lines that triggers a consolidation.
pub const DEFAULT_UPDATE_INTERVAL: usize = 50;

/// Default number of already-consolidated lines kept in the live chat context.
pub const DEFAULT_RECENT_WINDOW: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
  /// Consolidation threshold, counted in visible lines since the pointer.
  pub update_interval: usize,
  /// Overlap kept before the pointer when trimming the chat context.
  pub recent_window: usize,
}

impl Default for MemoryConfig {
  fn default() -> Self {
    Self {
      update_interval: DEFAULT_UPDATE_INTERVAL,
      recent_window: DEFAULT_RECENT_WINDOW,
    }
  }
}

impl MemoryConfig {
  /// Read `MEMORY_UPDATE_INTERVAL` and `MEMORY_RECENT_WINDOW`, keeping the
  /// defaults for anything missing or malformed.
  pub fn from_env() -> Self {
    Self {
      update_interval: env_or("MEMORY_UPDATE_INTERVAL", DEFAULT_UPDATE_INTERVAL),
      recent_window: env_or("MEMORY_RECENT_WINDOW", DEFAULT_RECENT_WINDOW),
    }
  }
}
