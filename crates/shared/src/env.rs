use std::{env, str::FromStr, sync::LazyLock};

pub struct AppEnv {
  pub openai_base_url: String,
  pub openai_api_key: String,
  pub openai_chat_model: String,
  /// Durable memory is only enabled when this is set.
  pub database_url: Option<String>,
  pub server_addr: String,
}

impl AppEnv {
  fn new() -> Self {
    dotenvy::dotenv().ok();

    Self {
      openai_base_url: env::var("OPENAI_BASE_URL").expect("OPENAI_BASE_URL must be set"),
      openai_api_key: env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set"),
      openai_chat_model: env::var("OPENAI_CHAT_MODEL").expect("OPENAI_CHAT_MODEL must be set"),
      database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
      server_addr: env_or("SERVER_ADDR", "0.0.0.0:3000".to_owned()),
    }
  }
}

pub static APP_ENV: LazyLock<AppEnv> = LazyLock::new(AppEnv::new);

/// Read a tunable from the environment, falling back to `default` when the
/// variable is missing or does not parse.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
  let Ok(raw) = env::var(key) else {
    return default;
  };

  raw.trim().parse().unwrap_or_else(|_| {
    tracing::debug!(key, value = %raw, "invalid value in environment, using default");
    default
  })
}
