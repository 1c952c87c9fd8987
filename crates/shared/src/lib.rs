mod error;
pub use error::AppError;

mod env;
pub use env::{APP_ENV, AppEnv, env_or};

mod message;
pub use message::{ChatMessage, ChatRole};
