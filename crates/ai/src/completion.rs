use async_trait::async_trait;
use lingchat_shared::{AppError, ChatMessage};

use crate::OpenAiClient;

/// The text-completion capability: role-tagged messages in, text out.
///
/// Used uniformly for live chat replies and for each memory compaction prompt.
#[async_trait]
pub trait TextCompletion: Send + Sync {
  async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, AppError>;
}

#[async_trait]
impl TextCompletion for OpenAiClient {
  async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, AppError> {
    tracing::debug!(model = %self.model, messages = messages.len(), "requesting chat completion");
    self.generate_text(&messages).await
  }
}
