use anyhow::anyhow;
use async_openai::types::chat::CreateChatCompletionRequestArgs;
use lingchat_shared::{AppError, ChatMessage};

use crate::{OpenAiClient, client::to_request_messages};

impl OpenAiClient {
  /// Run a single non-streaming chat completion and return the text of the last choice.
  pub async fn generate_text(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
    let request = CreateChatCompletionRequestArgs::default()
      .model(&self.model)
      .messages(to_request_messages(messages)?)
      .build()?;

    self
      .client
      .chat()
      .create(request)
      .await
      .map(|r| r.choices.into_iter())?
      .filter_map(|c| c.message.content)
      .last()
      .ok_or_else(|| anyhow!("empty message content").into())
  }
}
