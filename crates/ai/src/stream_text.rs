use async_openai::types::chat::CreateChatCompletionRequestArgs;
use futures::{StreamExt, stream::BoxStream};
use lingchat_shared::{AppError, ChatMessage};

use crate::{OpenAiClient, client::to_request_messages};

/// Text chunks with arbitrary boundaries, ending on exhaustion or on the first error.
pub type TextStream = BoxStream<'static, Result<String, AppError>>;

impl OpenAiClient {
  /// Start a streaming chat completion, yielding the content deltas as they arrive.
  ///
  /// Chunks without content (role announcements, finish markers) are skipped.
  pub async fn stream_text(&self, messages: &[ChatMessage]) -> Result<TextStream, AppError> {
    let request = CreateChatCompletionRequestArgs::default()
      .model(&self.model)
      .messages(to_request_messages(messages)?)
      .build()?;

    let stream = self.client.chat().create_stream(request).await?;

    Ok(
      stream
        .filter_map(|item| async move {
          match item {
            Ok(response) => {
              let text: String = response
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();
              (!text.is_empty()).then_some(Ok(text))
            }
            Err(err) => Some(Err(AppError::new(err))),
          }
        })
        .boxed(),
    )
  }
}
