use async_openai::{
  Client,
  config::OpenAIConfig,
  types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
  },
};
use lingchat_shared::{APP_ENV, AppError, ChatMessage, ChatRole};

/// OpenAI-compatible chat client used for live replies and memory compaction.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
  pub(crate) client: Client<OpenAIConfig>,
  pub(crate) model: String,
}

impl OpenAiClient {
  pub fn new(base_url: &str, api_key: &str, model: impl Into<String>) -> Self {
    let config = OpenAIConfig::new()
      .with_api_key(api_key)
      .with_api_base(base_url);

    Self {
      client: Client::with_config(config),
      model: model.into(),
    }
  }

  /// Build a client from `OPENAI_BASE_URL`, `OPENAI_API_KEY` and `OPENAI_CHAT_MODEL`.
  pub fn from_env() -> Self {
    Self::new(
      &APP_ENV.openai_base_url,
      &APP_ENV.openai_api_key,
      APP_ENV.openai_chat_model.as_str(),
    )
  }

  pub fn model(&self) -> &str {
    &self.model
  }
}

pub(crate) fn to_request_messages(
  messages: &[ChatMessage],
) -> Result<Vec<ChatCompletionRequestMessage>, AppError> {
  messages
    .iter()
    .map(|message| {
      let content = message.content.as_str();
      Ok(match message.role {
        ChatRole::System => {
          ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(content))
        }
        ChatRole::User => {
          ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(content))
        }
        ChatRole::Assistant => ChatCompletionRequestMessage::Assistant(
          ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?,
        ),
      })
    })
    .collect()
}
