mod client;
pub use client::OpenAiClient;

mod completion;
pub use completion::TextCompletion;

mod generate_text;

mod stream_text;
pub use stream_text::TextStream;
