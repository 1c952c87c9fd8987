use std::collections::BTreeSet;

use axum::{Json, extract::State};
use futures::Stream;
use lingchat_core::{DialogueLine, EntityId, LineKind, Segment, StreamSegmenter};
use lingchat_shared::AppError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::AppState;

/// Segments buffered between the segmenter and the consumer.
const SEGMENT_QUEUE_CAPACITY: usize = 8;

#[derive(Deserialize, ToSchema)]
pub struct Reply {
  pub session_id: Uuid,
  /// Character that answers
  pub participant_id: EntityId,
  /// Other participants who hear the answer
  #[serde(default)]
  pub perceived_by: BTreeSet<EntityId>,
  /// System prompt for the character
  #[serde(default)]
  pub persona: String,
}

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReplySegment {
  pub text: String,
  pub sequence_index: usize,
  pub is_final: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ReplyResult {
  pub segments: Vec<ReplySegment>,
  /// Full response as appended to the dialogue log
  pub response: String,
  /// Global index of the appended line
  pub index: usize,
}

/// Generate a segmented reply for a character and append it to the log
#[utoipa::path(
  post,
  path = "/api/v0/reply",
  request_body = Reply,
  responses(
    (status = 200, description = "Reply generated", body = ReplyResult),
    (status = 500, description = "Completion failed mid-stream")
  )
)]
#[axum::debug_handler]
pub async fn reply(
  State(state): State<AppState>,
  Json(payload): Json<Reply>,
) -> Result<Json<ReplyResult>, AppError> {
  let session = state.session(payload.session_id);

  let messages = session
    .chat_context(payload.participant_id, &payload.persona)
    .await;
  let stream = state.client.stream_text(&messages).await?;
  let (segments, response) = segment_reply(state.segmenter(), stream).await?;

  let line = DialogueLine::new(Some(payload.participant_id), response.clone(), LineKind::Assistant)
    .perceived_by(payload.perceived_by);
  let index = session.append_line(line).await;

  tracing::debug!(
    session_id = %payload.session_id,
    participant_id = payload.participant_id,
    segments = segments.len(),
    index,
    "reply appended"
  );

  Ok(Json(ReplyResult {
    segments,
    response,
    index,
  }))
}

/// Run `stream` through the segmenter while draining its queue, acknowledging
/// every segment once it has been collected.
async fn segment_reply<S>(
  segmenter: StreamSegmenter,
  stream: S,
) -> Result<(Vec<ReplySegment>, String), AppError>
where
  S: Stream<Item = Result<String, AppError>> + Unpin,
{
  let (sender, mut receiver) = mpsc::channel::<Segment>(SEGMENT_QUEUE_CAPACITY);

  let producer = async move { segmenter.run(stream, &sender).await };
  let consumer = async move {
    let mut segments = Vec::new();
    while let Some(segment) = receiver.recv().await {
      segment.gate.signal();
      segments.push(ReplySegment {
        text: segment.text,
        sequence_index: segment.sequence_index,
        is_final: segment.is_final,
      });
    }
    segments
  };

  let (response, segments) = tokio::join!(producer, consumer);
  Ok((segments, response?))
}
