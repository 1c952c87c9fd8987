use axum::{Json, extract::State};
use lingchat_core::{DialogueLine, LineKind};
use lingchat_shared::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::AppState;

#[derive(Deserialize, ToSchema)]
pub struct AddLine {
  pub session_id: Uuid,
  pub line: DialogueLine,
}

#[derive(Serialize, ToSchema)]
pub struct AddLineResult {
  /// Global index of the line in the session's dialogue log
  pub index: usize,
}

/// Append a line to a session's dialogue log
#[utoipa::path(
  post,
  path = "/api/v0/add_line",
  request_body = AddLine,
  responses(
    (status = 200, description = "Line appended", body = AddLineResult),
    (status = 400, description = "Invalid request - line content cannot be empty")
  )
)]
#[axum::debug_handler]
pub async fn add_line(
  State(state): State<AppState>,
  Json(payload): Json<AddLine>,
) -> Result<Json<AddLineResult>, AppError> {
  if payload.line.content.trim().is_empty() && payload.line.kind != LineKind::System {
    return Err(AppError::bad_request("Line content cannot be empty"));
  }

  let index = state
    .session(payload.session_id)
    .append_line(payload.line)
    .await;

  Ok(Json(AddLineResult { index }))
}
