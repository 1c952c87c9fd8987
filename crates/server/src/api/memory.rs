use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use lingchat_core::EntityId;
use lingchat_shared::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::AppState;

#[derive(Deserialize, ToSchema)]
pub struct MemoryQuery {
  pub session_id: Uuid,
  pub participant_id: EntityId,
}

#[derive(Serialize, ToSchema)]
pub struct MemoryView {
  pub short_term: String,
  pub long_term: String,
  pub user_info: String,
  pub promises: String,
  /// Number of log lines already consolidated
  pub pointer: usize,
  pub updated_at: Option<DateTime<Utc>>,
  /// First log index still replayed to the chat model
  pub slice_start: usize,
  /// Whether a consolidation is running right now
  pub busy: bool,
}

/// Read a participant's consolidated memory
#[utoipa::path(
  post,
  path = "/api/v0/memory",
  request_body = MemoryQuery,
  responses(
    (status = 200, description = "Current memory record", body = MemoryView),
    (status = 404, description = "Unknown session")
  )
)]
#[axum::debug_handler]
pub async fn memory(
  State(state): State<AppState>,
  Json(payload): Json<MemoryQuery>,
) -> Result<Json<MemoryView>, AppError> {
  let session = state
    .existing_session(payload.session_id)
    .ok_or_else(|| AppError::not_found(format!("Session {} not found", payload.session_id)))?;

  let bank = session.memory();
  bank.ensure_loaded(payload.participant_id).await?;
  let record = bank.snapshot(payload.participant_id);

  Ok(Json(MemoryView {
    short_term: record.sections.short_term,
    long_term: record.sections.long_term,
    user_info: record.sections.user_info,
    promises: record.sections.promises,
    pointer: record.pointer,
    updated_at: record.updated_at,
    slice_start: bank.slice_start(payload.participant_id),
    busy: bank.is_busy(payload.participant_id),
  }))
}
